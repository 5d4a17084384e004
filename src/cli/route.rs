//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::archive::{extract_archive, list_entries, verify_archive};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_build_report_json, format_build_report_text, format_entries_json,
    format_entries_table, format_extract_report, format_verify_report_json,
    format_verify_report_text,
};
use crate::config::{ByteSize, ConfigLoader, DagprepConfig, StoreBackend};
use crate::error::ApiError;
use crate::pipeline::{run_build, BuildRequest};
use crate::tree::builder::{EmptyFolderPolicy, ErrorPolicy};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flags of `build` that override loaded configuration
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub output: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub keep_store: bool,
    pub chunk_size: Option<ByteSize>,
    pub breakpoint: Option<ByteSize>,
    pub max_links: Option<usize>,
    pub on_error: Option<ErrorPolicy>,
    pub empty_folders: Option<EmptyFolderPolicy>,
    pub no_audit: bool,
}

impl BuildOverrides {
    /// Apply on top of loaded configuration
    pub fn apply(&self, config: &mut DagprepConfig) {
        if let Some(ref output) = self.output {
            config.output.path = Some(output.clone());
        }
        if let Some(ref store) = self.store {
            config.store.backend = StoreBackend::Sled;
            config.store.path = Some(store.clone());
        }
        if self.keep_store {
            config.store.keep = true;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.ingest.chunk_size = chunk_size;
        }
        if let Some(breakpoint) = self.breakpoint {
            config.ingest.breakpoint = breakpoint;
        }
        if let Some(max_links) = self.max_links {
            config.ingest.max_links = Some(max_links);
        }
        if let Some(policy) = self.on_error {
            config.ingest.error_policy = policy;
        }
        if let Some(policy) = self.empty_folders {
            config.ingest.empty_folders = policy;
        }
        if self.no_audit {
            config.output.audit_log = false;
        }
    }
}

/// Runtime context for CLI execution: workspace and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: DagprepConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: DagprepConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &DagprepConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Build {
                input,
                output,
                store,
                keep_store,
                chunk_size,
                breakpoint,
                max_links,
                on_error,
                empty_folders,
                yes,
                no_audit,
                format,
            } => {
                let overrides = BuildOverrides {
                    output: output.clone(),
                    store: store.clone(),
                    keep_store: *keep_store,
                    chunk_size: *chunk_size,
                    breakpoint: *breakpoint,
                    max_links: *max_links,
                    on_error: *on_error,
                    empty_folders: *empty_folders,
                    no_audit: *no_audit,
                };
                self.handle_build(input, &overrides, *yes, format)
            }
            Commands::Verify { archive, format } => self.handle_verify(archive, format),
            Commands::Extract { archive, dest } => {
                let report = extract_archive(archive, dest)?;
                Ok(format_extract_report(dest, &report))
            }
            Commands::Ls { archive, format } => {
                let entries = list_entries(archive)?;
                if format == "json" {
                    format_entries_json(&entries)
                } else {
                    Ok(format_entries_table(&entries))
                }
            }
            Commands::Config => self.config.to_toml(),
        }
    }

    fn handle_build(
        &self,
        input: &Path,
        overrides: &BuildOverrides,
        assume_yes: bool,
        format: &str,
    ) -> Result<String, ApiError> {
        let mut config = self.config.clone();
        overrides.apply(&mut config);
        config.check()?;

        if config.store.backend == StoreBackend::Memory
            && !assume_yes
            && std::io::stdin().is_terminal()
        {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt("No store directory given; keep every block in memory?")
                .default(true)
                .interact()
                .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))?;
            if !confirmed {
                return Err(ApiError::Aborted("Build cancelled".to_string()));
            }
        }

        let request = BuildRequest::from_config(input.to_path_buf(), &config);
        info!(
            input = %request.input.display(),
            output = %request.output.display(),
            max_links = request.ingest.max_links,
            "Starting build"
        );
        let report = run_build(&request)?;

        if format == "json" {
            format_build_report_json(&report)
        } else {
            Ok(format_build_report_text(&report))
        }
    }

    fn handle_verify(&self, archive: &Path, format: &str) -> Result<String, ApiError> {
        let report = verify_archive(archive)?;
        let rendered = if format == "json" {
            format_verify_report_json(&report)?
        } else {
            format_verify_report_text(archive, &report)
        };
        if report.is_valid() {
            Ok(rendered)
        } else {
            Err(ApiError::Aborted(rendered))
        }
    }
}
