//! End-to-end packing run
//!
//! Opens the block store, builds the DAG, writes the archive and the audit
//! log, then disposes of the store.

use crate::archive::{write_archive, ArchiveSummary};
use crate::audit::{audit_path_for, write_audit_log};
use crate::config::{DagprepConfig, StoreBackend, StoreConfig};
use crate::error::ApiError;
use crate::store::open_store;
use crate::tree::builder::{BuildStats, IngestOptions, Skipped, TreeBuilder};
use crate::types::ContentId;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub ingest: IngestOptions,
    pub store: StoreConfig,
    pub audit_log: bool,
}

impl BuildRequest {
    /// Request from loaded configuration; output falls back to
    /// `dagprep_<unix-ts>.car` in the working directory
    pub fn from_config(input: PathBuf, config: &DagprepConfig) -> Self {
        Self {
            input,
            output: config
                .output
                .path
                .clone()
                .unwrap_or_else(default_output_path),
            ingest: config.ingest.to_options(),
            store: config.store.clone(),
            audit_log: config.output.audit_log,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub root: ContentId,
    pub archive: ArchiveSummary,
    /// Audit log path, when one was written
    pub audit_log: Option<PathBuf>,
    /// Persistent store directory left in place
    pub store: Option<PathBuf>,
    pub stats: BuildStats,
    pub skipped: Vec<Skipped>,
    pub duration_ms: u128,
}

pub fn default_output_path() -> PathBuf {
    PathBuf::from(format!("dagprep_{}.car", chrono::Utc::now().timestamp()))
}

/// Run a full build
#[instrument(skip_all, fields(input = %request.input.display(), output = %request.output.display()))]
pub fn run_build(request: &BuildRequest) -> Result<BuildReport, ApiError> {
    let start = Instant::now();
    let store = open_store(&request.store)?;

    let output = TreeBuilder::new(request.input.clone(), store.as_ref())
        .with_options(request.ingest.clone())
        .build()?;
    store.flush()?;

    let root = output.root.id();
    let archive = write_archive(&request.output, &[root], store.as_ref())?;

    let audit_log = if request.audit_log {
        let path = audit_path_for(&request.output);
        match write_audit_log(&path, &output.audit) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write audit log");
                None
            }
        }
    } else {
        None
    };

    drop(store);
    let kept_store = dispose_store(&request.store);

    info!(
        root = %root,
        blocks = archive.blocks,
        archive_bytes = archive.bytes,
        duration_ms = start.elapsed().as_millis(),
        "Build finished"
    );

    Ok(BuildReport {
        root,
        archive,
        audit_log,
        store: kept_store,
        stats: output.stats,
        skipped: output.skipped,
        duration_ms: start.elapsed().as_millis(),
    })
}

/// Remove the persistent store directory unless it is to be kept.
/// Returns the directory when it remains on disk.
fn dispose_store(config: &StoreConfig) -> Option<PathBuf> {
    let path = match (config.backend, &config.path) {
        (StoreBackend::Sled, Some(path)) => path,
        _ => return None,
    };

    if config.keep {
        return Some(path.clone());
    }

    match remove_store_dir(path) {
        Ok(()) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove block store");
            Some(path.clone())
        }
    }
}

fn remove_store_dir(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}
