//! Config loader: assembles the layered sources into a [`DagprepConfig`].

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::DagprepConfig;
use config::{ConfigError, Environment, File};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace
    ///
    /// Sources, lowest to highest precedence:
    /// 1. Merge-policy defaults
    /// 2. Global config file
    /// 3. `config/config.toml` and `config/{DAGPREP_ENV}.toml` under the workspace
    /// 4. `DAGPREP_` environment variables (`__` separates nested keys)
    pub fn load(workspace_root: &Path) -> Result<DagprepConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;

        builder
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load from a single file, bypassing the global, workspace and
    /// environment layers
    pub fn load_from_file(path: &Path) -> Result<DagprepConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    /// Path the global config file is read from
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Built-in defaults
    pub fn default() -> DagprepConfig {
        DagprepConfig::default()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("DAGPREP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
