//! Workspace layer: `config/config.toml`, then the active profile's file.
//!
//! The profile comes from `DAGPREP_ENV` and selects `config/<profile>.toml`,
//! so a CI or production run can override chunking or the store backend
//! without touching the shared base file.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variable naming the active profile
pub const PROFILE_VAR: &str = "DAGPREP_ENV";

const DEFAULT_PROFILE: &str = "development";

/// Active profile; unset or blank falls back to `development`
pub fn profile() -> String {
    std::env::var(PROFILE_VAR)
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Workspace files present for `profile`, lowest precedence first
pub fn config_files(workspace_root: &Path, profile: &str) -> Vec<PathBuf> {
    let dir = workspace_root.join("config");
    [dir.join("config.toml"), dir.join(format!("{}.toml", profile))]
        .into_iter()
        .filter(|path| path.is_file())
        .collect()
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let profile = profile();
    let files = config_files(workspace_root, &profile);
    debug!(profile = %profile, files = ?files, "Workspace configuration");

    Ok(files.iter().fold(builder, |builder, path| {
        builder.add_source(File::from(path.as_path()).required(true))
    }))
}
