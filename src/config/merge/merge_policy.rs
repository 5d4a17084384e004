//! Lowest configuration layer: dagprep's built-in defaults.
//!
//! Values come from the same constants and policy types the typed config
//! defaults to, so a file that sets nothing loads as `DagprepConfig::default()`.

use crate::config::StoreBackend;
use crate::tree::builder::{EmptyFolderPolicy, ErrorPolicy};
use crate::types::{DEFAULT_BREAKPOINT, DEFAULT_CHUNK_SIZE};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Value};

/// Key/value pairs seeded before any file or environment source
fn defaults() -> Vec<(&'static str, Value)> {
    vec![
        ("ingest.chunk_size", Value::from(DEFAULT_CHUNK_SIZE as i64)),
        ("ingest.breakpoint", Value::from(DEFAULT_BREAKPOINT as i64)),
        ("ingest.error_policy", Value::from(ErrorPolicy::default().to_string())),
        ("ingest.empty_folders", Value::from(EmptyFolderPolicy::default().to_string())),
        ("store.backend", Value::from(backend_name(StoreBackend::default()))),
        ("output.audit_log", Value::from(true)),
    ]
}

fn backend_name(backend: StoreBackend) -> &'static str {
    match backend {
        StoreBackend::Memory => "memory",
        StoreBackend::Sled => "sled",
    }
}

/// Start a builder seeded with the defaults
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    defaults()
        .into_iter()
        .try_fold(Config::builder(), |builder, (key, value)| builder.set_default(key, value))
}
