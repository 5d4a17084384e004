//! Configuration System
//!
//! Layered configuration for packing runs: merge-policy defaults, the global
//! config file, workspace config files, then `DAGPREP_` environment
//! variables. CLI flags are applied on top by the caller.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::tree::builder::{EmptyFolderPolicy, ErrorPolicy, IngestOptions};
use crate::tree::walker::WalkerConfig;
use crate::types::{
    DEFAULT_BREAKPOINT, DEFAULT_CHUNK_SIZE, DEFAULT_LINKS_PER_BLOCK, MAX_CHUNK_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagprepConfig {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chunking, packing and traversal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Leaf chunk size
    #[serde(default = "default_chunk_size")]
    pub chunk_size: ByteSize,

    /// Bytes accumulated before an interim node is flushed
    #[serde(default = "default_breakpoint")]
    pub breakpoint: ByteSize,

    /// Maximum links per parent; derived from the sizes when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_links: Option<usize>,

    #[serde(default)]
    pub error_policy: ErrorPolicy,

    #[serde(default)]
    pub empty_folders: EmptyFolderPolicy,

    #[serde(default)]
    pub follow_symlinks: bool,

    /// File or folder names to leave out
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_chunk_size() -> ByteSize {
    ByteSize(DEFAULT_CHUNK_SIZE)
}

fn default_breakpoint() -> ByteSize {
    ByteSize(DEFAULT_BREAKPOINT)
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            breakpoint: default_breakpoint(),
            max_links: None,
            error_policy: ErrorPolicy::default(),
            empty_folders: EmptyFolderPolicy::default(),
            follow_symlinks: false,
            ignore: Vec::new(),
        }
    }
}

impl IngestConfig {
    /// Configured fan-out, or enough links for one breakpoint's worth of
    /// chunks (never below the default links per block)
    pub fn effective_max_links(&self) -> usize {
        self.max_links.unwrap_or_else(|| {
            let per_breakpoint = self.breakpoint.0 / self.chunk_size.0.max(1) + 1;
            usize::try_from(per_breakpoint)
                .unwrap_or(usize::MAX)
                .max(DEFAULT_LINKS_PER_BLOCK)
        })
    }

    pub fn to_options(&self) -> IngestOptions {
        IngestOptions {
            chunk_size: self.chunk_size.0,
            breakpoint: self.breakpoint.0,
            max_links: self.effective_max_links(),
            error_policy: self.error_policy,
            empty_folders: self.empty_folders,
            walker: WalkerConfig {
                follow_symlinks: self.follow_symlinks,
                ignore_patterns: self.ignore.clone(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size.0 == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }
        if self.chunk_size.0 > MAX_CHUNK_SIZE {
            return Err(format!(
                "chunk_size must be at most {} bytes, got {}",
                MAX_CHUNK_SIZE, self.chunk_size.0
            ));
        }
        if self.breakpoint.0 == 0 {
            return Err("breakpoint must be greater than zero".to_string());
        }
        if let Some(max_links) = self.max_links {
            if max_links < 2 {
                return Err(format!("max_links must be at least 2, got {}", max_links));
            }
        }
        Ok(())
    }
}

/// Block store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sled,
}

/// Block store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory of the persistent store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Keep the persistent store directory after a successful run
    #[serde(default)]
    pub keep: bool,

    /// Flush the persistent store after every block
    #[serde(default)]
    pub sync_writes: bool,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        match (self.backend, &self.path) {
            (StoreBackend::Sled, None) => {
                Err("sled backend requires store.path".to_string())
            }
            (StoreBackend::Sled, Some(path)) if path.as_os_str().is_empty() => {
                Err("store.path cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Archive and audit output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Archive path; `dagprep_<unix-ts>.car` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Write `<stem>.jsonl` next to the archive
    #[serde(default = "default_true")]
    pub audit_log: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            audit_log: true,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Ingest(String),
    Store(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Ingest(msg) => write!(f, "Ingest: {}", msg),
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DagprepConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.ingest.validate() {
            errors.push(ValidationError::Ingest(e));
        }
        if let Err(e) = self.store.validate() {
            errors.push(ValidationError::Store(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding all problems into one error
    pub fn check(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ApiError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}

/// Byte count accepting plain integers or `k`/`m`/`g` suffixed strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSize", into = "u64")]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn bytes(self) -> u64 {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Int(u64),
    Text(String),
}

impl TryFrom<RawSize> for ByteSize {
    type Error = String;

    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Int(n) => Ok(ByteSize(n)),
            RawSize::Text(s) => s.parse(),
        }
    }
}

impl From<ByteSize> for u64 {
    fn from(size: ByteSize) -> Self {
        size.0
    }
}

impl FromStr for ByteSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let trimmed = lower
            .strip_suffix("ib")
            .or_else(|| lower.strip_suffix('b'))
            .unwrap_or(&lower);

        let (digits, multiplier) = match trimmed.chars().last() {
            Some('k') => (&trimmed[..trimmed.len() - 1], 1u64 << 10),
            Some('m') => (&trimmed[..trimmed.len() - 1], 1u64 << 20),
            Some('g') => (&trimmed[..trimmed.len() - 1], 1u64 << 30),
            _ => (trimmed, 1),
        };

        let value: u64 = digits
            .trim()
            .parse()
            .map_err(|_| format!("Invalid size '{}' (expected e.g. 1048576, 512k, 1m, 2g)", s))?;
        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| format!("Size '{}' is too large", s))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
