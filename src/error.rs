//! Error types for the dagprep packing pipeline.

use crate::tree::node::NodeKind;
use crate::types::ContentId;
use std::path::PathBuf;
use thiserror::Error;

/// Content store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// DAG construction errors
#[derive(Debug, Error)]
pub enum DagError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid node kind: cannot concatenate {kind} node {id} into a file node")]
    InvalidNodeKind { id: ContentId, kind: NodeKind },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Root reduction requires at least one node")]
    EmptyReduction,

    #[error("Invalid fan-out: max_links must be at least 2, got {0}")]
    InvalidFanOut(usize),

    #[error("Invalid chunk size: {0} bytes (expected 1 to {max})", max = crate::types::MAX_CHUNK_SIZE)]
    InvalidChunkSize(u64),
}

impl DagError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DagError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure is scoped to a single input file or folder.
    ///
    /// Only read failures qualify; everything else leaves the DAG in a state
    /// that cannot produce a complete root.
    pub fn is_skippable(&self) -> bool {
        matches!(self, DagError::Io { .. })
    }
}

/// Archive read/write errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a dagprep archive (bad magic)")]
    BadMagic,

    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    #[error("Corrupt archive: {0}")]
    Corrupt(String),

    #[error("Block missing from archive: {0}")]
    MissingBlock(ContentId),

    #[error("DAG error: {0}")]
    Dag(#[from] DagError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Top-level errors surfaced by the pipeline and CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Dag(#[from] DagError),

    #[error("{0}")]
    Archive(#[from] ArchiveError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Aborted: {0}")]
    Aborted(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
