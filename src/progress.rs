//! Byte-level progress state for a build, reported through tracing.

use std::path::{Path, PathBuf};
use tracing::info;

/// Processed/total byte counters and the file currently being read
#[derive(Debug, Clone, Default)]
pub struct Progress {
    total_bytes: u64,
    processed_bytes: u64,
    current: Option<PathBuf>,
    last_decile: u64,
}

impl Progress {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            ..Self::default()
        }
    }

    pub fn start_file(&mut self, path: &Path) {
        self.current = Some(path.to_path_buf());
    }

    /// Record bytes consumed; emits an event at every 10% step
    pub fn advance(&mut self, bytes: u64) {
        self.processed_bytes += bytes;
        if self.total_bytes == 0 {
            return;
        }

        let decile = (self.processed_bytes.min(self.total_bytes) * 10) / self.total_bytes;
        if decile > self.last_decile {
            self.last_decile = decile;
            info!(
                percent = decile * 10,
                processed = self.processed_bytes,
                total = self.total_bytes,
                file = ?self.current,
                "Progress"
            );
        }
    }

    /// Count the unread remainder of an abandoned file as processed.
    /// `file_start` is `processed_bytes()` from before the file was read.
    pub fn skip_rest(&mut self, file_size: u64, file_start: u64) {
        let read = self.processed_bytes.saturating_sub(file_start);
        self.advance(file_size.saturating_sub(read));
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.processed_bytes as f64 / self.total_bytes as f64) * 100.0
    }
}
