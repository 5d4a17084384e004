//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a one-line string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Aborted(msg) => msg.clone(),
        other => format!("error: {}", other),
    }
}
