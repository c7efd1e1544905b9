//! Extraction error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a text-completion collaborator.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Completion collaborator is disabled")]
    Disabled,
}

/// Non-fatal failure of one extraction batch.
///
/// The batch contributes no triples; the run continues with the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum BatchError {
    /// Collaborator failed or timed out
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// Collaborator answered with something that is not a triple list
    #[error("Unparseable response: {0}")]
    Parse(String),
}

impl From<CompletionError> for BatchError {
    fn from(err: CompletionError) -> Self {
        BatchError::Remote(err.to_string())
    }
}
