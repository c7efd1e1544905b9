//! Error types shared across the topic-flow workspace.

use thiserror::Error;

/// Unified error type for domain-level validation and configuration.
#[derive(Debug, Error)]
pub enum TopicFlowError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Owner identifier missing or malformed
    #[error("Invalid owner id: {0}")]
    InvalidOwner(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
