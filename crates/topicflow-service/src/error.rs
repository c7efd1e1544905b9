//! Service layer error types.

use thiserror::Error;
use topicflow_storage::StorageError;
use topicflow_types::TopicFlowError;

/// Errors surfaced by the flow orchestrator and the HTTP API.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Owner id missing or malformed; rejected before any store access
    #[error("Invalid owner id: {0}")]
    InvalidOwner(String),

    /// Invalid request parameter
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Topic store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Message source failure
    #[error("Message source error: {0}")]
    Source(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TopicFlowError> for ServiceError {
    fn from(err: TopicFlowError) -> Self {
        match err {
            TopicFlowError::InvalidOwner(msg) => ServiceError::InvalidOwner(msg),
            TopicFlowError::InvalidInput(msg) => ServiceError::InvalidRequest(msg),
            TopicFlowError::Config(msg) => ServiceError::Config(msg),
            TopicFlowError::Serialization(e) => ServiceError::Internal(e.to_string()),
        }
    }
}

impl ServiceError {
    /// True for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidOwner(_) | ServiceError::InvalidRequest(_))
    }
}
