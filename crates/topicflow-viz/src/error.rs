//! Visualizer error types.

use thiserror::Error;

/// Errors that can occur while laying out or interacting with a graph.
#[derive(Debug, Error)]
pub enum VizError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Color string is not `#rrggbb`
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Node id not present in the scene
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Operation not allowed on this node kind
    #[error("Node {id} cannot be moved: {reason}")]
    Immovable { id: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
