//! # topicflow-service
//!
//! Flow orchestration over the topic store and extractor, graph projection,
//! and the HTTP API.

pub mod api;
pub mod error;
pub mod mode;
pub mod orchestrator;
pub mod projection;
pub mod server;
pub mod source;

pub use api::{build_router, AppState};
pub use error::ServiceError;
pub use mode::{FlowState, UpdateMode};
pub use orchestrator::{FailedBatch, FlowOrchestrator, UpdateOutcome};
pub use projection::{compute_stats, project};
pub use server::{run_server_with_shutdown, serve_listener};
pub use source::{InMemoryMessageSource, MessageSource, StoredMessageSource};
