//! # topicflow-types
//!
//! Shared domain types for the topic-flow pipeline.
//!
//! This crate defines the core data structures used throughout the system:
//! - Owners: validated tenant identifiers
//! - Messages: the conversation log consumed by extraction
//! - Topics: label triples, observations and persisted records
//! - Graph: the derived node/edge projection and its stats
//! - Similarity: metrics shared by deduplication and color reuse
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use topicflow_types::{OwnerId, TopicTriple};
//!
//! let owner = OwnerId::parse("u1").unwrap();
//! let triple = TopicTriple::new("D3 Visualization", "Force Layout", "Link Springs", 0.9);
//! assert_eq!(triple.topic_id(&owner), "u1::d3-visualization::force-layout::link-springs");
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod message;
pub mod owner;
pub mod similarity;
pub mod topic;

pub use config::{
    load_layered, CompletionSettings, CursorPolicy, ExtractionSettings, FlowSettings, Settings,
    StoreSettings,
};
pub use error::TopicFlowError;
pub use graph::{round2, Edge, EdgeKind, GraphProjection, GraphSnapshot, GraphStats, Node, NodeLevel};
pub use message::{Message, MessageRole};
pub use owner::OwnerId;
pub use similarity::{similarity, SimilarityConfig, SimilarityMetric, TopicSignature};
pub use topic::{
    collapse_observations, merge_keywords, normalize_label, topic_id, ExtractedTopic, TopicId,
    TopicObservation, TopicRecord, TopicTriple,
};
