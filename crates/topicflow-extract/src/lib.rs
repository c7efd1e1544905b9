//! # topicflow-extract
//!
//! Hierarchical topic extraction from conversation batches.
//!
//! A pluggable [`CompletionClient`] is asked for (topic, subtopic,
//! subsubtopic) triples; the response is parsed, filtered for generic or
//! low-confidence labels, deduplicated and capped. Failures of one batch
//! never abort a run: they are reported in [`BatchOutcome::error`].

pub mod api;
pub mod client;
pub mod config;
pub mod cooccurrence;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod merge;
pub mod mock;
pub mod parse;
pub mod prompt;

pub use api::{ApiCompletionClient, ApiCompletionConfig};
pub use client::{build_client, CompletionClient, CompletionRequest, NoOpCompletionClient};
pub use config::ExtractorConfig;
pub use cooccurrence::CoOccurrenceWindow;
pub use error::{BatchError, CompletionError};
pub use extractor::{BatchOutcome, TopicExtractor};
pub use filter::{FilterReport, TripleFilter};
pub use mock::{MockCompletionClient, MockReply};
