//! Per-batch extraction pipeline.
//!
//! sanitize -> prompt -> call (with timeout) -> parse -> filter -> dedup
//! -> cap -> stamp with the batch's message range.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use topicflow_types::{ExtractedTopic, Message};
use tracing::{debug, instrument, warn};

use crate::client::CompletionClient;
use crate::config::ExtractorConfig;
use crate::error::BatchError;
use crate::filter::{FilterReport, TripleFilter};
use crate::merge::{cap, dedup};
use crate::parse::parse_triples;
use crate::prompt::{build_request, sanitize};

/// Result of extracting one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// First message id of the batch (as given, before sanitizing)
    pub first_message_id: Option<u64>,
    /// Last message id of the batch
    pub last_message_id: Option<u64>,
    /// Surviving triples
    pub triples: Vec<ExtractedTopic>,
    /// Set when the batch failed; `triples` is then empty
    pub error: Option<BatchError>,
    /// Filter drop counts
    pub filter: FilterReport,
}

impl BatchOutcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    fn failed(mut self, error: BatchError) -> Self {
        self.triples.clear();
        self.error = Some(error);
        self
    }
}

/// LLM-backed topic extractor.
///
/// Mode-agnostic and stateless between batches; idempotence against the
/// store comes from deterministic topic ids.
pub struct TopicExtractor {
    client: Arc<dyn CompletionClient>,
    config: ExtractorConfig,
    filter: TripleFilter,
}

impl TopicExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, config: ExtractorConfig) -> Self {
        let filter = TripleFilter::new(
            config.extraction.min_confidence,
            &config.extraction.banned_terms,
        );
        Self {
            client,
            config,
            filter,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract triples from one ordered batch of messages.
    ///
    /// Never fails as a whole: remote and parse failures are reported in
    /// [`BatchOutcome::error`].
    #[instrument(skip(self, messages), fields(client = self.client.name(), count = messages.len()))]
    pub async fn extract_batch(&self, messages: &[Message]) -> BatchOutcome {
        let outcome = BatchOutcome {
            first_message_id: messages.first().map(|m| m.id),
            last_message_id: messages.last().map(|m| m.id),
            ..Default::default()
        };

        let conversational = sanitize(messages);
        if conversational.is_empty() {
            debug!("No conversational messages in batch, skipping collaborator");
            return outcome;
        }

        let extraction = &self.config.extraction;
        let request = build_request(
            &conversational,
            &extraction.banned_terms,
            extraction.max_triples_per_batch,
            self.config.temperature,
            self.config.max_tokens,
        );

        let timeout = Duration::from_secs(extraction.timeout_secs);
        let response = match tokio::time::timeout(timeout, self.client.complete(&request)).await {
            Err(_) => {
                warn!(timeout_secs = extraction.timeout_secs, "Completion timed out");
                return outcome.failed(BatchError::Remote(format!(
                    "timed out after {}s",
                    extraction.timeout_secs
                )));
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Completion failed");
                return outcome.failed(e.into());
            }
            Ok(Ok(text)) => text,
        };

        let parsed = match parse_triples(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Discarding unparseable batch");
                return outcome.failed(e);
            }
        };

        let (kept, report) = self.filter.apply(parsed);
        let merged = dedup(kept, &self.config.similarity, extraction.merged_keyword_cap);
        let capped = cap(merged, extraction.max_triples_per_batch);

        let first = outcome.first_message_id.unwrap_or(0);
        let last = outcome.last_message_id.unwrap_or(first);
        let triples: Vec<ExtractedTopic> = capped
            .into_iter()
            .map(|m| ExtractedTopic {
                triple: m.triple,
                first_message_id: first,
                last_message_id: last,
                mentions: m.mentions,
            })
            .collect();

        debug!(
            triples = triples.len(),
            dropped_generic = report.generic_label,
            dropped_low_confidence = report.low_confidence,
            "Batch extracted"
        );

        BatchOutcome {
            triples,
            filter: report,
            ..outcome
        }
    }
}
