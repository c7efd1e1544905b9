//! Flow orchestrator.
//!
//! Drives one owner's update run: fetch messages past the cursor, extract
//! batches sequentially, persist each batch atomically, advance the cursor
//! according to the configured policy, then project the stored records.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use topicflow_extract::{BatchError, CoOccurrenceWindow, TopicExtractor};
use topicflow_storage::TopicStore;
use topicflow_types::{
    CursorPolicy, FlowSettings, GraphProjection, GraphSnapshot, GraphStats, Message, OwnerId,
    TopicId, TopicObservation,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ServiceError;
use crate::mode::{FlowState, UpdateMode};
use crate::projection::{compute_stats, project};
use crate::source::MessageSource;

/// A batch whose extraction failed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedBatch {
    pub first_message_id: u64,
    pub last_message_id: u64,
    pub error: BatchError,
}

/// Result of one `update` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    #[serde(flatten)]
    pub graph: GraphProjection,
    pub stats: GraphStats,
    /// Messages fetched by this run
    pub processed_count: usize,
    pub mode: UpdateMode,
    /// Number of batches whose extraction failed
    pub failed_batches: usize,
    pub batch_errors: Vec<FailedBatch>,
    /// Cursor after the run
    pub cursor: u64,
}

/// Coordinates the message source, extractor and topic store.
pub struct FlowOrchestrator {
    store: Arc<TopicStore>,
    source: Arc<dyn MessageSource>,
    extractor: TopicExtractor,
    settings: FlowSettings,
    run_locks: DashMap<OwnerId, Arc<Mutex<()>>>,
    states: DashMap<OwnerId, FlowState>,
}

impl FlowOrchestrator {
    pub fn new(
        store: Arc<TopicStore>,
        source: Arc<dyn MessageSource>,
        extractor: TopicExtractor,
        settings: FlowSettings,
    ) -> Self {
        Self {
            store,
            source,
            extractor,
            settings,
            run_locks: DashMap::new(),
            states: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<TopicStore> {
        &self.store
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Stage of the owner's latest run (`Idle` if it never ran).
    pub fn state(&self, owner: &OwnerId) -> FlowState {
        self.states.get(owner).map(|s| *s).unwrap_or_default()
    }

    fn set_state(&self, owner: &OwnerId, state: FlowState) {
        debug!(owner = %owner, ?state, "Flow state");
        self.states.insert(owner.clone(), state);
    }

    fn run_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        self.run_locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Incorporate new messages into the owner's topic graph.
    ///
    /// Runs for the same owner are serialized; different owners proceed
    /// independently.
    #[instrument(skip(self), fields(owner = %owner, mode = %mode))]
    pub async fn update(&self, owner: &OwnerId, mode: UpdateMode) -> Result<UpdateOutcome, ServiceError> {
        let lock = self.run_lock(owner);
        let _guard = lock.lock().await;

        match self.run(owner, mode).await {
            Ok(outcome) => {
                self.set_state(owner, FlowState::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Update failed");
                self.set_state(owner, FlowState::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, owner: &OwnerId, mode: UpdateMode) -> Result<UpdateOutcome, ServiceError> {
        self.set_state(owner, FlowState::Fetching);
        let start = match mode {
            UpdateMode::Full => {
                let summary = self.store.reset(owner)?;
                info!(records_deleted = summary.records_deleted, "Full recompute, owner reset");
                0
            }
            UpdateMode::Incremental => self.store.get_cursor(owner)?,
        };

        let messages = self.source.messages_after(owner, start).await?;
        let processed_count = messages.len();
        info!(start, processed_count, "Fetched messages");

        if messages.is_empty() {
            self.set_state(owner, FlowState::Projecting);
            let snapshot = self.snapshot(owner)?;
            return Ok(UpdateOutcome {
                graph: snapshot.graph,
                stats: snapshot.stats,
                processed_count: 0,
                mode,
                failed_batches: 0,
                batch_errors: Vec::new(),
                cursor: start,
            });
        }

        let batch_errors = self.process_batches(owner, start, &messages).await?;

        let highest = messages.last().map(|m| m.id).unwrap_or(start);
        let target = self.cursor_target(start, highest, &messages, &batch_errors);
        let cursor = self
            .store
            .set_cursor(owner, target, processed_count as u64)?;

        self.set_state(owner, FlowState::Projecting);
        let snapshot = self.snapshot(owner)?;

        info!(
            processed_count,
            failed_batches = batch_errors.len(),
            cursor,
            nodes = snapshot.graph.nodes.len(),
            "Update complete"
        );

        Ok(UpdateOutcome {
            graph: snapshot.graph,
            stats: snapshot.stats,
            processed_count,
            mode,
            failed_batches: batch_errors.len(),
            batch_errors,
            cursor,
        })
    }

    /// Extract and persist every batch in order.
    ///
    /// Under `HoldAtFailure` the run stops at the first failed batch, so the
    /// messages left for the next run have never been counted. A
    /// persistence failure is fatal; the cursor is moved to the last safely
    /// incorporated message before the error is returned.
    async fn process_batches(
        &self,
        owner: &OwnerId,
        start: u64,
        messages: &[Message],
    ) -> Result<Vec<FailedBatch>, ServiceError> {
        let mut window = CoOccurrenceWindow::new(self.settings.co_occurrence_window);
        let mut failures: Vec<FailedBatch> = Vec::new();
        let mut persisted_through = start;

        for batch in messages.chunks(self.settings.batch_size.max(1)) {
            self.set_state(owner, FlowState::Extracting);
            let outcome = self.extractor.extract_batch(batch).await;
            let first = batch.first().map(|m| m.id).unwrap_or(start);
            let last = batch.last().map(|m| m.id).unwrap_or(first);

            if let Some(err) = outcome.error {
                failures.push(FailedBatch {
                    first_message_id: first,
                    last_message_id: last,
                    error: err,
                });
                if self.settings.cursor_policy == CursorPolicy::HoldAtFailure {
                    warn!(first, last, "Batch failed, holding remaining messages for the next run");
                    break;
                }
                warn!(first, last, "Batch failed, skipping");
                window.observe(&[]);
                continue;
            }

            self.set_state(owner, FlowState::Persisting);
            let ids: Vec<TopicId> = outcome
                .triples
                .iter()
                .map(|t| t.triple.topic_id(owner))
                .collect();
            let links = window.observe(&ids);
            let observations: Vec<TopicObservation> = outcome
                .triples
                .iter()
                .zip(&ids)
                .map(|(t, id)| TopicObservation::from_extracted(t, links.get(id).cloned().unwrap_or_default()))
                .collect();

            if let Err(e) = self.store.upsert_batch(owner, &observations) {
                let safe = self.cursor_target(start, persisted_through, messages, &failures);
                if let Err(cursor_err) = self.store.set_cursor(owner, safe, 0) {
                    warn!(error = %cursor_err, "Could not save cursor after persistence failure");
                }
                return Err(e.into());
            }
            persisted_through = last;
            debug!(first, last, topics = observations.len(), "Batch persisted");
        }

        Ok(failures)
    }

    /// Cursor position after a run that reached `highest`.
    fn cursor_target(&self, start: u64, highest: u64, messages: &[Message], failures: &[FailedBatch]) -> u64 {
        match (self.settings.cursor_policy, failures.first()) {
            (CursorPolicy::HoldAtFailure, Some(first_failure)) => messages
                .iter()
                .map(|m| m.id)
                .take_while(|id| *id < first_failure.first_message_id)
                .last()
                .unwrap_or(start)
                .min(highest),
            _ => highest,
        }
    }

    fn snapshot(&self, owner: &OwnerId) -> Result<GraphSnapshot, ServiceError> {
        let records = self.store.get_all(owner)?;
        Ok(GraphSnapshot {
            graph: project(&records),
            stats: compute_stats(&records),
        })
    }

    /// Current graph and stats without side effects.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn get_current(&self, owner: &OwnerId) -> Result<GraphSnapshot, ServiceError> {
        self.snapshot(owner)
    }

    /// Delete every record and the cursor of the owner.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn reset(&self, owner: &OwnerId) -> Result<(), ServiceError> {
        let lock = self.run_lock(owner);
        let _guard = lock.lock().await;
        let summary = self.store.reset(owner)?;
        self.set_state(owner, FlowState::Idle);
        info!(records_deleted = summary.records_deleted, "Topic flow reset");
        Ok(())
    }
}
