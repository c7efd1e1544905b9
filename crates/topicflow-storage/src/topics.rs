//! Owner-scoped topic store.
//!
//! Manages topic records and cursors in the `topics` and `cursors` column
//! families. Every read-modify-write runs under the owner's write lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use topicflow_types::topic::{collapse_observations, owner_of_topic_id};
use topicflow_types::{OwnerId, TopicId, TopicObservation, TopicRecord};
use tracing::{debug, info, instrument, warn};

use crate::column_families::{CF_CURSORS, CF_TOPICS};
use crate::cursor::FlowCursor;
use crate::db::{BatchOp, Storage};
use crate::error::StorageError;
use crate::keys::{cursor_key, topic_key, topic_prefix};
use crate::locks::{acquire, OwnerLocks};

/// Default keyword cap per record.
pub const DEFAULT_MAX_KEYWORDS: usize = 15;

/// Per-owner store statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub record_count: usize,
    /// Distinct unordered co-occurring pairs
    pub co_occurrence_pairs: usize,
    pub cursor: u64,
}

/// What `reset` removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub records_deleted: usize,
    pub cursor_cleared: bool,
}

/// Topic store interface.
pub struct TopicStore {
    storage: Arc<Storage>,
    locks: OwnerLocks,
    max_keywords: usize,
}

impl TopicStore {
    /// Create a new topic store over shared storage.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            locks: OwnerLocks::new(),
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }

    /// Override the per-record keyword cap.
    pub fn with_max_keywords(mut self, max_keywords: usize) -> Self {
        self.max_keywords = max_keywords.max(1);
        self
    }

    /// Get underlying storage.
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    fn decode(&self, owner: &OwnerId, bytes: &[u8]) -> Result<TopicRecord, StorageError> {
        let record: TopicRecord = serde_json::from_slice(bytes)?;
        if record.owner_id != *owner {
            warn!(
                owner = %owner,
                found = %record.owner_id,
                topic_id = %record.topic_id,
                "Stored record belongs to another owner"
            );
            return Err(StorageError::OwnerMismatch {
                expected: owner.to_string(),
                found: record.owner_id.to_string(),
            });
        }
        Ok(record)
    }

    fn load(&self, owner: &OwnerId, topic_id: &str) -> Result<Option<TopicRecord>, StorageError> {
        let key = topic_key(owner, topic_id);
        match self.storage.get(CF_TOPICS, key.as_bytes())? {
            Some(bytes) => Ok(Some(self.decode(owner, &bytes)?)),
            None => Ok(None),
        }
    }

    fn check_owner(owner: &OwnerId, record: &TopicRecord) -> Result<(), StorageError> {
        let id_owner = owner_of_topic_id(&record.topic_id).unwrap_or_default();
        if record.owner_id != *owner || id_owner != owner.as_str() {
            return Err(StorageError::OwnerMismatch {
                expected: owner.to_string(),
                found: if record.owner_id != *owner {
                    record.owner_id.to_string()
                } else {
                    id_owner.to_string()
                },
            });
        }
        Ok(())
    }

    // --- Topic records ---

    /// Record one observation of a triple.
    ///
    /// Inserts with frequency 1 or merges into the existing record.
    #[instrument(skip(self, observation), fields(owner = %owner))]
    pub fn upsert(
        &self,
        owner: &OwnerId,
        observation: &TopicObservation,
    ) -> Result<TopicRecord, StorageError> {
        let mut records = self.upsert_batch(owner, std::slice::from_ref(observation))?;
        records
            .pop()
            .ok_or_else(|| StorageError::InvalidInput("empty upsert".to_string()))
    }

    /// Record all observations of one extraction batch in a single atomic
    /// write.
    ///
    /// Observations resolving to the same topic id are collapsed first, so a
    /// batch adds at most one to each record's frequency and one to each
    /// co-occurrence count. Returns the resulting records in first-touch
    /// order.
    #[instrument(skip(self, observations), fields(owner = %owner, count = observations.len()))]
    pub fn upsert_batch(
        &self,
        owner: &OwnerId,
        observations: &[TopicObservation],
    ) -> Result<Vec<TopicRecord>, StorageError> {
        if observations.is_empty() {
            return Ok(Vec::new());
        }
        let collapsed = collapse_observations(owner, observations);
        if collapsed.len() < observations.len() {
            debug!(
                raw = observations.len(),
                distinct = collapsed.len(),
                "Collapsed repeated topic ids within batch"
            );
        }

        let lock = self.locks.handle(owner);
        let _guard = acquire(&lock);

        let now = Utc::now();
        let mut touched: BTreeMap<TopicId, TopicRecord> = BTreeMap::new();
        let mut order: Vec<TopicId> = Vec::with_capacity(collapsed.len());

        for (topic_id, observation) in &collapsed {
            let record = match self.load(owner, topic_id)? {
                Some(mut existing) => {
                    existing.observe(observation, self.max_keywords, now);
                    existing
                }
                None => TopicRecord::first_observed(owner, observation, self.max_keywords, now),
            };
            order.push(topic_id.clone());
            touched.insert(topic_id.clone(), record);
        }

        // Topics from earlier windows are linked back without being
        // re-observed.
        let mut linked: Vec<TopicRecord> = Vec::new();
        for (topic_id, observation) in &collapsed {
            for other in &observation.co_occurring {
                if touched.contains_key(other) || other == topic_id {
                    continue;
                }
                if let Some(record) = linked.iter_mut().find(|r| r.topic_id == *other) {
                    record.link_with(topic_id, now);
                    continue;
                }
                match self.load(owner, other)? {
                    Some(mut record) => {
                        record.link_with(topic_id, now);
                        linked.push(record);
                    }
                    None => debug!(topic_id = %other, "Co-occurring topic not stored, skipping back-link"),
                }
            }
        }

        let mut ops = Vec::with_capacity(order.len());
        let mut results = Vec::with_capacity(order.len());
        for topic_id in order {
            if let Some(record) = touched.remove(&topic_id) {
                ops.push(BatchOp::Put {
                    cf: CF_TOPICS,
                    key: topic_key(owner, &topic_id).into_bytes(),
                    value: serde_json::to_vec(&record)?,
                });
                results.push(record);
            }
        }
        for record in &linked {
            ops.push(BatchOp::Put {
                cf: CF_TOPICS,
                key: topic_key(owner, &record.topic_id).into_bytes(),
                value: serde_json::to_vec(record)?,
            });
        }

        self.storage.write_batch(&ops)?;
        debug!(records = results.len(), "Upserted topic batch");
        Ok(results)
    }

    /// Get one record.
    #[instrument(skip(self))]
    pub fn get(&self, owner: &OwnerId, topic_id: &str) -> Result<Option<TopicRecord>, StorageError> {
        self.load(owner, topic_id)
    }

    /// Every record of the owner, ordered by (first_seen_message_id, topic_id).
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn get_all(&self, owner: &OwnerId) -> Result<Vec<TopicRecord>, StorageError> {
        let prefix = topic_prefix(owner);
        let mut records = Vec::new();

        for (_, value) in self.storage.prefix_iterator(CF_TOPICS, prefix.as_bytes())? {
            records.push(self.decode(owner, &value)?);
        }

        records.sort_by(|a, b| {
            a.first_seen_message_id
                .cmp(&b.first_seen_message_id)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        Ok(records)
    }

    /// Write a record as-is.
    ///
    /// Rejected when the record, or its id, belongs to another owner.
    #[instrument(skip(self, record), fields(owner = %owner, topic_id = %record.topic_id))]
    pub fn put_record(&self, owner: &OwnerId, record: &TopicRecord) -> Result<(), StorageError> {
        Self::check_owner(owner, record)?;

        let lock = self.locks.handle(owner);
        let _guard = acquire(&lock);

        let key = topic_key(owner, &record.topic_id);
        let value = serde_json::to_vec(record)?;
        self.storage.put(CF_TOPICS, key.as_bytes(), &value)?;
        debug!("Saved topic record");
        Ok(())
    }

    // --- Cursor ---

    /// Full cursor document, if the owner has one.
    pub fn cursor(&self, owner: &OwnerId) -> Result<Option<FlowCursor>, StorageError> {
        let key = cursor_key(owner);
        match self.storage.get(CF_CURSORS, key.as_bytes())? {
            Some(bytes) => {
                let cursor: FlowCursor = serde_json::from_slice(&bytes)?;
                if cursor.owner_id != *owner {
                    return Err(StorageError::OwnerMismatch {
                        expected: owner.to_string(),
                        found: cursor.owner_id.to_string(),
                    });
                }
                Ok(Some(cursor))
            }
            None => Ok(None),
        }
    }

    /// Last incorporated message id (0 when nothing was processed).
    pub fn get_cursor(&self, owner: &OwnerId) -> Result<u64, StorageError> {
        Ok(self
            .cursor(owner)?
            .map(|c| c.last_message_id)
            .unwrap_or(0))
    }

    /// Advance the cursor. A value behind the current position is ignored.
    ///
    /// Returns the effective cursor after the call.
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn set_cursor(
        &self,
        owner: &OwnerId,
        message_id: u64,
        processed: u64,
    ) -> Result<u64, StorageError> {
        let lock = self.locks.handle(owner);
        let _guard = acquire(&lock);

        let mut cursor = self
            .cursor(owner)?
            .unwrap_or_else(|| FlowCursor::new(owner.clone()));

        if !cursor.advance(message_id, processed) {
            warn!(
                current = cursor.last_message_id,
                requested = message_id,
                "Ignoring cursor regression"
            );
        }

        let value = serde_json::to_vec(&cursor)?;
        self.storage
            .put(CF_CURSORS, cursor_key(owner).as_bytes(), &value)?;
        debug!(cursor = cursor.last_message_id, "Cursor saved");
        Ok(cursor.last_message_id)
    }

    // --- Reset & stats ---

    /// Delete every record of the owner and its cursor in one batch.
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn reset(&self, owner: &OwnerId) -> Result<ResetSummary, StorageError> {
        let lock = self.locks.handle(owner);
        let _guard = acquire(&lock);

        let prefix = topic_prefix(owner);
        let mut ops: Vec<BatchOp> = self
            .storage
            .prefix_iterator(CF_TOPICS, prefix.as_bytes())?
            .into_iter()
            .map(|(key, _)| BatchOp::Delete { cf: CF_TOPICS, key })
            .collect();
        let records_deleted = ops.len();

        let cursor_key = cursor_key(owner);
        let cursor_cleared = self.storage.get(CF_CURSORS, cursor_key.as_bytes())?.is_some();
        ops.push(BatchOp::Delete {
            cf: CF_CURSORS,
            key: cursor_key.into_bytes(),
        });

        self.storage.write_batch(&ops)?;
        info!(records_deleted, cursor_cleared, "Owner reset");
        Ok(ResetSummary {
            records_deleted,
            cursor_cleared,
        })
    }

    /// Record count and co-occurrence pair count for the owner.
    pub fn stats(&self, owner: &OwnerId) -> Result<StoreStats, StorageError> {
        let records = self.get_all(owner)?;
        let mut pairs = std::collections::BTreeSet::new();
        for record in &records {
            for other in record.co_occurrence.keys() {
                let pair = if record.topic_id < *other {
                    (record.topic_id.as_str(), other.as_str())
                } else {
                    (other.as_str(), record.topic_id.as_str())
                };
                pairs.insert(pair);
            }
        }
        Ok(StoreStats {
            record_count: records.len(),
            co_occurrence_pairs: pairs.len(),
            cursor: self.get_cursor(owner)?,
        })
    }
}
