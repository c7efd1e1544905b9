//! Per-owner message log.
//!
//! Messages are stored under `msg:{owner}:{id:020}` so a prefix scan yields
//! them in id order. Ids are assigned on append and strictly increase.

use std::sync::Arc;

use topicflow_types::{Message, MessageRole, OwnerId};
use tracing::{debug, info, instrument};

use crate::column_families::CF_MESSAGES;
use crate::db::Storage;
use crate::error::StorageError;
use crate::keys::MessageKey;
use crate::locks::{acquire, OwnerLocks};

/// Append-only message log.
pub struct MessageLog {
    storage: Arc<Storage>,
    locks: OwnerLocks,
}

impl MessageLog {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            locks: OwnerLocks::new(),
        }
    }

    /// Highest message id of the owner (0 when empty).
    pub fn last_id(&self, owner: &OwnerId) -> Result<u64, StorageError> {
        let prefix = MessageKey::owner_prefix(owner);
        match self.storage.last_with_prefix(CF_MESSAGES, &prefix)? {
            Some((key, _)) => Ok(MessageKey::from_bytes(&key)?.id),
            None => Ok(0),
        }
    }

    /// Append a message, assigning the next id.
    #[instrument(skip(self, text), fields(owner = %owner, role = %role))]
    pub fn append(
        &self,
        owner: &OwnerId,
        role: MessageRole,
        text: &str,
    ) -> Result<Message, StorageError> {
        let lock = self.locks.handle(owner);
        let _guard = acquire(&lock);

        let id = self.last_id(owner)? + 1;
        let message = Message::new(id, role, text);
        let key = MessageKey::new(owner, id);
        self.storage
            .put(CF_MESSAGES, &key.to_bytes(), &serde_json::to_vec(&message)?)?;
        debug!(id, "Appended message");
        Ok(message)
    }

    /// Messages with `id > after_id`, in id order.
    pub fn messages_after(&self, owner: &OwnerId, after_id: u64) -> Result<Vec<Message>, StorageError> {
        let prefix = MessageKey::owner_prefix(owner);
        let start = MessageKey::new(owner, after_id.saturating_add(1)).to_bytes();

        let mut messages = Vec::new();
        for (_, value) in self.storage.range_from(CF_MESSAGES, &prefix, &start)? {
            let message: Message = serde_json::from_slice(&value)?;
            if message.id > after_id {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    /// Number of messages logged for the owner.
    pub fn count(&self, owner: &OwnerId) -> Result<usize, StorageError> {
        let prefix = MessageKey::owner_prefix(owner);
        Ok(self.storage.prefix_iterator(CF_MESSAGES, &prefix)?.len())
    }

    /// Remove every message of the owner.
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn clear(&self, owner: &OwnerId) -> Result<usize, StorageError> {
        let lock = self.locks.handle(owner);
        let _guard = acquire(&lock);

        let prefix = MessageKey::owner_prefix(owner);
        let deleted = self.storage.delete_prefix(CF_MESSAGES, &prefix)?;
        info!(deleted, "Cleared message log");
        Ok(deleted)
    }
}
