//! Message source seam.
//!
//! The orchestrator only reads conversation history through
//! [`MessageSource`]; where the messages live is up to the implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use topicflow_storage::MessageLog;
use topicflow_types::{Message, MessageRole, OwnerId};

use crate::error::ServiceError;

/// Ordered, owner-scoped conversation history.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages with `id > after_id`, in ascending id order.
    async fn messages_after(&self, owner: &OwnerId, after_id: u64) -> Result<Vec<Message>, ServiceError>;
}

/// Source backed by the RocksDB message log.
pub struct StoredMessageSource {
    log: Arc<MessageLog>,
}

impl StoredMessageSource {
    pub fn new(log: Arc<MessageLog>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<MessageLog> {
        &self.log
    }
}

#[async_trait]
impl MessageSource for StoredMessageSource {
    async fn messages_after(&self, owner: &OwnerId, after_id: u64) -> Result<Vec<Message>, ServiceError> {
        Ok(self.log.messages_after(owner, after_id)?)
    }
}

/// Volatile source, mostly for tests and demos.
#[derive(Default)]
pub struct InMemoryMessageSource {
    messages: RwLock<HashMap<OwnerId, Vec<Message>>>,
}

impl InMemoryMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning the owner's next id.
    pub fn push(&self, owner: &OwnerId, role: MessageRole, text: impl Into<String>) -> Result<Message, ServiceError> {
        let mut guard = self
            .messages
            .write()
            .map_err(|_| ServiceError::Source("message source lock poisoned".to_string()))?;
        let entries = guard.entry(owner.clone()).or_default();
        let id = entries.last().map(|m| m.id + 1).unwrap_or(1);
        let message = Message::new(id, role, text);
        entries.push(message.clone());
        Ok(message)
    }

    /// Number of messages held for the owner.
    pub fn len(&self, owner: &OwnerId) -> usize {
        self.messages
            .read()
            .map(|m| m.get(owner).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, owner: &OwnerId) -> bool {
        self.len(owner) == 0
    }
}

#[async_trait]
impl MessageSource for InMemoryMessageSource {
    async fn messages_after(&self, owner: &OwnerId, after_id: u64) -> Result<Vec<Message>, ServiceError> {
        let guard = self
            .messages
            .read()
            .map_err(|_| ServiceError::Source("message source lock poisoned".to_string()))?;
        Ok(guard
            .get(owner)
            .map(|all| all.iter().filter(|m| m.id > after_id).cloned().collect())
            .unwrap_or_default())
    }
}
