//! Per-owner processing cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use topicflow_types::OwnerId;

/// Resumption point of an owner's incremental processing.
///
/// `last_message_id` is the last message id incorporated into the owner's
/// topic graph. It only moves forward until the owner is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCursor {
    pub owner_id: OwnerId,

    /// Last incorporated message id (0 = nothing processed)
    pub last_message_id: u64,

    /// Total messages fetched across runs since creation
    pub processed_count: u64,

    /// When this cursor was first created (milliseconds since epoch)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Last advance (milliseconds since epoch)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl FlowCursor {
    /// A fresh cursor at position 0.
    pub fn new(owner_id: OwnerId) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            last_message_id: 0,
            processed_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move forward to `message_id`, counting `processed` messages.
    ///
    /// Returns false (and leaves the position alone) if `message_id` is
    /// behind the current position.
    pub fn advance(&mut self, message_id: u64, processed: u64) -> bool {
        self.processed_count = self.processed_count.saturating_add(processed);
        self.updated_at = Utc::now();
        if message_id < self.last_message_id {
            return false;
        }
        self.last_message_id = message_id;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cursor_starts_at_zero() {
        let cursor = FlowCursor::new(OwnerId::parse("u1").unwrap());
        assert_eq!(cursor.last_message_id, 0);
        assert_eq!(cursor.processed_count, 0);
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut cursor = FlowCursor::new(OwnerId::parse("u1").unwrap());
        assert!(cursor.advance(10, 10));
        assert!(!cursor.advance(5, 0));
        assert_eq!(cursor.last_message_id, 10);
        assert!(cursor.advance(10, 0));
        assert_eq!(cursor.processed_count, 10);
    }

    #[test]
    fn test_cursor_serialization() {
        let mut cursor = FlowCursor::new(OwnerId::parse("u1").unwrap());
        cursor.advance(3, 3);
        let bytes = serde_json::to_vec(&cursor).unwrap();
        let decoded: FlowCursor = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.last_message_id, 3);
        assert_eq!(decoded.owner_id, cursor.owner_id);
    }
}
