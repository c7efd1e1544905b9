//! Key encoding for the storage layer.
//!
//! All keys are owner-prefixed:
//! - `topic:{owner}:{topic_id}`
//! - `cursor:{owner}`
//! - `msg:{owner}:{id:020}`
//!
//! Owner ids never contain `:`, so `{prefix}:{owner}:` selects exactly one
//! owner's keys in a prefix scan. Message ids are zero-padded to 20 digits
//! for lexicographic ordering.

use topicflow_types::OwnerId;

use crate::error::StorageError;

/// Key for a topic record
pub fn topic_key(owner: &OwnerId, topic_id: &str) -> String {
    format!("topic:{}:{}", owner, topic_id)
}

/// Prefix covering every topic record of one owner
pub fn topic_prefix(owner: &OwnerId) -> String {
    format!("topic:{}:", owner)
}

/// Key for an owner's cursor
pub fn cursor_key(owner: &OwnerId) -> String {
    format!("cursor:{}", owner)
}

/// Key for a message in an owner's log
/// Format: msg:{owner}:{id:020}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKey {
    pub owner: String,
    pub id: u64,
}

impl MessageKey {
    pub fn new(owner: &OwnerId, id: u64) -> Self {
        Self {
            owner: owner.to_string(),
            id,
        }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("msg:{}:{:020}", self.owner, self.id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts[0] != "msg" {
            return Err(StorageError::Key(format!("Invalid message key format: {}", s)));
        }

        let id: u64 = parts[2]
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid message id: {}", e)))?;

        Ok(Self {
            owner: parts[1].to_string(),
            id,
        })
    }

    /// Prefix covering every message of one owner
    pub fn owner_prefix(owner: &OwnerId) -> Vec<u8> {
        format!("msg:{}:", owner).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(raw: &str) -> OwnerId {
        OwnerId::parse(raw).unwrap()
    }

    #[test]
    fn test_topic_key_format() {
        let key = topic_key(&owner("u1"), "u1::a::b::c");
        assert_eq!(key, "topic:u1:u1::a::b::c");
        assert!(key.starts_with(&topic_prefix(&owner("u1"))));
    }

    #[test]
    fn test_owner_prefixes_do_not_overlap() {
        // "u1" must not match "u10"
        let key = topic_key(&owner("u10"), "u10::a::b::c");
        assert!(!key.starts_with(&topic_prefix(&owner("u1"))));
    }

    #[test]
    fn test_message_key_roundtrip() {
        let key = MessageKey::new(&owner("u1"), 42);
        let bytes = key.to_bytes();
        assert_eq!(bytes, b"msg:u1:00000000000000000042".to_vec());
        assert_eq!(MessageKey::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn test_message_key_ordering() {
        let a = MessageKey::new(&owner("u1"), 9).to_bytes();
        let b = MessageKey::new(&owner("u1"), 10).to_bytes();
        assert!(a < b);
    }

    #[test]
    fn test_message_key_rejects_garbage() {
        assert!(MessageKey::from_bytes(b"evt:u1:1").is_err());
        assert!(MessageKey::from_bytes(b"msg:u1:abc").is_err());
    }
}
