//! Topic store error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Missing column family {0}")]
    ColumnFamilyNotFound(String),

    /// A stored key could not be decoded
    #[error("Malformed key: {0}")]
    Key(String),

    /// A stored value is not a valid JSON document
    #[error("Corrupt value: {0}")]
    Serialization(String),

    /// A record was written or read under the wrong owner
    #[error("Record owned by {found} was accessed as {expected}")]
    OwnerMismatch { expected: String, found: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
