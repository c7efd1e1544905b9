//! Storage layer for the topic-flow pipeline.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for records, cursors and messages
//! - Owner-prefixed keys so prefix scans never cross tenants
//! - Atomic writes via WriteBatch (one extraction batch = one write)
//! - Per-owner write locks for read-modify-write sequences

pub mod column_families;
pub mod cursor;
pub mod db;
pub mod error;
pub mod keys;
pub mod locks;
pub mod messages;
pub mod topics;

pub use cursor::FlowCursor;
pub use db::{BatchOp, Storage, StorageStats};
pub use error::StorageError;
pub use messages::MessageLog;
pub use topics::{ResetSummary, StoreStats, TopicStore};
