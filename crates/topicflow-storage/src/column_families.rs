//! Column family definitions for RocksDB.
//!
//! - topics: owner-scoped topic records (default compaction)
//! - cursors: per-owner resumption cursors (default compaction)
//! - messages: append-only per-owner message log (compressed)

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for topic records
pub const CF_TOPICS: &str = "topics";

/// Column family name for processing cursors
pub const CF_CURSORS: &str = "cursors";

/// Column family name for the message log
pub const CF_MESSAGES: &str = "messages";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_TOPICS, CF_CURSORS, CF_MESSAGES];

/// Options for the message log (append-only, compressed)
fn messages_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_TOPICS, Options::default()),
        ColumnFamilyDescriptor::new(CF_CURSORS, Options::default()),
        ColumnFamilyDescriptor::new(CF_MESSAGES, messages_options()),
    ]
}
