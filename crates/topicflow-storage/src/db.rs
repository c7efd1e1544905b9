//! RocksDB wrapper for topicflow storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Atomic write batches across column families
//! - Single-key and prefix reads

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info};

use crate::column_families::{build_cf_descriptors, CF_CURSORS, CF_MESSAGES, CF_TOPICS};
use crate::error::StorageError;

/// One operation of an atomic write batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put {
        cf: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf: &'static str,
        key: Vec<u8>,
    },
}

/// Main storage interface for topicflow
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, cf_name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    /// Put a value into a specific column family.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    /// Get a value from a specific column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(cf_name)?;
        let result = self.db.get_cf(cf, key)?;
        Ok(result)
    }

    /// Delete a value from a specific column family.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    /// Iterate over entries with a given prefix in a column family.
    ///
    /// Returns (key, value) pairs in key order.
    #[allow(clippy::type_complexity)]
    pub fn prefix_iterator(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        self.range_from(cf_name, prefix, prefix)
    }

    /// Iterate over entries with a given prefix, starting at `start`
    /// (inclusive).
    #[allow(clippy::type_complexity)]
    pub fn range_from(
        &self,
        cf_name: &str,
        prefix: &[u8],
        start: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;

        let mut results = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(start, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    /// Last entry under a prefix, if any.
    #[allow(clippy::type_complexity)]
    pub fn last_with_prefix(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;

        // Seek to the first key past the prefix, then step back.
        let mut upper = prefix.to_vec();
        upper.push(0xFF);
        let mut iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&upper, Direction::Reverse));

        if let Some(item) = iter.next() {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                return Ok(Some((key.to_vec(), value.to_vec())));
            }
        }
        Ok(None)
    }

    /// Apply a set of writes atomically.
    pub fn write_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put { cf, key, value } => batch.put_cf(self.cf(cf)?, key, value),
                BatchOp::Delete { cf, key } => batch.delete_cf(self.cf(cf)?, key),
            }
        }

        self.db.write(batch)?;
        debug!(ops = ops.len(), "Applied write batch");
        Ok(())
    }

    /// Delete every key under a prefix in one batch. Returns the number of
    /// deleted keys.
    pub fn delete_prefix(&self, cf_name: &'static str, prefix: &[u8]) -> Result<usize, StorageError> {
        let ops: Vec<BatchOp> = self
            .prefix_iterator(cf_name, prefix)?
            .into_iter()
            .map(|(key, _)| BatchOp::Delete { cf: cf_name, key })
            .collect();
        let count = ops.len();
        self.write_batch(&ops)?;
        Ok(count)
    }

    /// Flush all memtables to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in [CF_TOPICS, CF_CURSORS, CF_MESSAGES] {
            let cf = self.cf(cf_name)?;
            self.db.flush_cf(cf)?;
        }
        Ok(())
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats {
            topic_count: self.count_cf_entries(CF_TOPICS)?,
            cursor_count: self.count_cf_entries(CF_CURSORS)?,
            message_count: self.count_cf_entries(CF_MESSAGES)?,
            disk_usage_bytes: self.get_disk_usage(),
        })
    }

    fn count_cf_entries(&self, cf_name: &str) -> Result<u64, StorageError> {
        let cf = self.cf(cf_name)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        let mut total_size = 0u64;
        if let Ok(entries) = std::fs::read_dir(self.db.path()) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    total_size += metadata.len();
                }
            }
        }
        total_size
    }
}

/// Statistics about the storage.
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Number of topic records (all owners)
    pub topic_count: u64,
    /// Number of cursors (all owners)
    pub cursor_count: u64,
    /// Number of logged messages (all owners)
    pub message_count: u64,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_families::ALL_CF_NAMES;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_put_get_delete() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_TOPICS, b"k", b"v").unwrap();
        assert_eq!(storage.get(CF_TOPICS, b"k").unwrap(), Some(b"v".to_vec()));
        storage.delete(CF_TOPICS, b"k").unwrap();
        assert_eq!(storage.get(CF_TOPICS, b"k").unwrap(), None);
    }

    #[test]
    fn test_unknown_column_family() {
        let (storage, _temp) = create_test_storage();
        assert!(matches!(
            storage.get("nope", b"k"),
            Err(StorageError::ColumnFamilyNotFound(_))
        ));
    }

    #[test]
    fn test_prefix_iterator_stops_at_prefix() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_TOPICS, b"topic:a:1", b"1").unwrap();
        storage.put(CF_TOPICS, b"topic:a:2", b"2").unwrap();
        storage.put(CF_TOPICS, b"topic:b:1", b"3").unwrap();

        let entries = storage.prefix_iterator(CF_TOPICS, b"topic:a:").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, b"topic:a:1".to_vec());
    }

    #[test]
    fn test_last_with_prefix() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.last_with_prefix(CF_MESSAGES, b"msg:a:").unwrap().is_none());
        storage.put(CF_MESSAGES, b"msg:a:01", b"1").unwrap();
        storage.put(CF_MESSAGES, b"msg:a:02", b"2").unwrap();
        storage.put(CF_MESSAGES, b"msg:b:01", b"3").unwrap();

        let (key, _) = storage.last_with_prefix(CF_MESSAGES, b"msg:a:").unwrap().unwrap();
        assert_eq!(key, b"msg:a:02".to_vec());
    }

    #[test]
    fn test_write_batch_is_applied_together() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_CURSORS, b"old", b"x").unwrap();
        storage
            .write_batch(&[
                BatchOp::Put {
                    cf: CF_TOPICS,
                    key: b"t1".to_vec(),
                    value: b"1".to_vec(),
                },
                BatchOp::Delete {
                    cf: CF_CURSORS,
                    key: b"old".to_vec(),
                },
            ])
            .unwrap();

        assert!(storage.get(CF_TOPICS, b"t1").unwrap().is_some());
        assert!(storage.get(CF_CURSORS, b"old").unwrap().is_none());
    }

    #[test]
    fn test_delete_prefix() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_TOPICS, b"topic:a:1", b"1").unwrap();
        storage.put(CF_TOPICS, b"topic:a:2", b"2").unwrap();
        storage.put(CF_TOPICS, b"topic:b:1", b"3").unwrap();

        assert_eq!(storage.delete_prefix(CF_TOPICS, b"topic:a:").unwrap(), 2);
        assert!(storage.prefix_iterator(CF_TOPICS, b"topic:a:").unwrap().is_empty());
        assert_eq!(storage.prefix_iterator(CF_TOPICS, b"topic:b:").unwrap().len(), 1);
    }

    #[test]
    fn test_get_stats() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_TOPICS, b"t", b"1").unwrap();
        storage.put(CF_MESSAGES, b"m1", b"1").unwrap();
        storage.put(CF_MESSAGES, b"m2", b"1").unwrap();
        storage.flush().unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.topic_count, 1);
        assert_eq!(stats.cursor_count, 0);
        assert_eq!(stats.message_count, 2);
    }
}
