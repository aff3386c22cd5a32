//! In-memory key-value store.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use drivemap_core::FileRecord;

use crate::RecordStore;
use crate::error::StoreResult;

/// Records keyed by `fullpath`, first write wins.
///
/// Clones share the same map, so a handle kept by the caller sees what the
/// writer thread committed.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<String, FileRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a record by its full path.
    pub fn get(&self, fullpath: &str) -> Option<FileRecord> {
        self.rows.get(fullpath).map(|r| r.value().clone())
    }

    /// Snapshot of all records, sorted by path.
    pub fn records(&self) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = self.rows.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.fullpath.cmp(&b.fullpath));
        records
    }
}

impl RecordStore for MemoryStore {
    fn insert_batch(&mut self, batch: &[FileRecord]) -> StoreResult<usize> {
        let mut inserted = 0;
        for record in batch {
            if let Entry::Vacant(slot) = self.rows.entry(record.fullpath.clone()) {
                slot.insert(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
