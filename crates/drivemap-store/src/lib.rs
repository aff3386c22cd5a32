//! Record stores for drivemap.
//!
//! A store is anything that can commit a batch of [`FileRecord`]s as one
//! transaction with insert-or-ignore semantics on `fullpath`. Two
//! implementations are provided:
//!
//! - [`SqliteStore`] - the durable store, one `files` table with K tag columns
//! - [`MemoryStore`] - a concurrent map keyed by `fullpath`, no-overwrite puts
//!
//! ```rust,no_run
//! use drivemap_store::{RecordStore, SqliteStore};
//!
//! let store = SqliteStore::open("files.db", 10).unwrap();
//! println!("{} rows", store.row_count().unwrap());
//! ```

mod error;
mod export;
mod memory;
pub mod schema;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use export::export_csv;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use drivemap_core::FileRecord;

/// A backing store with unique-key upsert-or-ignore semantics.
///
/// Implementations are owned by a single writer thread for the whole run.
pub trait RecordStore: Send {
    /// Commit `batch` as one transaction, ignoring records whose `fullpath`
    /// is already stored.
    ///
    /// Returns the number of newly inserted rows. An empty batch is a
    /// valid no-op commit.
    fn insert_batch(&mut self, batch: &[FileRecord]) -> StoreResult<usize>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn insert_batch(&mut self, batch: &[FileRecord]) -> StoreResult<usize> {
        (**self).insert_batch(batch)
    }
}
