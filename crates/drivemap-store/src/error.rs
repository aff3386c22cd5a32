//! Storage errors.

use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by record stores and export.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure (open, schema, or transaction).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSV serialization failure.
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O failure while exporting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The existing table was created with a different number of tag columns.
    #[error("Store has {found} tag columns but {expected} were configured")]
    TagCountMismatch { expected: usize, found: usize },

    /// The existing table lacks a required column.
    #[error("Existing table is missing column '{column}'")]
    MissingColumn { column: String },

    /// A file size that does not fit SQLite's signed 64-bit integer.
    #[error("Size {size} of '{path}' exceeds the storable range")]
    SizeOutOfRange { path: String, size: u64 },

    /// Generic backend failure for stores without a richer error type.
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}
