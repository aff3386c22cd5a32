//! Core types and configuration for drivemap.
//!
//! This crate provides the data structures shared by the scanner, the
//! writer and the stores: the per-file [`FileRecord`], the run
//! configuration, and the error and warning types.

mod config;
mod error;
mod record;
mod summary;

pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_TAG_COUNT, DEFAULT_THREADS,
    InventoryConfig, InventoryConfigBuilder, MAX_TAG_COUNT,
};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use record::{FileRecord, file_extension, path_tags};
pub use summary::RunSummary;
