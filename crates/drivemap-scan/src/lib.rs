//! Scan-and-store pipeline for drivemap.
//!
//! This crate inventories a directory tree into a [`RecordStore`]:
//!
//! - **Walker** - lists directories top-down via jwalk
//! - **Scanner pool** - rayon workers stat each entry and publish records
//! - **Writer** - one thread commits records in insert-or-ignore batches
//!
//! The record channel between scanners and writer is bounded, so a slow
//! store stalls the scanners instead of growing memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use drivemap_scan::{Inventory, InventoryConfig};
//! use drivemap_store::SqliteStore;
//!
//! let config = InventoryConfig::new("/path/to/scan");
//! let store = SqliteStore::open("files.db", config.tag_count).unwrap();
//! let summary = Inventory::new(config, store).run().unwrap();
//!
//! println!("Total files scanned: {}", summary.files_seen);
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use drivemap_scan::{Inventory, InventoryConfig};
//! use drivemap_store::MemoryStore;
//!
//! let inventory = Inventory::new(InventoryConfig::new("."), MemoryStore::new());
//! let mut progress_rx = inventory.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! inventory.run().unwrap();
//! ```

mod error;
mod long_path;
mod pipeline;
mod pool;
mod progress;
mod walker;
mod writer;

pub use error::PipelineError;
pub use pipeline::Inventory;
pub use pool::ScannerPool;
pub use progress::{ProgressTracker, ScanProgress};
pub use walker::{DirListing, DirListings, Walker};
pub use writer::{BatchWriter, RecordSender, WriterMessage, WriterStats, record_channel};

// Re-export core types for convenience
pub use drivemap_core::{FileRecord, InventoryConfig, RunSummary, ScanError, ScanWarning, WarningKind};
pub use drivemap_store::RecordStore;
