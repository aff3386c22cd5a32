//! Pipeline errors.

use drivemap_core::ScanError;
use drivemap_store::StoreError;
use thiserror::Error;

/// Fatal errors that abort an inventory run.
///
/// Batches committed before the failure stay in the store.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run could not start (invalid root or configuration).
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A batch transaction failed.
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    /// The record channel closed before the end-of-stream marker.
    #[error("Record channel closed before the end of the scan")]
    ChannelClosed,

    /// A worker or writer thread could not be started.
    #[error("Failed to start {what}: {message}")]
    Spawn { what: &'static str, message: String },

    /// The writer thread panicked.
    #[error("Writer thread panicked")]
    WriterPanicked,
}
