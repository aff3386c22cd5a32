//! Walk, scan, flush: the full inventory run.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use drivemap_core::{InventoryConfig, RunSummary, ScanError};
use drivemap_store::RecordStore;

use crate::error::PipelineError;
use crate::pool::ScannerPool;
use crate::progress::{ProgressTracker, ScanProgress};
use crate::walker::Walker;
use crate::writer::BatchWriter;

/// One inventory run of a directory tree into a store.
pub struct Inventory<S> {
    config: InventoryConfig,
    store: S,
    tracker: Arc<ProgressTracker>,
}

impl<S: RecordStore + 'static> Inventory<S> {
    /// Prepare a run. `store` must already be initialized with the
    /// configured tag count.
    pub fn new(config: InventoryConfig, store: S) -> Self {
        Self {
            config,
            store,
            tracker: Arc::new(ProgressTracker::new()),
        }
    }

    /// Subscribe to progress updates for this run.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.tracker.subscribe()
    }

    /// Run to completion.
    ///
    /// The writer starts before scanning; the end-of-stream marker is sent
    /// only after every scanner task has finished; the call returns after
    /// the writer has flushed and stopped.
    pub fn run(self) -> Result<RunSummary, PipelineError> {
        let Self {
            config,
            store,
            tracker,
        } = self;
        let start = Instant::now();

        config
            .validate()
            .map_err(|message| ScanError::InvalidConfig { message })?;
        let walker = Walker::new(&config.root)?;
        let pool = ScannerPool::new(config.threads, config.tag_count, Arc::clone(&tracker))?;

        tracing::info!(
            root = %walker.root().display(),
            threads = config.threads,
            batch_size = config.batch_size,
            tag_count = config.tag_count,
            "scanning files and storing them"
        );

        let writer = BatchWriter::spawn(store, config.batch_size, config.channel_capacity)?;

        let mut listings = walker.walk();
        let scanned = pool.scan(listings.by_ref(), &writer.sender());
        tracker.extend_warnings(listings.into_warnings());

        let written = writer.finish();
        let stats = match (scanned, written) {
            // A dead writer also closes the channel under the scanners; its
            // error is the cause.
            (_, Err(error)) => return Err(error),
            (Err(error), Ok(_)) => return Err(error),
            (Ok(()), Ok(stats)) => stats,
        };

        tracker.publish(walker.root());

        let summary = RunSummary {
            root: walker.root().to_path_buf(),
            files_seen: tracker.files_scanned(),
            dirs_scanned: tracker.dirs_scanned(),
            bytes_seen: tracker.bytes_scanned(),
            rows_inserted: stats.rows_inserted,
            duplicates_ignored: stats.duplicates_ignored(),
            batches_committed: stats.batches_committed,
            warnings: tracker.take_warnings(),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            files = summary.files_seen,
            inserted = summary.rows_inserted,
            duplicates = summary.duplicates_ignored,
            warnings = summary.warnings.len(),
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "file scanning and storage completed"
        );

        Ok(summary)
    }
}
