//! Fixed-size pool of scanner workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};

use drivemap_core::{FileRecord, ScanWarning};

use crate::error::PipelineError;
use crate::long_path;
use crate::progress::ProgressTracker;
use crate::walker::DirListing;
use crate::writer::RecordSender;

/// Stats every entry of a directory listing and publishes one record per file.
pub struct ScannerPool {
    pool: ThreadPool,
    tag_count: usize,
    tracker: Arc<ProgressTracker>,
}

impl ScannerPool {
    /// Build a pool of `threads` workers.
    pub fn new(
        threads: usize,
        tag_count: usize,
        tracker: Arc<ProgressTracker>,
    ) -> Result<Self, PipelineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("drivemap-scan-{i}"))
            .build()
            .map_err(|e| PipelineError::Spawn {
                what: "scanner pool",
                message: e.to_string(),
            })?;

        Ok(Self {
            pool,
            tag_count,
            tracker,
        })
    }

    /// Scan every listing, one task per listing, and wait for all tasks.
    ///
    /// `listings` is consumed on the calling thread while workers run, so
    /// a walk and the scan overlap. The first fatal task error stops
    /// further dispatch and is returned once every started task has ended.
    pub fn scan<I>(&self, listings: I, sender: &RecordSender) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = DirListing>,
    {
        let failure: Mutex<Option<PipelineError>> = Mutex::new(None);
        let aborted = AtomicBool::new(false);

        self.pool.in_place_scope(|scope| {
            for listing in listings {
                if aborted.load(Ordering::Acquire) {
                    break;
                }
                let (failure, aborted) = (&failure, &aborted);
                scope.spawn(move |_| {
                    if aborted.load(Ordering::Acquire) {
                        return;
                    }
                    if let Err(error) = self.scan_listing(listing, sender) {
                        aborted.store(true, Ordering::Release);
                        failure
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get_or_insert(error);
                    }
                });
            }
        });

        match failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn scan_listing(&self, listing: DirListing, sender: &RecordSender) -> Result<(), PipelineError> {
        self.tracker.record_dir();

        for name in &listing.names {
            let path = listing.dir.join(name);

            let metadata = match std::fs::metadata(long_path::extended(&path)) {
                Ok(metadata) => metadata,
                Err(error) => {
                    self.tracker
                        .record_warning(ScanWarning::from_stat_error(&path, &error));
                    continue;
                }
            };
            // Symlinks resolving to directories are walked as links, not files.
            if metadata.is_dir() {
                tracing::debug!(path = %path.display(), "skipping link to directory");
                continue;
            }

            let size = metadata.len();
            let record = FileRecord::new(&long_path::plain(&path), size, self.tag_count);
            sender.publish(record)?;
            self.tracker.record_file(&path, size);
        }

        Ok(())
    }
}
