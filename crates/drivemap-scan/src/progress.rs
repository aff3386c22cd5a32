//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use drivemap_core::ScanWarning;
use tokio::sync::broadcast;

/// Files between two published progress snapshots.
const PROGRESS_INTERVAL: u64 = 1000;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files published so far.
    pub files_scanned: u64,
    /// Number of directories processed so far.
    pub dirs_scanned: u64,
    /// Total bytes of published files.
    pub bytes_scanned: u64,
    /// Path being scanned when the snapshot was taken.
    pub current_path: PathBuf,
    /// Number of warnings encountered.
    pub errors_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Counters shared by every scanner worker.
///
/// Counters are updated atomically and read for reporting only; nothing
/// in the pipeline makes control decisions from them.
#[derive(Debug)]
pub struct ProgressTracker {
    start_time: Instant,
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    warnings: Mutex<Vec<ScanWarning>>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            start_time: Instant::now(),
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            warnings: Mutex::new(Vec::new()),
            progress_tx,
        }
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Count a published file, emitting a snapshot every `PROGRESS_INTERVAL` files.
    pub fn record_file(&self, path: &Path, size: u64) {
        self.bytes_scanned.fetch_add(size, Ordering::Relaxed);
        let count = self.files_scanned.fetch_add(1, Ordering::Relaxed) + 1;
        if count % PROGRESS_INTERVAL == 0 {
            self.publish(path);
        }
    }

    pub fn record_dir(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Log a skipped entry and keep it for the run summary.
    pub fn record_warning(&self, warning: ScanWarning) {
        tracing::warn!(path = %warning.path.display(), kind = %warning.kind, "{}", warning.message);
        self.lock_warnings().push(warning);
    }

    /// Keep warnings that were already logged elsewhere.
    pub fn extend_warnings(&self, warnings: impl IntoIterator<Item = ScanWarning>) {
        self.lock_warnings().extend(warnings);
    }

    pub fn files_scanned(&self) -> u64 {
        self.files_scanned.load(Ordering::Relaxed)
    }

    pub fn dirs_scanned(&self) -> u64 {
        self.dirs_scanned.load(Ordering::Relaxed)
    }

    pub fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned.load(Ordering::Relaxed)
    }

    pub fn warning_count(&self) -> usize {
        self.lock_warnings().len()
    }

    /// Drain collected warnings.
    pub fn take_warnings(&self) -> Vec<ScanWarning> {
        std::mem::take(&mut *self.lock_warnings())
    }

    pub fn snapshot(&self, current_path: &Path) -> ScanProgress {
        ScanProgress {
            files_scanned: self.files_scanned(),
            dirs_scanned: self.dirs_scanned(),
            bytes_scanned: self.bytes_scanned(),
            current_path: current_path.to_path_buf(),
            errors_count: self.warning_count() as u64,
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Send a snapshot to subscribers, if any.
    pub fn publish(&self, current_path: &Path) {
        let _ = self.progress_tx.send(self.snapshot(current_path));
    }

    fn lock_warnings(&self) -> std::sync::MutexGuard<'_, Vec<ScanWarning>> {
        self.warnings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
