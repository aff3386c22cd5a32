//! End-of-run summary.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;

/// Outcome of a clean inventory run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Canonical root that was scanned.
    pub root: PathBuf,
    /// Files stat'd and published to the writer.
    pub files_seen: u64,
    /// Directories listed by the walker.
    pub dirs_scanned: u64,
    /// Sum of sizes of all published files.
    pub bytes_seen: u64,
    /// Rows newly inserted into the store.
    pub rows_inserted: u64,
    /// Records dropped by insert-or-ignore because their path was already stored.
    pub duplicates_ignored: u64,
    /// Transactions committed, including the final flush.
    pub batches_committed: u64,
    /// Entries and subtrees skipped during the scan.
    pub warnings: Vec<ScanWarning>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether any entries or subtrees were skipped.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Files per second over the whole run.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_seen as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
