//! Top-down directory walker built on jwalk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, unbounded};
use jwalk::{DirEntry, Parallelism, WalkDir};

use drivemap_core::{ScanError, ScanWarning};

type WalkEntry = Result<DirEntry<((), ())>, jwalk::Error>;

/// Names of the non-directory entries found in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    /// Absolute path of the directory.
    pub dir: PathBuf,
    /// Entry names, relative to `dir`.
    pub names: Vec<OsString>,
}

/// Enumerates a tree one directory at a time.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Validate and canonicalize the root.
    ///
    /// Fails when the root does not exist, is not a directory, or cannot be
    /// listed. Everything below the root is best-effort.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ScanError> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| ScanError::io(root, e))?;

        if !root.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }
        std::fs::read_dir(&root).map_err(|e| ScanError::io(&root, e))?;

        Ok(Self { root })
    }

    /// Canonical root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start walking. Parents are listed before their children.
    pub fn walk(&self) -> DirListings {
        let (listing_tx, listing_rx) = unbounded();

        let walker = WalkDir::new(&self.root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .process_read_dir(move |depth, path, _read_dir_state, children| {
                // The root itself is handed in once with no depth.
                if depth.is_none() {
                    return;
                }
                let names = children
                    .iter()
                    .filter_map(|child| child.as_ref().ok())
                    .filter(|child| !child.file_type().is_dir())
                    .map(|child| child.file_name().to_os_string())
                    .collect();
                let _ = listing_tx.send(DirListing {
                    dir: path.to_path_buf(),
                    names,
                });
            });

        DirListings {
            entries: Box::new(walker.into_iter()),
            listings: listing_rx,
            warnings: Vec::new(),
            exhausted: false,
        }
    }
}

/// Lazy, non-restartable sequence of directory listings.
///
/// Directories that cannot be listed are skipped with a warning.
pub struct DirListings {
    entries: Box<dyn Iterator<Item = WalkEntry>>,
    listings: Receiver<DirListing>,
    warnings: Vec<ScanWarning>,
    exhausted: bool,
}

impl DirListings {
    /// Warnings for every subtree skipped during the walk.
    pub fn into_warnings(self) -> Vec<ScanWarning> {
        self.warnings
    }

    fn skip_subtree(&mut self, error: jwalk::Error) {
        let path = error.path().map(Path::to_path_buf).unwrap_or_default();
        tracing::warn!(path = %path.display(), error = %error, "skipping unreadable directory");
        self.warnings.push(ScanWarning::read_error(path, error.to_string()));
    }
}

impl Iterator for DirListings {
    type Item = DirListing;

    fn next(&mut self) -> Option<DirListing> {
        loop {
            if let Ok(listing) = self.listings.try_recv() {
                return Some(listing);
            }
            if self.exhausted {
                return None;
            }
            match self.entries.next() {
                // A directory that cannot be listed still comes back as an
                // entry, with the failure attached.
                Some(Ok(mut entry)) => {
                    if let Some(error) = entry.read_children_error.take() {
                        self.skip_subtree(error);
                    }
                }
                Some(Err(error)) => self.skip_subtree(error),
                None => self.exhausted = true,
            }
        }
    }
}
