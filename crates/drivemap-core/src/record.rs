//! Per-file inventory record.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// One row per distinct file path.
///
/// `fullpath` is the unique key in every store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Base name of the file.
    pub name: String,
    /// Absolute, normalized path.
    pub fullpath: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Exactly K path-derived tags, empty-string padded.
    pub tags: Vec<String>,
}

impl FileRecord {
    /// Build a record for a file that was successfully stat'd.
    ///
    /// `path` must be absolute; `tag_count` fixes the length of `tags`.
    pub fn new(path: &Path, size: u64, tag_count: usize) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file_extension(&name).to_string();

        Self {
            fullpath: path.to_string_lossy().into_owned(),
            tags: path_tags(path, tag_count),
            name,
            extension,
            size,
        }
    }
}

/// Extension of a base name, including the dot.
///
/// Leading dots are part of the stem, so `.bashrc` has no extension.
pub fn file_extension(name: &str) -> &str {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(idx) => &name[stem_start + idx..],
        None => "",
    }
}

/// Derive exactly `tag_count` tags from the directory segments of `path`.
///
/// Segments beyond `tag_count` are dropped; missing ones become empty strings.
pub fn path_tags(path: &Path, tag_count: usize) -> Vec<String> {
    let mut tags: Vec<String> = path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .take(tag_count)
        .collect();
    tags.resize(tag_count, String::new());
    tags
}
