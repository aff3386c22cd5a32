//! Inventory run configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default number of scanner workers.
pub const DEFAULT_THREADS: usize = 8;

/// Default number of records committed per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default number of tag columns.
pub const DEFAULT_TAG_COUNT: usize = 10;

/// Default capacity of the record channel between scanners and the writer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 20_000;

/// Upper bound on tag columns, well below SQLite's column limit.
pub const MAX_TAG_COUNT: usize = 256;

/// Configuration for an inventory run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct InventoryConfig {
    /// Root path to inventory.
    pub root: PathBuf,

    /// Number of scanner workers.
    #[builder(default = "DEFAULT_THREADS")]
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Records per committed batch.
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of path-derived tag columns (K).
    ///
    /// Fixed for the lifetime of a store file.
    #[builder(default = "DEFAULT_TAG_COUNT")]
    #[serde(default = "default_tag_count")]
    pub tag_count: usize,

    /// Capacity of the record channel feeding the writer.
    #[builder(default = "DEFAULT_CHANNEL_CAPACITY")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_tag_count() -> usize {
    DEFAULT_TAG_COUNT
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl InventoryConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            Some(_) => {}
        }
        if self.threads == Some(0) {
            return Err("At least one scanner thread is required".to_string());
        }
        if self.batch_size == Some(0) {
            return Err("Batch size must be at least 1".to_string());
        }
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be at least 1".to_string());
        }
        if let Some(count) = self.tag_count {
            if count > MAX_TAG_COUNT {
                return Err(format!("Tag count {count} exceeds the maximum of {MAX_TAG_COUNT}"));
            }
        }
        Ok(())
    }
}

impl InventoryConfig {
    /// Create a new config builder.
    pub fn builder() -> InventoryConfigBuilder {
        InventoryConfigBuilder::default()
    }

    /// Create a config with default settings for the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            threads: DEFAULT_THREADS,
            batch_size: DEFAULT_BATCH_SIZE,
            tag_count: DEFAULT_TAG_COUNT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Re-check the invariants the builder enforces.
    ///
    /// Needed for configs that were deserialized or mutated directly.
    pub fn validate(&self) -> Result<(), String> {
        InventoryConfigBuilder::default()
            .root(self.root.clone())
            .threads(self.threads)
            .batch_size(self.batch_size)
            .tag_count(self.tag_count)
            .channel_capacity(self.channel_capacity)
            .validate()
    }
}
