//! Store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ledgerdesk_durability::SnapshotManager;

/// Configuration for one [`crate::DocumentStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the backing JSON document.
    pub path: PathBuf,

    /// Directory holding timestamp-named snapshot copies.
    ///
    /// Defaults to a `snapshots/` directory beside the backing file.
    pub snapshot_dir: PathBuf,

    /// Minimum age of the newest snapshot before a new one is taken
    /// (default: 5 minutes).
    pub snapshot_interval: Duration,

    /// Maximum retained snapshot generations (default: 50).
    pub snapshot_cap: usize,

    /// Corruption tripwire: a serialized document smaller than this many
    /// bytes is refused by `save()` (default: 100).
    ///
    /// A schema-complete document is always larger; only a truncated or
    /// near-empty state trips this.
    pub min_document_bytes: usize,
}

impl StoreConfig {
    /// Default minimum serialized size accepted by `save()`.
    pub const DEFAULT_MIN_DOCUMENT_BYTES: usize = 100;

    /// Configuration for a document at `path` with default snapshot and
    /// validation settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let snapshot_dir = path
            .parent()
            .map(|p| p.join("snapshots"))
            .unwrap_or_else(|| PathBuf::from("snapshots"));
        StoreConfig {
            path,
            snapshot_dir,
            snapshot_interval: SnapshotManager::DEFAULT_INTERVAL,
            snapshot_cap: SnapshotManager::DEFAULT_CAP,
            min_document_bytes: Self::DEFAULT_MIN_DOCUMENT_BYTES,
        }
    }

    /// Set the snapshot directory (builder pattern).
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Set the snapshot debounce interval (builder pattern).
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Set the snapshot retention cap (builder pattern).
    pub fn with_snapshot_cap(mut self, cap: usize) -> Self {
        self.snapshot_cap = cap;
        self
    }

    /// Set the minimum serialized size (builder pattern).
    pub fn with_min_document_bytes(mut self, bytes: usize) -> Self {
        self.min_document_bytes = bytes;
        self
    }

    /// Configuration for tests: document inside `dir`, no snapshot debounce,
    /// small retention cap.
    pub fn for_testing(dir: &Path) -> Self {
        StoreConfig::new(dir.join("document.json"))
            .with_snapshot_interval(Duration::ZERO)
            .with_snapshot_cap(5)
    }
}
