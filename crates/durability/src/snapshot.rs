//! Snapshot manager
//!
//! Bounded, debounced point-in-time copies of the backing file, taken before
//! each save:
//! - **Debounce**: no new snapshot while the newest existing one is younger
//!   than the configured interval (default 5 minutes), so rapid successive
//!   saves do not produce snapshot storms.
//! - **Retention**: at most a fixed number of generations (default 50);
//!   excess files are pruned oldest-first by timestamp order.
//!
//! Snapshots are best-effort. Every failure is swallowed and logged — a
//! failed snapshot must never fail the primary save.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

/// Snapshot file name pattern: `snapshot-<stamp>.json`.
const PREFIX: &str = "snapshot-";
const SUFFIX: &str = ".json";
/// Compact stamp, lexicographically ordered: `20260825T143015123`.
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

/// Internal snapshot failure; callers of the public entry point never see it.
#[derive(Debug, Error)]
enum SnapshotError {
    #[error("snapshot I/O: {0}")]
    Io(#[from] io::Error),
}

/// Debounced, capped snapshot copies of one backing file.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    dir: PathBuf,
    interval: Duration,
    cap: usize,
}

impl SnapshotManager {
    /// Default debounce interval between snapshots.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);
    /// Default retained generation count.
    pub const DEFAULT_CAP: usize = 50;

    /// Manager writing into `dir` with default debounce and retention.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotManager {
            dir: dir.into(),
            interval: Self::DEFAULT_INTERVAL,
            cap: Self::DEFAULT_CAP,
        }
    }

    /// Set the debounce interval (builder pattern).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the retention cap (builder pattern).
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Directory the snapshots live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `backing` into the snapshot directory if the debounce window has
    /// passed, then prune old generations.
    ///
    /// Never fails: errors are logged at `warn` and swallowed.
    pub fn snapshot_before_save(&self, backing: &Path) {
        match self.take(backing, Utc::now()) {
            Ok(Some(path)) => {
                debug!(target: "ledgerdesk::snapshot", path = %path.display(), "snapshot written");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(target: "ledgerdesk::snapshot", error = %e, "snapshot skipped");
            }
        }
    }

    fn take(&self, backing: &Path, now: DateTime<Utc>) -> Result<Option<PathBuf>, SnapshotError> {
        if !backing.exists() {
            // nothing to copy on the very first save
            return Ok(None);
        }
        std::fs::create_dir_all(&self.dir)?;

        if let Some(newest) = self.existing()?.last().and_then(|p| stamp_of(p)) {
            let age = now.signed_duration_since(newest);
            if age.to_std().map(|a| a < self.interval).unwrap_or(true) {
                debug!(
                    target: "ledgerdesk::snapshot",
                    newest = %newest,
                    "debounced: newest snapshot younger than interval"
                );
                return Ok(None);
            }
        }

        let path = self.dir.join(file_name(now));
        std::fs::copy(backing, &path)?;
        self.prune()?;
        Ok(Some(path))
    }

    /// Existing snapshot files, oldest first (timestamp order by name).
    fn existing(&self) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if stamp_of(&path).is_some() {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    fn prune(&self) -> io::Result<()> {
        let existing = self.existing()?;
        if existing.len() <= self.cap {
            return Ok(());
        }
        let excess = existing.len() - self.cap;
        for stale in &existing[..excess] {
            std::fs::remove_file(stale)?;
            debug!(target: "ledgerdesk::snapshot", path = %stale.display(), "pruned old snapshot");
        }
        Ok(())
    }
}

fn file_name(at: DateTime<Utc>) -> String {
    format!("{PREFIX}{}{SUFFIX}", at.format(STAMP_FORMAT))
}

/// Parse the timestamp out of a snapshot file name; `None` for foreign files.
fn stamp_of(path: &Path) -> Option<DateTime<Utc>> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let backing = tmp.path().join("document.json");
        std::fs::write(&backing, br#"{"projects": []}"#).unwrap();
        (tmp, backing)
    }

    fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, minute, second).unwrap()
    }

    #[test]
    fn test_first_save_snapshots() {
        let (tmp, backing) = fixture();
        let mgr = SnapshotManager::new(tmp.path().join("snapshots"));
        let made = mgr.take(&backing, at(0, 0)).unwrap();
        assert!(made.is_some());
        assert_eq!(mgr.existing().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_backing_file_is_noop() {
        let tmp = TempDir::new().unwrap();
        let mgr = SnapshotManager::new(tmp.path().join("snapshots"));
        let made = mgr.take(&tmp.path().join("absent.json"), at(0, 0)).unwrap();
        assert!(made.is_none());
    }

    #[test]
    fn test_debounce_skips_saves_one_minute_apart() {
        let (tmp, backing) = fixture();
        let mgr = SnapshotManager::new(tmp.path().join("snapshots"));
        assert!(mgr.take(&backing, at(0, 0)).unwrap().is_some());
        assert!(mgr.take(&backing, at(1, 0)).unwrap().is_none());
        assert_eq!(mgr.existing().unwrap().len(), 1);
    }

    #[test]
    fn test_debounce_allows_saves_six_minutes_apart() {
        let (tmp, backing) = fixture();
        let mgr = SnapshotManager::new(tmp.path().join("snapshots"));
        assert!(mgr.take(&backing, at(0, 0)).unwrap().is_some());
        assert!(mgr.take(&backing, at(6, 0)).unwrap().is_some());
        assert_eq!(mgr.existing().unwrap().len(), 2);
    }

    #[test]
    fn test_retention_keeps_most_recent_fifty() {
        let (tmp, backing) = fixture();
        let mgr = SnapshotManager::new(tmp.path().join("snapshots"));
        let base = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        for i in 0..60 {
            let now = base + chrono::Duration::minutes(6 * i);
            assert!(mgr.take(&backing, now).unwrap().is_some(), "save {i}");
        }
        let remaining = mgr.existing().unwrap();
        assert_eq!(remaining.len(), 50);
        // the survivors are the 50 most recent generations
        let oldest_kept = stamp_of(&remaining[0]).unwrap();
        assert_eq!(oldest_kept, base + chrono::Duration::minutes(6 * 10));
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let (tmp, backing) = fixture();
        let dir = tmp.path().join("snapshots");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("README.txt"), b"not a snapshot").unwrap();
        let mgr = SnapshotManager::new(&dir).with_cap(1);
        assert!(mgr.take(&backing, at(0, 0)).unwrap().is_some());
        assert!(mgr.take(&backing, at(30, 0)).unwrap().is_some());
        // the foreign file neither counts toward the cap nor gets pruned
        assert!(dir.join("README.txt").exists());
        assert_eq!(mgr.existing().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_before_save_swallows_failures() {
        let (tmp, backing) = fixture();
        // point the snapshot dir at a path that is already a file
        let clash = tmp.path().join("snapshots");
        std::fs::write(&clash, b"in the way").unwrap();
        let mgr = SnapshotManager::new(&clash);
        // must not panic or propagate
        mgr.snapshot_before_save(&backing);
    }

    #[test]
    fn test_file_name_round_trip() {
        let now = at(42, 7);
        let name = file_name(now);
        assert!(name.starts_with(PREFIX) && name.ends_with(SUFFIX));
        assert_eq!(stamp_of(Path::new(&name)), Some(now));
    }
}
