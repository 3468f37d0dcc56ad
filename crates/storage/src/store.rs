//! The document store
//!
//! Orchestrates concurrency-safe `load()` / `save()` over the single backing
//! JSON file, invoking the schema registry and the snapshot manager.
//!
//! ## Locking
//!
//! `load()` holds a shared lock only across the read; `save()` holds an
//! exclusive lock only across the write. Neither spans the caller's
//! read-modify-write sequence, so two concurrent requests that each load,
//! mutate and save race at whole-document granularity: last writer wins.
//! That is the historical contract, acceptable at low request volume.
//! [`DocumentStore::update`] is the stronger form — one exclusive lock
//! across the whole read-modify-write span — and is what new call sites
//! should use.
//!
//! ## Failure policy
//!
//! `load()` never fails: a missing or unparseable backing file degrades to a
//! document built from schema defaults (fail-open). `save()` failures always
//! propagate, and an unsuccessful save means nothing was written.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ledgerdesk_core::{record_id, schema, Document, Result, StoreError};
use ledgerdesk_durability::SnapshotManager;

use crate::config::StoreConfig;
use crate::lock::LockGuard;

/// Concurrency-safe persistence for the shared document.
#[derive(Debug)]
pub struct DocumentStore {
    config: StoreConfig,
    snapshots: SnapshotManager,
}

impl DocumentStore {
    /// Store over the document described by `config`.
    pub fn new(config: StoreConfig) -> Self {
        let snapshots = SnapshotManager::new(&config.snapshot_dir)
            .with_interval(config.snapshot_interval)
            .with_cap(config.snapshot_cap);
        DocumentStore { config, snapshots }
    }

    /// Store over the document at `path` with default configuration.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::new(path))
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Read the current document.
    ///
    /// Takes a shared lock for the duration of the read only. A missing
    /// backing file or a parse failure falls back to a document built from
    /// schema defaults; either way the result is schema-complete.
    pub fn load(&self) -> Document {
        let mut doc = match self.read_current() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(
                    target: "ledgerdesk::store",
                    path = %self.config.path.display(),
                    "no backing file; starting from schema defaults"
                );
                Document::new()
            }
            Err(e) => {
                warn!(
                    target: "ledgerdesk::store",
                    path = %self.config.path.display(),
                    error = %e,
                    "backing file unreadable; falling back to schema defaults"
                );
                Document::new()
            }
        };
        schema::ensure_schema(&mut doc);
        doc
    }

    /// Persist the whole document.
    ///
    /// Phases, in order: best-effort snapshot, serialize, size tripwire,
    /// staged temp-file write with length verification, exclusive-locked
    /// truncate-and-rewrite of the backing file. There is no delta write.
    pub fn save(&self, doc: &Document) -> Result<()> {
        self.snapshots.snapshot_before_save(&self.config.path);

        let bytes = self.encode(doc)?;
        self.warn_duplicate_ids(doc);

        let temp = self.stage(&bytes)?;
        let committed = self.commit(&bytes);
        if let Err(e) = std::fs::remove_file(&temp) {
            warn!(
                target: "ledgerdesk::store",
                path = %temp.display(),
                error = %e,
                "temp file not removed"
            );
        }
        committed
    }

    /// Read-modify-write under one exclusive lock.
    ///
    /// Unlike `load()` followed by `save()`, the lock spans the entire
    /// sequence, so concurrent `update()` calls serialize instead of
    /// overwriting each other. The closure receives a schema-complete
    /// document; its return value is handed back on success.
    pub fn update<T>(&self, f: impl FnOnce(&mut Document) -> T) -> Result<T> {
        self.snapshots.snapshot_before_save(&self.config.path);
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.config.path)?;
        let _guard = LockGuard::exclusive(&file)?;

        let mut contents = String::new();
        (&file).read_to_string(&mut contents)?;
        let mut doc = if contents.trim().is_empty() {
            Document::new()
        } else {
            match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(root) => Document::from_root(root),
                Err(e) => {
                    warn!(
                        target: "ledgerdesk::store",
                        error = %e,
                        "backing file unparseable; update starts from schema defaults"
                    );
                    Document::new()
                }
            }
        };
        schema::ensure_schema(&mut doc);

        let out = f(&mut doc);

        let bytes = self.encode(&doc)?;
        self.warn_duplicate_ids(&doc);
        (&file).seek(SeekFrom::Start(0))?;
        file.set_len(0)
            .map_err(|e| StoreError::Write(format!("truncate: {e}")))?;
        write_verified(&file, &bytes)?;
        Ok(out)
    }

    fn read_current(&self) -> Result<Option<Document>> {
        let file = match File::open(&self.config.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let contents = {
            let _guard = LockGuard::shared(&file)?;
            let mut s = String::new();
            (&file).read_to_string(&mut s)?;
            s
            // lock released here; parsing happens outside it
        };
        let root: Map<String, Value> =
            serde_json::from_str(&contents).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Some(Document::from_root(root)))
    }

    fn encode(&self, doc: &Document) -> Result<Vec<u8>> {
        let bytes =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Encode(e.to_string()))?;
        if bytes.len() < self.config.min_document_bytes {
            return Err(StoreError::Validation(format!(
                "serialized document is {} bytes, below the {}-byte minimum; refusing to persist a near-empty state",
                bytes.len(),
                self.config.min_document_bytes
            )));
        }
        Ok(bytes)
    }

    /// Write the serialized bytes to a process-unique temp file and verify
    /// the on-disk length before touching the real backing file.
    fn stage(&self, bytes: &[u8]) -> Result<PathBuf> {
        let temp = temp_path(&self.config.path);
        if let Some(parent) = temp.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(&temp)?;
        if let Err(e) = file
            .write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| StoreError::Write(format!("temp file: {e}")))
            .and_then(|()| verify_len(&file, bytes.len()))
        {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
        Ok(temp)
    }

    /// Truncate and rewrite the backing file under an exclusive lock.
    fn commit(&self, bytes: &[u8]) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.config.path)?;
        let _guard = LockGuard::exclusive(&file)?;
        file.set_len(0)
            .map_err(|e| StoreError::Write(format!("truncate: {e}")))?;
        write_verified(&file, bytes)?;
        info!(
            target: "ledgerdesk::store",
            path = %self.config.path.display(),
            bytes = bytes.len(),
            "document saved"
        );
        Ok(())
    }

    /// Duplicate ids are known to arrive via external sync paths. The store
    /// stays permissive: it reports them, it does not reject the document.
    fn warn_duplicate_ids(&self, doc: &Document) {
        for entity in schema::entity_keys() {
            let Some(records) = doc.records(entity) else {
                continue;
            };
            let mut seen: HashSet<&str> = HashSet::new();
            let mut duplicates: Vec<&str> = Vec::new();
            for id in records
                .iter()
                .filter_map(Value::as_object)
                .filter_map(record_id)
            {
                if !seen.insert(id) {
                    duplicates.push(id);
                }
            }
            if !duplicates.is_empty() {
                warn!(
                    target: "ledgerdesk::store",
                    entity,
                    ids = ?duplicates,
                    "duplicate record ids persisted"
                );
            }
        }
    }
}

fn write_verified(mut file: &File, bytes: &[u8]) -> Result<()> {
    file.write_all(bytes)
        .and_then(|()| file.flush())
        .and_then(|()| file.sync_all())
        .map_err(|e| StoreError::Write(format!("backing file: {e}")))?;
    verify_len(file, bytes.len())
}

fn verify_len(file: &File, expected: usize) -> Result<()> {
    let written = file.metadata()?.len();
    if written != expected as u64 {
        return Err(StoreError::Write(format!(
            "wrote {written} of {expected} bytes"
        )));
    }
    Ok(())
}

/// Temp file beside the backing file, unique per process and per save.
fn temp_path(backing: &Path) -> PathBuf {
    let name = backing
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.json");
    backing.with_file_name(format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        Uuid::new_v4().simple()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> DocumentStore {
        DocumentStore::new(StoreConfig::for_testing(tmp.path()))
    }

    #[test]
    fn test_load_without_backing_file_is_schema_complete() {
        let tmp = TempDir::new().unwrap();
        let doc = store(&tmp).load();
        assert!(doc.records("projects").unwrap().is_empty());
        assert!(doc.singleton("settings").unwrap().contains_key("spreadsheet_url"));
    }

    #[test]
    fn test_load_falls_back_on_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::write(store.path(), b"{definitely not json").unwrap();
        let doc = store.load();
        assert!(doc.records("projects").unwrap().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let mut doc = store.load();
        doc.records_mut("projects")
            .unwrap()
            .push(json!({"id": "p1", "name": "Rollout"}));
        store.save(&doc).unwrap();

        let reloaded = store.load();
        assert_eq!(reloaded, doc);
    }

    #[test]
    fn test_save_rejects_near_empty_document() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let err = store.save(&Document::new()).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let mut tiny = Document::new();
        tiny.insert("a", json!("b"));
        let err = store.save(&tiny).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        // nothing was written by either attempt
        assert!(!store.path().exists());
    }

    #[test]
    fn test_failed_save_leaves_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let doc = store.load();
        store.save(&doc).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        assert!(store.save(&Document::new()).is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.save(&store.load()).unwrap();
        let strays: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(strays.is_empty());
    }

    #[test]
    fn test_update_spans_read_modify_write() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let id = store
            .update(|doc| {
                let records = doc.records_mut("tasks").unwrap();
                records.push(json!({"id": "t1", "title": "ship it"}));
                "t1"
            })
            .unwrap();
        assert_eq!(id, "t1");
        assert!(store.load().find_record("tasks", "t1").is_some());
    }

    #[test]
    fn test_concurrent_updates_serialize() {
        let tmp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(store(&tmp));
        store.save(&store.load()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store
                            .update(|doc| {
                                doc.records_mut("comments")
                                    .unwrap()
                                    .push(json!({"id": format!("c-{i}-{j}")}));
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // every write survived: updates serialize, unlike load+save
        assert_eq!(store.load().records("comments").unwrap().len(), 20);
    }

    #[test]
    fn test_save_writes_snapshot_first() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let doc = store.load();
        store.save(&doc).unwrap(); // no file yet, nothing to snapshot
        store.save(&doc).unwrap(); // snapshots the first save's bytes
        let snapshots = std::fs::read_dir(tmp.path().join("snapshots"))
            .unwrap()
            .count();
        assert_eq!(snapshots, 1);
    }
}
