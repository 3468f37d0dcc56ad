//! Append-only audit trail
//!
//! One JSON-lines file beside the document: each line is a serialized
//! [`AuditEntry`]. Entries are appended, never mutated, never reordered.
//!
//! There is deliberately no referential integrity with live records — a
//! record may be purged while its trail persists. Traceability outlives the
//! data.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use ledgerdesk_core::{record_id, Result, StoreError};

/// Kind of change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A record was created.
    Create,
    /// A record was changed.
    Update,
    /// A record was soft-deleted.
    Delete,
    /// A soft-deleted record was brought back.
    Restore,
    /// Soft-deleted records were permanently removed.
    Purge,
}

/// A single line in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// Who made the change (user name or system identity).
    pub actor: String,
    /// What kind of change.
    pub action: AuditAction,
    /// Collection the change applies to.
    pub entity_type: String,
    /// Id of the affected record, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Human-readable summary.
    pub description: String,
    /// State before the change (full record on delete, changed fields on update).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// State after the change (full record on create, changed fields on update).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

/// Writer/reader for one audit log file.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    path: PathBuf,
}

impl AuditTrail {
    /// Trail backed by the JSONL file at `path` (created on first write).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuditTrail { path: path.into() }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. The log is append-only; nothing is ever rewritten.
    pub fn write(&self, entry: &AuditEntry) -> Result<()> {
        let line = serde_json::to_string(entry).map_err(|e| StoreError::Encode(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Append a generic entry with the given action and context.
    pub fn record(
        &self,
        action: AuditAction,
        actor: &str,
        entity_type: &str,
        description: &str,
    ) -> Result<()> {
        self.write(&AuditEntry {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action,
            entity_type: entity_type.to_string(),
            entity_id: None,
            description: description.to_string(),
            before: None,
            after: None,
        })
    }

    /// Append a creation entry capturing the full new record.
    pub fn record_create(
        &self,
        actor: &str,
        entity_type: &str,
        record: &Map<String, Value>,
    ) -> Result<()> {
        let id = record_id(record).map(str::to_string);
        self.write(&AuditEntry {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action: AuditAction::Create,
            entity_type: entity_type.to_string(),
            description: describe(entity_type, "created", id.as_deref()),
            entity_id: id,
            before: None,
            after: Some(Value::Object(record.clone())),
        })
    }

    /// Append an update entry capturing only the fields that changed.
    pub fn record_update(
        &self,
        actor: &str,
        entity_type: &str,
        before: &Map<String, Value>,
        after: &Map<String, Value>,
    ) -> Result<()> {
        let id = record_id(after).or_else(|| record_id(before)).map(str::to_string);
        let (changed_before, changed_after) = diff(before, after);
        self.write(&AuditEntry {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action: AuditAction::Update,
            entity_type: entity_type.to_string(),
            description: describe(entity_type, "updated", id.as_deref()),
            entity_id: id,
            before: Some(Value::Object(changed_before)),
            after: Some(Value::Object(changed_after)),
        })
    }

    /// Append a deletion entry capturing the full removed record.
    pub fn record_delete(
        &self,
        actor: &str,
        entity_type: &str,
        record: &Map<String, Value>,
    ) -> Result<()> {
        let id = record_id(record).map(str::to_string);
        self.write(&AuditEntry {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action: AuditAction::Delete,
            entity_type: entity_type.to_string(),
            description: describe(entity_type, "deleted", id.as_deref()),
            entity_id: id,
            before: Some(Value::Object(record.clone())),
            after: None,
        })
    }

    /// Read the whole trail, oldest first.
    ///
    /// Malformed lines are skipped with a warning rather than failing the
    /// read — a damaged line must not make the rest of the trail
    /// unreachable. A missing file is an empty trail.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(
                        target: "ledgerdesk::audit",
                        line = lineno + 1,
                        error = %e,
                        "skipping malformed audit line"
                    );
                }
            }
        }
        Ok(entries)
    }
}

fn describe(entity_type: &str, verb: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{verb} {entity_type} {id}"),
        None => format!("{verb} {entity_type}"),
    }
}

/// Fields that differ between two records, as (before, after) subsets.
///
/// Added fields appear only in `after`, removed fields only in `before`.
fn diff(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
) -> (Map<String, Value>, Map<String, Value>) {
    let mut keys: BTreeMap<&str, ()> = BTreeMap::new();
    keys.extend(before.keys().map(|k| (k.as_str(), ())));
    keys.extend(after.keys().map(|k| (k.as_str(), ())));

    let mut changed_before = Map::new();
    let mut changed_after = Map::new();
    for key in keys.keys() {
        let old = before.get(*key);
        let new = after.get(*key);
        if old != new {
            if let Some(old) = old {
                changed_before.insert((*key).to_string(), old.clone());
            }
            if let Some(new) = new {
                changed_after.insert((*key).to_string(), new.clone());
            }
        }
    }
    (changed_before, changed_after)
}
