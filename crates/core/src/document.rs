//! Document model
//!
//! The whole system persists exactly one [`Document`]: a root JSON object
//! whose keys are collection names (projects, customers, invoices, ...).
//! A collection is either an ordered array of records or, for singleton
//! entities like `settings`, a plain object.
//!
//! Records are free-form field maps. Entity-bearing records carry:
//! - `id` — unique within the collection (observed, not enforced)
//! - `created_at` / `updated_at` — RFC 3339 timestamps
//! - `deleted_at` / `deleted_by` — soft-delete marker, optional
//!
//! The document is mutated only in memory; persistence is whole-document,
//! never partial.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One record inside a collection: a JSON field map.
pub type Record = Map<String, Value>;

/// The single root object persisted to the backing store.
///
/// Serializes transparently as the underlying JSON object, so documents
/// written by earlier versions of the application load unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Map<String, Value>,
}

impl Document {
    /// Create an empty document (no collections yet).
    ///
    /// Run it through [`crate::schema::ensure_schema`] before handing it to
    /// callers — an empty document is not schema-complete.
    pub fn new() -> Self {
        Document { root: Map::new() }
    }

    /// Wrap an already-parsed root object.
    pub fn from_root(root: Map<String, Value>) -> Self {
        Document { root }
    }

    /// Consume the document, returning the root object.
    pub fn into_root(self) -> Map<String, Value> {
        self.root
    }

    /// Number of top-level collections.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// True when no collections are present.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// True when the named collection exists.
    pub fn contains(&self, entity: &str) -> bool {
        self.root.contains_key(entity)
    }

    /// Collection names present in this document, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.root.keys()
    }

    /// Raw collection value (array or singleton object).
    pub fn get(&self, entity: &str) -> Option<&Value> {
        self.root.get(entity)
    }

    /// Mutable raw collection value.
    pub fn get_mut(&mut self, entity: &str) -> Option<&mut Value> {
        self.root.get_mut(entity)
    }

    /// Insert or replace a collection.
    pub fn insert(&mut self, entity: impl Into<String>, value: Value) {
        self.root.insert(entity.into(), value);
    }

    /// Records of a list collection, or `None` if the collection is missing
    /// or is a singleton object.
    pub fn records(&self, entity: &str) -> Option<&Vec<Value>> {
        self.root.get(entity).and_then(Value::as_array)
    }

    /// Mutable records of a list collection.
    pub fn records_mut(&mut self, entity: &str) -> Option<&mut Vec<Value>> {
        self.root.get_mut(entity).and_then(Value::as_array_mut)
    }

    /// Singleton collection as an object (e.g. `settings`).
    pub fn singleton(&self, entity: &str) -> Option<&Map<String, Value>> {
        self.root.get(entity).and_then(Value::as_object)
    }

    /// Mutable singleton collection.
    pub fn singleton_mut(&mut self, entity: &str) -> Option<&mut Map<String, Value>> {
        self.root.get_mut(entity).and_then(Value::as_object_mut)
    }

    /// Find a record by id within a list collection.
    pub fn find_record(&self, entity: &str, id: &str) -> Option<&Map<String, Value>> {
        self.records(entity)?
            .iter()
            .filter_map(Value::as_object)
            .find(|r| record_id(r) == Some(id))
    }

    /// Find a record by id, mutably.
    pub fn find_record_mut(&mut self, entity: &str, id: &str) -> Option<&mut Map<String, Value>> {
        self.records_mut(entity)?
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|r| record_id(r) == Some(id))
    }
}

/// The `id` field of a record, when present and a string.
pub fn record_id(record: &Map<String, Value>) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Current time as the RFC 3339 string used in record timestamps.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Stamp a freshly created record with an id and creation timestamps.
///
/// Existing `id`/`created_at` values are left alone so externally-sourced
/// records keep their identity.
pub fn stamp_new(record: &mut Map<String, Value>) {
    let now = now_rfc3339();
    record
        .entry("id".to_string())
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    record
        .entry("created_at".to_string())
        .or_insert_with(|| Value::String(now.clone()));
    record.insert("updated_at".to_string(), Value::String(now));
}

/// Refresh a record's `updated_at` after a mutation.
pub fn touch(record: &mut Map<String, Value>) {
    record.insert("updated_at".to_string(), Value::String(now_rfc3339()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with_projects() -> Document {
        let root = json!({
            "projects": [
                {"id": "p1", "name": "Rollout"},
                {"id": "p2", "name": "Audit"}
            ],
            "settings": {"spreadsheet_url": ""}
        });
        Document::from_root(root.as_object().unwrap().clone())
    }

    #[test]
    fn test_transparent_serialization() {
        let doc = doc_with_projects();
        let text = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(doc, back);
        // no wrapper key leaks into the JSON
        assert!(text.starts_with('{'));
        assert!(!text.contains("root"));
    }

    #[test]
    fn test_records_accessors() {
        let doc = doc_with_projects();
        assert_eq!(doc.records("projects").unwrap().len(), 2);
        assert!(doc.records("settings").is_none());
        assert!(doc.records("missing").is_none());
        assert!(doc.singleton("settings").is_some());
    }

    #[test]
    fn test_find_record() {
        let mut doc = doc_with_projects();
        assert_eq!(
            doc.find_record("projects", "p2").and_then(record_id),
            Some("p2")
        );
        assert!(doc.find_record("projects", "nope").is_none());

        let rec = doc.find_record_mut("projects", "p1").unwrap();
        rec.insert("name".to_string(), Value::String("Renamed".into()));
        assert_eq!(
            doc.find_record("projects", "p1").unwrap()["name"],
            json!("Renamed")
        );
    }

    #[test]
    fn test_stamp_new_fills_missing_only() {
        let mut rec = Map::new();
        rec.insert("id".to_string(), Value::String("ext-7".into()));
        stamp_new(&mut rec);
        assert_eq!(record_id(&rec), Some("ext-7"));
        assert!(rec.contains_key("created_at"));
        assert!(rec.contains_key("updated_at"));

        let mut fresh = Map::new();
        stamp_new(&mut fresh);
        assert!(record_id(&fresh).is_some());
    }

    #[test]
    fn test_touch_updates_timestamp() {
        let mut rec = Map::new();
        rec.insert("updated_at".to_string(), Value::String("2001-01-01T00:00:00Z".into()));
        touch(&mut rec);
        assert_ne!(rec["updated_at"], json!("2001-01-01T00:00:00Z"));
    }
}
