//! Soft-delete utility
//!
//! Logical deletion over one list collection: a deleted record stays in
//! place with `deleted_at`/`deleted_by` set, disappears from the default
//! view, and remains addressable for restore until purged.
//!
//! Cascading to dependent collections (deleting a loan does not touch its
//! repayments here) is a per-feature caller concern, not a store-level
//! guarantee.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use ledgerdesk_core::{now_rfc3339, record_id, touch};

/// True when the record carries a soft-delete marker.
pub fn is_deleted(record: &Map<String, Value>) -> bool {
    matches!(record.get("deleted_at"), Some(Value::String(_)))
}

/// Mark the record with `id` as deleted by `actor`, leaving it in place.
///
/// Returns the deletion timestamp, or `None` if no record has that id.
/// Already-deleted records keep their original marker.
pub fn soft_delete(collection: &mut Vec<Value>, id: &str, actor: &str) -> Option<String> {
    let record = find_mut(collection, id)?;
    if let Some(Value::String(existing)) = record.get("deleted_at") {
        return Some(existing.clone());
    }
    let stamp = now_rfc3339();
    record.insert("deleted_at".to_string(), Value::String(stamp.clone()));
    record.insert("deleted_by".to_string(), Value::String(actor.to_string()));
    touch(record);
    Some(stamp)
}

/// Clear the soft-delete marker on the record with `id`.
///
/// Returns `None` if no record has that id; restoring a live record is a
/// no-op that still counts as found.
pub fn restore(collection: &mut Vec<Value>, id: &str) -> Option<()> {
    let record = find_mut(collection, id)?;
    if record.remove("deleted_at").is_some() {
        record.remove("deleted_by");
        touch(record);
    }
    Some(())
}

/// The default view: records without a soft-delete marker.
pub fn filter_deleted(collection: &[Value]) -> Vec<&Value> {
    collection
        .iter()
        .filter(|r| !r.as_object().map(is_deleted).unwrap_or(false))
        .collect()
}

/// The trash view: records carrying a soft-delete marker.
pub fn deleted_items(collection: &[Value]) -> Vec<&Value> {
    collection
        .iter()
        .filter(|r| r.as_object().map(is_deleted).unwrap_or(false))
        .collect()
}

/// Permanently remove soft-deleted records whose `deleted_at` predates
/// `older_than` (all of them when `None`). Irreversible.
///
/// Returns how many records were removed.
pub fn purge(collection: &mut Vec<Value>, older_than: Option<DateTime<Utc>>) -> usize {
    let before = collection.len();
    collection.retain(|r| {
        let Some(record) = r.as_object() else {
            return true;
        };
        let Some(Value::String(deleted_at)) = record.get("deleted_at") else {
            return true;
        };
        match older_than {
            None => false,
            Some(threshold) => match DateTime::parse_from_rfc3339(deleted_at) {
                Ok(stamp) => stamp.with_timezone(&Utc) >= threshold,
                // unreadable marker: keep rather than destroy
                Err(_) => true,
            },
        }
    });
    before - collection.len()
}

fn find_mut<'a>(collection: &'a mut Vec<Value>, id: &str) -> Option<&'a mut Map<String, Value>> {
    collection
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|r| record_id(r) == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Value> {
        vec![
            json!({"id": "l1", "customer_id": "c1", "principal": 1000}),
            json!({"id": "l2", "customer_id": "c2", "principal": 2500}),
        ]
    }

    #[test]
    fn test_soft_delete_moves_record_to_trash_view() {
        let mut loans = sample();
        assert!(soft_delete(&mut loans, "l1", "alice").is_some());

        let active = filter_deleted(&loans);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["id"], json!("l2"));

        let trash = deleted_items(&loans);
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0]["id"], json!("l1"));
        assert_eq!(trash[0]["deleted_by"], json!("alice"));
        // the record never left the collection
        assert_eq!(loans.len(), 2);
    }

    #[test]
    fn test_soft_delete_unknown_id_is_none() {
        let mut loans = sample();
        assert!(soft_delete(&mut loans, "nope", "alice").is_none());
        assert_eq!(filter_deleted(&loans).len(), 2);
    }

    #[test]
    fn test_soft_delete_is_idempotent() {
        let mut loans = sample();
        let first = soft_delete(&mut loans, "l1", "alice").unwrap();
        let second = soft_delete(&mut loans, "l1", "bob").unwrap();
        assert_eq!(first, second);
        assert_eq!(deleted_items(&loans)[0]["deleted_by"], json!("alice"));
    }

    #[test]
    fn test_restore_reverses_soft_delete() {
        let mut loans = sample();
        soft_delete(&mut loans, "l1", "alice").unwrap();
        assert!(restore(&mut loans, "l1").is_some());

        assert_eq!(filter_deleted(&loans).len(), 2);
        assert!(deleted_items(&loans).is_empty());
        let record = loans[0].as_object().unwrap();
        assert!(!record.contains_key("deleted_at"));
        assert!(!record.contains_key("deleted_by"));
    }

    #[test]
    fn test_purge_all_deleted() {
        let mut loans = sample();
        soft_delete(&mut loans, "l1", "alice").unwrap();
        assert_eq!(purge(&mut loans, None), 1);
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0]["id"], json!("l2"));
    }

    #[test]
    fn test_purge_respects_threshold() {
        let mut loans = sample();
        soft_delete(&mut loans, "l1", "alice").unwrap();
        // freshly deleted, threshold in the past: nothing predates it
        let long_ago = Utc::now() - chrono::Duration::days(30);
        assert_eq!(purge(&mut loans, Some(long_ago)), 0);
        assert_eq!(loans.len(), 2);

        // threshold in the future catches it
        let soon = Utc::now() + chrono::Duration::days(1);
        assert_eq!(purge(&mut loans, Some(soon)), 1);
        assert_eq!(loans.len(), 1);
    }

    #[test]
    fn test_purge_keeps_records_with_unreadable_marker() {
        let mut items = vec![json!({"id": "x1", "deleted_at": "not a date"})];
        assert_eq!(purge(&mut items, Some(Utc::now())), 0);
        assert_eq!(items.len(), 1);
        // an explicit purge-all still takes it
        assert_eq!(purge(&mut items, None), 1);
    }
}
