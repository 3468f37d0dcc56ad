//! Schema registry
//!
//! Static catalog of the entity collections the application knows about,
//! their zero-values, and per-field metadata.
//!
//! Migration policy is additive-only: [`ensure_schema`] inserts the default
//! for every registry key missing from a document and never overwrites an
//! existing key. There is no version field — a document written before a
//! collection existed becomes schema-complete on its next load.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::document::Document;

/// Metadata for one declared field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field must be present on a valid record.
    pub required: bool,
    /// Field may be changed through the application's edit paths.
    pub editable: bool,
}

/// Fields the store itself maintains; never editable, on any entity.
const IMMUTABLE_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

enum Shape {
    /// Ordered array of records.
    List,
    /// Single object (configuration-style entities).
    Singleton(fn() -> Value),
}

struct EntitySpec {
    name: &'static str,
    shape: Shape,
    /// Declared field metadata; `None` marks a free-form entity where every
    /// field is editable.
    fields: Option<HashMap<&'static str, FieldSpec>>,
}

const fn field(required: bool, editable: bool) -> FieldSpec {
    FieldSpec { required, editable }
}

fn entity_fields(declared: &[(&'static str, FieldSpec)]) -> Option<HashMap<&'static str, FieldSpec>> {
    let mut map: HashMap<&'static str, FieldSpec> = declared.iter().copied().collect();
    map.insert("id", field(true, false));
    map.insert("created_at", field(false, false));
    map.insert("updated_at", field(false, false));
    Some(map)
}

fn settings_default() -> Value {
    json!({
        "spreadsheet_url": "",
        "company_name": "",
        "locale": "en",
    })
}

/// The canonical catalog, in canonical key order.
static REGISTRY: Lazy<Vec<EntitySpec>> = Lazy::new(|| {
    vec![
        EntitySpec {
            name: "projects",
            shape: Shape::List,
            fields: entity_fields(&[
                ("name", field(true, true)),
                ("customer_id", field(true, true)),
                ("status", field(false, true)),
                ("start_date", field(false, true)),
                ("end_date", field(false, true)),
                ("notes", field(false, true)),
            ]),
        },
        EntitySpec {
            name: "customers",
            shape: Shape::List,
            fields: entity_fields(&[
                ("name", field(true, true)),
                ("phone", field(false, true)),
                ("email", field(false, true)),
                ("address", field(false, true)),
                ("branches", field(false, true)),
                ("notes", field(false, true)),
            ]),
        },
        EntitySpec {
            name: "employees",
            shape: Shape::List,
            fields: entity_fields(&[
                ("name", field(true, true)),
                ("role", field(false, true)),
                ("phone", field(false, true)),
                ("email", field(false, true)),
            ]),
        },
        EntitySpec {
            name: "invoices",
            shape: Shape::List,
            fields: entity_fields(&[
                ("customer_id", field(true, true)),
                ("project_id", field(false, true)),
                ("amount", field(true, true)),
                ("currency", field(false, true)),
                ("issued_at", field(false, true)),
                ("due_date", field(false, true)),
                ("status", field(false, true)),
            ]),
        },
        EntitySpec {
            name: "loans",
            shape: Shape::List,
            fields: entity_fields(&[
                ("customer_id", field(true, true)),
                ("principal", field(true, true)),
                ("interest_rate", field(false, true)),
                ("issued_at", field(false, true)),
                ("due_date", field(false, true)),
                ("status", field(false, true)),
            ]),
        },
        EntitySpec {
            name: "repayments",
            shape: Shape::List,
            fields: None,
        },
        EntitySpec {
            name: "troubles",
            shape: Shape::List,
            fields: entity_fields(&[
                ("title", field(true, true)),
                ("project_id", field(false, true)),
                ("severity", field(false, true)),
                ("status", field(false, true)),
                ("reported_by", field(false, true)),
            ]),
        },
        EntitySpec {
            name: "tasks",
            shape: Shape::List,
            fields: None,
        },
        EntitySpec {
            name: "comments",
            shape: Shape::List,
            fields: None,
        },
        EntitySpec {
            name: "notifications",
            shape: Shape::List,
            fields: None,
        },
        EntitySpec {
            name: "scheduled_invoices",
            shape: Shape::List,
            fields: None,
        },
        EntitySpec {
            name: "settings",
            shape: Shape::Singleton(settings_default),
            fields: None,
        },
    ]
});

fn lookup(entity: &str) -> Option<&'static EntitySpec> {
    REGISTRY.iter().find(|e| e.name == entity)
}

/// The canonical list of top-level collection names.
pub fn entity_keys() -> Vec<&'static str> {
    REGISTRY.iter().map(|e| e.name).collect()
}

/// Zero-value for a collection: an empty array for record collections, a
/// literal object for singletons, `None` for unregistered names.
pub fn default_value(entity: &str) -> Option<Value> {
    lookup(entity).map(|e| match e.shape {
        Shape::List => Value::Array(Vec::new()),
        Shape::Singleton(default) => default(),
    })
}

/// Declared field metadata for an entity, or `None` for free-form entities
/// (and unregistered names).
pub fn fields(entity: &str) -> Option<&'static HashMap<&'static str, FieldSpec>> {
    lookup(entity).and_then(|e| e.fields.as_ref())
}

/// Insert the default value for every registry key missing from `doc`.
///
/// Never overwrites an existing key. Idempotent; this is the only migration
/// mechanism.
pub fn ensure_schema(doc: &mut Document) {
    for entity in REGISTRY.iter() {
        if !doc.contains(entity.name) {
            match entity.shape {
                Shape::List => doc.insert(entity.name, Value::Array(Vec::new())),
                Shape::Singleton(default) => doc.insert(entity.name, default()),
            }
        }
    }
}

/// Whether an application edit path may change `field` on `entity`.
///
/// `id` and the store-maintained timestamps are never editable. When the
/// entity declares field metadata, undeclared fields are not editable
/// either; free-form entities accept edits to any field.
pub fn is_field_editable(entity: &str, field: &str) -> bool {
    if IMMUTABLE_FIELDS.contains(&field) {
        return false;
    }
    match fields(entity) {
        Some(declared) => declared.get(field).map(|f| f.editable).unwrap_or(false),
        None => true,
    }
}
