//! Ledgerdesk — file-backed document store for a small business-management
//! system (projects, customers, invoices, loans, trouble tickets).
//!
//! One shared JSON document instead of a database engine. This crate is the
//! in-process library surface the surrounding application consumes; there is
//! no network protocol.
//!
//! # Quick start
//!
//! ```ignore
//! use ledgerdesk::{DocumentStore, StoreConfig};
//!
//! let store = DocumentStore::open("data/document.json");
//!
//! // request handler shape: load once, mutate, save once
//! let mut doc = store.load();
//! doc.records_mut("projects").unwrap().push(serde_json::json!({
//!     "id": "p1", "name": "Rollout"
//! }));
//! store.save(&doc)?;
//! ```
//!
//! PII-bearing collections get `decrypt_pii` right after `load()` and
//! `encrypt_pii` right before `save()`; the audit trail is written after a
//! successful save.

pub use ledgerdesk_core::{
    now_rfc3339, record_id, schema, stamp_new, touch, Document, Record, Result, StoreError,
};
pub use ledgerdesk_durability::{AuditAction, AuditEntry, AuditTrail, SnapshotManager};
pub use ledgerdesk_security::{PiiCodec, CIPHERTEXT_TAG};
pub use ledgerdesk_storage::{health, soft_delete, DocumentStore, StoreConfig};
