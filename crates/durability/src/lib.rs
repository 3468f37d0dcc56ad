//! Durability layer for Ledgerdesk
//!
//! Two concerns that live outside the document's lock:
//! - [`snapshot`]: debounced, capped full copies of the backing file
//! - [`audit`]: the append-only JSON-lines change log
//!
//! Both may interleave freely with unrelated loads and saves.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod snapshot;

pub use audit::{AuditAction, AuditEntry, AuditTrail};
pub use snapshot::SnapshotManager;
