//! Core types for the Ledgerdesk document store
//!
//! This crate carries the pieces every other layer depends on:
//! - [`Document`]: the single root JSON object and its record accessors
//! - [`schema`]: the static entity catalog and additive schema completion
//! - [`StoreError`]: the error taxonomy shared across the workspace
//!
//! No I/O happens here; persistence lives in `ledgerdesk-storage`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod schema;

pub use document::{now_rfc3339, record_id, stamp_new, touch, Document, Record};
pub use error::{Result, StoreError};
