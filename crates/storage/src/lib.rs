//! Persistence layer for the Ledgerdesk document
//!
//! This crate implements the document store proper:
//! - [`DocumentStore`]: concurrency-safe `load()` / `save()` / `update()`
//!   over the single backing JSON file
//! - [`soft_delete`]: logical delete/restore/filter/purge over a collection
//! - [`health`]: the minimal liveness probe
//!
//! One OS process per request is the operating model; the backing file is
//! the sole shared mutable resource, guarded by advisory file locks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod health;
pub mod soft_delete;
pub mod store;

mod lock;

pub use config::StoreConfig;
pub use store::DocumentStore;
