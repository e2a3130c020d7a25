//! Audit subsystem
//!
//! Handlers declare intents on a per-request trail; the completion
//! layer in `crate::middleware` turns intents into persisted events
//! once the final response status is known. Query endpoints live in
//! `handlers`, storage behind the `AuditStore` trait in `store`.

pub mod handlers;
pub mod store;
pub mod trail;

pub use store::{AuditStore, MemoryAuditStore, SqliteAuditStore};
pub use trail::AuditTrail;
