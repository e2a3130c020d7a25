//! Memberdesk Core - Shared authorization and audit primitives
//!
//! This crate defines the permission catalog, role records, the request
//! principal, the pure permission evaluator, and the audit event types
//! shared by the Memberdesk web service and client crates.

pub mod audit;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use audit::*;
pub use permissions::*;
pub use principal::*;
pub use roles::*;
