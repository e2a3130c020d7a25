//! Request handlers for the carrier domain
//!
//! Mutating handlers record their audit intent on the request trail
//! only after the effect succeeded; the completion layer decides
//! whether the intent becomes a persisted event.

pub mod embeds;
pub mod health;
pub mod memberships;
pub mod news;
pub mod roles;
pub mod types;
pub mod users;
