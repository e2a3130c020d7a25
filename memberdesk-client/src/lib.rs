//! Memberdesk API Client
//!
//! Authenticated HTTP pipeline for the Memberdesk admin dashboard. Every
//! call carries the stored short-lived access token; a 401 triggers one
//! coordinated silent refresh with the long-lived refresh token, and the
//! original request is replayed once with the new credential. Concurrent
//! 401s share a single refresh call.

pub mod credentials;
pub mod pipeline;

pub use credentials::{CredentialStore, MemoryCredentialStore, TokenSet};
pub use pipeline::{ApiClient, ClientConfig, LoginOutcome, RefreshCoordinator, RequestSpec};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the client pipeline
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The refresh credential was rejected or the refresh call failed.
    /// Stored credentials have been cleared; the caller must send the
    /// user back through login.
    #[error("session expired, re-authentication required")]
    SessionExpired,

    /// A direct authentication call was rejected
    #[error("authentication rejected with status {0}")]
    Rejected(StatusCode),
}

pub type ClientResult<T> = Result<T, ClientError>;
