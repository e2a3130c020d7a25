//! Credential storage behind the request pipeline

use async_trait::async_trait;
use tokio::sync::RwLock;

/// An access/refresh token pair as returned by the login and refresh
/// endpoints
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
}

/// Storage seam for the session's token pair. The pipeline reads the
/// access token on every call, swaps the whole pair on refresh, and
/// clears the store when the session ends.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn access_token(&self) -> Option<String>;
    async fn refresh_token(&self) -> Option<String>;
    async fn store(&self, tokens: TokenSet);
    async fn clear(&self);
}

/// In-memory credential store, one session per instance
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<Option<TokenSet>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing pair, e.g. restored from disk
    pub fn with_tokens(tokens: TokenSet) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.refresh_token.clone())
    }

    async fn store(&self, tokens: TokenSet) {
        *self.tokens.write().await = Some(tokens);
    }

    async fn clear(&self) {
        *self.tokens.write().await = None;
    }
}
