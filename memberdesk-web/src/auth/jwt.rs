//! JWT issuing and verification
//!
//! HS256 tokens signed with a process-wide secret. Claims carry the
//! user's role names, never resolved permissions; grants are looked up
//! fresh on every request so a revoked role takes effect immediately.

use std::sync::LazyLock;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthError;

/// Access token lifetime in seconds (1 hour)
pub const ACCESS_TOKEN_DURATION: i64 = 60 * 60;
/// Refresh token lifetime in seconds (30 days)
pub const REFRESH_TOKEN_DURATION: i64 = 60 * 60 * 24 * 30;

static KEYS: LazyLock<Keys> = LazyLock::new(|| {
    let secret = std::env::var("MEMBERDESK_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("MEMBERDESK_JWT_SECRET not set, using development secret");
        "memberdesk-dev-secret-change-in-production".to_string()
    });
    Keys::new(secret.as_bytes())
});

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Distinguishes the two tokens of a pair; each endpoint accepts
/// exactly one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Role names at issue time, informational only
    pub roles: Vec<String>,
    pub token_type: TokenType,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// The pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Stateless facade over the signing keys
pub struct JwtService;

impl JwtService {
    /// Issue a fresh access/refresh pair for a user
    pub fn generate_token_pair(
        user_id: &str,
        username: &str,
        roles: &[String],
    ) -> Result<TokenPair, AuthError> {
        let access_token = Self::generate_token(
            user_id,
            username,
            roles,
            TokenType::Access,
            ACCESS_TOKEN_DURATION,
        )?;
        let refresh_token = Self::generate_token(
            user_id,
            username,
            roles,
            TokenType::Refresh,
            REFRESH_TOKEN_DURATION,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_DURATION,
        })
    }

    fn generate_token(
        user_id: &str,
        username: &str,
        roles: &[String],
        token_type: TokenType,
        duration_secs: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            roles: roles.to_vec(),
            token_type,
            iat: now,
            exp: now + duration_secs,
        };

        encode(&Header::default(), &claims, &KEYS.encoding).map_err(|e| {
            tracing::error!("Token encoding failed: {}", e);
            AuthError::TokenCreation
        })
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify_token(token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &KEYS.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}
