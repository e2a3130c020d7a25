//! Authentication and account management
//!
//! JWT-based authentication with an access/refresh token pair, argon2
//! password hashing, and pluggable user/role stores. The guard
//! middleware consumes the principal this module resolves; see
//! `crate::middleware` for the enforcement side.

pub mod database;
pub mod handlers;
pub mod jwt;
pub mod roles;
pub mod users;


pub use jwt::{Claims, JwtService, TokenPair, TokenType};
pub use roles::{RoleService, RoleStore};
pub use users::{UserAccount, UserInfo, UserService, UserStore};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors from authentication and account administration
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Token creation failed")]
    TokenCreation,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Wrong token type")]
    InvalidTokenType,

    #[error("User not found")]
    UserNotFound,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Cannot delete own account")]
    SelfDeletion,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Role already exists: {0}")]
    RoleExists(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid username or password".to_string(),
            ),
            AuthError::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                "missing_credentials",
                "Username and password are required".to_string(),
            ),
            AuthError::TokenCreation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "Failed to create token".to_string(),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid token".to_string(),
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Token has expired".to_string(),
            ),
            AuthError::InvalidTokenType => (
                StatusCode::UNAUTHORIZED,
                "invalid_token_type",
                "Wrong token type for this operation".to_string(),
            ),
            AuthError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                "User not found".to_string(),
            ),
            AuthError::UsernameTaken => (
                StatusCode::CONFLICT,
                "username_taken",
                "Username is already taken".to_string(),
            ),
            AuthError::SelfDeletion => (
                StatusCode::BAD_REQUEST,
                "self_deletion",
                "Cannot delete your own account".to_string(),
            ),
            AuthError::InvalidRole(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_role",
                format!("Invalid role: {}", reason),
            ),
            AuthError::RoleNotFound(name) => (
                StatusCode::NOT_FOUND,
                "role_not_found",
                format!("Role {} not found", name),
            ),
            AuthError::RoleExists(name) => (
                StatusCode::CONFLICT,
                "role_exists",
                format!("Role {} already exists", name),
            ),
            AuthError::Storage(e) => {
                tracing::error!("Auth storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Internal storage error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
