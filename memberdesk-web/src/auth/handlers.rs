//! Authentication endpoints

use axum::{extract::State, response::Json, Extension};
use serde::Serialize;
use utoipa::ToSchema;

use memberdesk_core::{AuditIntent, Principal};

use super::users::{LoginRequest, RefreshRequest};
use super::{AuthError, TokenPair};
use crate::audit::trail::AuditTrail;
use crate::handlers::types::MessageResponse;
use crate::state::AppState;

/// Login response: the resolved principal plus a flattened token pair
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: Principal,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Check credentials and issue a token pair
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let (account, tokens) = state
        .user_service
        .login(&request.username, &request.password)
        .await?;

    let principal = state
        .resolve_principal(&account.id)
        .await
        .ok_or_else(|| AuthError::Storage("Failed to resolve principal after login".to_string()))?;

    tracing::info!("User {} logged in", principal.username);

    // Login happens on a public route, so the authentication layer has
    // no actor to attach; the handler knows who just proved their
    // identity and says so itself.
    trail.set_actor(principal.clone());
    trail.record(AuditIntent::new("auth.login", "user").with_entity_id(principal.id.clone()));

    Ok(Json(AuthResponse {
        user: principal,
        tokens,
    }))
}

/// Exchange a refresh token for a fresh pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let tokens = state
        .user_service
        .refresh_token(&request.refresh_token)
        .await?;
    Ok(Json(tokens))
}

/// The caller's own principal, as the guard sees it
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = Principal),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

/// Record the end of a session. Tokens are stateless, so the client
/// discards them; the server's part is the audit record.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    Extension(principal): Extension<Principal>,
    Extension(trail): Extension<AuditTrail>,
) -> Json<MessageResponse> {
    trail.record(AuditIntent::new("auth.logout", "user").with_entity_id(principal.id.clone()));
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}
