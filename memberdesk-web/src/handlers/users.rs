//! User administration endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::json;

use memberdesk_core::{AuditIntent, Principal};

use super::types::MessageResponse;
use crate::audit::trail::AuditTrail;
use crate::auth::users::{AssignRolesRequest, CreateUserRequest, UserInfo};
use crate::auth::AuthError;
use crate::state::AppState;

/// All accounts, oldest first
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Accounts", body = [UserInfo]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing USER_MANAGE")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserInfo>>, AuthError> {
    let accounts = state.user_service.list_users().await?;
    Ok(Json(accounts.iter().map(UserInfo::from).collect()))
}

/// Create an account with an initial role set
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserInfo),
        (status = 404, description = "Unknown role in the initial set"),
        (status = 409, description = "Username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserInfo>), AuthError> {
    state.role_service.ensure_exist(&request.roles).await?;

    let account = state.user_service.create_user(request).await?;

    trail.record(
        AuditIntent::new("user.create", "user")
            .with_entity_id(account.id.clone())
            .with_metadata(json!({
                "username": account.username,
                "roles": account.roles,
            })),
    );

    Ok((StatusCode::CREATED, Json(UserInfo::from(&account))))
}

/// Replace an account's role set
#[utoipa::path(
    put,
    path = "/api/users/{id}/roles",
    params(("id" = String, Path, description = "User id")),
    request_body = AssignRolesRequest,
    responses(
        (status = 200, description = "Roles replaced", body = UserInfo),
        (status = 404, description = "Unknown user or role")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn assign_roles(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
    Json(request): Json<AssignRolesRequest>,
) -> Result<Json<UserInfo>, AuthError> {
    state.role_service.ensure_exist(&request.roles).await?;

    let account = state.user_service.assign_roles(&id, &request.roles).await?;

    trail.record(
        AuditIntent::new("user.assign_roles", "user")
            .with_entity_id(account.id.clone())
            .with_metadata(json!({ "roles": account.roles })),
    );

    Ok(Json(UserInfo::from(&account)))
}

/// Delete an account. Deleting the account you are logged in with is
/// refused.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Attempted self-deletion"),
        (status = 404, description = "Unknown user")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AuthError> {
    if principal.id == id {
        return Err(AuthError::SelfDeletion);
    }

    state.user_service.delete_user(&id).await?;

    trail.record(AuditIntent::new("user.delete", "user").with_entity_id(id));

    Ok(Json(MessageResponse {
        message: "Account deleted".to_string(),
    }))
}
