//! Role administration endpoints
//!
//! Grant changes take effect on the next request of every affected
//! user; there is no cache to invalidate.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::json;

use memberdesk_core::{AuditIntent, Role};

use crate::audit::trail::AuditTrail;
use crate::auth::roles::{CreateRoleRequest, UpdateRoleRequest};
use crate::auth::AuthError;
use crate::state::AppState;

/// All roles with their grants
#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "Roles", body = [Role]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing ROLE_MANAGE")
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, AuthError> {
    let roles = state.role_service.list().await?;
    Ok(Json(roles))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid role"),
        (status = 409, description = "Role already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn create_role(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Json(request): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), AuthError> {
    let role = state
        .role_service
        .create(&request.name, request.permissions)
        .await?;

    trail.record(
        AuditIntent::new("role.create", "role")
            .with_entity_id(role.name.clone())
            .with_metadata(json!({ "permissions": role.permissions })),
    );

    Ok((StatusCode::CREATED, Json(role)))
}

/// Replace a role's permission grants
#[utoipa::path(
    put,
    path = "/api/roles/{name}",
    params(("name" = String, Path, description = "Role name")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Grants replaced", body = Role),
        (status = 404, description = "Unknown role")
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn update_role(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Path(name): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<Role>, AuthError> {
    let role = state
        .role_service
        .update(&name, request.permissions)
        .await?;

    trail.record(
        AuditIntent::new("role.update", "role")
            .with_entity_id(role.name.clone())
            .with_metadata(json!({ "permissions": role.permissions })),
    );

    Ok(Json(role))
}
