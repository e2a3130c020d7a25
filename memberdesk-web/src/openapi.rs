//! OpenAPI document
//!
//! Served as raw JSON at `/api/openapi.json`; the dashboard build step
//! generates its client from this document.

use axum::response::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use memberdesk_core::{
    ActionCount, AuditEvent, AuditPage, AuditSummary, Permission, Principal, Role,
};

use crate::auth::handlers::AuthResponse;
use crate::auth::jwt::TokenPair;
use crate::auth::users::{AssignRolesRequest, CreateUserRequest, LoginRequest, RefreshRequest, UserInfo};
use crate::auth::roles::{CreateRoleRequest, UpdateRoleRequest};
use crate::database::{MembershipApplication, NewsArticle, SocialEmbed};
use crate::handlers::types::{
    CreateEmbedRequest, CreateNewsRequest, DecisionRequest, HealthResponse, MessageResponse,
    SubmitMembershipRequest, UpdateNewsRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh,
        crate::auth::handlers::me,
        crate::auth::handlers::logout,
        crate::handlers::memberships::submit_membership,
        crate::handlers::memberships::list_memberships,
        crate::handlers::memberships::approve_membership,
        crate::handlers::memberships::reject_membership,
        crate::handlers::news::list_news,
        crate::handlers::news::create_news,
        crate::handlers::news::update_news,
        crate::handlers::news::delete_news,
        crate::handlers::news::publish_news,
        crate::handlers::embeds::list_embeds,
        crate::handlers::embeds::create_embed,
        crate::handlers::embeds::delete_embed,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::assign_roles,
        crate::handlers::users::delete_user,
        crate::handlers::roles::list_roles,
        crate::handlers::roles::create_role,
        crate::handlers::roles::update_role,
        crate::audit::handlers::list_audit_logs,
        crate::audit::handlers::audit_stats,
    ),
    components(schemas(
        Permission,
        Role,
        Principal,
        AuditEvent,
        AuditPage,
        ActionCount,
        AuditSummary,
        TokenPair,
        AuthResponse,
        LoginRequest,
        RefreshRequest,
        CreateUserRequest,
        AssignRolesRequest,
        CreateRoleRequest,
        UpdateRoleRequest,
        UserInfo,
        MembershipApplication,
        NewsArticle,
        SocialEmbed,
        HealthResponse,
        MessageResponse,
        SubmitMembershipRequest,
        DecisionRequest,
        CreateNewsRequest,
        UpdateNewsRequest,
        CreateEmbedRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "system", description = "Health and diagnostics"),
        (name = "auth", description = "Login, token refresh, session"),
        (name = "memberships", description = "Membership applications and review"),
        (name = "news", description = "News drafting and publishing"),
        (name = "embeds", description = "Curated social embeds"),
        (name = "users", description = "Account administration"),
        (name = "roles", description = "Role and grant administration"),
        (name = "audit", description = "Audit log queries"),
    ),
    info(
        title = "Memberdesk API",
        description = "Backing API for the membership admin dashboard",
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
