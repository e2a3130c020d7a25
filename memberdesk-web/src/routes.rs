//! Route registration and the authorization policy table
//!
//! Routes and policies are declared side by side so a new endpoint and
//! its permission requirement land in the same review. The guard falls
//! back to requiring authentication for any route missing from the
//! table.

use axum::{
    http::Method,
    routing::{delete, get, post, put},
    Router,
};

use memberdesk_core::Permission;

use crate::audit::handlers as audit;
use crate::auth::handlers as auth;
use crate::handlers::{embeds, health, memberships, news, roles, users};
use crate::openapi;
use crate::policy::PolicyTable;
use crate::state::AppState;

/// Everything mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // system
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::openapi_json))
        // auth
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        // membership applications
        .route(
            "/memberships",
            post(memberships::submit_membership).get(memberships::list_memberships),
        )
        .route(
            "/memberships/{id}/approve",
            post(memberships::approve_membership),
        )
        .route(
            "/memberships/{id}/reject",
            post(memberships::reject_membership),
        )
        // news
        .route("/news", get(news::list_news).post(news::create_news))
        .route("/news/{id}", put(news::update_news).delete(news::delete_news))
        .route("/news/{id}/publish", post(news::publish_news))
        // social embeds
        .route("/embeds", get(embeds::list_embeds).post(embeds::create_embed))
        .route("/embeds/{id}", delete(embeds::delete_embed))
        // user administration
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/roles", put(users::assign_roles))
        // role administration
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route("/roles/{name}", put(roles::update_role))
        // audit
        .route("/audit/logs", get(audit::list_audit_logs))
        .route("/audit/stats", get(audit::audit_stats))
}

/// Permission requirements for every route above. Patterns are the
/// matched-path form, including the `/api` nest prefix.
pub fn policy_table() -> PolicyTable {
    PolicyTable::builder()
        // public surface
        .public(Method::GET, "/api/health")
        .public(Method::GET, "/api/openapi.json")
        .public(Method::POST, "/api/auth/login")
        .public(Method::POST, "/api/auth/refresh")
        .public(Method::POST, "/api/memberships")
        // signed-in, no specific permission
        .authenticated(Method::GET, "/api/auth/me")
        .authenticated(Method::POST, "/api/auth/logout")
        .authenticated(Method::GET, "/api/news")
        .authenticated(Method::GET, "/api/embeds")
        // membership review
        .require(
            Method::GET,
            "/api/memberships",
            &[Permission::MembershipView],
        )
        .require(
            Method::POST,
            "/api/memberships/{id}/approve",
            &[Permission::MembershipReview],
        )
        .require(
            Method::POST,
            "/api/memberships/{id}/reject",
            &[Permission::MembershipReview],
        )
        // news
        .require(Method::POST, "/api/news", &[Permission::NewsCreate])
        .require(Method::PUT, "/api/news/{id}", &[Permission::NewsUpdate])
        .require(Method::DELETE, "/api/news/{id}", &[Permission::NewsDelete])
        .require(
            Method::POST,
            "/api/news/{id}/publish",
            &[Permission::NewsCreate, Permission::NewsPublish],
        )
        // embeds
        .require(Method::POST, "/api/embeds", &[Permission::EmbedManage])
        .require(Method::DELETE, "/api/embeds/{id}", &[Permission::EmbedManage])
        // user administration
        .require(Method::GET, "/api/users", &[Permission::UserManage])
        .require(Method::POST, "/api/users", &[Permission::UserManage])
        .require(Method::DELETE, "/api/users/{id}", &[Permission::UserManage])
        .require(
            Method::PUT,
            "/api/users/{id}/roles",
            &[Permission::UserManage],
        )
        // role administration
        .require(Method::GET, "/api/roles", &[Permission::RoleManage])
        .require(Method::POST, "/api/roles", &[Permission::RoleManage])
        .require(Method::PUT, "/api/roles/{name}", &[Permission::RoleManage])
        // the whole audit surface is gated as one group
        .group("/api/audit", &[Permission::AuditView])
        .build()
}
