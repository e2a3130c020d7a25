//! Membership application endpoints
//!
//! Submission is the one public route that still audits; the event
//! carries no actor. Review decisions are permission-gated and record
//! the deciding principal.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::json;

use memberdesk_core::{AuditIntent, Principal};

use super::types::{DecisionRequest, SubmitMembershipRequest};
use crate::audit::trail::AuditTrail;
use crate::database::MembershipApplication;
use crate::state::AppState;
use crate::{WebError, WebResult};

/// Public submission form target
#[utoipa::path(
    post,
    path = "/api/memberships",
    request_body = SubmitMembershipRequest,
    responses(
        (status = 201, description = "Application recorded", body = MembershipApplication),
        (status = 400, description = "Invalid submission")
    ),
    tag = "memberships"
)]
pub async fn submit_membership(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Json(request): Json<SubmitMembershipRequest>,
) -> Result<(StatusCode, Json<MembershipApplication>), WebError> {
    let applicant_name = request.applicant_name.trim();
    if applicant_name.is_empty() {
        return Err(WebError::Validation("applicant_name is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(WebError::Validation("email is not valid".to_string()));
    }
    if request.motivation.trim().is_empty() {
        return Err(WebError::Validation("motivation is required".to_string()));
    }

    let application = state
        .database
        .insert_application(applicant_name, &request.email, request.motivation.trim())
        .await?;

    trail.record(
        AuditIntent::new("membership.submit", "membership")
            .with_entity_id(application.id.clone()),
    );

    Ok((StatusCode::CREATED, Json(application)))
}

/// All applications, newest first
#[utoipa::path(
    get,
    path = "/api/memberships",
    responses(
        (status = 200, description = "Applications", body = [MembershipApplication]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing MEMBERSHIP_VIEW")
    ),
    security(("bearer_auth" = [])),
    tag = "memberships"
)]
pub async fn list_memberships(
    State(state): State<AppState>,
) -> WebResult<Json<Vec<MembershipApplication>>> {
    let applications = state.database.list_applications().await?;
    Ok(Json(applications))
}

/// Approve a pending application
#[utoipa::path(
    post,
    path = "/api/memberships/{id}/approve",
    params(("id" = String, Path, description = "Application id")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Application approved", body = MembershipApplication),
        (status = 404, description = "Unknown application")
    ),
    security(("bearer_auth" = [])),
    tag = "memberships"
)]
pub async fn approve_membership(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> WebResult<Json<MembershipApplication>> {
    decide(
        state,
        principal,
        trail,
        id,
        body,
        "approved",
        "membership.approve",
    )
    .await
}

/// Reject a pending application
#[utoipa::path(
    post,
    path = "/api/memberships/{id}/reject",
    params(("id" = String, Path, description = "Application id")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Application rejected", body = MembershipApplication),
        (status = 404, description = "Unknown application")
    ),
    security(("bearer_auth" = [])),
    tag = "memberships"
)]
pub async fn reject_membership(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
    body: Option<Json<DecisionRequest>>,
) -> WebResult<Json<MembershipApplication>> {
    decide(
        state,
        principal,
        trail,
        id,
        body,
        "rejected",
        "membership.reject",
    )
    .await
}

async fn decide(
    state: AppState,
    principal: Principal,
    trail: AuditTrail,
    id: String,
    body: Option<Json<DecisionRequest>>,
    status: &str,
    action: &str,
) -> WebResult<Json<MembershipApplication>> {
    let note = body.and_then(|Json(decision)| decision.note);

    let application = state
        .database
        .decide_application(&id, status, &principal.id, note.clone())
        .await?;

    let mut intent = AuditIntent::new(action, "membership").with_entity_id(application.id.clone());
    if let Some(note) = note {
        intent = intent.with_metadata(json!({ "note": note }));
    }
    trail.record(intent);

    Ok(Json(application))
}
