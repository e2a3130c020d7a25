//! Audit query endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use memberdesk_core::{AuditPage, AuditQuery, AuditSummary};

use crate::state::AppState;
use crate::WebResult;

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    /// How many top actions to return
    pub top: Option<usize>,
}

impl StatsParams {
    fn effective_top(&self) -> usize {
        self.top.unwrap_or(10).clamp(1, 100)
    }
}

/// Query the audit log, newest first
#[utoipa::path(
    get,
    path = "/api/audit/logs",
    params(
        ("user_id" = Option<String>, Query, description = "Substring filter on the actor id"),
        ("action" = Option<String>, Query, description = "Case-insensitive substring filter on the action tag"),
        ("limit" = Option<i64>, Query, description = "Page size, 1 to 1000, default 100"),
        ("offset" = Option<i64>, Query, description = "Rows to skip, default 0"),
    ),
    responses(
        (status = 200, description = "Matching events with the total match count", body = AuditPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing AUDIT_VIEW")
    ),
    security(("bearer_auth" = [])),
    tag = "audit"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> WebResult<Json<AuditPage>> {
    let page = state.audit_store.query(&query).await?;
    Ok(Json(page))
}

/// Aggregate view over the whole audit log
#[utoipa::path(
    get,
    path = "/api/audit/stats",
    params(
        ("top" = Option<usize>, Query, description = "How many top actions to return, default 10"),
    ),
    responses(
        (status = 200, description = "Totals and most frequent actions", body = AuditSummary),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing AUDIT_VIEW")
    ),
    security(("bearer_auth" = [])),
    tag = "audit"
)]
pub async fn audit_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> WebResult<Json<AuditSummary>> {
    let summary = state.audit_store.summarize(params.effective_top()).await?;
    Ok(Json(summary))
}
