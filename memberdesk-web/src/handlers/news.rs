//! News article endpoints
//!
//! Publishing requires both NEWS_CREATE and NEWS_PUBLISH, the one
//! two-permission route in the policy table.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};

use memberdesk_core::{AuditIntent, Principal};

use super::types::{CreateNewsRequest, MessageResponse, UpdateNewsRequest};
use crate::audit::trail::AuditTrail;
use crate::database::NewsArticle;
use crate::state::AppState;
use crate::{WebError, WebResult};

/// All articles including drafts, newest first
#[utoipa::path(
    get,
    path = "/api/news",
    responses(
        (status = 200, description = "Articles", body = [NewsArticle]),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "news"
)]
pub async fn list_news(State(state): State<AppState>) -> WebResult<Json<Vec<NewsArticle>>> {
    let articles = state.database.list_news().await?;
    Ok(Json(articles))
}

/// Create a draft article
#[utoipa::path(
    post,
    path = "/api/news",
    request_body = CreateNewsRequest,
    responses(
        (status = 201, description = "Draft created", body = NewsArticle),
        (status = 400, description = "Invalid article"),
        (status = 403, description = "Missing NEWS_CREATE")
    ),
    security(("bearer_auth" = [])),
    tag = "news"
)]
pub async fn create_news(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(trail): Extension<AuditTrail>,
    Json(request): Json<CreateNewsRequest>,
) -> Result<(StatusCode, Json<NewsArticle>), WebError> {
    if request.title.trim().is_empty() {
        return Err(WebError::Validation("title is required".to_string()));
    }

    let article = state
        .database
        .insert_news(request.title.trim(), &request.body, &principal.id)
        .await?;

    trail.record(AuditIntent::new("news.create", "news").with_entity_id(article.id.clone()));

    Ok((StatusCode::CREATED, Json(article)))
}

/// Replace an article's title and body
#[utoipa::path(
    put,
    path = "/api/news/{id}",
    params(("id" = String, Path, description = "Article id")),
    request_body = UpdateNewsRequest,
    responses(
        (status = 200, description = "Article updated", body = NewsArticle),
        (status = 404, description = "Unknown article")
    ),
    security(("bearer_auth" = [])),
    tag = "news"
)]
pub async fn update_news(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
    Json(request): Json<UpdateNewsRequest>,
) -> WebResult<Json<NewsArticle>> {
    if request.title.trim().is_empty() {
        return Err(WebError::Validation("title is required".to_string()));
    }

    let article = state
        .database
        .update_news(&id, request.title.trim(), &request.body)
        .await?;

    trail.record(AuditIntent::new("news.update", "news").with_entity_id(article.id.clone()));

    Ok(Json(article))
}

/// Delete an article
#[utoipa::path(
    delete,
    path = "/api/news/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article deleted", body = MessageResponse),
        (status = 404, description = "Unknown article")
    ),
    security(("bearer_auth" = [])),
    tag = "news"
)]
pub async fn delete_news(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    state.database.delete_news(&id).await?;

    trail.record(AuditIntent::new("news.delete", "news").with_entity_id(id));

    Ok(Json(MessageResponse {
        message: "Article deleted".to_string(),
    }))
}

/// Mark an article as published
#[utoipa::path(
    post,
    path = "/api/news/{id}/publish",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article published", body = NewsArticle),
        (status = 403, description = "Missing NEWS_CREATE or NEWS_PUBLISH"),
        (status = 404, description = "Unknown article")
    ),
    security(("bearer_auth" = [])),
    tag = "news"
)]
pub async fn publish_news(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
) -> WebResult<Json<NewsArticle>> {
    let article = state.database.publish_news(&id).await?;

    trail.record(AuditIntent::new("news.publish", "news").with_entity_id(article.id.clone()));

    Ok(Json(article))
}
