//! Social embed endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};

use memberdesk_core::{AuditIntent, Principal};

use super::types::{CreateEmbedRequest, MessageResponse};
use crate::audit::trail::AuditTrail;
use crate::database::SocialEmbed;
use crate::state::AppState;
use crate::{WebError, WebResult};

/// All curated embeds, newest first
#[utoipa::path(
    get,
    path = "/api/embeds",
    responses(
        (status = 200, description = "Embeds", body = [SocialEmbed]),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "embeds"
)]
pub async fn list_embeds(State(state): State<AppState>) -> WebResult<Json<Vec<SocialEmbed>>> {
    let embeds = state.database.list_embeds().await?;
    Ok(Json(embeds))
}

/// Add an embedded post
#[utoipa::path(
    post,
    path = "/api/embeds",
    request_body = CreateEmbedRequest,
    responses(
        (status = 201, description = "Embed added", body = SocialEmbed),
        (status = 400, description = "Invalid embed"),
        (status = 403, description = "Missing EMBED_MANAGE")
    ),
    security(("bearer_auth" = [])),
    tag = "embeds"
)]
pub async fn create_embed(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(trail): Extension<AuditTrail>,
    Json(request): Json<CreateEmbedRequest>,
) -> Result<(StatusCode, Json<SocialEmbed>), WebError> {
    if request.provider.trim().is_empty() {
        return Err(WebError::Validation("provider is required".to_string()));
    }
    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err(WebError::Validation("url must be http(s)".to_string()));
    }

    let embed = state
        .database
        .insert_embed(
            request.provider.trim(),
            &request.url,
            request.caption,
            &principal.id,
        )
        .await?;

    trail.record(AuditIntent::new("embed.create", "embed").with_entity_id(embed.id.clone()));

    Ok((StatusCode::CREATED, Json(embed)))
}

/// Remove an embed
#[utoipa::path(
    delete,
    path = "/api/embeds/{id}",
    params(("id" = String, Path, description = "Embed id")),
    responses(
        (status = 200, description = "Embed removed", body = MessageResponse),
        (status = 404, description = "Unknown embed")
    ),
    security(("bearer_auth" = [])),
    tag = "embeds"
)]
pub async fn delete_embed(
    State(state): State<AppState>,
    Extension(trail): Extension<AuditTrail>,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    state.database.delete_embed(&id).await?;

    trail.record(AuditIntent::new("embed.delete", "embed").with_entity_id(id));

    Ok(Json(MessageResponse {
        message: "Embed removed".to_string(),
    }))
}
