//! Shared request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitMembershipRequest {
    pub applicant_name: String,
    pub email: String,
    pub motivation: String,
}

/// Optional note attached to an approve or reject decision
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNewsRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateNewsRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmbedRequest {
    pub provider: String,
    pub url: String,
    pub caption: Option<String>,
}
