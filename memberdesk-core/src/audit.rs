//! Audit Event Types
//!
//! An audit intent is the in-memory declaration a handler makes once its
//! effect has logically succeeded. The completion layer turns a surviving
//! intent into an append-only audit event enriched with actor and
//! transport facts. Events are never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Declaration of an auditable effect, recorded by a handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditIntent {
    /// Dotted action tag, e.g. `membership.approve`
    pub action: String,
    /// Entity kind the action touched, e.g. `membership`
    pub entity: String,
    pub entity_id: Option<String>,
    pub metadata: Option<Value>,
}

impl AuditIntent {
    pub fn new(action: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entity: entity.into(),
            entity_id: None,
            metadata: None,
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Persisted append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditEvent {
    pub id: String,
    /// Acting user id; `None` for anonymous callers on public routes
    pub actor_id: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub metadata: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Materialize an intent into a persistable event. The id and
    /// timestamp are assigned here, at write time.
    pub fn from_intent(
        intent: AuditIntent,
        actor_id: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id,
            action: intent.action,
            entity: intent.entity,
            entity_id: intent.entity_id,
            metadata: intent.metadata,
            ip_address,
            user_agent,
            occurred_at: Utc::now(),
        }
    }
}

/// Filter and pagination parameters for audit log queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    /// Substring match against the actor id
    pub user_id: Option<String>,
    /// Case-insensitive substring match against the action tag
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQuery {
    /// Requested page size, defaulted and clamped
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }

    /// Requested offset, never negative
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// One page of audit events plus the unpaginated match count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditPage {
    pub items: Vec<AuditEvent>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Action tag with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionCount {
    pub action: String,
    pub count: i64,
}

/// Aggregate view over the whole audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditSummary {
    pub total: i64,
    /// Distinct non-null actor ids
    pub unique_actor_count: i64,
    /// Ordered by count descending, then action ascending
    pub top_actions: Vec<ActionCount>,
}
