//! Audit event storage
//!
//! Append-only. Events are never updated or deleted; the query side is
//! a filtered, paginated window plus a small aggregate summary.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use memberdesk_core::{ActionCount, AuditEvent, AuditPage, AuditQuery, AuditSummary};

use crate::{WebError, WebResult};

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one event. Callers treat failures as log-and-continue;
    /// the store must not assume anyone retries.
    async fn append(&self, event: &AuditEvent) -> WebResult<()>;

    /// Filtered page of events, newest first, with the unpaginated
    /// match count
    async fn query(&self, query: &AuditQuery) -> WebResult<AuditPage>;

    /// Aggregate totals and the `top` most frequent actions
    async fn summarize(&self, top: usize) -> WebResult<AuditSummary>;
}

/// Vec-backed store for tests and local experiments
#[derive(Clone, Default)]
pub struct MemoryAuditStore {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, event: &AuditEvent) -> WebResult<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> WebResult<AuditPage> {
        let events = self.events.read().await;

        let mut matched: Vec<&AuditEvent> = events
            .iter()
            .filter(|e| matches_filters(e, query))
            .collect();
        matched.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as i64;
        let limit = query.effective_limit();
        let offset = query.effective_offset();
        let items = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(AuditPage {
            items,
            total,
            limit,
            offset,
        })
    }

    async fn summarize(&self, top: usize) -> WebResult<AuditSummary> {
        let events = self.events.read().await;

        let actors: HashSet<&String> = events.iter().filter_map(|e| e.actor_id.as_ref()).collect();

        let mut counts: HashMap<&String, i64> = HashMap::new();
        for event in events.iter() {
            *counts.entry(&event.action).or_insert(0) += 1;
        }

        let mut top_actions: Vec<ActionCount> = counts
            .into_iter()
            .map(|(action, count)| ActionCount {
                action: action.clone(),
                count,
            })
            .collect();
        top_actions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.action.cmp(&b.action)));
        top_actions.truncate(top);

        Ok(AuditSummary {
            total: events.len() as i64,
            unique_actor_count: actors.len() as i64,
            top_actions,
        })
    }
}

fn matches_filters(event: &AuditEvent, query: &AuditQuery) -> bool {
    if let Some(user_id) = &query.user_id {
        match &event.actor_id {
            Some(actor) if actor.contains(user_id.as_str()) => {}
            _ => return false,
        }
    }
    if let Some(action) = &query.action {
        if !event
            .action
            .to_lowercase()
            .contains(&action.to_lowercase())
        {
            return false;
        }
    }
    true
}

/// SQLite-backed store sharing the application pool
#[derive(Debug, Clone)]
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    pub async fn new(pool: SqlitePool) -> WebResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id TEXT PRIMARY KEY,
                actor_id TEXT,
                action TEXT NOT NULL,
                entity TEXT NOT NULL,
                entity_id TEXT,
                metadata TEXT,
                ip_address TEXT,
                user_agent TEXT,
                occurred_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to create audit_events: {}", e)))?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_audit_events_occurred_at ON audit_events (occurred_at)",
            "CREATE INDEX IF NOT EXISTS idx_audit_events_actor_id ON audit_events (actor_id)",
            "CREATE INDEX IF NOT EXISTS idx_audit_events_action ON audit_events (action)",
        ] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| WebError::Database(format!("Failed to create audit index: {}", e)))?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, event: &AuditEvent) -> WebResult<()> {
        let metadata = match &event.metadata {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        sqlx::query(
            "INSERT INTO audit_events (id, actor_id, action, entity, entity_id, metadata, ip_address, user_agent, occurred_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&event.id)
        .bind(&event.actor_id)
        .bind(&event.action)
        .bind(&event.entity)
        .bind(&event.entity_id)
        .bind(metadata)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to append audit event: {}", e)))?;

        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> WebResult<AuditPage> {
        // Each filter binds twice: once for the null check, once for
        // the LIKE pattern. A missing filter matches everything,
        // including rows with a null actor.
        let filter_sql = "(? IS NULL OR actor_id LIKE ?) AND (? IS NULL OR LOWER(action) LIKE ?)";
        let user_pattern = query.user_id.as_ref().map(|u| format!("%{}%", u));
        let action_pattern = query
            .action
            .as_ref()
            .map(|a| format!("%{}%", a.to_lowercase()));

        let limit = query.effective_limit();
        let offset = query.effective_offset();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM audit_events WHERE {}",
            filter_sql
        ))
        .bind(&user_pattern)
        .bind(&user_pattern)
        .bind(&action_pattern)
        .bind(&action_pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to count audit events: {}", e)))?;

        let rows = sqlx::query(&format!(
            "SELECT id, actor_id, action, entity, entity_id, metadata, ip_address, user_agent, occurred_at \
             FROM audit_events WHERE {} ORDER BY occurred_at DESC, id LIMIT ? OFFSET ?",
            filter_sql
        ))
        .bind(&user_pattern)
        .bind(&user_pattern)
        .bind(&action_pattern)
        .bind(&action_pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to query audit events: {}", e)))?;

        Ok(AuditPage {
            items: rows.iter().map(event_from_row).collect(),
            total,
            limit,
            offset,
        })
    }

    async fn summarize(&self, top: usize) -> WebResult<AuditSummary> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(DISTINCT actor_id) AS actors FROM audit_events",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to summarize audit events: {}", e)))?;

        let total: i64 = row.get("total");
        let unique_actor_count: i64 = row.get("actors");

        let rows = sqlx::query(
            "SELECT action, COUNT(*) AS count FROM audit_events \
             GROUP BY action ORDER BY count DESC, action ASC LIMIT ?",
        )
        .bind(top as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to rank audit actions: {}", e)))?;

        let top_actions = rows
            .iter()
            .map(|row| ActionCount {
                action: row.get("action"),
                count: row.get("count"),
            })
            .collect();

        Ok(AuditSummary {
            total,
            unique_actor_count,
            top_actions,
        })
    }
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> AuditEvent {
    let metadata = row
        .get::<Option<String>, _>("metadata")
        .and_then(|s| serde_json::from_str(&s).ok());

    AuditEvent {
        id: row.get("id"),
        actor_id: row.get("actor_id"),
        action: row.get("action"),
        entity: row.get("entity"),
        entity_id: row.get("entity_id"),
        metadata,
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        occurred_at: parse_timestamp(row.get("occurred_at")),
    }
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
