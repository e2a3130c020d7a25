//! Shared application state

use std::sync::Arc;

use memberdesk_core::Principal;

use crate::audit::store::{AuditStore, SqliteAuditStore};
use crate::auth::roles::{RoleService, RoleStore};
use crate::auth::users::{UserService, UserStore};
use crate::database::Database;
use crate::policy::PolicyTable;
use crate::{routes, WebConfig, WebResult};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: WebConfig,
    /// Domain record persistence
    pub database: Database,
    /// Account management and credential checks
    pub user_service: UserService,
    /// Role definitions and permission grants
    pub role_service: RoleService,
    /// Audit event sink
    pub audit_store: Arc<dyn AuditStore>,
    /// Route permission requirements
    pub policy: Arc<PolicyTable>,
}

impl AppState {
    /// Create application state, connecting to the configured database.
    ///
    /// Falls back to an in-memory database when no URL is configured,
    /// which suits tests and local experiments. A configured URL that
    /// cannot be reached is a startup failure rather than a silent
    /// downgrade.
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let database_url = config
            .database_url
            .clone()
            .unwrap_or_else(|| "sqlite::memory:".to_string());

        let database = Database::connect(&database_url).await?;

        let role_service = RoleService::new(RoleStore::database(database.pool().clone()).await?);
        let user_service = UserService::new(UserStore::database(database.pool().clone()).await?);
        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(database.pool().clone()).await?);

        Ok(Self {
            config,
            database,
            user_service,
            role_service,
            audit_store,
            policy: Arc::new(routes::policy_table()),
        })
    }

    /// Resolve a user id to a full principal with flattened permissions.
    ///
    /// Role grants are read on every request so a revoked role stops
    /// working without waiting for the token to expire. Storage errors
    /// resolve to no principal; the request proceeds anonymously.
    pub async fn resolve_principal(&self, user_id: &str) -> Option<Principal> {
        let account = match self.user_service.get_user(user_id).await {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!("Failed to load user {}: {}", user_id, e);
                return None;
            }
        };

        let roles = match self.role_service.get_many(&account.roles).await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::warn!("Failed to load roles for {}: {}", user_id, e);
                return None;
            }
        };

        Some(Principal::from_roles(
            account.id,
            account.username,
            account.display_name,
            &roles,
        ))
    }
}
