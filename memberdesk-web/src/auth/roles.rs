//! Role definitions
//!
//! Roles map a name to a set of permission grants. The built-in roles
//! are seeded at startup; administrators can add custom roles or adjust
//! grants at runtime, and changes apply on the very next request
//! because principals are resolved per request.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use memberdesk_core::{builtin_roles, Permission, Role};

use super::database::DatabaseRoleStore;
use super::AuthError;
use crate::WebResult;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub permissions: HashSet<Permission>,
}

/// Role storage backends
#[derive(Clone)]
pub enum RoleStore {
    Memory(MemoryRoleStore),
    Database(DatabaseRoleStore),
}

impl RoleStore {
    /// In-memory store seeded with the built-in roles, for tests
    pub fn memory() -> Self {
        Self::Memory(MemoryRoleStore::new())
    }

    /// SQLite-backed store; creates its table and seeds the built-in
    /// roles without overwriting grants changed by an operator
    pub async fn database(pool: sqlx::SqlitePool) -> WebResult<Self> {
        Ok(Self::Database(DatabaseRoleStore::new(pool).await?))
    }

    pub async fn find(&self, name: &str) -> Result<Option<Role>, AuthError> {
        match self {
            Self::Memory(store) => Ok(store.find(name).await),
            Self::Database(store) => store.find(name).await,
        }
    }

    pub async fn insert(&self, role: &Role) -> Result<(), AuthError> {
        match self {
            Self::Memory(store) => {
                store.insert(role.clone()).await;
                Ok(())
            }
            Self::Database(store) => store.insert(role).await,
        }
    }

    pub async fn update(&self, role: &Role) -> Result<(), AuthError> {
        match self {
            Self::Memory(store) => {
                store.insert(role.clone()).await;
                Ok(())
            }
            Self::Database(store) => store.update(role).await,
        }
    }

    pub async fn list(&self) -> Result<Vec<Role>, AuthError> {
        match self {
            Self::Memory(store) => Ok(store.list().await),
            Self::Database(store) => store.list().await,
        }
    }
}

/// HashMap-backed store for tests and local experiments
#[derive(Clone, Default)]
pub struct MemoryRoleStore {
    roles: Arc<RwLock<HashMap<String, Role>>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        let mut roles = HashMap::new();
        for role in builtin_roles() {
            roles.insert(role.name.clone(), role);
        }
        Self {
            roles: Arc::new(RwLock::new(roles)),
        }
    }

    async fn find(&self, name: &str) -> Option<Role> {
        self.roles.read().await.get(name).cloned()
    }

    async fn insert(&self, role: Role) {
        self.roles.write().await.insert(role.name.clone(), role);
    }

    async fn list(&self) -> Vec<Role> {
        let mut roles: Vec<_> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }
}

/// Role operations used by handlers and principal resolution
#[derive(Clone)]
pub struct RoleService {
    store: RoleStore,
}

impl RoleService {
    pub fn new(store: RoleStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Role>, AuthError> {
        self.store.list().await
    }

    pub async fn get(&self, name: &str) -> Result<Option<Role>, AuthError> {
        self.store.find(name).await
    }

    /// Resolve a set of role names, skipping names with no stored
    /// definition. Used when flattening a principal; a stale name on an
    /// account must not break authentication.
    pub async fn get_many(&self, names: &[String]) -> Result<Vec<Role>, AuthError> {
        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            match self.store.find(name).await? {
                Some(role) => roles.push(role),
                None => {
                    tracing::warn!("Skipping unknown role {} during principal resolution", name);
                }
            }
        }
        Ok(roles)
    }

    /// Fail if any of the names has no stored definition. Used to
    /// validate role assignments before they are written.
    pub async fn ensure_exist(&self, names: &[String]) -> Result<(), AuthError> {
        for name in names {
            if self.store.find(name).await?.is_none() {
                return Err(AuthError::RoleNotFound(name.clone()));
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        name: &str,
        permissions: HashSet<Permission>,
    ) -> Result<Role, AuthError> {
        if name.is_empty() {
            return Err(AuthError::InvalidRole("name must not be empty".to_string()));
        }
        if self.store.find(name).await?.is_some() {
            return Err(AuthError::RoleExists(name.to_string()));
        }

        let role = Role::new(name, permissions);
        self.store.insert(&role).await?;
        Ok(role)
    }

    pub async fn update(
        &self,
        name: &str,
        permissions: HashSet<Permission>,
    ) -> Result<Role, AuthError> {
        if self.store.find(name).await?.is_none() {
            return Err(AuthError::RoleNotFound(name.to_string()));
        }

        let role = Role::new(name, permissions);
        self.store.update(&role).await?;
        Ok(role)
    }
}
