//! User accounts
//!
//! Storage-backed account records plus the service layer the handlers
//! talk to. The store comes in a memory flavor for tests and a SQLite
//! flavor for real deployments, behind one enum.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use memberdesk_core::SUPER_ADMIN_ROLE;

use super::database::DatabaseUserStore;
use super::jwt::{JwtService, TokenPair, TokenType};
use super::AuthError;
use crate::WebResult;

/// Stored account record. Never serialized to clients; see [`UserInfo`].
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing view of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserInfo {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            roles: account.roles.clone(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRolesRequest {
    pub roles: Vec<String>,
}

/// Account storage backends
#[derive(Clone)]
pub enum UserStore {
    Memory(MemoryUserStore),
    Database(DatabaseUserStore),
}

impl UserStore {
    /// In-memory store seeded with the default admin, for tests
    pub fn memory() -> Self {
        Self::Memory(MemoryUserStore::new())
    }

    /// SQLite-backed store; creates its table and seeds the default
    /// admin when no accounts exist yet
    pub async fn database(pool: sqlx::SqlitePool) -> WebResult<Self> {
        Ok(Self::Database(DatabaseUserStore::new(pool).await?))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AuthError> {
        match self {
            Self::Memory(store) => Ok(store.find_by_username(username).await),
            Self::Database(store) => store.find_by_username(username).await,
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, AuthError> {
        match self {
            Self::Memory(store) => Ok(store.find_by_id(id).await),
            Self::Database(store) => store.find_by_id(id).await,
        }
    }

    pub async fn insert(&self, account: &UserAccount) -> Result<(), AuthError> {
        match self {
            Self::Memory(store) => {
                store.insert(account.clone()).await;
                Ok(())
            }
            Self::Database(store) => store.insert(account).await,
        }
    }

    pub async fn update_roles(&self, id: &str, roles: &[String]) -> Result<(), AuthError> {
        match self {
            Self::Memory(store) => {
                store.update_roles(id, roles).await;
                Ok(())
            }
            Self::Database(store) => store.update_roles(id, roles).await,
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), AuthError> {
        match self {
            Self::Memory(store) => {
                store.delete(id).await;
                Ok(())
            }
            Self::Database(store) => store.delete(id).await,
        }
    }

    pub async fn list(&self) -> Result<Vec<UserAccount>, AuthError> {
        match self {
            Self::Memory(store) => Ok(store.list().await),
            Self::Database(store) => store.list().await,
        }
    }
}

/// HashMap-backed store for tests and local experiments
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    accounts: Arc<RwLock<HashMap<String, UserAccount>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        let admin = default_admin_account();
        let mut accounts = HashMap::new();
        accounts.insert(admin.id.clone(), admin);
        Self {
            accounts: Arc::new(RwLock::new(accounts)),
        }
    }

    async fn find_by_username(&self, username: &str) -> Option<UserAccount> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.username == username)
            .cloned()
    }

    async fn find_by_id(&self, id: &str) -> Option<UserAccount> {
        self.accounts.read().await.get(id).cloned()
    }

    async fn insert(&self, account: UserAccount) {
        self.accounts
            .write()
            .await
            .insert(account.id.clone(), account);
    }

    async fn update_roles(&self, id: &str, roles: &[String]) {
        if let Some(account) = self.accounts.write().await.get_mut(id) {
            account.roles = roles.to_vec();
        }
    }

    async fn delete(&self, id: &str) {
        self.accounts.write().await.remove(id);
    }

    async fn list(&self) -> Vec<UserAccount> {
        let mut accounts: Vec<_> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        accounts
    }
}

/// Build the seeded admin account shared by both store flavors
pub(crate) fn default_admin_account() -> UserAccount {
    let password =
        std::env::var("MEMBERDESK_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let password_hash = hash_password(&password).unwrap_or_else(|e| {
        // An empty hash verifies against nothing, so a hashing failure
        // leaves the seeded admin unusable rather than open.
        tracing::error!("Failed to hash default admin password: {}", e);
        String::new()
    });
    UserAccount {
        id: Uuid::new_v4().to_string(),
        username: "admin".to_string(),
        display_name: Some("Administrator".to_string()),
        password_hash,
        roles: vec![SUPER_ADMIN_ROLE.to_string()],
        created_at: Utc::now(),
    }
}

/// Account operations used by handlers and middleware
#[derive(Clone)]
pub struct UserService {
    store: UserStore,
}

impl UserService {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }

    /// Check credentials and issue a token pair
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserAccount, TokenPair), AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let account = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens =
            JwtService::generate_token_pair(&account.id, &account.username, &account.roles)?;
        Ok((account, tokens))
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// Only refresh tokens are accepted here; an access token on this
    /// path is a client bug and gets a distinct error. Roles are read
    /// from the store, not the old claims, so the new pair reflects
    /// grants changed since login.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = JwtService::verify_token(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidTokenType);
        }

        let account = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        JwtService::generate_token_pair(&account.id, &account.username, &account.roles)
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserAccount, AuthError> {
        if request.username.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if self
            .store
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let account = UserAccount {
            id: Uuid::new_v4().to_string(),
            username: request.username,
            display_name: request.display_name,
            password_hash: hash_password(&request.password)?,
            roles: request.roles,
            created_at: Utc::now(),
        };

        self.store.insert(&account).await?;
        Ok(account)
    }

    pub async fn get_user(&self, id: &str) -> Result<UserAccount, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn list_users(&self) -> Result<Vec<UserAccount>, AuthError> {
        self.store.list().await
    }

    /// Replace the full role set of an account
    pub async fn assign_roles(&self, id: &str, roles: &[String]) -> Result<UserAccount, AuthError> {
        self.get_user(id).await?;
        self.store.update_roles(id, roles).await?;
        self.get_user(id).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AuthError> {
        self.get_user(id).await?;
        self.store.delete(id).await
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Storage(format!("Password hashing failed: {}", e)))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
