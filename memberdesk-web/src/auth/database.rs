//! SQLite-backed user and role storage
//!
//! Shares the pool with the domain database. Tables are created here so
//! the stores stay usable against any pool handed to them, and seeding
//! runs once per empty database.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use memberdesk_core::{builtin_roles, Permission, Role};

use super::users::{default_admin_account, UserAccount};
use super::AuthError;
use crate::{WebError, WebResult};

#[derive(Debug, Clone)]
pub struct DatabaseUserStore {
    pool: SqlitePool,
}

impl DatabaseUserStore {
    /// Create the users table and seed the default admin when the
    /// table is empty
    pub async fn new(pool: SqlitePool) -> WebResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                display_name TEXT,
                password_hash TEXT NOT NULL,
                roles TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to create users table: {}", e)))?;

        let store = Self { pool };
        store.ensure_default_admin().await?;
        Ok(store)
    }

    async fn ensure_default_admin(&self) -> WebResult<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| WebError::Database(format!("Failed to count users: {}", e)))?;

        if count > 0 {
            return Ok(());
        }

        let admin = default_admin_account();
        self.insert(&admin)
            .await
            .map_err(|e| WebError::Database(format!("Failed to seed admin account: {}", e)))?;
        tracing::info!("Seeded default admin account (username: admin)");
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, AuthError> {
        let row = sqlx::query(
            "SELECT id, username, display_name, password_hash, roles, created_at FROM users WHERE username = ?"
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(format!("Failed to load user: {}", e)))?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserAccount>, AuthError> {
        let row = sqlx::query(
            "SELECT id, username, display_name, password_hash, roles, created_at FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(format!("Failed to load user: {}", e)))?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    pub async fn insert(&self, account: &UserAccount) -> Result<(), AuthError> {
        let roles = serde_json::to_string(&account.roles)
            .map_err(|e| AuthError::Storage(format!("Failed to encode roles: {}", e)))?;

        sqlx::query(
            "INSERT INTO users (id, username, display_name, password_hash, roles, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .bind(roles)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(format!("Failed to save user: {}", e)))?;

        Ok(())
    }

    pub async fn update_roles(&self, id: &str, roles: &[String]) -> Result<(), AuthError> {
        let encoded = serde_json::to_string(roles)
            .map_err(|e| AuthError::Storage(format!("Failed to encode roles: {}", e)))?;

        sqlx::query("UPDATE users SET roles = ? WHERE id = ?")
            .bind(encoded)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to update roles: {}", e)))?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to delete user: {}", e)))?;

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<UserAccount>, AuthError> {
        let rows = sqlx::query(
            "SELECT id, username, display_name, password_hash, roles, created_at FROM users ORDER BY created_at, username"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(format!("Failed to list users: {}", e)))?;

        Ok(rows.iter().map(account_from_row).collect())
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseRoleStore {
    pool: SqlitePool,
}

impl DatabaseRoleStore {
    /// Create the roles table and seed the built-ins. INSERT OR IGNORE
    /// keeps operator-edited grants across restarts.
    pub async fn new(pool: SqlitePool) -> WebResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                name TEXT PRIMARY KEY,
                permissions TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to create roles table: {}", e)))?;

        let store = Self { pool };
        for role in builtin_roles() {
            store.seed(&role).await?;
        }
        Ok(store)
    }

    async fn seed(&self, role: &Role) -> WebResult<()> {
        let permissions = serde_json::to_string(&role.permissions)
            .map_err(|e| WebError::Database(format!("Failed to encode permissions: {}", e)))?;

        sqlx::query("INSERT OR IGNORE INTO roles (name, permissions) VALUES (?, ?)")
            .bind(&role.name)
            .bind(permissions)
            .execute(&self.pool)
            .await
            .map_err(|e| WebError::Database(format!("Failed to seed role {}: {}", role.name, e)))?;

        Ok(())
    }

    pub async fn find(&self, name: &str) -> Result<Option<Role>, AuthError> {
        let row = sqlx::query("SELECT name, permissions FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to load role: {}", e)))?;

        Ok(row.map(|r| role_from_row(&r)))
    }

    pub async fn insert(&self, role: &Role) -> Result<(), AuthError> {
        let permissions = serde_json::to_string(&role.permissions)
            .map_err(|e| AuthError::Storage(format!("Failed to encode permissions: {}", e)))?;

        sqlx::query("INSERT INTO roles (name, permissions) VALUES (?, ?)")
            .bind(&role.name)
            .bind(permissions)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to save role: {}", e)))?;

        Ok(())
    }

    pub async fn update(&self, role: &Role) -> Result<(), AuthError> {
        let permissions = serde_json::to_string(&role.permissions)
            .map_err(|e| AuthError::Storage(format!("Failed to encode permissions: {}", e)))?;

        sqlx::query("UPDATE roles SET permissions = ? WHERE name = ?")
            .bind(permissions)
            .bind(&role.name)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to update role: {}", e)))?;

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Role>, AuthError> {
        let rows = sqlx::query("SELECT name, permissions FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to list roles: {}", e)))?;

        Ok(rows.iter().map(role_from_row).collect())
    }
}

fn account_from_row(row: &sqlx::sqlite::SqliteRow) -> UserAccount {
    let roles: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("roles")).unwrap_or_default();

    UserAccount {
        id: row.get("id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        roles,
        created_at: parse_timestamp(row.get("created_at")),
    }
}

fn role_from_row(row: &sqlx::sqlite::SqliteRow) -> Role {
    let permissions: HashSet<Permission> =
        serde_json::from_str(&row.get::<String, _>("permissions")).unwrap_or_else(|e| {
            tracing::warn!("Dropping unreadable permission grants: {}", e);
            HashSet::new()
        });

    Role::new(row.get::<String, _>("name"), permissions)
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
