//! SQLite persistence for the carrier domain records
//!
//! Membership applications, news articles, and social embeds live here.
//! User, role, and audit tables are created by their own stores against
//! the same pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Row, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{WebError, WebResult};

/// A membership application submitted through the public form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembershipApplication {
    pub id: String,
    pub applicant_name: String,
    pub email: String,
    pub motivation: String,
    /// pending, approved, or rejected
    pub status: String,
    pub decided_by: Option<String>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// A news article shown on the member site
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An embedded social media post curated by editors
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SocialEmbed {
    pub id: String,
    pub provider: String,
    pub url: String,
    pub caption: Option<String>,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

/// Database service for the carrier domain tables
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and create the domain tables
    pub async fn connect(database_url: &str) -> WebResult<Self> {
        tracing::info!("Connecting to database: {}", database_url);

        let pool = if database_url.contains(":memory:") {
            // An in-memory database exists per connection; a pool with
            // more than one connection would see an empty schema on
            // every checkout.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(database_url)
                .await
                .map_err(|e| {
                    tracing::error!("Database connection failed: {}", e);
                    WebError::Database(format!("Failed to connect to database: {}", e))
                })?
        } else {
            let db_path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        WebError::Database(format!("Failed to create directory: {}", e))
                    })?;
                }
            }

            let options = SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true);

            SqlitePool::connect_with(options).await.map_err(|e| {
                tracing::error!("Database connection failed: {}", e);
                WebError::Database(format!("Failed to connect to database: {}", e))
            })?
        };

        Self::create_tables(&pool).await?;
        tracing::info!("Database tables ready");

        Ok(Self { pool })
    }

    /// Shared connection pool, used by the user, role, and audit stores
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_tables(pool: &SqlitePool) -> WebResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS membership_applications (
                id TEXT PRIMARY KEY,
                applicant_name TEXT NOT NULL,
                email TEXT NOT NULL,
                motivation TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                decided_by TEXT,
                decision_note TEXT,
                created_at TEXT NOT NULL,
                decided_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| {
            WebError::Database(format!("Failed to create membership_applications: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_articles (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                published INTEGER NOT NULL DEFAULT 0,
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to create news_articles: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS social_embeds (
                id TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                url TEXT NOT NULL,
                caption TEXT,
                added_by TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to create social_embeds: {}", e)))?;

        Ok(())
    }

    // ---- membership applications ----

    /// Insert a freshly submitted application in `pending` state
    pub async fn insert_application(
        &self,
        applicant_name: &str,
        email: &str,
        motivation: &str,
    ) -> WebResult<MembershipApplication> {
        let application = MembershipApplication {
            id: Uuid::new_v4().to_string(),
            applicant_name: applicant_name.to_string(),
            email: email.to_string(),
            motivation: motivation.to_string(),
            status: "pending".to_string(),
            decided_by: None,
            decision_note: None,
            created_at: Utc::now(),
            decided_at: None,
        };

        sqlx::query(
            "INSERT INTO membership_applications (id, applicant_name, email, motivation, status, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&application.id)
        .bind(&application.applicant_name)
        .bind(&application.email)
        .bind(&application.motivation)
        .bind(&application.status)
        .bind(application.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to save application: {}", e)))?;

        Ok(application)
    }

    /// List applications, newest first
    pub async fn list_applications(&self) -> WebResult<Vec<MembershipApplication>> {
        let rows = sqlx::query(
            "SELECT id, applicant_name, email, motivation, status, decided_by, decision_note, created_at, decided_at FROM membership_applications ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to list applications: {}", e)))?;

        Ok(rows.iter().map(application_from_row).collect())
    }

    /// Record a review decision. Unknown ids are a not-found error.
    pub async fn decide_application(
        &self,
        id: &str,
        status: &str,
        decided_by: &str,
        decision_note: Option<String>,
    ) -> WebResult<MembershipApplication> {
        let decided_at = Utc::now();

        let result = sqlx::query(
            "UPDATE membership_applications SET status = ?, decided_by = ?, decision_note = ?, decided_at = ? WHERE id = ?"
        )
        .bind(status)
        .bind(decided_by)
        .bind(&decision_note)
        .bind(decided_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to update application: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(WebError::NotFound(format!("application {}", id)));
        }

        let row = sqlx::query(
            "SELECT id, applicant_name, email, motivation, status, decided_by, decision_note, created_at, decided_at FROM membership_applications WHERE id = ?"
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to load application: {}", e)))?;

        Ok(application_from_row(&row))
    }

    // ---- news articles ----

    pub async fn insert_news(
        &self,
        title: &str,
        body: &str,
        author_id: &str,
    ) -> WebResult<NewsArticle> {
        let now = Utc::now();
        let article = NewsArticle {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            body: body.to_string(),
            published: false,
            author_id: author_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO news_articles (id, title, body, published, author_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.body)
        .bind(article.published)
        .bind(&article.author_id)
        .bind(article.created_at.to_rfc3339())
        .bind(article.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to save article: {}", e)))?;

        Ok(article)
    }

    pub async fn list_news(&self) -> WebResult<Vec<NewsArticle>> {
        let rows = sqlx::query(
            "SELECT id, title, body, published, author_id, created_at, updated_at FROM news_articles ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to list articles: {}", e)))?;

        Ok(rows.iter().map(article_from_row).collect())
    }

    pub async fn update_news(&self, id: &str, title: &str, body: &str) -> WebResult<NewsArticle> {
        let result = sqlx::query(
            "UPDATE news_articles SET title = ?, body = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to update article: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(WebError::NotFound(format!("article {}", id)));
        }

        self.get_news(id).await
    }

    pub async fn publish_news(&self, id: &str) -> WebResult<NewsArticle> {
        let result =
            sqlx::query("UPDATE news_articles SET published = 1, updated_at = ? WHERE id = ?")
                .bind(Utc::now().to_rfc3339())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| WebError::Database(format!("Failed to publish article: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(WebError::NotFound(format!("article {}", id)));
        }

        self.get_news(id).await
    }

    pub async fn delete_news(&self, id: &str) -> WebResult<()> {
        let result = sqlx::query("DELETE FROM news_articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| WebError::Database(format!("Failed to delete article: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(WebError::NotFound(format!("article {}", id)));
        }

        Ok(())
    }

    async fn get_news(&self, id: &str) -> WebResult<NewsArticle> {
        let row = sqlx::query(
            "SELECT id, title, body, published, author_id, created_at, updated_at FROM news_articles WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to load article: {}", e)))?;

        row.map(|r| article_from_row(&r))
            .ok_or_else(|| WebError::NotFound(format!("article {}", id)))
    }

    // ---- social embeds ----

    pub async fn insert_embed(
        &self,
        provider: &str,
        url: &str,
        caption: Option<String>,
        added_by: &str,
    ) -> WebResult<SocialEmbed> {
        let embed = SocialEmbed {
            id: Uuid::new_v4().to_string(),
            provider: provider.to_string(),
            url: url.to_string(),
            caption,
            added_by: added_by.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO social_embeds (id, provider, url, caption, added_by, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&embed.id)
        .bind(&embed.provider)
        .bind(&embed.url)
        .bind(&embed.caption)
        .bind(&embed.added_by)
        .bind(embed.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to save embed: {}", e)))?;

        Ok(embed)
    }

    pub async fn list_embeds(&self) -> WebResult<Vec<SocialEmbed>> {
        let rows = sqlx::query(
            "SELECT id, provider, url, caption, added_by, created_at FROM social_embeds ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WebError::Database(format!("Failed to list embeds: {}", e)))?;

        Ok(rows
            .iter()
            .map(|row| SocialEmbed {
                id: row.get("id"),
                provider: row.get("provider"),
                url: row.get("url"),
                caption: row.get("caption"),
                added_by: row.get("added_by"),
                created_at: parse_timestamp(row.get("created_at")),
            })
            .collect())
    }

    pub async fn delete_embed(&self, id: &str) -> WebResult<()> {
        let result = sqlx::query("DELETE FROM social_embeds WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| WebError::Database(format!("Failed to delete embed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(WebError::NotFound(format!("embed {}", id)));
        }

        Ok(())
    }
}

fn application_from_row(row: &sqlx::sqlite::SqliteRow) -> MembershipApplication {
    MembershipApplication {
        id: row.get("id"),
        applicant_name: row.get("applicant_name"),
        email: row.get("email"),
        motivation: row.get("motivation"),
        status: row.get("status"),
        decided_by: row.get("decided_by"),
        decision_note: row.get("decision_note"),
        created_at: parse_timestamp(row.get("created_at")),
        decided_at: row
            .get::<Option<String>, _>("decided_at")
            .map(|s| parse_timestamp(s)),
    }
}

fn article_from_row(row: &sqlx::sqlite::SqliteRow) -> NewsArticle {
    NewsArticle {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        published: row.get::<i64, _>("published") != 0,
        author_id: row.get("author_id"),
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    }
}

/// Parse an RFC 3339 timestamp column, falling back to now for
/// rows written by hand during development
fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
