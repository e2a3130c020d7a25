//! Memberdesk Web Server
//!
//! Backing API for the Memberdesk admin dashboard. Every request passes
//! through the same stack: audit completion layer, authentication,
//! then the route policy guard.

pub mod audit;
pub mod auth;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod policy;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::MemberdeskServer;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Json, Response},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    // Dev mode opens CORS for whatever port the dashboard dev server
    // picked; production pins the known origins.
    let cors = if state.config.dev_mode {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
            ])
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_credentials(true)
            .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
    };

    // Layer order matters: the audit completion layer must sit outside
    // authentication and the guard so it sees the final status of every
    // request, including guard rejections.
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(from_fn_with_state(state.clone(), middleware::authorize))
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::audit_completion,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// Database URL; in-memory SQLite when unset
    pub database_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            database_url: None,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("MEMBERDESK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("MEMBERDESK_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            dev_mode: std::env::var("MEMBERDESK_DEV_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            WebError::NotFound(what) => (
                axum::http::StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found", what),
            ),
            WebError::Validation(what) => (
                axum::http::StatusCode::BAD_REQUEST,
                "validation_error",
                what.clone(),
            ),
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Initialize logging for the web server
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memberdesk_web=debug,tower_http=debug,axum=debug".into()),
        )
        .init();
}
