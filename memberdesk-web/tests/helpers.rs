//! Shared test harness: spawns the full server on a random port

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use serde_json::json;

use memberdesk_core::{AuditEvent, AuditPage, AuditQuery, AuditSummary};
use memberdesk_web::audit::AuditStore;
use memberdesk_web::{create_app, AppState, WebConfig, WebError, WebResult};

static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter("memberdesk_web=debug,tower_http=debug")
            .init();
    }
});

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    /// Direct handle to the server's state, for reaching the stores
    /// behind the HTTP surface
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_inner(None).await
}

/// Spawn with a replacement audit store, e.g. a failing one
pub async fn spawn_app_with_audit_store(store: Arc<dyn AuditStore>) -> TestApp {
    spawn_app_inner(Some(store)).await
}

async fn spawn_app_inner(audit_store: Option<Arc<dyn AuditStore>>) -> TestApp {
    LazyLock::force(&TRACING);

    // Default config resolves to an in-memory SQLite database.
    let mut state = AppState::new(WebConfig::default())
        .await
        .expect("failed to build app state");
    if let Some(store) = audit_store {
        state.audit_store = store;
    }

    let app = create_app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let port = listener.local_addr().expect("listener address").port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server died");
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        state,
    }
}

impl TestApp {
    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> serde_json::Value {
        let response = self
            .client
            .post(self.api("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(response.status(), 200, "login should succeed");
        response.json().await.expect("login response body")
    }

    pub async fn login_token(&self, username: &str, password: &str) -> String {
        self.login(username, password).await["access_token"]
            .as_str()
            .expect("access_token in login response")
            .to_string()
    }

    /// Token for the seeded super admin
    pub async fn admin_token(&self) -> String {
        self.login_token("admin", "admin123").await
    }

    /// Create an account with the given roles and return its access
    /// token. Roles must already exist.
    pub async fn user_with_roles(&self, username: &str, roles: &[&str]) -> String {
        let admin = self.admin_token().await;
        let response = self
            .client
            .post(self.api("/api/users"))
            .bearer_auth(&admin)
            .json(&json!({
                "username": username,
                "password": "password123",
                "roles": roles,
            }))
            .send()
            .await
            .expect("create user request failed");
        assert_eq!(response.status(), 201, "user creation should succeed");

        self.login_token(username, "password123").await
    }

    /// Create a custom role through the API
    pub async fn create_role(&self, name: &str, permissions: &[&str]) {
        let admin = self.admin_token().await;
        let response = self
            .client
            .post(self.api("/api/roles"))
            .bearer_auth(&admin)
            .json(&json!({ "name": name, "permissions": permissions }))
            .send()
            .await
            .expect("create role request failed");
        assert_eq!(response.status(), 201, "role creation should succeed");
    }

    /// Events for one action, via the store handle
    pub async fn audit_events(&self, action: &str) -> Vec<AuditEvent> {
        self.state
            .audit_store
            .query(&AuditQuery {
                action: Some(action.to_string()),
                ..Default::default()
            })
            .await
            .expect("audit query failed")
            .items
    }

    /// Audit writes are detached from the response; poll until the
    /// expected number of events for an action has landed.
    pub async fn wait_for_audit(&self, action: &str, expected: usize) -> Vec<AuditEvent> {
        for _ in 0..100 {
            let events = self.audit_events(action).await;
            if events.len() >= expected {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("never saw {} audit events for {}", expected, action);
    }

    /// Total persisted events, all actions
    pub async fn audit_total(&self) -> i64 {
        self.state
            .audit_store
            .query(&AuditQuery::default())
            .await
            .expect("audit query failed")
            .total
    }
}

/// Audit store that rejects every append, for failure isolation tests
#[derive(Clone, Default)]
pub struct FailingAuditStore {
    pub attempts: Arc<AtomicUsize>,
}

impl FailingAuditStore {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _event: &AuditEvent) -> WebResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(WebError::Database("audit store offline".to_string()))
    }

    async fn query(&self, query: &AuditQuery) -> WebResult<AuditPage> {
        Ok(AuditPage {
            items: Vec::new(),
            total: 0,
            limit: query.effective_limit(),
            offset: query.effective_offset(),
        })
    }

    async fn summarize(&self, _top: usize) -> WebResult<AuditSummary> {
        Ok(AuditSummary {
            total: 0,
            unique_actor_count: 0,
            top_actions: Vec::new(),
        })
    }
}
