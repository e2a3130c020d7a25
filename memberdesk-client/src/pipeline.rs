//! Request pipeline with coordinated silent token refresh

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::credentials::{CredentialStore, MemoryCredentialStore, TokenSet};
use crate::{ClientError, ClientResult};

const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const REFRESH_PATH: &str = "/api/auth/refresh";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Memberdesk API, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds: 30,
            user_agent: format!("memberdesk-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// A replayable request description. The pipeline owns credential
/// attachment, so a spec never carries an Authorization header itself.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    path: String,
    body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Outcome broadcast to queued requests when the in-flight refresh
/// settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshSignal {
    Refreshed,
    Failed,
}

enum RefreshRole {
    Leader,
    Waiter(oneshot::Receiver<RefreshSignal>),
}

#[derive(Debug, Default)]
struct CoordinatorState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshSignal>>,
}

/// Single-flight refresh coordination. The first 401 starts the refresh,
/// every concurrent 401 queues behind it, and settlement clears the flag
/// and drains the queue in enqueue order on every path.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<CoordinatorState>,
}

impl RefreshCoordinator {
    /// Become the refresher, or join the queue behind the current one
    async fn begin(&self) -> RefreshRole {
        let mut state = self.state.lock().await;
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            RefreshRole::Waiter(rx)
        } else {
            state.in_flight = true;
            RefreshRole::Leader
        }
    }

    /// Clear the flag and wake every waiter, oldest first
    async fn settle(&self, signal: RefreshSignal) {
        let waiters = {
            let mut state = self.state.lock().await;
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // A dropped receiver means that caller already gave up
            let _ = waiter.send(signal);
        }
    }

    /// Whether a refresh call is currently in flight
    pub async fn in_flight(&self) -> bool {
        self.state.lock().await.in_flight
    }

    /// Number of requests parked behind the in-flight refresh
    pub async fn queued(&self) -> usize {
        self.state.lock().await.waiters.len()
    }
}

/// Token pair shape shared by the login and refresh responses
#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    access_token: String,
    refresh_token: String,
}

/// Successful login response: the authenticated principal plus the pair
/// the pipeline stored
#[derive(Debug, Clone, Deserialize)]
pub struct LoginOutcome {
    pub user: Value,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Authenticated client for the Memberdesk API
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    /// Create a client over an injected credential store
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            config,
            credentials,
            coordinator: RefreshCoordinator::default(),
        })
    }

    /// Create a client with a fresh in-memory credential store
    pub fn with_memory_store(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::new(
            ClientConfig::new(base_url),
            Arc::new(MemoryCredentialStore::new()),
        )
    }

    /// The credential store backing this client
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Refresh coordination state, readable by tests
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Issue a spec once with whatever access token is currently stored
    async fn issue(&self, spec: &RequestSpec) -> ClientResult<Response> {
        let mut request = self.http.request(spec.method.clone(), self.url(&spec.path));
        if let Some(token) = self.credentials.access_token().await {
            request = request.bearer_auth(token);
        }
        if let Some(ref body) = spec.body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Issue an authenticated call, transparently refreshing the access
    /// token on a 401 and replaying the request once.
    ///
    /// Non-401 responses, other error statuses included, come back
    /// unchanged. A 401 from the refresh endpoint itself is returned
    /// as-is rather than re-entering the pipeline. When the refresh
    /// fails the session is over: the store is cleared and every
    /// participating call gets [`ClientError::SessionExpired`].
    pub async fn send(&self, spec: RequestSpec) -> ClientResult<Response> {
        let response = self.issue(&spec).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if spec.path.trim_end_matches('/') == REFRESH_PATH {
            return Ok(response);
        }

        debug!(
            "Received 401 for {} {}, entering silent refresh",
            spec.method, spec.path
        );
        match self.coordinated_refresh().await {
            // Exactly one replay; a second 401 comes back unchanged
            RefreshSignal::Refreshed => self.issue(&spec).await,
            RefreshSignal::Failed => Err(ClientError::SessionExpired),
        }
    }

    /// Join or lead the single-flight refresh and report how it settled
    async fn coordinated_refresh(&self) -> RefreshSignal {
        match self.coordinator.begin().await {
            RefreshRole::Waiter(rx) => {
                // The leader dropping without settling counts as failure
                rx.await.unwrap_or(RefreshSignal::Failed)
            }
            RefreshRole::Leader => {
                let signal = match self.refresh_once().await {
                    Ok(()) => RefreshSignal::Refreshed,
                    Err(error) => {
                        warn!("Token refresh failed: {}", error);
                        self.credentials.clear().await;
                        RefreshSignal::Failed
                    }
                };
                // Settlement runs on every path, timeouts included;
                // the flag must never stay set
                self.coordinator.settle(signal).await;
                signal
            }
        }
    }

    /// One refresh call with the stored long-lived token. Never retried,
    /// never routed back through `send`.
    async fn refresh_once(&self) -> ClientResult<()> {
        let refresh_token = self
            .credentials
            .refresh_token()
            .await
            .ok_or(ClientError::SessionExpired)?;

        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("Refresh endpoint answered {}", response.status());
            return Err(ClientError::SessionExpired);
        }

        let tokens: TokenEnvelope = response.json().await?;
        self.credentials
            .store(TokenSet {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            })
            .await;
        debug!("Access token refreshed");
        Ok(())
    }

    /// Authenticate and store the returned token pair
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginOutcome> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("Login rejected with status {}", status);
            return Err(ClientError::Rejected(status));
        }

        let outcome: LoginOutcome = response.json().await?;
        self.credentials
            .store(TokenSet {
                access_token: outcome.access_token.clone(),
                refresh_token: outcome.refresh_token.clone(),
            })
            .await;
        debug!("Logged in as {}", username);
        Ok(outcome)
    }

    /// End the session server-side and drop local credentials. The local
    /// pair is cleared even when the server call cannot be completed.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.send(RequestSpec::post(LOGOUT_PATH)).await;
        self.credentials.clear().await;
        match result {
            Ok(_) | Err(ClientError::SessionExpired) => Ok(()),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coordinator_queues_entrants_behind_the_leader() {
        let coordinator = RefreshCoordinator::default();

        assert!(matches!(coordinator.begin().await, RefreshRole::Leader));
        assert!(coordinator.in_flight().await);

        let RefreshRole::Waiter(rx) = coordinator.begin().await else {
            panic!("second entrant must queue, not lead");
        };
        assert_eq!(coordinator.queued().await, 1);

        coordinator.settle(RefreshSignal::Refreshed).await;
        assert!(!coordinator.in_flight().await);
        assert_eq!(coordinator.queued().await, 0);
        assert_eq!(rx.await.unwrap(), RefreshSignal::Refreshed);
    }

    #[tokio::test]
    async fn settlement_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::default();
        let _ = coordinator.begin().await;

        let mut receivers = Vec::new();
        for _ in 0..3 {
            match coordinator.begin().await {
                RefreshRole::Waiter(rx) => receivers.push(rx),
                RefreshRole::Leader => panic!("refresh already in flight"),
            }
        }
        assert_eq!(coordinator.queued().await, 3);

        coordinator.settle(RefreshSignal::Failed).await;
        for rx in receivers {
            assert_eq!(rx.await.unwrap(), RefreshSignal::Failed);
        }
        assert!(!coordinator.in_flight().await);

        // The queue is empty again, so the next entrant leads
        assert!(matches!(coordinator.begin().await, RefreshRole::Leader));
    }

    #[tokio::test]
    async fn url_joining_normalizes_slashes() {
        let client = ApiClient::with_memory_store("http://localhost:8080/").unwrap();
        assert_eq!(
            client.url("/api/health"),
            "http://localhost:8080/api/health"
        );
        assert_eq!(client.url("api/health"), "http://localhost:8080/api/health");
    }

    #[test]
    fn request_specs_compose() {
        let spec = RequestSpec::put("/api/news/42").with_json(json!({ "title": "Hi" }));
        assert_eq!(spec.method, Method::PUT);
        assert_eq!(spec.path, "/api/news/42");
        assert_eq!(spec.body, Some(json!({ "title": "Hi" })));
    }
}
