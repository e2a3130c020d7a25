//! Server lifecycle

use crate::state::AppState;
use crate::{create_app, WebConfig, WebResult};

/// The assembled Memberdesk API server
pub struct MemberdeskServer {
    config: WebConfig,
    state: AppState,
}

impl MemberdeskServer {
    /// Connect storage and build shared state for the given config
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    pub fn builder() -> MemberdeskServerBuilder {
        MemberdeskServerBuilder::default()
    }

    /// Shared state handle, used by integration tests to reach the
    /// stores behind the running server
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind and serve until the task is aborted
    pub async fn run(self) -> WebResult<()> {
        let addr = self.config.address();
        let app = create_app(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("🚀 Memberdesk server starting on http://{}", addr);
        tracing::info!("📋 OpenAPI document at http://{}/api/openapi.json", addr);
        if self.config.dev_mode {
            tracing::info!("🛠️  Dev mode: permissive CORS enabled");
        }

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Builder applying overrides on top of the environment config
#[derive(Default)]
pub struct MemberdeskServerBuilder {
    host: Option<String>,
    port: Option<u16>,
    database_url: Option<String>,
    dev_mode: Option<bool>,
}

impl MemberdeskServerBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = Some(dev_mode);
        self
    }

    pub async fn build(self) -> WebResult<MemberdeskServer> {
        let mut config = WebConfig::from_env();
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = self.database_url {
            config.database_url = Some(url);
        }
        if let Some(dev_mode) = self.dev_mode {
            config.dev_mode = dev_mode;
        }

        MemberdeskServer::new(config).await
    }
}
