//! Site server implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, routing::post, Router};
use tower_http::services::ServeDir;

use montu_newsletter::rate_limit::DEFAULT_SWEEP_PERIOD;
use montu_newsletter::{ContactList, HashAuthority, RateLimitPolicy, RateLimiter};

use crate::pages::PageRenderer;
use crate::routes::{subscribe, unsubscribe};

/// Configuration for the site server.
#[derive(Debug, Clone)]
pub struct SiteServerConfig {
    /// Public URL of the site, used for "home" links
    pub site_url: String,

    /// Pre-built book to serve for every other path
    pub dist_dir: Option<PathBuf>,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Limit applied to the subscribe endpoint
    pub subscribe_policy: RateLimitPolicy,

    /// How often expired rate-limit entries are swept
    pub sweep_period: Duration,
}

impl Default for SiteServerConfig {
    fn default() -> Self {
        Self {
            site_url: "https://montumia.com".to_string(),
            dist_dir: None,
            port: 3000,
            host: "127.0.0.1".to_string(),
            subscribe_policy: RateLimitPolicy::SUBSCRIBE,
            sweep_period: DEFAULT_SWEEP_PERIOD,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("Server error on {0}: {1}")]
    ServeError(SocketAddr, String),
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Unsubscribe token authority
    pub hash: Arc<HashAuthority>,

    /// Subscribe rate limiter
    pub limiter: RateLimiter,

    /// Subscriber storage
    pub contacts: Arc<dyn ContactList>,

    /// HTML page renderer
    pub pages: Arc<PageRenderer>,

    /// Subscribe limit
    pub subscribe_policy: RateLimitPolicy,
}

impl AppState {
    /// Build state from the collaborators a server needs.
    pub fn new(
        hash: HashAuthority,
        contacts: Arc<dyn ContactList>,
        config: &SiteServerConfig,
    ) -> Self {
        Self {
            hash: Arc::new(hash),
            limiter: RateLimiter::new(),
            contacts,
            pages: Arc::new(PageRenderer::new(config.site_url.clone())),
            subscribe_policy: config.subscribe_policy,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, dist_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route(
            "/api/unsubscribe",
            get(unsubscribe::show).post(unsubscribe::confirm),
        )
        .route("/api/subscribe", post(subscribe::subscribe))
        .with_state(state);

    match dist_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// The newsletter site server.
pub struct SiteServer {
    config: SiteServerConfig,
    state: AppState,
}

impl SiteServer {
    /// Create a server from its configuration and collaborators.
    pub fn new(
        config: SiteServerConfig,
        hash: HashAuthority,
        contacts: Arc<dyn ContactList>,
    ) -> Self {
        let state = AppState::new(hash, contacts, &config);
        Self { config, state }
    }

    /// Start serving until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        if let Err(e) = self.state.hash.ensure_configured() {
            tracing::error!("{}; unsubscribe requests will fail", e);
        }

        let sweeper = self
            .state
            .limiter
            .spawn_sweeper(self.config.sweep_period);

        let app = router(self.state, self.config.dist_dir.as_deref());

        match &self.config.dist_dir {
            Some(dir) => tracing::info!("Serving {} at http://{}", dir.display(), addr),
            None => tracing::info!("Starting newsletter server at http://{}", addr),
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::ServeError(addr, e.to_string()));

        sweeper.shutdown().await;
        tracing::info!("Server stopped");

        result
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
