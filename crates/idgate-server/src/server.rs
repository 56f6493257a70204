use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use idgate_auth::{AuthState, TokenValidator};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
}

impl AppState {
    /// Builds the state from a validator and the configured allow list.
    ///
    /// Without `access.allow_all`, a missing list admits nobody.
    pub fn new(cfg: &AppConfig, validator: Arc<TokenValidator>) -> Self {
        let mut auth = AuthState::new(validator);
        if !cfg.access.allow_all {
            auth = auth.with_allowed_users(cfg.access.allowed_users.iter().flatten().cloned());
        }
        Self { auth }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

pub struct IdgateServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/up", get(handlers::up))
        .route("/v1/validate-token", post(handlers::validate_token))
        .route("/v1/me", get(handlers::me))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Builds the server, creating the token validator from `auth` config
    /// and warming its key cache.
    pub async fn build(self) -> anyhow::Result<IdgateServer> {
        let validator = Arc::new(TokenValidator::from_config(&self.config.auth)?);
        validator.warm_cache().await;

        let state = AppState::new(&self.config, validator);
        let app = build_app(&self.config, state);

        Ok(IdgateServer {
            addr: self.addr,
            app,
        })
    }
}

impl IdgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
