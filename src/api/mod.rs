//! Public HTTP API of the matchmaking service
//!
//! Routes: `GET /ping`, `POST /lobby`, `GET /match` and `GET /leaderboard`.
//! Errors are returned as `{"error": "..."}` bodies.

pub mod error;
pub mod handlers;
pub mod validation;

pub use error::ApiError;

use crate::leaderboard::LeaderboardStorage;
use crate::lobby::Lobby;
use crate::metrics::MetricsCollector;
use anyhow::{Context, Result};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// Shared state for the API handlers
#[derive(Clone)]
pub struct ApiState {
    pub lobby: Arc<Lobby>,
    pub leaderboards: Arc<dyn LeaderboardStorage>,
    pub metrics_collector: Arc<MetricsCollector>,
}

/// Build the API router with request metrics attached
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/lobby", post(handlers::join_lobby))
        .route("/match", get(handlers::join_match))
        .route("/leaderboard", get(handlers::get_leaderboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

async fn track_requests(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    state
        .metrics_collector
        .record_api_request(&route, response.status().as_u16(), start.elapsed());

    response
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to bind the API server to
    pub port: u16,
    /// Host to bind to
    pub host: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// HTTP server for the public API
pub struct ApiServer {
    config: ApiServerConfig,
    state: ApiState,
    shutdown_tx: watch::Sender<bool>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: ApiState) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid API server address")?;

        TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", addr))
    }

    /// Serve requests on a bound listener until stopped
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("API server listening on http://{}", local_addr);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
                info!("API server shutdown signal received");
            })
            .await?;

        info!("API server stopped");
        Ok(())
    }

    /// Bind and serve
    pub async fn start(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Signal the server to stop accepting requests
    pub fn stop(&self) {
        if self.shutdown_tx.send_replace(true) {
            warn!("API server stop already requested");
        }
    }
}
