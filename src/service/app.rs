//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the lobby, the
//! leaderboard storage, the HTTP servers and the background tasks together.

use crate::api::{ApiServer, ApiServerConfig, ApiState};
use crate::config::AppConfig;
use crate::leaderboard::{InMemoryLeaderboardStorage, LeaderboardStorage};
use crate::lobby::{Lobby, LobbyStats};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector};
use crate::service::health::{HealthCheck, ServiceContext};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// How often uptime, health and gauge metrics are refreshed
const HEALTH_METRICS_INTERVAL: Duration = Duration::from_secs(15);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core matchmaking lobby
    lobby: Arc<Lobby>,

    /// Leaderboards of started matches
    leaderboards: Arc<dyn LeaderboardStorage>,

    /// Shared Prometheus metrics
    metrics_collector: Arc<MetricsCollector>,

    /// Public HTTP API
    api_server: Arc<ApiServer>,

    /// Health and metrics endpoints
    health_server: Arc<HealthServer>,

    /// Periodic sweep loop, awaited on shutdown
    sweep_task: Option<JoinHandle<()>>,

    /// Server task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Health metrics refresh task
    metrics_task: Option<JoinHandle<()>>,

    /// Bound address of the public API, once started
    api_addr: Option<SocketAddr>,

    /// Bound address of the health server, once started
    metrics_addr: Option<SocketAddr>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} matchmaking service", config.service.name);
        info!(
            "Configuration: port={}, metrics_port={}, match_making_time={}s, leaderboard_max_entries={}",
            config.service.port,
            config.service.metrics_port,
            config.matchmaking.match_making_time_seconds,
            config.matchmaking.leaderboard_max_entries
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let leaderboards: Arc<dyn LeaderboardStorage> = Arc::new(
            InMemoryLeaderboardStorage::new(config.matchmaking.leaderboard_max_entries),
        );

        let lobby = Arc::new(Lobby::with_metrics(
            config.match_making_time(),
            leaderboards.clone(),
            metrics_collector.clone(),
        ));

        let is_running = Arc::new(RwLock::new(false));
        let started_at = Instant::now();

        let api_server = Arc::new(ApiServer::new(
            ApiServerConfig {
                port: config.service.port,
                host: "0.0.0.0".to_string(),
            },
            ApiState {
                lobby: lobby.clone(),
                leaderboards: leaderboards.clone(),
                metrics_collector: metrics_collector.clone(),
            },
        ));

        let health_server = Arc::new(
            HealthServer::new(
                HealthServerConfig {
                    port: config.service.metrics_port,
                    host: "0.0.0.0".to_string(),
                },
                metrics_collector.clone(),
            )
            .with_service(ServiceContext {
                service_name: config.service.name.clone(),
                lobby: lobby.clone(),
                is_running: is_running.clone(),
                started_at,
            }),
        );

        Ok(Self {
            config,
            lobby,
            leaderboards,
            metrics_collector,
            api_server,
            health_server,
            sweep_task: None,
            background_tasks: Vec::new(),
            metrics_task: None,
            api_addr: None,
            metrics_addr: None,
            is_running,
            started_at,
        })
    }

    /// Bind both servers and start the sweep loop
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} matchmaking service", self.config.service.name);

        *self.is_running.write().await = true;

        self.start_health_server().await?;
        self.start_api_server().await?;

        self.sweep_task = Some(self.lobby.spawn());
        info!(
            "Sweep loop started - match_making_time: {:?}",
            self.lobby.get_match_making_time()
        );

        self.start_health_metrics_task();

        info!(
            "✅ {} matchmaking service started successfully",
            self.config.service.name
        );
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of {}", self.config.service.name);

        *self.is_running.write().await = false;
        let shutdown_timeout = self.config.shutdown_timeout();

        self.lobby.stop();
        if let Some(sweep_task) = self.sweep_task.take() {
            Self::await_task("sweep loop", sweep_task, shutdown_timeout).await;
        }

        if let Some(metrics_task) = self.metrics_task.take() {
            metrics_task.abort();
        }

        self.api_server.stop();
        self.health_server.stop();
        self.stop_background_tasks(shutdown_timeout).await;

        let final_stats = self.stats()?;
        info!(
            "Final statistics - joined: {}, matches created: {}, started: {} (full: {}, swept: {}), discarded: {}, matched: {}, unmatched: {}, leaderboards: {}",
            final_stats.players_joined,
            final_stats.matches_created,
            final_stats.matches_filled + final_stats.matches_swept,
            final_stats.matches_filled,
            final_stats.matches_swept,
            final_stats.matches_discarded,
            final_stats.players_matched,
            final_stats.players_unmatched,
            final_stats.leaderboards_stored
        );
        info!("✅ {} shutdown completed", self.config.service.name);

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn lobby(&self) -> Arc<Lobby> {
        self.lobby.clone()
    }

    pub fn leaderboards(&self) -> Arc<dyn LeaderboardStorage> {
        self.leaderboards.clone()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Address the public API is listening on
    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api_addr
    }

    /// Address the health server is listening on
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Lobby statistics snapshot
    pub fn stats(&self) -> Result<LobbyStats, ServiceError> {
        self.lobby.stats().map_err(|e| ServiceError::BackgroundTask {
            message: format!("Failed to get lobby stats: {}", e),
        })
    }

    async fn start_health_server(&mut self) -> Result<(), ServiceError> {
        let listener =
            self.health_server
                .bind()
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to start health server: {}", e),
                })?;
        self.metrics_addr = listener.local_addr().ok();

        let health_server = self.health_server.clone();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = health_server.serve(listener).await {
                error!("Health server failed: {}", e);
            }
        }));

        info!(
            "✅ Health and metrics endpoints started on port {}",
            self.config.service.metrics_port
        );
        Ok(())
    }

    async fn start_api_server(&mut self) -> Result<(), ServiceError> {
        let listener = self
            .api_server
            .bind()
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to start API server: {}", e),
            })?;
        self.api_addr = listener.local_addr().ok();

        let api_server = self.api_server.clone();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = api_server.serve(listener).await {
                error!("API server failed: {}", e);
            }
        }));

        info!("✅ API server started on port {}", self.config.service.port);
        Ok(())
    }

    /// Refresh uptime, health status and gauges on a fixed interval
    fn start_health_metrics_task(&mut self) {
        let context = ServiceContext {
            service_name: self.config.service.name.clone(),
            lobby: self.lobby.clone(),
            is_running: self.is_running.clone(),
            started_at: self.started_at,
        };
        let metrics_collector = self.metrics_collector.clone();
        let is_running = self.is_running.clone();

        info!(
            "Starting health metrics task ({}s interval)...",
            HEALTH_METRICS_INTERVAL.as_secs()
        );

        self.metrics_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_METRICS_INTERVAL);

            while *is_running.read().await {
                interval.tick().await;

                metrics_collector
                    .service()
                    .uptime_seconds
                    .set(context.uptime_seconds() as i64);

                match HealthCheck::check(&context).await {
                    Ok(health) => {
                        metrics_collector.update_health_status(health.status.as_gauge());
                        for check in &health.checks {
                            metrics_collector.update_component_health(
                                &check.name,
                                check.status.as_gauge() > 0,
                            );
                        }
                        debug!(
                            "Updated health metrics - status: {}, open matches: {}, waiting: {}",
                            health.status, health.stats.open_matches, health.stats.players_waiting
                        );
                    }
                    Err(e) => warn!("Health check for metrics failed: {}", e),
                }

                match context.lobby.stats() {
                    Ok(stats) => metrics_collector.update_from_lobby_stats(&stats),
                    Err(e) => warn!("Failed to get lobby stats for metrics update: {}", e),
                }
            }

            info!("Health metrics task stopped");
        }));
    }

    async fn await_task(name: &str, task: JoinHandle<()>, limit: Duration) {
        let abort = task.abort_handle();
        match timeout(limit, task).await {
            Ok(Ok(())) => info!("✅ {} stopped", name),
            Ok(Err(e)) => warn!("{} ended abnormally: {}", name, e),
            Err(_) => {
                warn!("{} did not stop within {:?}, aborting", name, limit);
                abort.abort();
            }
        }
    }

    /// Wait for the servers to drain, aborting stragglers
    async fn stop_background_tasks(&mut self, limit: Duration) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        let deadline = Instant::now() + limit;
        for (i, task) in self.background_tasks.drain(..).enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            debug!("Waiting for background task {}/{}", i + 1, task_count);
            Self::await_task("background task", task, remaining).await;
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
