//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the match-maker
//! service, including readiness and liveness probes.

use crate::lobby::Lobby;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Numeric form used by the health gauge (0=unhealthy, 1=degraded, 2=healthy)
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// The parts of the running service a health check looks at
#[derive(Clone)]
pub struct ServiceContext {
    /// Configured service name
    pub service_name: String,
    /// The matchmaking lobby
    pub lobby: Arc<Lobby>,
    /// Set while the service accepts work
    pub is_running: Arc<RwLock<bool>>,
    /// When the service was created
    pub started_at: Instant,
}

impl ServiceContext {
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Forming matches across all countries
    pub open_matches: usize,
    /// Players sitting in forming matches
    pub players_waiting: usize,
    /// Matches started since service start
    pub matches_started: u64,
    /// Players placed into started matches
    pub players_matched: u64,
    /// Players discarded by the sweep
    pub players_unmatched: u64,
    /// Leaderboards currently stored
    pub leaderboards_stored: usize,
    /// Seconds since the service was created
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(context: &ServiceContext) -> Result<Self> {
        let service_check = Self::check_service_running(context).await;
        let lobby_check = Self::check_lobby(context);

        let status = match service_check.status {
            HealthStatus::Healthy => lobby_check.status,
            _ => HealthStatus::Unhealthy,
        };

        Ok(HealthCheck {
            status,
            service: context.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![service_check, lobby_check],
            stats: Self::gather_service_stats(context),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(context: &ServiceContext) -> Result<HealthStatus> {
        if context.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify service can handle requests
    pub async fn readiness_check(context: &ServiceContext) -> Result<HealthStatus> {
        if !context.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(HealthStatus::Healthy.worst(Self::check_lobby(context).status))
    }

    async fn check_service_running(context: &ServiceContext) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if context.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// A stopped sweep loop leaves players waiting forever, so it degrades
    /// the lobby; unreadable stats make it unhealthy.
    fn check_lobby(context: &ServiceContext) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match context.lobby.stats() {
            Ok(_) if context.lobby.is_stopped() => (
                HealthStatus::Degraded,
                Some("Sweep loop is stopped".to_string()),
            ),
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Lobby stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Stats check failed: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "lobby".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(context: &ServiceContext) -> ServiceStats {
        match context.lobby.stats() {
            Ok(lobby_stats) => ServiceStats {
                open_matches: lobby_stats.open_matches,
                players_waiting: lobby_stats.players_waiting,
                matches_started: lobby_stats.matches_filled + lobby_stats.matches_swept,
                players_matched: lobby_stats.players_matched,
                players_unmatched: lobby_stats.players_unmatched,
                leaderboards_stored: lobby_stats.leaderboards_stored,
                uptime_seconds: context.uptime_seconds(),
            },
            Err(e) => {
                debug!("Failed to get lobby stats for health check: {}", e);
                ServiceStats {
                    uptime_seconds: context.uptime_seconds(),
                    ..ServiceStats::default()
                }
            }
        }
    }
}
