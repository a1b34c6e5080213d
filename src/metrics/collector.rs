//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the match-maker service using
//! Prometheus metrics. Every series is prefixed with `match_maker_`.

use crate::lobby::manager::LobbyStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What caused a match to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTrigger {
    /// The tenth player joined
    Full,
    /// The periodic sweep started it
    Sweep,
}

impl StartTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartTrigger::Full => "full",
            StartTrigger::Sweep => "sweep",
        }
    }
}

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Match-related metrics
    match_metrics: MatchMetrics,

    /// Player-related metrics
    player_metrics: PlayerMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,

    /// HTTP API requests by route and status code
    pub api_requests_total: IntCounterVec,
}

/// Match-related metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Forming matches across all buckets
    pub open_matches: IntGauge,

    /// Total matches created
    pub matches_created_total: IntCounter,

    /// Total matches started, by trigger
    pub matches_started_total: IntCounterVec,

    /// Total matches discarded by the sweep
    pub matches_discarded_total: IntCounter,

    /// Leaderboards currently retained
    pub leaderboards_stored: IntGauge,
}

/// Player-related metrics
#[derive(Clone)]
pub struct PlayerMetrics {
    /// Total players joined
    pub players_joined_total: IntCounter,

    /// Players currently seated in forming matches
    pub players_waiting: IntGauge,

    /// Total players placed into started matches
    pub players_matched_total: IntCounter,

    /// Total players left alone by the sweep
    pub players_unmatched_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent placing a player
    pub join_duration: Histogram,

    /// Time spent in one sweep
    pub sweep_duration: Histogram,

    /// HTTP API handler durations
    pub api_request_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let player_metrics = PlayerMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            match_metrics,
            player_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn player(&self) -> &PlayerMetrics {
        &self.player_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Refresh gauges from a lobby stats snapshot
    pub fn update_from_lobby_stats(&self, stats: &LobbyStats) {
        self.match_metrics
            .open_matches
            .set(stats.open_matches as i64);
        self.player_metrics
            .players_waiting
            .set(stats.players_waiting as i64);
        self.match_metrics
            .leaderboards_stored
            .set(stats.leaderboards_stored as i64);
    }

    /// Record a player being placed into a match
    pub fn record_player_joined(&self, duration: Duration) {
        self.player_metrics.players_joined_total.inc();
        self.performance_metrics
            .join_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a match being created
    pub fn record_match_created(&self) {
        self.match_metrics.matches_created_total.inc();
    }

    /// Record a match starting
    pub fn record_match_started(&self, trigger: StartTrigger, players: usize) {
        self.match_metrics
            .matches_started_total
            .with_label_values(&[trigger.as_str()])
            .inc();
        self.player_metrics
            .players_matched_total
            .inc_by(players as u64);
    }

    /// Record a lone player being discarded
    pub fn record_match_discarded(&self, players: usize) {
        self.match_metrics.matches_discarded_total.inc();
        self.player_metrics
            .players_unmatched_total
            .inc_by(players as u64);
    }

    pub fn record_sweep(&self, duration: Duration) {
        self.performance_metrics
            .sweep_duration
            .observe(duration.as_secs_f64());
    }

    /// Record an API request outcome
    pub fn record_api_request(&self, route: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.service_metrics
            .api_requests_total
            .with_label_values(&[route, status.as_str()])
            .inc();
        self.performance_metrics
            .api_request_duration
            .with_label_values(&[route])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("match_maker_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "match_maker_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("match_maker_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        let api_requests_total = IntCounterVec::new(
            Opts::new("match_maker_api_requests_total", "Total HTTP API requests"),
            &["route", "status"],
        )?;
        registry.register(Box::new(api_requests_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
            api_requests_total,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let open_matches =
            IntGauge::new("match_maker_open_matches", "Number of forming matches")?;
        registry.register(Box::new(open_matches.clone()))?;

        let matches_created_total =
            IntCounter::new("match_maker_matches_created_total", "Total matches created")?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let matches_started_total = IntCounterVec::new(
            Opts::new("match_maker_matches_started_total", "Total matches started"),
            &["trigger"],
        )?;
        registry.register(Box::new(matches_started_total.clone()))?;

        let matches_discarded_total = IntCounter::new(
            "match_maker_matches_discarded_total",
            "Total single-player matches discarded",
        )?;
        registry.register(Box::new(matches_discarded_total.clone()))?;

        let leaderboards_stored = IntGauge::new(
            "match_maker_leaderboards_stored",
            "Number of retained leaderboards",
        )?;
        registry.register(Box::new(leaderboards_stored.clone()))?;

        Ok(Self {
            open_matches,
            matches_created_total,
            matches_started_total,
            matches_discarded_total,
            leaderboards_stored,
        })
    }
}

impl PlayerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_joined_total =
            IntCounter::new("match_maker_players_joined_total", "Total players joined")?;
        registry.register(Box::new(players_joined_total.clone()))?;

        let players_waiting = IntGauge::new(
            "match_maker_players_waiting",
            "Players currently waiting in forming matches",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let players_matched_total =
            IntCounter::new("match_maker_players_matched_total", "Total players matched")?;
        registry.register(Box::new(players_matched_total.clone()))?;

        let players_unmatched_total = IntCounter::new(
            "match_maker_players_unmatched_total",
            "Total players left without a match",
        )?;
        registry.register(Box::new(players_unmatched_total.clone()))?;

        Ok(Self {
            players_joined_total,
            players_waiting,
            players_matched_total,
            players_unmatched_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let join_duration = Histogram::with_opts(
            HistogramOpts::new(
                "match_maker_join_duration_seconds",
                "Time spent placing a player",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(join_duration.clone()))?;

        let sweep_duration = Histogram::with_opts(
            HistogramOpts::new("match_maker_sweep_duration_seconds", "Sweep duration")
                .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(sweep_duration.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "match_maker_api_request_duration_seconds",
                "HTTP API request duration",
            )
            .buckets(vec![0.001, 0.01, 0.1, 1.0, 5.0, 10.0, 30.0, 60.0]),
            &["route"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        Ok(Self {
            join_duration,
            sweep_duration,
            api_request_duration,
        })
    }
}
