//! Metrics and monitoring for the match-maker service
//!
//! This module provides Prometheus metrics collection and the HTTP server
//! exposing health probes and the metrics scrape endpoint.

pub mod collector;
pub mod health;

pub use collector::{
    MatchMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, PlayerMetrics,
    ServiceMetrics, StartTrigger,
};
pub use health::{render_metrics, HealthServer, HealthServerConfig};
