//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! match-maker service, including environment variable and TOML file loading
//! and validation.

use crate::error::MatchmakingError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the public HTTP API
    pub port: u16,
    /// Port for health check and metrics endpoints
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Sweep period and longest wait for a match, in seconds
    pub match_making_time_seconds: u64,
    /// Maximum number of leaderboards kept in memory
    pub leaderboard_max_entries: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "match-maker".to_string(),
            log_level: "info".to_string(),
            port: 8080,
            metrics_port: 9090,
            shutdown_timeout_seconds: 3,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            match_making_time_seconds: 30,
            leaderboard_max_entries: 100_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("PORT") {
            self.service.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid PORT value: {}", port))?;
        }
        if let Ok(port) = env::var("METRICS_PORT") {
            self.service.metrics_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid METRICS_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Matchmaking settings
        if let Ok(time) = env::var("MATCH_MAKING_TIME_SECONDS") {
            self.matchmaking.match_making_time_seconds = time
                .parse()
                .map_err(|_| anyhow!("Invalid MATCH_MAKING_TIME_SECONDS value: {}", time))?;
        }
        if let Ok(max_entries) = env::var("LEADERBOARD_MAX_ENTRIES") {
            self.matchmaking.leaderboard_max_entries = max_entries
                .parse()
                .map_err(|_| anyhow!("Invalid LEADERBOARD_MAX_ENTRIES value: {}", max_entries))?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get the sweep period as Duration
    pub fn match_making_time(&self) -> Duration {
        Duration::from_secs(self.matchmaking.match_making_time_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => {
            return Err(config_error(format!(
                "Invalid log level: {}",
                config.service.log_level
            )))
        }
    }

    if config.service.name.is_empty() {
        return Err(config_error("Service name cannot be empty"));
    }

    // Validate ports
    if config.service.port == 0 {
        return Err(config_error("API port cannot be 0"));
    }
    if config.service.metrics_port == 0 {
        return Err(config_error("Metrics port cannot be 0"));
    }
    if config.service.port == config.service.metrics_port {
        return Err(config_error(format!(
            "API and metrics ports must differ: {}",
            config.service.port
        )));
    }

    if config.service.shutdown_timeout_seconds == 0 {
        return Err(config_error("Shutdown timeout must be greater than 0"));
    }

    if config.matchmaking.match_making_time_seconds == 0 {
        return Err(config_error("Match making time must be greater than 0"));
    }
    if config.matchmaking.leaderboard_max_entries == 0 {
        return Err(config_error("Leaderboard max entries must be greater than 0"));
    }

    Ok(())
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    MatchmakingError::ConfigurationError {
        message: message.into(),
    }
    .into()
}
