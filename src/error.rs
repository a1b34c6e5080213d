//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid join request: {reason}")]
    InvalidJoinRequest { reason: String },

    #[error("Invalid join id: {value}")]
    InvalidJoinId { value: String },

    #[error("Invalid match id: {value}")]
    InvalidMatchId { value: String },

    #[error("Leaderboard not found: {match_id}")]
    LeaderboardNotFound { match_id: String },

    #[error("Match is no longer accepting players: {match_id}")]
    MatchClosed { match_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Shorthand for a poisoned lock on the named resource
    pub fn lock_poisoned(resource: &str) -> Self {
        MatchmakingError::InternalError {
            message: format!("Failed to acquire {} lock", resource),
        }
    }
}
