//! Match Maker - lobby-based matchmaking microservice
//!
//! Players join a lobby with a level and a country. The lobby groups them
//! into matches of up to ten players from the same country with levels no
//! more than one apart, starting a match when it fills or when the periodic
//! sweep fires. Started matches publish a leaderboard.

pub mod api;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod lobby;
pub mod metrics;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use leaderboard::{InMemoryLeaderboardStorage, LeaderboardStorage};
pub use lobby::{FirstFitMatcher, LevelMatcher, Lobby, LobbyStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
