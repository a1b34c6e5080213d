//! Lobby management system for the matchmaking service
//!
//! This module handles match creation, player routing by country and level,
//! and the periodic sweep that starts or discards forming matches.

pub mod bucket;
pub mod instance;
pub mod manager;
pub mod matching;
pub mod outcomes;

// Re-export commonly used types
pub use bucket::Bucket;
pub use instance::{AddOutcome, Closing, Match, MatchState};
pub use manager::{Lobby, LobbyStats, SweepReport};
pub use matching::{FirstFitMatcher, LevelMatcher, MatchingResult};
pub use outcomes::OutcomeTable;
