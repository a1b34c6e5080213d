//! Common types used throughout the matchmaking service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied player identifier
pub type PlayerId = String;

/// Opaque token handed out per join request
pub type JoinId = Uuid;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// ISO 3166-1 alpha-3 country code
pub type CountryCode = String;

/// Player skill level, 1 to 99
pub type Level = u8;

/// Lowest accepted player level
pub const MIN_LEVEL: Level = 1;

/// Highest accepted player level
pub const MAX_LEVEL: Level = 99;

/// A match starts as soon as it holds this many players
pub const MAX_PLAYERS_PER_MATCH: usize = 10;

/// Player waiting in the lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub level: Level,
    pub country: CountryCode,
    pub join_id: JoinId,
}

impl Player {
    /// Create a player with a freshly generated join id
    pub fn new(player_id: impl Into<PlayerId>, level: Level, country: impl Into<CountryCode>) -> Self {
        Self {
            player_id: player_id.into(),
            level,
            country: country.into(),
            join_id: crate::utils::generate_join_id(),
        }
    }
}

/// What a join id resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "match_id", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// No decision yet (or the join id is unknown)
    Pending,
    /// The player was placed into a started match
    Matched(MatchId),
    /// The player was alone in its bucket when the sweep ran
    Unmatched,
}

impl MatchOutcome {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, MatchOutcome::Pending)
    }

    pub fn match_id(&self) -> Option<MatchId> {
        match self {
            MatchOutcome::Matched(id) => Some(*id),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchOutcome::Pending => write!(f, "pending"),
            MatchOutcome::Matched(id) => write!(f, "matched({})", id),
            MatchOutcome::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// One row of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub level: Level,
    pub country: CountryCode,
    pub score: i64,
}

impl From<&Player> for PlayerInfo {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.player_id.clone(),
            level: player.level,
            country: player.country.clone(),
            score: 0,
        }
    }
}

/// Snapshot of a started match's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub match_id: MatchId,
    pub players: Vec<PlayerInfo>,
}

// HTTP message types

/// Request to join the lobby
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinLobbyRequest {
    pub player_id: String,
    pub level: i64,
    pub country: String,
}

/// Response carrying the join id to poll with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinLobbyResponse {
    pub join_id: JoinId,
}

/// Response carrying the match a player ended up in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub match_id: MatchId,
}
