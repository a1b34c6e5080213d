//! Leaderboard storage for started matches

pub mod storage;

pub use storage::{
    InMemoryLeaderboardStorage, LeaderboardEntry, LeaderboardStorage, DEFAULT_MAX_LEADERBOARDS,
};

#[cfg(test)]
pub use storage::MockLeaderboardStorage;
