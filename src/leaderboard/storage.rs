//! Leaderboard storage interface and implementations
//!
//! Leaderboards are write-once snapshots published when a match starts. The
//! in-memory store keeps a bounded number of them and evicts the oldest first.

use crate::error::{MatchmakingError, Result};
use crate::types::{LeaderboardRecord, MatchId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// Default cap on retained leaderboards
pub const DEFAULT_MAX_LEADERBOARDS: usize = 100_000;

/// Storage entry for a leaderboard with metadata
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub record: LeaderboardRecord,
    pub stored_at: DateTime<Utc>,
    sequence: u64,
}

/// Trait for leaderboard storage operations
#[cfg_attr(test, mockall::automock)]
pub trait LeaderboardStorage: Send + Sync {
    /// Store a leaderboard, replacing any previous one for the same match
    fn add_leaderboard(&self, record: LeaderboardRecord) -> Result<()>;

    /// Look up the leaderboard of a started match
    fn get_leaderboard(&self, match_id: &MatchId) -> Result<Option<LeaderboardRecord>>;

    /// Number of stored leaderboards
    fn leaderboard_count(&self) -> Result<usize>;
}

/// In-memory leaderboard storage implementation
#[derive(Debug)]
pub struct InMemoryLeaderboardStorage {
    leaderboards: RwLock<HashMap<MatchId, LeaderboardEntry>>,
    next_sequence: AtomicU64,
    max_entries: usize,
}

impl InMemoryLeaderboardStorage {
    pub fn new(max_entries: usize) -> Self {
        Self {
            leaderboards: RwLock::new(HashMap::new()),
            next_sequence: AtomicU64::new(0),
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn evict_oldest(&self, leaderboards: &mut HashMap<MatchId, LeaderboardEntry>) {
        if leaderboards.len() <= self.max_entries {
            return;
        }

        let mut entries: Vec<_> = leaderboards
            .iter()
            .map(|(match_id, entry)| (*match_id, entry.sequence))
            .collect();
        entries.sort_by_key(|(_, sequence)| *sequence);

        let to_remove = leaderboards.len() - self.max_entries;
        for (match_id, _) in entries.into_iter().take(to_remove) {
            leaderboards.remove(&match_id);
            debug!("Evicted leaderboard for match {}", match_id);
        }
    }
}

impl Default for InMemoryLeaderboardStorage {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEADERBOARDS)
    }
}

impl LeaderboardStorage for InMemoryLeaderboardStorage {
    fn add_leaderboard(&self, record: LeaderboardRecord) -> Result<()> {
        let mut leaderboards = self
            .leaderboards
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("leaderboards write"))?;

        let entry = LeaderboardEntry {
            stored_at: Utc::now(),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            record,
        };
        leaderboards.insert(entry.record.match_id, entry);
        self.evict_oldest(&mut leaderboards);

        Ok(())
    }

    fn get_leaderboard(&self, match_id: &MatchId) -> Result<Option<LeaderboardRecord>> {
        let leaderboards = self
            .leaderboards
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("leaderboards read"))?;

        Ok(leaderboards.get(match_id).map(|entry| entry.record.clone()))
    }

    fn leaderboard_count(&self) -> Result<usize> {
        let leaderboards = self
            .leaderboards
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("leaderboards read"))?;

        Ok(leaderboards.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerInfo;
    use uuid::Uuid;

    fn create_test_record(player_ids: &[&str]) -> LeaderboardRecord {
        LeaderboardRecord {
            match_id: Uuid::new_v4(),
            players: player_ids
                .iter()
                .map(|id| PlayerInfo {
                    player_id: id.to_string(),
                    level: 10,
                    country: "FIN".to_string(),
                    score: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_store_and_get() {
        let storage = InMemoryLeaderboardStorage::default();
        let record = create_test_record(&["player1", "player2"]);

        storage.add_leaderboard(record.clone()).unwrap();

        assert_eq!(storage.get_leaderboard(&record.match_id).unwrap(), Some(record));
        assert_eq!(storage.leaderboard_count().unwrap(), 1);
    }

    #[test]
    fn test_missing_leaderboard() {
        let storage = InMemoryLeaderboardStorage::default();
        assert!(storage.get_leaderboard(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let storage = InMemoryLeaderboardStorage::default();
        let mut record = create_test_record(&["player1", "player2"]);
        storage.add_leaderboard(record.clone()).unwrap();

        record.players.truncate(1);
        storage.add_leaderboard(record.clone()).unwrap();

        let stored = storage.get_leaderboard(&record.match_id).unwrap().unwrap();
        assert_eq!(stored.players.len(), 1);
        assert_eq!(storage.leaderboard_count().unwrap(), 1);
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let storage = InMemoryLeaderboardStorage::new(2);
        let first = create_test_record(&["a"]);
        let second = create_test_record(&["b"]);
        let third = create_test_record(&["c"]);

        storage.add_leaderboard(first.clone()).unwrap();
        storage.add_leaderboard(second.clone()).unwrap();
        storage.add_leaderboard(third.clone()).unwrap();

        assert_eq!(storage.leaderboard_count().unwrap(), 2);
        assert!(storage.get_leaderboard(&first.match_id).unwrap().is_none());
        assert!(storage.get_leaderboard(&second.match_id).unwrap().is_some());
        assert!(storage.get_leaderboard(&third.match_id).unwrap().is_some());
    }
}
