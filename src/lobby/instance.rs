//! Match instance implementation and lifecycle management
//!
//! A match is a mutex-guarded roster of players sharing a country and a level
//! bucket. It accepts players while forming and freezes once it is started or
//! discarded.

use crate::error::{MatchmakingError, Result};
use crate::types::{
    CountryCode, JoinId, LeaderboardRecord, Level, MatchId, Player, PlayerInfo,
    MAX_PLAYERS_PER_MATCH,
};
use crate::utils::{current_timestamp, generate_match_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Possible states of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    /// Match is accepting players
    Forming,
    /// Match has started (terminal state)
    Started,
    /// Match was swept with a single occupant (terminal state)
    Discarded,
}

/// Result of offering a player to a match
#[derive(Debug)]
pub enum AddOutcome {
    /// Player joined, match keeps forming
    Added { players_count: usize },
    /// Player joined and the match reached capacity; it takes no more players
    /// and is waiting for `start`
    Full,
    /// Match is closed or full; the player is handed back
    Rejected(Player),
}

/// How a sweep closed a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closing {
    Started(Vec<JoinId>),
    Discarded(Vec<JoinId>),
}

#[derive(Debug)]
struct Roster {
    players: Vec<Player>,
    state: MatchState,
}

impl Roster {
    /// Higher levels sort earlier, equal levels keep arrival order
    fn insert(&mut self, player: Player) {
        let index = self
            .players
            .iter()
            .position(|existing| existing.level < player.level)
            .unwrap_or(self.players.len());
        self.players.insert(index, player);
    }

    fn join_ids(&self) -> Vec<JoinId> {
        self.players.iter().map(|p| p.join_id).collect()
    }
}

/// A forming or started group of players
#[derive(Debug)]
pub struct Match {
    id: MatchId,
    country: CountryCode,
    level: Level,
    created_at: DateTime<Utc>,
    roster: Mutex<Roster>,
}

impl Match {
    /// Create a new match with a fresh ID
    pub fn new(country: impl Into<CountryCode>, level: Level) -> Self {
        Self::with_id(generate_match_id(), country, level)
    }

    /// Create a match with specific ID
    pub fn with_id(id: MatchId, country: impl Into<CountryCode>, level: Level) -> Self {
        Self {
            id,
            country: country.into(),
            level,
            created_at: current_timestamp(),
            roster: Mutex::new(Roster {
                players: Vec::with_capacity(MAX_PLAYERS_PER_MATCH),
                state: MatchState::Forming,
            }),
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Bucket level the match was created under
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // Every mutation is a single step under the lock, so a poisoned roster is
    // still consistent.
    fn roster(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a player while the match is forming and below capacity
    pub fn add_player(&self, player: Player) -> AddOutcome {
        let mut roster = self.roster();

        if roster.state != MatchState::Forming || roster.players.len() >= MAX_PLAYERS_PER_MATCH {
            return AddOutcome::Rejected(player);
        }

        debug!(
            "Player '{}' (level {}) joining match {} - country: {}, bucket level: {}, players: {}",
            player.player_id,
            player.level,
            self.id,
            self.country,
            self.level,
            roster.players.len() + 1
        );
        roster.insert(player);

        if roster.players.len() >= MAX_PLAYERS_PER_MATCH {
            AddOutcome::Full
        } else {
            AddOutcome::Added {
                players_count: roster.players.len(),
            }
        }
    }

    /// Freeze the match and return every join id in roster order.
    /// Fails with `MatchClosed` when a sweep already closed it.
    pub fn start(&self) -> Result<Vec<JoinId>> {
        let mut roster = self.roster();
        if roster.state != MatchState::Forming {
            return Err(MatchmakingError::MatchClosed {
                match_id: self.id.to_string(),
            }
            .into());
        }

        roster.state = MatchState::Started;
        Ok(roster.join_ids())
    }

    /// Start or discard depending on the head count, in one critical section.
    /// Returns `None` when the match was already closed.
    pub fn close(&self) -> Option<Closing> {
        let mut roster = self.roster();
        if roster.state != MatchState::Forming {
            return None;
        }

        if roster.players.len() > 1 {
            roster.state = MatchState::Started;
            Some(Closing::Started(roster.join_ids()))
        } else {
            roster.state = MatchState::Discarded;
            Some(Closing::Discarded(roster.join_ids()))
        }
    }

    pub fn players_count(&self) -> usize {
        self.roster().players.len()
    }

    pub fn players(&self) -> Vec<Player> {
        self.roster().players.clone()
    }

    pub fn state(&self) -> MatchState {
        self.roster().state
    }

    /// Snapshot of the roster with placeholder scores
    pub fn leaderboard(&self) -> LeaderboardRecord {
        let roster = self.roster();
        LeaderboardRecord {
            match_id: self.id,
            players: roster.players.iter().map(PlayerInfo::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_player(id: &str, level: Level) -> Player {
        Player::new(id, level, "FIN")
    }

    fn player_ids(m: &Match) -> Vec<String> {
        m.players().into_iter().map(|p| p.player_id).collect()
    }

    #[test]
    fn test_match_creation() {
        let m = Match::new("FIN", 5);

        assert_eq!(m.country(), "FIN");
        assert_eq!(m.level(), 5);
        assert_eq!(m.state(), MatchState::Forming);
        assert_eq!(m.players_count(), 0);
    }

    #[test]
    fn test_add_player() {
        let m = Match::new("FIN", 5);

        match m.add_player(create_test_player("player1", 5)) {
            AddOutcome::Added { players_count } => assert_eq!(players_count, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(m.players_count(), 1);
        assert_eq!(m.players()[0].player_id, "player1");
    }

    #[test]
    fn test_higher_levels_sort_first() {
        let m = Match::new("FIN", 2);

        m.add_player(create_test_player("low", 1));
        m.add_player(create_test_player("high", 3));
        m.add_player(create_test_player("mid", 2));

        assert_eq!(player_ids(&m), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_levels_keep_arrival_order() {
        let m = Match::new("FIN", 4);

        m.add_player(create_test_player("first", 4));
        m.add_player(create_test_player("second", 4));
        m.add_player(create_test_player("third", 4));

        assert_eq!(player_ids(&m), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_tenth_player_fills_match() {
        let m = Match::new("FIN", 5);

        for i in 1..MAX_PLAYERS_PER_MATCH {
            assert!(matches!(
                m.add_player(create_test_player(&format!("player{}", i), 5)),
                AddOutcome::Added { .. }
            ));
        }

        assert!(matches!(
            m.add_player(create_test_player("player10", 5)),
            AddOutcome::Full
        ));

        // A full match hands the player back before it is started
        match m.add_player(create_test_player("player11", 5)) {
            AddOutcome::Rejected(player) => assert_eq!(player.player_id, "player11"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(m.players_count(), MAX_PLAYERS_PER_MATCH);

        assert_eq!(m.start().unwrap().len(), MAX_PLAYERS_PER_MATCH);
        assert_eq!(m.state(), MatchState::Started);
        assert!(matches!(
            m.add_player(create_test_player("player12", 5)),
            AddOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_sweep_and_start_close_a_full_match_once() {
        let m = Match::new("FIN", 5);
        for i in 0..MAX_PLAYERS_PER_MATCH {
            m.add_player(create_test_player(&format!("player{}", i), 5));
        }

        assert!(matches!(m.close(), Some(Closing::Started(ids)) if ids.len() == MAX_PLAYERS_PER_MATCH));
        assert!(m.start().is_err());
    }

    #[test]
    fn test_start_returns_join_ids_in_roster_order() {
        let m = Match::new("FIN", 5);
        let first = create_test_player("player1", 5);
        let second = create_test_player("player2", 6);
        m.add_player(first.clone());
        m.add_player(second.clone());

        let join_ids = m.start().unwrap();
        assert_eq!(join_ids, vec![second.join_id, first.join_id]);
        assert_eq!(m.state(), MatchState::Started);

        // Starting twice is rejected
        assert!(m.start().is_err());
        assert_eq!(m.close(), None);
    }

    #[test]
    fn test_close_discards_lone_player() {
        let m = Match::new("FIN", 5);
        let player = create_test_player("player1", 5);
        m.add_player(player.clone());

        assert_eq!(m.close(), Some(Closing::Discarded(vec![player.join_id])));
        assert_eq!(m.state(), MatchState::Discarded);
        assert_eq!(m.close(), None);
    }

    #[test]
    fn test_close_starts_match_with_two_players() {
        let m = Match::new("FIN", 5);
        m.add_player(create_test_player("player1", 5));
        m.add_player(create_test_player("player2", 5));

        assert!(matches!(m.close(), Some(Closing::Started(ids)) if ids.len() == 2));
        assert_eq!(m.state(), MatchState::Started);
        assert_eq!(m.close(), None);
    }

    #[test]
    fn test_leaderboard_snapshot() {
        let m = Match::new("USA", 2);
        m.add_player(Player::new("player1", 1, "USA"));
        m.add_player(Player::new("player2", 2, "USA"));

        let record = m.leaderboard();
        assert_eq!(record.match_id, m.id());
        assert_eq!(record.players.len(), 2);
        assert_eq!(record.players[0].player_id, "player2");
        assert_eq!(record.players[1].player_id, "player1");
        assert!(record.players.iter().all(|p| p.score == 0));
    }
}
