//! Test fixtures and storage doubles for integration testing

use anyhow::anyhow;
use axum::Router;
use match_maker::api::{router, ApiState};
use match_maker::error::Result;
use match_maker::leaderboard::{InMemoryLeaderboardStorage, LeaderboardStorage};
use match_maker::lobby::Lobby;
use match_maker::metrics::MetricsCollector;
use match_maker::types::{LeaderboardRecord, Level, MatchId, Player};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything a test needs to drive the service in-process
pub struct TestSystem {
    pub lobby: Arc<Lobby>,
    pub leaderboards: Arc<InMemoryLeaderboardStorage>,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl TestSystem {
    pub fn new(match_making_time: Duration) -> Self {
        let leaderboards = Arc::new(InMemoryLeaderboardStorage::default());
        let metrics_collector =
            Arc::new(MetricsCollector::new().expect("Failed to create collector"));
        let lobby = Arc::new(Lobby::with_metrics(
            match_making_time,
            leaderboards.clone(),
            metrics_collector.clone(),
        ));

        Self {
            lobby,
            leaderboards,
            metrics_collector,
        }
    }

    /// Public API router backed by this system
    pub fn router(&self) -> Router {
        router(ApiState {
            lobby: self.lobby.clone(),
            leaderboards: self.leaderboards.clone(),
            metrics_collector: self.metrics_collector.clone(),
        })
    }
}

pub fn create_test_player(id: &str, level: Level, country: &str) -> Player {
    Player::new(id, level, country)
}

/// `count` players of one country and level with numbered ids
pub fn create_players(prefix: &str, count: usize, level: Level, country: &str) -> Vec<Player> {
    (0..count)
        .map(|i| create_test_player(&format!("{}_{}", prefix, i), level, country))
        .collect()
}

/// Storage that rejects every write
#[derive(Debug, Default)]
pub struct FailingLeaderboardStorage {
    attempts: AtomicUsize,
}

impl FailingLeaderboardStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rejected writes so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl LeaderboardStorage for FailingLeaderboardStorage {
    fn add_leaderboard(&self, _record: LeaderboardRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("leaderboard store unavailable"))
    }

    fn get_leaderboard(&self, _match_id: &MatchId) -> Result<Option<LeaderboardRecord>> {
        Ok(None)
    }

    fn leaderboard_count(&self) -> Result<usize> {
        Ok(0)
    }
}
