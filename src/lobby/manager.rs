//! Lobby implementation routing players into per-country matches
//!
//! The lobby owns the country buckets, the outcome table and the sweep loop.
//! Players are placed first-fit into a forming match near their level. A match
//! starts as soon as it fills up, or when the periodic sweep finds it holding
//! more than one player.

use crate::error::{MatchmakingError, Result};
use crate::leaderboard::LeaderboardStorage;
use crate::lobby::bucket::Bucket;
use crate::lobby::instance::{AddOutcome, Closing, Match};
use crate::lobby::matching::{FirstFitMatcher, LevelMatcher, MatchingResult};
use crate::lobby::outcomes::OutcomeTable;
use crate::metrics::{MetricsCollector, StartTrigger};
use crate::types::{CountryCode, JoinId, MatchId, MatchOutcome, Player};
use crate::utils::current_timestamp;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Shortest period the sweep loop will tick at
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Statistics about lobby operations
#[derive(Debug, Clone, Default)]
pub struct LobbyStats {
    /// Total number of players joined
    pub players_joined: u64,
    /// Total number of matches created
    pub matches_created: u64,
    /// Matches started because they reached capacity
    pub matches_filled: u64,
    /// Matches started by the sweep
    pub matches_swept: u64,
    /// Single-player matches dropped by the sweep
    pub matches_discarded: u64,
    /// Players placed into started matches
    pub players_matched: u64,
    /// Players left alone by the sweep
    pub players_unmatched: u64,
    /// Completed sweep rounds
    pub sweeps: u64,
    /// Current number of forming matches
    pub open_matches: usize,
    /// Current number of players in forming matches
    pub players_waiting: usize,
    /// Join ids with an outcome slot, pending or not yet evicted
    pub outcomes_recorded: usize,
    /// Leaderboards currently stored
    pub leaderboards_stored: usize,
}

/// Result of one sweep round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub matches_started: usize,
    pub matches_discarded: usize,
    pub players_matched: usize,
    pub players_unmatched: usize,
}

/// The matchmaking lobby
pub struct Lobby {
    /// Forming matches grouped by country
    buckets: DashMap<CountryCode, Arc<Bucket>>,
    /// Resolution slot per join id
    outcomes: OutcomeTable,
    /// Where started matches publish their leaderboard
    leaderboards: Arc<dyn LeaderboardStorage>,
    /// Level matching strategy
    matcher: Arc<dyn LevelMatcher>,
    /// Sweep period, also the longest a join waits for a match
    match_making_time: Duration,
    /// Lobby statistics
    stats: RwLock<LobbyStats>,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
    /// Stop signal, flipped to true once
    shutdown_tx: watch::Sender<bool>,
}

impl Lobby {
    /// Create a new lobby with its own metrics collector
    pub fn new(match_making_time: Duration, leaderboards: Arc<dyn LeaderboardStorage>) -> Result<Self> {
        let metrics_collector = Arc::new(MetricsCollector::new()?);
        Ok(Self::with_metrics(
            match_making_time,
            leaderboards,
            metrics_collector,
        ))
    }

    /// Create a new lobby with metrics collector
    pub fn with_metrics(
        match_making_time: Duration,
        leaderboards: Arc<dyn LeaderboardStorage>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self::with_matcher_and_metrics(
            match_making_time,
            leaderboards,
            Arc::new(FirstFitMatcher::new()),
            metrics_collector,
        )
    }

    /// Create with custom matcher and metrics
    pub fn with_matcher_and_metrics(
        match_making_time: Duration,
        leaderboards: Arc<dyn LeaderboardStorage>,
        matcher: Arc<dyn LevelMatcher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            buckets: DashMap::new(),
            outcomes: OutcomeTable::new(),
            leaderboards,
            matcher,
            match_making_time,
            stats: RwLock::new(LobbyStats::default()),
            metrics_collector,
            shutdown_tx,
        }
    }

    /// Route a player into a forming match and return that match's id
    pub fn add_player(&self, player: Player) -> Result<MatchId> {
        let timer = self.metrics_collector.start_timer();
        let join_id = player.join_id;

        debug!(
            "Processing join - player_id: '{}', level: {}, country: {}, join_id: {}",
            player.player_id, player.level, player.country, join_id
        );

        self.outcomes.register(join_id)?;
        self.update_stats(|stats| stats.players_joined += 1)?;

        let bucket = self.bucket_for(&player.country);
        let mut player = player;

        let match_id = loop {
            let candidate = match self.matcher.find_match(&bucket, &player) {
                MatchingResult::Existing(found) => found,
                MatchingResult::CreateNew(level) => {
                    let (created, is_new) = bucket.get_or_create(level);
                    if is_new {
                        self.record_match_created(&created)?;
                    }
                    created
                }
            };

            match candidate.add_player(player) {
                AddOutcome::Added { players_count } => {
                    debug!(
                        "Join {} routed to match {} - level: {}, players: {}",
                        join_id,
                        candidate.id(),
                        candidate.level(),
                        players_count
                    );
                    break candidate.id();
                }
                AddOutcome::Full => {
                    bucket.remove_if_same(candidate.level(), &candidate);
                    match candidate.start() {
                        Ok(join_ids) => {
                            self.publish_started(&candidate, join_ids, StartTrigger::Full)?
                        }
                        // A sweep closed it first and publishes the outcomes
                        Err(e) => debug!("Full match {} taken by sweep: {}", candidate.id(), e),
                    }
                    break candidate.id();
                }
                AddOutcome::Rejected(returned) => {
                    debug!(
                        "Match {} closed or full during join {}, retrying",
                        candidate.id(),
                        join_id
                    );
                    bucket.remove_if_same(candidate.level(), &candidate);
                    player = returned;
                }
            }
        };

        self.metrics_collector.record_player_joined(timer.stop());
        Ok(match_id)
    }

    /// Current outcome for a join id, `Pending` when unresolved or unknown
    pub fn get_match_by_join_id(&self, join_id: &JoinId) -> Result<MatchOutcome> {
        self.outcomes.get(join_id)
    }

    /// Wait until the join id resolves or the deadline passes.
    /// Returns `Pending` on expiry and immediately for unknown join ids.
    pub async fn wait_for_match(&self, join_id: &JoinId, deadline: Duration) -> Result<MatchOutcome> {
        let Some(mut rx) = self.outcomes.subscribe(join_id)? else {
            debug!("Wait requested for unknown join id {}", join_id);
            return Ok(MatchOutcome::Pending);
        };

        let waited = tokio::time::timeout(deadline, rx.wait_for(MatchOutcome::is_resolved))
            .await
            .map(|resolved| resolved.map(|outcome| *outcome));

        match waited {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => self.outcomes.get(join_id),
            Err(_) => {
                debug!("Wait for join id {} expired after {:?}", join_id, deadline);
                Ok(MatchOutcome::Pending)
            }
        }
    }

    pub fn get_match_making_time(&self) -> Duration {
        self.match_making_time
    }

    /// Close every forming match: start those with more than one player,
    /// discard the rest
    pub fn sweep(&self) -> Result<SweepReport> {
        let timer = self.metrics_collector.start_timer();
        let buckets: Vec<Arc<Bucket>> = self
            .buckets
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let evicted = self.outcomes.evict_stale()?;
        if evicted > 0 {
            debug!("Evicted {} resolved outcomes", evicted);
        }

        let mut report = SweepReport::default();
        for bucket in buckets {
            for swept in bucket.drain() {
                match swept.close() {
                    Some(Closing::Started(join_ids)) => {
                        report.matches_started += 1;
                        report.players_matched += join_ids.len();
                        self.publish_started(&swept, join_ids, StartTrigger::Sweep)?;
                    }
                    Some(Closing::Discarded(join_ids)) => {
                        if !join_ids.is_empty() {
                            report.matches_discarded += 1;
                            report.players_unmatched += join_ids.len();
                        }
                        self.publish_discarded(&swept, join_ids)?;
                    }
                    None => debug!("Match {} already started, skipping", swept.id()),
                }
            }
        }

        self.update_stats(|stats| stats.sweeps += 1)?;

        let duration = timer.stop();
        self.metrics_collector.record_sweep(duration);
        match self.stats() {
            Ok(stats) => self.metrics_collector.update_from_lobby_stats(&stats),
            Err(e) => warn!("Failed to refresh lobby gauges: {}", e),
        }

        info!(
            "Sweep completed - started: {}, discarded: {}, players matched: {}, unmatched: {}, duration: {:.2}ms",
            report.matches_started,
            report.matches_discarded,
            report.players_matched,
            report.players_unmatched,
            duration.as_secs_f64() * 1000.0
        );

        Ok(report)
    }

    /// Sweep every `match_making_time` until stopped
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            info!("Lobby already stopped, sweep loop not started");
            return;
        }

        let period = self.match_making_time.max(MIN_SWEEP_PERIOD);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Started sweep loop - period: {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep() {
                        error!("Error during sweep: {}", e);
                    }
                }
                _ = shutdown_rx.wait_for(|stopped| *stopped) => break,
            }
        }

        info!("Sweep loop stopped");
    }

    /// Signal the sweep loop to exit. Safe to call repeatedly.
    pub fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Lobby stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Run the sweep loop on a background task
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let lobby = Arc::clone(self);
        tokio::spawn(async move { lobby.run().await })
    }

    /// Get current lobby statistics
    pub fn stats(&self) -> Result<LobbyStats> {
        let mut stats = self
            .stats
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?
            .clone();

        for entry in self.buckets.iter() {
            stats.open_matches += entry.value().len();
            stats.players_waiting += entry.value().players_waiting();
        }
        stats.outcomes_recorded = self.outcomes.len()?;
        stats.leaderboards_stored = self.leaderboards.leaderboard_count()?;

        Ok(stats)
    }

    fn bucket_for(&self, country: &str) -> Arc<Bucket> {
        if let Some(bucket) = self.buckets.get(country) {
            return Arc::clone(bucket.value());
        }

        Arc::clone(
            self.buckets
                .entry(country.to_string())
                .or_insert_with(|| Arc::new(Bucket::new(country)))
                .value(),
        )
    }

    fn record_match_created(&self, created: &Match) -> Result<()> {
        self.update_stats(|stats| stats.matches_created += 1)?;
        self.metrics_collector.record_match_created();

        info!(
            "Created match {} - country: {}, level: {}",
            created.id(),
            created.country(),
            created.level()
        );
        Ok(())
    }

    fn publish_started(&self, started: &Match, join_ids: Vec<JoinId>, trigger: StartTrigger) -> Result<()> {
        // Store before resolving so a matched player can fetch it right away
        if let Err(e) = self.leaderboards.add_leaderboard(started.leaderboard()) {
            error!(
                "Failed to store leaderboard for match {}: {}",
                started.id(),
                e
            );
        }

        let outcome = MatchOutcome::Matched(started.id());
        for join_id in &join_ids {
            self.outcomes.resolve(*join_id, outcome)?;
        }

        let players = join_ids.len();
        self.update_stats(|stats| {
            match trigger {
                StartTrigger::Full => stats.matches_filled += 1,
                StartTrigger::Sweep => stats.matches_swept += 1,
            }
            stats.players_matched += players as u64;
        })?;
        self.metrics_collector.record_match_started(trigger, players);

        info!(
            "Match {} started ({}) - country: {}, level: {}, players: {}, formed in: {}ms",
            started.id(),
            trigger.as_str(),
            started.country(),
            started.level(),
            players,
            (current_timestamp() - started.created_at()).num_milliseconds()
        );
        Ok(())
    }

    fn publish_discarded(&self, discarded: &Match, join_ids: Vec<JoinId>) -> Result<()> {
        if join_ids.is_empty() {
            return Ok(());
        }

        for join_id in &join_ids {
            self.outcomes.resolve(*join_id, MatchOutcome::Unmatched)?;
        }

        let players = join_ids.len();
        self.update_stats(|stats| {
            stats.matches_discarded += 1;
            stats.players_unmatched += players as u64;
        })?;
        self.metrics_collector.record_match_discarded(players);

        debug!(
            "Discarded match {} - country: {}, level: {}",
            discarded.id(),
            discarded.country(),
            discarded.level()
        );
        Ok(())
    }

    fn update_stats(&self, update: impl FnOnce(&mut LobbyStats)) -> Result<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?;
        update(&mut stats);
        Ok(())
    }
}
