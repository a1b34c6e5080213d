//! Level matching for placing players into forming matches
//!
//! A player fits any match whose bucket level is within one of their own
//! level. Level 1 players have no lower neighbour, so they are allowed to
//! reach two levels up instead.

use crate::lobby::bucket::Bucket;
use crate::lobby::instance::Match;
use crate::types::{Level, Player};
use std::sync::Arc;

/// Result of a matching operation
#[derive(Debug, Clone)]
pub enum MatchingResult {
    /// Player should try this forming match
    Existing(Arc<Match>),
    /// No forming match fits, open one at this level
    CreateNew(Level),
}

/// Trait for level matching strategies
pub trait LevelMatcher: Send + Sync {
    /// Bucket levels a player may join, in search order
    fn eligible_levels(&self, level: Level) -> Vec<Level>;

    /// Pick a forming match in the bucket, or the level to create one at
    fn find_match(&self, bucket: &Bucket, player: &Player) -> MatchingResult {
        self.eligible_levels(player.level)
            .into_iter()
            .find_map(|level| bucket.get(level))
            .map(MatchingResult::Existing)
            .unwrap_or(MatchingResult::CreateNew(player.level))
    }
}

/// First-fit matcher scanning lower, equal, then higher levels
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFitMatcher;

impl FirstFitMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl LevelMatcher for FirstFitMatcher {
    fn eligible_levels(&self, level: Level) -> Vec<Level> {
        if level > 1 {
            vec![level - 1, level, level.saturating_add(1)]
        } else {
            vec![1, 2, 3]
        }
    }
}
