//! Per-country index of forming matches keyed by level

use crate::lobby::instance::Match;
use crate::types::{CountryCode, Level};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Forming matches of one country, at most one per level
#[derive(Debug)]
pub struct Bucket {
    country: CountryCode,
    matches: DashMap<Level, Arc<Match>>,
}

impl Bucket {
    pub fn new(country: impl Into<CountryCode>) -> Self {
        Self {
            country: country.into(),
            matches: DashMap::new(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Forming match at the given level, if any
    pub fn get(&self, level: Level) -> Option<Arc<Match>> {
        self.matches.get(&level).map(|entry| Arc::clone(entry.value()))
    }

    /// Return the match at `level`, creating it when the slot is empty.
    /// The flag is true when a new match was inserted.
    pub fn get_or_create(&self, level: Level) -> (Arc<Match>, bool) {
        match self.matches.entry(level) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let created = Arc::new(Match::new(self.country.clone(), level));
                entry.insert(Arc::clone(&created));
                (created, true)
            }
        }
    }

    /// Remove the slot only if it still holds this exact match
    pub fn remove_if_same(&self, level: Level, target: &Arc<Match>) -> bool {
        self.matches
            .remove_if(&level, |_, current| Arc::ptr_eq(current, target))
            .is_some()
    }

    /// Take every match out of the bucket
    pub fn drain(&self) -> Vec<Arc<Match>> {
        let levels: Vec<Level> = self.matches.iter().map(|entry| *entry.key()).collect();
        levels
            .into_iter()
            .filter_map(|level| self.matches.remove(&level).map(|(_, m)| m))
            .collect()
    }

    /// Number of forming matches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Players currently seated in this bucket's matches
    pub fn players_waiting(&self) -> usize {
        self.matches
            .iter()
            .map(|entry| entry.value().players_count())
            .sum()
    }
}
