//! Outcome table mapping join ids to their resolution
//!
//! Every join id owns a watch slot. Slots start as `Pending` and are written
//! exactly once; waiters subscribe to the slot instead of polling. Resolved
//! slots are kept for one full sweep period and evicted on the sweep after
//! that, so the table only holds recent joins.

use crate::error::{MatchmakingError, Result};
use crate::types::{JoinId, MatchOutcome};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Debug)]
struct Slot {
    tx: watch::Sender<MatchOutcome>,
    /// Generation the slot was resolved in
    resolved_in: Option<u64>,
}

impl Slot {
    fn pending() -> Self {
        Self {
            tx: watch::channel(MatchOutcome::Pending).0,
            resolved_in: None,
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    by_join_id: HashMap<JoinId, Slot>,
    /// Bumped by every `evict_stale` call
    generation: u64,
}

#[derive(Debug, Default)]
pub struct OutcomeTable {
    slots: Mutex<Slots>,
}

impl OutcomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|_| MatchmakingError::lock_poisoned("outcome table").into())
    }

    /// Open a pending slot for the join id
    pub fn register(&self, join_id: JoinId) -> Result<()> {
        self.slots()?
            .by_join_id
            .entry(join_id)
            .or_insert_with(Slot::pending);
        Ok(())
    }

    /// Record the outcome unless the slot is already resolved.
    /// Returns whether the slot changed.
    pub fn resolve(&self, join_id: JoinId, outcome: MatchOutcome) -> Result<bool> {
        let mut slots = self.slots()?;
        let generation = slots.generation;
        let slot = slots.by_join_id.entry(join_id).or_insert_with(Slot::pending);

        let changed = slot.tx.send_if_modified(|current| {
            if current.is_resolved() {
                false
            } else {
                *current = outcome;
                true
            }
        });
        if changed {
            slot.resolved_in = Some(generation);
        }
        Ok(changed)
    }

    /// Current outcome; unknown or evicted join ids read as pending
    pub fn get(&self, join_id: &JoinId) -> Result<MatchOutcome> {
        Ok(self
            .slots()?
            .by_join_id
            .get(join_id)
            .map(|slot| *slot.tx.borrow())
            .unwrap_or(MatchOutcome::Pending))
    }

    /// Receiver for the slot, or `None` for unknown join ids
    pub fn subscribe(&self, join_id: &JoinId) -> Result<Option<watch::Receiver<MatchOutcome>>> {
        Ok(self
            .slots()?
            .by_join_id
            .get(join_id)
            .map(|slot| slot.tx.subscribe()))
    }

    /// Drop slots resolved before the previous call, then start a new
    /// generation. Pending slots are never evicted. Returns the number removed.
    pub fn evict_stale(&self) -> Result<usize> {
        let mut slots = self.slots()?;
        let current = slots.generation;
        let before = slots.by_join_id.len();

        slots
            .by_join_id
            .retain(|_, slot| slot.resolved_in.map_or(true, |resolved| resolved >= current));
        slots.generation += 1;

        Ok(before - slots.by_join_id.len())
    }

    /// Number of slots currently held
    pub fn len(&self) -> Result<usize> {
        Ok(self.slots()?.by_join_id.len())
    }
}
