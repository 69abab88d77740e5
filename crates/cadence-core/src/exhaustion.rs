//! Per-actor cooldown tracking
//!
//! Every actor has one "available again at" timestamp per cooldown category.
//! Records are only ever extended forward, which lets producer threads read
//! them for delay computation while the consumer thread writes them.

use crate::{ActorId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Cooldown category an operation imposes on its requestor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExhaustionType {
    /// Melee and spell attacks
    Combat,
    /// Stepping to a neighbouring tile
    Walk,
    /// Moving, using or rotating items
    Action,
    /// Talking
    Speech,
}

impl ExhaustionType {
    /// Number of categories
    pub const COUNT: usize = 4;

    /// All categories, in ordinal order
    pub const ALL: [ExhaustionType; ExhaustionType::COUNT] = [
        ExhaustionType::Combat,
        ExhaustionType::Walk,
        ExhaustionType::Action,
        ExhaustionType::Speech,
    ];

    /// Index of this category in per-category arrays
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// One actor's cooldowns
///
/// A slot holding zero means the category was never exhausted.
#[derive(Debug, Default)]
pub struct ExhaustionRecord {
    available_at: [AtomicU64; ExhaustionType::COUNT],
}

impl ExhaustionRecord {
    /// Create a record with no cooldowns
    pub fn new() -> Self {
        Self::default()
    }

    /// When the category becomes available again, if it was ever exhausted
    pub fn available_at(&self, exhaustion: ExhaustionType) -> Option<Timestamp> {
        match self.available_at[exhaustion.ordinal()].load(Ordering::Acquire) {
            0 => None,
            millis => Some(Timestamp(millis)),
        }
    }

    /// How long until the category is available, measured from `now`
    pub fn remaining_cooldown(&self, exhaustion: ExhaustionType, now: Timestamp) -> Duration {
        self.available_at(exhaustion)
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Extend the category by `cost`, starting from the later of `now` and
    /// the current availability. Returns the new availability.
    pub fn add_exhaustion(
        &self,
        exhaustion: ExhaustionType,
        now: Timestamp,
        cost: Duration,
    ) -> Timestamp {
        let slot = &self.available_at[exhaustion.ordinal()];
        let mut current = slot.load(Ordering::Acquire);
        loop {
            let base = Timestamp(current).max(now);
            let next = base.saturating_add(cost).0;
            match slot.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Timestamp(next),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Exhaustion records for every actor, created lazily
#[derive(Debug, Default)]
pub struct ExhaustionBook {
    records: RwLock<HashMap<ActorId, Arc<ExhaustionRecord>>>,
}

impl ExhaustionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for `actor`, if one was ever created
    pub fn record(&self, actor: ActorId) -> Option<Arc<ExhaustionRecord>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&actor)
            .cloned()
    }

    /// The record for `actor`, creating it on first use
    pub fn record_or_insert(&self, actor: ActorId) -> Arc<ExhaustionRecord> {
        if let Some(record) = self.record(actor) {
            return record;
        }
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(records.entry(actor).or_default())
    }

    /// Remaining cooldown of `actor` in `exhaustion`; zero for the system actor
    pub fn remaining_cooldown(
        &self,
        actor: ActorId,
        exhaustion: ExhaustionType,
        now: Timestamp,
    ) -> Duration {
        if actor.is_system() {
            return Duration::ZERO;
        }
        self.record(actor)
            .map(|record| record.remaining_cooldown(exhaustion, now))
            .unwrap_or(Duration::ZERO)
    }

    /// Extend `actor`'s cooldown in `exhaustion` by `cost` from `now`
    pub fn add_exhaustion(
        &self,
        actor: ActorId,
        exhaustion: ExhaustionType,
        now: Timestamp,
        cost: Duration,
    ) -> Option<Timestamp> {
        if actor.is_system() {
            return None;
        }
        Some(
            self.record_or_insert(actor)
                .add_exhaustion(exhaustion, now, cost),
        )
    }

    /// Drop the record of an actor that left the world
    pub fn forget(&self, actor: ActorId) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_category_is_available() {
        let record = ExhaustionRecord::new();
        assert_eq!(record.available_at(ExhaustionType::Combat), None);
        assert_eq!(
            record.remaining_cooldown(ExhaustionType::Combat, Timestamp(5000)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_add_then_remaining_at_same_instant() {
        let record = ExhaustionRecord::new();
        let now = Timestamp(1000);
        let cost = Duration::from_millis(2000);
        record.add_exhaustion(ExhaustionType::Combat, now, cost);
        assert!(record.remaining_cooldown(ExhaustionType::Combat, now) >= cost);
    }

    #[test]
    fn test_add_never_shortens() {
        let record = ExhaustionRecord::new();
        let first = record.add_exhaustion(
            ExhaustionType::Action,
            Timestamp(100),
            Duration::from_millis(1000),
        );
        assert_eq!(first, Timestamp(1100));

        // Adding from an earlier "now" still extends from the recorded time.
        let second = record.add_exhaustion(
            ExhaustionType::Action,
            Timestamp(50),
            Duration::from_millis(10),
        );
        assert_eq!(second, Timestamp(1110));
        assert!(second >= first);

        // Adding zero keeps the time.
        let third = record.add_exhaustion(ExhaustionType::Action, Timestamp(200), Duration::ZERO);
        assert_eq!(third, second);
    }

    #[test]
    fn test_expired_cooldown_restarts_from_now() {
        let record = ExhaustionRecord::new();
        record.add_exhaustion(ExhaustionType::Walk, Timestamp(0), Duration::from_millis(400));
        let next = record.add_exhaustion(
            ExhaustionType::Walk,
            Timestamp(10_000),
            Duration::from_millis(400),
        );
        assert_eq!(next, Timestamp(10_400));
    }

    #[test]
    fn test_categories_are_independent() {
        let record = ExhaustionRecord::new();
        record.add_exhaustion(ExhaustionType::Speech, Timestamp(1), Duration::from_millis(500));
        assert_eq!(record.available_at(ExhaustionType::Combat), None);
        assert!(record.available_at(ExhaustionType::Speech).is_some());
    }

    #[test]
    fn test_book_ignores_system_actor() {
        let book = ExhaustionBook::new();
        assert_eq!(
            book.add_exhaustion(
                ActorId::SYSTEM,
                ExhaustionType::Combat,
                Timestamp(0),
                Duration::from_secs(2)
            ),
            None
        );
        assert!(book.record(ActorId::SYSTEM).is_none());
    }

    #[test]
    fn test_book_lazily_creates_and_forgets() {
        let book = ExhaustionBook::new();
        let actor = ActorId::new(12);
        assert!(book.record(actor).is_none());

        book.add_exhaustion(actor, ExhaustionType::Combat, Timestamp(0), Duration::from_secs(2));
        assert_eq!(
            book.remaining_cooldown(actor, ExhaustionType::Combat, Timestamp(500)),
            Duration::from_millis(1500)
        );

        book.forget(actor);
        assert_eq!(
            book.remaining_cooldown(actor, ExhaustionType::Combat, Timestamp(500)),
            Duration::ZERO
        );
    }
}
