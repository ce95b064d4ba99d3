//! Summit Progression Engine
//!
//! Platform-agnostic reward economy for the Summit habit tracker: streaks,
//! combos, critical hits, daily quests, milestones, expedition missions,
//! and the points ledger. This crate is pure state transition; storage,
//! transport, and rendering live elsewhere.

pub mod clock;
pub mod combo;
pub mod config;
pub mod constants;
pub mod critical;
pub mod engine;
pub mod ledger;
pub mod milestone;
pub mod mission;
pub mod quest;
pub mod result;
pub mod rng;
pub mod state;
pub mod streak;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, OffsetClock};
pub use combo::{ComboState, effective_combo, effective_multiplier};
pub use config::{ComboCfg, ConfigError, CritTier, CriticalCfg, MissionCfg, PointsCfg, ProgressionConfig};
pub use critical::CriticalHit;
pub use engine::ProgressionEngine;
pub use ledger::{EntryReason, LedgerEntry, PointsLedger};
pub use milestone::{Milestone, MilestoneKind};
pub use mission::{
    Difficulty, ExpeditionMission, MissionPlan, MissionRewards, MissionStatus, MountainProfile,
    RetreatRewards, mission_length_days, plan_mission, required_completion_percent,
};
pub use quest::{Quest, QuestProgress, QuestRule};
pub use result::{Effect, EffectList, EngineError, ProgressionResult};
pub use rng::{CountingRng, RandomSource, RngStreams};
pub use state::{CompletionEvent, HabitId, HabitInfo, ProgressionSnapshot, UserId};
pub use streak::StreakState;

/// Trait for abstracting snapshot persistence.
/// Platform-specific implementations should provide this.
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a user's progression snapshot, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load(&self, user_id: UserId) -> Result<Option<ProgressionSnapshot>, Self::Error>;

    /// Persist a user's progression snapshot.
    ///
    /// Implementations backed by an optimistic-concurrency store should
    /// map their write-conflict error to [`EngineError::StaleSnapshot`]
    /// semantics and surface it; the service caller re-fetches and
    /// reapplies.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save(&self, snapshot: &ProgressionSnapshot) -> Result<(), Self::Error>;
}

/// Convenience facade wiring the engine to a snapshot store.
///
/// The engine itself stays pure; this is the one seam where load, apply,
/// and save compose. Conflict retry is still the caller's loop.
pub struct ProgressionService<S>
where
    S: SnapshotStore,
{
    engine: ProgressionEngine,
    store: S,
}

impl<S> ProgressionService<S>
where
    S: SnapshotStore,
{
    /// Create a service around a validated engine and a store.
    pub const fn new(engine: ProgressionEngine, store: S) -> Self {
        Self { engine, store }
    }

    #[must_use]
    pub const fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    /// Load the event's user snapshot, apply the event, persist the
    /// result, and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails, or if the engine
    /// rejects the operation.
    pub fn apply_and_store(
        &self,
        event: &CompletionEvent,
        clock: &dyn Clock,
        rng: &mut dyn RandomSource,
    ) -> Result<ProgressionResult, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let prior = self
            .store
            .load(event.user_id)
            .map_err(Into::into)?
            .unwrap_or_else(|| ProgressionSnapshot::new(event.user_id));
        let result = self.engine.apply(event, &prior, clock, rng)?;
        self.store.save(&result.snapshot).map_err(Into::into)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStore {
        snapshots: Rc<RefCell<HashMap<UserId, ProgressionSnapshot>>>,
    }

    impl SnapshotStore for MemoryStore {
        type Error = Infallible;

        fn load(&self, user_id: UserId) -> Result<Option<ProgressionSnapshot>, Self::Error> {
            Ok(self.snapshots.borrow().get(&user_id).cloned())
        }

        fn save(&self, snapshot: &ProgressionSnapshot) -> Result<(), Self::Error> {
            self.snapshots
                .borrow_mut()
                .insert(snapshot.user_id, snapshot.clone());
            Ok(())
        }
    }

    #[test]
    fn service_applies_and_persists() {
        let engine = ProgressionEngine::new(ProgressionConfig::default()).unwrap();
        let store = MemoryStore::default();
        let service = ProgressionService::new(engine, store.clone());

        let clock = FixedClock::at(Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap());
        let streams = RngStreams::from_user_seed(7);
        let event = CompletionEvent {
            habit_id: 1,
            user_id: 42,
            date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            completed: true,
            occurred_at: clock.now(),
        };

        let result = service
            .apply_and_store(&event, &clock, &mut *streams.critical())
            .unwrap();
        assert!(result.snapshot.ledger.balance() > 0);

        let persisted = store.load(42).unwrap().expect("snapshot saved");
        assert_eq!(persisted, result.snapshot);

        // Replaying through the service is a no-op against stored state.
        let replay = service
            .apply_and_store(&event, &clock, &mut *streams.critical())
            .unwrap();
        assert!(replay.effects.is_empty());
        assert_eq!(replay.snapshot, persisted);
    }
}
