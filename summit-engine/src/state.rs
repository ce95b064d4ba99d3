//! Shared data model: events and the per-user progression snapshot.
//!
//! The snapshot is a plain value. The engine never mutates a caller's
//! snapshot in place; it clones, transforms, and returns a new one, which
//! is what lets the persistence layer run compare-and-swap concurrency on
//! top without any locking inside the engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::combo::ComboState;
use crate::ledger::PointsLedger;
use crate::mission::ExpeditionMission;
use crate::quest::QuestProgress;
use crate::streak::StreakState;

pub type HabitId = u32;
pub type UserId = u32;

/// A single idempotent set-operation: "on this date, this habit's
/// completed flag is now X". Re-applying an event already reflected in the
/// snapshot is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub habit_id: HabitId,
    pub user_id: UserId,
    /// Calendar day the completion applies to, in the user's time zone.
    pub date: NaiveDate,
    pub completed: bool,
    /// Instant the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// Caller-supplied habit metadata the engine needs for quest matching and
/// day-percentage math.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Everything the engine reads and rewrites for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub user_id: UserId,
    /// Habits currently tracked, with display/category metadata.
    pub habits: BTreeMap<HabitId, HabitInfo>,
    /// Authoritative completion history per habit.
    pub habit_log: BTreeMap<HabitId, BTreeSet<NaiveDate>>,
    /// Derived streaks, persisted for display; recomputed on every write.
    pub habit_streaks: BTreeMap<HabitId, StreakState>,
    /// Streak over days where *any* habit was completed; missions key off
    /// this one.
    pub global_streak: StreakState,
    pub combo: ComboState,
    pub lifetime_completions: u32,
    /// Current-period quest rows; regenerated daily by the caller.
    pub quests: Vec<QuestProgress>,
    pub mission: Option<ExpeditionMission>,
    pub ledger: PointsLedger,
}

impl ProgressionSnapshot {
    /// Empty snapshot for a new user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            habits: BTreeMap::new(),
            habit_log: BTreeMap::new(),
            habit_streaks: BTreeMap::new(),
            global_streak: StreakState::empty(None),
            combo: ComboState::default(),
            lifetime_completions: 0,
            quests: Vec::new(),
            mission: None,
            ledger: PointsLedger::new(),
        }
    }

    /// Whether the given habit is recorded complete on `date`.
    #[must_use]
    pub fn is_completed(&self, habit_id: HabitId, date: NaiveDate) -> bool {
        self.habit_log
            .get(&habit_id)
            .is_some_and(|dates| dates.contains(&date))
    }

    /// Union of completed dates across all habits.
    #[must_use]
    pub fn all_completed_dates(&self) -> BTreeSet<NaiveDate> {
        self.habit_log.values().flatten().copied().collect()
    }

    /// Percentage of tracked habits completed on `date`, 0-100.
    ///
    /// Days before any habits exist count as zero, not as vacuously
    /// perfect.
    #[must_use]
    pub fn day_completion_percent(&self, date: NaiveDate) -> u8 {
        let total = self.habits.len();
        if total == 0 {
            return 0;
        }
        let done = self
            .habit_log
            .values()
            .filter(|dates| dates.contains(&date))
            .count();
        ((done * 100) / total).min(100) as u8
    }

    /// Category of a habit, when the caller supplied one.
    #[must_use]
    pub fn habit_category(&self, habit_id: HabitId) -> Option<&str> {
        self.habits
            .get(&habit_id)
            .and_then(|info| info.category.as_deref())
    }
}
