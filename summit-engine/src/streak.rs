//! Streak derivation from completion history.
//!
//! Streaks are never stored incrementally; they are recomputed from the
//! authoritative set of completed dates so redundant recomputation is
//! always safe.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::state::HabitId;

/// Derived streak counters for one habit, or for all habits combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Habit this streak belongs to; `None` for the global streak.
    pub habit_id: Option<HabitId>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
}

impl StreakState {
    /// Empty streak for a habit that has never been completed.
    #[must_use]
    pub const fn empty(habit_id: Option<HabitId>) -> Self {
        Self {
            habit_id,
            current_streak: 0,
            longest_streak: 0,
            last_completed_date: None,
        }
    }
}

/// Recompute streak counters from the full set of completed dates.
///
/// The current streak is the run of consecutive days ending at `as_of`, or
/// at the day before `as_of` when `as_of` itself has no completion yet (an
/// unfinished day does not break the streak). A gap of two or more days
/// breaks the run. The longest streak considers every run in the set, not
/// just the current one.
#[must_use]
pub fn recompute(
    habit_id: Option<HabitId>,
    completed_dates: &BTreeSet<NaiveDate>,
    as_of: NaiveDate,
) -> StreakState {
    let last_completed_date = completed_dates.iter().rev().find(|d| **d <= as_of).copied();

    let current_streak = match last_completed_date {
        Some(latest) if days_between(latest, as_of) <= 1 => run_length_ending_at(completed_dates, latest),
        _ => 0,
    };

    StreakState {
        habit_id,
        current_streak,
        longest_streak: longest_run(completed_dates).max(current_streak),
        last_completed_date,
    }
}

fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}

fn run_length_ending_at(dates: &BTreeSet<NaiveDate>, end: NaiveDate) -> u32 {
    let mut run = 0u32;
    let mut cursor = end;
    while dates.contains(&cursor) {
        run += 1;
        let Some(previous) = cursor.checked_sub_days(Days::new(1)) else {
            break;
        };
        cursor = previous;
    }
    run
}

fn longest_run(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        run = match previous {
            Some(prev) if days_between(prev, *date) == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*date);
    }
    longest
}
