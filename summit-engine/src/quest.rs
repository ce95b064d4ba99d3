//! Daily quest definitions and progress tracking.
//!
//! Quest rows are generated for each calendar day by an external
//! collaborator; this module only advances and claims the current period's
//! rows. Rows keyed to an earlier day are inert.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::QUEST_DEFAULT_INCREMENT;
use crate::result::EngineError;
use crate::state::{HabitId, UserId};

/// Which completion events count toward a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestRule {
    /// Any habit completion counts.
    AnyHabit,
    /// Only a specific habit counts.
    Habit(HabitId),
    /// Any habit in the named category counts.
    Category(String),
}

impl QuestRule {
    /// Whether a completion of `habit_id` (in `category`, if known) counts.
    #[must_use]
    pub fn matches(&self, habit_id: HabitId, category: Option<&str>) -> bool {
        match self {
            Self::AnyHabit => true,
            Self::Habit(id) => *id == habit_id,
            Self::Category(wanted) => category == Some(wanted.as_str()),
        }
    }
}

/// Daily quest definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub rule: QuestRule,
    pub target_value: u32,
    #[serde(default = "Quest::default_increment")]
    pub increment: u32,
    pub reward_tokens: i64,
}

impl Quest {
    const fn default_increment() -> u32 {
        QUEST_DEFAULT_INCREMENT
    }
}

/// One user's progress against one quest for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: String,
    pub user_id: UserId,
    pub progress: u32,
    pub completed: bool,
    pub claimed: bool,
    /// Calendar day this row belongs to.
    pub period_key: NaiveDate,
}

impl QuestProgress {
    /// Fresh row for a quest on a given day.
    #[must_use]
    pub const fn fresh(quest_id: String, user_id: UserId, period_key: NaiveDate) -> Self {
        Self {
            quest_id,
            user_id,
            progress: 0,
            completed: false,
            claimed: false,
            period_key,
        }
    }
}

/// Advance every matching, current-period quest row for one completion.
///
/// Returns the ids of quests that crossed their target during this call.
/// Progress may overshoot the target; rows that were already completed are
/// left untouched so repeat events cannot re-trigger completion.
pub fn apply_completion(
    quests: &[Quest],
    rows: &mut [QuestProgress],
    habit_id: HabitId,
    category: Option<&str>,
    today: NaiveDate,
) -> Vec<String> {
    let mut completed_now = Vec::new();
    for row in rows.iter_mut() {
        if row.period_key != today {
            continue;
        }
        let Some(quest) = quests.iter().find(|q| q.id == row.quest_id) else {
            continue;
        };
        if !quest.rule.matches(habit_id, category) {
            continue;
        }
        row.progress += quest.increment;
        if !row.completed && row.progress >= quest.target_value {
            row.completed = true;
            completed_now.push(quest.id.clone());
        }
    }
    completed_now
}

/// Claim a completed quest's reward.
///
/// Marks the row claimed and returns the token amount the caller must
/// credit to the ledger.
///
/// # Errors
///
/// `AlreadyClaimed` when the row was claimed before, `NotCompleted` when
/// the target has not been reached, `UnknownQuest` when the row references
/// a quest missing from the catalog.
pub fn claim(quests: &[Quest], row: &mut QuestProgress) -> Result<i64, EngineError> {
    let Some(quest) = quests.iter().find(|q| q.id == row.quest_id) else {
        return Err(EngineError::UnknownQuest {
            quest_id: row.quest_id.clone(),
        });
    };
    if row.claimed {
        return Err(EngineError::AlreadyClaimed {
            quest_id: row.quest_id.clone(),
        });
    }
    if !row.completed {
        return Err(EngineError::NotCompleted {
            quest_id: row.quest_id.clone(),
            progress: row.progress,
            target: quest.target_value,
        });
    }
    row.claimed = true;
    Ok(quest.reward_tokens)
}
