//! Engine outputs: the atomic result of one operation, its advisory
//! effects, and the recoverable error taxonomy.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::ledger::EntryReason;
use crate::milestone::Milestone;
use crate::mission::{MissionRewards, MissionStatus, RetreatRewards};
use crate::state::ProgressionSnapshot;

/// Effects rarely exceed a handful per event; keep them inline.
pub type EffectList = SmallVec<[Effect; 6]>;

/// Advisory side effect of an engine operation.
///
/// The caller presents these to the user (toasts, animations); they are
/// not required for correctness and carry no state of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    PointsCredited { amount: i64, reason: EntryReason },
    ComboIncreased { combo: u32, multiplier: f64 },
    CriticalHit { multiplier: f64 },
    QuestCompleted { quest_id: String },
    MilestoneUnlocked { milestone: Milestone },
    MissionAdvanced { day: u16, met_requirement: bool },
    MissionCompleted { rewards: MissionRewards },
    MissionRetreated { rewards: RetreatRewards },
}

/// New snapshot plus everything that happened while producing it.
///
/// Either the whole result is persisted or none of it; the engine never
/// hands back a partially applied snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionResult {
    pub snapshot: ProgressionSnapshot,
    pub effects: EffectList,
}

impl ProgressionResult {
    /// A result that changed nothing (idempotent replay).
    #[must_use]
    pub fn unchanged(snapshot: ProgressionSnapshot) -> Self {
        Self {
            snapshot,
            effects: EffectList::new(),
        }
    }
}

/// Recoverable failure kinds for engine operations.
///
/// None of these are fatal; each is scoped to a single user operation and
/// the caller branches on the variant. Nothing is retried internally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("quest {quest_id} was already claimed")]
    AlreadyClaimed { quest_id: String },
    #[error("quest {quest_id} is not completed (progress {progress}/{target})")]
    NotCompleted {
        quest_id: String,
        progress: u32,
        target: u32,
    },
    #[error("quest {quest_id} is not available")]
    UnknownQuest { quest_id: String },
    #[error("insufficient points: need {needed}, have {available}")]
    InsufficientPoints { needed: i64, available: i64 },
    #[error("ledger amounts must be positive (got {amount})")]
    InvalidAmount { amount: i64 },
    #[error("mission is {status} and cannot change state")]
    InvalidMissionState { status: MissionStatus },
    #[error("no active mission for this user")]
    NoActiveMission,
    #[error("snapshot was modified concurrently; reload and retry")]
    StaleSnapshot,
}
