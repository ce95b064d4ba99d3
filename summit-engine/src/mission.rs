//! Expedition mission state machine and planning catalog.
//!
//! A mission advances one state step per calendar day, driven lazily by the
//! orchestrator when it observes the local day has moved past the mission's
//! frontier. Status transitions are one-way: `Active` ends in `Completed`
//! or `Retreated` and never comes back.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MissionCfg;
use crate::constants::{
    MISSION_CHALLENGING_COMPLETION_PERCENT, MISSION_CHALLENGING_FATALITY_THRESHOLD,
    MISSION_DANGEROUS_COMPLETION_PERCENT, MISSION_EASY_COMPLETION_PERCENT,
    MISSION_EASY_FATALITY_THRESHOLD, MISSION_EIGHT_THOUSANDER_DURATION,
    MISSION_MAJOR_DURATION, MISSION_MAJOR_THRESHOLD_M, MISSION_MODERATE_COMPLETION_PERCENT,
    MISSION_MODERATE_FATALITY_THRESHOLD, MISSION_MULTI_WEEK_DURATION,
    MISSION_MULTI_WEEK_THRESHOLD_M, MISSION_SINGLE_DAY_DURATION,
    MISSION_SINGLE_DAY_THRESHOLD_M, MISSION_WEEK_LONG_DURATION, MISSION_WEEK_LONG_THRESHOLD_M,
};
use crate::result::EngineError;
use crate::state::UserId;

/// Lifecycle state of an expedition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Active,
    Completed,
    Retreated,
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Retreated => write!(f, "retreated"),
        }
    }
}

/// Difficulty tier of a summit, scaling duration and rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Novice,
    #[default]
    Intermediate,
    Advanced,
    Expert,
    Elite,
}

impl Difficulty {
    /// Duration scaling factor for the tier.
    #[must_use]
    pub const fn duration_multiplier(self) -> f64 {
        match self {
            Self::Novice => 0.8,
            Self::Intermediate => 1.0,
            Self::Advanced => 1.2,
            Self::Expert => 1.4,
            Self::Elite => 1.5,
        }
    }

    /// Base XP payout for completing a mission of this tier.
    #[must_use]
    pub const fn base_xp(self) -> i64 {
        match self {
            Self::Novice => 75,
            Self::Intermediate => 225,
            Self::Advanced => 550,
            Self::Expert => 1_000,
            Self::Elite => 2_250,
        }
    }

    /// Base token payout for completing a mission of this tier.
    #[must_use]
    pub const fn base_points(self) -> i64 {
        match self {
            Self::Novice => 100,
            Self::Intermediate => 300,
            Self::Advanced => 650,
            Self::Expert => 1_200,
            Self::Elite => 3_000,
        }
    }
}

/// Static profile of a summit used to plan a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountainProfile {
    pub id: String,
    pub elevation_m: u32,
    pub difficulty: Difficulty,
    /// Historical fatality rate in `[0, 1]`.
    pub fatality_rate: f64,
}

/// Derived mission parameters for a summit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionPlan {
    pub total_days: u16,
    pub required_completion_percent: u8,
    pub base_xp: i64,
    pub base_points: i64,
}

/// Plan a mission from a summit's static profile.
///
/// Duration comes from the elevation band scaled by the difficulty tier
/// (rounded to the nearest day, never below one); the per-day completion
/// requirement comes from the fatality-rate band.
#[must_use]
pub fn plan_mission(mountain: &MountainProfile) -> MissionPlan {
    MissionPlan {
        total_days: mission_length_days(mountain.elevation_m, mountain.difficulty),
        required_completion_percent: required_completion_percent(mountain.fatality_rate),
        base_xp: mountain.difficulty.base_xp(),
        base_points: mountain.difficulty.base_points(),
    }
}

/// Mission length in days for an elevation band and difficulty tier.
#[must_use]
pub fn mission_length_days(elevation_m: u32, difficulty: Difficulty) -> u16 {
    let band = if elevation_m < MISSION_SINGLE_DAY_THRESHOLD_M {
        MISSION_SINGLE_DAY_DURATION
    } else if elevation_m < MISSION_WEEK_LONG_THRESHOLD_M {
        MISSION_WEEK_LONG_DURATION
    } else if elevation_m < MISSION_MULTI_WEEK_THRESHOLD_M {
        MISSION_MULTI_WEEK_DURATION
    } else if elevation_m < MISSION_MAJOR_THRESHOLD_M {
        MISSION_MAJOR_DURATION
    } else {
        MISSION_EIGHT_THOUSANDER_DURATION
    };
    let scaled = (f64::from(band) * difficulty.duration_multiplier()).round();
    (scaled as u16).max(1)
}

/// Required daily completion percentage for a fatality rate.
#[must_use]
pub fn required_completion_percent(fatality_rate: f64) -> u8 {
    if fatality_rate < MISSION_EASY_FATALITY_THRESHOLD {
        MISSION_EASY_COMPLETION_PERCENT
    } else if fatality_rate < MISSION_MODERATE_FATALITY_THRESHOLD {
        MISSION_MODERATE_COMPLETION_PERCENT
    } else if fatality_rate < MISSION_CHALLENGING_FATALITY_THRESHOLD {
        MISSION_CHALLENGING_COMPLETION_PERCENT
    } else {
        MISSION_DANGEROUS_COMPLETION_PERCENT
    }
}

/// Multi-day expedition state.
///
/// Invariant: `days_completed <= current_day <= total_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpeditionMission {
    pub id: u32,
    pub user_id: UserId,
    pub mountain_id: String,
    pub status: MissionStatus,
    pub total_days: u16,
    /// Days already resolved, starting at 0.
    pub current_day: u16,
    pub days_completed: u16,
    pub perfect_days: u16,
    pub required_completion_percent: u8,
    pub base_xp: i64,
    /// Energy the user paid to start; partially refunded on retreat.
    pub energy_spent: i64,
    pub started_at: DateTime<Utc>,
}

impl ExpeditionMission {
    /// Start a fresh mission from a plan.
    #[must_use]
    pub fn start(
        id: u32,
        user_id: UserId,
        mountain_id: String,
        plan: &MissionPlan,
        energy_spent: i64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            mountain_id,
            status: MissionStatus::Active,
            total_days: plan.total_days,
            current_day: 0,
            days_completed: 0,
            perfect_days: 0,
            required_completion_percent: plan.required_completion_percent,
            base_xp: plan.base_xp,
            energy_spent,
            started_at,
        }
    }

    /// Calendar date the next unresolved mission day falls on, given the
    /// local date the mission started.
    #[must_use]
    pub fn frontier_date(&self, started_on: NaiveDate) -> Option<NaiveDate> {
        started_on.checked_add_days(Days::new(u64::from(self.current_day)))
    }
}

/// Rewards emitted when a mission reaches its final day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRewards {
    pub xp: i64,
    pub tokens: i64,
}

/// Rewards granted for an early retreat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatRewards {
    /// Partial XP, proportional to days completed.
    pub xp: i64,
    /// Energy returned to the user; advisory for the caller's energy
    /// system, not a ledger amount.
    pub energy_refund: i64,
}

/// Outcome of resolving one mission day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAdvance {
    pub mission: ExpeditionMission,
    /// Whether the resolved day met the completion requirement.
    pub met_requirement: bool,
    /// Present when this advance finished the mission.
    pub completion: Option<MissionRewards>,
}

/// Resolve one mission day against that day's aggregate habit-completion
/// percentage.
///
/// # Errors
///
/// `InvalidMissionState` when the mission is already terminal.
pub fn advance_day(
    mission: &ExpeditionMission,
    day_completion_percent: u8,
    cfg: &MissionCfg,
) -> Result<DayAdvance, EngineError> {
    if mission.status != MissionStatus::Active {
        return Err(EngineError::InvalidMissionState {
            status: mission.status,
        });
    }

    let mut next = mission.clone();
    next.current_day += 1;
    let met_requirement = day_completion_percent >= mission.required_completion_percent;
    if met_requirement {
        next.days_completed += 1;
    }
    if day_completion_percent >= 100 {
        next.perfect_days += 1;
    }

    let completion = if next.current_day == next.total_days {
        next.status = MissionStatus::Completed;
        Some(MissionRewards {
            xp: next.base_xp,
            tokens: cfg.completion_tokens,
        })
    } else {
        None
    };

    Ok(DayAdvance {
        mission: next,
        met_requirement,
        completion,
    })
}

/// User-initiated early termination with partial rewards.
///
/// XP scales with the fraction of days completed (rounded down); the
/// energy refund fraction comes from configuration.
///
/// # Errors
///
/// `InvalidMissionState` when the mission is not active, which also makes
/// retreat a single-use transition.
pub fn retreat(
    mission: &ExpeditionMission,
    cfg: &MissionCfg,
) -> Result<(ExpeditionMission, RetreatRewards), EngineError> {
    if mission.status != MissionStatus::Active {
        return Err(EngineError::InvalidMissionState {
            status: mission.status,
        });
    }

    let mut next = mission.clone();
    next.status = MissionStatus::Retreated;

    let fraction = if mission.total_days == 0 {
        0.0
    } else {
        f64::from(mission.days_completed) / f64::from(mission.total_days)
    };
    let rewards = RetreatRewards {
        xp: (mission.base_xp as f64 * fraction).floor() as i64,
        energy_refund: (mission.energy_spent as f64 * cfg.retreat_refund_fraction).round() as i64,
    };
    Ok((next, rewards))
}
