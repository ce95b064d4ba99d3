//! Injected tuning tables for the progression engine.
//!
//! Every knob the engine consumes lives here so balance can be adjusted
//! without touching engine logic. All structs deserialize with per-field
//! defaults, letting partial JSON override individual values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    COMBO_MULTIPLIER_CAP, COMBO_STEP_BONUS, COMBO_STEP_SIZE, COMBO_WINDOW_MS,
    CRIT_TIER_ONE_CUTOFF, CRIT_TIER_ONE_MULTIPLIER, CRIT_TIER_THREE_CUTOFF,
    CRIT_TIER_THREE_MULTIPLIER, CRIT_TIER_TWO_CUTOFF, CRIT_TIER_TWO_MULTIPLIER,
    MILESTONE_COMPLETION_THRESHOLDS, MILESTONE_STREAK_THRESHOLDS, MISSION_DEFAULT_POINTS,
    MISSION_RETREAT_REFUND_FRACTION, POINTS_BASE, POINTS_STREAK_BONUS_CAP,
    POINTS_STREAK_BONUS_PER_DAY,
};
use crate::milestone::{Milestone, MilestoneKind};
use crate::quest::Quest;

/// Base points credited per habit completion, before multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsCfg {
    #[serde(default = "PointsCfg::default_base")]
    pub base: i64,
    #[serde(default = "PointsCfg::default_streak_bonus_per_day")]
    pub streak_bonus_per_day: i64,
    #[serde(default = "PointsCfg::default_streak_bonus_cap")]
    pub streak_bonus_cap: i64,
}

impl PointsCfg {
    const fn default_base() -> i64 {
        POINTS_BASE
    }

    const fn default_streak_bonus_per_day() -> i64 {
        POINTS_STREAK_BONUS_PER_DAY
    }

    const fn default_streak_bonus_cap() -> i64 {
        POINTS_STREAK_BONUS_CAP
    }

    /// Streak bonus for a given current streak, capped.
    #[must_use]
    pub fn streak_bonus(&self, current_streak: u32) -> i64 {
        (i64::from(current_streak) * self.streak_bonus_per_day).min(self.streak_bonus_cap)
    }
}

impl Default for PointsCfg {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            streak_bonus_per_day: Self::default_streak_bonus_per_day(),
            streak_bonus_cap: Self::default_streak_bonus_cap(),
        }
    }
}

/// Combo window and step-multiplier tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboCfg {
    /// Idle window before a combo decays, in milliseconds.
    #[serde(default = "ComboCfg::default_window_ms")]
    pub window_ms: i64,
    /// Combo steps per multiplier bonus.
    #[serde(default = "ComboCfg::default_step_size")]
    pub step_size: u32,
    /// Multiplier added per step.
    #[serde(default = "ComboCfg::default_step_bonus")]
    pub step_bonus: f64,
    #[serde(default = "ComboCfg::default_multiplier_cap")]
    pub multiplier_cap: f64,
}

impl ComboCfg {
    const fn default_window_ms() -> i64 {
        COMBO_WINDOW_MS
    }

    const fn default_step_size() -> u32 {
        COMBO_STEP_SIZE
    }

    const fn default_step_bonus() -> f64 {
        COMBO_STEP_BONUS
    }

    const fn default_multiplier_cap() -> f64 {
        COMBO_MULTIPLIER_CAP
    }
}

impl Default for ComboCfg {
    fn default() -> Self {
        Self {
            window_ms: Self::default_window_ms(),
            step_size: Self::default_step_size(),
            step_bonus: Self::default_step_bonus(),
            multiplier_cap: Self::default_multiplier_cap(),
        }
    }
}

/// One critical-hit tier: draws below `cutoff` that missed every earlier
/// tier land here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CritTier {
    pub cutoff: f64,
    pub multiplier: f64,
}

/// Critical-hit tier table, evaluated low cutoff to high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalCfg {
    #[serde(default = "CriticalCfg::default_tiers")]
    pub tiers: Vec<CritTier>,
}

impl CriticalCfg {
    fn default_tiers() -> Vec<CritTier> {
        vec![
            CritTier {
                cutoff: CRIT_TIER_ONE_CUTOFF,
                multiplier: CRIT_TIER_ONE_MULTIPLIER,
            },
            CritTier {
                cutoff: CRIT_TIER_TWO_CUTOFF,
                multiplier: CRIT_TIER_TWO_MULTIPLIER,
            },
            CritTier {
                cutoff: CRIT_TIER_THREE_CUTOFF,
                multiplier: CRIT_TIER_THREE_MULTIPLIER,
            },
        ]
    }
}

impl Default for CriticalCfg {
    fn default() -> Self {
        Self {
            tiers: Self::default_tiers(),
        }
    }
}

/// Mission reward and retreat tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionCfg {
    /// Tokens credited to the ledger when a mission completes.
    #[serde(default = "MissionCfg::default_completion_tokens")]
    pub completion_tokens: i64,
    /// Fraction of spent energy returned on retreat.
    #[serde(default = "MissionCfg::default_retreat_refund_fraction")]
    pub retreat_refund_fraction: f64,
}

impl MissionCfg {
    const fn default_completion_tokens() -> i64 {
        MISSION_DEFAULT_POINTS
    }

    const fn default_retreat_refund_fraction() -> f64 {
        MISSION_RETREAT_REFUND_FRACTION
    }
}

impl Default for MissionCfg {
    fn default() -> Self {
        Self {
            completion_tokens: Self::default_completion_tokens(),
            retreat_refund_fraction: Self::default_retreat_refund_fraction(),
        }
    }
}

/// Complete tuning surface consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default)]
    pub points: PointsCfg,
    #[serde(default)]
    pub combo: ComboCfg,
    #[serde(default)]
    pub critical: CriticalCfg,
    #[serde(default)]
    pub mission: MissionCfg,
    #[serde(default = "ProgressionConfig::default_milestones")]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub quests: Vec<Quest>,
}

impl ProgressionConfig {
    fn default_milestones() -> Vec<Milestone> {
        MILESTONE_STREAK_THRESHOLDS
            .into_iter()
            .map(|t| Milestone::new(MilestoneKind::Streak, t))
            .chain(
                MILESTONE_COMPLETION_THRESHOLDS
                    .into_iter()
                    .map(|t| Milestone::new(MilestoneKind::Completions, t)),
            )
            .collect()
    }

    /// Validate invariants the engine math relies on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first field that violates its
    /// documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points.base <= 0 {
            return Err(ConfigError::MinViolation {
                field: "points.base",
                min: 1.0,
                value: self.points.base as f64,
            });
        }
        if self.combo.window_ms <= 0 {
            return Err(ConfigError::MinViolation {
                field: "combo.window_ms",
                min: 1.0,
                value: self.combo.window_ms as f64,
            });
        }
        if self.combo.step_size == 0 {
            return Err(ConfigError::MinViolation {
                field: "combo.step_size",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.combo.multiplier_cap < 1.0 {
            return Err(ConfigError::MinViolation {
                field: "combo.multiplier_cap",
                min: 1.0,
                value: self.combo.multiplier_cap,
            });
        }
        self.validate_crit_tiers()?;
        if !(0.0..=1.0).contains(&self.mission.retreat_refund_fraction) {
            return Err(ConfigError::RangeViolation {
                field: "mission.retreat_refund_fraction",
                min: 0.0,
                max: 1.0,
                value: self.mission.retreat_refund_fraction,
            });
        }
        Ok(())
    }

    fn validate_crit_tiers(&self) -> Result<(), ConfigError> {
        let mut previous = 0.0f64;
        for (index, tier) in self.critical.tiers.iter().enumerate() {
            if !(0.0..=1.0).contains(&tier.cutoff) {
                return Err(ConfigError::RangeViolation {
                    field: "critical.tiers.cutoff",
                    min: 0.0,
                    max: 1.0,
                    value: tier.cutoff,
                });
            }
            if tier.cutoff <= previous {
                return Err(ConfigError::TierOrder { index });
            }
            if tier.multiplier < 1.0 {
                return Err(ConfigError::MinViolation {
                    field: "critical.tiers.multiplier",
                    min: 1.0,
                    value: tier.multiplier,
                });
            }
            previous = tier.cutoff;
        }
        Ok(())
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            points: PointsCfg::default(),
            combo: ComboCfg::default(),
            critical: CriticalCfg::default(),
            mission: MissionCfg::default(),
            milestones: Self::default_milestones(),
            quests: Vec::new(),
        }
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("critical tier {index} cutoff must exceed the previous tier's")]
    TierOrder { index: usize },
}
