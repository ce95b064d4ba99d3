//! Centralized balance and tuning constants for Summit progression logic.
//!
//! These values define the deterministic math for the reward economy.
//! Keeping them together ensures that balance can only be adjusted via
//! code changes reviewed in version control (or via an injected
//! `ProgressionConfig`), never through scattered literals.

// Points tuning ------------------------------------------------------------
pub(crate) const POINTS_BASE: i64 = 10;
pub(crate) const POINTS_STREAK_BONUS_PER_DAY: i64 = 1;
pub(crate) const POINTS_STREAK_BONUS_CAP: i64 = 20;

// Combo tuning -------------------------------------------------------------
pub(crate) const COMBO_WINDOW_MS: i64 = 4 * 60 * 60 * 1000;
pub(crate) const COMBO_STEP_SIZE: u32 = 5;
pub(crate) const COMBO_STEP_BONUS: f64 = 0.5;
pub(crate) const COMBO_MULTIPLIER_CAP: f64 = 3.0;

// Critical-hit tuning ------------------------------------------------------
pub(crate) const CRIT_TIER_ONE_CUTOFF: f64 = 0.03;
pub(crate) const CRIT_TIER_ONE_MULTIPLIER: f64 = 5.0;
pub(crate) const CRIT_TIER_TWO_CUTOFF: f64 = 0.10;
pub(crate) const CRIT_TIER_TWO_MULTIPLIER: f64 = 3.0;
pub(crate) const CRIT_TIER_THREE_CUTOFF: f64 = 0.25;
pub(crate) const CRIT_TIER_THREE_MULTIPLIER: f64 = 2.0;

// Quest tuning -------------------------------------------------------------
pub(crate) const QUEST_DEFAULT_INCREMENT: u32 = 1;

// Milestone catalog defaults -----------------------------------------------
pub(crate) const MILESTONE_STREAK_THRESHOLDS: [u32; 7] = [3, 7, 14, 30, 60, 100, 365];
pub(crate) const MILESTONE_COMPLETION_THRESHOLDS: [u32; 7] = [10, 25, 50, 100, 250, 500, 1000];

// Mission tuning -----------------------------------------------------------
pub(crate) const MISSION_RETREAT_REFUND_FRACTION: f64 = 0.5;
pub(crate) const MISSION_DEFAULT_POINTS: i64 = 150;

// Mission duration bands by summit elevation (meters) ----------------------
pub(crate) const MISSION_SINGLE_DAY_THRESHOLD_M: u32 = 4_000;
pub(crate) const MISSION_SINGLE_DAY_DURATION: u16 = 3;
pub(crate) const MISSION_WEEK_LONG_THRESHOLD_M: u32 = 5_500;
pub(crate) const MISSION_WEEK_LONG_DURATION: u16 = 7;
pub(crate) const MISSION_MULTI_WEEK_THRESHOLD_M: u32 = 7_000;
pub(crate) const MISSION_MULTI_WEEK_DURATION: u16 = 14;
pub(crate) const MISSION_MAJOR_THRESHOLD_M: u32 = 8_000;
pub(crate) const MISSION_MAJOR_DURATION: u16 = 21;
pub(crate) const MISSION_EIGHT_THOUSANDER_DURATION: u16 = 30;

// Mission completion requirements by fatality rate -------------------------
pub(crate) const MISSION_EASY_FATALITY_THRESHOLD: f64 = 0.01;
pub(crate) const MISSION_EASY_COMPLETION_PERCENT: u8 = 75;
pub(crate) const MISSION_MODERATE_FATALITY_THRESHOLD: f64 = 0.03;
pub(crate) const MISSION_MODERATE_COMPLETION_PERCENT: u8 = 80;
pub(crate) const MISSION_CHALLENGING_FATALITY_THRESHOLD: f64 = 0.05;
pub(crate) const MISSION_CHALLENGING_COMPLETION_PERCENT: u8 = 90;
pub(crate) const MISSION_DANGEROUS_COMPLETION_PERCENT: u8 = 100;
