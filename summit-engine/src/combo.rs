//! Combo tracking with lazy expiry.
//!
//! A combo grows by one on every completion inside the window and silently
//! evaporates once the window elapses. Expiry is never driven by a timer:
//! every reader evaluates the stored state against the `now` it was handed.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ComboCfg;

/// Short-lived multiplier state for rapid successive completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboState {
    pub current_combo: u32,
    pub daily_high_score: u32,
    pub combo_expires_at: Option<DateTime<Utc>>,
    /// Step multiplier derived from `current_combo`; informational only,
    /// readers should prefer [`effective_multiplier`].
    pub multiplier: f64,
    /// Local calendar day of the last scored completion. The daily high
    /// score resets when this day changes.
    pub last_scored_day: Option<NaiveDate>,
}

impl Default for ComboState {
    fn default() -> Self {
        Self {
            current_combo: 0,
            daily_high_score: 0,
            combo_expires_at: None,
            multiplier: 1.0,
            last_scored_day: None,
        }
    }
}

/// Combo count that is actually in force at `now`.
///
/// Stored state is left untouched when expired; the next completion starts
/// a fresh combo instead.
#[must_use]
pub fn effective_combo(state: &ComboState, now: DateTime<Utc>) -> u32 {
    match state.combo_expires_at {
        Some(expires_at) if now < expires_at => state.current_combo,
        _ => 0,
    }
}

/// Points multiplier in force at `now`, honoring lazy expiry.
#[must_use]
pub fn effective_multiplier(state: &ComboState, now: DateTime<Utc>, cfg: &ComboCfg) -> f64 {
    multiplier_for(effective_combo(state, now), cfg)
}

/// Step multiplier for a given combo count: one bonus step per
/// `step_size` combo, capped.
#[must_use]
pub fn multiplier_for(combo: u32, cfg: &ComboCfg) -> f64 {
    let steps = if cfg.step_size == 0 { 0 } else { combo / cfg.step_size };
    (1.0 + f64::from(steps) * cfg.step_bonus).min(cfg.multiplier_cap)
}

/// Advance the combo for a scoring completion at `now` on local day `today`.
///
/// An expired combo restarts at 1; a live one increments. The expiry window
/// always restarts from `now`. Un-completions never call this: undoing a
/// habit does not retroactively surrender a combo, only time does.
#[must_use]
pub fn on_completion(
    state: &ComboState,
    now: DateTime<Utc>,
    today: NaiveDate,
    cfg: &ComboCfg,
) -> ComboState {
    let combo = effective_combo(state, now) + 1;
    let carried_high = if state.last_scored_day == Some(today) {
        state.daily_high_score
    } else {
        0
    };
    ComboState {
        current_combo: combo,
        daily_high_score: carried_high.max(combo),
        combo_expires_at: Some(now + Duration::milliseconds(cfg.window_ms)),
        multiplier: multiplier_for(combo, cfg),
        last_scored_day: Some(today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg() -> ComboCfg {
        ComboCfg::default()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, hour, 0, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    #[test]
    fn first_completion_starts_combo_at_one() {
        let state = on_completion(&ComboState::default(), at(9), day(), &cfg());
        assert_eq!(state.current_combo, 1);
        assert_eq!(state.daily_high_score, 1);
        assert!((state.multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(state.combo_expires_at, Some(at(13)));
    }

    #[test]
    fn live_combo_increments_and_extends_window() {
        let first = on_completion(&ComboState::default(), at(9), day(), &cfg());
        let second = on_completion(&first, at(10), day(), &cfg());
        assert_eq!(second.current_combo, 2);
        assert_eq!(second.combo_expires_at, Some(at(14)));
    }

    #[test]
    fn expired_combo_reads_as_zero_without_mutation() {
        let mut state = on_completion(&ComboState::default(), at(9), day(), &cfg());
        state.current_combo = 7;
        assert_eq!(effective_combo(&state, at(14)), 0);
        assert!((effective_multiplier(&state, at(14), &cfg()) - 1.0).abs() < f64::EPSILON);
        // Stored fields untouched by the read.
        assert_eq!(state.current_combo, 7);
    }

    #[test]
    fn expired_combo_restarts_at_one() {
        let first = on_completion(&ComboState::default(), at(9), day(), &cfg());
        let restarted = on_completion(&first, at(14), day(), &cfg());
        assert_eq!(restarted.current_combo, 1);
        assert_eq!(restarted.daily_high_score, first.daily_high_score.max(1));
    }

    #[test]
    fn daily_high_score_resets_on_new_day() {
        let mut state = ComboState::default();
        for hour in 9..14 {
            state = on_completion(&state, at(hour), day(), &cfg());
        }
        assert_eq!(state.daily_high_score, 5);

        let tomorrow = day().succ_opt().unwrap();
        let next = on_completion(&state, at(18), tomorrow, &cfg());
        assert_eq!(next.daily_high_score, 1);
    }

    #[test]
    fn multiplier_steps_every_five_and_caps() {
        let c = cfg();
        assert!((multiplier_for(4, &c) - 1.0).abs() < f64::EPSILON);
        assert!((multiplier_for(5, &c) - 1.5).abs() < f64::EPSILON);
        assert!((multiplier_for(10, &c) - 2.0).abs() < f64::EPSILON);
        assert!((multiplier_for(99, &c) - 3.0).abs() < f64::EPSILON);
    }
}
