//! Critical-hit rolls.
//!
//! One uniform draw per qualifying completion, walked through the tier
//! table low cutoff to high. The orchestrator's idempotency gate is what
//! prevents re-rolls on duplicate events; this module never draws more
//! than once per call.

use serde::{Deserialize, Serialize};

use crate::config::CriticalCfg;
use crate::rng::RandomSource;

/// Outcome of a single critical-hit roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalHit {
    pub is_critical: bool,
    pub multiplier: f64,
}

impl CriticalHit {
    /// The non-critical outcome.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            is_critical: false,
            multiplier: 1.0,
        }
    }
}

/// Roll once against the tier table.
#[must_use]
pub fn roll(rng: &mut dyn RandomSource, cfg: &CriticalCfg) -> CriticalHit {
    let draw = rng.next_unit();
    for tier in &cfg.tiers {
        if draw < tier.cutoff {
            return CriticalHit {
                is_critical: true,
                multiplier: tier.multiplier,
            };
        }
    }
    CriticalHit::none()
}
