//! Milestone threshold detection.
//!
//! Milestones are a static catalog; "unlocked" is a derived predicate on a
//! lifetime counter. The engine only reports *crossings* so a one-time
//! notification fires per threshold.

use serde::{Deserialize, Serialize};

/// Counter a milestone watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// Consecutive-day streak length.
    Streak,
    /// Lifetime completion count.
    Completions,
}

/// Static catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub kind: MilestoneKind,
    pub threshold: u32,
}

impl Milestone {
    #[must_use]
    pub fn new(kind: MilestoneKind, threshold: u32) -> Self {
        let prefix = match kind {
            MilestoneKind::Streak => "streak",
            MilestoneKind::Completions => "completions",
        };
        Self {
            id: format!("{prefix}-{threshold}"),
            kind,
            threshold,
        }
    }
}

/// Every catalog milestone of `kind` whose threshold lies in
/// `(previous, new]`, in ascending threshold order, each exactly once.
///
/// A bulk jump (say a backfill import moving a streak from 5 to 40) must
/// surface every crossed threshold, not just the last.
#[must_use]
pub fn detect(
    previous_value: u32,
    new_value: u32,
    catalog: &[Milestone],
    kind: MilestoneKind,
) -> Vec<Milestone> {
    let mut crossed: Vec<Milestone> = catalog
        .iter()
        .filter(|m| m.kind == kind && previous_value < m.threshold && m.threshold <= new_value)
        .cloned()
        .collect();
    crossed.sort_by_key(|m| m.threshold);
    crossed.dedup_by(|a, b| a.threshold == b.threshold);
    crossed
}
