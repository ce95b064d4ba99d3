//! Append-only points ledger.
//!
//! Balance is always the running sum of signed entries. Nothing is ever
//! edited or deleted; corrections are compensating entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::EngineError;
use crate::state::UserId;

/// Why a ledger entry was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    HabitComplete,
    CriticalBonus,
    QuestReward,
    MissionReward,
    MissionRetreat,
    RewardRedemption,
    RedemptionReversal,
}

impl std::fmt::Display for EntryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match self {
            Self::HabitComplete => "habit_complete",
            Self::CriticalBonus => "critical_bonus",
            Self::QuestReward => "quest_reward",
            Self::MissionReward => "mission_reward",
            Self::MissionRetreat => "mission_retreat",
            Self::RewardRedemption => "reward_redemption",
            Self::RedemptionReversal => "redemption_reversal",
        };
        write!(f, "{key}")
    }
}

/// One signed movement of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub user_id: UserId,
    pub amount: i64,
    pub reason: EntryReason,
    /// Opaque key linking the entry to its cause (a habit/date pair, a
    /// quest id, a reward id) so reversals can find what they undo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only ledger for one user's points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointsLedger {
    entries: Vec<LedgerEntry>,
    next_id: u64,
}

impl PointsLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Current balance: the sum of every entry.
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    /// All entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Append a positive credit.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidAmount` when `amount` is not positive.
    pub fn credit(
        &mut self,
        user_id: UserId,
        amount: i64,
        reason: EntryReason,
        related: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&LedgerEntry, EngineError> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount { amount });
        }
        Ok(self.append(user_id, amount, reason, related, now))
    }

    /// Append a debit after checking the balance covers it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidAmount` for non-positive amounts and
    /// `EngineError::InsufficientPoints` when the balance cannot cover the
    /// debit. The check and the append happen on the same owned value, so
    /// they are atomic with respect to this snapshot.
    pub fn debit(
        &mut self,
        user_id: UserId,
        amount: i64,
        reason: EntryReason,
        related: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&LedgerEntry, EngineError> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount { amount });
        }
        let available = self.balance();
        if available < amount {
            return Err(EngineError::InsufficientPoints {
                needed: amount,
                available,
            });
        }
        Ok(self.append(user_id, -amount, reason, related, now))
    }

    /// Append a compensating entry negating the net amount booked under
    /// `related` across `reason` and `reversal_reason` entries. Used to
    /// claw back the credit for an un-completed habit and to roll back a
    /// failed redemption. Re-invoking with the same key nets to zero and
    /// appends nothing. May drive the balance negative; reversals are
    /// corrections, not spends.
    pub fn reverse(
        &mut self,
        user_id: UserId,
        reason: EntryReason,
        related: &str,
        reversal_reason: EntryReason,
        now: DateTime<Utc>,
    ) -> Option<&LedgerEntry> {
        let booked: i64 = self
            .entries
            .iter()
            .filter(|e| {
                (e.reason == reason || e.reason == reversal_reason)
                    && e.related.as_deref() == Some(related)
            })
            .map(|e| e.amount)
            .sum();
        if booked == 0 {
            return None;
        }
        Some(self.append(user_id, -booked, reversal_reason, Some(related.to_string()), now))
    }

    fn append(
        &mut self,
        user_id: UserId,
        amount: i64,
        reason: EntryReason,
        related: Option<String>,
        now: DateTime<Utc>,
    ) -> &LedgerEntry {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LedgerEntry {
            id,
            user_id,
            amount,
            reason,
            related,
            created_at: now,
        });
        self.entries.last().expect("entry was just pushed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn balance_is_running_sum() {
        let mut ledger = PointsLedger::new();
        ledger
            .credit(1, 25, EntryReason::HabitComplete, None, now())
            .unwrap();
        ledger
            .credit(1, 10, EntryReason::QuestReward, None, now())
            .unwrap();
        ledger
            .debit(1, 15, EntryReason::RewardRedemption, None, now())
            .unwrap();
        assert_eq!(ledger.balance(), 20);
        assert_eq!(ledger.entries().len(), 3);
    }

    #[test]
    fn credit_rejects_non_positive_amounts() {
        let mut ledger = PointsLedger::new();
        assert_eq!(
            ledger.credit(1, 0, EntryReason::HabitComplete, None, now()),
            Err(EngineError::InvalidAmount { amount: 0 })
        );
    }

    #[test]
    fn debit_rejects_overdraft() {
        let mut ledger = PointsLedger::new();
        ledger
            .credit(1, 5, EntryReason::HabitComplete, None, now())
            .unwrap();
        let err = ledger
            .debit(1, 8, EntryReason::RewardRedemption, None, now())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientPoints {
                needed: 8,
                available: 5
            }
        );
        // Failed debit appends nothing.
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn reverse_negates_entries_under_key() {
        let mut ledger = PointsLedger::new();
        ledger
            .credit(
                1,
                12,
                EntryReason::HabitComplete,
                Some("habit-3:2025-03-05".into()),
                now(),
            )
            .unwrap();
        let reversal = ledger
            .reverse(
                1,
                EntryReason::HabitComplete,
                "habit-3:2025-03-05",
                EntryReason::HabitComplete,
                now(),
            )
            .unwrap();
        assert_eq!(reversal.amount, -12);
        assert_eq!(ledger.balance(), 0);

        // Nothing left to reverse a second time.
        assert!(
            ledger
                .reverse(
                    1,
                    EntryReason::HabitComplete,
                    "habit-3:2025-03-05",
                    EntryReason::HabitComplete,
                    now(),
                )
                .is_none()
        );
    }

    #[test]
    fn entry_ids_are_monotonic() {
        let mut ledger = PointsLedger::new();
        for _ in 0..4 {
            ledger
                .credit(1, 1, EntryReason::HabitComplete, None, now())
                .unwrap();
        }
        let ids: Vec<u64> = ledger.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
