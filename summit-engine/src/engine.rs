//! Progression orchestrator.
//!
//! The single entry point that turns a completion event into one atomic
//! state delta. Collaborators run in a fixed order because they are not
//! commutative: the combo multiplier scales the points the same event
//! credits, and quest and milestone detection read the post-streak-update
//! counters. Idempotency is checked before anything that rolls dice or
//! moves points, so duplicate deliveries cannot double-pay.

use chrono::{DateTime, NaiveDate, Utc};
use smallvec::smallvec;

use crate::clock::Clock;
use crate::combo;
use crate::config::{ConfigError, ProgressionConfig};
use crate::critical;
use crate::ledger::EntryReason;
use crate::milestone::{self, MilestoneKind};
use crate::mission::{self, MissionStatus};
use crate::quest;
use crate::result::{Effect, EffectList, EngineError, ProgressionResult};
use crate::rng::RandomSource;
use crate::state::{CompletionEvent, HabitId, ProgressionSnapshot};
use crate::streak::{self, StreakState};

/// Pure state-transition engine over per-user progression snapshots.
///
/// Holds only configuration. All state flows through arguments and return
/// values; the caller owns storage, per-user serialization, and retry on
/// [`EngineError::StaleSnapshot`].
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    config: ProgressionConfig,
}

impl ProgressionEngine {
    /// Build an engine after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` the tuning tables violate.
    pub fn new(config: ProgressionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Apply a completion or un-completion event, routed by its flag.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_completion`] and [`Self::apply_uncompletion`].
    pub fn apply(
        &self,
        event: &CompletionEvent,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
        rng: &mut dyn RandomSource,
    ) -> Result<ProgressionResult, EngineError> {
        if event.completed {
            self.apply_completion(event, prior, clock, rng)
        } else {
            self.apply_uncompletion(event, prior, clock)
        }
    }

    /// Apply "habit completed on date D".
    ///
    /// Re-applying an event already reflected in the snapshot returns the
    /// snapshot unchanged with zero effects, without drawing from `rng`.
    ///
    /// # Errors
    ///
    /// Ledger append failures surface as `EngineError`; with a validated
    /// config all credited amounts are positive, so this is not expected
    /// on the happy path.
    pub fn apply_completion(
        &self,
        event: &CompletionEvent,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
        rng: &mut dyn RandomSource,
    ) -> Result<ProgressionResult, EngineError> {
        if prior.is_completed(event.habit_id, event.date) {
            return Ok(ProgressionResult::unchanged(prior.clone()));
        }

        let now = clock.now();
        let today = clock.today();
        let mut snapshot = prior.clone();
        let mut effects: EffectList = smallvec![];

        snapshot
            .habit_log
            .entry(event.habit_id)
            .or_default()
            .insert(event.date);

        let previous_streak = self.recompute_streaks(&mut snapshot, event.habit_id, today);
        let current_streak = snapshot
            .habit_streaks
            .get(&event.habit_id)
            .map_or(0, |s| s.current_streak);
        let previous_lifetime = snapshot.lifetime_completions;
        snapshot.lifetime_completions += 1;

        snapshot.combo = combo::on_completion(&prior.combo, now, today, &self.config.combo);
        effects.push(Effect::ComboIncreased {
            combo: snapshot.combo.current_combo,
            multiplier: snapshot.combo.multiplier,
        });

        let base = self.config.points.base + self.config.points.streak_bonus(current_streak);
        let combo_multiplier = snapshot.combo.multiplier;
        let habit_points = ((base as f64) * combo_multiplier).round() as i64;
        let related = habit_related_key(event.habit_id, event.date);
        snapshot.ledger.credit(
            event.user_id,
            habit_points,
            EntryReason::HabitComplete,
            Some(related.clone()),
            now,
        )?;
        effects.push(Effect::PointsCredited {
            amount: habit_points,
            reason: EntryReason::HabitComplete,
        });

        let crit = critical::roll(rng, &self.config.critical);
        if crit.is_critical {
            effects.push(Effect::CriticalHit {
                multiplier: crit.multiplier,
            });
            let bonus = ((base as f64) * combo_multiplier * (crit.multiplier - 1.0)).round() as i64;
            if bonus > 0 {
                snapshot.ledger.credit(
                    event.user_id,
                    bonus,
                    EntryReason::CriticalBonus,
                    Some(related),
                    now,
                )?;
                effects.push(Effect::PointsCredited {
                    amount: bonus,
                    reason: EntryReason::CriticalBonus,
                });
            }
        }

        let category = snapshot.habit_category(event.habit_id).map(str::to_owned);
        let completed_quests = quest::apply_completion(
            &self.config.quests,
            &mut snapshot.quests,
            event.habit_id,
            category.as_deref(),
            today,
        );
        for quest_id in completed_quests {
            effects.push(Effect::QuestCompleted { quest_id });
        }

        for milestone in milestone::detect(
            previous_streak.current_streak,
            current_streak,
            &self.config.milestones,
            MilestoneKind::Streak,
        ) {
            effects.push(Effect::MilestoneUnlocked { milestone });
        }
        for milestone in milestone::detect(
            previous_lifetime,
            snapshot.lifetime_completions,
            &self.config.milestones,
            MilestoneKind::Completions,
        ) {
            effects.push(Effect::MilestoneUnlocked { milestone });
        }

        self.advance_mission_days(&mut snapshot, clock, now, today, &mut effects)?;

        Ok(ProgressionResult { snapshot, effects })
    }

    /// Apply "habit no longer completed on date D".
    ///
    /// Recomputes streaks and counters and claws back the points credited
    /// for that date via a compensating ledger entry. The combo is not
    /// decremented and critical bonuses are not revoked: undoing a habit
    /// does not retroactively surrender them, only time does.
    ///
    /// # Errors
    ///
    /// Ledger append failures surface as `EngineError`.
    pub fn apply_uncompletion(
        &self,
        event: &CompletionEvent,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
    ) -> Result<ProgressionResult, EngineError> {
        if !prior.is_completed(event.habit_id, event.date) {
            return Ok(ProgressionResult::unchanged(prior.clone()));
        }

        let now = clock.now();
        let today = clock.today();
        let mut snapshot = prior.clone();
        let mut effects: EffectList = smallvec![];

        if let Some(dates) = snapshot.habit_log.get_mut(&event.habit_id) {
            dates.remove(&event.date);
        }
        self.recompute_streaks(&mut snapshot, event.habit_id, today);
        snapshot.lifetime_completions = snapshot.lifetime_completions.saturating_sub(1);

        let related = habit_related_key(event.habit_id, event.date);
        snapshot.ledger.reverse(
            event.user_id,
            EntryReason::HabitComplete,
            &related,
            EntryReason::HabitComplete,
            now,
        );

        self.advance_mission_days(&mut snapshot, clock, now, today, &mut effects)?;

        Ok(ProgressionResult { snapshot, effects })
    }

    /// Claim a completed daily quest's token reward.
    ///
    /// # Errors
    ///
    /// `UnknownQuest` when no current-period row exists for `quest_id`,
    /// `NotCompleted` when the target is unmet, `AlreadyClaimed` on a
    /// repeat claim.
    pub fn claim_quest(
        &self,
        quest_id: &str,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
    ) -> Result<ProgressionResult, EngineError> {
        let now = clock.now();
        let today = clock.today();
        let mut snapshot = prior.clone();

        let row = snapshot
            .quests
            .iter_mut()
            .find(|row| row.quest_id == quest_id && row.period_key == today)
            .ok_or_else(|| EngineError::UnknownQuest {
                quest_id: quest_id.to_string(),
            })?;
        let tokens = quest::claim(&self.config.quests, row)?;

        snapshot.ledger.credit(
            prior.user_id,
            tokens,
            EntryReason::QuestReward,
            Some(format!("quest-{quest_id}:{today}")),
            now,
        )?;

        Ok(ProgressionResult {
            snapshot,
            effects: smallvec![Effect::PointsCredited {
                amount: tokens,
                reason: EntryReason::QuestReward,
            }],
        })
    }

    /// Retreat from the active mission, banking partial rewards.
    ///
    /// # Errors
    ///
    /// `NoActiveMission` when the user has no mission at all,
    /// `InvalidMissionState` when the mission is already terminal.
    pub fn retreat_mission(
        &self,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
    ) -> Result<ProgressionResult, EngineError> {
        let mission = prior.mission.as_ref().ok_or(EngineError::NoActiveMission)?;
        let (retreated, rewards) = mission::retreat(mission, &self.config.mission)?;

        let now = clock.now();
        let mut snapshot = prior.clone();
        let mut effects: EffectList = smallvec![];

        if rewards.xp > 0 {
            snapshot.ledger.credit(
                prior.user_id,
                rewards.xp,
                EntryReason::MissionRetreat,
                Some(format!("mission-{}", retreated.id)),
                now,
            )?;
            effects.push(Effect::PointsCredited {
                amount: rewards.xp,
                reason: EntryReason::MissionRetreat,
            });
        }
        effects.push(Effect::MissionRetreated { rewards });
        snapshot.mission = Some(retreated);

        Ok(ProgressionResult { snapshot, effects })
    }

    /// Debit the ledger for a reward redemption.
    ///
    /// The at-most-once guarantee for a reward instance belongs to the
    /// caller: compare-and-swap the reward's redeemed flag, then debit,
    /// then mark redeemed, rolling back with
    /// [`Self::reverse_redemption`] if the final step fails.
    ///
    /// # Errors
    ///
    /// `InsufficientPoints` when the balance cannot cover `cost`.
    pub fn redeem_reward(
        &self,
        reward_id: &str,
        cost: i64,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
    ) -> Result<ProgressionResult, EngineError> {
        let mut snapshot = prior.clone();
        snapshot.ledger.debit(
            prior.user_id,
            cost,
            EntryReason::RewardRedemption,
            Some(reward_id.to_string()),
            clock.now(),
        )?;
        Ok(ProgressionResult {
            snapshot,
            effects: EffectList::new(),
        })
    }

    /// Compensate a redemption whose mark-redeemed step failed.
    ///
    /// Appends a credit negating the redemption debit; calling it again
    /// for the same reward nets to zero and changes nothing.
    #[must_use]
    pub fn reverse_redemption(
        &self,
        reward_id: &str,
        prior: &ProgressionSnapshot,
        clock: &dyn Clock,
    ) -> ProgressionResult {
        let mut snapshot = prior.clone();
        snapshot.ledger.reverse(
            prior.user_id,
            EntryReason::RewardRedemption,
            reward_id,
            EntryReason::RedemptionReversal,
            clock.now(),
        );
        ProgressionResult {
            snapshot,
            effects: EffectList::new(),
        }
    }

    /// Recompute the per-habit and global streaks after a log change.
    /// Returns the habit's streak state from before the change.
    fn recompute_streaks(
        &self,
        snapshot: &mut ProgressionSnapshot,
        habit_id: HabitId,
        today: NaiveDate,
    ) -> StreakState {
        let previous = snapshot
            .habit_streaks
            .get(&habit_id)
            .cloned()
            .unwrap_or_else(|| StreakState::empty(Some(habit_id)));
        let dates = snapshot.habit_log.get(&habit_id).cloned().unwrap_or_default();
        snapshot
            .habit_streaks
            .insert(habit_id, streak::recompute(Some(habit_id), &dates, today));
        snapshot.global_streak = streak::recompute(None, &snapshot.all_completed_dates(), today);
        previous
    }

    /// Lazily resolve mission days the calendar has moved past.
    ///
    /// Runs on every apply call rather than from a timer, so a user who
    /// disappears for a week has the missed days resolved (at their
    /// recorded completion percentages, usually zero) on their next write.
    fn advance_mission_days(
        &self,
        snapshot: &mut ProgressionSnapshot,
        clock: &dyn Clock,
        now: DateTime<Utc>,
        today: NaiveDate,
        effects: &mut EffectList,
    ) -> Result<(), EngineError> {
        let Some(mut current) = snapshot.mission.clone() else {
            return Ok(());
        };
        if current.status != MissionStatus::Active {
            return Ok(());
        }

        let started_on = clock.local_date(current.started_at);
        while current.status == MissionStatus::Active {
            let Some(frontier) = current.frontier_date(started_on) else {
                break;
            };
            if frontier >= today {
                break;
            }
            let percent = snapshot.day_completion_percent(frontier);
            let advance = mission::advance_day(&current, percent, &self.config.mission)?;
            effects.push(Effect::MissionAdvanced {
                day: advance.mission.current_day,
                met_requirement: advance.met_requirement,
            });
            if let Some(rewards) = advance.completion {
                snapshot.ledger.credit(
                    snapshot.user_id,
                    rewards.tokens,
                    EntryReason::MissionReward,
                    Some(format!("mission-{}", advance.mission.id)),
                    now,
                )?;
                effects.push(Effect::MissionCompleted { rewards });
                effects.push(Effect::PointsCredited {
                    amount: rewards.tokens,
                    reason: EntryReason::MissionReward,
                });
            }
            current = advance.mission;
        }
        snapshot.mission = Some(current);
        Ok(())
    }
}

fn habit_related_key(habit_id: HabitId, date: NaiveDate) -> String {
    format!("habit-{habit_id}:{date}")
}
