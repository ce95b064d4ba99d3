use chrono::{NaiveDate, TimeZone, Utc};
use summit_engine::{
    Clock, CompletionEvent, Difficulty, Effect, EngineError, EntryReason, ExpeditionMission,
    FixedClock, HabitInfo, MissionPlan, MissionStatus, MountainProfile, ProgressionConfig,
    ProgressionEngine, ProgressionSnapshot, Quest, QuestProgress, QuestRule, RandomSource,
    plan_mission,
};

struct NeverCrit;

impl RandomSource for NeverCrit {
    fn next_unit(&mut self) -> f64 {
        0.5
    }
}

fn clock(day: u32, hour: u32) -> FixedClock {
    FixedClock::at(Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap())
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn two_habit_snapshot() -> ProgressionSnapshot {
    let mut snapshot = ProgressionSnapshot::new(1);
    snapshot.habits.insert(
        1,
        HabitInfo {
            name: "Morning run".into(),
            category: Some("fitness".into()),
        },
    );
    snapshot.habits.insert(
        2,
        HabitInfo {
            name: "Journal".into(),
            category: Some("mindfulness".into()),
        },
    );
    snapshot
}

fn completion(habit_id: u32, day: u32, clock: &FixedClock) -> CompletionEvent {
    CompletionEvent {
        habit_id,
        user_id: 1,
        date: date(day),
        completed: true,
        occurred_at: clock.now(),
    }
}

#[test]
fn quest_completes_through_engine_and_pays_once_on_claim() {
    let mut config = ProgressionConfig::default();
    config.quests = vec![Quest {
        id: "fitness-first".into(),
        title: "Do something active".into(),
        rule: QuestRule::Category("fitness".into()),
        target_value: 1,
        increment: 1,
        reward_tokens: 25,
    }];
    let engine = ProgressionEngine::new(config).unwrap();

    let mut snapshot = two_habit_snapshot();
    snapshot
        .quests
        .push(QuestProgress::fresh("fitness-first".into(), 1, date(5)));

    // A non-fitness completion does not advance it.
    let clock = clock(5, 8);
    snapshot = engine
        .apply_completion(&completion(2, 5, &clock), &snapshot, &clock, &mut NeverCrit)
        .unwrap()
        .snapshot;
    assert!(!snapshot.quests[0].completed);

    let result = engine
        .apply_completion(&completion(1, 5, &clock), &snapshot, &clock, &mut NeverCrit)
        .unwrap();
    assert!(result.effects.iter().any(|e| matches!(
        e,
        Effect::QuestCompleted { quest_id } if quest_id == "fitness-first"
    )));
    snapshot = result.snapshot;

    let balance = snapshot.ledger.balance();
    let claimed = engine.claim_quest("fitness-first", &snapshot, &clock).unwrap();
    assert_eq!(claimed.snapshot.ledger.balance(), balance + 25);
    assert!(claimed.effects.iter().any(|e| matches!(
        e,
        Effect::PointsCredited {
            amount: 25,
            reason: EntryReason::QuestReward
        }
    )));

    assert_eq!(
        engine.claim_quest("fitness-first", &claimed.snapshot, &clock),
        Err(EngineError::AlreadyClaimed {
            quest_id: "fitness-first".into()
        })
    );
}

#[test]
fn claim_rejects_missing_row_and_unmet_target() {
    let mut config = ProgressionConfig::default();
    config.quests = vec![Quest {
        id: "daily-three".into(),
        title: "Complete 3 habits".into(),
        rule: QuestRule::AnyHabit,
        target_value: 3,
        increment: 1,
        reward_tokens: 15,
    }];
    let engine = ProgressionEngine::new(config).unwrap();
    let clock = clock(5, 9);

    let snapshot = two_habit_snapshot();
    assert!(matches!(
        engine.claim_quest("daily-three", &snapshot, &clock),
        Err(EngineError::UnknownQuest { .. })
    ));

    let mut snapshot = snapshot;
    snapshot
        .quests
        .push(QuestProgress::fresh("daily-three".into(), 1, date(5)));
    let snapshot = engine
        .apply_completion(&completion(1, 5, &clock), &snapshot, &clock, &mut NeverCrit)
        .unwrap()
        .snapshot;
    assert_eq!(
        engine.claim_quest("daily-three", &snapshot, &clock),
        Err(EngineError::NotCompleted {
            quest_id: "daily-three".into(),
            progress: 1,
            target: 3
        })
    );
}

#[test]
fn yesterdays_quest_row_is_not_claimable_today() {
    let mut config = ProgressionConfig::default();
    config.quests = vec![Quest {
        id: "daily-one".into(),
        title: "Complete a habit".into(),
        rule: QuestRule::AnyHabit,
        target_value: 1,
        increment: 1,
        reward_tokens: 10,
    }];
    let engine = ProgressionEngine::new(config).unwrap();

    let mut snapshot = two_habit_snapshot();
    let mut row = QuestProgress::fresh("daily-one".into(), 1, date(4));
    row.progress = 1;
    row.completed = true;
    snapshot.quests.push(row);

    let clock = clock(5, 9);
    assert!(matches!(
        engine.claim_quest("daily-one", &snapshot, &clock),
        Err(EngineError::UnknownQuest { .. })
    ));
}

#[test]
fn mission_days_catch_up_lazily_and_complete() {
    let engine = ProgressionEngine::new(ProgressionConfig::default()).unwrap();
    let mut snapshot = two_habit_snapshot();

    let plan = MissionPlan {
        total_days: 3,
        required_completion_percent: 80,
        base_xp: 225,
        base_points: 300,
    };
    snapshot.mission = Some(ExpeditionMission::start(
        1,
        1,
        "mount-rainier".into(),
        &plan,
        40,
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
    ));
    // Day one fully done, day two half done, day three untouched.
    for habit_id in [1u32, 2] {
        snapshot.habit_log.entry(habit_id).or_default().insert(date(1));
    }
    snapshot.habit_log.entry(1).or_default().insert(date(2));

    // Next write arrives three days later and resolves the backlog.
    let clock = clock(4, 9);
    let result = engine
        .apply_completion(&completion(1, 4, &clock), &snapshot, &clock, &mut NeverCrit)
        .unwrap();

    let mission = result.snapshot.mission.as_ref().unwrap();
    assert_eq!(mission.status, MissionStatus::Completed);
    assert_eq!(mission.current_day, 3);
    assert_eq!(mission.days_completed, 1);
    assert_eq!(mission.perfect_days, 1);

    let advanced: Vec<bool> = result
        .effects
        .iter()
        .filter_map(|e| match e {
            Effect::MissionAdvanced { met_requirement, .. } => Some(*met_requirement),
            _ => None,
        })
        .collect();
    assert_eq!(advanced, vec![true, false, false]);
    assert!(result.effects.iter().any(|e| matches!(
        e,
        Effect::MissionCompleted { rewards } if rewards.xp == 225
    )));
    // Completion tokens landed in the ledger alongside the habit credit.
    assert!(
        result
            .snapshot
            .ledger
            .entries()
            .iter()
            .any(|entry| entry.reason == EntryReason::MissionReward)
    );
}

#[test]
fn completed_mission_stops_advancing() {
    let engine = ProgressionEngine::new(ProgressionConfig::default()).unwrap();
    let mut snapshot = two_habit_snapshot();

    let plan = MissionPlan {
        total_days: 1,
        required_completion_percent: 80,
        base_xp: 75,
        base_points: 100,
    };
    snapshot.mission = Some(ExpeditionMission::start(
        1,
        1,
        "mount-hood".into(),
        &plan,
        10,
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
    ));

    let first_clock = clock(3, 9);
    let mut snapshot = engine
        .apply_completion(&completion(1, 3, &first_clock), &snapshot, &first_clock, &mut NeverCrit)
        .unwrap()
        .snapshot;
    assert_eq!(
        snapshot.mission.as_ref().unwrap().status,
        MissionStatus::Completed
    );
    let token_credits = snapshot
        .ledger
        .entries()
        .iter()
        .filter(|e| e.reason == EntryReason::MissionReward)
        .count();
    assert_eq!(token_credits, 1);

    // Later writes leave the terminal mission alone and pay nothing more.
    let later_clock = clock(10, 9);
    snapshot = engine
        .apply_completion(&completion(2, 10, &later_clock), &snapshot, &later_clock, &mut NeverCrit)
        .unwrap()
        .snapshot;
    let token_credits = snapshot
        .ledger
        .entries()
        .iter()
        .filter(|e| e.reason == EntryReason::MissionReward)
        .count();
    assert_eq!(token_credits, 1);
}

#[test]
fn retreat_banks_partial_xp_in_the_ledger() {
    let engine = ProgressionEngine::new(ProgressionConfig::default()).unwrap();
    let mut snapshot = two_habit_snapshot();

    let mut mission = ExpeditionMission::start(
        2,
        1,
        "denali".into(),
        &MissionPlan {
            total_days: 10,
            required_completion_percent: 90,
            base_xp: 225,
            base_points: 300,
        },
        40,
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
    );
    mission.current_day = 5;
    mission.days_completed = 4;
    snapshot.mission = Some(mission);

    let clock = clock(6, 12);
    let result = engine.retreat_mission(&snapshot, &clock).unwrap();
    assert_eq!(
        result.snapshot.mission.as_ref().unwrap().status,
        MissionStatus::Retreated
    );
    // 225 * 4/10 floored.
    assert_eq!(result.snapshot.ledger.balance(), 90);
    assert!(result.effects.iter().any(|e| matches!(
        e,
        Effect::MissionRetreated { rewards } if rewards.energy_refund == 20
    )));

    assert_eq!(
        engine.retreat_mission(&result.snapshot, &clock),
        Err(EngineError::InvalidMissionState {
            status: MissionStatus::Retreated
        })
    );
    assert_eq!(
        engine.retreat_mission(&two_habit_snapshot(), &clock),
        Err(EngineError::NoActiveMission)
    );
}

#[test]
fn planning_catalog_feeds_mission_start() {
    let everest = MountainProfile {
        id: "everest".into(),
        elevation_m: 8_849,
        difficulty: Difficulty::Elite,
        fatality_rate: 0.04,
    };
    let plan = plan_mission(&everest);
    assert_eq!(plan.total_days, 45);
    assert_eq!(plan.required_completion_percent, 90);
    assert_eq!(plan.base_xp, 2_250);
    assert_eq!(plan.base_points, 3_000);

    let mission = ExpeditionMission::start(
        3,
        1,
        everest.id,
        &plan,
        100,
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
    );
    assert_eq!(mission.status, MissionStatus::Active);
    assert_eq!(mission.total_days, 45);
    assert_eq!(mission.required_completion_percent, 90);
}

#[test]
fn redemption_debits_and_reversal_is_idempotent() {
    let engine = ProgressionEngine::new(ProgressionConfig::default()).unwrap();
    let clock = clock(5, 9);
    let mut snapshot = two_habit_snapshot();
    snapshot
        .ledger
        .credit(1, 100, EntryReason::HabitComplete, None, clock.now())
        .unwrap();

    assert_eq!(
        engine.redeem_reward("reward-coffee", 150, &snapshot, &clock),
        Err(EngineError::InsufficientPoints {
            needed: 150,
            available: 100
        })
    );

    let redeemed = engine
        .redeem_reward("reward-coffee", 60, &snapshot, &clock)
        .unwrap();
    assert_eq!(redeemed.snapshot.ledger.balance(), 40);

    let reversed = engine.reverse_redemption("reward-coffee", &redeemed.snapshot, &clock);
    assert_eq!(reversed.snapshot.ledger.balance(), 100);

    // Compensating twice nets to zero.
    let again = engine.reverse_redemption("reward-coffee", &reversed.snapshot, &clock);
    assert_eq!(again.snapshot.ledger.balance(), 100);
}

#[test]
fn ledger_stays_append_only_through_mixed_activity() {
    let engine = ProgressionEngine::new(ProgressionConfig::default()).unwrap();
    let mut snapshot = two_habit_snapshot();

    for day in 3..=5u32 {
        let clock = clock(day, 9);
        snapshot = engine
            .apply_completion(&completion(1, day, &clock), &snapshot, &clock, &mut NeverCrit)
            .unwrap()
            .snapshot;
    }
    let entries_before = snapshot.ledger.entries().len();

    let clock = clock(5, 10);
    let undo = CompletionEvent {
        habit_id: 1,
        user_id: 1,
        date: date(4),
        completed: false,
        occurred_at: clock.now(),
    };
    snapshot = engine.apply_uncompletion(&undo, &snapshot, &clock).unwrap().snapshot;

    // The clawback is a new compensating entry, not a removal.
    assert_eq!(snapshot.ledger.entries().len(), entries_before + 1);
    let sum: i64 = snapshot.ledger.entries().iter().map(|e| e.amount).sum();
    assert_eq!(sum, snapshot.ledger.balance());

    let mut ids: Vec<u64> = snapshot.ledger.entries().iter().map(|e| e.id).collect();
    let sorted = {
        let mut s = ids.clone();
        s.sort_unstable();
        s
    };
    assert_eq!(ids, sorted);
    ids.dedup();
    assert_eq!(ids.len(), snapshot.ledger.entries().len());
}
