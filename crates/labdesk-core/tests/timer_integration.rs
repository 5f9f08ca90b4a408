//! Integration tests for the timer engine.
//!
//! These drive the engine through whole work/break cycles against an
//! in-memory store and a fixed clock, then check what was persisted.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use labdesk_core::events::Event;
use labdesk_core::storage::{Database, KvStore, MemoryStore};
use labdesk_core::timer::{
    Attribution, DailyStats, FixedClock, TimerEngine, TimerPhase, TimerPorts, TimerSettings,
    ALL_TIME_STATS_KEY, DAILY_STATS_KEY, SESSION_KEY,
};
use proptest::prelude::*;

fn short_settings() -> TimerSettings {
    TimerSettings {
        work_duration: 1,
        short_break: 1,
        long_break: 2,
        sessions_until_long_break: 4,
        sound_enabled: false,
    }
}

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap())
}

fn load_engine(store: &MemoryStore, settings: TimerSettings) -> TimerEngine {
    TimerEngine::load(TimerPorts::new(store.clone()).with_clock(clock()), settings).unwrap()
}

/// Run the current phase to completion and return the completion event.
fn finish_phase(engine: &mut TimerEngine) -> Event {
    engine.start(Attribution::none());
    for _ in 0..engine.phase_duration_secs() {
        if let Some(event) = engine.tick() {
            return event;
        }
    }
    panic!("phase did not complete");
}

#[test]
fn test_long_break_every_fourth_work_phase() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());

    let mut breaks = Vec::new();
    for _ in 0..5 {
        assert_eq!(engine.phase(), TimerPhase::Work);
        match finish_phase(&mut engine) {
            Event::PhaseCompleted { completed, next, .. } => {
                assert_eq!(completed, TimerPhase::Work);
                breaks.push(next);
            }
            other => panic!("Expected PhaseCompleted, got {other:?}"),
        }
        assert!(!engine.is_running(), "next phase must not auto-start");
        finish_phase(&mut engine);
    }

    assert_eq!(
        breaks,
        vec![
            TimerPhase::ShortBreak,
            TimerPhase::ShortBreak,
            TimerPhase::ShortBreak,
            TimerPhase::LongBreak,
            TimerPhase::ShortBreak,
        ]
    );
}

#[test]
fn test_stats_accumulate_across_phases() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());

    finish_phase(&mut engine); // work
    finish_phase(&mut engine); // short break
    finish_phase(&mut engine); // work

    let daily = engine.daily_stats();
    assert_eq!(daily.work_time, 120);
    assert_eq!(daily.break_time, 60);
    assert_eq!(daily.completed_sessions, 2);
    assert_eq!(engine.all_time_stats().total_work_time, 120);
    assert_eq!(engine.all_time_stats().total_break_time, 60);
    assert_eq!(engine.all_time_stats().total_sessions, 2);

    // Each completion is written through to the store.
    let stored: DailyStats =
        serde_json::from_str(&store.get(DAILY_STATS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(&stored, daily);
    assert!(store.get(ALL_TIME_STATS_KEY).unwrap().is_some());
}

#[test]
fn test_work_time_is_credited_to_the_project() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());

    engine.start(Attribution::project("7", "X").with_task("t1", "Read paper"));
    for _ in 0..60 {
        engine.tick();
    }

    assert_eq!(engine.daily_stats().project_breakdown.get("7-X"), Some(&60));
    assert_eq!(engine.project_time_today("7", Some("X")), 60);
    assert_eq!(engine.project_time_total("7", Some("X")), 60);
    assert_eq!(engine.project_time_total("7", None), 0);
}

#[test]
fn test_missing_project_name_keeps_empty_suffix() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());

    engine.start(Attribution {
        project_id: Some("7".into()),
        ..Attribution::none()
    });
    for _ in 0..60 {
        engine.tick();
    }
    assert_eq!(engine.daily_stats().project_breakdown.get("7-"), Some(&60));
}

#[test]
fn test_unattributed_work_credits_no_project() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());
    finish_phase(&mut engine);
    assert_eq!(engine.daily_stats().work_time, 60);
    assert!(engine.daily_stats().project_breakdown.is_empty());
}

#[test]
fn test_stale_daily_stats_reset_on_load() {
    let store = MemoryStore::new();
    let mut yesterday = DailyStats::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    yesterday.work_time = 3000;
    yesterday.completed_sessions = 2;
    store
        .set(DAILY_STATS_KEY, &serde_json::to_string(&yesterday).unwrap())
        .unwrap();
    store
        .set(ALL_TIME_STATS_KEY, r#"{"total_work_time":3000,"total_break_time":0,"total_sessions":2,"project_breakdown":{}}"#)
        .unwrap();

    let engine = load_engine(&store, short_settings());
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    assert_eq!(engine.daily_stats(), &DailyStats::new(today));
    assert_eq!(engine.all_time_stats().total_work_time, 3000);

    let stored: DailyStats =
        serde_json::from_str(&store.get(DAILY_STATS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.date, today);
    assert_eq!(stored.work_time, 0);
}

#[test]
fn test_day_rolls_over_while_running() {
    let store = MemoryStore::new();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 30).unwrap());
    let mut engine = TimerEngine::load(
        TimerPorts::new(store.clone()).with_clock(clock.clone()),
        short_settings(),
    )
    .unwrap();

    finish_phase(&mut engine);
    assert_eq!(engine.daily_stats().work_time, 60);

    clock.advance(Duration::minutes(5));
    finish_phase(&mut engine);
    let daily = engine.daily_stats();
    assert_eq!(daily.date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
    assert_eq!(daily.work_time, 0);
    assert_eq!(daily.break_time, 60);
}

#[test]
fn test_stop_discards_session_without_credit() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());

    engine.start(Attribution::project("7", "X"));
    for _ in 0..30 {
        engine.tick();
    }
    assert!(store.get(SESSION_KEY).unwrap().is_some());

    let event = engine.stop().unwrap();
    assert!(matches!(
        event,
        Event::TimerStopped {
            session_discarded: true,
            ..
        }
    ));
    assert!(engine.session().is_none());
    assert!(!engine.is_running());
    assert_eq!(engine.remaining_secs(), 60);
    assert_eq!(engine.daily_stats().work_time, 0);
    assert!(engine.daily_stats().project_breakdown.is_empty());
    assert!(store.get(SESSION_KEY).unwrap().is_none());
}

#[test]
fn test_paused_session_resumes_after_reload() {
    let store = MemoryStore::new();
    {
        let mut engine = load_engine(&store, TimerSettings::default());
        engine.start(Attribution::project("7", "X"));
        for _ in 0..10 {
            engine.tick();
        }
        engine.pause();
    }

    let mut engine = load_engine(&store, TimerSettings::default());
    assert!(!engine.is_running());
    assert_eq!(engine.phase(), TimerPhase::Work);
    assert_eq!(engine.remaining_secs(), 25 * 60 - 10);
    let session = engine.session().unwrap();
    assert_eq!(session.project_id.as_deref(), Some("7"));
    assert!(!session.is_break);

    let event = engine.start(Attribution::none()).unwrap();
    assert!(matches!(
        event,
        Event::TimerStarted {
            session_created: false,
            ..
        }
    ));
}

#[test]
fn test_session_is_marked_during_break() {
    let store = MemoryStore::new();
    let mut engine = load_engine(&store, short_settings());
    engine.start(Attribution::project("7", "X"));
    for _ in 0..60 {
        engine.tick();
    }
    assert!(engine.session().unwrap().is_break);
    finish_phase(&mut engine);
    assert!(!engine.session().unwrap().is_break);
}

#[test]
fn test_settings_persist_and_override_defaults() {
    let store = MemoryStore::new();
    {
        let mut engine = load_engine(&store, TimerSettings::default());
        engine.update_settings(short_settings()).unwrap();
    }
    let engine = load_engine(&store, TimerSettings::default());
    assert_eq!(engine.settings(), &short_settings());
    assert_eq!(engine.remaining_secs(), 60);
}

#[test]
fn test_invalid_defaults_fall_back_to_builtin_settings() {
    let store = MemoryStore::new();
    let broken = TimerSettings {
        work_duration: 1,
        sessions_until_long_break: 0,
        ..short_settings()
    };
    let mut engine = load_engine(&store, broken);
    assert_eq!(engine.settings(), &TimerSettings::default());

    match finish_phase(&mut engine) {
        Event::PhaseCompleted { completed, next, .. } => {
            assert_eq!(completed, TimerPhase::Work);
            assert_eq!(next, TimerPhase::ShortBreak);
        }
        other => panic!("Expected PhaseCompleted, got {other:?}"),
    }
}

#[test]
fn test_engine_on_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labdesk.db");
    {
        let db = Database::open_at(&path).unwrap();
        let mut engine =
            TimerEngine::load(TimerPorts::new(db).with_clock(clock()), short_settings()).unwrap();
        engine.start(Attribution::project("7", "X"));
        for _ in 0..60 {
            engine.tick();
        }
        engine.save().unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let engine =
        TimerEngine::load(TimerPorts::new(db).with_clock(clock()), short_settings()).unwrap();
    assert_eq!(engine.phase(), TimerPhase::ShortBreak);
    assert_eq!(engine.project_time_total("7", Some("X")), 60);
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    Tick,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Start),
        1 => Just(Op::Pause),
        8 => Just(Op::Tick),
    ]
}

proptest! {
    #[test]
    fn prop_each_running_tick_takes_exactly_one_second(ops in prop::collection::vec(op(), 1..400)) {
        let store = MemoryStore::new();
        let mut engine = load_engine(&store, short_settings());

        for op in ops {
            let before = (engine.phase(), engine.remaining_secs());
            let was_running = engine.is_running();
            let ticked = matches!(op, Op::Tick);
            let completed = match op {
                Op::Start => { engine.start(Attribution::none()); false }
                Op::Pause => { engine.pause(); false }
                Op::Tick => matches!(engine.tick(), Some(Event::PhaseCompleted { .. })),
            };
            if completed {
                prop_assert_eq!(engine.remaining_secs(), engine.phase_duration_secs());
            } else {
                prop_assert_eq!(engine.phase(), before.0);
                if ticked && was_running {
                    prop_assert_eq!(engine.remaining_secs(), before.1 - 1);
                } else {
                    prop_assert_eq!(engine.remaining_secs(), before.1);
                }
            }
            prop_assert!(engine.remaining_secs() <= engine.phase_duration_secs());
        }
    }
}
