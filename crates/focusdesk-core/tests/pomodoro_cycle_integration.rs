//! Integration tests for the pomodoro cycle.
//!
//! Drives the engine through full focus/break cycles the way the ticking
//! service would, checking counters, history and backend intents.

use std::sync::Arc;

use focusdesk_core::{
    Event, Intent, Phase, PomodoroEngine, RecordingSink, SessionKey, TaskId, TickOutcome,
    TimerSettings,
};

fn tick_until_done(engine: &mut PomodoroEngine, key: &SessionKey, max: u32) -> u32 {
    for n in 1..=max {
        if let TickOutcome::Completed { .. } = engine.tick(key).unwrap() {
            return n;
        }
    }
    panic!("phase did not complete within {max} ticks");
}

#[test]
fn one_minute_cycle_with_long_break_every_second_focus() {
    let sink = RecordingSink::new();
    let mut engine = PomodoroEngine::new(TimerSettings {
        focus_minutes: 1,
        break_minutes: 1,
        sessions_until_long_break: 2,
        ..TimerSettings::default()
    })
    .unwrap()
    .with_intent_sink(Arc::new(sink.clone()));
    let id = TaskId::from(11u64);
    let key = SessionKey::Task(id.clone());
    engine.set_task_name(id.clone(), "Draft slides");

    engine.start_timer(&key);
    assert_eq!(engine.session(&key).unwrap().total_secs, 60);

    // Focus runs out after exactly 60 ticks.
    assert_eq!(tick_until_done(&mut engine, &key, 120), 60);
    let s = engine.session(&key).unwrap();
    assert_eq!(s.phase, Phase::Break);
    assert_eq!((s.time_left_secs, s.total_secs), (60, 60));
    assert_eq!((s.cycle_count, s.completed_focus_sessions), (1, 1));
    let history = engine.history(&key);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].phase, Phase::Focus);
    assert!(!history[0].skipped);
    assert_eq!(history[0].task_name, "Draft slides");

    // Break runs out, back to focus with counts unchanged.
    engine.start_timer(&key);
    assert_eq!(tick_until_done(&mut engine, &key, 120), 60);
    let s = engine.session(&key).unwrap();
    assert_eq!(s.phase, Phase::Focus);
    assert_eq!(s.time_left_secs, 60);
    assert_eq!((s.cycle_count, s.completed_focus_sessions), (1, 1));

    // Skipping the second focus lands on the long break.
    let s = engine.skip(&key).unwrap();
    assert_eq!(s.cycle_count, 2);
    assert_eq!(s.phase, Phase::LongBreak);
    assert_eq!(s.total_secs, 15 * 60);
    let history = engine.history(&key);
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].phase, Phase::Break);
    assert!(history[2].skipped);
    assert_eq!(history[2].phase, Phase::Focus);

    // The skipped focus was never started, so only one focus interval
    // was reported to the backend.
    assert_eq!(
        sink.intents(),
        vec![Intent::FocusStarted(id.clone()), Intent::FocusEnded(id)]
    );
}

#[test]
fn reaching_target_unlocks_task_completion() {
    let sink = RecordingSink::new();
    let mut engine = PomodoroEngine::new(TimerSettings {
        focus_minutes: 1,
        target_focus_sessions: 3,
        ..TimerSettings::default()
    })
    .unwrap()
    .with_intent_sink(Arc::new(sink.clone()));
    let mut events = engine.subscribe();
    let id = TaskId::from("alpha");
    let key = SessionKey::Task(id.clone());

    for round in 1..=3u32 {
        engine.start_timer(&key);
        tick_until_done(&mut engine, &key, 61);
        if round < 3 {
            assert!(engine.mark_task_complete(&id).is_err());
        }
        engine.skip(&key).unwrap();
    }

    assert!(engine.target_reached(&key));
    engine.mark_task_complete(&id).unwrap();

    let intents = sink.intents();
    assert_eq!(intents.last(), Some(&Intent::TaskCompleted(id.clone())));
    assert_eq!(
        intents
            .iter()
            .filter(|i| matches!(i, Intent::FocusStarted(_)))
            .count(),
        3
    );

    let reached: Vec<Event> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, Event::TargetReached { .. }))
        .collect();
    assert_eq!(reached.len(), 1);
}

#[test]
fn reset_mid_cycle_starts_over() {
    let mut engine = PomodoroEngine::default();
    let key = SessionKey::General;
    engine.start_timer(&key);
    engine.skip(&key).unwrap();
    engine.skip(&key).unwrap();
    engine.start_timer(&key);
    for _ in 0..42 {
        engine.tick(&key).unwrap();
    }

    let s = engine.stop_timer(&key).unwrap();
    assert_eq!(s.phase, Phase::Focus);
    assert_eq!((s.time_left_secs, s.total_secs), (1500, 1500));
    assert_eq!((s.cycle_count, s.completed_focus_sessions), (0, 0));
    assert!(!s.running && !s.paused);
    assert!(engine.history(&key).is_empty());

    // A reset session starts fresh again.
    engine.start_timer(&key);
    assert_eq!(
        engine.tick(&key).unwrap(),
        TickOutcome::Counting { time_left_secs: 1499 }
    );
}
