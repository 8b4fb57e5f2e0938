//! Integration tests for the daily boundary.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use timescore_core::{Config, FixedClock, RolloverOutcome, ScriptedLuck, Store, TimeScore};

fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn service(energy: f64, now: NaiveDateTime) -> (TimeScore, FixedClock) {
    let clock = FixedClock::new(now);
    let store = Arc::new(Store::open_memory(energy).unwrap());
    let ts = TimeScore::with_parts(
        Config::default(),
        store,
        Box::new(clock.clone()),
        Box::new(ScriptedLuck::default()),
    )
    .unwrap();
    (ts, clock)
}

#[test]
fn test_overnight_rollover_archives_and_recovers() {
    let (mut ts, clock) = service(100.0, on(1, 21, 0));
    ts.record_behavior("S", 60, 3, None).unwrap();
    let evening = ts.record_behavior("S", 60, 3, None).unwrap();
    let day_one = ts.today_snapshot().unwrap();

    clock.set(on(2, 8, 0));
    let snapshot = ts.today_snapshot().unwrap();
    assert_eq!(snapshot.date, on(2, 0, 0).date());
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.state.today_total_score, 0.0);
    assert_eq!(snapshot.state.today_behavior_count, 0);
    assert_eq!(snapshot.state.combo_count, 0);
    assert!((snapshot.state.current_energy - (evening.energy_after + 56.0).min(100.0)).abs() < 1e-9);

    let history = ts.historical_series(7).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].date, on(1, 0, 0).date());
    assert!((history[0].total_score - day_one.state.today_total_score).abs() < 1e-9);
    assert!((history[0].total_energy_cost - day_one.state.today_energy_cost).abs() < 1e-9);
}

#[test]
fn test_rollover_is_idempotent() {
    let (mut ts, clock) = service(100.0, on(1, 10, 0));
    ts.record_behavior("A", 30, 3, None).unwrap();

    clock.set(on(2, 9, 0));
    assert!(matches!(ts.roll_over().unwrap(), RolloverOutcome::Rolled { .. }));
    let once = ts.today_snapshot().unwrap();
    assert_eq!(ts.roll_over().unwrap(), RolloverOutcome::Unchanged);
    assert_eq!(ts.today_snapshot().unwrap(), once);
    assert_eq!(ts.historical_series(30).unwrap().len(), 1);
}

#[test]
fn test_gap_days_use_default_recovery() {
    let (mut ts, clock) = service(100.0, on(1, 10, 0));
    ts.record_behavior("S", 120, 3, None).unwrap();
    let energy = ts.today_snapshot().unwrap().state.current_energy;

    clock.set(on(4, 9, 0));
    let state = ts.today_snapshot().unwrap().state;
    assert!((state.current_energy - (energy + 50.0).min(100.0)).abs() < 1e-9);
}

#[test]
fn test_recording_after_midnight_rolls_first() {
    let (mut ts, clock) = service(100.0, on(1, 23, 30));
    ts.record_behavior("A", 20, 3, None).unwrap();
    clock.advance(Duration::minutes(45));
    let result = ts.record_behavior("A", 20, 3, None).unwrap();

    // the new day starts with an empty combo window
    assert_eq!(result.combo.positive_count, 0);
    let snapshot = ts.today_snapshot().unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.state.today_behavior_count, 1);
    assert_eq!(ts.historical_series(7).unwrap().len(), 1);
}

#[test]
fn test_series_is_ascending_and_limited() {
    let (mut ts, clock) = service(100.0, on(1, 10, 0));
    for day in 1..=5 {
        clock.set(on(day, 10, 0));
        ts.record_behavior("B", 30, 3, None).unwrap();
    }
    clock.set(on(6, 10, 0));
    let series = ts.historical_series(3).unwrap();
    let dates: Vec<_> = series.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![on(3, 0, 0).date(), on(4, 0, 0).date(), on(5, 0, 0).date()]
    );
}

#[test]
fn test_clock_stepping_back_keeps_the_active_day() {
    let (mut ts, clock) = service(100.0, on(2, 9, 0));
    ts.record_behavior("A", 30, 3, None).unwrap();

    clock.set(on(1, 23, 0));
    let behind = ts.record_behavior("B", 30, 3, None).unwrap();
    let snapshot = ts.today_snapshot().unwrap();
    assert_eq!(snapshot.date, on(2, 0, 0).date());
    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.records.iter().all(|r| r.day == on(2, 0, 0).date()));

    clock.set(on(2, 10, 0));
    assert_eq!(ts.roll_over().unwrap(), RolloverOutcome::Unchanged);
    let snapshot = ts.today_snapshot().unwrap();
    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.state.today_behavior_count, 2);
    assert!((snapshot.state.current_energy - behind.energy_after).abs() < 1e-9);
    assert!(ts.historical_series(7).unwrap().is_empty());
}
