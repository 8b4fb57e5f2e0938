//! Integration tests for persistence: file-backed stores, atomicity,
//! concurrent readers and configuration overrides.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use timescore_core::{
    BehaviorRecord, Config, CoreError, FixedClock, Level, ScriptedLuck, Store, TimeScore,
};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn build(store: Arc<Store>, clock: &FixedClock) -> TimeScore {
    TimeScore::with_parts(
        Config::default(),
        store,
        Box::new(clock.clone()),
        Box::new(ScriptedLuck::default()),
    )
    .unwrap()
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timescore.db");
    let clock = FixedClock::new(at(10, 0));

    let recorded = {
        let mut ts = build(Arc::new(Store::open_at(&path, 100.0).unwrap()), &clock);
        ts.record_behavior("A", 25, 3, Some("report")).unwrap()
    };

    let ts = build(Arc::new(Store::open_at(&path, 100.0).unwrap()), &clock);
    let snapshot = ts.today_snapshot().unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].id, recorded.record_id);
    assert!((snapshot.state.current_energy - recorded.energy_after).abs() < 1e-9);
}

#[test]
fn test_failed_record_insert_rolls_back_state() {
    let store = Store::open_memory(100.0).unwrap();
    let now = at(10, 0);
    let result = store.write(|s| {
        let mut state = s.user_state()?;
        state.current_energy = 12.0;
        state.today_behavior_count += 1;
        s.save_user_state(&state)?;
        s.append_record(BehaviorRecord {
            id: 0,
            name: "broken".into(),
            level: Level::A,
            duration_minutes: -5,
            mood: 3,
            context: None,
            started_at: now,
            ended_at: now,
            day: now.date(),
            base_score: 0.0,
            dynamic_coefficient: 1.0,
            final_score: 0.0,
            energy_delta: 0.0,
            inferred_sublevel: None,
            fingerprint: None,
        })?;
        Ok(())
    });
    assert!(matches!(result, Err(CoreError::Database(_))));

    let state = store.read(|s| s.user_state()).unwrap();
    assert_eq!(state.current_energy, 100.0);
    assert_eq!(state.today_behavior_count, 0);
    assert!(store.read(|s| s.records_on(now.date())).unwrap().is_empty());
}

#[test]
fn test_concurrent_reader_sees_consistent_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open_at(&dir.path().join("t.db"), 100.0).unwrap());
    let clock = FixedClock::new(at(8, 0));
    let mut ts = build(Arc::clone(&store), &clock);
    ts.roll_over().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        let day = at(0, 0).date();
        thread::spawn(move || {
            let mut checks = 0;
            while !done.load(Ordering::Acquire) || checks == 0 {
                let (state, records) = store
                    .read(|s| Ok((s.user_state()?, s.records_on(day)?)))
                    .unwrap();
                assert_eq!(state.today_behavior_count as usize, records.len());
                let sum: f64 = records.iter().map(|r| r.final_score).sum();
                assert!((state.today_total_score - sum).abs() < 1e-6);
                assert!((0.0..=100.0).contains(&state.current_energy));
                checks += 1;
            }
            checks
        })
    };

    for _ in 0..40 {
        ts.record_behavior("B", 15, 3, None).unwrap();
        clock.advance(Duration::minutes(15));
    }
    done.store(true, Ordering::Release);
    let checks = reader.join().unwrap();
    assert!(checks > 0);

    let snapshot = ts.today_snapshot().unwrap();
    assert_eq!(snapshot.records.len(), 40);
}

#[test]
fn test_config_override_persists_across_construction() {
    let store = Arc::new(Store::open_memory(100.0).unwrap());
    let clock = FixedClock::new(at(10, 0));

    let mut ts = build(Arc::clone(&store), &clock);
    ts.set_config_override("features.mood", "true").unwrap();
    ts.set_config_override("tunables.novice_bonus", "1.5").unwrap();
    assert!(ts.config().features.mood);

    let err = ts.set_config_override("tunables.energy_max", "-1").unwrap_err();
    assert!(matches!(err, CoreError::Config(_)));
    assert!(ts.set_config_override("tunables.nope", "1").is_err());

    let rebuilt = build(Arc::clone(&store), &clock);
    assert!(rebuilt.config().features.mood);
    assert_eq!(rebuilt.config().tunables.novice_bonus, 1.5);
    assert_eq!(rebuilt.config().tunables.energy_max, 100.0);
    assert_eq!(rebuilt.config_overrides().unwrap().len(), 2);
}

#[test]
fn test_invalid_stored_override_is_skipped() {
    let store = Arc::new(Store::open_memory(100.0).unwrap());
    store
        .write(|s| {
            s.set_override("tunables.energy_max", "not a number")?;
            s.set_override("features.time_of_day", "true")
        })
        .unwrap();
    let ts = build(store, &FixedClock::new(at(10, 0)));
    assert_eq!(ts.config().tunables.energy_max, 100.0);
    assert!(ts.config().features.time_of_day);
}

#[test]
fn test_malformed_config_document_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[tunables\nenergy_max = ").unwrap();
    assert_eq!(Config::load_or_default(&path), Config::default());

    std::fs::write(&path, "[tunables]\nenergy_max = -3.0\n").unwrap();
    assert_eq!(Config::load_or_default(&path), Config::default());
}
