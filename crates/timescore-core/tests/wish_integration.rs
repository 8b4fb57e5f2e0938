//! Integration tests for the wish exchange.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use timescore_core::{
    AchievementKind, Config, CoreError, FixedClock, ScriptedLuck, Store, TimeScore, WishStatus,
};

fn on(day: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn service() -> (TimeScore, FixedClock) {
    let clock = FixedClock::new(on(1, 10));
    let store = Arc::new(Store::open_memory(100.0).unwrap());
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
fn test_redeem_spends_score() {
    let (mut ts, _) = service();
    // 1.8 * 60 * 1.3 (full energy) * 1.2 (novice)
    let earned = ts.record_behavior("S", 60, 3, None).unwrap().final_score;
    assert!((earned - 168.48).abs() < 1e-6);

    let cheap = ts.add_wish("  movie night ", 100).unwrap();
    let pricey = ts.add_wish("new bike", 500).unwrap();
    assert_eq!(cheap.name, "movie night");

    let pending = ts.pending_wishes().unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending[0].affordable);
    assert!(!pending[1].affordable);
    assert!((pending[1].progress - earned / 500.0).abs() < 1e-9);

    let redeemed = ts.redeem_wish(cheap.id).unwrap();
    assert_eq!(redeemed.status, WishStatus::Redeemed);
    assert_eq!(redeemed.redeemed_at, Some(on(1, 10)));
    assert!((ts.spendable_score().unwrap() - (earned - 100.0)).abs() < 1e-6);
    assert!((ts.total_score().unwrap() - earned).abs() < 1e-6);

    let err = ts.redeem_wish(pricey.id).unwrap_err();
    assert!(matches!(err, CoreError::InsufficientScore { needed: 500, .. }));

    let err = ts.redeem_wish(cheap.id).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(matches!(ts.redeem_wish(999).unwrap_err(), CoreError::NotFound { .. }));

    let achievements = ts.achievements().unwrap();
    assert!(achievements
        .iter()
        .any(|a| a.kind == AchievementKind::WishRedeemed && a.count == 1));
    assert_eq!(ts.redeemed_wishes().unwrap().len(), 1);
}

#[test]
fn test_wish_validation() {
    let (ts, _) = service();
    assert!(matches!(ts.add_wish("", 200), Err(CoreError::Validation(_))));
    assert!(matches!(ts.add_wish("cake", 99), Err(CoreError::Validation(_))));
    assert!(matches!(
        ts.add_wish(&"w".repeat(51), 200),
        Err(CoreError::Validation(_))
    ));
    assert!(ts.pending_wishes().unwrap().is_empty());
}

#[test]
fn test_suggested_cost_uses_history() {
    let (mut ts, clock) = service();
    assert!(ts.suggested_wish_cost().unwrap().is_none());

    ts.record_behavior("A", 30, 3, None).unwrap();
    let day_one = ts.today_snapshot().unwrap().state.today_total_score;
    clock.set(on(2, 10));
    ts.roll_over().unwrap();

    let suggestion = ts.suggested_wish_cost().unwrap().unwrap();
    assert!((suggestion.average_daily_score - day_one).abs() < 1e-9);
    assert_eq!(suggestion.suggested_cost, (day_one * 30.0) as i64);
}
