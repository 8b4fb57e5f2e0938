//! Daily boundary transition.
//!
//! The first write or read of a new day archives the previous day's totals,
//! restores overnight energy and clears the per-day counters. It runs
//! inside the caller's write session, so it is atomic with whatever that
//! session does next, and a second run on the same day is a no-op.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::energy::EnergyLedger;
use crate::error::Result;
use crate::record::DailyTotal;
use crate::storage::config::Config;
use crate::storage::Session;

/// What a rollover run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RolloverOutcome {
    /// Already on the current day.
    Unchanged,
    /// Fresh store stamped with its first active date.
    Initialized { date: NaiveDate },
    /// Moved from one active day to another.
    Rolled {
        from: NaiveDate,
        to: NaiveDate,
        archived: Option<DailyTotal>,
        energy_before: f64,
        energy_after: f64,
    },
}

pub struct DailyRolloverManager<'c> {
    config: &'c Config,
}

impl<'c> DailyRolloverManager<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Roll the stored state forward to `today` if needed.
    pub fn run(&self, session: &Session<'_>, today: NaiveDate) -> Result<RolloverOutcome> {
        let mut state = session.user_state()?;

        let previous = match state.last_active_date {
            None => {
                state.last_active_date = Some(today);
                session.save_user_state(&state)?;
                tracing::info!(%today, "initialized active date");
                return Ok(RolloverOutcome::Initialized { date: today });
            }
            Some(previous) if previous == today => return Ok(RolloverOutcome::Unchanged),
            Some(previous) if previous > today => {
                tracing::warn!(%previous, %today, "clock is behind the last active date, skipping rollover");
                return Ok(RolloverOutcome::Unchanged);
            }
            Some(previous) => previous,
        };

        let archived = if state.today_total_score != 0.0 || state.today_energy_cost != 0.0 {
            let total = DailyTotal {
                date: previous,
                total_score: state.today_total_score,
                total_energy_cost: state.today_energy_cost,
            };
            session.append_history(&total)?;
            Some(total)
        } else {
            None
        };

        let t = &self.config.tunables;
        let recorded_yesterday = match (state.last_record_at, today.pred_opt()) {
            (Some(last), Some(yesterday)) => last.date() == yesterday,
            _ => false,
        };
        let sleep_recovery = if recorded_yesterday {
            t.sleep_recovery_after_record
        } else {
            t.sleep_recovery_default
        };

        let energy_before = state.current_energy;
        let energy_after = EnergyLedger::new(self.config).apply_delta(energy_before, sleep_recovery);
        state.current_energy = energy_after;
        state.reset_day();
        state.last_active_date = Some(today);
        session.save_user_state(&state)?;

        tracing::info!(
            from = %previous,
            to = %today,
            archived = archived.is_some(),
            energy_before,
            energy_after,
            "daily rollover"
        );
        Ok(RolloverOutcome::Rolled {
            from: previous,
            to: today,
            archived,
            energy_before,
            energy_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn seed_day(store: &Store, active: NaiveDate, last_record_day: NaiveDate, energy: f64) {
        store
            .write(|s| {
                let mut state = s.user_state()?;
                state.current_energy = energy;
                state.today_total_score = 42.0;
                state.today_energy_cost = 12.5;
                state.today_behavior_count = 4;
                state.combo_count = 2;
                state.lucky_triggers_today = 1;
                state.last_record_at = last_record_day.and_hms_opt(22, 0, 0);
                state.last_active_date = Some(active);
                s.save_user_state(&state)
            })
            .unwrap();
    }

    #[test]
    fn fresh_store_is_stamped_without_recovery() {
        let cfg = Config::default();
        let store = Store::open_memory(60.0).unwrap();
        let outcome = store
            .write(|s| DailyRolloverManager::new(&cfg).run(s, day(1)))
            .unwrap();
        assert_eq!(outcome, RolloverOutcome::Initialized { date: day(1) });
        let state = store.read(|s| s.user_state()).unwrap();
        assert_eq!(state.current_energy, 60.0);
        assert_eq!(state.last_active_date, Some(day(1)));
        assert!(store.read(|s| s.history(10)).unwrap().is_empty());
    }

    #[test]
    fn rolls_after_recording_yesterday() {
        let cfg = Config::default();
        let store = Store::open_memory(100.0).unwrap();
        seed_day(&store, day(1), day(1), 30.0);

        let outcome = store
            .write(|s| DailyRolloverManager::new(&cfg).run(s, day(2)))
            .unwrap();
        assert!(matches!(outcome, RolloverOutcome::Rolled { energy_after, .. } if energy_after == 86.0));

        let state = store.read(|s| s.user_state()).unwrap();
        assert_eq!(state.today_total_score, 0.0);
        assert_eq!(state.today_behavior_count, 0);
        assert_eq!(state.combo_count, 0);
        assert_eq!(state.lucky_triggers_today, 0);
        assert_eq!(state.last_active_date, Some(day(2)));

        let history = store.read(|s| s.history(10)).unwrap();
        assert_eq!(
            history,
            vec![DailyTotal {
                date: day(1),
                total_score: 42.0,
                total_energy_cost: 12.5
            }]
        );
    }

    #[test]
    fn default_sleep_recovery_after_a_gap() {
        let cfg = Config::default();
        let store = Store::open_memory(100.0).unwrap();
        seed_day(&store, day(1), day(1), 30.0);
        store
            .write(|s| DailyRolloverManager::new(&cfg).run(s, day(5)))
            .unwrap();
        let state = store.read(|s| s.user_state()).unwrap();
        assert_eq!(state.current_energy, 80.0);
    }

    #[test]
    fn recovery_is_capped_at_max() {
        let cfg = Config::default();
        let store = Store::open_memory(100.0).unwrap();
        seed_day(&store, day(1), day(1), 90.0);
        store
            .write(|s| DailyRolloverManager::new(&cfg).run(s, day(2)))
            .unwrap();
        assert_eq!(store.read(|s| s.user_state()).unwrap().current_energy, 100.0);
    }

    #[test]
    fn second_run_same_day_is_a_noop() {
        let cfg = Config::default();
        let store = Store::open_memory(100.0).unwrap();
        seed_day(&store, day(1), day(1), 30.0);
        let manager = DailyRolloverManager::new(&cfg);
        store.write(|s| manager.run(s, day(2))).unwrap();
        let after_first = store.read(|s| s.user_state()).unwrap();

        let outcome = store.write(|s| manager.run(s, day(2))).unwrap();
        assert_eq!(outcome, RolloverOutcome::Unchanged);
        assert_eq!(store.read(|s| s.user_state()).unwrap(), after_first);
        assert_eq!(store.read(|s| s.history(10)).unwrap().len(), 1);
    }

    #[test]
    fn idle_day_is_not_archived() {
        let cfg = Config::default();
        let store = Store::open_memory(100.0).unwrap();
        store
            .write(|s| {
                let mut state = s.user_state()?;
                state.current_energy = 20.0;
                state.last_active_date = Some(day(1));
                s.save_user_state(&state)
            })
            .unwrap();
        let outcome = store
            .write(|s| DailyRolloverManager::new(&cfg).run(s, day(2)))
            .unwrap();
        assert!(matches!(outcome, RolloverOutcome::Rolled { archived: None, .. }));
        assert!(store.read(|s| s.history(10)).unwrap().is_empty());
    }
}
