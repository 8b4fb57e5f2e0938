//! Energy ledger: idle recovery, clamping, the energy coefficient and
//! per-record energy cost.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::catalog::Level;
use crate::storage::config::Config;

/// Energy consumed by one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCost {
    /// Positive when energy is consumed, negative when restored.
    pub cost: f64,
    /// `-cost`, the signed change applied to the balance.
    pub delta: f64,
}

/// Pure energy arithmetic over a [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct EnergyLedger<'c> {
    config: &'c Config,
}

impl<'c> EnergyLedger<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    pub fn energy_max(&self) -> f64 {
        self.config.tunables.energy_max
    }

    /// Energy regained while idle since the last record.
    ///
    /// Nothing is regained within the idle threshold. Past it, a passive
    /// per-minute rate applies; past the hourly threshold an hourly rate
    /// tiered by the hour of `now` is added on top.
    pub fn compute_recovery(&self, last_record_at: Option<NaiveDateTime>, now: NaiveDateTime) -> f64 {
        let Some(last) = last_record_at else {
            return 0.0;
        };
        let recovery = &self.config.recovery;
        let idle_minutes = (now - last).num_seconds() as f64 / 60.0;
        if idle_minutes <= recovery.idle_threshold_minutes {
            return 0.0;
        }

        let mut delta = idle_minutes * recovery.passive_rate_per_minute;
        if idle_minutes > recovery.hourly_threshold_minutes {
            delta += idle_minutes / 60.0 * self.hourly_rate(now.hour());
        }
        delta
    }

    fn hourly_rate(&self, hour: u32) -> f64 {
        let recovery = &self.config.recovery;
        recovery
            .hourly_bands
            .iter()
            .find(|band| band.contains(hour))
            .map_or(recovery.default_hourly_rate, |band| band.value)
    }

    /// Apply a signed delta, clamping into `[0, energy_max]`.
    pub fn apply_delta(&self, current: f64, delta: f64) -> f64 {
        let next = current + delta;
        if next.is_nan() {
            return 0.0;
        }
        next.clamp(0.0, self.energy_max())
    }

    /// At or below the zero threshold every score is forced to zero.
    pub fn is_depleted(&self, energy: f64) -> bool {
        energy <= self.config.tunables.energy_zero_threshold
    }

    /// Score multiplier for the current energy level.
    pub fn coefficient(&self, energy: f64, level: Level) -> f64 {
        let t = &self.config.tunables;
        let coefficient = if energy > 70.0 {
            1.0 + (energy - 70.0) * 0.01
        } else if energy > 40.0 {
            0.85 + (energy - 40.0) * 0.005
        } else {
            0.7
        };
        if energy < t.energy_low_threshold && level.is_positive() {
            coefficient.min(t.low_energy_positive_coeff)
        } else {
            coefficient
        }
    }

    /// Energy spent by a record.
    pub fn cost(
        &self,
        level: Level,
        energy_cost_per_minute: f64,
        duration_minutes: i64,
        energy: f64,
    ) -> EnergyCost {
        let t = &self.config.tunables;
        let start_factor = if duration_minutes <= t.start_bonus_duration {
            t.start_bonus_energy
        } else {
            1.0
        };

        let mut cost = energy_cost_per_minute * duration_minutes as f64 * start_factor;
        if cost < 0.0 && energy < t.energy_low_threshold {
            cost *= t.low_energy_recovery_bonus;
        }
        if level == Level::B && cost > 0.0 {
            cost *= 1.0 - t.level_b_rebate;
        }
        EnergyCost { cost, delta: -cost }
    }
}
