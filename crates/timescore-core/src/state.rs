//! The singleton user-state row.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Running state mutated after every record and at daily rollover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    /// Always within `[0, energy_max]`.
    pub current_energy: f64,
    pub combo_count: u32,
    pub today_total_score: f64,
    pub today_behavior_count: u32,
    pub today_energy_cost: f64,
    pub last_record_at: Option<NaiveDateTime>,
    pub last_active_date: Option<NaiveDate>,
    pub consecutive_unlucky: u32,
    pub lucky_triggers_today: u32,
    /// Time-band labels in which productive work has been recorded.
    pub efficient_periods: BTreeSet<String>,
}

impl UserState {
    pub fn new(initial_energy: f64) -> Self {
        Self {
            current_energy: initial_energy,
            combo_count: 0,
            today_total_score: 0.0,
            today_behavior_count: 0,
            today_energy_cost: 0.0,
            last_record_at: None,
            last_active_date: None,
            consecutive_unlucky: 0,
            lucky_triggers_today: 0,
            efficient_periods: BTreeSet::new(),
        }
    }

    /// Clear the per-day counters.
    pub fn reset_day(&mut self) {
        self.combo_count = 0;
        self.today_total_score = 0.0;
        self.today_behavior_count = 0;
        self.today_energy_cost = 0.0;
        self.consecutive_unlucky = 0;
        self.lucky_triggers_today = 0;
    }
}
