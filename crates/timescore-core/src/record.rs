//! Behavior records and archived daily totals.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::catalog::{Level, RecoveryTier};

/// An immutable, persisted behavior fact.
///
/// Records are append-only: the schema rejects updates and deletes, so a
/// correction is a new compensating record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    /// Row id; `0` until the record is appended.
    pub id: i64,
    /// Definition name, or the level code when recorded by level.
    pub name: String,
    pub level: Level,
    pub duration_minutes: i64,
    pub mood: u8,
    pub context: Option<String>,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    /// Local calendar day the record belongs to.
    pub day: NaiveDate,
    pub base_score: f64,
    pub dynamic_coefficient: f64,
    pub final_score: f64,
    /// Signed change to the energy balance (negative = consumption).
    pub energy_delta: f64,
    pub inferred_sublevel: Option<RecoveryTier>,
    /// Debug fingerprint over (level, duration, final score).
    pub fingerprint: Option<String>,
}

/// One archived day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total_score: f64,
    pub total_energy_cost: f64,
}
