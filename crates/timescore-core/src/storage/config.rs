//! TOML-based engine configuration.
//!
//! Holds everything the scoring engine treats as a tunable:
//! - Per-level base score and energy cost per minute
//! - Mood coefficients
//! - Global tunables (energy bounds, bonus magnitudes, decay factors, luck)
//! - Idle recovery rates and time-of-day bands
//! - Feature flags for the optional coefficients
//!
//! The document lives at `~/.config/timescore/config.toml`. A missing or
//! malformed document never stops the engine: [`Config::load_or_default`]
//! logs once and returns the built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::catalog::{Level, RecoveryTier};
use crate::error::ConfigError;

/// Per-minute rates for one level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelRates {
    pub base_score_per_minute: f64,
    pub energy_cost_per_minute: f64,
}

impl LevelRates {
    const fn new(base_score_per_minute: f64, energy_cost_per_minute: f64) -> Self {
        Self {
            base_score_per_minute,
            energy_cost_per_minute,
        }
    }
}

/// Level table keyed by level code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    #[serde(rename = "S", default = "default_s")]
    pub s: LevelRates,
    #[serde(rename = "A", default = "default_a")]
    pub a: LevelRates,
    #[serde(rename = "B", default = "default_b")]
    pub b: LevelRates,
    #[serde(rename = "C", default = "default_c")]
    pub c: LevelRates,
    #[serde(rename = "D", default = "default_d")]
    pub d: LevelRates,
    #[serde(rename = "R1", default = "default_r1")]
    pub r1: LevelRates,
    #[serde(rename = "R2", default = "default_r2")]
    pub r2: LevelRates,
    #[serde(rename = "R3", default = "default_r3")]
    pub r3: LevelRates,
}

impl LevelTable {
    /// Rates for a level. Bare `R` uses the middle tier.
    pub fn rates_for(&self, level: Level) -> LevelRates {
        match level {
            Level::S => self.s,
            Level::A => self.a,
            Level::B => self.b,
            Level::C => self.c,
            Level::D => self.d,
            Level::R(Some(RecoveryTier::R1)) => self.r1,
            Level::R(Some(RecoveryTier::R2)) | Level::R(None) => self.r2,
            Level::R(Some(RecoveryTier::R3)) => self.r3,
        }
    }

    fn entries(&self) -> [(&'static str, LevelRates); 8] {
        [
            ("S", self.s),
            ("A", self.a),
            ("B", self.b),
            ("C", self.c),
            ("D", self.d),
            ("R1", self.r1),
            ("R2", self.r2),
            ("R3", self.r3),
        ]
    }
}

/// An hour-of-day band. Ranges are half-open `[start, end)` in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourBand {
    pub label: String,
    pub ranges: Vec<[u32; 2]>,
    pub value: f64,
}

impl HourBand {
    fn new(label: &str, ranges: &[[u32; 2]], value: f64) -> Self {
        Self {
            label: label.to_string(),
            ranges: ranges.to_vec(),
            value,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.ranges.iter().any(|[start, end]| *start <= hour && hour < *end)
    }
}

/// Idle-time energy recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_minutes: f64,
    #[serde(default = "default_passive_rate")]
    pub passive_rate_per_minute: f64,
    #[serde(default = "default_hourly_threshold")]
    pub hourly_threshold_minutes: f64,
    #[serde(default = "default_hourly_bands")]
    pub hourly_bands: Vec<HourBand>,
    #[serde(default = "default_hourly_rate")]
    pub default_hourly_rate: f64,
}

/// Global engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub energy_max: f64,
    pub initial_energy: f64,
    pub energy_zero_threshold: f64,
    pub energy_low_threshold: f64,
    pub low_energy_positive_coeff: f64,
    pub low_energy_recovery_bonus: f64,

    pub max_combo_bonus: f64,
    pub rebound_bonus: f64,
    pub same_field_bonus: f64,

    pub start_bonus_duration: i64,
    pub start_bonus_score: f64,
    pub start_bonus_energy: f64,
    pub beginner_period_days: i64,
    pub novice_bonus: f64,
    pub level_b_rebate: f64,

    pub repeat_threshold: u32,
    pub repeat_decay: f64,
    pub rapid_interval_minutes: i64,
    pub rapid_decay: f64,
    pub recovery_grind_threshold: usize,
    pub recovery_grind_decay: f64,

    pub sleep_recovery_after_record: f64,
    pub sleep_recovery_default: f64,

    pub base_luck_rate: f64,
    pub fatigue_factor: f64,
    pub pity_threshold: u32,
    pub super_luck_rate: f64,
    pub lucky_coefficient: f64,
    pub super_lucky_coefficient: f64,

    pub min_wish_cost: i64,
    pub max_wish_name_chars: usize,
    pub wish_suggestion_days: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            energy_max: 100.0,
            initial_energy: 100.0,
            energy_zero_threshold: 0.0,
            energy_low_threshold: 30.0,
            low_energy_positive_coeff: 0.6,
            low_energy_recovery_bonus: 1.2,

            max_combo_bonus: 1.3,
            rebound_bonus: 1.1,
            same_field_bonus: 1.15,

            start_bonus_duration: 5,
            start_bonus_score: 1.2,
            start_bonus_energy: 0.8,
            beginner_period_days: 7,
            novice_bonus: 1.2,
            level_b_rebate: 0.3,

            repeat_threshold: 3,
            repeat_decay: 0.8,
            rapid_interval_minutes: 10,
            rapid_decay: 0.7,
            recovery_grind_threshold: 2,
            recovery_grind_decay: 0.8,

            sleep_recovery_after_record: 56.0,
            sleep_recovery_default: 50.0,

            base_luck_rate: 0.15,
            fatigue_factor: 0.95,
            pity_threshold: 3,
            super_luck_rate: 0.05,
            lucky_coefficient: 1.5,
            super_lucky_coefficient: 2.0,

            min_wish_cost: 100,
            max_wish_name_chars: 50,
            wish_suggestion_days: 30.0,
        }
    }
}

/// Enable flags for the optional dynamic coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub time_of_day: bool,
    #[serde(default)]
    pub mood: bool,
    #[serde(default)]
    pub lucky: bool,
    #[serde(default = "default_true")]
    pub record_fingerprint: bool,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/timescore/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub levels: LevelTable,
    #[serde(default = "default_mood")]
    pub mood: BTreeMap<String, f64>,
    #[serde(default)]
    pub tunables: Tunables,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default = "default_time_bands")]
    pub time_bands: Vec<HourBand>,
    #[serde(default)]
    pub features: Features,
}

// Default functions
fn default_s() -> LevelRates {
    LevelRates::new(1.8, 0.35)
}
fn default_a() -> LevelRates {
    LevelRates::new(1.2, 0.25)
}
fn default_b() -> LevelRates {
    LevelRates::new(0.7, 0.18)
}
fn default_c() -> LevelRates {
    LevelRates::new(-0.5, 0.10)
}
fn default_d() -> LevelRates {
    LevelRates::new(-1.0, 0.15)
}
fn default_r1() -> LevelRates {
    LevelRates::new(0.2, -0.2)
}
fn default_r2() -> LevelRates {
    LevelRates::new(0.3, -0.35)
}
fn default_r3() -> LevelRates {
    LevelRates::new(0.4, -0.5)
}
fn default_mood() -> BTreeMap<String, f64> {
    [("1", 0.7), ("2", 0.85), ("3", 1.0), ("4", 1.2), ("5", 1.4)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
fn default_idle_threshold() -> f64 {
    30.0
}
fn default_passive_rate() -> f64 {
    0.02
}
fn default_hourly_threshold() -> f64 {
    60.0
}
fn default_hourly_bands() -> Vec<HourBand> {
    vec![
        HourBand::new("peak", &[[6, 12], [14, 18]], 2.0),
        HourBand::new("shoulder", &[[12, 14], [18, 22]], 1.5),
    ]
}
fn default_hourly_rate() -> f64 {
    1.0
}
fn default_time_bands() -> Vec<HourBand> {
    vec![
        HourBand::new("golden", &[[9, 11], [15, 17]], 1.3),
        HourBand::new("silver", &[[8, 9], [14, 15], [19, 21]], 1.1),
        HourBand::new("fatigue", &[[13, 14], [22, 24]], 0.8),
        HourBand::new("rest", &[[0, 6]], 0.5),
    ]
}
fn default_true() -> bool {
    true
}

pub const STANDARD_BAND: &str = "standard";

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            s: default_s(),
            a: default_a(),
            b: default_b(),
            c: default_c(),
            d: default_d(),
            r1: default_r1(),
            r2: default_r2(),
            r3: default_r3(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            idle_threshold_minutes: default_idle_threshold(),
            passive_rate_per_minute: default_passive_rate(),
            hourly_threshold_minutes: default_hourly_threshold(),
            hourly_bands: default_hourly_bands(),
            default_hourly_rate: default_hourly_rate(),
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self {
            time_of_day: false,
            mood: false,
            lucky: false,
            record_fingerprint: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            levels: LevelTable::default(),
            mood: default_mood(),
            tunables: Tunables::default(),
            recovery: RecoveryConfig::default(),
            time_bands: default_time_bands(),
            features: Features::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default document location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Parse and validate a document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path`, falling back to built-in defaults on any error.
    ///
    /// A missing document is normal on first run and only logged at debug
    /// level; a present but broken one is reported with a single warning.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config document, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Load the document at the default location, never failing.
    pub fn load() -> Self {
        match Self::path() {
            Ok(path) => Self::load_or_default(&path),
            Err(e) => {
                tracing::warn!(error = %e, "config directory unavailable, using defaults");
                Self::default()
            }
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The result must still
    /// validate; on error `self` is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Apply stored key-value overrides in order. Invalid entries are
    /// logged and skipped.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut applied = 0;
        for (key, value) in overrides {
            match self.set(key, value) {
                Ok(()) => applied += 1,
                Err(e) => tracing::warn!(key, error = %e, "skipping config override"),
            }
        }
        applied
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let t = &self.tunables;

        if !(t.energy_max.is_finite() && t.energy_max > 0.0) {
            return Err(invalid("tunables.energy_max", "must be > 0".into()));
        }
        for (key, value) in [
            ("tunables.initial_energy", t.initial_energy),
            ("tunables.energy_zero_threshold", t.energy_zero_threshold),
            ("tunables.energy_low_threshold", t.energy_low_threshold),
        ] {
            if !(0.0..=t.energy_max).contains(&value) {
                return Err(invalid(key, format!("{value} outside [0, {}]", t.energy_max)));
            }
        }
        for (key, value) in [
            ("tunables.low_energy_positive_coeff", t.low_energy_positive_coeff),
            ("tunables.low_energy_recovery_bonus", t.low_energy_recovery_bonus),
            ("tunables.max_combo_bonus", t.max_combo_bonus),
            ("tunables.rebound_bonus", t.rebound_bonus),
            ("tunables.same_field_bonus", t.same_field_bonus),
            ("tunables.start_bonus_score", t.start_bonus_score),
            ("tunables.start_bonus_energy", t.start_bonus_energy),
            ("tunables.novice_bonus", t.novice_bonus),
            ("tunables.repeat_decay", t.repeat_decay),
            ("tunables.rapid_decay", t.rapid_decay),
            ("tunables.recovery_grind_decay", t.recovery_grind_decay),
            ("tunables.sleep_recovery_after_record", t.sleep_recovery_after_record),
            ("tunables.sleep_recovery_default", t.sleep_recovery_default),
            ("tunables.lucky_coefficient", t.lucky_coefficient),
            ("tunables.super_lucky_coefficient", t.super_lucky_coefficient),
            ("recovery.passive_rate_per_minute", self.recovery.passive_rate_per_minute),
            ("recovery.default_hourly_rate", self.recovery.default_hourly_rate),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(key, format!("{value} must be a non-negative number")));
            }
        }
        for (key, value) in [
            ("tunables.level_b_rebate", t.level_b_rebate),
            ("tunables.base_luck_rate", t.base_luck_rate),
            ("tunables.fatigue_factor", t.fatigue_factor),
            ("tunables.super_luck_rate", t.super_luck_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, format!("{value} outside [0, 1]")));
            }
        }
        if t.start_bonus_duration < 0 || t.beginner_period_days < 0 || t.rapid_interval_minutes < 0 {
            return Err(invalid("tunables", "durations must not be negative".into()));
        }

        for (code, rates) in self.levels.entries() {
            if !(rates.base_score_per_minute.is_finite() && rates.energy_cost_per_minute.is_finite()) {
                return Err(invalid(&format!("levels.{code}"), "rates must be finite".into()));
            }
        }

        for (key, coefficient) in &self.mood {
            let in_range = key.parse::<u8>().map(|m| (1..=5).contains(&m)).unwrap_or(false);
            if !in_range {
                return Err(invalid(&format!("mood.{key}"), "mood keys must be 1-5".into()));
            }
            if !(coefficient.is_finite() && *coefficient > 0.0) {
                return Err(invalid(&format!("mood.{key}"), "coefficient must be > 0".into()));
            }
        }

        for (section, bands) in [
            ("time_bands", &self.time_bands),
            ("recovery.hourly_bands", &self.recovery.hourly_bands),
        ] {
            for band in bands {
                if !(band.value.is_finite() && band.value >= 0.0) {
                    return Err(invalid(section, format!("band '{}' has a negative value", band.label)));
                }
                if band.ranges.iter().any(|[start, end]| start >= end || *end > 24) {
                    return Err(invalid(section, format!("band '{}' has an invalid hour range", band.label)));
                }
            }
        }
        Ok(())
    }

    /// Mood coefficient; unknown moods are neutral.
    pub fn mood_coefficient(&self, mood: u8) -> f64 {
        self.mood.get(&mood.to_string()).copied().unwrap_or(1.0)
    }

    /// Time-of-day band for an hour: `(label, coefficient)`.
    pub fn time_band(&self, hour: u32) -> (&str, f64) {
        self.time_bands
            .iter()
            .find(|band| band.contains(hour))
            .map(|band| (band.label.as_str(), band.value))
            .unwrap_or((STANDARD_BAND, 1.0))
    }
}
