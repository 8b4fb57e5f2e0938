//! The `TimeScore` facade.
//!
//! Owns the configuration, the store, a clock and a luck source, and
//! exposes every user-facing operation. Each mutating operation is one
//! write session; reads roll the day over first so they never report a
//! stale day.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementEvent, AchievementKind};
use crate::catalog::{BehaviorDefinition, Level, NewBehavior, RecoveryTier};
use crate::clock::{Clock, SystemClock};
use crate::combo::{ComboBreakdown, ComboTracker, COMBO_WINDOW};
use crate::energy::EnergyLedger;
use crate::error::{ConfigError, CoreError, Result, ValidationError};
use crate::luck::{self, LuckSource, LuckyRoll, SeededLuck};
use crate::record::{BehaviorRecord, DailyTotal};
use crate::rollover::{DailyRolloverManager, RolloverOutcome};
use crate::scoring::{fingerprint, infer_sublevel, ScoreBreakdown, ScoreInput, ScoringEngine};
use crate::state::UserState;
use crate::storage::config::LevelRates;
use crate::storage::{Config, Session, Store};
use crate::wishes::{validate_wish, Wish, WishProgress, WishStatus, WishSuggestion};

/// Result of recording one behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub record_id: i64,
    pub name: String,
    pub level: Level,
    pub base: f64,
    pub dynamic_coefficient: f64,
    pub final_score: f64,
    pub energy_delta: f64,
    pub energy_after: f64,
    /// Idle recovery credited before scoring.
    pub recovered_energy: f64,
    pub inferred_sublevel: Option<RecoveryTier>,
    pub combo: ComboBreakdown,
    pub lucky: Option<LuckyRoll>,
    pub fingerprint: Option<String>,
    pub unlocked: Vec<AchievementKind>,
    pub breakdown: ScoreBreakdown,
}

/// Today's state together with today's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodaySnapshot {
    pub date: NaiveDate,
    pub state: UserState,
    pub records: Vec<BehaviorRecord>,
}

enum Target {
    Definition(BehaviorDefinition),
    Level(Level),
}

impl Target {
    fn resolve(session: &Session<'_>, key: &str) -> Result<Self> {
        let key = key.trim();
        if let Some(def) = session.definition(key)? {
            return Ok(Target::Definition(def));
        }
        key.parse::<Level>().map(Target::Level).map_err(|_| CoreError::NotFound {
            kind: "behavior",
            id: key.to_string(),
        })
    }

    fn level(&self) -> Level {
        match self {
            Target::Definition(def) => def.level,
            Target::Level(level) => *level,
        }
    }

    fn name(&self) -> String {
        match self {
            Target::Definition(def) => def.name.clone(),
            Target::Level(level) => level.code().to_string(),
        }
    }

    /// Rates for the resolved level. Definitions carry their own; bare
    /// level records use the level table.
    fn rates(&self, config: &Config, resolved: Level) -> LevelRates {
        match self {
            Target::Definition(def) => LevelRates {
                base_score_per_minute: def.base_score_per_minute,
                energy_cost_per_minute: def.energy_cost_per_minute,
            },
            Target::Level(_) => config.levels.rates_for(resolved),
        }
    }
}

fn validate_record_input(duration_minutes: i64, mood: i64) -> Result<u8, ValidationError> {
    if duration_minutes <= 0 {
        return Err(ValidationError::InvalidDuration(duration_minutes));
    }
    match u8::try_from(mood) {
        Ok(m @ 1..=5) => Ok(m),
        _ => Err(ValidationError::InvalidMood(mood)),
    }
}

/// Start of a record that ends at `now`. Durations reaching past the
/// representable calendar are rejected.
fn started_at(now: NaiveDateTime, duration_minutes: i64) -> Result<NaiveDateTime, ValidationError> {
    Duration::try_minutes(duration_minutes)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or(ValidationError::InvalidDuration(duration_minutes))
}

pub struct TimeScore {
    config: Config,
    store: Arc<Store>,
    clock: Box<dyn Clock>,
    luck: Box<dyn LuckSource>,
}

impl TimeScore {
    /// Open the default store with the system clock and entropy-seeded luck.
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::open(config.tunables.initial_energy)?;
        Self::with_parts(
            config,
            Arc::new(store),
            Box::new(SystemClock),
            Box::new(SeededLuck::new(None)),
        )
    }

    /// Assemble from explicit parts. Stored overrides are applied on top
    /// of `config`.
    pub fn with_parts(
        mut config: Config,
        store: Arc<Store>,
        clock: Box<dyn Clock>,
        luck: Box<dyn LuckSource>,
    ) -> Result<Self> {
        let overrides = store.read(|s| s.overrides())?;
        let applied = config.apply_overrides(overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if applied > 0 {
            tracing::debug!(applied, "applied stored config overrides");
        }
        Ok(Self {
            config,
            store,
            clock,
            luck,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle for readers on other threads.
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Validate and persist a configuration override.
    pub fn set_config_override(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.config.clone();
        updated.set(key, value)?;
        self.store.write(|s| s.set_override(key, value))?;
        self.config = updated;
        Ok(())
    }

    /// Drop a stored override. Takes effect on the next construction.
    pub fn clear_config_override(&self, key: &str) -> Result<()> {
        if self.store.write(|s| s.remove_override(key))? {
            Ok(())
        } else {
            Err(ConfigError::UnknownKey(key.to_string()).into())
        }
    }

    pub fn config_overrides(&self) -> Result<Vec<(String, String)>> {
        self.store.read(|s| s.overrides())
    }

    // === Day boundary ===

    /// Roll the stored day forward to the clock's date if needed.
    pub fn roll_over(&self) -> Result<RolloverOutcome> {
        let today = self.clock.today();
        let manager = DailyRolloverManager::new(&self.config);
        self.store.write(|s| manager.run(s, today))
    }

    // === Catalog ===

    pub fn add_behavior(&self, new: NewBehavior) -> Result<BehaviorDefinition> {
        let def = new.into_definition(&self.config.levels, self.clock.now())?;
        self.store.write(|s| s.insert_definition(&def))?;
        tracing::info!(name = %def.name, level = %def.level, "added behavior");
        Ok(def)
    }

    /// Definitions at `level`; bare `R` matches every recovery tier.
    pub fn lookup_behaviors_by_level(&self, level: &str) -> Result<Vec<BehaviorDefinition>> {
        let level: Level = level.parse()?;
        self.store.read(|s| s.definitions_by_level(level))
    }

    pub fn behaviors(&self) -> Result<Vec<BehaviorDefinition>> {
        self.store.read(|s| s.definitions())
    }

    // === Recording ===

    /// Score and persist one behavior.
    ///
    /// `key` is matched against definition names first, then level codes.
    /// The record, the state update and any achievements commit together.
    pub fn record_behavior(
        &mut self,
        key: &str,
        duration_minutes: i64,
        mood: i64,
        context: Option<&str>,
    ) -> Result<ScoreResult> {
        let mood = validate_record_input(duration_minutes, mood)?;
        let now = self.clock.now();
        let started_at = started_at(now, duration_minutes)?;
        let today = now.date();

        let Self {
            config,
            store,
            luck,
            ..
        } = self;
        let config: &Config = config;
        let luck_source: &mut dyn LuckSource = luck.as_mut();

        let result = store.write(|s| {
            DailyRolloverManager::new(config).run(s, today)?;

            let target = Target::resolve(s, key)?;
            let mut state = s.user_state()?;
            // A clock behind the stored day keeps recording into that day.
            let day = state.last_active_date.map_or(today, |active| active.max(today));
            let recent = s.recent_records(day, COMBO_WINDOW)?;
            let window: Vec<Level> = recent.iter().map(|r| r.level).collect();

            let (level, inferred_sublevel) = match target.level() {
                Level::R(None) => {
                    let tier = infer_sublevel(mood, duration_minutes, window.last().copied());
                    (Level::R(Some(tier)), Some(tier))
                }
                level => (level, None),
            };
            let rates = target.rates(config, level);
            let name = target.name();

            let ledger = EnergyLedger::new(config);
            let recovered_energy = ledger.compute_recovery(state.last_record_at, now);
            let energy = ledger.apply_delta(state.current_energy, recovered_energy);

            let first_record_at = s.first_record_at()?;
            let lucky = config.features.lucky.then(|| {
                luck::roll(
                    &config.tunables,
                    state.today_behavior_count,
                    state.consecutive_unlucky,
                    state.lucky_triggers_today,
                    luck_source,
                )
            });

            let scored = ScoringEngine::new(config).score(&ScoreInput {
                level,
                base_score_per_minute: rates.base_score_per_minute,
                energy_cost_per_minute: rates.energy_cost_per_minute,
                duration_minutes,
                mood,
                energy,
                window: &window,
                occurrences_today: s.occurrences_on(&name, day)?,
                last_record_at: state.last_record_at,
                first_record_at,
                now,
                lucky: lucky.map(|roll| roll.coefficient),
            });

            let previous_combo = state.combo_count;
            state.current_energy = scored.energy_after;
            state.combo_count = ComboTracker::count_after(&window, level);
            state.today_total_score += scored.final_score;
            state.today_behavior_count += 1;
            state.today_energy_cost += scored.energy.cost;
            state.last_record_at = Some(now);
            state.last_active_date = Some(day);
            if let Some(roll) = lucky {
                state.consecutive_unlucky = roll.consecutive_unlucky;
                state.lucky_triggers_today = roll.lucky_triggers_today;
            }
            if level.is_positive() && scored.final_score != 0.0 {
                let (band, _) = config.time_band(now.hour());
                state.efficient_periods.insert(band.to_string());
            }
            s.save_user_state(&state)?;

            let fingerprint = config
                .features
                .record_fingerprint
                .then(|| fingerprint(level, duration_minutes, scored.final_score));
            let record = s.append_record(BehaviorRecord {
                id: 0,
                name: name.clone(),
                level,
                duration_minutes,
                mood,
                context: context.map(str::to_string),
                started_at,
                ended_at: now,
                day,
                base_score: scored.base,
                dynamic_coefficient: scored.dynamic_coefficient,
                final_score: scored.final_score,
                energy_delta: scored.energy.delta,
                inferred_sublevel,
                fingerprint: fingerprint.clone(),
            })?;

            let mut unlocked = Vec::new();
            if first_record_at.is_none() {
                unlocked.push(AchievementKind::FirstRecord);
            }
            if state.combo_count as usize >= COMBO_WINDOW && (previous_combo as usize) < COMBO_WINDOW {
                unlocked.push(AchievementKind::FullCombo);
            }
            if let Some(roll) = lucky.filter(|roll| roll.hit) {
                unlocked.push(AchievementKind::LuckyStrike);
                if roll.super_hit {
                    unlocked.push(AchievementKind::SuperLucky);
                }
            }
            for kind in &unlocked {
                s.unlock_achievement(*kind, now)?;
            }

            Ok(ScoreResult {
                record_id: record.id,
                name,
                level,
                base: scored.base,
                dynamic_coefficient: scored.dynamic_coefficient,
                final_score: scored.final_score,
                energy_delta: scored.energy.delta,
                energy_after: scored.energy_after,
                recovered_energy,
                inferred_sublevel,
                combo: scored.combo,
                lucky,
                fingerprint,
                unlocked,
                breakdown: scored.breakdown,
            })
        })?;

        tracing::info!(
            record_id = result.record_id,
            name = %result.name,
            final_score = result.final_score,
            energy_after = result.energy_after,
            "recorded behavior"
        );
        Ok(result)
    }

    // === Reads ===

    pub fn today_snapshot(&self) -> Result<TodaySnapshot> {
        self.roll_over()?;
        let today = self.clock.today();
        self.store.read(|s| {
            let state = s.user_state()?;
            let date = state.last_active_date.map_or(today, |active| active.max(today));
            Ok(TodaySnapshot {
                records: s.records_on(date)?,
                date,
                state,
            })
        })
    }

    /// The most recent `days` archived days, oldest first.
    pub fn historical_series(&self, days: usize) -> Result<Vec<DailyTotal>> {
        self.roll_over()?;
        self.store.read(|s| s.history(days))
    }

    pub fn total_score(&self) -> Result<f64> {
        self.store.read(|s| s.total_score())
    }

    pub fn spendable_score(&self) -> Result<f64> {
        self.store.read(|s| s.spendable_score())
    }

    pub fn achievements(&self) -> Result<Vec<AchievementEvent>> {
        self.store.read(|s| s.achievements())
    }

    // === Wishes ===

    pub fn add_wish(&self, name: &str, cost: i64) -> Result<Wish> {
        let name = validate_wish(name, cost, &self.config.tunables)?;
        let now = self.clock.now();
        let wish = self.store.write(|s| s.insert_wish(&name, cost, now))?;
        tracing::info!(id = wish.id, name = %wish.name, cost, "added wish");
        Ok(wish)
    }

    pub fn pending_wishes(&self) -> Result<Vec<WishProgress>> {
        self.store.read(|s| {
            let spendable = s.spendable_score()?;
            Ok(s.wishes_with_status(WishStatus::Pending)?
                .into_iter()
                .map(|wish| WishProgress::new(wish, spendable))
                .collect())
        })
    }

    pub fn redeemed_wishes(&self) -> Result<Vec<Wish>> {
        self.store.read(|s| s.wishes_with_status(WishStatus::Redeemed))
    }

    pub fn redeem_wish(&self, id: i64) -> Result<Wish> {
        let now = self.clock.now();
        let wish = self.store.write(|s| {
            let wish = s.redeem_wish(id, now)?;
            s.unlock_achievement(AchievementKind::WishRedeemed, now)?;
            Ok(wish)
        })?;
        tracing::info!(id, cost = wish.cost, "redeemed wish");
        Ok(wish)
    }

    pub fn suggested_wish_cost(&self) -> Result<Option<WishSuggestion>> {
        let history = self.store.read(|s| s.history(usize::MAX))?;
        let scores: Vec<f64> = history.iter().map(|d| d.total_score).collect();
        Ok(WishSuggestion::from_daily_scores(
            &scores,
            self.config.tunables.wish_suggestion_days,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_input_validation() {
        assert_eq!(validate_record_input(10, 3), Ok(3));
        assert_eq!(
            validate_record_input(0, 3),
            Err(ValidationError::InvalidDuration(0))
        );
        assert_eq!(
            validate_record_input(10, 6),
            Err(ValidationError::InvalidMood(6))
        );
        assert_eq!(
            validate_record_input(10, -1),
            Err(ValidationError::InvalidMood(-1))
        );
    }

    #[test]
    fn started_at_rejects_out_of_range_durations() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            started_at(now, 30),
            Ok(now - Duration::minutes(30))
        );
        for huge in [1_000_000_000_000, i64::MAX] {
            assert_eq!(
                started_at(now, huge),
                Err(ValidationError::InvalidDuration(huge))
            );
        }
    }
}
