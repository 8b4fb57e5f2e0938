use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::ScoreBreakdown;
use crate::catalog::Level;
use crate::combo::{ComboBreakdown, ComboTracker};
use crate::energy::{EnergyCost, EnergyLedger};
use crate::storage::config::Config;

/// Everything the pipeline needs to score one behavior.
#[derive(Debug, Clone)]
pub struct ScoreInput<'a> {
    /// Resolved level; bare `R` has already been given a tier.
    pub level: Level,
    pub base_score_per_minute: f64,
    pub energy_cost_per_minute: f64,
    pub duration_minutes: i64,
    pub mood: u8,
    /// Energy at scoring time, idle recovery included.
    pub energy: f64,
    /// Today's most recent levels, oldest first.
    pub window: &'a [Level],
    /// Times this behavior name was already recorded today.
    pub occurrences_today: u32,
    pub last_record_at: Option<NaiveDateTime>,
    pub first_record_at: Option<NaiveDateTime>,
    pub now: NaiveDateTime,
    /// Lucky coefficient, when rolled.
    pub lucky: Option<f64>,
}

/// Pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub base: f64,
    pub dynamic_coefficient: f64,
    pub final_score: f64,
    pub energy: EnergyCost,
    pub energy_after: f64,
    pub combo: ComboBreakdown,
    pub breakdown: ScoreBreakdown,
}

/// The scoring pipeline.
///
/// 1. `base = rate × duration`
/// 2. `dynamic = energy × combo`, then time-of-day, mood and lucky, each
///    only when its feature flag is on
/// 3. start bonus for short sessions
/// 4. novice bonus during the beginner period
/// 5. `final = base × dynamic × start × novice`
/// 6. anti-abuse decay: repeats, rapid-fire records, recovery grinding
///
/// A depleted balance forces the final score to zero. The breakdown keeps
/// every factor plus `zero_energy`, so `base × breakdown.product()` is
/// always the final score.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'c> {
    config: &'c Config,
}

impl<'c> ScoringEngine<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    pub fn score(&self, input: &ScoreInput<'_>) -> ScoredRecord {
        let t = &self.config.tunables;
        let features = &self.config.features;
        let ledger = EnergyLedger::new(self.config);
        let mut breakdown = ScoreBreakdown::new();

        let base = input.base_score_per_minute * input.duration_minutes as f64;

        let energy_coeff = ledger.coefficient(input.energy, input.level);
        let combo = ComboTracker::new(t).evaluate(input.window, input.level);
        breakdown.push("energy", energy_coeff);
        breakdown.push("combo", combo.coefficient);
        let mut dynamic = energy_coeff * combo.coefficient;

        if features.time_of_day {
            let (label, value) = self.config.time_band(input.now.hour());
            breakdown.push(format!("time_of_day:{label}"), value);
            dynamic *= value;
        }
        if features.mood {
            let value = self.config.mood_coefficient(input.mood);
            breakdown.push("mood", value);
            dynamic *= value;
        }
        if features.lucky {
            if let Some(value) = input.lucky {
                breakdown.push("lucky", value);
                dynamic *= value;
            }
        }

        let start_bonus = if input.duration_minutes <= t.start_bonus_duration {
            t.start_bonus_score
        } else {
            1.0
        };
        breakdown.push("start_bonus", start_bonus);

        let novice_bonus = if self.is_beginner(input.first_record_at, input.now) {
            t.novice_bonus
        } else {
            1.0
        };
        breakdown.push("novice_bonus", novice_bonus);

        let mut final_score = base * dynamic * start_bonus * novice_bonus;

        let repeat = if input.occurrences_today >= t.repeat_threshold {
            t.repeat_decay
        } else {
            1.0
        };
        let rapid = match input.last_record_at {
            Some(last) if (input.now - last).num_seconds() < t.rapid_interval_minutes * 60 => {
                t.rapid_decay
            }
            _ => 1.0,
        };
        let recovery_in_window = input.window.iter().filter(|l| l.is_recovery()).count();
        let grind = if input.level.is_recovery() && recovery_in_window >= t.recovery_grind_threshold {
            t.recovery_grind_decay
        } else {
            1.0
        };
        breakdown.push("repeat_decay", repeat);
        breakdown.push("rapid_decay", rapid);
        breakdown.push("recovery_grind_decay", grind);
        final_score *= repeat * rapid * grind;

        if ledger.is_depleted(input.energy) {
            breakdown.push("zero_energy", 0.0);
            dynamic = 0.0;
            final_score = 0.0;
        }

        let energy = ledger.cost(
            input.level,
            input.energy_cost_per_minute,
            input.duration_minutes,
            input.energy,
        );
        let energy_after = ledger.apply_delta(input.energy, energy.delta);

        tracing::debug!(
            behavior_level = %input.level,
            base,
            dynamic,
            final_score,
            energy_delta = energy.delta,
            "scored behavior"
        );

        ScoredRecord {
            base,
            dynamic_coefficient: dynamic,
            final_score,
            energy,
            energy_after,
            combo,
            breakdown,
        }
    }

    /// Within the beginner period of the first-ever record. No records at
    /// all also counts.
    pub fn is_beginner(&self, first_record_at: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        match first_record_at {
            None => true,
            Some(first) => (now - first).num_days() < self.config.tunables.beginner_period_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RecoveryTier;
    use chrono::{Duration, NaiveDate};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn input(window: &[Level]) -> ScoreInput<'_> {
        ScoreInput {
            level: Level::A,
            base_score_per_minute: 1.2,
            energy_cost_per_minute: 0.25,
            duration_minutes: 10,
            mood: 3,
            energy: 80.0,
            window,
            occurrences_today: 0,
            last_record_at: None,
            first_record_at: None,
            now: at(10, 0),
            lucky: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn beginner_scenario() {
        let cfg = Config::default();
        let scored = ScoringEngine::new(&cfg).score(&input(&[]));
        assert!(approx(scored.base, 12.0));
        assert!(approx(scored.dynamic_coefficient, 1.1));
        assert!(approx(scored.final_score, 15.84));
        assert!(approx(scored.energy.delta, -2.5));
        assert!(approx(scored.energy_after, 77.5));
    }

    #[test]
    fn depleted_energy_scores_zero_but_still_costs() {
        let cfg = Config::default();
        let mut inp = input(&[]);
        inp.energy = 0.0;
        let scored = ScoringEngine::new(&cfg).score(&inp);
        assert_eq!(scored.final_score, 0.0);
        assert_eq!(scored.breakdown.get("zero_energy"), Some(0.0));
        assert_eq!(scored.energy_after, 0.0);
    }

    #[test]
    fn breakdown_product_is_final_over_base() {
        let cfg = Config::default();
        let window = [Level::A, Level::A];
        for energy in [80.0, 0.0] {
            let mut inp = input(&window);
            inp.energy = energy;
            inp.occurrences_today = 3;
            let scored = ScoringEngine::new(&cfg).score(&inp);
            assert!(approx(scored.base * scored.breakdown.product(), scored.final_score));
        }
    }

    #[test]
    fn optional_coefficients_only_when_enabled() {
        let mut cfg = Config::default();
        let mut inp = input(&[]);
        inp.mood = 5;
        inp.lucky = Some(1.5);
        inp.now = at(12, 0);

        let off = ScoringEngine::new(&cfg).score(&inp);
        assert!(off.breakdown.get("mood").is_none());
        assert!(off.breakdown.get("lucky").is_none());

        cfg.features.time_of_day = true;
        cfg.features.mood = true;
        cfg.features.lucky = true;
        let on = ScoringEngine::new(&cfg).score(&inp);
        assert_eq!(on.breakdown.get("time_of_day:standard"), Some(1.0));
        assert!(approx(on.dynamic_coefficient, 1.1 * 1.0 * 1.4 * 1.5));

        let names: Vec<_> = on.breakdown.factors.iter().map(|f| f.name.as_str()).collect();
        let pos = |n: &str| names.iter().position(|x| x.starts_with(n)).unwrap();
        assert!(pos("time_of_day") < pos("mood"));
        assert!(pos("mood") < pos("lucky"));
    }

    #[test]
    fn start_bonus_and_veteran() {
        let cfg = Config::default();
        let mut inp = input(&[]);
        inp.duration_minutes = 5;
        inp.first_record_at = Some(at(10, 0) - Duration::days(30));
        let scored = ScoringEngine::new(&cfg).score(&inp);
        assert!(approx(scored.final_score, 1.2 * 5.0 * 1.1 * 1.2));
        assert_eq!(scored.breakdown.get("novice_bonus"), Some(1.0));
    }

    #[test]
    fn decay_factors_stack() {
        let cfg = Config::default();
        let r2 = Level::R(Some(RecoveryTier::R2));
        let window = [r2, r2];
        let mut inp = input(&window);
        inp.level = r2;
        inp.base_score_per_minute = 0.3;
        inp.energy_cost_per_minute = -0.35;
        inp.duration_minutes = 20;
        inp.occurrences_today = 3;
        inp.last_record_at = Some(at(9, 55));
        let scored = ScoringEngine::new(&cfg).score(&inp);
        let undecayed = 0.3 * 20.0 * 1.1 * 1.0 * 1.2;
        assert!(approx(scored.final_score, undecayed * 0.8 * 0.7 * 0.8));
        assert!(scored.energy.delta > 0.0);
    }

    #[test]
    fn beginner_period_boundary() {
        let cfg = Config::default();
        let engine = ScoringEngine::new(&cfg);
        let now = at(10, 0);
        assert!(engine.is_beginner(Some(now - Duration::days(6)), now));
        assert!(!engine.is_beginner(Some(now - Duration::days(7)), now));
    }
}
