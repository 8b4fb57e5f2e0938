//! Randomness for the lucky coefficient.
//!
//! Rolls come from a [`LuckSource`] so that tests can script outcomes.
//! The hit rate decays with every behavior recorded today, and a pity
//! counter guarantees a hit after enough consecutive misses.

use std::collections::VecDeque;

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::storage::config::Tunables;

/// A stream of uniform samples in `[0, 1)`.
pub trait LuckSource: Send {
    fn sample(&mut self) -> f64;
}

/// PCG-backed source. Seeded for reproducible runs, entropy otherwise.
#[derive(Debug, Clone)]
pub struct SeededLuck {
    rng: Mcg128Xsl64,
}

impl SeededLuck {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { rng }
    }
}

impl LuckSource for SeededLuck {
    fn sample(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence; once exhausted every sample misses.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLuck {
    samples: VecDeque<f64>,
}

impl ScriptedLuck {
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl LuckSource for ScriptedLuck {
    fn sample(&mut self) -> f64 {
        self.samples.pop_front().unwrap_or(1.0)
    }
}

/// Outcome of one lucky roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LuckyRoll {
    pub coefficient: f64,
    pub hit: bool,
    pub super_hit: bool,
    /// The roll was forced by the pity counter.
    pub pity: bool,
    pub consecutive_unlucky: u32,
    pub lucky_triggers_today: u32,
}

/// Hit probability after `today_count` behaviors today.
pub fn luck_rate(tunables: &Tunables, today_count: u32) -> f64 {
    tunables.base_luck_rate * tunables.fatigue_factor.powi(today_count.min(i32::MAX as u32) as i32)
}

/// Roll the lucky coefficient and advance the persisted counters.
pub fn roll(
    tunables: &Tunables,
    today_count: u32,
    consecutive_unlucky: u32,
    lucky_triggers_today: u32,
    source: &mut dyn LuckSource,
) -> LuckyRoll {
    let pity = consecutive_unlucky >= tunables.pity_threshold;
    let hit = pity || source.sample() < luck_rate(tunables, today_count);

    if !hit {
        return LuckyRoll {
            coefficient: 1.0,
            hit: false,
            super_hit: false,
            pity: false,
            consecutive_unlucky: consecutive_unlucky.saturating_add(1),
            lucky_triggers_today,
        };
    }

    let super_hit = source.sample() < tunables.super_luck_rate;
    let coefficient = if super_hit {
        tunables.super_lucky_coefficient
    } else {
        tunables.lucky_coefficient
    };
    tracing::debug!(coefficient, pity, "lucky roll hit");
    LuckyRoll {
        coefficient,
        hit,
        super_hit,
        pity,
        consecutive_unlucky: 0,
        lucky_triggers_today: lucky_triggers_today.saturating_add(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_decays_with_activity() {
        let t = Tunables::default();
        assert!((luck_rate(&t, 0) - 0.15).abs() < 1e-12);
        assert!((luck_rate(&t, 2) - 0.15 * 0.95 * 0.95).abs() < 1e-12);
    }

    #[test]
    fn miss_increments_pity_counter() {
        let t = Tunables::default();
        let mut luck = ScriptedLuck::new([0.9]);
        let r = roll(&t, 0, 1, 0, &mut luck);
        assert!(!r.hit);
        assert_eq!(r.coefficient, 1.0);
        assert_eq!(r.consecutive_unlucky, 2);
    }

    #[test]
    fn hit_and_super_hit() {
        let t = Tunables::default();
        let normal = roll(&t, 0, 0, 0, &mut ScriptedLuck::new([0.01, 0.5]));
        assert!(normal.hit && !normal.super_hit);
        assert_eq!(normal.coefficient, 1.5);
        assert_eq!(normal.lucky_triggers_today, 1);

        let lucky = roll(&t, 0, 0, 1, &mut ScriptedLuck::new([0.01, 0.01]));
        assert!(lucky.super_hit);
        assert_eq!(lucky.coefficient, 2.0);
        assert_eq!(lucky.lucky_triggers_today, 2);
    }

    #[test]
    fn pity_forces_a_hit() {
        let t = Tunables::default();
        let r = roll(&t, 10, 3, 0, &mut ScriptedLuck::new([0.99, 0.99]));
        assert!(r.hit && r.pity);
        assert_eq!(r.consecutive_unlucky, 0);
    }

    #[test]
    fn seeded_source_is_deterministic() {
        let mut a = SeededLuck::new(Some(42));
        let mut b = SeededLuck::new(Some(42));
        for _ in 0..8 {
            let x = a.sample();
            assert_eq!(x, b.sample());
            assert!((0.0..1.0).contains(&x));
        }
    }
}
