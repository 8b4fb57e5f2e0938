use serde::{Deserialize, Serialize};

/// One multiplicative factor applied while scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub value: f64,
}

/// Ordered record of every factor the pipeline applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub factors: Vec<ScoreFactor>,
}

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.factors.push(ScoreFactor {
            name: name.into(),
            value,
        });
    }

    /// Value of the first factor called `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.factors.iter().find(|f| f.name == name).map(|f| f.value)
    }

    /// Product of every factor, `final_score / base` for a scored record.
    ///
    /// This is wider than the dynamic coefficient: it also carries the
    /// bonuses and decays, and the `zero_energy` override when present.
    pub fn product(&self) -> f64 {
        self.factors.iter().map(|f| f.value).product()
    }

    /// Factors that moved the score away from neutral.
    pub fn active(&self) -> impl Iterator<Item = &ScoreFactor> {
        self.factors.iter().filter(|f| (f.value - 1.0).abs() > f64::EPSILON)
    }
}
