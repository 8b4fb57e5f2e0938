//! Behavior catalog: named templates a user records against.
//!
//! Definitions are created once through [`NewBehavior`] and are never
//! mutated or deleted. Persistence lives in [`crate::storage::Store`].

mod level;

pub use level::{Level, RecoveryTier};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::config::LevelTable;

pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// A registered behavior template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDefinition {
    pub name: String,
    pub level: Level,
    pub category: String,
    pub base_score_per_minute: f64,
    pub energy_cost_per_minute: f64,
    pub created_at: NaiveDateTime,
}

/// Input for adding a behavior. Rates left as `None` are taken from the
/// level table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBehavior {
    pub name: String,
    pub level: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub base_score_per_minute: Option<f64>,
    #[serde(default)]
    pub energy_cost_per_minute: Option<f64>,
}

impl NewBehavior {
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: level.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_rates(mut self, base_score_per_minute: f64, energy_cost_per_minute: f64) -> Self {
        self.base_score_per_minute = Some(base_score_per_minute);
        self.energy_cost_per_minute = Some(energy_cost_per_minute);
        self
    }

    /// Validate and fill defaults, producing the definition to persist.
    pub fn into_definition(
        self,
        levels: &LevelTable,
        created_at: NaiveDateTime,
    ) -> Result<BehaviorDefinition, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let level: Level = self.level.parse()?;
        let rates = levels.rates_for(level);

        let base_score_per_minute = self.base_score_per_minute.unwrap_or(rates.base_score_per_minute);
        let energy_cost_per_minute = self
            .energy_cost_per_minute
            .unwrap_or(rates.energy_cost_per_minute);
        for (field, value) in [
            ("base_score_per_minute", base_score_per_minute),
            ("energy_cost_per_minute", energy_cost_per_minute),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: format!("{value} is not a finite number"),
                });
            }
        }

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(BehaviorDefinition {
            name,
            level,
            category,
            base_score_per_minute,
            energy_cost_per_minute,
            created_at,
        })
    }
}
