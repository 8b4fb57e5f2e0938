//! Combo tracking over the day's most recent records.
//!
//! The coefficient is a pure function of the window contents and the level
//! being recorded:
//!
//! | positives in window | base |
//! |---------------------|------|
//! | 0                   | 1.0  |
//! | 1                   | 1.1  |
//! | 2                   | 1.2  |
//! | 3                   | 1.3  |
//!
//! A positive level directly after a C/D record earns the rebound bonus.
//! When every positive in the window matches the current level the
//! same-field bonus applies as well.

use serde::{Deserialize, Serialize};

use crate::catalog::Level;
use crate::storage::config::Tunables;

/// Number of records the combo window holds.
pub const COMBO_WINDOW: usize = 3;

const COMBO_STEP: f64 = 0.1;

/// Result of evaluating the combo window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboBreakdown {
    pub coefficient: f64,
    pub positive_count: u32,
    pub rebound: bool,
    pub same_field: bool,
}

/// Combo coefficient calculator.
#[derive(Debug, Clone, Copy)]
pub struct ComboTracker {
    max_bonus: f64,
    rebound_bonus: f64,
    same_field_bonus: f64,
}

impl ComboTracker {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            max_bonus: tunables.max_combo_bonus,
            rebound_bonus: tunables.rebound_bonus,
            same_field_bonus: tunables.same_field_bonus,
        }
    }

    /// Evaluate `window` (oldest first, at most [`COMBO_WINDOW`] levels)
    /// for a record at `current`.
    pub fn evaluate(&self, window: &[Level], current: Level) -> ComboBreakdown {
        let window = Self::clip(window);
        let positives: Vec<Level> = window.iter().copied().filter(Level::is_positive).collect();
        let positive_count = positives.len() as u32;

        let mut coefficient = (1.0 + COMBO_STEP * f64::from(positive_count)).min(self.max_bonus);

        let rebound = current.is_positive()
            && window.last().is_some_and(|prev| prev.is_negative());
        if rebound {
            coefficient *= self.rebound_bonus;
        }

        let same_field = positive_count >= 1 && positives.iter().all(|level| *level == current);
        if same_field {
            coefficient *= self.same_field_bonus;
        }

        ComboBreakdown {
            coefficient,
            positive_count,
            rebound,
            same_field,
        }
    }

    /// Combo count persisted after recording `current`: positives in the
    /// window that results from appending it.
    pub fn count_after(window: &[Level], current: Level) -> u32 {
        let mut next: Vec<Level> = Self::clip(window).to_vec();
        next.push(current);
        let start = next.len().saturating_sub(COMBO_WINDOW);
        next[start..].iter().filter(|level| level.is_positive()).count() as u32
    }

    fn clip(window: &[Level]) -> &[Level] {
        &window[window.len().saturating_sub(COMBO_WINDOW)..]
    }
}
