//! Behavior intensity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Concrete recovery tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecoveryTier {
    R1,
    R2,
    R3,
}

impl RecoveryTier {
    /// Next tier up; R3 is the ceiling.
    pub fn bumped(self) -> Self {
        match self {
            RecoveryTier::R1 => RecoveryTier::R2,
            RecoveryTier::R2 | RecoveryTier::R3 => RecoveryTier::R3,
        }
    }
}

/// Intensity tier of a behavior.
///
/// `R(None)` is the bare recovery level; the scoring engine infers a
/// concrete tier for it at record time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    S,
    A,
    B,
    C,
    D,
    R(Option<RecoveryTier>),
}

impl Level {
    pub const ALL_CODES: [&'static str; 9] = ["S", "A", "B", "C", "D", "R", "R1", "R2", "R3"];

    pub fn code(&self) -> &'static str {
        match self {
            Level::S => "S",
            Level::A => "A",
            Level::B => "B",
            Level::C => "C",
            Level::D => "D",
            Level::R(None) => "R",
            Level::R(Some(RecoveryTier::R1)) => "R1",
            Level::R(Some(RecoveryTier::R2)) => "R2",
            Level::R(Some(RecoveryTier::R3)) => "R3",
        }
    }

    /// S, A and B count toward streaks.
    pub fn is_positive(&self) -> bool {
        matches!(self, Level::S | Level::A | Level::B)
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Level::C | Level::D)
    }

    pub fn is_recovery(&self) -> bool {
        matches!(self, Level::R(_))
    }

    /// S and A are high-drain levels that upgrade a following recovery.
    pub fn is_high_intensity(&self) -> bool {
        matches!(self, Level::S | Level::A)
    }

    pub fn is_bare_recovery(&self) -> bool {
        matches!(self, Level::R(None))
    }

    pub fn recovery_tier(&self) -> Option<RecoveryTier> {
        match self {
            Level::R(tier) => *tier,
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Level::S),
            "A" => Ok(Level::A),
            "B" => Ok(Level::B),
            "C" => Ok(Level::C),
            "D" => Ok(Level::D),
            "R" => Ok(Level::R(None)),
            "R1" => Ok(Level::R(Some(RecoveryTier::R1))),
            "R2" => Ok(Level::R(Some(RecoveryTier::R2))),
            "R3" => Ok(Level::R(Some(RecoveryTier::R3))),
            _ => Err(ValidationError::InvalidLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.code().to_string()
    }
}
