//! Recovery tier inference for behaviors recorded as bare `R`.
//!
//! Precedence is mood, then duration, then context: the duration tier
//! replaces the mood tier, and a preceding S/A record bumps the result one
//! tier (R3 stays R3).

use crate::catalog::{Level, RecoveryTier};

fn mood_tier(mood: u8) -> RecoveryTier {
    match mood {
        0..=2 => RecoveryTier::R1,
        3 => RecoveryTier::R2,
        _ => RecoveryTier::R3,
    }
}

fn duration_tier(duration_minutes: i64) -> Option<RecoveryTier> {
    match duration_minutes {
        i64::MIN..=0 => None,
        1..=14 => Some(RecoveryTier::R1),
        15..=30 => Some(RecoveryTier::R2),
        _ => Some(RecoveryTier::R3),
    }
}

pub fn infer_sublevel(mood: u8, duration_minutes: i64, previous: Option<Level>) -> RecoveryTier {
    let tier = duration_tier(duration_minutes).unwrap_or_else(|| mood_tier(mood));
    match previous {
        Some(level) if level.is_high_intensity() => tier.bumped(),
        _ => tier,
    }
}
