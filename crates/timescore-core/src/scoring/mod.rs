//! Scoring pipeline.
//!
//! [`ScoringEngine`] turns one behavior into a final score and an energy
//! change. It is a pure function of its [`ScoreInput`]; the service gathers
//! the window, counters and lucky roll from the store before calling it.

mod breakdown;
mod engine;
mod sublevel;

pub use breakdown::{ScoreBreakdown, ScoreFactor};
pub use engine::{ScoreInput, ScoredRecord, ScoringEngine};
pub use sublevel::infer_sublevel;

use sha2::{Digest, Sha256};

use crate::catalog::Level;

const FINGERPRINT_BYTES: usize = 8;

/// Debug fingerprint over a record's level, duration and final score.
pub fn fingerprint(level: Level, duration_minutes: i64, final_score: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{level}_{duration_minutes}_{final_score}").as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..FINGERPRINT_BYTES])
}
