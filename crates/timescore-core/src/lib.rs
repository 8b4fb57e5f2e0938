//! # TimeScore Core Library
//!
//! Scores how a user spends their time. Each recorded behavior has an
//! intensity level and a duration; the engine turns it into a score scaled
//! by the current energy balance, the recent streak and a handful of
//! optional coefficients, and updates a bounded energy economy.
//! The `timescore` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Catalog**: named behavior templates with per-minute rates
//! - **Scoring**: a fixed pipeline of coefficients, bonuses and decay
//! - **Energy**: idle recovery, per-record cost and clamping
//! - **Rollover**: the daily boundary, archiving and overnight recovery
//! - **Storage**: SQLite records and state, TOML configuration
//!
//! ## Key Components
//!
//! - [`TimeScore`]: the facade every caller goes through
//! - [`Store`]: transactional persistence
//! - [`Config`]: typed engine configuration
//! - [`ScoringEngine`]: the pure scoring pipeline

pub mod achievements;
pub mod catalog;
pub mod clock;
pub mod combo;
pub mod energy;
pub mod error;
pub mod luck;
pub mod record;
pub mod rollover;
pub mod scoring;
pub mod service;
pub mod state;
pub mod storage;
pub mod wishes;

pub use achievements::{AchievementEvent, AchievementKind};
pub use catalog::{BehaviorDefinition, Level, NewBehavior, RecoveryTier};
pub use clock::{Clock, FixedClock, SystemClock};
pub use combo::{ComboBreakdown, ComboTracker};
pub use energy::{EnergyCost, EnergyLedger};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use luck::{LuckSource, LuckyRoll, ScriptedLuck, SeededLuck};
pub use record::{BehaviorRecord, DailyTotal};
pub use rollover::{DailyRolloverManager, RolloverOutcome};
pub use scoring::{ScoreBreakdown, ScoreInput, ScoredRecord, ScoringEngine};
pub use service::{ScoreResult, TimeScore, TodaySnapshot};
pub use state::UserState;
pub use storage::{Config, Session, Store};
pub use wishes::{Wish, WishProgress, WishStatus, WishSuggestion};
