//! Core error types for timescore-core.
//!
//! This module defines the error hierarchy using thiserror. Validation
//! failures are raised before any state is touched; storage failures roll
//! back the whole unit of work; configuration failures never escape the
//! loader (they downgrade to built-in defaults).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timescore-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A behavior with this name is already in the catalog
    #[error("Behavior '{0}' already exists")]
    DuplicateDefinition(String),

    /// Lookup by id or name found nothing
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Not enough spendable score to redeem a wish
    #[error("Insufficient score: need {needed}, have {available:.1}")]
    InsufficientScore { needed: i64, available: f64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A thread panicked while holding a connection
    #[error("Connection lock poisoned")]
    LockPoisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Level code not recognised
    #[error("Invalid level '{0}' (expected S, A, B, C, D, R, R1, R2 or R3)")]
    InvalidLevel(String),

    /// Duration must be strictly positive
    #[error("Invalid duration: {0} minutes (must be > 0)")]
    InvalidDuration(i64),

    /// Mood must be within 1..=5
    #[error("Invalid mood: {0} (must be 1-5)")]
    InvalidMood(i64),

    /// Empty behavior name
    #[error("Behavior name must not be empty")]
    EmptyName,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DatabaseError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DatabaseError::LockPoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
