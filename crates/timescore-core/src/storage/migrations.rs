//! Database schema migrations for timescore.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Stored schema version, 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: catalog, append-only records, singleton state, history,
/// configuration overrides.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS behavior_definitions (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            name                   TEXT NOT NULL UNIQUE,
            level                  TEXT NOT NULL,
            category               TEXT NOT NULL DEFAULT 'uncategorized',
            base_score_per_minute  REAL NOT NULL,
            energy_cost_per_minute REAL NOT NULL,
            created_at             TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS behavior_records (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            name                TEXT NOT NULL,
            level               TEXT NOT NULL,
            duration_minutes    INTEGER NOT NULL CHECK (duration_minutes > 0),
            mood                INTEGER NOT NULL CHECK (mood BETWEEN 1 AND 5),
            context             TEXT,
            started_at          TEXT NOT NULL,
            ended_at            TEXT NOT NULL,
            day                 TEXT NOT NULL,
            base_score          REAL NOT NULL,
            dynamic_coefficient REAL NOT NULL,
            final_score         REAL NOT NULL,
            energy_delta        REAL NOT NULL,
            inferred_sublevel   TEXT,
            fingerprint         TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_records_started_at ON behavior_records(started_at);
        CREATE INDEX IF NOT EXISTS idx_records_level ON behavior_records(level);
        CREATE INDEX IF NOT EXISTS idx_records_day_name ON behavior_records(day, name);

        CREATE TRIGGER IF NOT EXISTS behavior_records_no_update
        BEFORE UPDATE ON behavior_records
        BEGIN
            SELECT RAISE(ABORT, 'behavior records are append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS behavior_records_no_delete
        BEFORE DELETE ON behavior_records
        BEGIN
            SELECT RAISE(ABORT, 'behavior records are append-only');
        END;

        CREATE TABLE IF NOT EXISTS user_state (
            id                   INTEGER PRIMARY KEY CHECK (id = 1),
            current_energy       REAL NOT NULL CHECK (current_energy >= 0),
            combo_count          INTEGER NOT NULL DEFAULT 0,
            today_total_score    REAL NOT NULL DEFAULT 0,
            today_behavior_count INTEGER NOT NULL DEFAULT 0,
            today_energy_cost    REAL NOT NULL DEFAULT 0,
            last_record_at       TEXT,
            last_active_date     TEXT,
            consecutive_unlucky  INTEGER NOT NULL DEFAULT 0,
            lucky_triggers_today INTEGER NOT NULL DEFAULT 0,
            efficient_periods    TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS daily_history (
            date              TEXT PRIMARY KEY,
            total_score       REAL NOT NULL,
            total_energy_cost REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config_overrides (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
    "})?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: wish exchange and achievement events.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS wishes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            cost        INTEGER NOT NULL CHECK (cost > 0),
            status      TEXT NOT NULL DEFAULT 'pending',
            created_at  TEXT NOT NULL,
            redeemed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_wishes_status ON wishes(status);

        CREATE TABLE IF NOT EXISTS achievements (
            kind              TEXT PRIMARY KEY,
            first_unlocked_at TEXT NOT NULL,
            last_unlocked_at  TEXT NOT NULL,
            count             INTEGER NOT NULL DEFAULT 1
        );
    "})?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
