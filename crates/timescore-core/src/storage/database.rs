//! SQLite-backed store for the catalog, behavior records and user state.
//!
//! All access goes through a [`Session`] handed out by [`Store::write`] or
//! [`Store::read`]. A write session is one `BEGIN IMMEDIATE` transaction:
//! it commits when the closure returns `Ok` and rolls back otherwise, so a
//! record and its paired state update land together or not at all.
//!
//! File-backed stores keep a second, query-only connection for readers.
//! With WAL journaling a reader sees the last committed snapshot and never
//! waits on the writer for longer than one short transaction.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::data_dir;
use super::migrations;
use crate::catalog::{BehaviorDefinition, Level, RecoveryTier};
use crate::error::{CoreError, DatabaseError, Result};
use crate::record::{BehaviorRecord, DailyTotal};
use crate::state::UserState;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_FORMAT: &str = "%Y-%m-%d";

// === Helper Functions ===

pub(crate) fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

pub(crate) fn ts_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{raw}': {e}")))
}

pub(crate) fn opt_ts_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => ts_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn day_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DAY_FORMAT)
        .map_err(|e| conversion_error(idx, format!("bad date '{raw}': {e}")))
}

fn opt_day_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => day_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn level_column(row: &Row, idx: usize) -> rusqlite::Result<Level> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: crate::error::ValidationError| conversion_error(idx, e.to_string()))
}

fn tier_code(tier: RecoveryTier) -> &'static str {
    Level::R(Some(tier)).code()
}

fn tier_column(row: &Row, idx: usize) -> rusqlite::Result<Option<RecoveryTier>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => Ok(level_column(row, idx)?.recovery_tier()),
        None => Ok(None),
    }
}

const DEFINITION_COLUMNS: &str =
    "name, level, category, base_score_per_minute, energy_cost_per_minute, created_at";

fn row_to_definition(row: &Row) -> rusqlite::Result<BehaviorDefinition> {
    Ok(BehaviorDefinition {
        name: row.get(0)?,
        level: level_column(row, 1)?,
        category: row.get(2)?,
        base_score_per_minute: row.get(3)?,
        energy_cost_per_minute: row.get(4)?,
        created_at: ts_column(row, 5)?,
    })
}

const RECORD_COLUMNS: &str = "id, name, level, duration_minutes, mood, context, started_at, \
     ended_at, day, base_score, dynamic_coefficient, final_score, energy_delta, \
     inferred_sublevel, fingerprint";

fn row_to_record(row: &Row) -> rusqlite::Result<BehaviorRecord> {
    Ok(BehaviorRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        level: level_column(row, 2)?,
        duration_minutes: row.get(3)?,
        mood: row.get(4)?,
        context: row.get(5)?,
        started_at: ts_column(row, 6)?,
        ended_at: ts_column(row, 7)?,
        day: day_column(row, 8)?,
        base_score: row.get(9)?,
        dynamic_coefficient: row.get(10)?,
        final_score: row.get(11)?,
        energy_delta: row.get(12)?,
        inferred_sublevel: tier_column(row, 13)?,
        fingerprint: row.get(14)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// SQLite store.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store at `~/.config/timescore/timescore.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(initial_energy: f64) -> Result<Self> {
        let path = data_dir()?.join("timescore.db");
        Self::open_at(&path, initial_energy)
    }

    /// Open a file-backed store at `path`, creating and migrating it.
    pub fn open_at(path: &Path, initial_energy: f64) -> Result<Self> {
        let open_failed = |source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        };
        let writer = Connection::open(path).map_err(open_failed)?;
        Self::configure(&writer)?;
        Self::prepare_schema(&writer, initial_energy)?;

        let reader = Connection::open(path).map_err(open_failed)?;
        Self::configure(&reader)?;
        reader.execute_batch("PRAGMA query_only = ON;")?;

        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Some(Mutex::new(reader)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory store. Reads share the single connection.
    pub fn open_memory(initial_energy: f64) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare_schema(&conn, initial_energy)?;
        Ok(Self {
            writer: Mutex::new(conn),
            reader: None,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn prepare_schema(conn: &Connection, initial_energy: f64) -> Result<()> {
        migrations::migrate(conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        conn.execute(
            "INSERT OR IGNORE INTO user_state (id, current_energy) VALUES (1, ?1)",
            params![initial_energy.max(0.0)],
        )?;
        Ok(())
    }

    /// Run `f` inside one immediate write transaction.
    ///
    /// Commits if `f` returns `Ok`; any error rolls the whole unit back.
    pub fn write<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.writer.lock().map_err(DatabaseError::from)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&Session::new(&tx))?;
        tx.commit()?;
        Ok(out)
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let lock = self.reader.as_ref().unwrap_or(&self.writer);
        let mut conn = lock.lock().map_err(DatabaseError::from)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = f(&Session::new(&tx))?;
        tx.commit()?;
        Ok(out)
    }
}

/// Query and mutation surface over one transaction.
pub struct Session<'c> {
    conn: &'c Connection,
}

impl<'c> Session<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub(crate) fn conn(&self) -> &Connection {
        self.conn
    }

    // === Catalog ===

    /// Insert a definition. A name clash leaves the catalog unchanged.
    pub fn insert_definition(&self, def: &BehaviorDefinition) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO behavior_definitions
                (name, level, category, base_score_per_minute, energy_cost_per_minute, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                def.name,
                def.level.code(),
                def.category,
                def.base_score_per_minute,
                def.energy_cost_per_minute,
                format_ts(def.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(CoreError::DuplicateDefinition(def.name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn definition(&self, name: &str) -> Result<Option<BehaviorDefinition>> {
        let def = self
            .conn
            .query_row(
                &format!("SELECT {DEFINITION_COLUMNS} FROM behavior_definitions WHERE name = ?1"),
                params![name],
                row_to_definition,
            )
            .optional()?;
        Ok(def)
    }

    /// Definitions at `level`. Bare `R` matches every recovery tier.
    pub fn definitions_by_level(&self, level: Level) -> Result<Vec<BehaviorDefinition>> {
        let sql = if level.is_bare_recovery() {
            format!(
                "SELECT {DEFINITION_COLUMNS} FROM behavior_definitions
                 WHERE level LIKE 'R%' ORDER BY id"
            )
        } else {
            format!(
                "SELECT {DEFINITION_COLUMNS} FROM behavior_definitions
                 WHERE level = ?1 ORDER BY id"
            )
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if level.is_bare_recovery() {
            stmt.query_map([], row_to_definition)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            stmt.query_map(params![level.code()], row_to_definition)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
    }

    pub fn definitions(&self) -> Result<Vec<BehaviorDefinition>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM behavior_definitions ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([], row_to_definition)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // === User state ===

    pub fn user_state(&self) -> Result<UserState> {
        let (state, periods) = self.conn.query_row(
            "SELECT current_energy, combo_count, today_total_score, today_behavior_count,
                    today_energy_cost, last_record_at, last_active_date,
                    consecutive_unlucky, lucky_triggers_today, efficient_periods
             FROM user_state WHERE id = 1",
            [],
            |row| {
                let state = UserState {
                    current_energy: row.get(0)?,
                    combo_count: row.get(1)?,
                    today_total_score: row.get(2)?,
                    today_behavior_count: row.get(3)?,
                    today_energy_cost: row.get(4)?,
                    last_record_at: opt_ts_column(row, 5)?,
                    last_active_date: opt_day_column(row, 6)?,
                    consecutive_unlucky: row.get(7)?,
                    lucky_triggers_today: row.get(8)?,
                    efficient_periods: BTreeSet::new(),
                };
                Ok((state, row.get::<_, String>(9)?))
            },
        )?;
        Ok(UserState {
            efficient_periods: serde_json::from_str(&periods)?,
            ..state
        })
    }

    pub fn save_user_state(&self, state: &UserState) -> Result<()> {
        self.conn.execute(
            "UPDATE user_state SET
                current_energy = ?1, combo_count = ?2, today_total_score = ?3,
                today_behavior_count = ?4, today_energy_cost = ?5, last_record_at = ?6,
                last_active_date = ?7, consecutive_unlucky = ?8, lucky_triggers_today = ?9,
                efficient_periods = ?10
             WHERE id = 1",
            params![
                state.current_energy,
                state.combo_count,
                state.today_total_score,
                state.today_behavior_count,
                state.today_energy_cost,
                state.last_record_at.map(format_ts),
                state.last_active_date.map(format_day),
                state.consecutive_unlucky,
                state.lucky_triggers_today,
                serde_json::to_string(&state.efficient_periods)?,
            ],
        )?;
        Ok(())
    }

    // === Records ===

    /// Append a record and return it with its row id.
    pub fn append_record(&self, record: BehaviorRecord) -> Result<BehaviorRecord> {
        self.conn.execute(
            "INSERT INTO behavior_records
                (name, level, duration_minutes, mood, context, started_at, ended_at, day,
                 base_score, dynamic_coefficient, final_score, energy_delta,
                 inferred_sublevel, fingerprint)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.name,
                record.level.code(),
                record.duration_minutes,
                record.mood,
                record.context,
                format_ts(record.started_at),
                format_ts(record.ended_at),
                format_day(record.day),
                record.base_score,
                record.dynamic_coefficient,
                record.final_score,
                record.energy_delta,
                record.inferred_sublevel.map(tier_code),
                record.fingerprint,
            ],
        )?;
        Ok(BehaviorRecord {
            id: self.conn.last_insert_rowid(),
            ..record
        })
    }

    /// All records of `day`, oldest first.
    pub fn records_on(&self, day: NaiveDate) -> Result<Vec<BehaviorRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM behavior_records WHERE day = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![format_day(day)], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The latest `limit` records of `day`, oldest first.
    pub fn recent_records(&self, day: NaiveDate, limit: usize) -> Result<Vec<BehaviorRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM behavior_records
             WHERE day = ?1 ORDER BY id DESC LIMIT ?2"
        ))?;
        let mut rows = stmt
            .query_map(params![format_day(day), limit as i64], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.reverse();
        Ok(rows)
    }

    /// How many times `name` was recorded on `day`.
    pub fn occurrences_on(&self, name: &str, day: NaiveDate) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM behavior_records WHERE day = ?1 AND name = ?2",
            params![format_day(day), name],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    /// Start of the first-ever record.
    pub fn first_record_at(&self) -> Result<Option<NaiveDateTime>> {
        let first = self
            .conn
            .query_row(
                "SELECT started_at FROM behavior_records ORDER BY started_at LIMIT 1",
                [],
                |row| ts_column(row, 0),
            )
            .optional()?;
        Ok(first)
    }

    pub fn record_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM behavior_records", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(count)
    }

    /// Sum of every final score ever recorded.
    pub fn total_score(&self) -> Result<f64> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(final_score), 0.0) FROM behavior_records",
            [],
            |row| row.get::<_, f64>(0),
        )?;
        Ok(total)
    }

    // === History ===

    /// Archive a day. Archiving the same date twice accumulates.
    pub fn append_history(&self, total: &DailyTotal) -> Result<()> {
        self.conn.execute(
            "INSERT INTO daily_history (date, total_score, total_energy_cost)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(date) DO UPDATE SET
                total_score = total_score + excluded.total_score,
                total_energy_cost = total_energy_cost + excluded.total_energy_cost",
            params![format_day(total.date), total.total_score, total.total_energy_cost],
        )?;
        Ok(())
    }

    /// The most recent `days` archived days, oldest first.
    pub fn history(&self, days: usize) -> Result<Vec<DailyTotal>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, total_score, total_energy_cost FROM daily_history
             ORDER BY date DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(days).unwrap_or(i64::MAX);
        let mut rows = stmt
            .query_map(params![limit], |row| {
                Ok(DailyTotal {
                    date: day_column(row, 0)?,
                    total_score: row.get(1)?,
                    total_energy_cost: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.reverse();
        Ok(rows)
    }

    // === Configuration overrides ===

    pub fn set_override(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config_overrides (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove_override(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM config_overrides WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    pub fn overrides(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config_overrides ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
