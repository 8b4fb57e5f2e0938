//! Wish exchange: spend accumulated score on self-chosen rewards.
//!
//! Spendable score is the lifetime sum of final scores minus the cost of
//! every redeemed wish. Redemption checks and marks inside one write
//! session, so two redemptions can never spend the same score.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::config::Tunables;
use crate::storage::database::{format_ts, opt_ts_column, ts_column};
use crate::storage::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishStatus {
    Pending,
    Redeemed,
}

impl WishStatus {
    fn as_str(self) -> &'static str {
        match self {
            WishStatus::Pending => "pending",
            WishStatus::Redeemed => "redeemed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WishStatus::Pending),
            "redeemed" => Some(WishStatus::Redeemed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wish {
    pub id: i64,
    pub name: String,
    pub cost: i64,
    pub status: WishStatus,
    pub created_at: NaiveDateTime,
    pub redeemed_at: Option<NaiveDateTime>,
}

/// A pending wish and how close the user is to affording it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishProgress {
    pub wish: Wish,
    /// `spendable / cost`, capped at 1.0.
    pub progress: f64,
    pub affordable: bool,
}

impl WishProgress {
    pub fn new(wish: Wish, spendable: f64) -> Self {
        let progress = (spendable / wish.cost as f64).clamp(0.0, 1.0);
        let affordable = spendable >= wish.cost as f64;
        Self {
            wish,
            progress,
            affordable,
        }
    }
}

/// Cost suggestion derived from archived daily scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WishSuggestion {
    pub average_daily_score: f64,
    pub suggested_cost: i64,
    /// Upper end of a reasonable range, ten times the suggestion.
    pub upper_bound: i64,
}

impl WishSuggestion {
    /// `None` when there is no positive history to base a suggestion on.
    pub fn from_daily_scores(scores: &[f64], days: f64) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        if average <= 0.0 {
            return None;
        }
        let suggested_cost = (average * days) as i64;
        Some(Self {
            average_daily_score: average,
            suggested_cost,
            upper_bound: suggested_cost.saturating_mul(10),
        })
    }
}

/// Trim and check a new wish.
pub fn validate_wish(name: &str, cost: i64, tunables: &Tunables) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let chars = name.chars().count();
    if chars > tunables.max_wish_name_chars {
        return Err(ValidationError::InvalidValue {
            field: "name".into(),
            message: format!("{chars} characters, at most {} allowed", tunables.max_wish_name_chars),
        });
    }
    if cost < tunables.min_wish_cost {
        return Err(ValidationError::InvalidValue {
            field: "cost".into(),
            message: format!("{cost} is below the minimum of {}", tunables.min_wish_cost),
        });
    }
    Ok(name.to_string())
}

const WISH_COLUMNS: &str = "id, name, cost, status, created_at, redeemed_at";

fn row_to_wish(row: &Row) -> rusqlite::Result<Wish> {
    let status: String = row.get(3)?;
    let status = WishStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown wish status '{status}'").into(),
        )
    })?;
    Ok(Wish {
        id: row.get(0)?,
        name: row.get(1)?,
        cost: row.get(2)?,
        status,
        created_at: ts_column(row, 4)?,
        redeemed_at: opt_ts_column(row, 5)?,
    })
}

impl Session<'_> {
    pub fn insert_wish(&self, name: &str, cost: i64, created_at: NaiveDateTime) -> Result<Wish> {
        self.conn().execute(
            "INSERT INTO wishes (name, cost, status, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, cost, WishStatus::Pending.as_str(), format_ts(created_at)],
        )?;
        Ok(Wish {
            id: self.conn().last_insert_rowid(),
            name: name.to_string(),
            cost,
            status: WishStatus::Pending,
            created_at,
            redeemed_at: None,
        })
    }

    pub fn wish(&self, id: i64) -> Result<Option<Wish>> {
        let wish = self
            .conn()
            .query_row(
                &format!("SELECT {WISH_COLUMNS} FROM wishes WHERE id = ?1"),
                params![id],
                row_to_wish,
            )
            .optional()?;
        Ok(wish)
    }

    pub fn wishes_with_status(&self, status: WishStatus) -> Result<Vec<Wish>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {WISH_COLUMNS} FROM wishes WHERE status = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![status.as_str()], row_to_wish)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Total cost of every redeemed wish.
    pub fn redeemed_total(&self) -> Result<i64> {
        let total = self.conn().query_row(
            "SELECT COALESCE(SUM(cost), 0) FROM wishes WHERE status = 'redeemed'",
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(total)
    }

    /// Lifetime score minus redeemed wishes.
    pub fn spendable_score(&self) -> Result<f64> {
        Ok(self.total_score()? - self.redeemed_total()? as f64)
    }

    /// Redeem a pending wish if the spendable score covers it.
    pub fn redeem_wish(&self, id: i64, at: NaiveDateTime) -> Result<Wish> {
        let wish = self
            .wish(id)?
            .filter(|w| w.status == WishStatus::Pending)
            .ok_or_else(|| CoreError::NotFound {
                kind: "pending wish",
                id: id.to_string(),
            })?;

        let available = self.spendable_score()?;
        if available < wish.cost as f64 {
            return Err(CoreError::InsufficientScore {
                needed: wish.cost,
                available,
            });
        }

        self.conn().execute(
            "UPDATE wishes SET status = ?1, redeemed_at = ?2 WHERE id = ?3",
            params![WishStatus::Redeemed.as_str(), format_ts(at), id],
        )?;
        Ok(Wish {
            status: WishStatus::Redeemed,
            redeemed_at: Some(at),
            ..wish
        })
    }
}
