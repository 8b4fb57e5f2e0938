//! Achievement events unlocked by recording and redeeming.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::storage::database::{format_ts, ts_column};
use crate::storage::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FirstRecord,
    FullCombo,
    LuckyStrike,
    SuperLucky,
    WishRedeemed,
}

impl AchievementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::FirstRecord => "first_record",
            AchievementKind::FullCombo => "full_combo",
            AchievementKind::LuckyStrike => "lucky_strike",
            AchievementKind::SuperLucky => "super_lucky",
            AchievementKind::WishRedeemed => "wish_redeemed",
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_record" => Ok(AchievementKind::FirstRecord),
            "full_combo" => Ok(AchievementKind::FullCombo),
            "lucky_strike" => Ok(AchievementKind::LuckyStrike),
            "super_lucky" => Ok(AchievementKind::SuperLucky),
            "wish_redeemed" => Ok(AchievementKind::WishRedeemed),
            other => Err(ValidationError::InvalidValue {
                field: "achievement".into(),
                message: format!("unknown kind '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementEvent {
    pub kind: AchievementKind,
    pub first_unlocked_at: NaiveDateTime,
    pub last_unlocked_at: NaiveDateTime,
    pub count: u32,
}

impl Session<'_> {
    /// Unlock `kind`, or bump its count if already unlocked.
    pub fn unlock_achievement(&self, kind: AchievementKind, at: NaiveDateTime) -> Result<()> {
        self.conn().execute(
            "INSERT INTO achievements (kind, first_unlocked_at, last_unlocked_at, count)
             VALUES (?1, ?2, ?2, 1)
             ON CONFLICT(kind) DO UPDATE SET
                last_unlocked_at = excluded.last_unlocked_at,
                count = count + 1",
            params![kind.as_str(), format_ts(at)],
        )?;
        tracing::info!(%kind, "achievement unlocked");
        Ok(())
    }

    pub fn achievements(&self) -> Result<Vec<AchievementEvent>> {
        let mut stmt = self.conn().prepare(
            "SELECT kind, first_unlocked_at, last_unlocked_at, count
             FROM achievements ORDER BY first_unlocked_at, kind",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                let kind = kind.parse::<AchievementKind>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        e.to_string().into(),
                    )
                })?;
                Ok(AchievementEvent {
                    kind,
                    first_unlocked_at: ts_column(row, 1)?,
                    last_unlocked_at: ts_column(row, 2)?,
                    count: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use chrono::NaiveDate;

    #[test]
    fn repeated_unlocks_increment_count() {
        let store = Store::open_memory(100.0).unwrap();
        let t1 = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let t2 = t1 + chrono::Duration::hours(3);
        store
            .write(|s| {
                s.unlock_achievement(AchievementKind::LuckyStrike, t1)?;
                s.unlock_achievement(AchievementKind::LuckyStrike, t2)
            })
            .unwrap();
        let events = store.read(|s| s.achievements()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].count, 2);
        assert_eq!(events[0].first_unlocked_at, t1);
        assert_eq!(events[0].last_unlocked_at, t2);
    }

    #[test]
    fn kinds_roundtrip_through_strings() {
        for kind in [
            AchievementKind::FirstRecord,
            AchievementKind::FullCombo,
            AchievementKind::LuckyStrike,
            AchievementKind::SuperLucky,
            AchievementKind::WishRedeemed,
        ] {
            assert_eq!(kind.as_str().parse::<AchievementKind>().unwrap(), kind);
        }
    }
}
