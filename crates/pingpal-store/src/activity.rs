//! Activity tracking — the inbound chat path's only write into the store.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::params;
use serde::Serialize;

use pingpal_core::error::Result;

use crate::{EngagementStore, db_err, ts};

/// One row of `user_activity`.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRow {
    pub user_id: String,
    pub last_active_at: DateTime<Utc>,
    pub enabled: bool,
}

impl EngagementStore {
    /// Record that the user just sent us a message. Upserts the row.
    pub fn touch(&self, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_activity (user_id, last_active_ts) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET last_active_ts = excluded.last_active_ts",
            params![user_id, ts(now)],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// User-level opt-out switch for all unsolicited pushes.
    pub fn set_enabled(&self, user_id: &str, enabled: bool) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_activity (user_id, enabled) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET enabled = excluded.enabled",
            params![user_id, enabled as i64],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn activity(&self, user_id: &str) -> Result<Option<ActivityRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT user_id, last_active_ts, enabled FROM user_activity WHERE user_id = ?1")
            .map_err(db_err)?;
        let row = stmt
            .query_row(params![user_id], |row| {
                Ok(ActivityRow {
                    user_id: row.get(0)?,
                    last_active_at: Utc
                        .timestamp_opt(row.get::<_, i64>(1)?, 0)
                        .single()
                        .unwrap_or_default(),
                    enabled: row.get::<_, i64>(2)? == 1,
                })
            })
            .ok();
        Ok(row)
    }

    /// True when the user was active within `within_secs` of `now`.
    pub fn active_within(&self, user_id: &str, now: DateTime<Utc>, within_secs: i64) -> Result<bool> {
        let cutoff = ts(now) - within_secs;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT 1 FROM user_activity
                 WHERE user_id = ?1 AND last_active_ts > 0 AND last_active_ts >= ?2
                 LIMIT 1",
            )
            .map_err(db_err)?;
        let hit = stmt.exists(params![user_id, cutoff]).map_err(db_err)?;
        Ok(hit)
    }

    /// Filter a recipient list down to users active within the window,
    /// preserving input order. Used by the fixed-recipient drivers.
    pub fn filter_active(
        &self,
        user_ids: &[String],
        now: DateTime<Utc>,
        within_secs: i64,
    ) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for uid in user_ids {
            if self.active_within(uid, now, within_secs)? {
                out.push(uid.clone());
            }
        }
        Ok(out)
    }
}
