//! Calendar idempotence — "this category already fired for this period".
//!
//! Orthogonal to the claim lock: a mark keys on (user, category, period)
//! where the period is a calendar day or an ISO week, and survives
//! process restarts, which is exactly what the once-daily briefing and
//! the weekly digest need.

use chrono::{DateTime, Utc};
use rusqlite::params;

use pingpal_core::error::Result;
use pingpal_core::types::PushCategory;

use crate::{EngagementStore, db_err, ts};

impl EngagementStore {
    pub fn already_fired(
        &self,
        user_id: &str,
        category: PushCategory,
        period_key: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT 1 FROM push_marks
                 WHERE user_id = ?1 AND category = ?2 AND period_key = ?3
                 LIMIT 1",
            )
            .map_err(db_err)?;
        stmt.exists(params![user_id, category.as_str(), period_key])
            .map_err(db_err)
    }

    pub fn mark_fired(
        &self,
        user_id: &str,
        category: PushCategory,
        period_key: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO push_marks (user_id, category, period_key, pushed_ts)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, category.as_str(), period_key, ts(now)],
        )
        .map_err(db_err)?;
        Ok(())
    }
}
