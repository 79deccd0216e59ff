//! # PingPal Store
//!
//! The single repository over SQLite that every job driver and the
//! inbound chat path share. Four concerns, four tables:
//!
//! - `user_activity` — last-active timestamp + opt-out flag (the only
//!   write path from the inbound chat flow).
//! - `engagement_gate` — per-(user, gate) quota, cooldown, and the
//!   time-bounded claim lock. The gate key is either `"shared"` or the
//!   category name, depending on the configured [`GateScope`].
//! - `content_fingerprints` — append-only seen-set for shared content.
//! - `push_marks` — calendar idempotence keys ("once per day/week").
//!
//! Claims and settles run inside `BEGIN IMMEDIATE` transactions so the
//! exclusivity guarantee holds even when several OS processes share the
//! database file. Scans are plain reads; claim re-validates every gating
//! field inside its own transaction anyway.

mod activity;
mod dedup;
mod marks;
mod slots;

pub use activity::ActivityRow;
pub use slots::{GateRow, IdleWindow};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use pingpal_core::config::GateScope;
use pingpal_core::error::{PingPalError, Result};
use pingpal_core::types::PushCategory;

/// Gate key for a category under the configured scope.
pub fn gate_key(scope: GateScope, category: PushCategory) -> &'static str {
    match scope {
        GateScope::Shared => "shared",
        GateScope::PerCategory => category.as_str(),
    }
}

pub struct EngagementStore {
    conn: Mutex<Connection>,
}

impl EngagementStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user_activity (
                user_id TEXT PRIMARY KEY,
                last_active_ts INTEGER DEFAULT 0,
                enabled INTEGER DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_user_activity_last_active
                ON user_activity(last_active_ts);

            CREATE TABLE IF NOT EXISTS engagement_gate (
                user_id TEXT NOT NULL,
                gate TEXT NOT NULL,
                last_sent_ts INTEGER DEFAULT 0,
                sent_date TEXT DEFAULT '',
                sent_count_today INTEGER DEFAULT 0,
                cooldown_until_ts INTEGER DEFAULT 0,
                lock_until_ts INTEGER DEFAULT 0,
                PRIMARY KEY (user_id, gate)
            );
            CREATE INDEX IF NOT EXISTS idx_engagement_gate_cooldown
                ON engagement_gate(cooldown_until_ts);

            CREATE TABLE IF NOT EXISTS content_fingerprints (
                hash TEXT PRIMARY KEY,
                source TEXT DEFAULT '',
                title TEXT DEFAULT '',
                link TEXT DEFAULT '',
                seen_ts INTEGER DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS push_marks (
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                period_key TEXT NOT NULL,
                pushed_ts INTEGER DEFAULT 0,
                PRIMARY KEY (user_id, category, period_key)
            );",
        )
        .map_err(db_err)?;

        tracing::debug!("engagement store opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PingPalError::Store(format!("connection mutex poisoned: {e}")))
    }
}

pub(crate) fn db_err(e: rusqlite::Error) -> PingPalError {
    PingPalError::Store(e.to_string())
}

pub(crate) fn ts(dt: chrono::DateTime<chrono::Utc>) -> i64 {
    dt.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_key_scopes() {
        assert_eq!(gate_key(GateScope::Shared, PushCategory::Nudge), "shared");
        assert_eq!(gate_key(GateScope::Shared, PushCategory::Articles), "shared");
        assert_eq!(gate_key(GateScope::PerCategory, PushCategory::Nudge), "nudge");
        assert_eq!(gate_key(GateScope::PerCategory, PushCategory::Weather), "weather");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        let store = EngagementStore::open(&path).unwrap();
        drop(store);
        assert!(path.exists());
    }
}
