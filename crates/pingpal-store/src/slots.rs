//! Slot claiming — the one transaction-safe primitive everything rides on.
//!
//! A claim is a time-bounded reservation on a (user, gate) pair: it
//! re-checks the opt-out flag, daily quota, cooldown, and any live lock
//! inside a single `BEGIN IMMEDIATE` transaction, then stamps
//! `lock_until_ts`. A worker that crashes mid-send never leaves the user
//! stuck — the lock simply elapses and a later claim succeeds again.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{TransactionBehavior, params};
use serde::Serialize;

use pingpal_core::error::Result;
use pingpal_core::types::Candidate;

use crate::{EngagementStore, db_err, ts};

/// Idle band a user must fall into to be scan-eligible: idle for at
/// least `min_idle_secs`, but still active within `max_idle_secs`.
#[derive(Debug, Clone, Copy)]
pub struct IdleWindow {
    pub min_idle_secs: i64,
    pub max_idle_secs: i64,
}

impl IdleWindow {
    pub fn new(min_idle_secs: i64, max_idle_secs: i64) -> Self {
        Self { min_idle_secs, max_idle_secs }
    }

    pub fn hours(min_idle_hours: i64, max_idle_hours: i64) -> Self {
        Self::new(min_idle_hours * 3600, max_idle_hours * 3600)
    }
}

/// One row of `engagement_gate`, for inspection and tests.
#[derive(Debug, Clone, Serialize)]
pub struct GateRow {
    pub last_sent_ts: i64,
    pub sent_date: String,
    pub sent_count_today: i64,
    pub cooldown_until_ts: i64,
    pub lock_until_ts: i64,
}

impl EngagementStore {
    /// Eligibility scan: enabled users whose `last_active_ts` sits inside
    /// the idle band and whose gate carries no live cooldown or lock.
    /// Most-idle-first. Read-only — claim re-validates everything.
    pub fn scan(
        &self,
        gate: &str,
        now: DateTime<Utc>,
        window: IdleWindow,
        limit: u32,
    ) -> Result<Vec<Candidate>> {
        let now_ts = ts(now);
        let idle_before = now_ts - window.min_idle_secs;
        let active_after = (now_ts - window.max_idle_secs).max(0);

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT a.user_id, a.last_active_ts
                 FROM user_activity a
                 LEFT JOIN engagement_gate g
                   ON g.user_id = a.user_id AND g.gate = ?1
                 WHERE a.enabled = 1
                   AND a.last_active_ts > 0
                   AND a.last_active_ts <= ?2
                   AND a.last_active_ts >= ?3
                   AND COALESCE(g.cooldown_until_ts, 0) <= ?4
                   AND COALESCE(g.lock_until_ts, 0) <= ?4
                 ORDER BY a.last_active_ts ASC
                 LIMIT ?5",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![gate, idle_before, active_after, now_ts, limit], |row| {
                Ok(Candidate {
                    user_id: row.get(0)?,
                    last_active_at: Utc
                        .timestamp_opt(row.get::<_, i64>(1)?, 0)
                        .single()
                        .unwrap_or_default(),
                })
            })
            .map_err(db_err)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(db_err)?);
        }
        Ok(out)
    }

    /// Atomically reserve a send slot. Returns false on any gating
    /// failure (opt-out, quota, cooldown, live lock) — contention is
    /// expected, not an error. Exactly one of two concurrent callers for
    /// the same (user, gate) can see true.
    pub fn claim(
        &self,
        user_id: &str,
        gate: &str,
        now: DateTime<Utc>,
        max_per_day: u32,
        lock_seconds: u32,
    ) -> Result<bool> {
        let now_ts = ts(now);
        let today = now.date_naive().to_string();

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        // Lazily create both rows on first contact.
        tx.execute(
            "INSERT OR IGNORE INTO user_activity (user_id, last_active_ts) VALUES (?1, ?2)",
            params![user_id, now_ts],
        )
        .map_err(db_err)?;
        tx.execute(
            "INSERT OR IGNORE INTO engagement_gate (user_id, gate) VALUES (?1, ?2)",
            params![user_id, gate],
        )
        .map_err(db_err)?;

        let enabled: i64 = tx
            .query_row(
                "SELECT enabled FROM user_activity WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if enabled != 1 {
            return Ok(false); // dropped tx rolls back
        }

        let (sent_date, count, cooldown_until, lock_until): (String, i64, i64, i64) = tx
            .query_row(
                "SELECT sent_date, sent_count_today, cooldown_until_ts, lock_until_ts
                 FROM engagement_gate WHERE user_id = ?1 AND gate = ?2",
                params![user_id, gate],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(db_err)?;

        // Stored counter only counts for the stored day.
        let effective_count = if sent_date == today { count } else { 0 };

        if effective_count >= max_per_day as i64 || cooldown_until > now_ts || lock_until > now_ts {
            return Ok(false);
        }

        tx.execute(
            "UPDATE engagement_gate SET lock_until_ts = ?3 WHERE user_id = ?1 AND gate = ?2",
            params![user_id, gate, now_ts + lock_seconds as i64],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    /// Settle a successful send: bump the daily counter (rolling the
    /// date if needed), start the cooldown, release the lock.
    pub fn settle_sent(
        &self,
        user_id: &str,
        gate: &str,
        now: DateTime<Utc>,
        cooldown_minutes: u32,
    ) -> Result<()> {
        let now_ts = ts(now);
        let today = now.date_naive().to_string();
        let cooldown_until = now_ts + cooldown_minutes as i64 * 60;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        tx.execute(
            "INSERT OR IGNORE INTO engagement_gate (user_id, gate) VALUES (?1, ?2)",
            params![user_id, gate],
        )
        .map_err(db_err)?;

        let (sent_date, count): (String, i64) = tx
            .query_row(
                "SELECT sent_date, sent_count_today FROM engagement_gate
                 WHERE user_id = ?1 AND gate = ?2",
                params![user_id, gate],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(db_err)?;
        let new_count = if sent_date == today { count + 1 } else { 1 };

        tx.execute(
            "UPDATE engagement_gate
             SET last_sent_ts = ?3,
                 sent_date = ?4,
                 sent_count_today = ?5,
                 cooldown_until_ts = ?6,
                 lock_until_ts = 0
             WHERE user_id = ?1 AND gate = ?2",
            params![user_id, gate, now_ts, today, new_count, cooldown_until],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    /// Settle a failed attempt: bounded retry delay, lock released,
    /// quota untouched. The cooldown never shortens an existing one.
    pub fn settle_failed(
        &self,
        user_id: &str,
        gate: &str,
        now: DateTime<Utc>,
        cooldown_seconds: u32,
    ) -> Result<()> {
        let new_cooldown = ts(now) + cooldown_seconds as i64;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        tx.execute(
            "INSERT OR IGNORE INTO engagement_gate (user_id, gate) VALUES (?1, ?2)",
            params![user_id, gate],
        )
        .map_err(db_err)?;
        tx.execute(
            "UPDATE engagement_gate
             SET cooldown_until_ts = MAX(cooldown_until_ts, ?3),
                 lock_until_ts = 0
             WHERE user_id = ?1 AND gate = ?2",
            params![user_id, gate, new_cooldown],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    pub fn gate_state(&self, user_id: &str, gate: &str) -> Result<Option<GateRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT last_sent_ts, sent_date, sent_count_today, cooldown_until_ts, lock_until_ts
                 FROM engagement_gate WHERE user_id = ?1 AND gate = ?2",
            )
            .map_err(db_err)?;
        let row = stmt
            .query_row(params![user_id, gate], |row| {
                Ok(GateRow {
                    last_sent_ts: row.get(0)?,
                    sent_date: row.get(1)?,
                    sent_count_today: row.get(2)?,
                    cooldown_until_ts: row.get(3)?,
                    lock_until_ts: row.get(4)?,
                })
            })
            .ok();
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn store_with_idle_user(user: &str, idle_hours: i64) -> EngagementStore {
        let store = EngagementStore::open_in_memory().unwrap();
        store.touch(user, now() - Duration::hours(idle_hours)).unwrap();
        store
    }

    #[test]
    fn test_scan_idle_band() {
        let store = EngagementStore::open_in_memory().unwrap();
        let t = now();
        store.touch("fresh", t - Duration::hours(1)).unwrap();
        store.touch("idle", t - Duration::hours(10)).unwrap();
        store.touch("gone", t - Duration::hours(30)).unwrap();

        let cands = store.scan("shared", t, IdleWindow::hours(8, 24), 10).unwrap();
        let ids: Vec<_> = cands.iter().map(|c| c.user_id.as_str()).collect();
        // 30h idle satisfies the lower bound but breaks the upper one
        assert_eq!(ids, vec!["idle"]);
    }

    #[test]
    fn test_scan_most_idle_first() {
        let store = EngagementStore::open_in_memory().unwrap();
        let t = now();
        store.touch("a", t - Duration::hours(9)).unwrap();
        store.touch("b", t - Duration::hours(12)).unwrap();
        store.touch("c", t - Duration::hours(10)).unwrap();

        let cands = store.scan("shared", t, IdleWindow::hours(8, 24), 10).unwrap();
        let ids: Vec<_> = cands.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_scan_skips_disabled_and_locked() {
        let store = EngagementStore::open_in_memory().unwrap();
        let t = now();
        store.touch("off", t - Duration::hours(10)).unwrap();
        store.set_enabled("off", false).unwrap();
        store.touch("locked", t - Duration::hours(10)).unwrap();
        assert!(store.claim("locked", "shared", t, 5, 300).unwrap());

        let cands = store.scan("shared", t, IdleWindow::hours(8, 24), 10).unwrap();
        assert!(cands.is_empty());
    }

    #[test]
    fn test_claim_exclusive_under_concurrency() {
        let store = Arc::new(store_with_idle_user("u1", 10));
        let t = now();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.claim("u1", "shared", t, 5, 300).unwrap()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_claim_respects_quota_and_rollover() {
        let store = store_with_idle_user("u1", 10);
        let t = now();

        for _ in 0..2 {
            assert!(store.claim("u1", "shared", t, 2, 300).unwrap());
            store.settle_sent("u1", "shared", t, 0).unwrap();
        }
        let row = store.gate_state("u1", "shared").unwrap().unwrap();
        assert_eq!(row.sent_count_today, 2);
        // quota exhausted for today
        assert!(!store.claim("u1", "shared", t, 2, 300).unwrap());

        // next day the stored counter reads as zero
        let tomorrow = t + Duration::days(1);
        assert!(store.claim("u1", "shared", tomorrow, 2, 300).unwrap());
        store.settle_sent("u1", "shared", tomorrow, 0).unwrap();
        let row = store.gate_state("u1", "shared").unwrap().unwrap();
        assert_eq!(row.sent_count_today, 1);
    }

    #[test]
    fn test_claim_cooldown_boundary() {
        let store = store_with_idle_user("u1", 10);
        let t = now();
        assert!(store.claim("u1", "shared", t, 5, 300).unwrap());
        store.settle_sent("u1", "shared", t, 10).unwrap();

        let just_before = t + Duration::minutes(10) - Duration::seconds(1);
        assert!(!store.claim("u1", "shared", just_before, 5, 300).unwrap());
        // claim succeeds exactly at cooldown_until
        let at_cooldown = t + Duration::minutes(10);
        assert!(store.claim("u1", "shared", at_cooldown, 5, 300).unwrap());
    }

    #[test]
    fn test_unsettled_claim_expires() {
        let store = store_with_idle_user("u1", 10);
        let t = now();
        assert!(store.claim("u1", "shared", t, 5, 300).unwrap());
        // worker crashed: no settle. Lock holds until it elapses.
        assert!(!store.claim("u1", "shared", t + Duration::seconds(299), 5, 300).unwrap());
        assert!(store.claim("u1", "shared", t + Duration::seconds(300), 5, 300).unwrap());
    }

    #[test]
    fn test_settle_failed_keeps_quota() {
        let store = store_with_idle_user("u1", 10);
        let t = now();
        assert!(store.claim("u1", "shared", t, 5, 300).unwrap());
        store.settle_failed("u1", "shared", t, 900).unwrap();

        let row = store.gate_state("u1", "shared").unwrap().unwrap();
        assert_eq!(row.sent_count_today, 0);
        assert_eq!(row.lock_until_ts, 0);
        assert_eq!(row.cooldown_until_ts, ts(t) + 900);
    }

    #[test]
    fn test_settle_failed_never_shortens_cooldown() {
        let store = store_with_idle_user("u1", 10);
        let t = now();
        assert!(store.claim("u1", "shared", t, 5, 300).unwrap());
        store.settle_failed("u1", "shared", t, 3600).unwrap();
        store.settle_failed("u1", "shared", t, 60).unwrap();

        let row = store.gate_state("u1", "shared").unwrap().unwrap();
        assert_eq!(row.cooldown_until_ts, ts(t) + 3600);
    }

    #[test]
    fn test_claim_disabled_user() {
        let store = store_with_idle_user("u1", 10);
        store.set_enabled("u1", false).unwrap();
        assert!(!store.claim("u1", "shared", now(), 5, 300).unwrap());
    }

    #[test]
    fn test_shared_gate_couples_categories() {
        // Category A's cooldown blocks category B on the shared gate.
        let store = store_with_idle_user("u1", 10);
        let t = now();
        assert!(store.claim("u1", "shared", t, 5, 300).unwrap());
        store.settle_sent("u1", "shared", t, 120).unwrap();
        assert!(!store.claim("u1", "shared", t + Duration::minutes(30), 5, 300).unwrap());
    }

    #[test]
    fn test_per_category_gates_are_independent() {
        let store = store_with_idle_user("u1", 10);
        let t = now();
        assert!(store.claim("u1", "nudge", t, 5, 300).unwrap());
        store.settle_sent("u1", "nudge", t, 120).unwrap();
        // a different gate key is untouched by nudge's cooldown
        assert!(store.claim("u1", "articles", t + Duration::minutes(1), 5, 300).unwrap());
    }

    #[test]
    fn test_claim_lazily_creates_rows() {
        let store = EngagementStore::open_in_memory().unwrap();
        let t = now();
        assert!(store.claim("new-user", "shared", t, 5, 300).unwrap());
        assert!(store.activity("new-user").unwrap().is_some());
        assert!(store.gate_state("new-user", "shared").unwrap().is_some());
    }
}
