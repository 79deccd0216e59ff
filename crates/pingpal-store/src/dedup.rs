//! Content dedup — an append-only seen-set of content fingerprints.
//!
//! Share-type drivers check and mark an item *before* generation starts.
//! The dedup is optimistic: two workers racing between `seen` and
//! `mark_seen` can still pick the same item. The claim lock is what
//! prevents double-sending to any single user.

use chrono::{DateTime, Utc};
use rusqlite::params;

use pingpal_core::error::Result;
use pingpal_core::types::ContentItem;

use crate::{EngagementStore, db_err, ts};

impl EngagementStore {
    /// Has this fingerprint ever been shared?
    pub fn seen(&self, fingerprint: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT 1 FROM content_fingerprints WHERE hash = ?1 LIMIT 1")
            .map_err(db_err)?;
        stmt.exists(params![fingerprint]).map_err(db_err)
    }

    /// Record a fingerprint. Idempotent; a hash is inserted at most once
    /// and never removed.
    pub fn mark_seen(&self, item: &ContentItem, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO content_fingerprints (hash, source, title, link, seen_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![item.fingerprint(), item.source, item.title, item.link, ts(now)],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(guid: &str) -> ContentItem {
        ContentItem {
            source: "https://example.com/feed".into(),
            guid: Some(guid.into()),
            title: "A title".into(),
            link: format!("https://example.com/{guid}"),
            published: None,
        }
    }

    #[test]
    fn test_seen_after_mark() {
        let store = EngagementStore::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let it = item("post-1");

        assert!(!store.seen(&it.fingerprint()).unwrap());
        store.mark_seen(&it, now).unwrap();
        assert!(store.seen(&it.fingerprint()).unwrap());
        assert!(!store.seen(&item("post-2").fingerprint()).unwrap());
    }

    #[test]
    fn test_mark_seen_idempotent() {
        let store = EngagementStore::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let it = item("post-1");
        store.mark_seen(&it, now).unwrap();
        // second insert is a no-op, not an error
        store.mark_seen(&it, now + chrono::Duration::hours(1)).unwrap();
        assert!(store.seen(&it.fingerprint()).unwrap());
    }
}
