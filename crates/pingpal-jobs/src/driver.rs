//! Shared driver glue: quiet hours, the deterministic per-user daily
//! idle threshold, and the context bundle every job is built from.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use pingpal_core::config::{EngagementConfig, GateScope, QuietHoursConfig};
use pingpal_core::error::{PingPalError, Result};
use pingpal_core::traits::{ContentGenerator, Delivery};
use pingpal_core::types::PushCategory;
use pingpal_store::EngagementStore;

/// Generator declined or produced nothing usable: short retry delay
/// without touching the daily quota.
pub(crate) const DECLINE_COOLDOWN_SECS: u32 = 900;
/// Generator or delivery errored: slightly shorter delay, same idea.
pub(crate) const ERROR_COOLDOWN_SECS: u32 = 600;

/// Time-of-day window during which no category fires. May wrap midnight
/// (23:00 → 08:00 is the default).
#[derive(Debug, Clone, Copy)]
pub struct QuietHours {
    start: NaiveTime,
    end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn from_config(config: &QuietHoursConfig) -> Result<Self> {
        Ok(Self {
            start: parse_hhmm(&config.start)?,
            end: parse_hhmm(&config.end)?,
        })
    }

    /// Is `now` inside the window? Start inclusive, end exclusive.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let t = now.time();
        if self.start <= self.end {
            t >= self.start && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| PingPalError::Config(format!("bad quiet-hours time {s:?}: {e}")))
}

/// Per-user, per-day idle threshold in minutes, drawn deterministically
/// from [lo, hi]. Every scan of the same day re-derives the identical
/// value, so users don't all trip at the band minimum at once, yet tests
/// can assert exact thresholds.
pub fn idle_threshold_minutes(
    category: PushCategory,
    user_id: &str,
    day: NaiveDate,
    lo: u32,
    hi: u32,
) -> u32 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}", category.as_str(), user_id, day));
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let x = u64::from_be_bytes(bytes);
    lo + (x % (hi as u64 - lo as u64 + 1)) as u32
}

/// Everything a driver shares with its siblings.
#[derive(Clone)]
pub struct JobCtx {
    pub store: Arc<EngagementStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub delivery: Arc<dyn Delivery>,
    pub gate_scope: GateScope,
    pub active_within_secs: i64,
    pub quiet: QuietHours,
}

impl JobCtx {
    pub fn new(
        store: Arc<EngagementStore>,
        generator: Arc<dyn ContentGenerator>,
        delivery: Arc<dyn Delivery>,
        engagement: &EngagementConfig,
        quiet: QuietHours,
    ) -> Self {
        Self {
            store,
            generator,
            delivery,
            gate_scope: engagement.gate_scope,
            active_within_secs: engagement.active_within_hours as i64 * 3600,
            quiet,
        }
    }

    pub fn gate(&self, category: PushCategory) -> &'static str {
        pingpal_store::gate_key(self.gate_scope, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quiet() -> QuietHours {
        QuietHours::from_config(&QuietHoursConfig::default()).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_quiet_hours_wrap_midnight() {
        let q = quiet(); // 23:00 → 08:00
        assert!(q.contains(at(23, 0)));
        assert!(q.contains(at(2, 30)));
        assert!(q.contains(at(7, 59)));
        assert!(!q.contains(at(8, 0)));
        assert!(!q.contains(at(12, 0)));
        assert!(!q.contains(at(22, 59)));
    }

    #[test]
    fn test_quiet_hours_same_day_window() {
        let q = QuietHours::new(
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        assert!(q.contains(at(13, 30)));
        assert!(!q.contains(at(14, 0)));
        assert!(!q.contains(at(9, 0)));
    }

    #[test]
    fn test_bad_quiet_hours_config() {
        let bad = QuietHoursConfig { start: "25:99".into(), end: "08:00".into() };
        assert!(QuietHours::from_config(&bad).is_err());
    }

    #[test]
    fn test_threshold_deterministic_and_in_range() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let a = idle_threshold_minutes(PushCategory::Articles, "u1", day, 60, 180);
        let b = idle_threshold_minutes(PushCategory::Articles, "u1", day, 60, 180);
        assert_eq!(a, b);
        assert!((60..=180).contains(&a));
    }

    #[test]
    fn test_threshold_varies_by_user_and_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let next = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        // not guaranteed distinct for any single pair, so check a spread
        let mut values = std::collections::HashSet::new();
        for uid in ["u1", "u2", "u3", "u4", "u5"] {
            values.insert(idle_threshold_minutes(PushCategory::Articles, uid, day, 0, 10_000));
            values.insert(idle_threshold_minutes(PushCategory::Articles, uid, next, 0, 10_000));
        }
        assert!(values.len() > 5);
    }

    #[test]
    fn test_threshold_degenerate_band() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(idle_threshold_minutes(PushCategory::Articles, "u1", day, 90, 90), 90);
        // swapped bounds are tolerated
        let v = idle_threshold_minutes(PushCategory::Articles, "u1", day, 180, 60);
        assert!((60..=180).contains(&v));
    }
}
