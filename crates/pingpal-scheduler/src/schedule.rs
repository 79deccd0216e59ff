//! Fire-time computation for interval and cron-style schedules.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};

use pingpal_core::error::{PingPalError, Result};

/// When a job fires. `next_fire` is pure so tests can pin exact times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every `every_secs` seconds.
    Interval { every_secs: u64 },
    /// Every day at hh:mm (UTC).
    Daily { hour: u32, minute: u32 },
    /// Every week on the given day at hh:mm (UTC).
    Weekly { weekday: Weekday, hour: u32, minute: u32 },
}

impl Schedule {
    pub fn interval_minutes(minutes: u32) -> Self {
        Schedule::Interval { every_secs: minutes as u64 * 60 }
    }

    /// First fire time strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Interval { every_secs } => after + Duration::seconds(every_secs.max(1) as i64),
            Schedule::Daily { hour, minute } => {
                let at = naive_time(hour, minute);
                let mut candidate = after.date_naive().and_time(at).and_utc();
                if candidate <= after {
                    candidate += Duration::days(1);
                }
                candidate
            }
            Schedule::Weekly { weekday, hour, minute } => {
                let at = naive_time(hour, minute);
                let days_ahead = (weekday.num_days_from_monday() + 7
                    - after.weekday().num_days_from_monday())
                    % 7;
                let mut candidate =
                    (after.date_naive() + Duration::days(days_ahead as i64)).and_time(at).and_utc();
                if candidate <= after {
                    candidate += Duration::days(7);
                }
                candidate
            }
        }
    }
}

fn naive_time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
        .unwrap_or(NaiveTime::MIN)
}

/// Parse a cron-style weekday name ("mon".."sun").
pub fn parse_weekday(s: &str) -> Result<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        other => Err(PingPalError::Schedule(format!("unknown weekday: {other}"))),
    }
}
