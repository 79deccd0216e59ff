//! Shared types: push categories, scan candidates, content items.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A push category — one per periodic job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PushCategory {
    /// Conversational nudge after a long idle stretch.
    Nudge,
    /// Shared article picked from a content pool.
    Articles,
    /// Morning weather briefing.
    Weather,
    /// Weekly repo digest.
    Digest,
    /// Daily market report.
    Market,
}

impl PushCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushCategory::Nudge => "nudge",
            PushCategory::Articles => "articles",
            PushCategory::Weather => "weather",
            PushCategory::Digest => "digest",
            PushCategory::Market => "market",
        }
    }
}

impl std::fmt::Display for PushCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user eligible for a push, as returned by an eligibility scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub user_id: String,
    pub last_active_at: DateTime<Utc>,
}

impl Candidate {
    /// Whole minutes the user has been idle, clamped at zero.
    pub fn idle_minutes(&self, now: DateTime<Utc>) -> i64 {
        ((now - self.last_active_at).num_seconds() / 60).max(0)
    }
}

/// One item from a shareable content pool (article, repo, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Where the item came from (feed URL, "github-trending", ...).
    pub source: String,
    /// Stable identifier within the source; falls back to `link`.
    #[serde(default)]
    pub guid: Option<String>,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub published: Option<String>,
}

impl ContentItem {
    /// Content fingerprint for dedup: sha256 of `source|guid-or-link`.
    pub fn fingerprint(&self) -> String {
        let key = self.guid.as_deref().unwrap_or(&self.link);
        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}", self.source, key));
        format!("{:x}", hasher.finalize())
    }
}

/// What a content generator produced for a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushDraft {
    pub text: String,
    /// Generator-level veto: false means "not a good moment, skip".
    #[serde(default = "default_true")]
    pub send: bool,
}

fn default_true() -> bool {
    true
}

/// Request handed to the external content generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub category: PushCategory,
    pub user_id: String,
    pub idle_minutes: i64,
    /// Category-specific context (the picked item, the city, the week key).
    #[serde(default)]
    pub context: serde_json::Value,
}

/// Calendar day key, e.g. `2026-08-23`.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.date_naive().to_string()
}

/// ISO week key, e.g. `2026-W34`.
pub fn week_key(now: DateTime<Utc>) -> String {
    let iso = now.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
