//! TOML configuration — `~/.pingpal/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PingPalError, Result};

/// Whether categories contend for one shared per-user reservation or
/// each keep their own cooldown/lock/quota row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GateScope {
    /// One "don't pester the user" budget across every category.
    #[default]
    Shared,
    /// Independent budget per category.
    PerCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingPalConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub quiet_hours: QuietHoursConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Default for PingPalConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            gateway: GatewayConfig::default(),
            engagement: EngagementConfig::default(),
            quiet_hours: QuietHoursConfig::default(),
            jobs: JobsConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: "~/.pingpal/pingpal.db".into() }
    }
}

impl StoreConfig {
    /// Store path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { enabled: true, host: "127.0.0.1".into(), port: 7321 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    #[serde(default)]
    pub gate_scope: GateScope,
    /// Users silent longer than this receive no unsolicited pushes at all.
    pub active_within_hours: u32,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self { gate_scope: GateScope::Shared, active_within_hours: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHoursConfig {
    /// "HH:MM", inclusive start of the no-push window.
    pub start: String,
    /// "HH:MM", exclusive end; the window may wrap midnight.
    pub end: String,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self { start: "23:00".into(), end: "08:00".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobsConfig {
    #[serde(default)]
    pub nudge: NudgeConfig,
    #[serde(default)]
    pub articles: ArticlesConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeConfig {
    pub enabled: bool,
    pub interval_minutes: u32,
    /// Lower idle bound; upper bound is `engagement.active_within_hours`.
    pub idle_hours: u32,
    pub max_per_day: u32,
    pub cooldown_minutes: u32,
    pub lock_seconds: u32,
    pub scan_limit: u32,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 5,
            idle_hours: 8,
            max_per_day: 2,
            cooldown_minutes: 240,
            lock_seconds: 300,
            scan_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlesConfig {
    pub enabled: bool,
    pub interval_minutes: u32,
    /// Per-user daily idle thresholds are drawn from this band (minutes).
    pub idle_minutes_min: u32,
    pub idle_minutes_max: u32,
    pub max_per_day: u32,
    pub cooldown_minutes: u32,
    pub lock_seconds: u32,
    pub scan_limit: u32,
    /// JSON-lines file the bundled content source reads items from.
    pub pool_path: String,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 6,
            idle_minutes_min: 60,
            idle_minutes_max: 180,
            max_per_day: 6,
            cooldown_minutes: 120,
            lock_seconds: 300,
            scan_limit: 200,
            pool_path: "~/.pingpal/articles.jsonl".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRecipient {
    pub user_id: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    pub max_per_day: u32,
    pub cooldown_minutes: u32,
    pub lock_seconds: u32,
    #[serde(default)]
    pub recipients: Vec<WeatherRecipient>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 8,
            minute: 20,
            max_per_day: 3,
            cooldown_minutes: 30,
            lock_seconds: 300,
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub enabled: bool,
    /// Cron-style day of week: "mon".."sun".
    pub weekday: String,
    pub hour: u32,
    pub minute: u32,
    pub max_per_day: u32,
    pub cooldown_minutes: u32,
    pub lock_seconds: u32,
    pub top_n: u32,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weekday: "sun".into(),
            hour: 20,
            minute: 30,
            max_per_day: 3,
            cooldown_minutes: 30,
            lock_seconds: 300,
            top_n: 5,
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    pub max_per_day: u32,
    pub cooldown_minutes: u32,
    pub lock_seconds: u32,
    #[serde(default)]
    pub subscribers: Vec<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 16,
            minute: 30,
            max_per_day: 2,
            cooldown_minutes: 30,
            lock_seconds: 300,
            subscribers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// "console" or "webhook".
    pub kind: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { kind: "console".into(), webhook_url: None }
    }
}

impl PingPalConfig {
    /// `~/.pingpal`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pingpal")
    }

    /// `~/.pingpal/config.toml`
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults when the
    /// file does not exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PingPalError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| PingPalError::Config(format!("parse {}: {e}", path.display())))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PingPalError::Config(format!("serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
