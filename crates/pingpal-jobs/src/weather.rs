//! Morning weather briefing — fixed recipient list, once per calendar
//! day per user. The day mark makes restarts harmless: a process that
//! comes back up after the briefing already went out will not send it
//! again, no matter how its interval timers land.
//!
//! Calendar-scheduled jobs fire at an explicitly configured time, so
//! the quiet-hours window does not apply here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pingpal_core::config::{WeatherConfig, WeatherRecipient};
use pingpal_core::error::Result;
use pingpal_core::types::{GenerateRequest, PushCategory, day_key};
use pingpal_scheduler::{PushJob, Schedule};

use crate::driver::{DECLINE_COOLDOWN_SECS, ERROR_COOLDOWN_SECS, JobCtx};

pub struct WeatherJob {
    ctx: JobCtx,
    config: WeatherConfig,
}

impl WeatherJob {
    pub fn new(ctx: JobCtx, config: WeatherConfig) -> Self {
        Self { ctx, config }
    }

    async fn try_one(&self, rcpt: &WeatherRecipient, now: DateTime<Utc>) -> Result<()> {
        let uid = &rcpt.user_id;
        if !self.ctx.store.active_within(uid, now, self.ctx.active_within_secs)? {
            tracing::debug!(user = %uid, "weather: recipient inactive, skipping");
            return Ok(());
        }

        let period = day_key(now);
        if self.ctx.store.already_fired(uid, PushCategory::Weather, &period)? {
            return Ok(());
        }

        let gate = self.ctx.gate(PushCategory::Weather);
        if !self.ctx.store.claim(uid, gate, now, self.config.max_per_day, self.config.lock_seconds)? {
            return Ok(());
        }

        let req = GenerateRequest {
            category: PushCategory::Weather,
            user_id: uid.clone(),
            idle_minutes: 0,
            context: serde_json::json!({ "city": rcpt.city }),
        };
        let draft = match self.ctx.generator.generate(req).await {
            Ok(Some(d)) if d.send && !d.text.trim().is_empty() => d,
            Ok(_) => {
                self.ctx.store.settle_failed(uid, gate, now, DECLINE_COOLDOWN_SECS)?;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(user = %uid, "weather generation failed: {e}");
                self.ctx.store.settle_failed(uid, gate, now, ERROR_COOLDOWN_SECS)?;
                return Ok(());
            }
        };

        if let Err(e) = self.ctx.delivery.send(uid, &draft.text).await {
            tracing::warn!(user = %uid, "weather delivery failed: {e}");
            self.ctx.store.settle_failed(uid, gate, now, ERROR_COOLDOWN_SECS)?;
            return Ok(());
        }

        self.ctx.store.settle_sent(uid, gate, now, self.config.cooldown_minutes)?;
        self.ctx.store.mark_fired(uid, PushCategory::Weather, &period, now)?;
        tracing::info!(user = %uid, city = %rcpt.city, "weather briefing sent");
        Ok(())
    }
}

#[async_trait]
impl PushJob for WeatherJob {
    fn name(&self) -> &str {
        "weather"
    }

    fn schedule(&self) -> Schedule {
        Schedule::Daily { hour: self.config.hour, minute: self.config.minute }
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        if self.config.recipients.is_empty() {
            tracing::debug!("weather: no recipients configured");
            return Ok(());
        }
        for rcpt in &self.config.recipients {
            if let Err(e) = self.try_one(rcpt, now).await {
                tracing::warn!(user = %rcpt.user_id, "weather recipient failed: {e}");
            }
        }
        Ok(())
    }
}
