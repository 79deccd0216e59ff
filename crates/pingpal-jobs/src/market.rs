//! Daily market report — subscriber list filtered by recent activity,
//! once per calendar day per user. No content pool involved; the
//! generator owns the numbers and the wording.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pingpal_core::config::MarketConfig;
use pingpal_core::error::Result;
use pingpal_core::types::{GenerateRequest, PushCategory, day_key};
use pingpal_scheduler::{PushJob, Schedule};

use crate::driver::{DECLINE_COOLDOWN_SECS, ERROR_COOLDOWN_SECS, JobCtx};

pub struct MarketJob {
    ctx: JobCtx,
    config: MarketConfig,
}

impl MarketJob {
    pub fn new(ctx: JobCtx, config: MarketConfig) -> Self {
        Self { ctx, config }
    }

    async fn try_one(&self, uid: &str, period: &str, now: DateTime<Utc>) -> Result<()> {
        if self.ctx.store.already_fired(uid, PushCategory::Market, period)? {
            return Ok(());
        }

        let gate = self.ctx.gate(PushCategory::Market);
        if !self.ctx.store.claim(uid, gate, now, self.config.max_per_day, self.config.lock_seconds)? {
            return Ok(());
        }

        let req = GenerateRequest {
            category: PushCategory::Market,
            user_id: uid.to_string(),
            idle_minutes: 0,
            context: serde_json::json!({ "date": period }),
        };
        let draft = match self.ctx.generator.generate(req).await {
            Ok(Some(d)) if d.send && !d.text.trim().is_empty() => d,
            Ok(_) => {
                self.ctx.store.settle_failed(uid, gate, now, DECLINE_COOLDOWN_SECS)?;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(user = %uid, "market generation failed: {e}");
                self.ctx.store.settle_failed(uid, gate, now, ERROR_COOLDOWN_SECS)?;
                return Ok(());
            }
        };

        if let Err(e) = self.ctx.delivery.send(uid, &draft.text).await {
            tracing::warn!(user = %uid, "market delivery failed: {e}");
            self.ctx.store.settle_failed(uid, gate, now, ERROR_COOLDOWN_SECS)?;
            return Ok(());
        }

        self.ctx.store.settle_sent(uid, gate, now, self.config.cooldown_minutes)?;
        self.ctx.store.mark_fired(uid, PushCategory::Market, period, now)?;
        tracing::info!(user = %uid, "market report sent");
        Ok(())
    }
}

#[async_trait]
impl PushJob for MarketJob {
    fn name(&self) -> &str {
        "market"
    }

    fn schedule(&self) -> Schedule {
        Schedule::Daily { hour: self.config.hour, minute: self.config.minute }
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        if self.config.subscribers.is_empty() {
            tracing::debug!("market: no subscribers configured");
            return Ok(());
        }
        let active =
            self.ctx.store.filter_active(&self.config.subscribers, now, self.ctx.active_within_secs)?;
        if active.is_empty() {
            tracing::debug!("market: no recently active subscribers");
            return Ok(());
        }

        let period = day_key(now);
        for uid in &active {
            if let Err(e) = self.try_one(uid, &period, now).await {
                tracing::warn!(user = %uid, "market subscriber failed: {e}");
            }
        }
        Ok(())
    }
}
