//! Weekly digest — top items from the content pool, once per ISO week
//! per recipient. An empty pool is a logged no-op that leaves every
//! piece of state untouched, so the next fire gets a clean retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use std::sync::Arc;

use pingpal_core::config::DigestConfig;
use pingpal_core::error::Result;
use pingpal_core::traits::ContentSource;
use pingpal_core::types::{GenerateRequest, PushCategory, week_key};
use pingpal_scheduler::{PushJob, Schedule, parse_weekday};

use crate::driver::{DECLINE_COOLDOWN_SECS, ERROR_COOLDOWN_SECS, JobCtx};

pub struct DigestJob {
    ctx: JobCtx,
    source: Arc<dyn ContentSource>,
    config: DigestConfig,
    weekday: Weekday,
}

impl DigestJob {
    pub fn new(ctx: JobCtx, source: Arc<dyn ContentSource>, config: DigestConfig) -> Result<Self> {
        let weekday = parse_weekday(&config.weekday)?;
        Ok(Self { ctx, source, config, weekday })
    }

    async fn try_one(
        &self,
        uid: &str,
        items: &serde_json::Value,
        period: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.ctx.store.active_within(uid, now, self.ctx.active_within_secs)? {
            tracing::debug!(user = %uid, "digest: recipient inactive, skipping");
            return Ok(());
        }
        if self.ctx.store.already_fired(uid, PushCategory::Digest, period)? {
            return Ok(());
        }

        let gate = self.ctx.gate(PushCategory::Digest);
        if !self.ctx.store.claim(uid, gate, now, self.config.max_per_day, self.config.lock_seconds)? {
            return Ok(());
        }

        let req = GenerateRequest {
            category: PushCategory::Digest,
            user_id: uid.to_string(),
            idle_minutes: 0,
            context: serde_json::json!({ "week": period, "items": items }),
        };
        let draft = match self.ctx.generator.generate(req).await {
            Ok(Some(d)) if d.send && !d.text.trim().is_empty() => d,
            Ok(_) => {
                self.ctx.store.settle_failed(uid, gate, now, DECLINE_COOLDOWN_SECS)?;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(user = %uid, "digest generation failed: {e}");
                self.ctx.store.settle_failed(uid, gate, now, ERROR_COOLDOWN_SECS)?;
                return Ok(());
            }
        };

        if let Err(e) = self.ctx.delivery.send(uid, &draft.text).await {
            tracing::warn!(user = %uid, "digest delivery failed: {e}");
            self.ctx.store.settle_failed(uid, gate, now, ERROR_COOLDOWN_SECS)?;
            return Ok(());
        }

        self.ctx.store.settle_sent(uid, gate, now, self.config.cooldown_minutes)?;
        self.ctx.store.mark_fired(uid, PushCategory::Digest, period, now)?;
        tracing::info!(user = %uid, week = %period, "weekly digest sent");
        Ok(())
    }
}

#[async_trait]
impl PushJob for DigestJob {
    fn name(&self) -> &str {
        "digest"
    }

    fn schedule(&self) -> Schedule {
        Schedule::Weekly {
            weekday: self.weekday,
            hour: self.config.hour,
            minute: self.config.minute,
        }
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        if self.config.recipients.is_empty() {
            tracing::debug!("digest: no recipients configured");
            return Ok(());
        }

        let items = match self.source.fetch(self.config.top_n as usize).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("digest: content fetch failed: {e}");
                return Ok(());
            }
        };
        if items.is_empty() {
            tracing::info!("digest: nothing to summarize this week");
            return Ok(());
        }
        let items = serde_json::to_value(&items)?;

        let period = week_key(now);
        for uid in &self.config.recipients {
            if let Err(e) = self.try_one(uid, &items, &period, now).await {
                tracing::warn!(user = %uid, "digest recipient failed: {e}");
            }
        }
        Ok(())
    }
}
