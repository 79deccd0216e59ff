//! Article-share driver — pushes an unseen item from the content pool
//! to users who have been idle past their personal daily threshold.
//!
//! The threshold is deterministic per (user, day), so the same scan
//! decision falls out of every tick that day, and nobody gets pinged at
//! exactly minute 60 along with everyone else. Unlike the nudge driver
//! this one works through the whole candidate list each tick.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use pingpal_core::config::ArticlesConfig;
use pingpal_core::error::Result;
use pingpal_core::traits::ContentSource;
use pingpal_core::types::{Candidate, ContentItem, GenerateRequest, PushCategory};
use pingpal_scheduler::{PushJob, Schedule};
use pingpal_store::IdleWindow;

use crate::driver::{DECLINE_COOLDOWN_SECS, ERROR_COOLDOWN_SECS, JobCtx, idle_threshold_minutes};

const FETCH_LIMIT: usize = 60;

pub struct ArticlesJob {
    ctx: JobCtx,
    source: Arc<dyn ContentSource>,
    config: ArticlesConfig,
}

impl ArticlesJob {
    pub fn new(ctx: JobCtx, source: Arc<dyn ContentSource>, config: ArticlesConfig) -> Self {
        Self { ctx, source, config }
    }

    /// First pool item nobody has been sent yet, fingerprint marked
    /// before generation starts. Best-effort dedup: a racing worker can
    /// still pick the same item in the gap, which we accept.
    fn pick_unseen(&self, items: &[ContentItem], now: DateTime<Utc>) -> Result<Option<ContentItem>> {
        for item in items {
            if !self.ctx.store.seen(&item.fingerprint())? {
                self.ctx.store.mark_seen(item, now)?;
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    async fn try_one(
        &self,
        cand: &Candidate,
        items: &[ContentItem],
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let threshold = idle_threshold_minutes(
            PushCategory::Articles,
            &cand.user_id,
            now.date_naive(),
            self.config.idle_minutes_min,
            self.config.idle_minutes_max,
        );
        if cand.idle_minutes(now) < threshold as i64 {
            return Ok(false);
        }

        let gate = self.ctx.gate(PushCategory::Articles);
        if !self.ctx.store.claim(
            &cand.user_id,
            gate,
            now,
            self.config.max_per_day,
            self.config.lock_seconds,
        )? {
            return Ok(false);
        }

        let Some(item) = self.pick_unseen(items, now)? else {
            // pool exhausted for this tick; release via failed-settle
            self.ctx
                .store
                .settle_failed(&cand.user_id, gate, now, ERROR_COOLDOWN_SECS)?;
            return Ok(false);
        };

        let req = GenerateRequest {
            category: PushCategory::Articles,
            user_id: cand.user_id.clone(),
            idle_minutes: cand.idle_minutes(now),
            context: serde_json::json!({ "item": item }),
        };
        let draft = match self.ctx.generator.generate(req).await {
            Ok(Some(d)) if d.send && !d.text.trim().is_empty() => d,
            Ok(_) => {
                self.ctx
                    .store
                    .settle_failed(&cand.user_id, gate, now, DECLINE_COOLDOWN_SECS)?;
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!(user = %cand.user_id, "article generation failed: {e}");
                self.ctx
                    .store
                    .settle_failed(&cand.user_id, gate, now, ERROR_COOLDOWN_SECS)?;
                return Ok(false);
            }
        };

        if let Err(e) = self.ctx.delivery.send(&cand.user_id, &draft.text).await {
            tracing::warn!(user = %cand.user_id, "article delivery failed: {e}");
            self.ctx
                .store
                .settle_failed(&cand.user_id, gate, now, ERROR_COOLDOWN_SECS)?;
            return Ok(false);
        }

        self.ctx
            .store
            .settle_sent(&cand.user_id, gate, now, self.config.cooldown_minutes)?;
        tracing::info!(user = %cand.user_id, title = %item.title, "article shared");
        Ok(true)
    }
}

#[async_trait]
impl PushJob for ArticlesJob {
    fn name(&self) -> &str {
        "articles"
    }

    fn schedule(&self) -> Schedule {
        Schedule::interval_minutes(self.config.interval_minutes)
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        if self.ctx.quiet.contains(now) {
            tracing::debug!("articles: quiet hours, skipping tick");
            return Ok(());
        }

        let items = match self.source.fetch(FETCH_LIMIT).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("articles: content pool fetch failed: {e}");
                return Ok(());
            }
        };
        if items.is_empty() {
            tracing::debug!("articles: empty content pool");
            return Ok(());
        }

        let window = IdleWindow::new(
            self.config.idle_minutes_min as i64 * 60,
            self.ctx.active_within_secs,
        );
        let gate = self.ctx.gate(PushCategory::Articles);
        let candidates = self.ctx.store.scan(gate, now, window, self.config.scan_limit)?;

        for cand in &candidates {
            if let Err(e) = self.try_one(cand, &items, now).await {
                tracing::warn!(user = %cand.user_id, "article candidate failed: {e}");
            }
        }
        Ok(())
    }
}
