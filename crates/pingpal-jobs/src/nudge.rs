//! Conversational nudge driver — "it's been a while, say something".
//!
//! Interval-scheduled. Scans the 8h..24h idle band most-idle-first and
//! stops after its first successful send per tick, so the companion
//! never pings half its user base in one burst.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pingpal_core::config::NudgeConfig;
use pingpal_core::error::Result;
use pingpal_core::types::{Candidate, GenerateRequest, PushCategory};
use pingpal_scheduler::{PushJob, Schedule};
use pingpal_store::IdleWindow;

use crate::driver::{DECLINE_COOLDOWN_SECS, ERROR_COOLDOWN_SECS, JobCtx};

pub struct NudgeJob {
    ctx: JobCtx,
    config: NudgeConfig,
}

impl NudgeJob {
    pub fn new(ctx: JobCtx, config: NudgeConfig) -> Self {
        Self { ctx, config }
    }

    /// Claim, generate, deliver, settle for one candidate. Returns true
    /// only when a message actually went out.
    async fn try_one(&self, cand: &Candidate, now: DateTime<Utc>) -> Result<bool> {
        let gate = self.ctx.gate(PushCategory::Nudge);
        if !self.ctx.store.claim(
            &cand.user_id,
            gate,
            now,
            self.config.max_per_day,
            self.config.lock_seconds,
        )? {
            return Ok(false);
        }

        let req = GenerateRequest {
            category: PushCategory::Nudge,
            user_id: cand.user_id.clone(),
            idle_minutes: cand.idle_minutes(now),
            context: serde_json::Value::Null,
        };
        let draft = match self.ctx.generator.generate(req).await {
            Ok(Some(d)) if d.send && !d.text.trim().is_empty() => d,
            Ok(_) => {
                // generator vetoed this moment
                self.ctx
                    .store
                    .settle_failed(&cand.user_id, gate, now, DECLINE_COOLDOWN_SECS)?;
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!(user = %cand.user_id, "nudge generation failed: {e}");
                self.ctx
                    .store
                    .settle_failed(&cand.user_id, gate, now, ERROR_COOLDOWN_SECS)?;
                return Ok(false);
            }
        };

        if let Err(e) = self.ctx.delivery.send(&cand.user_id, &draft.text).await {
            tracing::warn!(user = %cand.user_id, "nudge delivery failed: {e}");
            self.ctx
                .store
                .settle_failed(&cand.user_id, gate, now, ERROR_COOLDOWN_SECS)?;
            return Ok(false);
        }

        self.ctx
            .store
            .settle_sent(&cand.user_id, gate, now, self.config.cooldown_minutes)?;
        tracing::info!(
            user = %cand.user_id,
            idle_minutes = cand.idle_minutes(now),
            "nudge sent"
        );
        Ok(true)
    }
}

#[async_trait]
impl PushJob for NudgeJob {
    fn name(&self) -> &str {
        "nudge"
    }

    fn schedule(&self) -> Schedule {
        Schedule::interval_minutes(self.config.interval_minutes)
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        if self.ctx.quiet.contains(now) {
            tracing::debug!("nudge: quiet hours, skipping tick");
            return Ok(());
        }

        let window = IdleWindow::new(
            self.config.idle_hours as i64 * 3600,
            self.ctx.active_within_secs,
        );
        let gate = self.ctx.gate(PushCategory::Nudge);
        let candidates = self.ctx.store.scan(gate, now, window, self.config.scan_limit)?;
        if candidates.is_empty() {
            return Ok(());
        }

        for cand in &candidates {
            match self.try_one(cand, now).await {
                // at most one nudge per tick
                Ok(true) => break,
                Ok(false) => continue,
                Err(e) => {
                    // one candidate's trouble must not sink the rest
                    tracing::warn!(user = %cand.user_id, "nudge candidate failed: {e}");
                }
            }
        }
        Ok(())
    }
}
