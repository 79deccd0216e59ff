//! Timer tasks + single-consumer dispatch loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

use pingpal_core::error::Result;

use crate::schedule::Schedule;

/// A periodic push job. One tick = one scan/claim/settle pass.
#[async_trait]
pub trait PushJob: Send + Sync {
    fn name(&self) -> &str;
    fn schedule(&self) -> Schedule;
    async fn tick(&self, now: DateTime<Utc>) -> Result<()>;
}

/// Runs registered jobs on their schedules. Each job gets a timer task
/// that sends its index over a channel; a single dispatch loop executes
/// ticks strictly sequentially, so a slow tick delays — never overlaps —
/// the others in this process.
pub struct Engine {
    jobs: Vec<Arc<dyn PushJob>>,
    /// Max random startup delay per timer task, to spread job phases
    /// after a process restart.
    start_jitter_secs: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self { jobs: Vec::new(), start_jitter_secs: 20 }
    }

    pub fn with_start_jitter(mut self, secs: u64) -> Self {
        self.start_jitter_secs = secs;
        self
    }

    pub fn register(&mut self, job: Arc<dyn PushJob>) {
        tracing::info!(job = job.name(), "registered push job");
        self.jobs.push(job);
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run until every timer task stops (i.e. forever in practice).
    pub async fn run(self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<usize>(64);

        for (idx, job) in self.jobs.iter().enumerate() {
            let tx = tx.clone();
            let schedule = job.schedule();
            let name = job.name().to_string();
            let jitter = if self.start_jitter_secs > 0 {
                use rand::Rng;
                rand::thread_rng().gen_range(0..=self.start_jitter_secs)
            } else {
                0
            };

            tokio::spawn(async move {
                if jitter > 0 {
                    tokio::time::sleep(std::time::Duration::from_secs(jitter)).await;
                }
                loop {
                    let now = Utc::now();
                    let next = schedule.next_fire(now);
                    let wait = (next - now).to_std().unwrap_or_default();
                    tracing::debug!(job = %name, fire_at = %next, "timer armed");
                    tokio::time::sleep(wait).await;
                    if tx.send(idx).await.is_err() {
                        break; // engine dropped
                    }
                }
            });
        }
        drop(tx);

        while let Some(idx) = rx.recv().await {
            let job = &self.jobs[idx];
            let now = Utc::now();
            if let Err(e) = job.tick(now).await {
                // a failed tick is never fatal; the next fire retries
                tracing::warn!(job = job.name(), "tick failed: {e}");
            }
        }
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
