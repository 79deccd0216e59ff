//! # PingPal Scheduler
//!
//! Ultra-lightweight timer engine for the push jobs. No cron daemon, no
//! message broker — tokio timers only, zero overhead when idle.
//!
//! ## Architecture
//! ```text
//! Engine
//!   ├── timer task per job: sleep until Schedule::next_fire → send index
//!   └── dispatch loop (single consumer): runs ticks strictly in sequence
//!       ├── nudge     (interval, every 5min)
//!       ├── articles  (interval, every 6min)
//!       ├── weather   (daily 08:20)
//!       ├── digest    (weekly sun 20:30)
//!       └── market    (daily 16:30)
//! ```
//!
//! The single-consumer dispatch keeps the process cooperative: two jobs
//! never mutate the store at the same instant from this process, and
//! cross-process safety is the store's job anyway.

pub mod engine;
pub mod schedule;

pub use engine::{Engine, PushJob};
pub use schedule::{Schedule, parse_weekday};
