//! # PingPal Jobs
//!
//! The five push job drivers. Every driver is the same machine over the
//! store's primitives — scan, claim, delegate to the generator, settle —
//! they differ only in schedule, eligibility rules, and which extra
//! bookkeeping (dedup fingerprints, calendar marks) applies.
//!
//! Per (user, gate) the lifecycle is: Idle → Locked (claim held,
//! generation in flight) → Cooling (settled) → Idle. A crashed Locked
//! state falls back to Idle when the lock elapses; Disabled sits outside
//! the cycle until the user toggles back in.

pub mod articles;
pub mod digest;
pub mod driver;
pub mod market;
pub mod nudge;
pub mod weather;

pub use articles::ArticlesJob;
pub use digest::DigestJob;
pub use driver::{JobCtx, QuietHours, idle_threshold_minutes};
pub use market::MarketJob;
pub use nudge::NudgeJob;
pub use weather::WeatherJob;
