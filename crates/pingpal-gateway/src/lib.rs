//! # PingPal Gateway
//!
//! Small HTTP API the chat service calls into: report user activity,
//! toggle the opt-out flag, inspect a user's gate state. The gateway is
//! the only inbound write path; everything outbound goes through the
//! job drivers.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
