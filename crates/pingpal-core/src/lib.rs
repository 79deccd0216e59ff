//! # PingPal Core
//!
//! Shared types, collaborator traits, error type, and configuration for
//! the PingPal engagement coordinator.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::PingPalConfig;
pub use error::{PingPalError, Result};
