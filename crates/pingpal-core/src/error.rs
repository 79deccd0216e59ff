//! Unified error types for PingPal.

use thiserror::Error;

/// Result type alias using PingPalError.
pub type Result<T> = std::result::Result<T, PingPalError>;

#[derive(Error, Debug)]
pub enum PingPalError {
    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    // Collaborator errors
    #[error("Content generator error: {0}")]
    Generator(String),

    #[error("Content source error: {0}")]
    Source(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    // Scheduler errors
    #[error("Schedule error: {0}")]
    Schedule(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PingPalError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn generator(msg: impl Into<String>) -> Self {
        Self::Generator(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PingPalError::Store("locked".into());
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_error_constructors() {
        let e1 = PingPalError::store("test");
        assert!(matches!(e1, PingPalError::Store(_)));

        let e2 = PingPalError::delivery("test");
        assert!(matches!(e2, PingPalError::Delivery(_)));

        let e3 = PingPalError::generator("test");
        assert!(matches!(e3, PingPalError::Generator(_)));

        let e4 = PingPalError::config("test");
        assert!(matches!(e4, PingPalError::Config(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PingPalError = io_err.into();
        assert!(matches!(err, PingPalError::Io(_)));
    }
}
