//! Unified error types for CourseCast.

use thiserror::Error;

/// Result type alias using CastError.
pub type Result<T> = std::result::Result<T, CastError>;

#[derive(Error, Debug)]
pub enum CastError {
    // Transport / session errors
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport not ready: {0}")]
    NotReady(String),

    #[error("Send failed: {0}")]
    Send(String),

    // Feed errors
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    // Media staging errors
    #[error("Staging error: {0}")]
    Staging(String),

    // Scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CastError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging(msg.into())
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
        let err = CastError::Fetch("timeout".into());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_constructors() {
        let e1 = CastError::connection("test");
        assert!(matches!(e1, CastError::Connection(_)));

        let e2 = CastError::send("test");
        assert!(matches!(e2, CastError::Send(_)));

        let e3 = CastError::staging("test");
        assert!(matches!(e3, CastError::Staging(_)));

        let e4 = CastError::not_ready("test");
        assert!(matches!(e4, CastError::NotReady(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CastError = io_err.into();
        assert!(matches!(err, CastError::Io(_)));
    }
}
