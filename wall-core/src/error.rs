//! Domain-specific error types for the wall client.
//!
//! All fallible operations return `Result<T, WallError>`.
//! Inbound decoding is tolerant and never produces an error; these
//! variants cover encoding, configuration and the connection lifecycle.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the wall client.
#[derive(Debug, Error)]
pub enum WallError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A wire value did not map to any known enum variant.
    #[error("unknown {type_name} value: {value}")]
    UnknownVariant {
        type_name: &'static str,
        value: String,
    },

    /// A draw grid had the wrong number of pixels.
    #[error("invalid grid: expected {expected} pixels, got {actual}")]
    InvalidGrid { expected: usize, actual: usize },

    /// A message violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The wall answered the connect request with a non-success status.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The peer closed the stream without sending `disconnect`.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// `start()` was called while a session task is still running.
    #[error("a session is already active")]
    SessionActive,

    /// `start()` was called outside of a Tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a message failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value is out of range or malformed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for WallError {
    fn from(s: String) -> Self {
        WallError::Other(s)
    }
}

impl From<serde_json::Error> for WallError {
    fn from(e: serde_json::Error) -> Self {
        WallError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = WallError::InvalidGrid {
            expected: 160,
            actual: 12,
        };
        assert!(e.to_string().contains("160"));
        assert!(e.to_string().contains("12"));

        let e = WallError::HandshakeRejected(r#"{"status":"failure"}"#.into());
        assert!(e.to_string().contains("failure"));
    }

    #[test]
    fn from_string() {
        let e: WallError = format!("stone {} missing", 7).into();
        assert!(matches!(e, WallError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: WallError = io_err.into();
        assert!(matches!(e, WallError::Connection(_)));
    }

    #[test]
    fn from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: WallError = json_err.into();
        assert!(matches!(e, WallError::Encoding(_)));
    }
}
