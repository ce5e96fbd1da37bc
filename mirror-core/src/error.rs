//! Domain-specific error types for the mirror pipeline.
//!
//! All fallible operations return `Result<T, MirrorError>`.
//! No panics on invalid input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the mirror pipeline.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error, or the stream closed
    /// unexpectedly mid-message.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The connect attempt exceeded its deadline.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    // ── Handshake Errors ─────────────────────────────────────────
    /// The server returned a nonzero security result.
    #[error("authentication rejected by server (security result {0})")]
    AuthenticationFailed(u32),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A message violated the fixed RFB subset this client speaks.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// A pixel buffer could not be interpreted as an image.
    #[error("frame decode failed: {0}")]
    Decode(String),

    // ── Collaborator Errors ──────────────────────────────────────
    /// The device-control sink rejected or failed a command.
    #[error("device command failed: {0}")]
    Device(String),

    /// An mpsc/watch channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for MirrorError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        MirrorError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = MirrorError::AuthenticationFailed(2);
        assert!(e.to_string().contains("security result 2"));

        let e = MirrorError::ProtocolViolation("unexpected message type");
        assert!(e.to_string().contains("unexpected message type"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: MirrorError = io_err.into();
        assert!(matches!(e, MirrorError::Connection(_)));
    }
}
