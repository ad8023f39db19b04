//! Domain-specific error types for the bridge.
//!
//! Every stage of a poll cycle reports failure through one of these
//! enums; nothing in the pipeline panics on bad input or a dead peer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::header::HeaderField;

// ── HeaderError ──────────────────────────────────────────────────

/// Failure to assemble a message header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// A required field was absent or blank.
    #[error("missing required header field: {0}")]
    MissingField(HeaderField),

    /// The source file name cannot be carried in the header.
    #[error("file name is not valid UTF-8: {0}")]
    InvalidFileName(PathBuf),
}

// ── DeliveryError ────────────────────────────────────────────────

/// Failure of a single delivery attempt.
///
/// Each variant maps to the session stage that failed, so the poll loop
/// can log where an attempt broke down.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The queue manager could not be reached or refused the credentials.
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The target queue does not exist or may not be opened for output.
    #[error("cannot open queue {queue}: {reason}")]
    QueueAccess { queue: String, reason: String },

    /// The transport failed while a message was being written.
    #[error("send failed: {0}")]
    Send(String),

    /// The payload could not be read back from disk.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The peer did not answer in time.
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    /// A session method was called out of order.
    #[error("session protocol violation: {0}")]
    Protocol(&'static str),
}

impl DeliveryError {
    /// Short name of the stage that failed, for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::QueueAccess { .. } => "open",
            Self::Send(_) => "send",
            Self::Read { .. } => "read",
            Self::Timeout { stage, .. } => *stage,
            Self::Protocol(_) => "session",
        }
    }
}

// ── FrameError ───────────────────────────────────────────────────

/// Errors raised by the queue wire codec.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Received bytes that do not start with the frame magic.
    #[error("invalid magic bytes: expected QMB1")]
    InvalidMagic,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The frame payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A payload could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Box<bincode::ErrorKind>> for FrameError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        FrameError::Encoding(e.to_string())
    }
}

// ── BridgeError ──────────────────────────────────────────────────

/// The error a [`FileHandler`](crate::handler::FileHandler) reports back
/// to the poll loop.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The header could not be built from configuration and file metadata.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// The message could not be delivered.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl BridgeError {
    /// Short name of the failing stage.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Delivery(e) => e.stage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = HeaderError::MissingField(HeaderField::Service);
        assert_eq!(e.to_string(), "missing required header field: Service");

        let e = FrameError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn stage_names() {
        let e = DeliveryError::QueueAccess {
            queue: "IN".into(),
            reason: "2085".into(),
        };
        assert_eq!(e.stage(), "open");

        let e: BridgeError = DeliveryError::Timeout {
            stage: "connect",
            after: Duration::from_secs(1),
        }
        .into();
        assert_eq!(e.stage(), "connect");

        let e: BridgeError = HeaderError::MissingField(HeaderField::Requestor).into();
        assert_eq!(e.stage(), "header");
    }

    #[test]
    fn frame_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: FrameError = io_err.into();
        assert!(matches!(e, FrameError::Io(_)));
    }
}
