//! Per-attempt session state machine.
//!
//! Tracks how far a delivery attempt got so cleanup releases exactly the
//! resources that were acquired. Transitions return `Result` instead of
//! panicking.

use crate::error::DeliveryError;

// ── SessionPhase ─────────────────────────────────────────────────

/// The phase of one delivery attempt.
///
/// ```text
///  Disconnected ──► Connected ──► QueueOpen ──► Sent ──► Closed
///       ▲               │             │           │
///       └───────────────┴─────────────┴───────────┘  (failure / cleanup)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No connection held. Initial state and the state after a failure.
    #[default]
    Disconnected,

    /// Connected to the queue manager.
    Connected,

    /// The target queue is open for output.
    QueueOpen,

    /// The message was accepted by the queue manager.
    Sent,

    /// Queue closed and connection released after a successful send.
    Closed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::QueueOpen => write!(f, "QueueOpen"),
            Self::Sent => write!(f, "Sent"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl SessionPhase {
    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`.
    pub fn connected(&mut self) -> Result<(), DeliveryError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connected;
                Ok(())
            }
            _ => Err(DeliveryError::Protocol(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Valid from: `Connected`.
    pub fn queue_opened(&mut self) -> Result<(), DeliveryError> {
        match self {
            Self::Connected => {
                *self = Self::QueueOpen;
                Ok(())
            }
            _ => Err(DeliveryError::Protocol(
                "cannot open queue: not in Connected state",
            )),
        }
    }

    /// Valid from: `QueueOpen`.
    pub fn sent(&mut self) -> Result<(), DeliveryError> {
        match self {
            Self::QueueOpen => {
                *self = Self::Sent;
                Ok(())
            }
            _ => Err(DeliveryError::Protocol("cannot send: queue is not open")),
        }
    }

    /// Valid from: `Sent`.
    pub fn closed(&mut self) -> Result<(), DeliveryError> {
        match self {
            Self::Sent => {
                *self = Self::Closed;
                Ok(())
            }
            _ => Err(DeliveryError::Protocol(
                "cannot close cleanly: nothing was sent",
            )),
        }
    }

    /// Reset to `Disconnected` after cleanup of a failed attempt.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
