//! Messaging client seam.
//!
//! The delivery client talks to a queue manager only through these
//! traits. A binding to a real MQ client library implements them for
//! production use. [`crate::wire::TcpTransport`] is a reference transport
//! over the crate's own framing, and tests substitute in-memory doubles.

use std::fmt;

use async_trait::async_trait;
use bitflags::bitflags;
use bytes::Bytes;

use crate::error::DeliveryError;
use crate::message::MessageDescriptor;

// ── Endpoint & Credentials ───────────────────────────────────────

/// Where the queue manager lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub channel: String,
    pub queue_manager: String,
}

impl Endpoint {
    /// `host:port` for socket connects.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({}/{})",
            self.host, self.port, self.queue_manager, self.channel
        )
    }
}

/// Application credentials presented at connect time.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ── Open options ─────────────────────────────────────────────────

bitflags! {
    /// Queue open options, numerically compatible with MQOO_* values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenOptions: u32 {
        /// Open the queue to put messages.
        const OUTPUT = 0x0010;
        /// Fail the open when the queue manager is quiescing.
        const FAIL_IF_QUIESCING = 0x2000;
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::OUTPUT | Self::FAIL_IF_QUIESCING
    }
}

/// Opaque handle of an open queue, valid only within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueHandle(pub u32);

// ── Traits ───────────────────────────────────────────────────────

/// Something that can open sessions with a queue manager.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    type Session: QueueSession;

    /// Establish and authenticate a connection.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Self::Session, DeliveryError>;
}

/// One live connection to a queue manager.
///
/// A message is written as `begin_put`, any number of `put_chunk`, then
/// `end_put`; only `end_put` makes it visible on the queue. Closing the
/// queue or disconnecting with a put still open discards the partial
/// message.
#[async_trait]
pub trait QueueSession: Send {
    async fn open_queue(
        &mut self,
        queue: &str,
        options: OpenOptions,
    ) -> Result<QueueHandle, DeliveryError>;

    async fn begin_put(
        &mut self,
        handle: QueueHandle,
        descriptor: &MessageDescriptor,
        header: Bytes,
    ) -> Result<(), DeliveryError>;

    async fn put_chunk(&mut self, handle: QueueHandle, chunk: Bytes) -> Result<(), DeliveryError>;

    async fn end_put(&mut self, handle: QueueHandle) -> Result<(), DeliveryError>;

    async fn close_queue(&mut self, handle: QueueHandle) -> Result<(), DeliveryError>;

    async fn disconnect(&mut self) -> Result<(), DeliveryError>;
}
