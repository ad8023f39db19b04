//! Queue delivery: the transport seam, the per-attempt session phase, and
//! the client that drives one message through a fresh connection.

pub mod client;
pub mod phase;
pub mod transport;

pub use client::{
    DEFAULT_CHUNK_SIZE, DeliveryClient, DeliveryReport, DeliveryResult, DeliverySettings,
};
pub use phase::SessionPhase;
pub use transport::{
    Credentials, Endpoint, OpenOptions, QueueHandle, QueueSession, QueueTransport,
};
