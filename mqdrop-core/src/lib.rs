//! # mqdrop-core
//!
//! Moves files from a watched directory onto a message queue, one file per
//! poll cycle, oldest first.
//!
//! This crate contains:
//! - **Selection**: `select_oldest` picks the oldest settled regular file
//! - **Dedup**: `Fingerprint` and `has_changed` skip content already delivered
//! - **Header**: `build_header` validates the `IF_COBA` fields, `rfh2` encodes them
//! - **Delivery**: `DeliveryClient` over the `QueueTransport` seam, one connection per file
//! - **Wire**: reference `TcpTransport` over `QueueCodec` frames, for loopback use
//! - **Poll loop**: `Poller` driving a `FileHandler`, with post-delivery `Disposition`
//! - **Error**: `BridgeError` and friends, `thiserror`-based

pub mod delivery;
pub mod disposition;
pub mod error;
pub mod fingerprint;
pub mod handler;
pub mod header;
pub mod message;
pub mod poller;
pub mod rfh2;
pub mod selector;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use delivery::{
    Credentials, DeliveryClient, DeliveryReport, DeliveryResult, DeliverySettings, Endpoint,
    OpenOptions, QueueHandle, QueueSession, QueueTransport, SessionPhase,
};
pub use disposition::Disposition;
pub use error::{BridgeError, DeliveryError, FrameError, HeaderError};
pub use fingerprint::{Fingerprint, fingerprint_file, has_changed};
pub use handler::{DeliveryHandler, FileHandler};
pub use header::{HeaderDescriptor, HeaderField, HeaderFields, PayloadMetadata, build_header};
pub use message::{MessageDescriptor, MessageSettings, MessageType, OutboundMessage};
pub use poller::{CycleOutcome, PollStats, Poller, PollerConfig};
pub use selector::{CandidateFile, SelectOutcome, select_oldest};
pub use wire::{QueueCodec, TcpTransport};
