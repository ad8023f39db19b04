//! Reference TCP framing (`QMB1`) for loopback and end-to-end tests.
//!
//! Not compatible with any vendor queue manager protocol.

pub mod codec;
pub mod frame;
pub mod tcp;

pub use codec::QueueCodec;
pub use frame::{
    AckBody, ConnectBody, FRAME_HEADER_SIZE, Frame, FrameFlags, FrameHeader, FrameKind,
    HandleBody, MAX_FRAME_PAYLOAD, NackBody, OpenBody, PutBeginBody, reason,
};
pub use tcp::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REPLY_TIMEOUT, TcpSession, TcpTransport};
