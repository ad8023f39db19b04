//! Queue protocol frames.
//!
//! ## Wire format
//!
//! Every frame is a fixed 24-byte header followed by its payload
//! (all integers little-endian):
//!
//! ```text
//! magic:          [u8; 4]  "QMB1"
//! kind:           u16      FrameKind
//! flags:          u16      FrameFlags
//! sequence:       u32      request number, echoed by the reply
//! payload_length: u64
//! checksum:       u32      first 4 bytes of blake3(payload), 0 if empty
//! ```
//!
//! Control payloads are bincode-encoded bodies. `PutData` carries raw
//! message bytes and belongs to the put opened by the preceding
//! `PutBegin` on the same connection.

use std::fmt;

use bitflags::bitflags;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::message::MessageDescriptor;

/// Frame preamble.
pub const FRAME_MAGIC: &[u8; 4] = b"QMB1";
/// Size of [`FrameHeader`] on the wire.
pub const FRAME_HEADER_SIZE: usize = 24;
/// Largest payload a single frame may carry (4 MiB).
pub const MAX_FRAME_PAYLOAD: usize = 4 * 1024 * 1024;

// ── FrameKind ────────────────────────────────────────────────────

/// Requests (`0x01..0x7F`) and replies (`0x80..`).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Connect = 0x01,
    Open = 0x02,
    PutBegin = 0x03,
    PutData = 0x04,
    PutEnd = 0x05,
    Close = 0x06,
    Disconnect = 0x07,
    Ack = 0x80,
    Nack = 0x81,
}

impl FrameKind {
    /// Whether the peer answers this request with `Ack`/`Nack`.
    pub fn expects_reply(self) -> bool {
        matches!(
            self,
            Self::Connect | Self::Open | Self::PutEnd | Self::Close
        )
    }
}

impl TryFrom<u16> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Connect),
            0x02 => Ok(Self::Open),
            0x03 => Ok(Self::PutBegin),
            0x04 => Ok(Self::PutData),
            0x05 => Ok(Self::PutEnd),
            0x06 => Ok(Self::Close),
            0x07 => Ok(Self::Disconnect),
            0x80 => Ok(Self::Ack),
            0x81 => Ok(Self::Nack),
            _ => Err(FrameError::UnknownVariant {
                type_name: "FrameKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Per-frame flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u16 {
        /// The sender waits for an `Ack` or `Nack` with the same sequence.
        const REPLY_EXPECTED = 0x0001;
    }
}

// ── FrameHeader ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub flags: FrameFlags,
    pub sequence: u32,
    pub payload_length: u64,
    pub checksum: u32,
}

impl FrameHeader {
    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(FRAME_MAGIC);
        buf[4..6].copy_from_slice(&(self.kind as u16).to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[8..12].copy_from_slice(&self.sequence.to_le_bytes());
        buf[12..20].copy_from_slice(&self.payload_length.to_le_bytes());
        buf[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserialize from the first [`FRAME_HEADER_SIZE`] bytes of `data`.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        let Some(bytes) = data.get(..FRAME_HEADER_SIZE) else {
            return Err(FrameError::Encoding(format!(
                "frame header too short: {} < {FRAME_HEADER_SIZE}",
                data.len()
            )));
        };
        if &bytes[0..4] != FRAME_MAGIC {
            return Err(FrameError::InvalidMagic);
        }

        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[12..20]);

        Ok(Self {
            kind: FrameKind::try_from(u16_at(4))?,
            flags: FrameFlags::from_bits_truncate(u16_at(6)),
            sequence: u32_at(8),
            payload_length: u64::from_le_bytes(length),
            checksum: u32_at(20),
        })
    }
}

/// Truncated blake3 digest used as a frame checksum.
pub fn checksum(payload: &[u8]) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    let digest = blake3::hash(payload);
    let b = digest.as_bytes();
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

// ── Frame ────────────────────────────────────────────────────────

/// A header plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
}

impl Frame {
    /// Build a frame around a raw payload.
    pub fn new(kind: FrameKind, sequence: u32, payload: Bytes) -> Result<Self, FrameError> {
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(FrameError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_PAYLOAD,
            });
        }
        let flags = if kind.expects_reply() {
            FrameFlags::REPLY_EXPECTED
        } else {
            FrameFlags::empty()
        };
        let header = FrameHeader {
            kind,
            flags,
            sequence,
            payload_length: payload.len() as u64,
            checksum: checksum(&payload),
        };
        Ok(Self { header, payload })
    }

    /// Build a frame around a bincode-encoded body.
    pub fn with_body<T: Serialize>(
        kind: FrameKind,
        sequence: u32,
        body: &T,
    ) -> Result<Self, FrameError> {
        let payload = bincode::serialize(body)?;
        Self::new(kind, sequence, Bytes::from(payload))
    }

    /// Reassemble a frame read off the wire, verifying its checksum.
    pub fn from_parts(header: FrameHeader, payload: Bytes) -> Result<Self, FrameError> {
        if checksum(&payload) != header.checksum {
            return Err(FrameError::ChecksumMismatch);
        }
        Ok(Self { header, payload })
    }

    /// Decode the bincode body.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        Ok(bincode::deserialize(&self.payload)?)
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn kind(&self) -> FrameKind {
        self.header.kind
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

// ── Bodies ───────────────────────────────────────────────────────

/// `Connect` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectBody {
    pub queue_manager: String,
    pub channel: String,
    pub user: String,
    pub password: String,
    pub application: String,
}

/// `Open` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBody {
    pub queue: String,
    /// MQOO_* bits.
    pub options: u32,
}

/// `PutBegin` request: descriptor and RFH2 header of the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutBeginBody {
    pub handle: u32,
    pub descriptor: MessageDescriptor,
    pub header: Vec<u8>,
}

/// `PutEnd` and `Close` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleBody {
    pub handle: u32,
}

/// Positive reply. `handle` is meaningful only for `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    pub handle: u32,
}

/// Negative reply with an MQ-style reason code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NackBody {
    pub code: u32,
    pub reason: String,
}

impl fmt::Display for NackBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reason {} ({})", self.code, reason::name(self.code))?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

/// Reason codes carried in [`NackBody`], numbered as MQRC_* values.
pub mod reason {
    pub const NOT_AUTHORIZED: u32 = 2035;
    pub const HANDLE_NOT_AVAILABLE: u32 = 2017;
    pub const UNKNOWN_OBJECT_NAME: u32 = 2085;

    /// Symbolic name of a reason code.
    pub fn name(code: u32) -> &'static str {
        match code {
            NOT_AUTHORIZED => "NOT_AUTHORIZED",
            HANDLE_NOT_AVAILABLE => "HANDLE_NOT_AVAILABLE",
            UNKNOWN_OBJECT_NAME => "UNKNOWN_OBJECT_NAME",
            _ => "UNKNOWN",
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
