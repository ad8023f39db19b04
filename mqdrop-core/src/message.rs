//! Outbound message model.
//!
//! An [`OutboundMessage`] pairs the encoded RFH2 header with a reference to
//! the payload on disk. The payload itself is streamed at send time, so a
//! message never holds more than its header in memory.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::header::HeaderDescriptor;
use crate::rfh2;
use crate::selector::CandidateFile;

/// Format name announcing an RFH2 header at the start of the body.
pub const FORMAT_RFH2: &str = "MQHRF2  ";

/// Application name stamped on every message.
pub const PUT_APPLICATION: &str = "mqdrop";

// ── MessageType ──────────────────────────────────────────────────

/// MQ message type. The bridge sends fire-and-forget datagrams only.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Datagram = 8,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Datagram => write!(f, "Datagram"),
        }
    }
}

// ── MessageSettings ──────────────────────────────────────────────

/// Per-deployment message properties taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSettings {
    /// Coded character set id of the payload.
    pub ccsid: i32,
    /// MQ encoding value of the payload and header integers.
    pub encoding: i32,
    /// Ask the queue manager to persist the message.
    pub persistent: bool,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            ccsid: rfh2::NAME_VALUE_CCSID,
            encoding: rfh2::ENCODING_NATIVE,
            persistent: true,
        }
    }
}

// ── MessageDescriptor ────────────────────────────────────────────

/// Message-level metadata sent ahead of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub format: String,
    pub message_type: MessageType,
    pub persistent: bool,
    pub ccsid: i32,
    pub encoding: i32,
    pub put_application: String,
    /// Header plus payload length in bytes.
    pub body_length: u64,
    /// Name of the source file, for tracing on the consumer side.
    pub source_name: String,
}

// ── OutboundMessage ──────────────────────────────────────────────

/// One file ready to be put on a queue. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    descriptor: MessageDescriptor,
    header: HeaderDescriptor,
    header_bytes: Bytes,
    source: PathBuf,
}

impl OutboundMessage {
    /// Assemble a message for `file` with an already validated header.
    pub fn new(file: &CandidateFile, header: HeaderDescriptor, settings: MessageSettings) -> Self {
        let header_bytes = rfh2::encode(&header, settings.encoding, settings.ccsid);
        let descriptor = MessageDescriptor {
            format: FORMAT_RFH2.to_string(),
            message_type: MessageType::Datagram,
            persistent: settings.persistent,
            ccsid: settings.ccsid,
            encoding: settings.encoding,
            put_application: PUT_APPLICATION.to_string(),
            body_length: header_bytes.len() as u64 + header.payload_length(),
            source_name: file.file_name().unwrap_or_default().to_string(),
        };

        Self {
            descriptor,
            header,
            header_bytes,
            source: file.path.clone(),
        }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub fn header(&self) -> &HeaderDescriptor {
        &self.header
    }

    /// Encoded RFH2 block; cheap to clone.
    pub fn header_bytes(&self) -> Bytes {
        self.header_bytes.clone()
    }

    /// File the payload is streamed from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of payload bytes that will follow the header.
    pub fn payload_length(&self) -> u64 {
        self.header.payload_length()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HeaderFields, PayloadMetadata, build_header};
    use std::time::SystemTime;

    fn message() -> OutboundMessage {
        let file = CandidateFile {
            path: PathBuf::from("/in/order-1.xml"),
            modified: SystemTime::UNIX_EPOCH,
            len: 128,
        };
        let fields = HeaderFields {
            originator_application: Some("COW01".into()),
            requestor: Some("o=a".into()),
            responder: Some("o=b".into()),
            service: Some("svc".into()),
            request_type: Some("rt".into()),
            ..Default::default()
        };
        let meta = PayloadMetadata {
            file_name: "order-1.xml".into(),
            length: file.len,
        };
        let header = build_header(&fields, &meta).unwrap();
        OutboundMessage::new(&file, header, MessageSettings::default())
    }

    #[test]
    fn descriptor_describes_rfh2_datagram() {
        let msg = message();
        let d = msg.descriptor();
        assert_eq!(d.format, FORMAT_RFH2);
        assert_eq!(d.message_type, MessageType::Datagram);
        assert_eq!(d.ccsid, 1208);
        assert_eq!(d.source_name, "order-1.xml");
        assert_eq!(d.body_length, msg.header_bytes().len() as u64 + 128);
    }

    #[test]
    fn header_bytes_start_with_struc_id() {
        let msg = message();
        assert_eq!(&msg.header_bytes()[..4], rfh2::STRUC_ID);
        assert_eq!(msg.payload_length(), 128);
        assert_eq!(msg.source(), Path::new("/in/order-1.xml"));
    }

    #[test]
    fn message_type_display() {
        assert_eq!(MessageType::Datagram.to_string(), "Datagram");
    }
}
