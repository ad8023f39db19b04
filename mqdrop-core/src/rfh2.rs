//! RFH2 header encoding.
//!
//! ## Wire format
//!
//! ```text
//! StrucId:          [u8; 4]  "RFH "
//! Version:          i32      2
//! StrucLength:      i32      fixed part + name/value block
//! Encoding:         i32      encoding of the payload that follows
//! CodedCharSetId:   i32      CCSID of the payload that follows
//! Format:           [u8; 8]  format of the payload (blank = none)
//! Flags:            i32      0
//! NameValueCCSID:   i32      1208 (UTF-8)
//! NameValueLength:  i32      length of NameValueData
//! NameValueData:    [u8]     <IF_COBA>…</IF_COBA>, space padded to 4
//! ```
//!
//! Integers follow the message encoding: big-endian unless the integer
//! nibble of `encoding` selects reversed (little-endian) order.

use bytes::{BufMut, Bytes, BytesMut};

use crate::header::{FOLDER_NAME, HeaderDescriptor};

/// Structure identifier.
pub const STRUC_ID: &[u8; 4] = b"RFH ";
/// Only version 2 is produced.
pub const VERSION_2: i32 = 2;
/// Size of the fixed part, up to and including `NameValueCCSID`.
pub const FIXED_LENGTH: usize = 36;
/// The name/value block is always UTF-8.
pub const NAME_VALUE_CCSID: i32 = 1208;
/// Payload format "none": the payload is opaque bytes.
pub const FORMAT_NONE: &[u8; 8] = b"        ";
/// Big-endian integers, the usual setting for Java-hosted consumers.
pub const ENCODING_NATIVE: i32 = 273;

const INTEGER_MASK: i32 = 0x0F;
const INTEGER_REVERSED: i32 = 0x02;

// ── IntegerOrder ─────────────────────────────────────────────────

/// Byte order of integer fields, derived from an MQ encoding value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerOrder {
    /// Big-endian.
    Normal,
    /// Little-endian.
    Reversed,
}

impl IntegerOrder {
    pub fn of(encoding: i32) -> Self {
        if encoding & INTEGER_MASK == INTEGER_REVERSED {
            Self::Reversed
        } else {
            Self::Normal
        }
    }

    fn put(self, buf: &mut BytesMut, value: i32) {
        match self {
            Self::Normal => buf.put_i32(value),
            Self::Reversed => buf.put_i32_le(value),
        }
    }
}

// ── Encoding ─────────────────────────────────────────────────────

/// Encode `header` as an RFH2 block describing a payload in `encoding`
/// and `ccsid`.
pub fn encode(header: &HeaderDescriptor, encoding: i32, ccsid: i32) -> Bytes {
    let mut folder = folder_xml(header).into_bytes();
    let padded = folder.len().next_multiple_of(4);
    folder.resize(padded, b' ');

    let struc_length = FIXED_LENGTH + 4 + folder.len();
    let order = IntegerOrder::of(encoding);

    let mut buf = BytesMut::with_capacity(struc_length);
    buf.put_slice(STRUC_ID);
    order.put(&mut buf, VERSION_2);
    order.put(&mut buf, struc_length as i32);
    order.put(&mut buf, encoding);
    order.put(&mut buf, ccsid);
    buf.put_slice(FORMAT_NONE);
    order.put(&mut buf, 0);
    order.put(&mut buf, NAME_VALUE_CCSID);
    order.put(&mut buf, folder.len() as i32);
    buf.put_slice(&folder);
    buf.freeze()
}

fn folder_xml(header: &HeaderDescriptor) -> String {
    let mut xml = format!("<{FOLDER_NAME}>");
    for (field, value) in header.entries() {
        let name = field.name();
        xml.push_str(&format!("<{name}>{}</{name}>", escape(value)));
    }
    xml.push_str(&format!("</{FOLDER_NAME}>"));
    xml
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HeaderFields, PayloadMetadata, build_header};

    fn header(service: &str) -> HeaderDescriptor {
        let fields = HeaderFields {
            direction: Some("Input".into()),
            originator_application: Some("COW01".into()),
            requestor: Some("o=cobadeff,o=swift".into()),
            responder: Some("o=ebapfrpp,o=swift".into()),
            service: Some(service.into()),
            request_type: Some("pacs.xxx".into()),
            ..Default::default()
        };
        let meta = PayloadMetadata {
            file_name: "a.xml".into(),
            length: 10,
        };
        build_header(&fields, &meta).unwrap()
    }

    fn read_i32_be(bytes: &[u8], at: usize) -> i32 {
        i32::from_be_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn fixed_part_layout() {
        let bytes = encode(&header("eba.step2!pu1"), ENCODING_NATIVE, 1208);

        assert_eq!(&bytes[0..4], STRUC_ID);
        assert_eq!(read_i32_be(&bytes, 4), VERSION_2);
        assert_eq!(read_i32_be(&bytes, 8) as usize, bytes.len());
        assert_eq!(read_i32_be(&bytes, 12), ENCODING_NATIVE);
        assert_eq!(read_i32_be(&bytes, 16), 1208);
        assert_eq!(&bytes[20..28], FORMAT_NONE);
        assert_eq!(read_i32_be(&bytes, 28), 0);
        assert_eq!(read_i32_be(&bytes, 32), NAME_VALUE_CCSID);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn folder_carries_fields_in_order() {
        let bytes = encode(&header("eba.step2!pu1"), ENCODING_NATIVE, 1208);
        let len = read_i32_be(&bytes, 36) as usize;
        let folder = std::str::from_utf8(&bytes[40..40 + len]).unwrap().trim_end();

        assert!(folder.starts_with("<IF_COBA><Direction>Input</Direction>"));
        assert!(folder.contains("<Service>eba.step2!pu1</Service>"));
        assert!(folder.ends_with("<FileName>a.xml</FileName></IF_COBA>"));
        assert!(folder.find("<Requestor>").unwrap() < folder.find("<Responder>").unwrap());
    }

    #[test]
    fn values_are_escaped() {
        let bytes = encode(&header("a&b<c>"), ENCODING_NATIVE, 1208);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("<Service>a&amp;b&lt;c&gt;</Service>"));
    }

    #[test]
    fn reversed_encoding_writes_little_endian() {
        assert_eq!(IntegerOrder::of(546), IntegerOrder::Reversed);
        assert_eq!(IntegerOrder::of(273), IntegerOrder::Normal);

        let bytes = encode(&header("svc"), 546, 819);
        assert_eq!(&bytes[4..8], &2i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &819i32.to_le_bytes());
    }
}
