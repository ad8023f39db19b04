//! Routing header assembly.
//!
//! A [`HeaderDescriptor`] is the validated set of `IF_COBA` fields that
//! prefixes every outbound message. It is built from configured
//! [`HeaderFields`] plus metadata derived from the file being sent, and
//! is encoded to bytes by [`crate::rfh2`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HeaderError;

/// Name of the folder that carries the routing fields.
pub const FOLDER_NAME: &str = "IF_COBA";

// ── HeaderField ──────────────────────────────────────────────────

/// Every field the downstream system understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Direction,
    OriginatorApplication,
    Owner,
    UserReference,
    Requestor,
    Responder,
    Service,
    RequestType,
    DeliveryMode,
    DelNotRequest,
    DelNotReceiverDN,
    Compression,
    NRIndicator,
    FileName,
    DuplicateCheckOverride,
}

impl HeaderField {
    /// All fields, in the order they are written to the folder.
    pub const ALL: [HeaderField; 15] = [
        HeaderField::Direction,
        HeaderField::OriginatorApplication,
        HeaderField::Owner,
        HeaderField::UserReference,
        HeaderField::Requestor,
        HeaderField::Responder,
        HeaderField::Service,
        HeaderField::RequestType,
        HeaderField::DeliveryMode,
        HeaderField::DelNotRequest,
        HeaderField::DelNotReceiverDN,
        HeaderField::Compression,
        HeaderField::NRIndicator,
        HeaderField::FileName,
        HeaderField::DuplicateCheckOverride,
    ];

    /// Element name on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::Direction => "Direction",
            Self::OriginatorApplication => "OriginatorApplication",
            Self::Owner => "Owner",
            Self::UserReference => "UserReference",
            Self::Requestor => "Requestor",
            Self::Responder => "Responder",
            Self::Service => "Service",
            Self::RequestType => "RequestType",
            Self::DeliveryMode => "DeliveryMode",
            Self::DelNotRequest => "DelNotRequest",
            Self::DelNotReceiverDN => "DelNotReceiverDN",
            Self::Compression => "Compression",
            Self::NRIndicator => "NRIndicator",
            Self::FileName => "FileName",
            Self::DuplicateCheckOverride => "DuplicateCheckOverride",
        }
    }

    /// Whether a header without this field must be rejected.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::OriginatorApplication
                | Self::Requestor
                | Self::Responder
                | Self::Service
                | Self::RequestType
                | Self::FileName
        )
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── HeaderFields ─────────────────────────────────────────────────

/// Configured header values.
///
/// Every field is optional at the type level so that validation happens in
/// one place, [`build_header`], which knows which ones are required.
/// `FileName` is not configurable; it always comes from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderFields {
    pub direction: Option<String>,
    pub originator_application: Option<String>,
    pub owner: Option<String>,
    pub user_reference: Option<String>,
    pub requestor: Option<String>,
    pub responder: Option<String>,
    pub service: Option<String>,
    pub request_type: Option<String>,
    pub delivery_mode: Option<String>,
    pub del_not_request: Option<String>,
    pub del_not_receiver_dn: Option<String>,
    pub compression: Option<String>,
    pub nr_indicator: Option<String>,
    pub duplicate_check_override: Option<String>,
}

impl HeaderFields {
    /// Configured value for `field`, if any. Blank values count as absent.
    pub fn get(&self, field: HeaderField) -> Option<&str> {
        let value = match field {
            HeaderField::Direction => &self.direction,
            HeaderField::OriginatorApplication => &self.originator_application,
            HeaderField::Owner => &self.owner,
            HeaderField::UserReference => &self.user_reference,
            HeaderField::Requestor => &self.requestor,
            HeaderField::Responder => &self.responder,
            HeaderField::Service => &self.service,
            HeaderField::RequestType => &self.request_type,
            HeaderField::DeliveryMode => &self.delivery_mode,
            HeaderField::DelNotRequest => &self.del_not_request,
            HeaderField::DelNotReceiverDN => &self.del_not_receiver_dn,
            HeaderField::Compression => &self.compression,
            HeaderField::NRIndicator => &self.nr_indicator,
            HeaderField::DuplicateCheckOverride => &self.duplicate_check_override,
            HeaderField::FileName => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

// ── PayloadMetadata ──────────────────────────────────────────────

/// Values derived from the file being forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadMetadata {
    pub file_name: String,
    pub length: u64,
}

// ── HeaderDescriptor ─────────────────────────────────────────────

/// A complete, validated header. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDescriptor {
    entries: Vec<(HeaderField, String)>,
    payload_length: u64,
}

impl HeaderDescriptor {
    /// Present fields in wire order.
    pub fn entries(&self) -> impl Iterator<Item = (HeaderField, &str)> {
        self.entries.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Value of a single field.
    pub fn get(&self, field: HeaderField) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Length of the payload this header describes.
    pub fn payload_length(&self) -> u64 {
        self.payload_length
    }
}

/// Build a header from configured fields and payload metadata.
///
/// Fails on the first required field that is missing, in wire order; no
/// partially populated descriptor is ever returned. Optional fields that
/// are not configured are left out.
pub fn build_header(
    fields: &HeaderFields,
    payload: &PayloadMetadata,
) -> Result<HeaderDescriptor, HeaderError> {
    let mut entries = Vec::with_capacity(HeaderField::ALL.len());

    for field in HeaderField::ALL {
        let value = match field {
            HeaderField::FileName => Some(payload.file_name.as_str())
                .filter(|name| !name.trim().is_empty()),
            other => fields.get(other),
        };

        match value {
            Some(v) => entries.push((field, v.to_string())),
            None if field.is_required() => return Err(HeaderError::MissingField(field)),
            None => {}
        }
    }

    Ok(HeaderDescriptor {
        entries,
        payload_length: payload.length,
    })
}

// ── Tests ────────────────────────────────────────────────────────
