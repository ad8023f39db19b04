//! Per-file work invoked by the poller for every selected, changed file.

use async_trait::async_trait;
use tracing::info;

use crate::delivery::{DeliveryClient, QueueTransport};
use crate::error::{BridgeError, HeaderError};
use crate::fingerprint::Fingerprint;
use crate::header::{HeaderFields, PayloadMetadata, build_header};
use crate::message::{MessageSettings, OutboundMessage};
use crate::selector::CandidateFile;

/// Processes one file. Returns the fingerprint of what was actually
/// delivered, which becomes the poller's dedup reference.
#[async_trait]
pub trait FileHandler: Send + Sync {
    async fn handle(&self, file: &CandidateFile) -> Result<Fingerprint, BridgeError>;
}

// ── DeliveryHandler ──────────────────────────────────────────────

/// Builds the RFH2 header for a file and puts it on the configured queue.
pub struct DeliveryHandler<T> {
    fields: HeaderFields,
    settings: MessageSettings,
    client: DeliveryClient<T>,
}

impl<T: QueueTransport> DeliveryHandler<T> {
    pub fn new(fields: HeaderFields, settings: MessageSettings, client: DeliveryClient<T>) -> Self {
        Self {
            fields,
            settings,
            client,
        }
    }

    /// Build the outbound message for `file` without sending it.
    pub fn prepare(&self, file: &CandidateFile) -> Result<OutboundMessage, HeaderError> {
        let file_name = file
            .file_name()
            .ok_or_else(|| HeaderError::InvalidFileName(file.path.clone()))?;
        let metadata = PayloadMetadata {
            file_name: file_name.to_string(),
            length: file.len,
        };
        let header = build_header(&self.fields, &metadata)?;
        Ok(OutboundMessage::new(file, header, self.settings))
    }
}

#[async_trait]
impl<T: QueueTransport> FileHandler for DeliveryHandler<T> {
    async fn handle(&self, file: &CandidateFile) -> Result<Fingerprint, BridgeError> {
        let message = self.prepare(file)?;
        let report = self.client.deliver(&message).await?;
        info!(
            file = %file.path.display(),
            queue = %self.client.settings().queue,
            bytes = report.payload_bytes,
            header_bytes = report.header_bytes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            fingerprint = %report.fingerprint,
            "file delivered"
        );
        Ok(report.fingerprint)
    }
}
