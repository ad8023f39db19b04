//! Delivery of one message per connection.
//!
//! Every call to [`DeliveryClient::deliver`] connects, opens the target
//! queue, streams header and payload, and tears both down again. Nothing
//! is kept warm between poll cycles, so a queue manager restart during an
//! idle period is invisible to the next attempt.

use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::delivery::phase::SessionPhase;
use crate::delivery::transport::{
    Credentials, Endpoint, OpenOptions, QueueHandle, QueueSession, QueueTransport,
};
use crate::error::DeliveryError;
use crate::fingerprint::Fingerprint;
use crate::message::OutboundMessage;

/// Default payload chunk size (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

// ── Settings & results ───────────────────────────────────────────

/// Where and how to deliver.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    /// Target queue name.
    pub queue: String,
    pub open_options: OpenOptions,
    /// Payload bytes per `put_chunk`.
    pub chunk_size: usize,
}

/// What a successful attempt sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Hash of the payload bytes actually written to the queue.
    pub fingerprint: Fingerprint,
    pub payload_bytes: u64,
    pub header_bytes: usize,
    pub elapsed: Duration,
}

/// Outcome of a single delivery attempt.
pub type DeliveryResult = Result<DeliveryReport, DeliveryError>;

// ── DeliveryClient ───────────────────────────────────────────────

/// Puts [`OutboundMessage`]s on a queue through a [`QueueTransport`].
pub struct DeliveryClient<T> {
    transport: T,
    settings: DeliverySettings,
}

impl<T: QueueTransport> DeliveryClient<T> {
    pub fn new(transport: T, settings: DeliverySettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Deliver `message` on a fresh connection.
    ///
    /// Whatever happens after the connection is established, an opened
    /// queue is closed and the connection is released before this returns.
    /// Failures during that cleanup are logged and do not change the
    /// result.
    pub async fn deliver(&self, message: &OutboundMessage) -> DeliveryResult {
        let started = Instant::now();
        let source = message.source();
        let file = tokio::fs::File::open(source)
            .await
            .map_err(|e| read_error(source, e))?;

        let mut phase = SessionPhase::default();
        let mut session = self
            .transport
            .connect(&self.settings.endpoint, &self.settings.credentials)
            .await?;
        debug!(endpoint = %self.settings.endpoint, "connected");

        let mut handle = None;
        let outcome = self
            .put_message(&mut session, &mut phase, &mut handle, message, file)
            .await;
        self.release(&mut session, handle).await;

        match outcome {
            Ok((fingerprint, payload_bytes)) => {
                phase.closed()?;
                Ok(DeliveryReport {
                    fingerprint,
                    payload_bytes,
                    header_bytes: message.header_bytes().len(),
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                debug!(phase = %phase, "delivery attempt unwound");
                phase.force_disconnect();
                Err(e)
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn put_message(
        &self,
        session: &mut T::Session,
        phase: &mut SessionPhase,
        handle_slot: &mut Option<QueueHandle>,
        message: &OutboundMessage,
        file: tokio::fs::File,
    ) -> Result<(Fingerprint, u64), DeliveryError> {
        phase.connected()?;

        let handle = session
            .open_queue(&self.settings.queue, self.settings.open_options)
            .await?;
        *handle_slot = Some(handle);
        phase.queue_opened()?;

        session
            .begin_put(handle, message.descriptor(), message.header_bytes())
            .await?;

        let len = message.payload_length();
        let mut reader = file.take(len);
        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; self.settings.chunk_size.max(1)];
        let mut sent = 0u64;

        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| read_error(message.source(), e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            session
                .put_chunk(handle, Bytes::copy_from_slice(&buf[..n]))
                .await?;
            sent += n as u64;
        }

        // A truncated file must not be committed as a complete message.
        if sent < len {
            return Err(read_error(
                message.source(),
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file shrank from {len} to {sent} bytes"),
                ),
            ));
        }

        session.end_put(handle).await?;
        phase.sent()?;
        Ok((Fingerprint::from_hasher(&hasher), sent))
    }

    async fn release(&self, session: &mut T::Session, handle: Option<QueueHandle>) {
        if let Some(handle) = handle {
            if let Err(e) = session.close_queue(handle).await {
                warn!(queue = %self.settings.queue, error = %e, "closing queue failed");
            }
        }
        if let Err(e) = session.disconnect().await {
            warn!(endpoint = %self.settings.endpoint, error = %e, "disconnect failed");
        }
    }
}

fn read_error(path: &Path, source: std::io::Error) -> DeliveryError {
    DeliveryError::Read {
        path: path.to_path_buf(),
        source,
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HeaderFields, PayloadMetadata, build_header};
    use crate::message::{MessageDescriptor, MessageSettings};
    use crate::selector::CandidateFile;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Connect,
        Open(String),
        Begin,
        Chunk(Vec<u8>),
        End,
        Close,
        Disconnect,
    }

    #[derive(Debug, Clone, Copy, Default)]
    struct Script {
        fail_connect: bool,
        fail_open: bool,
        fail_chunk: bool,
        fail_close: bool,
    }

    struct MockTransport {
        calls: Arc<Mutex<Vec<Call>>>,
        script: Script,
    }

    struct MockSession {
        calls: Arc<Mutex<Vec<Call>>>,
        script: Script,
    }

    impl MockSession {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl QueueTransport for MockTransport {
        type Session = MockSession;

        async fn connect(
            &self,
            endpoint: &Endpoint,
            _credentials: &Credentials,
        ) -> Result<MockSession, DeliveryError> {
            self.calls.lock().unwrap().push(Call::Connect);
            if self.script.fail_connect {
                return Err(DeliveryError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: "refused".into(),
                });
            }
            Ok(MockSession {
                calls: Arc::clone(&self.calls),
                script: self.script,
            })
        }
    }

    #[async_trait]
    impl QueueSession for MockSession {
        async fn open_queue(
            &mut self,
            queue: &str,
            _options: OpenOptions,
        ) -> Result<QueueHandle, DeliveryError> {
            self.record(Call::Open(queue.to_string()));
            if self.script.fail_open {
                return Err(DeliveryError::QueueAccess {
                    queue: queue.to_string(),
                    reason: "unknown object name".into(),
                });
            }
            Ok(QueueHandle(7))
        }

        async fn begin_put(
            &mut self,
            _handle: QueueHandle,
            _descriptor: &MessageDescriptor,
            _header: Bytes,
        ) -> Result<(), DeliveryError> {
            self.record(Call::Begin);
            Ok(())
        }

        async fn put_chunk(
            &mut self,
            _handle: QueueHandle,
            chunk: Bytes,
        ) -> Result<(), DeliveryError> {
            self.record(Call::Chunk(chunk.to_vec()));
            if self.script.fail_chunk {
                return Err(DeliveryError::Send("connection reset".into()));
            }
            Ok(())
        }

        async fn end_put(&mut self, _handle: QueueHandle) -> Result<(), DeliveryError> {
            self.record(Call::End);
            Ok(())
        }

        async fn close_queue(&mut self, _handle: QueueHandle) -> Result<(), DeliveryError> {
            self.record(Call::Close);
            if self.script.fail_close {
                return Err(DeliveryError::Send("close rejected".into()));
            }
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), DeliveryError> {
            self.record(Call::Disconnect);
            Ok(())
        }
    }

    fn client(
        script: Script,
        chunk_size: usize,
    ) -> (DeliveryClient<MockTransport>, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let transport = MockTransport {
            calls: Arc::clone(&calls),
            script,
        };
        let settings = DeliverySettings {
            endpoint: Endpoint {
                host: "localhost".into(),
                port: 1414,
                channel: "CH".into(),
                queue_manager: "QM1".into(),
            },
            credentials: Credentials::default(),
            queue: "IF.IN".into(),
            open_options: OpenOptions::default(),
            chunk_size,
        };
        (DeliveryClient::new(transport, settings), calls)
    }

    fn message_for(path: &Path, len: u64) -> OutboundMessage {
        let file = CandidateFile {
            path: path.to_path_buf(),
            modified: SystemTime::now(),
            len,
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
            file_name: "payload.txt".into(),
            length: len,
        };
        OutboundMessage::new(
            &file,
            build_header(&fields, &meta).unwrap(),
            MessageSettings::default(),
        )
    }

    fn payload_file(dir: &TempDir, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("payload.txt");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn streams_payload_in_chunks_and_releases() {
        let dir = TempDir::new().unwrap();
        let path = payload_file(&dir, b"hello world");
        let (client, calls) = client(Script::default(), 4);

        let report = client.deliver(&message_for(&path, 11)).await.unwrap();
        assert_eq!(report.payload_bytes, 11);
        assert_eq!(report.fingerprint, Fingerprint::of(b"hello world"));

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Connect,
                Call::Open("IF.IN".into()),
                Call::Begin,
                Call::Chunk(b"hell".to_vec()),
                Call::Chunk(b"o wo".to_vec()),
                Call::Chunk(b"rld".to_vec()),
                Call::End,
                Call::Close,
                Call::Disconnect,
            ]
        );
    }

    #[tokio::test]
    async fn open_failure_disconnects_without_close() {
        let dir = TempDir::new().unwrap();
        let path = payload_file(&dir, b"X");
        let script = Script {
            fail_open: true,
            ..Default::default()
        };
        let (client, calls) = client(script, 4);

        let err = client.deliver(&message_for(&path, 1)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::QueueAccess { .. }));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Call::Connect, Call::Open("IF.IN".into()), Call::Disconnect]
        );
    }

    #[tokio::test]
    async fn send_failure_closes_queue_and_connection() {
        let dir = TempDir::new().unwrap();
        let path = payload_file(&dir, b"payload");
        let script = Script {
            fail_chunk: true,
            ..Default::default()
        };
        let (client, calls) = client(script, 4);

        let err = client.deliver(&message_for(&path, 7)).await.unwrap_err();
        assert_eq!(err.stage(), "send");

        let calls = calls.lock().unwrap();
        assert!(!calls.contains(&Call::End));
        assert_eq!(calls[calls.len() - 2..], [Call::Close, Call::Disconnect]);
    }

    #[tokio::test]
    async fn connect_failure_touches_nothing_else() {
        let dir = TempDir::new().unwrap();
        let path = payload_file(&dir, b"X");
        let script = Script {
            fail_connect: true,
            ..Default::default()
        };
        let (client, calls) = client(script, 4);

        let err = client.deliver(&message_for(&path, 1)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Connect { .. }));
        assert_eq!(*calls.lock().unwrap(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn close_failure_is_not_propagated() {
        let dir = TempDir::new().unwrap();
        let path = payload_file(&dir, b"X");
        let script = Script {
            fail_close: true,
            ..Default::default()
        };
        let (client, calls) = client(script, 4);

        tokio_test::assert_ok!(client.deliver(&message_for(&path, 1)).await);
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Disconnect));
    }

    #[tokio::test]
    async fn truncated_file_is_never_committed() {
        let dir = TempDir::new().unwrap();
        let path = payload_file(&dir, b"short");
        let (client, calls) = client(Script::default(), 4);

        let err = client.deliver(&message_for(&path, 50)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Read { .. }));

        let calls = calls.lock().unwrap();
        assert!(!calls.contains(&Call::End));
        assert!(calls.contains(&Call::Close));
        assert_eq!(calls.last(), Some(&Call::Disconnect));
    }

    #[tokio::test]
    async fn missing_file_fails_before_connecting() {
        let dir = TempDir::new().unwrap();
        let (client, calls) = client(Script::default(), 4);

        let err = client
            .deliver(&message_for(&dir.path().join("gone.txt"), 1))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "read");
        assert!(calls.lock().unwrap().is_empty());
    }
}
