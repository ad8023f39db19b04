//! Reference [`QueueTransport`] over TCP using [`QueueCodec`] frames.
//!
//! This is a loopback/test transport for the crate's own `QMB1` framing,
//! not a client for an existing queue manager product. A real MQ client
//! binding plugs in behind [`QueueTransport`] instead.
//!
//! Requests that change queue manager state (`Connect`, `Open`, `PutEnd`,
//! `Close`) wait for an `Ack`/`Nack` carrying the same sequence number.
//! `PutBegin` and `PutData` are pipelined; a rejected put surfaces at
//! `PutEnd`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::delivery::transport::{
    Credentials, Endpoint, OpenOptions, QueueHandle, QueueSession, QueueTransport,
};
use crate::error::{DeliveryError, FrameError};
use crate::message::{MessageDescriptor, PUT_APPLICATION};
use crate::wire::codec::QueueCodec;
use crate::wire::frame::{
    AckBody, ConnectBody, Frame, FrameKind, HandleBody, NackBody, OpenBody, PutBeginBody,
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

// ── TcpTransport ─────────────────────────────────────────────────

/// Opens one TCP connection per session.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransport {
    connect_timeout: Duration,
    reply_timeout: Duration,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration, reply_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            reply_timeout,
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REPLY_TIMEOUT)
    }
}

#[async_trait]
impl QueueTransport for TcpTransport {
    type Session = TcpSession;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<TcpSession, DeliveryError> {
        let connect_error = |reason: String| DeliveryError::Connect {
            endpoint: endpoint.to_string(),
            reason,
        };

        let stream = match timeout(self.connect_timeout, TcpStream::connect(endpoint.address()))
            .await
        {
            Err(_) => {
                return Err(DeliveryError::Timeout {
                    stage: "connect",
                    after: self.connect_timeout,
                });
            }
            Ok(Err(e)) => return Err(connect_error(e.to_string())),
            Ok(Ok(stream)) => stream,
        };
        if let Err(e) = stream.set_nodelay(true) {
            trace!(error = %e, "TCP_NODELAY not applied");
        }

        let mut session = TcpSession {
            framed: Framed::new(stream, QueueCodec),
            sequence: 0,
            reply_timeout: self.reply_timeout,
        };

        let body = ConnectBody {
            queue_manager: endpoint.queue_manager.clone(),
            channel: endpoint.channel.clone(),
            user: credentials.user.clone(),
            password: credentials.password.clone(),
            application: PUT_APPLICATION.to_string(),
        };
        match session.request(FrameKind::Connect, &body).await {
            Ok(Reply::Ack(_)) => {
                debug!(endpoint = %endpoint, "queue manager accepted connection");
                Ok(session)
            }
            Ok(Reply::Nack(nack)) => Err(connect_error(nack.to_string())),
            Err(fault) => Err(fault.into_error("connect", connect_error)),
        }
    }
}

// ── TcpSession ───────────────────────────────────────────────────

/// One authenticated connection to a queue manager.
#[derive(Debug)]
pub struct TcpSession {
    framed: Framed<TcpStream, QueueCodec>,
    sequence: u32,
    reply_timeout: Duration,
}

enum Reply {
    Ack(AckBody),
    Nack(NackBody),
}

/// Transport-level failure of a request, before it is attributed to a stage.
enum Fault {
    Transport(String),
    Timeout(Duration),
}

impl Fault {
    fn into_error(
        self,
        stage: &'static str,
        wrap: impl FnOnce(String) -> DeliveryError,
    ) -> DeliveryError {
        match self {
            Fault::Timeout(after) => DeliveryError::Timeout { stage, after },
            Fault::Transport(reason) => wrap(reason),
        }
    }
}

impl From<FrameError> for Fault {
    fn from(e: FrameError) -> Self {
        Fault::Transport(e.to_string())
    }
}

impl TcpSession {
    fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Send a frame that gets no reply.
    async fn post(&mut self, kind: FrameKind, payload: Bytes) -> Result<(), FrameError> {
        let sequence = self.next_sequence();
        let frame = Frame::new(kind, sequence, payload)?;
        self.framed.send(frame).await
    }

    /// Send a request and wait for its `Ack`/`Nack`.
    async fn request<B: Serialize + Sync>(
        &mut self,
        kind: FrameKind,
        body: &B,
    ) -> Result<Reply, Fault> {
        let sequence = self.next_sequence();
        let frame = Frame::with_body(kind, sequence, body)?;
        self.framed.send(frame).await?;

        let reply = match timeout(self.reply_timeout, self.framed.next()).await {
            Err(_) => return Err(Fault::Timeout(self.reply_timeout)),
            Ok(None) => return Err(Fault::Transport("connection closed by peer".into())),
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(Some(Ok(frame))) => frame,
        };

        if reply.sequence() != sequence {
            return Err(Fault::Transport(format!(
                "reply sequence {} does not match request {sequence}",
                reply.sequence()
            )));
        }
        match reply.kind() {
            FrameKind::Ack => Ok(Reply::Ack(reply.body()?)),
            FrameKind::Nack => Ok(Reply::Nack(reply.body()?)),
            other => Err(Fault::Transport(format!("unexpected {other} reply to {kind}"))),
        }
    }
}

#[async_trait]
impl QueueSession for TcpSession {
    async fn open_queue(
        &mut self,
        queue: &str,
        options: OpenOptions,
    ) -> Result<QueueHandle, DeliveryError> {
        let access_error = |reason: String| DeliveryError::QueueAccess {
            queue: queue.to_string(),
            reason,
        };
        let body = OpenBody {
            queue: queue.to_string(),
            options: options.bits(),
        };
        match self.request(FrameKind::Open, &body).await {
            Ok(Reply::Ack(ack)) => Ok(QueueHandle(ack.handle)),
            Ok(Reply::Nack(nack)) => Err(access_error(nack.to_string())),
            Err(fault) => Err(fault.into_error("open", access_error)),
        }
    }

    async fn begin_put(
        &mut self,
        handle: QueueHandle,
        descriptor: &MessageDescriptor,
        header: Bytes,
    ) -> Result<(), DeliveryError> {
        let body = PutBeginBody {
            handle: handle.0,
            descriptor: descriptor.clone(),
            header: header.to_vec(),
        };
        let sequence = self.next_sequence();
        let frame = Frame::with_body(FrameKind::PutBegin, sequence, &body)
            .map_err(|e| DeliveryError::Send(e.to_string()))?;
        self.framed
            .send(frame)
            .await
            .map_err(|e| DeliveryError::Send(e.to_string()))
    }

    async fn put_chunk(&mut self, _handle: QueueHandle, chunk: Bytes) -> Result<(), DeliveryError> {
        self.post(FrameKind::PutData, chunk)
            .await
            .map_err(|e| DeliveryError::Send(e.to_string()))
    }

    async fn end_put(&mut self, handle: QueueHandle) -> Result<(), DeliveryError> {
        let body = HandleBody { handle: handle.0 };
        match self.request(FrameKind::PutEnd, &body).await {
            Ok(Reply::Ack(_)) => Ok(()),
            Ok(Reply::Nack(nack)) => Err(DeliveryError::Send(format!("put rejected: {nack}"))),
            Err(fault) => Err(fault.into_error("send", DeliveryError::Send)),
        }
    }

    async fn close_queue(&mut self, handle: QueueHandle) -> Result<(), DeliveryError> {
        let body = HandleBody { handle: handle.0 };
        match self.request(FrameKind::Close, &body).await {
            Ok(Reply::Ack(_)) => Ok(()),
            Ok(Reply::Nack(nack)) => Err(DeliveryError::Send(format!("close rejected: {nack}"))),
            Err(fault) => Err(fault.into_error("close", DeliveryError::Send)),
        }
    }

    async fn disconnect(&mut self) -> Result<(), DeliveryError> {
        let sent = self.post(FrameKind::Disconnect, Bytes::new()).await;
        let shutdown = self.framed.get_mut().shutdown().await;
        sent.map_err(|e| DeliveryError::Send(e.to_string()))?;
        shutdown.map_err(|e| DeliveryError::Send(e.to_string()))
    }
}
