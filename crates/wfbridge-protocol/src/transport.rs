// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transport contract and the byte-stream transport to the proxy.
//!
//! A transport sends envelopes and reports inbound envelopes through an
//! [`InboundHandler`]. The handler's `on_closed` is invoked exactly once,
//! when the channel terminates for any reason.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::codec::peek_request_id;
use crate::envelope::Envelope;
use crate::frame::{Frame, FrameError, FramedStream};

/// Errors that can occur on a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("channel closed: {0}")]
    Closed(String),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection timed out after {0}ms")]
    Timeout(u64),
}

/// Outbound half of the channel to the proxy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one envelope.
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;

    /// Close the channel. The inbound handler observes `on_closed`.
    async fn close(&self);

    /// True once the channel can no longer send.
    fn is_closed(&self) -> bool;
}

/// Receives everything the transport reads from the proxy.
///
/// Called from the transport's reader task; implementations must not block.
pub trait InboundHandler: Send + Sync {
    /// One decoded envelope.
    fn on_envelope(&self, envelope: Envelope);

    /// A frame arrived that could not be decoded. `request_id` is set when
    /// it looks like a reply and its id could still be read.
    fn on_malformed(&self, request_id: Option<i64>, error: &FrameError) {
        warn!(?request_id, error = %error, "discarding malformed envelope");
    }

    /// The channel terminated. Called exactly once.
    fn on_closed(&self, cause: &str);
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Transport over any duplex byte stream (Unix socket, pipe, in-memory duplex).
pub struct StreamTransport {
    writer: Mutex<Option<FramedStream<BoxedWriter>>>,
    shutdown: CancellationToken,
    closed: Arc<AtomicBool>,
}

impl StreamTransport {
    /// Split `stream`, spawn the reader task and return the transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(stream: S, handler: Arc<dyn InboundHandler>) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let shutdown = CancellationToken::new();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(read_loop(
            FramedStream::new(reader),
            handler,
            shutdown.clone(),
            closed.clone(),
        ));

        Arc::new(Self {
            writer: Mutex::new(Some(FramedStream::new(Box::new(writer) as BoxedWriter))),
            shutdown,
            closed,
        })
    }

    /// Connect to the proxy's Unix domain socket.
    #[cfg(unix)]
    #[instrument(skip(handler))]
    pub async fn connect_unix(
        path: &str,
        connect_timeout: Duration,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<Arc<Self>, TransportError> {
        info!(path, "connecting to workflow proxy");

        let stream = tokio::time::timeout(connect_timeout, tokio::net::UnixStream::connect(path))
            .await
            .map_err(|_| TransportError::Timeout(connect_timeout.as_millis() as u64))??;

        info!("connected to workflow proxy");
        Ok(Self::spawn(stream, handler))
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed("transport closed".to_string()));
        }

        let frame = Frame::from_envelope(envelope)?;
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| TransportError::Closed("transport closed".to_string()))?;

        if let Err(e) = writer.write_frame(&frame).await {
            warn!(error = %e, "write to proxy failed, closing transport");
            self.closed.store(true, Ordering::SeqCst);
            self.shutdown.cancel();
            return Err(e.into());
        }

        debug!(
            message_type = ?envelope.message_type(),
            request_id = ?envelope.request_id(),
            "envelope sent"
        );
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.cancel();

        let writer = self.writer.lock().await.take();
        if let Some(writer) = writer {
            let mut inner = writer.into_inner();
            if let Err(e) = inner.shutdown().await {
                debug!(error = %e, "error shutting down writer");
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: FramedStream<R>,
    handler: Arc<dyn InboundHandler>,
    shutdown: CancellationToken,
    closed: Arc<AtomicBool>,
) {
    let cause = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break "transport closed".to_string();
            }
            frame = reader.read_frame() => {
                match frame {
                    Ok(frame) => match frame.envelope() {
                        Ok(envelope) => {
                            debug!(
                                message_type = ?envelope.message_type(),
                                request_id = ?envelope.request_id(),
                                "envelope received"
                            );
                            handler.on_envelope(envelope);
                        }
                        // One bad envelope must not take down the other in-flight calls
                        Err(e) => handler.on_malformed(peek_request_id(&frame.payload), &e),
                    },
                    Err(FrameError::ConnectionClosed) => {
                        info!("proxy closed the connection");
                        break "connection closed by proxy".to_string();
                    }
                    Err(e) => {
                        error!(error = %e, "transport read failed");
                        break e.to_string();
                    }
                }
            }
        }
    };

    closed.store(true, Ordering::SeqCst);
    handler.on_closed(&cause);
}
