// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared test utilities for wfbridge-client integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use wfbridge_client::{ClientConfig, CorrelationRegistry, ReplyDispatcher, WorkflowClient};
use wfbridge_protocol::{
    Envelope, FramedStream, InboundHandler, ProxyReply, Request, Transport, TransportError,
};

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Transport that records every sent envelope instead of writing bytes.
pub struct MockTransport {
    sent: mpsc::UnboundedSender<Envelope>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent: tx,
                closed: AtomicBool::new(false),
                fail_sends: AtomicBool::new(false),
            }),
            rx,
        )
    }

    /// Make subsequent sends fail as if the socket broke.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed("mock transport closed".to_string()));
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        self.sent
            .send(envelope.clone())
            .map_err(|_| TransportError::Closed("test dropped the receiver".to_string()))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A client wired to a [`MockTransport`]; the test plays the proxy.
pub struct Harness {
    pub client: WorkflowClient,
    pub registry: Arc<CorrelationRegistry>,
    pub dispatcher: Arc<ReplyDispatcher>,
    pub transport: Arc<MockTransport>,
    sent: mpsc::UnboundedReceiver<Envelope>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new("test-domain").with_request_timeout_ms(5_000))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        init_tracing();
        let registry = CorrelationRegistry::new();
        let dispatcher = ReplyDispatcher::new(registry.clone());
        let (transport, sent) = MockTransport::new();
        let client = WorkflowClient::with_transport(transport.clone(), registry.clone(), config);
        Self {
            client,
            registry,
            dispatcher,
            transport,
            sent,
        }
    }

    /// Next envelope the client sent.
    pub async fn next_request(&mut self) -> Envelope {
        tokio::time::timeout(Duration::from_secs(5), self.sent.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("transport dropped")
    }

    /// Envelopes sent so far and not yet consumed.
    pub fn drain_requests(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(env) = self.sent.try_recv() {
            out.push(env);
        }
        out
    }

    /// Deliver `reply` as the answer to `request`.
    pub fn reply(&self, request: &Envelope, reply: ProxyReply) {
        let request_id = request.request_id().expect("request without id");
        self.dispatcher
            .on_envelope(reply.to_envelope(request_id).expect("encode reply"));
    }

    /// Wait for the next request, answer it with `f`, return the request.
    pub async fn respond<F>(&mut self, f: F) -> Envelope
    where
        F: FnOnce(Request) -> ProxyReply,
    {
        let request = self.next_request().await;
        let typed = Request::from_envelope(&request).expect("decode request");
        let reply = f(typed);
        self.reply(&request, reply);
        request
    }
}

/// Serve requests on `stream` with `handler` until the peer goes away.
/// Returns how many requests were answered.
pub async fn run_fake_proxy<S, F>(stream: S, mut handler: F) -> usize
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FnMut(Request) -> Option<ProxyReply>,
{
    let mut framed = FramedStream::new(stream);
    let mut answered = 0;
    while let Ok(envelope) = framed.read_envelope().await {
        let Some(request_id) = envelope.request_id() else {
            continue;
        };
        let Ok(request) = Request::from_envelope(&envelope) else {
            continue;
        };
        if let Some(reply) = handler(request) {
            let reply = reply.to_envelope(request_id).expect("encode reply");
            if framed.write_envelope(&reply).await.is_err() {
                break;
            }
            answered += 1;
        }
    }
    answered
}
