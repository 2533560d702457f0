// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request/reply correlation over a proxy transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use wfbridge_protocol::{
    Envelope, EnvelopeError, FrameError, InboundHandler, ProxyReply, Reply, Request, Transport,
};

use crate::children::ChildTable;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::registry::CorrelationRegistry;

/// Routes inbound envelopes from the transport to the correlation registry.
pub struct ReplyDispatcher {
    registry: Arc<CorrelationRegistry>,
}

impl ReplyDispatcher {
    pub fn new(registry: Arc<CorrelationRegistry>) -> Arc<Self> {
        Arc::new(Self { registry })
    }
}

impl InboundHandler for ReplyDispatcher {
    fn on_envelope(&self, envelope: Envelope) {
        let message_type = envelope.message_type();
        if !message_type.is_reply() {
            // Worker-side invocations (proxy -> client requests) are not served here
            warn!(?message_type, "ignoring inbound request from proxy");
            return;
        }

        match envelope.request_id() {
            Some(request_id) => {
                self.registry.resolve(request_id, envelope);
            }
            None => warn!(?message_type, "discarding reply without a request id"),
        }
    }

    fn on_malformed(&self, request_id: Option<i64>, error: &FrameError) {
        match request_id {
            Some(request_id) => {
                warn!(request_id, error = %error, "reply could not be decoded");
                self.registry
                    .reject(request_id, ClientError::MalformedReply(error.to_string()));
            }
            None => warn!(error = %error, "discarding malformed envelope"),
        }
    }

    fn on_closed(&self, cause: &str) {
        info!(cause, "proxy channel closed");
        self.registry.fail_all(cause);
    }
}

/// Shared state of one client connection: transport, pending requests and
/// child workflows.
pub struct ProxyConnection {
    transport: Arc<dyn Transport>,
    registry: Arc<CorrelationRegistry>,
    children: ChildTable,
    config: ClientConfig,
    last_context_id: AtomicI64,
}

impl ProxyConnection {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<CorrelationRegistry>,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            children: ChildTable::new(),
            config,
            last_context_id: AtomicI64::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn children(&self) -> &ChildTable {
        &self.children
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    pub(crate) fn next_context_id(&self) -> i64 {
        self.last_context_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Send `request` and wait for its reply.
    ///
    /// A reply carrying a proxy error is returned as-is; use [`Self::call_ok`]
    /// to turn it into [`ClientError::Remote`]. When `timeout` elapses only
    /// the local wait is abandoned.
    #[instrument(skip(self, request), fields(request = request.name()))]
    pub async fn call(&self, request: &Request, timeout: Option<Duration>) -> Result<ProxyReply> {
        let mut envelope = request.to_envelope().map_err(encode_error)?;

        let pending = self.registry.register(request.reply_type())?;
        envelope.set_request_id(pending.request_id());
        envelope.set_client_id(self.config.client_id);

        debug!(request_id = pending.request_id(), "sending request");
        self.transport.send(&envelope).await?;

        let reply = pending.wait(timeout).await?;
        Ok(ProxyReply::from_envelope(&reply)?)
    }

    /// Like [`Self::call`], but a proxy error becomes `ClientError::Remote`.
    pub async fn call_ok(&self, request: &Request, timeout: Option<Duration>) -> Result<Reply> {
        let reply = self.call(request, timeout).await?;
        match reply.error {
            Some(error) => Err(ClientError::Remote(error)),
            None => Ok(reply.body),
        }
    }

    /// Close the transport and fail every request still waiting.
    pub async fn close(&self) {
        self.transport.close().await;
        self.registry.fail_all("client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.registry.is_closed() || self.transport.is_closed()
    }
}

fn encode_error(err: EnvelopeError) -> ClientError {
    match err {
        EnvelopeError::Json { source, .. } => ClientError::Serialization(source),
        other => ClientError::MalformedReply(other.to_string()),
    }
}

/// Error for a reply body that does not answer the request it resolved.
pub(crate) fn unexpected_reply(reply: &Reply) -> ClientError {
    ClientError::MalformedReply(format!("unexpected reply {:?}", reply.message_type()))
}
