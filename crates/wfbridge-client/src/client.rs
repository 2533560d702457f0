// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client entry point.

use std::sync::Arc;

use tracing::{info, instrument};
use wfbridge_protocol::{
    DomainDescription, Reply, Request, StartWorkflowOptions, StreamTransport, Transport,
    WorkflowExecution,
};

use crate::config::ClientConfig;
use crate::connection::{ProxyConnection, ReplyDispatcher, unexpected_reply};
use crate::context::WorkflowContext;
use crate::error::Result;
use crate::registry::CorrelationRegistry;
use crate::stub::WorkflowStub;

/// Client for the workflow proxy.
///
/// The transport is injected; [`WorkflowClient::connect`] wires up the
/// Unix socket transport used in production.
#[derive(Clone)]
pub struct WorkflowClient {
    connection: Arc<ProxyConnection>,
}

impl WorkflowClient {
    /// Connect to the proxy socket named in `config`.
    #[cfg(unix)]
    #[instrument(skip(config), fields(socket = %config.proxy_socket))]
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let registry = CorrelationRegistry::new();
        let dispatcher = ReplyDispatcher::new(registry.clone());
        let transport = StreamTransport::connect_unix(
            &config.proxy_socket,
            config.connect_timeout(),
            dispatcher,
        )
        .await?;

        info!(domain = %config.domain, "workflow client connected");
        Ok(Self::with_transport(transport, registry, config))
    }

    /// Build a client over an existing transport. `registry` must be the one
    /// the transport's [`ReplyDispatcher`] resolves into.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        registry: Arc<CorrelationRegistry>,
        config: ClientConfig,
    ) -> Self {
        Self {
            connection: Arc::new(ProxyConnection::new(transport, registry, config)),
        }
    }

    pub fn connection(&self) -> &Arc<ProxyConnection> {
        &self.connection
    }

    pub fn config(&self) -> &ClientConfig {
        self.connection.config()
    }

    /// Stub for a new execution on the configured task list.
    pub fn new_workflow_stub(&self, workflow_type: &str) -> WorkflowStub {
        let options = StartWorkflowOptions::new(self.config().task_list.clone());
        WorkflowStub::new(self.connection.clone(), workflow_type, options)
    }

    pub fn new_workflow_stub_with_options(
        &self,
        workflow_type: &str,
        options: StartWorkflowOptions,
    ) -> WorkflowStub {
        WorkflowStub::new(self.connection.clone(), workflow_type, options)
    }

    /// Stub for an execution that is already running.
    pub fn attach_workflow_stub(
        &self,
        workflow_type: &str,
        execution: WorkflowExecution,
    ) -> WorkflowStub {
        WorkflowStub::attach(self.connection.clone(), workflow_type, execution)
    }

    /// New context for starting and addressing child workflows.
    pub fn workflow_context(&self) -> WorkflowContext {
        WorkflowContext::new(self.connection.clone())
    }

    pub async fn ping(&self) -> Result<()> {
        self.simple(Request::Ping).await
    }

    pub async fn heartbeat(&self) -> Result<()> {
        self.simple(Request::Heartbeat).await
    }

    #[instrument(skip(self))]
    pub async fn describe_domain(&self, name: &str) -> Result<DomainDescription> {
        let request = Request::DomainDescribe {
            name: name.to_string(),
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::DomainDescribe(description) => Ok(description),
            other => Err(unexpected_reply(&other)),
        }
    }

    #[instrument(skip(self, description, owner_email))]
    pub async fn register_domain(
        &self,
        name: &str,
        description: &str,
        owner_email: &str,
        retention_days: i32,
        emit_metrics: bool,
    ) -> Result<()> {
        let request = Request::DomainRegister {
            name: name.to_string(),
            description: description.to_string(),
            owner_email: owner_email.to_string(),
            retention_days,
            emit_metrics,
        };
        self.simple(request).await
    }

    /// Send a request whose reply carries no body.
    async fn simple(&self, request: Request) -> Result<()> {
        let expected = request.reply_type();
        let reply = self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?;
        if reply.message_type() != expected {
            return Err(unexpected_reply(&reply));
        }
        Ok(())
    }

    /// Close the connection. Every pending request fails with a channel
    /// closed error.
    pub async fn close(&self) {
        self.connection.close().await;
    }
}
