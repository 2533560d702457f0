// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow context: launches child workflows and routes later operations
//! to them by child id.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument};
use wfbridge_protocol::{ChildWorkflowOptions, Reply, Request};

use crate::children::ChildHandle;
use crate::connection::{ProxyConnection, unexpected_reply};
use crate::error::{ClientError, Result};
use crate::outcome::WorkflowOutcome;

/// Owner of a set of child workflows. Closing (or dropping) the context
/// releases every child it started.
pub struct WorkflowContext {
    connection: Arc<ProxyConnection>,
    context_id: i64,
}

impl WorkflowContext {
    pub(crate) fn new(connection: Arc<ProxyConnection>) -> Self {
        let context_id = connection.next_context_id();
        Self {
            connection,
            context_id,
        }
    }

    pub fn context_id(&self) -> i64 {
        self.context_id
    }

    /// Children are only reachable from the context that started them.
    fn child(&self, child_id: i64) -> Result<ChildHandle> {
        self.connection.children().get(self.context_id, child_id)
    }

    /// Start a child workflow and track it under the proxy-assigned id.
    #[instrument(skip(self, options, args), fields(context_id = self.context_id))]
    pub async fn execute_child<A: Serialize + ?Sized>(
        &self,
        workflow: &str,
        options: ChildWorkflowOptions,
        args: &A,
    ) -> Result<ChildHandle> {
        let args = serde_json::to_vec(args)?;
        let request = Request::WorkflowExecuteChild {
            context_id: self.context_id,
            workflow: workflow.to_string(),
            args,
            options,
        };

        let (child_id, execution) = match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowExecuteChild {
                child_id,
                execution,
            } => (child_id, execution),
            other => return Err(unexpected_reply(&other)),
        };

        let handle = ChildHandle {
            child_id,
            context_id: self.context_id,
            execution,
        };
        if !self.connection.children().add(handle.clone()) {
            return Err(ClientError::MalformedReply(format!(
                "proxy reused child id {} in context {}",
                child_id, self.context_id
            )));
        }
        info!(child_id, execution = %handle.execution, "child workflow started");
        Ok(handle)
    }

    #[instrument(skip(self, args), fields(context_id = self.context_id))]
    pub async fn signal_child<A: Serialize + ?Sized>(
        &self,
        child_id: i64,
        signal_name: &str,
        args: &A,
    ) -> Result<()> {
        let handle = self.child(child_id)?;
        let signal_args = serde_json::to_vec(args)?;

        let request = Request::WorkflowSignalChild {
            context_id: handle.context_id,
            child_id,
            signal_name: signal_name.to_string(),
            signal_args,
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowSignalChild => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Wait for a child to finish. Like `WorkflowStub::get_result`, an
    /// elapsed `timeout` abandons only the wait.
    #[instrument(skip(self), fields(context_id = self.context_id))]
    pub async fn wait_for_child(
        &self,
        child_id: i64,
        timeout: Option<Duration>,
    ) -> Result<WorkflowOutcome> {
        let handle = self.child(child_id)?;

        let request = Request::WorkflowWaitForChild {
            context_id: handle.context_id,
            child_id,
        };
        let reply = self.connection.call(&request, timeout).await?;
        match reply.body {
            Reply::WorkflowWaitForChild { result } => {
                Ok(WorkflowOutcome::from_reply(result, reply.error))
            }
            other => Err(unexpected_reply(&other)),
        }
    }

    #[instrument(skip(self), fields(context_id = self.context_id))]
    pub async fn cancel_child(&self, child_id: i64) -> Result<()> {
        let handle = self.child(child_id)?;

        let request = Request::WorkflowCancelChild {
            context_id: handle.context_id,
            child_id,
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowCancelChild => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Release every child started from this context.
    pub fn close(&self) -> usize {
        self.connection.children().remove_context(self.context_id)
    }
}

impl Drop for WorkflowContext {
    fn drop(&mut self) {
        self.close();
    }
}
