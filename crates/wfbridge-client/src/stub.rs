// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed handle for one workflow execution.
//!
//! A stub walks through `Created -> Started -> terminal`. Operations are
//! gated on that state and fail before anything is sent when called in the
//! wrong one. Waiting for the result with a timeout and cancelling the
//! execution are separate operations: a timed-out `get_result` leaves the
//! remote workflow running and the stub untouched.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use wfbridge_protocol::{
    Reply, Request, StartWorkflowOptions, WorkflowDescription, WorkflowExecution,
};

use crate::connection::{ProxyConnection, unexpected_reply};
use crate::error::{ClientError, Result};
use crate::outcome::WorkflowOutcome;

/// Lifecycle state of a workflow stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Created,
    /// A start request is in flight.
    Starting,
    Started,
    Completed,
    Failed,
    Cancelled,
    Terminated,
    TimedOut,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Completed
                | WorkflowState::Failed
                | WorkflowState::Cancelled
                | WorkflowState::Terminated
                | WorkflowState::TimedOut
        )
    }

    fn for_outcome(outcome: &WorkflowOutcome) -> Self {
        match outcome {
            WorkflowOutcome::Completed(_) => WorkflowState::Completed,
            WorkflowOutcome::Failed(_) => WorkflowState::Failed,
            WorkflowOutcome::Cancelled => WorkflowState::Cancelled,
            WorkflowOutcome::Terminated(_) => WorkflowState::Terminated,
            WorkflowOutcome::TimedOut(_) => WorkflowState::TimedOut,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct StubState {
    state: WorkflowState,
    execution: Option<WorkflowExecution>,
    outcome: Option<WorkflowOutcome>,
}

/// Caller-facing handle for one workflow execution.
pub struct WorkflowStub {
    connection: Arc<ProxyConnection>,
    workflow_type: String,
    options: StartWorkflowOptions,
    inner: Mutex<StubState>,
}

impl WorkflowStub {
    pub(crate) fn new(
        connection: Arc<ProxyConnection>,
        workflow_type: impl Into<String>,
        options: StartWorkflowOptions,
    ) -> Self {
        Self {
            connection,
            workflow_type: workflow_type.into(),
            options,
            inner: Mutex::new(StubState {
                state: WorkflowState::Created,
                execution: None,
                outcome: None,
            }),
        }
    }

    /// Handle for an execution that is already running.
    pub(crate) fn attach(
        connection: Arc<ProxyConnection>,
        workflow_type: impl Into<String>,
        execution: WorkflowExecution,
    ) -> Self {
        let stub = Self::new(connection, workflow_type, StartWorkflowOptions::default());
        {
            let mut inner = stub.lock();
            inner.state = WorkflowState::Started;
            inner.execution = Some(execution);
        }
        stub
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn workflow_type(&self) -> &str {
        &self.workflow_type
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state
    }

    /// The remote execution, once started.
    pub fn execution(&self) -> Option<WorkflowExecution> {
        self.lock().execution.clone()
    }

    fn domain(&self) -> String {
        self.connection.config().domain.clone()
    }

    fn require_started(&self, operation: &'static str) -> Result<WorkflowExecution> {
        let inner = self.lock();
        match (&inner.state, &inner.execution) {
            (WorkflowState::Started, Some(execution)) => Ok(execution.clone()),
            (state, _) => Err(ClientError::InvalidState {
                operation,
                expected: "Started",
                actual: state.to_string(),
            }),
        }
    }

    /// Move `Created -> Starting`, returning a guard that reverts unless
    /// the start succeeds.
    fn begin_start(&self, operation: &'static str) -> Result<StartGuard<'_>> {
        let mut inner = self.lock();
        if inner.state != WorkflowState::Created {
            return Err(ClientError::InvalidState {
                operation,
                expected: "Created",
                actual: inner.state.to_string(),
            });
        }
        inner.state = WorkflowState::Starting;
        Ok(StartGuard {
            stub: self,
            armed: true,
        })
    }

    /// Start the workflow. Only valid once, from `Created`.
    #[instrument(skip(self, args), fields(workflow_type = %self.workflow_type))]
    pub async fn start<A: Serialize + ?Sized>(&self, args: &A) -> Result<WorkflowExecution> {
        let guard = self.begin_start("start")?;
        let args = serde_json::to_vec(args)?;

        let request = Request::WorkflowExecute {
            domain: self.domain(),
            workflow: self.workflow_type.clone(),
            args,
            options: self.options.clone(),
        };
        let execution = match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowExecute { execution } => execution,
            other => return Err(unexpected_reply(&other)),
        };

        guard.complete(execution.clone());
        info!(execution = %execution, "workflow started");
        Ok(execution)
    }

    /// Send a signal to the running workflow.
    #[instrument(skip(self, args), fields(workflow_type = %self.workflow_type))]
    pub async fn signal<A: Serialize + ?Sized>(&self, signal_name: &str, args: &A) -> Result<()> {
        let execution = self.require_started("signal")?;
        let signal_args = serde_json::to_vec(args)?;

        let request = Request::WorkflowSignal {
            domain: self.domain(),
            execution,
            signal_name: signal_name.to_string(),
            signal_args,
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowSignal => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Query the running workflow. Never changes the stub's state.
    #[instrument(skip(self, args), fields(workflow_type = %self.workflow_type))]
    pub async fn query<A, R>(&self, query_name: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let execution = self.require_started("query")?;
        let query_args = serde_json::to_vec(args)?;

        let request = Request::WorkflowQuery {
            domain: self.domain(),
            execution,
            query_name: query_name.to_string(),
            query_args,
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowQuery { result } => Ok(serde_json::from_slice(&result)?),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Wait for the workflow to finish.
    ///
    /// With a `timeout`, an elapsed wait returns [`ClientError::Timeout`]
    /// and abandons only this wait: the workflow keeps running, the stub
    /// stays `Started` and no cancellation is sent. Once a terminal outcome
    /// is known it is cached and returned without further I/O.
    #[instrument(skip(self), fields(workflow_type = %self.workflow_type))]
    pub async fn get_result(&self, timeout: Option<Duration>) -> Result<WorkflowOutcome> {
        let execution = {
            let inner = self.lock();
            if let Some(outcome) = &inner.outcome {
                return Ok(outcome.clone());
            }
            match (&inner.state, &inner.execution) {
                (WorkflowState::Started, Some(execution)) => execution.clone(),
                (state, _) => {
                    return Err(ClientError::InvalidState {
                        operation: "get_result",
                        expected: "Started",
                        actual: state.to_string(),
                    });
                }
            }
        };

        let request = Request::WorkflowGetResult {
            domain: self.domain(),
            execution,
        };
        let reply = self.connection.call(&request, timeout).await?;
        let outcome = match reply.body {
            Reply::WorkflowGetResult { result } => WorkflowOutcome::from_reply(result, reply.error),
            other => return Err(unexpected_reply(&other)),
        };

        let mut inner = self.lock();
        // Concurrent waiters agree on the first outcome recorded
        if let Some(existing) = &inner.outcome {
            return Ok(existing.clone());
        }
        inner.state = WorkflowState::for_outcome(&outcome);
        inner.outcome = Some(outcome.clone());
        debug!(state = %inner.state, "workflow finished");
        Ok(outcome)
    }

    /// Request cancellation of the remote execution.
    ///
    /// This is its own request with its own timeout; the stub moves to
    /// `Cancelled` once `get_result` observes the cancellation.
    #[instrument(skip(self), fields(workflow_type = %self.workflow_type))]
    pub async fn cancel(&self) -> Result<()> {
        let execution = self.require_started("cancel")?;

        let request = Request::WorkflowCancel {
            domain: self.domain(),
            execution,
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowCancel => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Terminate the remote execution immediately.
    #[instrument(skip(self), fields(workflow_type = %self.workflow_type))]
    pub async fn terminate(&self, reason: &str) -> Result<()> {
        let execution = self.require_started("terminate")?;

        let request = Request::WorkflowTerminate {
            domain: self.domain(),
            execution,
            reason: reason.to_string(),
            details: Vec::new(),
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowTerminate => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Fetch the server's view of the execution.
    #[instrument(skip(self), fields(workflow_type = %self.workflow_type))]
    pub async fn describe(&self) -> Result<WorkflowDescription> {
        let execution = self.require_started("describe")?;

        let request = Request::WorkflowDescribeExecution {
            domain: self.domain(),
            execution,
        };
        match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowDescribeExecution(Some(description)) => Ok(description),
            Reply::WorkflowDescribeExecution(None) => Err(ClientError::MalformedReply(
                "describe reply carried no details".to_string(),
            )),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Start the workflow if needed and signal it, as one proxy message.
    ///
    /// Valid in `Created` (the stub becomes `Started`) and in `Started`.
    /// Without a configured workflow id a random one is generated so the
    /// proxy can address the execution.
    #[instrument(skip(self, signal_args, start_args), fields(workflow_type = %self.workflow_type))]
    pub async fn signal_with_start<S, A>(
        &self,
        signal_name: &str,
        signal_args: &S,
        start_args: &A,
    ) -> Result<WorkflowExecution>
    where
        S: Serialize + ?Sized,
        A: Serialize + ?Sized,
    {
        let (guard, workflow_id) = {
            let current = {
                let inner = self.lock();
                (inner.state, inner.execution.clone())
            };
            match current {
                (WorkflowState::Started, Some(execution)) => (None, execution.workflow_id),
                (WorkflowState::Created, _) => {
                    let guard = self.begin_start("signal_with_start")?;
                    let workflow_id = self
                        .options
                        .workflow_id
                        .clone()
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    (Some(guard), workflow_id)
                }
                (state, _) => {
                    return Err(ClientError::InvalidState {
                        operation: "signal_with_start",
                        expected: "Created or Started",
                        actual: state.to_string(),
                    });
                }
            }
        };
        let signal_args = serde_json::to_vec(signal_args)?;
        let workflow_args = serde_json::to_vec(start_args)?;

        let mut options = self.options.clone();
        options.workflow_id = Some(workflow_id.clone());
        let request = Request::WorkflowSignalWithStart {
            domain: self.domain(),
            workflow: self.workflow_type.clone(),
            workflow_id,
            signal_name: signal_name.to_string(),
            signal_args,
            workflow_args,
            options,
        };
        let execution = match self
            .connection
            .call_ok(&request, Some(self.connection.request_timeout()))
            .await?
        {
            Reply::WorkflowSignalWithStart { execution } => execution,
            other => return Err(unexpected_reply(&other)),
        };

        match guard {
            Some(guard) => guard.complete(execution.clone()),
            None => {
                let mut inner = self.lock();
                if inner.state == WorkflowState::Started {
                    inner.execution = Some(execution.clone());
                }
            }
        }
        Ok(execution)
    }
}

impl fmt::Debug for WorkflowStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("WorkflowStub")
            .field("workflow_type", &self.workflow_type)
            .field("state", &inner.state)
            .field("execution", &inner.execution)
            .finish()
    }
}

/// Holds a stub in `Starting`; reverts it to `Created` unless completed,
/// including when the start future is dropped mid-flight.
struct StartGuard<'a> {
    stub: &'a WorkflowStub,
    armed: bool,
}

impl StartGuard<'_> {
    fn complete(mut self, execution: WorkflowExecution) {
        let mut inner = self.stub.lock();
        inner.state = WorkflowState::Started;
        inner.execution = Some(execution);
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.stub.lock();
            if inner.state == WorkflowState::Starting {
                inner.state = WorkflowState::Created;
            }
        }
    }
}
