// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! wfbridge Client - typed workflow handles over the workflow proxy
//!
//! The client correlates asynchronous replies from the out-of-process
//! workflow proxy with the requests that caused them, tracks child
//! workflows by proxy-assigned id, and exposes a typed [`WorkflowStub`]
//! with start / signal / query / cancel / get-result / signal-with-start.
//!
//! # Quick Start
//!
//! ```ignore
//! use wfbridge_client::{ClientConfig, WorkflowClient, WorkflowOutcome};
//!
//! let client = WorkflowClient::connect(ClientConfig::from_env()?).await?;
//!
//! let stub = client.new_workflow_stub("Greeter");
//! stub.start(&["Alice"]).await?;
//!
//! let status: String = stub.query("status", &()).await?;
//!
//! match stub.get_result(Some(Duration::from_secs(30))).await? {
//!     WorkflowOutcome::Completed(_) => println!("done"),
//!     other => println!("workflow ended: {:?}", other),
//! }
//! ```
//!
//! # Timeouts and cancellation
//!
//! A `get_result` timeout abandons only the caller's wait. The workflow
//! keeps running and can be waited on again. To stop the workflow call
//! [`WorkflowStub::cancel`], which is its own request.
//!
//! # Configuration
//!
//! [`ClientConfig::from_env`] reads:
//! - `WFBRIDGE_PROXY_SOCKET` - proxy socket path
//! - `WFBRIDGE_CLIENT_ID` - client id stamped on requests
//! - `WFBRIDGE_DOMAIN` - workflow domain
//! - `WFBRIDGE_TASK_LIST` - default task list
//! - `WFBRIDGE_CONNECT_TIMEOUT_MS` - connect timeout
//! - `WFBRIDGE_REQUEST_TIMEOUT_MS` - per-request timeout

mod children;
mod client;
mod config;
mod connection;
mod context;
mod error;
mod outcome;
mod registry;
mod stub;

pub use children::{ChildHandle, ChildTable};
pub use client::WorkflowClient;
pub use config::ClientConfig;
pub use connection::{ProxyConnection, ReplyDispatcher};
pub use context::WorkflowContext;
pub use error::{ClientError, Result};
pub use outcome::WorkflowOutcome;
pub use registry::{CorrelationRegistry, PendingReply, ResolveOutcome};
pub use stub::{WorkflowState, WorkflowStub};

// Re-export protocol types callers need
pub use wfbridge_protocol::{
    ChildWorkflowOptions, DomainDescription, DomainStatus, ErrorType, ProxyError,
    StartWorkflowOptions, WorkflowDescription, WorkflowExecution, WorkflowIdReusePolicy,
    WorkflowStatus,
};
