// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Terminal outcome of a workflow or child workflow.

use serde::de::DeserializeOwned;
use wfbridge_protocol::{ErrorType, ProxyError};

use crate::error::{ClientError, Result};

/// How a workflow execution ended, as reported by get-result or
/// wait-for-child. Remote failures are outcomes here, not client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// JSON-encoded workflow result.
    Completed(Vec<u8>),
    Failed(ProxyError),
    Cancelled,
    Terminated(String),
    TimedOut(String),
}

impl WorkflowOutcome {
    /// Classify a result reply by its `Result` bytes and `Error` property.
    pub fn from_reply(result: Vec<u8>, error: Option<ProxyError>) -> Self {
        let Some(error) = error else {
            return WorkflowOutcome::Completed(result);
        };

        match error.error_type {
            ErrorType::Cancelled => WorkflowOutcome::Cancelled,
            ErrorType::Terminated => WorkflowOutcome::Terminated(error.message),
            ErrorType::Timeout => WorkflowOutcome::TimedOut(error.message),
            // The engine reports some cancellations as generic errors
            _ if error.message.contains("CanceledError") => WorkflowOutcome::Cancelled,
            _ => WorkflowOutcome::Failed(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed(_))
    }

    /// Decode the completed result, or surface the remote failure.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            WorkflowOutcome::Completed(bytes) => Ok(serde_json::from_slice(&bytes)?),
            WorkflowOutcome::Failed(error) => Err(ClientError::Remote(error)),
            WorkflowOutcome::Cancelled => Err(ClientError::Remote(ProxyError::new(
                ErrorType::Cancelled,
                "workflow was cancelled",
            ))),
            WorkflowOutcome::Terminated(reason) => Err(ClientError::Remote(ProxyError::new(
                ErrorType::Terminated,
                reason,
            ))),
            WorkflowOutcome::TimedOut(message) => Err(ClientError::Remote(ProxyError::new(
                ErrorType::Timeout,
                message,
            ))),
        }
    }
}
