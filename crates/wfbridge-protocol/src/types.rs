// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structured values carried inside envelope properties.
//!
//! These are JSON-encoded on the wire; field names follow the proxy's
//! capitalized JSON naming.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies one remote workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorkflowExecution {
    #[serde(rename = "ID")]
    pub workflow_id: String,
    #[serde(rename = "RunID")]
    pub run_id: String,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workflow_id, self.run_id)
    }
}

/// Classification of an error reported by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Cancelled,
    Custom,
    Generic,
    Panic,
    Terminated,
    Timeout,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Cancelled => "cancelled",
            ErrorType::Custom => "custom",
            ErrorType::Generic => "generic",
            ErrorType::Panic => "panic",
            ErrorType::Terminated => "terminated",
            ErrorType::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by the proxy in a reply's `Error` property.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error_type} error: {message}")]
pub struct ProxyError {
    #[serde(rename = "String")]
    pub message: String,
    #[serde(rename = "Type")]
    pub error_type: ErrorType,
}

impl ProxyError {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Generic, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_type == ErrorType::Cancelled
    }
}

/// What the server does when a workflow id is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkflowIdReusePolicy {
    #[default]
    AllowDuplicateFailedOnly,
    AllowDuplicate,
    RejectDuplicate,
}

/// Options for starting a top-level workflow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartWorkflowOptions {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub task_list: String,
    /// Execution start-to-close timeout in milliseconds (0 = server default)
    #[serde(rename = "ExecutionStartToCloseTimeout", default)]
    pub execution_timeout_ms: u64,
    /// Decision task start-to-close timeout in milliseconds (0 = server default)
    #[serde(rename = "DecisionTaskStartToCloseTimeout", default)]
    pub task_timeout_ms: u64,
    #[serde(rename = "WorkflowIDReusePolicy", default)]
    pub id_reuse_policy: WorkflowIdReusePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub memo: HashMap<String, serde_json::Value>,
}

impl StartWorkflowOptions {
    pub fn new(task_list: impl Into<String>) -> Self {
        Self {
            task_list: task_list.into(),
            ..Default::default()
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_execution_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.execution_timeout_ms = timeout_ms;
        self
    }

    pub fn with_task_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.task_timeout_ms = timeout_ms;
        self
    }

    pub fn with_id_reuse_policy(mut self, policy: WorkflowIdReusePolicy) -> Self {
        self.id_reuse_policy = policy;
        self
    }

    pub fn with_cron_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.cron_schedule = Some(schedule.into());
        self
    }

    pub fn with_memo(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.memo.insert(key.into(), value);
        self
    }
}

/// Options for starting a child workflow from a workflow context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChildWorkflowOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(rename = "WorkflowID", default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub task_list: String,
    #[serde(rename = "ExecutionStartToCloseTimeout", default)]
    pub execution_timeout_ms: u64,
    #[serde(rename = "TaskStartToCloseTimeout", default)]
    pub task_timeout_ms: u64,
    #[serde(rename = "WorkflowIDReusePolicy", default)]
    pub id_reuse_policy: WorkflowIdReusePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub memo: HashMap<String, serde_json::Value>,
}

impl ChildWorkflowOptions {
    pub fn new(task_list: impl Into<String>) -> Self {
        Self {
            task_list: task_list.into(),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_execution_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.execution_timeout_ms = timeout_ms;
        self
    }
}

/// Status of a workflow execution as reported by describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Canceled,
    Terminated,
    ContinuedAsNew,
    TimedOut,
}

impl WorkflowStatus {
    pub fn is_closed(&self) -> bool {
        !matches!(self, WorkflowStatus::Running)
    }
}

/// Reply body of a describe-execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkflowDescription {
    pub execution: WorkflowExecution,
    pub workflow_type: String,
    pub status: WorkflowStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history_length: i64,
}

/// Registration status of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainStatus {
    #[default]
    Registered,
    Deprecated,
    Deleted,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Registered => "REGISTERED",
            DomainStatus::Deprecated => "DEPRECATED",
            DomainStatus::Deleted => "DELETED",
        }
    }

    /// Parse the proxy's status string; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "REGISTERED" => Some(DomainStatus::Registered),
            "DEPRECATED" => Some(DomainStatus::Deprecated),
            "DELETED" => Some(DomainStatus::Deleted),
            _ => None,
        }
    }
}

/// Reply body of a domain-describe request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DomainDescription {
    pub name: String,
    pub description: String,
    pub owner_email: String,
    pub status: DomainStatus,
    pub retention_days: i32,
    pub emit_metrics: bool,
}
