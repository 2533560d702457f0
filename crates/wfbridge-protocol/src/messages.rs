// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed request and reply variants.
//!
//! One variant per message kind, converted to and from the generic
//! [`Envelope`] only at the wire boundary. Correlation (`RequestId`,
//! `ClientId`) is stamped by the connection, not by the variants.

use crate::envelope::{CONTEXT_ID, ERROR, Envelope, EnvelopeError};
use crate::message_type::MessageType;
use crate::types::{
    ChildWorkflowOptions, DomainDescription, DomainStatus, ProxyError, StartWorkflowOptions,
    WorkflowDescription, WorkflowExecution,
};

const ARGS: &str = "Args";
const CHILD_ID: &str = "ChildId";
const DESCRIPTION: &str = "Description";
const DETAILS: &str = "Details";
const DOMAIN: &str = "Domain";
const EMIT_METRICS: &str = "EmitMetrics";
const EXECUTION: &str = "Execution";
const NAME: &str = "Name";
const OPTIONS: &str = "Options";
const OWNER_EMAIL: &str = "OwnerEmail";
const QUERY_ARGS: &str = "QueryArgs";
const QUERY_NAME: &str = "QueryName";
const REASON: &str = "Reason";
const RESULT: &str = "Result";
const RETENTION_DAYS: &str = "RetentionDays";
const RUN_ID: &str = "RunId";
const SIGNAL_ARGS: &str = "SignalArgs";
const SIGNAL_NAME: &str = "SignalName";
const WORKFLOW: &str = "Workflow";
const WORKFLOW_ARGS: &str = "WorkflowArgs";
const WORKFLOW_ID: &str = "WorkflowId";

const DOMAIN_INFO_NAME: &str = "DomainInfoName";
const DOMAIN_INFO_DESCRIPTION: &str = "DomainInfoDescription";
const DOMAIN_INFO_STATUS: &str = "DomainInfoStatus";
const DOMAIN_INFO_OWNER_EMAIL: &str = "DomainInfoOwnerEmail";
const CONFIGURATION_RETENTION_DAYS: &str = "ConfigurationRetentionDays";
const CONFIGURATION_EMIT_METRICS: &str = "ConfigurationEmitMetrics";

/// A request the client sends to the proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    Heartbeat,
    DomainDescribe {
        name: String,
    },
    DomainRegister {
        name: String,
        description: String,
        owner_email: String,
        retention_days: i32,
        emit_metrics: bool,
    },
    WorkflowExecute {
        domain: String,
        workflow: String,
        args: Vec<u8>,
        options: StartWorkflowOptions,
    },
    WorkflowSignal {
        domain: String,
        execution: WorkflowExecution,
        signal_name: String,
        signal_args: Vec<u8>,
    },
    WorkflowSignalWithStart {
        domain: String,
        workflow: String,
        workflow_id: String,
        signal_name: String,
        signal_args: Vec<u8>,
        workflow_args: Vec<u8>,
        options: StartWorkflowOptions,
    },
    WorkflowQuery {
        domain: String,
        execution: WorkflowExecution,
        query_name: String,
        query_args: Vec<u8>,
    },
    WorkflowCancel {
        domain: String,
        execution: WorkflowExecution,
    },
    WorkflowTerminate {
        domain: String,
        execution: WorkflowExecution,
        reason: String,
        details: Vec<u8>,
    },
    WorkflowGetResult {
        domain: String,
        execution: WorkflowExecution,
    },
    WorkflowDescribeExecution {
        domain: String,
        execution: WorkflowExecution,
    },
    WorkflowExecuteChild {
        context_id: i64,
        workflow: String,
        args: Vec<u8>,
        options: ChildWorkflowOptions,
    },
    WorkflowWaitForChild {
        context_id: i64,
        child_id: i64,
    },
    WorkflowSignalChild {
        context_id: i64,
        child_id: i64,
        signal_name: String,
        signal_args: Vec<u8>,
    },
    WorkflowCancelChild {
        context_id: i64,
        child_id: i64,
    },
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::Ping => MessageType::PingRequest,
            Request::Heartbeat => MessageType::HeartbeatRequest,
            Request::DomainDescribe { .. } => MessageType::DomainDescribeRequest,
            Request::DomainRegister { .. } => MessageType::DomainRegisterRequest,
            Request::WorkflowExecute { .. } => MessageType::WorkflowExecuteRequest,
            Request::WorkflowSignal { .. } => MessageType::WorkflowSignalRequest,
            Request::WorkflowSignalWithStart { .. } => MessageType::WorkflowSignalWithStartRequest,
            Request::WorkflowQuery { .. } => MessageType::WorkflowQueryRequest,
            Request::WorkflowCancel { .. } => MessageType::WorkflowCancelRequest,
            Request::WorkflowTerminate { .. } => MessageType::WorkflowTerminateRequest,
            Request::WorkflowGetResult { .. } => MessageType::WorkflowGetResultRequest,
            Request::WorkflowDescribeExecution { .. } => {
                MessageType::WorkflowDescribeExecutionRequest
            }
            Request::WorkflowExecuteChild { .. } => MessageType::WorkflowExecuteChildRequest,
            Request::WorkflowWaitForChild { .. } => MessageType::WorkflowWaitForChildRequest,
            Request::WorkflowSignalChild { .. } => MessageType::WorkflowSignalChildRequest,
            Request::WorkflowCancelChild { .. } => MessageType::WorkflowCancelChildRequest,
        }
    }

    /// The reply type a well-formed answer must carry.
    pub fn reply_type(&self) -> MessageType {
        match self {
            Request::Ping => MessageType::PingReply,
            Request::Heartbeat => MessageType::HeartbeatReply,
            Request::DomainDescribe { .. } => MessageType::DomainDescribeReply,
            Request::DomainRegister { .. } => MessageType::DomainRegisterReply,
            Request::WorkflowExecute { .. } => MessageType::WorkflowExecuteReply,
            Request::WorkflowSignal { .. } => MessageType::WorkflowSignalReply,
            Request::WorkflowSignalWithStart { .. } => MessageType::WorkflowSignalWithStartReply,
            Request::WorkflowQuery { .. } => MessageType::WorkflowQueryReply,
            Request::WorkflowCancel { .. } => MessageType::WorkflowCancelReply,
            Request::WorkflowTerminate { .. } => MessageType::WorkflowTerminateReply,
            Request::WorkflowGetResult { .. } => MessageType::WorkflowGetResultReply,
            Request::WorkflowDescribeExecution { .. } => {
                MessageType::WorkflowDescribeExecutionReply
            }
            Request::WorkflowExecuteChild { .. } => MessageType::WorkflowExecuteChildReply,
            Request::WorkflowWaitForChild { .. } => MessageType::WorkflowWaitForChildReply,
            Request::WorkflowSignalChild { .. } => MessageType::WorkflowSignalChildReply,
            Request::WorkflowCancelChild { .. } => MessageType::WorkflowCancelChildReply,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Heartbeat => "heartbeat",
            Request::DomainDescribe { .. } => "domain_describe",
            Request::DomainRegister { .. } => "domain_register",
            Request::WorkflowExecute { .. } => "workflow_execute",
            Request::WorkflowSignal { .. } => "workflow_signal",
            Request::WorkflowSignalWithStart { .. } => "workflow_signal_with_start",
            Request::WorkflowQuery { .. } => "workflow_query",
            Request::WorkflowCancel { .. } => "workflow_cancel",
            Request::WorkflowTerminate { .. } => "workflow_terminate",
            Request::WorkflowGetResult { .. } => "workflow_get_result",
            Request::WorkflowDescribeExecution { .. } => "workflow_describe_execution",
            Request::WorkflowExecuteChild { .. } => "workflow_execute_child",
            Request::WorkflowWaitForChild { .. } => "workflow_wait_for_child",
            Request::WorkflowSignalChild { .. } => "workflow_signal_child",
            Request::WorkflowCancelChild { .. } => "workflow_cancel_child",
        }
    }

    /// Build the wire envelope for this request (without correlation ids).
    pub fn to_envelope(&self) -> Result<Envelope, EnvelopeError> {
        let mut env = Envelope::new(self.message_type());
        match self {
            Request::Ping | Request::Heartbeat => {}
            Request::DomainDescribe { name } => {
                env.set_string(NAME, name);
            }
            Request::DomainRegister {
                name,
                description,
                owner_email,
                retention_days,
                emit_metrics,
            } => {
                env.set_string(NAME, name);
                env.set_string(DESCRIPTION, description);
                env.set_string(OWNER_EMAIL, owner_email);
                env.set_long(RETENTION_DAYS, i64::from(*retention_days));
                env.set_bool(EMIT_METRICS, *emit_metrics);
            }
            Request::WorkflowExecute {
                domain,
                workflow,
                args,
                options,
            } => {
                env.set_string(DOMAIN, domain);
                env.set_string(WORKFLOW, workflow);
                env.set_bytes(ARGS, args.clone());
                env.set_json(OPTIONS, options)?;
            }
            Request::WorkflowSignal {
                domain,
                execution,
                signal_name,
                signal_args,
            } => {
                set_target(&mut env, domain, execution);
                env.set_string(SIGNAL_NAME, signal_name);
                env.set_bytes(SIGNAL_ARGS, signal_args.clone());
            }
            Request::WorkflowSignalWithStart {
                domain,
                workflow,
                workflow_id,
                signal_name,
                signal_args,
                workflow_args,
                options,
            } => {
                env.set_string(DOMAIN, domain);
                env.set_string(WORKFLOW, workflow);
                env.set_string(WORKFLOW_ID, workflow_id);
                env.set_string(SIGNAL_NAME, signal_name);
                env.set_bytes(SIGNAL_ARGS, signal_args.clone());
                env.set_bytes(WORKFLOW_ARGS, workflow_args.clone());
                env.set_json(OPTIONS, options)?;
            }
            Request::WorkflowQuery {
                domain,
                execution,
                query_name,
                query_args,
            } => {
                set_target(&mut env, domain, execution);
                env.set_string(QUERY_NAME, query_name);
                env.set_bytes(QUERY_ARGS, query_args.clone());
            }
            Request::WorkflowCancel { domain, execution }
            | Request::WorkflowGetResult { domain, execution }
            | Request::WorkflowDescribeExecution { domain, execution } => {
                set_target(&mut env, domain, execution);
            }
            Request::WorkflowTerminate {
                domain,
                execution,
                reason,
                details,
            } => {
                set_target(&mut env, domain, execution);
                env.set_string(REASON, reason);
                env.set_bytes(DETAILS, details.clone());
            }
            Request::WorkflowExecuteChild {
                context_id,
                workflow,
                args,
                options,
            } => {
                env.set_long(CONTEXT_ID, *context_id);
                env.set_string(WORKFLOW, workflow);
                env.set_bytes(ARGS, args.clone());
                env.set_json(OPTIONS, options)?;
            }
            Request::WorkflowWaitForChild {
                context_id,
                child_id,
            }
            | Request::WorkflowCancelChild {
                context_id,
                child_id,
            } => {
                env.set_long(CONTEXT_ID, *context_id);
                env.set_long(CHILD_ID, *child_id);
            }
            Request::WorkflowSignalChild {
                context_id,
                child_id,
                signal_name,
                signal_args,
            } => {
                env.set_long(CONTEXT_ID, *context_id);
                env.set_long(CHILD_ID, *child_id);
                env.set_string(SIGNAL_NAME, signal_name);
                env.set_bytes(SIGNAL_ARGS, signal_args.clone());
            }
        }
        Ok(env)
    }

    /// Rebuild a request from its envelope. Used by proxy-side tooling and
    /// tests; unsupported message types are rejected.
    pub fn from_envelope(env: &Envelope) -> Result<Self, EnvelopeError> {
        let request = match env.message_type() {
            MessageType::PingRequest => Request::Ping,
            MessageType::HeartbeatRequest => Request::Heartbeat,
            MessageType::DomainDescribeRequest => Request::DomainDescribe {
                name: env.get_string(NAME)?.to_string(),
            },
            MessageType::DomainRegisterRequest => Request::DomainRegister {
                name: env.get_string(NAME)?.to_string(),
                description: env.get_string(DESCRIPTION)?.to_string(),
                owner_email: env.get_string(OWNER_EMAIL)?.to_string(),
                retention_days: get_i32(env, RETENTION_DAYS)?,
                emit_metrics: env.get_bool(EMIT_METRICS)?,
            },
            MessageType::WorkflowExecuteRequest => Request::WorkflowExecute {
                domain: env.get_string(DOMAIN)?.to_string(),
                workflow: env.get_string(WORKFLOW)?.to_string(),
                args: env.get_bytes(ARGS)?.to_vec(),
                options: env.get_json(OPTIONS)?,
            },
            MessageType::WorkflowSignalRequest => Request::WorkflowSignal {
                domain: env.get_string(DOMAIN)?.to_string(),
                execution: get_target(env)?,
                signal_name: env.get_string(SIGNAL_NAME)?.to_string(),
                signal_args: env.get_bytes(SIGNAL_ARGS)?.to_vec(),
            },
            MessageType::WorkflowSignalWithStartRequest => Request::WorkflowSignalWithStart {
                domain: env.get_string(DOMAIN)?.to_string(),
                workflow: env.get_string(WORKFLOW)?.to_string(),
                workflow_id: env.get_string(WORKFLOW_ID)?.to_string(),
                signal_name: env.get_string(SIGNAL_NAME)?.to_string(),
                signal_args: env.get_bytes(SIGNAL_ARGS)?.to_vec(),
                workflow_args: env.get_bytes(WORKFLOW_ARGS)?.to_vec(),
                options: env.get_json(OPTIONS)?,
            },
            MessageType::WorkflowQueryRequest => Request::WorkflowQuery {
                domain: env.get_string(DOMAIN)?.to_string(),
                execution: get_target(env)?,
                query_name: env.get_string(QUERY_NAME)?.to_string(),
                query_args: env.get_bytes(QUERY_ARGS)?.to_vec(),
            },
            MessageType::WorkflowCancelRequest => Request::WorkflowCancel {
                domain: env.get_string(DOMAIN)?.to_string(),
                execution: get_target(env)?,
            },
            MessageType::WorkflowTerminateRequest => Request::WorkflowTerminate {
                domain: env.get_string(DOMAIN)?.to_string(),
                execution: get_target(env)?,
                reason: env.get_string(REASON)?.to_string(),
                details: env.get_bytes(DETAILS)?.to_vec(),
            },
            MessageType::WorkflowGetResultRequest => Request::WorkflowGetResult {
                domain: env.get_string(DOMAIN)?.to_string(),
                execution: get_target(env)?,
            },
            MessageType::WorkflowDescribeExecutionRequest => Request::WorkflowDescribeExecution {
                domain: env.get_string(DOMAIN)?.to_string(),
                execution: get_target(env)?,
            },
            MessageType::WorkflowExecuteChildRequest => Request::WorkflowExecuteChild {
                context_id: env.get_long(CONTEXT_ID)?,
                workflow: env.get_string(WORKFLOW)?.to_string(),
                args: env.get_bytes(ARGS)?.to_vec(),
                options: env.get_json(OPTIONS)?,
            },
            MessageType::WorkflowWaitForChildRequest => Request::WorkflowWaitForChild {
                context_id: env.get_long(CONTEXT_ID)?,
                child_id: env.get_long(CHILD_ID)?,
            },
            MessageType::WorkflowSignalChildRequest => Request::WorkflowSignalChild {
                context_id: env.get_long(CONTEXT_ID)?,
                child_id: env.get_long(CHILD_ID)?,
                signal_name: env.get_string(SIGNAL_NAME)?.to_string(),
                signal_args: env.get_bytes(SIGNAL_ARGS)?.to_vec(),
            },
            MessageType::WorkflowCancelChildRequest => Request::WorkflowCancelChild {
                context_id: env.get_long(CONTEXT_ID)?,
                child_id: env.get_long(CHILD_ID)?,
            },
            other => return Err(EnvelopeError::Unsupported(other)),
        };
        Ok(request)
    }
}

/// Body of a reply, one variant per request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ping,
    Heartbeat,
    DomainDescribe(DomainDescription),
    DomainRegister,
    WorkflowExecute { execution: WorkflowExecution },
    WorkflowSignal,
    WorkflowSignalWithStart { execution: WorkflowExecution },
    WorkflowQuery { result: Vec<u8> },
    WorkflowCancel,
    WorkflowTerminate,
    WorkflowGetResult { result: Vec<u8> },
    WorkflowDescribeExecution(Option<WorkflowDescription>),
    WorkflowExecuteChild {
        child_id: i64,
        execution: WorkflowExecution,
    },
    WorkflowWaitForChild { result: Vec<u8> },
    WorkflowSignalChild,
    WorkflowCancelChild,
}

impl Reply {
    pub fn message_type(&self) -> MessageType {
        match self {
            Reply::Ping => MessageType::PingReply,
            Reply::Heartbeat => MessageType::HeartbeatReply,
            Reply::DomainDescribe(_) => MessageType::DomainDescribeReply,
            Reply::DomainRegister => MessageType::DomainRegisterReply,
            Reply::WorkflowExecute { .. } => MessageType::WorkflowExecuteReply,
            Reply::WorkflowSignal => MessageType::WorkflowSignalReply,
            Reply::WorkflowSignalWithStart { .. } => MessageType::WorkflowSignalWithStartReply,
            Reply::WorkflowQuery { .. } => MessageType::WorkflowQueryReply,
            Reply::WorkflowCancel => MessageType::WorkflowCancelReply,
            Reply::WorkflowTerminate => MessageType::WorkflowTerminateReply,
            Reply::WorkflowGetResult { .. } => MessageType::WorkflowGetResultReply,
            Reply::WorkflowDescribeExecution(_) => MessageType::WorkflowDescribeExecutionReply,
            Reply::WorkflowExecuteChild { .. } => MessageType::WorkflowExecuteChildReply,
            Reply::WorkflowWaitForChild { .. } => MessageType::WorkflowWaitForChildReply,
            Reply::WorkflowSignalChild => MessageType::WorkflowSignalChildReply,
            Reply::WorkflowCancelChild => MessageType::WorkflowCancelChildReply,
        }
    }

    fn write(&self, env: &mut Envelope) -> Result<(), EnvelopeError> {
        match self {
            Reply::Ping
            | Reply::Heartbeat
            | Reply::DomainRegister
            | Reply::WorkflowSignal
            | Reply::WorkflowCancel
            | Reply::WorkflowTerminate
            | Reply::WorkflowSignalChild
            | Reply::WorkflowCancelChild => {}
            Reply::DomainDescribe(domain) => {
                env.set_string(DOMAIN_INFO_NAME, &domain.name);
                env.set_string(DOMAIN_INFO_DESCRIPTION, &domain.description);
                env.set_string(DOMAIN_INFO_STATUS, domain.status.as_str());
                env.set_string(DOMAIN_INFO_OWNER_EMAIL, &domain.owner_email);
                env.set_long(
                    CONFIGURATION_RETENTION_DAYS,
                    i64::from(domain.retention_days),
                );
                env.set_bool(CONFIGURATION_EMIT_METRICS, domain.emit_metrics);
            }
            Reply::WorkflowExecute { execution }
            | Reply::WorkflowSignalWithStart { execution } => {
                env.set_json(EXECUTION, execution)?;
            }
            Reply::WorkflowQuery { result }
            | Reply::WorkflowGetResult { result }
            | Reply::WorkflowWaitForChild { result } => {
                env.set_bytes(RESULT, result.clone());
            }
            Reply::WorkflowDescribeExecution(description) => {
                if let Some(description) = description {
                    env.set_json(DETAILS, description)?;
                }
            }
            Reply::WorkflowExecuteChild {
                child_id,
                execution,
            } => {
                env.set_long(CHILD_ID, *child_id);
                env.set_json(EXECUTION, execution)?;
            }
        }
        Ok(())
    }

    fn read(env: &Envelope) -> Result<Self, EnvelopeError> {
        let reply = match env.message_type() {
            MessageType::PingReply => Reply::Ping,
            MessageType::HeartbeatReply => Reply::Heartbeat,
            MessageType::DomainDescribeReply => Reply::DomainDescribe(DomainDescription {
                name: env.get_string(DOMAIN_INFO_NAME)?.to_string(),
                description: env.get_string(DOMAIN_INFO_DESCRIPTION)?.to_string(),
                owner_email: env.get_string(DOMAIN_INFO_OWNER_EMAIL)?.to_string(),
                status: DomainStatus::parse(env.get_string(DOMAIN_INFO_STATUS)?)
                    .unwrap_or_default(),
                retention_days: get_i32(env, CONFIGURATION_RETENTION_DAYS)?,
                emit_metrics: env.get_bool(CONFIGURATION_EMIT_METRICS)?,
            }),
            MessageType::DomainRegisterReply => Reply::DomainRegister,
            MessageType::WorkflowExecuteReply => Reply::WorkflowExecute {
                execution: env.get_json(EXECUTION)?,
            },
            MessageType::WorkflowSignalReply => Reply::WorkflowSignal,
            MessageType::WorkflowSignalWithStartReply => Reply::WorkflowSignalWithStart {
                execution: env.get_json(EXECUTION)?,
            },
            MessageType::WorkflowQueryReply => Reply::WorkflowQuery {
                result: env.get_bytes(RESULT)?.to_vec(),
            },
            MessageType::WorkflowCancelReply => Reply::WorkflowCancel,
            MessageType::WorkflowTerminateReply => Reply::WorkflowTerminate,
            MessageType::WorkflowGetResultReply => Reply::WorkflowGetResult {
                result: env.get_bytes(RESULT)?.to_vec(),
            },
            MessageType::WorkflowDescribeExecutionReply => {
                Reply::WorkflowDescribeExecution(env.get_optional_json(DETAILS)?)
            }
            MessageType::WorkflowExecuteChildReply => Reply::WorkflowExecuteChild {
                child_id: env.get_long(CHILD_ID)?,
                execution: env.get_json(EXECUTION)?,
            },
            MessageType::WorkflowWaitForChildReply => Reply::WorkflowWaitForChild {
                result: env.get_bytes(RESULT)?.to_vec(),
            },
            MessageType::WorkflowSignalChildReply => Reply::WorkflowSignalChild,
            MessageType::WorkflowCancelChildReply => Reply::WorkflowCancelChild,
            other => return Err(EnvelopeError::Unsupported(other)),
        };
        Ok(reply)
    }
}

/// A decoded reply: the typed body plus the optional remote error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyReply {
    pub body: Reply,
    pub error: Option<ProxyError>,
}

impl ProxyReply {
    pub fn ok(body: Reply) -> Self {
        Self { body, error: None }
    }

    pub fn failed(body: Reply, error: ProxyError) -> Self {
        Self {
            body,
            error: Some(error),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    /// Build the reply envelope answering `request_id`.
    pub fn to_envelope(&self, request_id: i64) -> Result<Envelope, EnvelopeError> {
        let mut env = Envelope::new(self.body.message_type());
        env.set_request_id(request_id);
        self.body.write(&mut env)?;
        if let Some(error) = &self.error {
            env.set_json(ERROR, error)?;
        }
        Ok(env)
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self, EnvelopeError> {
        Ok(Self {
            body: Reply::read(env)?,
            error: env.get_optional_json(ERROR)?,
        })
    }
}

fn get_i32(env: &Envelope, name: &str) -> Result<i32, EnvelopeError> {
    let value = env.get_long(name)?;
    i32::try_from(value).map_err(|_| EnvelopeError::OutOfRange {
        name: name.to_string(),
        value,
    })
}

fn set_target(env: &mut Envelope, domain: &str, execution: &WorkflowExecution) {
    env.set_string(DOMAIN, domain);
    env.set_string(WORKFLOW_ID, &execution.workflow_id);
    env.set_string(RUN_ID, &execution.run_id);
}

fn get_target(env: &Envelope) -> Result<WorkflowExecution, EnvelopeError> {
    Ok(WorkflowExecution::new(
        env.get_string(WORKFLOW_ID)?,
        env.get_string(RUN_ID)?,
    ))
}
