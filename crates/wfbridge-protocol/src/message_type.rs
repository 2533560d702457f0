// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Message type discriminants shared with the workflow proxy.
//!
//! Every request kind is declared together with the reply kind the proxy
//! must answer with, so the request → reply mapping is generated from a
//! single table and checked exhaustively.

use crate::envelope::EnvelopeError;

macro_rules! message_types {
    ($(
        $(#[$meta:meta])*
        $request:ident = $request_code:literal => $reply:ident = $reply_code:literal
    ),* $(,)?) => {
        /// Message discriminant carried by every envelope.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum MessageType {
            /// Uninitialized message. Never valid on the wire.
            Unspecified = 0,
            $(
                $(#[$meta])*
                $request = $request_code,
                #[doc = concat!("Reply to [`MessageType::", stringify!($request), "`].")]
                $reply = $reply_code,
            )*
        }

        impl MessageType {
            /// The reply type a well-formed answer to this request must carry.
            ///
            /// Returns `None` for replies and for [`MessageType::Unspecified`].
            pub fn reply_type(self) -> Option<MessageType> {
                match self {
                    $( MessageType::$request => Some(MessageType::$reply), )*
                    _ => None,
                }
            }

            /// True for reply discriminants.
            pub fn is_reply(self) -> bool {
                matches!(self, $( MessageType::$reply )|*)
            }

            /// True for request discriminants.
            pub fn is_request(self) -> bool {
                self.reply_type().is_some()
            }
        }

        impl TryFrom<i32> for MessageType {
            type Error = EnvelopeError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $(
                        $request_code => Ok(MessageType::$request),
                        $reply_code => Ok(MessageType::$reply),
                    )*
                    _ => Err(EnvelopeError::UnknownMessageType(value)),
                }
            }
        }
    };
}

message_types! {
    // ---------------------------------------------------------------
    // Client messages

    /// Tells the proxy where the client listens for proxy messages.
    InitializeRequest = 1 => InitializeReply = 2,
    /// Asks the proxy to connect to the workflow cluster.
    ConnectRequest = 3 => ConnectReply = 4,
    /// Asks the proxy process to exit gracefully.
    TerminateRequest = 5 => TerminateReply = 6,
    /// Registers a domain.
    DomainRegisterRequest = 7 => DomainRegisterReply = 8,
    /// Returns the details of a domain.
    DomainDescribeRequest = 9 => DomainDescribeReply = 10,
    /// Updates a domain.
    DomainUpdateRequest = 11 => DomainUpdateReply = 12,
    /// Periodic liveness check of the proxy.
    HeartbeatRequest = 13 => HeartbeatReply = 14,
    /// Cancels a pending proxy operation by request id.
    CancelRequest = 15 => CancelReply = 16,
    /// Starts a worker for a domain and task list.
    NewWorkerRequest = 17 => NewWorkerReply = 18,
    /// Stops a worker.
    StopWorkerRequest = 19 => StopWorkerReply = 20,
    /// Round-trip throughput check.
    PingRequest = 21 => PingReply = 22,
    /// Deprecates a domain.
    DomainDeprecateRequest = 23 => DomainDeprecateReply = 24,

    // ---------------------------------------------------------------
    // Workflow messages

    /// Registers a workflow implementation.
    WorkflowRegisterRequest = 100 => WorkflowRegisterReply = 101,
    /// Starts a workflow execution.
    WorkflowExecuteRequest = 102 => WorkflowExecuteReply = 103,
    /// Signals a running workflow.
    WorkflowSignalRequest = 104 => WorkflowSignalReply = 105,
    /// Starts a workflow if needed and signals it in one round trip.
    WorkflowSignalWithStartRequest = 106 => WorkflowSignalWithStartReply = 107,
    /// Requests cancellation of a workflow execution.
    WorkflowCancelRequest = 108 => WorkflowCancelReply = 109,
    /// Terminates a workflow execution.
    WorkflowTerminateRequest = 110 => WorkflowTerminateReply = 111,
    /// Fetches workflow history.
    WorkflowGetHistoryRequest = 112 => WorkflowGetHistoryReply = 113,
    /// Lists closed executions.
    WorkflowListClosedRequest = 114 => WorkflowListClosedReply = 115,
    /// Lists open executions.
    WorkflowListOpenExecutionsRequest = 116 => WorkflowListOpenExecutionsReply = 117,
    /// Queries a workflow execution.
    WorkflowQueryRequest = 118 => WorkflowQueryReply = 119,
    /// Describes a workflow execution.
    WorkflowDescribeExecutionRequest = 120 => WorkflowDescribeExecutionReply = 121,
    /// Describes a task list.
    WorkflowDescribeTaskListRequest = 122 => WorkflowDescribeTaskListReply = 123,
    /// proxy → client: invokes workflow code.
    WorkflowInvokeRequest = 124 => WorkflowInvokeReply = 125,
    /// Starts a child workflow from a workflow context.
    WorkflowExecuteChildRequest = 126 => WorkflowExecuteChildReply = 127,
    /// Subscribes a workflow to a signal.
    WorkflowSignalSubscribeRequest = 128 => WorkflowSignalSubscribeReply = 129,
    /// proxy → client: delivers a received signal.
    WorkflowSignalInvokeRequest = 130 => WorkflowSignalInvokeReply = 131,
    /// Records a side-effect value.
    WorkflowMutableRequest = 132 => WorkflowMutableReply = 133,
    /// Returns the workflow implementation version.
    WorkflowGetVersionRequest = 134 => WorkflowGetVersionReply = 135,
    /// Sets the sticky workflow cache size.
    WorkflowSetCacheSizeRequest = 136 => WorkflowSetCacheSizeReply = 137,
    /// Waits for a workflow execution to finish and returns its result.
    WorkflowGetResultRequest = 138 => WorkflowGetResultReply = 139,
    /// Checks for a result from a previous cron run.
    WorkflowHasLastResultRequest = 140 => WorkflowHasLastResultReply = 141,
    /// Returns the result from a previous cron run.
    WorkflowGetLastResultRequest = 142 => WorkflowGetLastResultReply = 143,
    /// Detaches a workflow context from cancellation.
    WorkflowDisconnectContextRequest = 144 => WorkflowDisconnectContextReply = 145,
    /// Returns the deterministic workflow time.
    WorkflowGetTimeRequest = 146 => WorkflowGetTimeReply = 147,
    /// Durable sleep inside a workflow.
    WorkflowSleepRequest = 148 => WorkflowSleepReply = 149,
    /// Waits for a child workflow to finish.
    WorkflowWaitForChildRequest = 150 => WorkflowWaitForChildReply = 151,
    /// Signals a child workflow.
    WorkflowSignalChildRequest = 152 => WorkflowSignalChildReply = 153,
    /// Cancels a child workflow.
    WorkflowCancelChildRequest = 154 => WorkflowCancelChildReply = 155,
    /// Registers a query handler.
    WorkflowSetQueryHandlerRequest = 158 => WorkflowSetQueryHandlerReply = 159,
    /// proxy → client: invokes a query handler.
    WorkflowQueryInvokeRequest = 160 => WorkflowQueryInvokeReply = 161,
}
