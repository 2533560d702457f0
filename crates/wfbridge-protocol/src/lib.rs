// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! wfbridge Protocol - envelopes, wire codec and transport for the workflow proxy
//!
//! This crate provides the wire protocol spoken between a workflow client
//! and the out-of-process workflow proxy (a sibling process that fronts the
//! Cadence/Temporal cluster).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    wfbridge-protocol                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Typed messages: Request / ProxyReply variants               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Envelope: MessageType + typed property list                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Codec: length-prefixed property-list encoding              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transport: framed byte stream (Unix socket, pipe, duplex)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use wfbridge_protocol::{Request, StreamTransport, Transport};
//!
//! let transport = StreamTransport::connect_unix(
//!     "/tmp/wfbridge-proxy.sock",
//!     Duration::from_secs(10),
//!     handler, // Arc<dyn InboundHandler>
//! )
//! .await?;
//!
//! let mut envelope = Request::Ping.to_envelope()?;
//! envelope.set_request_id(1);
//! transport.send(&envelope).await?;
//! ```

pub mod codec;
pub mod envelope;
pub mod frame;
pub mod message_type;
pub mod messages;
pub mod transport;
pub mod types;

pub use codec::{CodecError, decode_envelope, encode_envelope, peek_request_id};
pub use envelope::{Envelope, EnvelopeError, PropertyKind, PropertyValue};
pub use frame::{Frame, FrameError, FramedStream};
pub use message_type::MessageType;
pub use messages::{ProxyReply, Reply, Request};
pub use transport::{InboundHandler, StreamTransport, Transport, TransportError};
pub use types::{
    ChildWorkflowOptions, DomainDescription, DomainStatus, ErrorType, ProxyError,
    StartWorkflowOptions, WorkflowDescription, WorkflowExecution, WorkflowIdReusePolicy,
    WorkflowStatus,
};
