// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client error types.

use std::time::Duration;

use thiserror::Error;
use wfbridge_protocol::{EnvelopeError, ProxyError, TransportError};

/// Errors that can occur in the workflow client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error (invalid environment variable)
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the stub's current state
    #[error("cannot {operation} a workflow stub in state {actual} (requires {expected})")]
    InvalidState {
        operation: &'static str,
        expected: &'static str,
        actual: String,
    },

    /// No child workflow is registered under this id
    #[error("child workflow {0} not found")]
    ChildNotFound(i64),

    /// The channel to the proxy is closed
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Sending to the proxy failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The caller's wait elapsed before a reply arrived
    #[error("timed out after {0:?} waiting for the proxy")]
    Timeout(Duration),

    /// The proxy reported an error for this request
    #[error("proxy error: {0}")]
    Remote(ProxyError),

    /// The reply could not be interpreted
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// Argument or result (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// True for the "channel unavailable" failure kind.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::ChannelClosed(_) | ClientError::Transport(_))
    }

    /// True for errors raised at the call site before anything was sent.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidState { .. } | ClientError::ChildNotFound(_)
        )
    }
}

impl From<EnvelopeError> for ClientError {
    fn from(err: EnvelopeError) -> Self {
        ClientError::MalformedReply(err.to_string())
    }
}

/// Type alias for client results.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use wfbridge_protocol::ErrorType;

    #[test]
    fn test_error_kinds() {
        assert!(ClientError::ChannelClosed("gone".into()).is_transport());
        assert!(ClientError::Transport(TransportError::Closed("gone".into())).is_transport());
        assert!(!ClientError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(ClientError::ChildNotFound(3).is_usage());
        assert!(!ClientError::Remote(ProxyError::generic("x")).is_usage());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::InvalidState {
            operation: "signal",
            expected: "Started",
            actual: "Created".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot signal a workflow stub in state Created (requires Started)"
        );

        let err = ClientError::Remote(ProxyError::new(ErrorType::Custom, "boom"));
        assert_eq!(err.to_string(), "proxy error: custom error: boom");
    }
}
