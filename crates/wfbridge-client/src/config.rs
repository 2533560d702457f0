// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client configuration for connecting to the workflow proxy.

use std::env;
use std::time::Duration;

use crate::error::{ClientError, Result};

const DEFAULT_PROXY_SOCKET: &str = "/tmp/wfbridge-proxy.sock";

/// Client configuration for connecting to the workflow proxy.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Unix socket of the proxy (default: "/tmp/wfbridge-proxy.sock")
    pub proxy_socket: String,
    /// Client id stamped on every request (default: 1)
    pub client_id: i64,
    /// Domain used for workflow operations (default: "default")
    pub domain: String,
    /// Default task list for new workflow stubs (default: "default")
    pub task_list: String,
    /// Connection timeout in milliseconds (default: 10_000)
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds (default: 30_000).
    /// Not applied to get-result and wait-for-child, which wait for the
    /// workflow itself.
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `WFBRIDGE_PROXY_SOCKET` - Proxy socket path (default: "/tmp/wfbridge-proxy.sock")
    /// - `WFBRIDGE_CLIENT_ID` - Client id (default: 1)
    /// - `WFBRIDGE_DOMAIN` - Domain (default: "default")
    /// - `WFBRIDGE_TASK_LIST` - Default task list (default: "default")
    /// - `WFBRIDGE_CONNECT_TIMEOUT_MS` - Connection timeout (default: 10000)
    /// - `WFBRIDGE_REQUEST_TIMEOUT_MS` - Request timeout (default: 30000)
    pub fn from_env() -> Result<Self> {
        let proxy_socket = env::var("WFBRIDGE_PROXY_SOCKET")
            .unwrap_or_else(|_| DEFAULT_PROXY_SOCKET.to_string());

        let client_id = match env::var("WFBRIDGE_CLIENT_ID") {
            Ok(v) => v
                .parse()
                .map_err(|e| ClientError::Config(format!("invalid WFBRIDGE_CLIENT_ID: {}", e)))?,
            Err(_) => 1,
        };

        let domain = env::var("WFBRIDGE_DOMAIN").unwrap_or_else(|_| "default".to_string());

        let task_list = env::var("WFBRIDGE_TASK_LIST").unwrap_or_else(|_| "default".to_string());

        let connect_timeout_ms = env::var("WFBRIDGE_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);

        let request_timeout_ms = env::var("WFBRIDGE_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);

        Ok(Self {
            proxy_socket,
            client_id,
            domain,
            task_list,
            connect_timeout_ms,
            request_timeout_ms,
        })
    }

    /// Create a new configuration for the given domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            proxy_socket: DEFAULT_PROXY_SOCKET.to_string(),
            client_id: 1,
            domain: domain.into(),
            task_list: "default".to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }

    /// Set the proxy socket path.
    pub fn with_proxy_socket(mut self, path: impl Into<String>) -> Self {
        self.proxy_socket = path.into();
        self
    }

    /// Set the client id.
    pub fn with_client_id(mut self, client_id: i64) -> Self {
        self.client_id = client_id;
        self
    }

    /// Set the default task list.
    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = task_list.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
