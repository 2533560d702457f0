// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration tests for wfbridge-client.

use wfbridge_client::{ClientConfig, ClientError};

const VARS: [&str; 6] = [
    "WFBRIDGE_PROXY_SOCKET",
    "WFBRIDGE_CLIENT_ID",
    "WFBRIDGE_DOMAIN",
    "WFBRIDGE_TASK_LIST",
    "WFBRIDGE_CONNECT_TIMEOUT_MS",
    "WFBRIDGE_REQUEST_TIMEOUT_MS",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: only this test touches these variables
        unsafe { std::env::remove_var(var) };
    }
}

fn set_env(var: &str, value: &str) {
    // SAFETY: only this test touches these variables
    unsafe { std::env::set_var(var, value) };
}

// The environment is process-wide, so every from_env case runs in one test.
#[test]
fn test_from_env() {
    clear_env();
    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.proxy_socket, "/tmp/wfbridge-proxy.sock");
    assert_eq!(config.client_id, 1);
    assert_eq!(config.domain, "default");
    assert_eq!(config.task_list, "default");
    assert_eq!(config.connect_timeout_ms, 10_000);
    assert_eq!(config.request_timeout_ms, 30_000);

    set_env("WFBRIDGE_PROXY_SOCKET", "/run/wfbridge/proxy.sock");
    set_env("WFBRIDGE_CLIENT_ID", "17");
    set_env("WFBRIDGE_DOMAIN", "orders");
    set_env("WFBRIDGE_TASK_LIST", "fulfilment");
    set_env("WFBRIDGE_CONNECT_TIMEOUT_MS", "250");
    set_env("WFBRIDGE_REQUEST_TIMEOUT_MS", "1500");
    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.proxy_socket, "/run/wfbridge/proxy.sock");
    assert_eq!(config.client_id, 17);
    assert_eq!(config.domain, "orders");
    assert_eq!(config.task_list, "fulfilment");
    assert_eq!(config.connect_timeout_ms, 250);
    assert_eq!(config.request_timeout_ms, 1_500);

    // Unparseable timeouts fall back to the defaults
    set_env("WFBRIDGE_REQUEST_TIMEOUT_MS", "soon");
    assert_eq!(ClientConfig::from_env().unwrap().request_timeout_ms, 30_000);

    // A bad client id is a configuration error
    set_env("WFBRIDGE_CLIENT_ID", "not-a-number");
    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
    assert!(err.to_string().contains("WFBRIDGE_CLIENT_ID"));

    clear_env();
}

#[cfg(unix)]
#[tokio::test]
async fn test_connect_to_missing_socket_fails() {
    let config = ClientConfig::new("orders")
        .with_proxy_socket("/nonexistent/wfbridge-test.sock")
        .with_connect_timeout_ms(500);

    let err = match wfbridge_client::WorkflowClient::connect(config).await {
        Ok(_) => panic!("connect to a missing socket must fail"),
        Err(err) => err,
    };
    assert!(err.is_transport(), "unexpected error: {}", err);
}
