// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end tests over a framed byte stream.

mod common;

use std::sync::Arc;

use common::{init_tracing, run_fake_proxy};
use futures::future::join_all;
use tokio::io::DuplexStream;
use wfbridge_client::{
    ClientConfig, ClientError, CorrelationRegistry, DomainStatus, ReplyDispatcher, WorkflowClient,
    WorkflowExecution,
};
use wfbridge_protocol::{
    DomainDescription, Envelope, Frame, FramedStream, MessageType, PropertyKind, PropertyValue,
    ProxyReply, Reply, Request, StreamTransport,
};

fn connect(stream: DuplexStream) -> (WorkflowClient, Arc<CorrelationRegistry>) {
    init_tracing();
    let registry = CorrelationRegistry::new();
    let dispatcher = ReplyDispatcher::new(registry.clone());
    let transport = StreamTransport::spawn(stream, dispatcher);
    let config = ClientConfig::new("orders").with_request_timeout_ms(5_000);
    (
        WorkflowClient::with_transport(transport, registry.clone(), config),
        registry,
    )
}

#[tokio::test]
async fn test_ping_and_domain_describe() {
    let (client_side, proxy_side) = tokio::io::duplex(64 * 1024);
    let (client, registry) = connect(client_side);

    let proxy = tokio::spawn(run_fake_proxy(proxy_side, |request| match request {
        Request::Ping => Some(ProxyReply::ok(Reply::Ping)),
        Request::DomainDescribe { name } => Some(ProxyReply::ok(Reply::DomainDescribe(
            DomainDescription {
                name,
                description: "order processing".to_string(),
                status: DomainStatus::Registered,
                owner_email: "ops@example.com".to_string(),
                retention_days: 7,
                emit_metrics: true,
            },
        ))),
        _ => None,
    }));

    client.ping().await.unwrap();
    let domain = client.describe_domain("orders").await.unwrap();
    assert_eq!(domain.name, "orders");
    assert_eq!(domain.retention_days, 7);
    assert!(domain.emit_metrics);

    client.close().await;
    assert_eq!(proxy.await.unwrap(), 2);
    assert_eq!(registry.pending_count(), 0);
}

#[tokio::test]
async fn test_register_domain_failure_is_remote() {
    let (client_side, proxy_side) = tokio::io::duplex(64 * 1024);
    let (client, _) = connect(client_side);

    tokio::spawn(run_fake_proxy(proxy_side, |request| match request {
        Request::DomainRegister { name, .. } => Some(ProxyReply::failed(
            Reply::DomainRegister,
            wfbridge_client::ProxyError::generic(format!("domain {} already exists", name)),
        )),
        _ => None,
    }));

    let err = client
        .register_domain("orders", "order processing", "ops@example.com", 7, false)
        .await
        .unwrap_err();
    match err {
        ClientError::Remote(error) => assert!(error.message.contains("already exists")),
        other => panic!("expected remote error, got {}", other),
    }
}

#[tokio::test]
async fn test_replies_out_of_order_reach_their_callers() {
    let (client_side, proxy_side) = tokio::io::duplex(256 * 1024);
    let (client, registry) = connect(client_side);

    const CALLS: usize = 16;

    // Collect every query first, then answer them newest first
    let proxy = tokio::spawn(async move {
        let mut framed = FramedStream::new(proxy_side);
        let mut received = Vec::with_capacity(CALLS);
        while received.len() < CALLS {
            let envelope = framed.read_envelope().await.unwrap();
            if let Ok(Request::WorkflowQuery { query_args, .. }) = Request::from_envelope(&envelope)
            {
                received.push((envelope.request_id().unwrap(), query_args));
            }
        }
        for (request_id, query_args) in received.into_iter().rev() {
            // Echo the argument so callers can check they got their own reply
            let reply = ProxyReply::ok(Reply::WorkflowQuery { result: query_args })
                .to_envelope(request_id)
                .unwrap();
            framed.write_envelope(&reply).await.unwrap();
        }
        framed
    });

    let stub = client.attach_workflow_stub("Greeter", WorkflowExecution::new("wf-1", "run-1"));
    let queries = (0..CALLS).map(|i| {
        let stub = &stub;
        async move { (i, stub.query::<_, usize>("echo", &i).await) }
    });

    for (i, result) in join_all(queries).await {
        assert_eq!(result.unwrap(), i);
    }
    assert_eq!(registry.pending_count(), 0);
    drop(proxy.await.unwrap());
}

#[tokio::test]
async fn test_proxy_exit_fails_pending_requests() {
    let (client_side, proxy_side) = tokio::io::duplex(64 * 1024);
    let (client, registry) = connect(client_side);

    // Start succeeds, then the proxy goes away without answering get_result
    let proxy = tokio::spawn(async move {
        let mut framed = FramedStream::new(proxy_side);
        let start = framed.read_envelope().await.unwrap();
        let reply = ProxyReply::ok(Reply::WorkflowExecute {
            execution: WorkflowExecution::new("wf-9", "run-9"),
        })
        .to_envelope(start.request_id().unwrap())
        .unwrap();
        framed.write_envelope(&reply).await.unwrap();

        let pending = framed.read_envelope().await.unwrap();
        drop(framed);
        pending
    });

    let stub = client.new_workflow_stub("Greeter");
    stub.start(&"Alice").await.unwrap();

    let err = stub.get_result(None).await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {}", err);
    assert!(registry.is_closed());
    assert_eq!(registry.pending_count(), 0);
    proxy.await.unwrap();

    // New calls fail immediately once the channel is gone
    let err = client.ping().await.unwrap_err();
    assert!(err.is_transport());
    assert!(client.connection().is_closed());
}

#[tokio::test]
async fn test_close_fails_waiting_callers() {
    let (client_side, proxy_side) = tokio::io::duplex(64 * 1024);
    let (client, _) = connect(client_side);

    // A proxy that never answers
    let proxy = tokio::spawn(run_fake_proxy(proxy_side, |_| None));

    let stub = client.attach_workflow_stub("Greeter", WorkflowExecution::new("wf-1", "run-1"));
    let closer = client.clone();
    let (result, _) = tokio::join!(stub.get_result(None), async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        closer.close().await;
    });

    match result {
        Err(ClientError::ChannelClosed(_)) => {}
        other => panic!("expected channel closed, got {:?}", other),
    }
    assert_eq!(proxy.await.unwrap(), 0);
}

#[tokio::test]
async fn test_corrupt_error_property_fails_the_call() {
    let (client_side, proxy_side) = tokio::io::duplex(64 * 1024);
    let (client, registry) = connect(client_side);

    let proxy = tokio::spawn(async move {
        let mut framed = FramedStream::new(proxy_side);
        let query = framed.read_envelope().await.unwrap();
        let mut reply = Envelope::new(MessageType::WorkflowQueryReply);
        reply.set_request_id(query.request_id().unwrap());
        reply.set_bytes("Result", b"\"ok\"".to_vec());
        reply.set("Error", PropertyValue::Json("{not json".to_string()));
        framed.write_envelope(&reply).await.unwrap();
        framed
    });

    let stub = client.attach_workflow_stub("Greeter", WorkflowExecution::new("wf-1", "run-1"));
    let err = stub.query::<_, String>("status", &()).await.unwrap_err();
    match err {
        ClientError::MalformedReply(detail) => assert!(detail.contains("Error"), "{}", detail),
        other => panic!("expected malformed reply, got {:?}", other),
    }
    assert_eq!(registry.pending_count(), 0);
    drop(proxy.await.unwrap());
}

#[tokio::test]
async fn test_undecodable_reply_fails_its_caller() {
    let (client_side, proxy_side) = tokio::io::duplex(64 * 1024);
    let (client, registry) = connect(client_side);

    // Answer the ping with an unknown message type that still carries the request id
    let proxy = tokio::spawn(async move {
        let mut framed = FramedStream::new(proxy_side);
        let ping = framed.read_envelope().await.unwrap();
        let request_id = ping.request_id().unwrap();

        let mut payload = Vec::new();
        payload.extend_from_slice(&999i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.extend_from_slice(&9i32.to_le_bytes());
        payload.extend_from_slice(b"RequestId");
        payload.push(PropertyKind::Long as u8);
        payload.extend_from_slice(&request_id.to_le_bytes());
        framed
            .write_frame(&Frame {
                payload: payload.into(),
            })
            .await
            .unwrap();
        framed
    });

    let err = client.ping().await.unwrap_err();
    assert!(
        matches!(err, ClientError::MalformedReply(_)),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(registry.pending_count(), 0);
    assert!(!registry.is_closed());
    drop(proxy.await.unwrap());
}
