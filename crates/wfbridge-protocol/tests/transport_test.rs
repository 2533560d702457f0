// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stream transport tests for wfbridge-protocol.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use wfbridge_protocol::{
    Envelope, Frame, FrameError, FramedStream, InboundHandler, MessageType, PropertyKind,
    StreamTransport, Transport, TransportError,
};

#[derive(Debug)]
enum Event {
    Envelope(Envelope),
    Malformed(Option<i64>),
    Closed(String),
}

struct RecordingHandler {
    events: mpsc::UnboundedSender<Event>,
    closed_calls: Mutex<u32>,
}

impl RecordingHandler {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                events: tx,
                closed_calls: Mutex::new(0),
            }),
            rx,
        )
    }
}

impl InboundHandler for RecordingHandler {
    fn on_envelope(&self, envelope: Envelope) {
        let _ = self.events.send(Event::Envelope(envelope));
    }

    fn on_malformed(&self, request_id: Option<i64>, _error: &FrameError) {
        let _ = self.events.send(Event::Malformed(request_id));
    }

    fn on_closed(&self, cause: &str) {
        *self.closed_calls.lock().unwrap() += 1;
        let _ = self.events.send(Event::Closed(cause.to_string()));
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("handler dropped")
}

fn ping(request_id: i64) -> Envelope {
    let mut env = Envelope::new(MessageType::PingRequest);
    env.set_request_id(request_id);
    env
}

#[tokio::test]
async fn test_send_reaches_peer() {
    let (client, server) = tokio::io::duplex(4096);
    let (handler, _rx) = RecordingHandler::new();
    let transport = StreamTransport::spawn(client, handler);

    transport.send(&ping(1)).await.unwrap();

    let mut peer = FramedStream::new(server);
    let received = peer.read_envelope().await.unwrap();
    assert_eq!(received, ping(1));
}

#[tokio::test]
async fn test_inbound_envelopes_reach_handler() {
    let (client, server) = tokio::io::duplex(4096);
    let (handler, mut rx) = RecordingHandler::new();
    let _transport = StreamTransport::spawn(client, handler);

    let mut peer = FramedStream::new(server);
    let mut reply = Envelope::new(MessageType::PingReply);
    reply.set_request_id(7);
    peer.write_envelope(&reply).await.unwrap();

    match next_event(&mut rx).await {
        Event::Envelope(env) => assert_eq!(env, reply),
        other => panic!("expected envelope, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_envelope_is_skipped() {
    let (client, server) = tokio::io::duplex(4096);
    let (handler, mut rx) = RecordingHandler::new();
    let _transport = StreamTransport::spawn(client, handler);

    let (read_half, mut write_half) = tokio::io::split(server);
    drop(read_half);

    // Well-framed but undecodable: unknown message type 999
    let mut garbage = Vec::new();
    garbage.extend_from_slice(&8u32.to_be_bytes());
    garbage.extend_from_slice(&999i32.to_le_bytes());
    garbage.extend_from_slice(&0i32.to_le_bytes());
    write_half.write_all(&garbage).await.unwrap();

    let mut peer = FramedStream::new(write_half);
    let mut reply = Envelope::new(MessageType::PingReply);
    reply.set_request_id(2);
    peer.write_envelope(&reply).await.unwrap();

    match next_event(&mut rx).await {
        Event::Malformed(request_id) => assert_eq!(request_id, None),
        other => panic!("expected a malformed report, got {:?}", other),
    }
    match next_event(&mut rx).await {
        Event::Envelope(env) => assert_eq!(env.request_id(), Some(2)),
        other => panic!("expected the valid envelope, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_reply_reports_its_request_id() {
    let (client, server) = tokio::io::duplex(4096);
    let (handler, mut rx) = RecordingHandler::new();
    let _transport = StreamTransport::spawn(client, handler);

    // Unknown message type 999 carrying RequestId = 5
    let mut payload = Vec::new();
    payload.extend_from_slice(&999i32.to_le_bytes());
    payload.extend_from_slice(&1i32.to_le_bytes());
    payload.extend_from_slice(&9i32.to_le_bytes());
    payload.extend_from_slice(b"RequestId");
    payload.push(PropertyKind::Long as u8);
    payload.extend_from_slice(&5i64.to_le_bytes());

    let mut peer = FramedStream::new(server);
    peer.write_frame(&Frame {
        payload: payload.into(),
    })
    .await
    .unwrap();

    match next_event(&mut rx).await {
        Event::Malformed(request_id) => assert_eq!(request_id, Some(5)),
        other => panic!("expected a malformed report, got {:?}", other),
    }
}

#[tokio::test]
async fn test_peer_close_reports_once() {
    let (client, server) = tokio::io::duplex(4096);
    let (handler, mut rx) = RecordingHandler::new();
    let transport = StreamTransport::spawn(client, handler.clone());

    drop(server);

    match next_event(&mut rx).await {
        Event::Closed(cause) => assert!(cause.contains("closed")),
        other => panic!("expected close, got {:?}", other),
    }

    // Closing afterwards must not report a second time
    transport.close().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*handler.closed_calls.lock().unwrap(), 1);
    assert!(transport.is_closed());
}

#[tokio::test]
async fn test_send_after_close_fails() {
    let (client, _server) = tokio::io::duplex(4096);
    let (handler, mut rx) = RecordingHandler::new();
    let transport = StreamTransport::spawn(client, handler);

    transport.close().await;
    assert!(transport.is_closed());

    let result = transport.send(&ping(1)).await;
    assert!(matches!(result, Err(TransportError::Closed(_))));

    match next_event(&mut rx).await {
        Event::Closed(cause) => assert_eq!(cause, "transport closed"),
        other => panic!("expected close, got {:?}", other),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_connect_unix_missing_socket() {
    let (handler, _rx) = RecordingHandler::new();
    let result = StreamTransport::connect_unix(
        "/tmp/wfbridge-test-no-such-socket.sock",
        Duration::from_secs(1),
        handler,
    )
    .await;
    assert!(matches!(result, Err(TransportError::Io(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_connect_unix_round_trip() {
    let path = std::env::temp_dir().join(format!("wfbridge-test-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let listener = tokio::net::UnixListener::bind(&path).unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = FramedStream::new(stream);
        let request = framed.read_envelope().await.unwrap();
        let mut reply = Envelope::new(MessageType::PingReply);
        reply.set_request_id(request.request_id().unwrap());
        framed.write_envelope(&reply).await.unwrap();
    });

    let (handler, mut rx) = RecordingHandler::new();
    let transport = StreamTransport::connect_unix(
        path.to_str().unwrap(),
        Duration::from_secs(5),
        handler,
    )
    .await
    .unwrap();

    transport.send(&ping(5)).await.unwrap();
    match next_event(&mut rx).await {
        Event::Envelope(env) => {
            assert_eq!(env.message_type(), MessageType::PingReply);
            assert_eq!(env.request_id(), Some(5));
        }
        other => panic!("expected reply, got {:?}", other),
    }

    server.await.unwrap();
    let _ = std::fs::remove_file(&path);
}
