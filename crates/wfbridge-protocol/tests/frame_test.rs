// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Frame and envelope wire tests for wfbridge-protocol.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use wfbridge_protocol::frame::{HEADER_SIZE, read_frame, write_frame};
use wfbridge_protocol::{
    CodecError, Envelope, Frame, FrameError, FramedStream, MessageType, ProxyReply, Reply,
    Request, WorkflowExecution, decode_envelope, encode_envelope,
};

fn query_request() -> Envelope {
    let mut env = Request::WorkflowQuery {
        domain: "orders".to_string(),
        execution: WorkflowExecution::new("wf-1", "run-1"),
        query_name: "status".to_string(),
        query_args: b"[]".to_vec(),
    }
    .to_envelope()
    .unwrap();
    env.set_request_id(42);
    env.set_client_id(1);
    env
}

#[test]
fn test_frame_length_prefix_matches_payload() {
    let env = query_request();
    let frame = Frame::from_envelope(&env).unwrap();
    let encoded = frame.encode();

    let len = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
    assert_eq!(len, encoded.len() - HEADER_SIZE);
    assert_eq!(
        &encoded[HEADER_SIZE..HEADER_SIZE + 4],
        &(MessageType::WorkflowQueryRequest as i32).to_le_bytes()
    );
}

#[test]
fn test_decode_from_bytes_ignores_trailing_frames() {
    let first = Frame::from_envelope(&query_request()).unwrap();
    let mut buf = BytesMut::new();
    buf.put(first.encode());
    buf.put_slice(&[0, 0, 0, 1, 9]);

    let decoded = Frame::decode_from_bytes(buf.freeze()).unwrap();
    assert_eq!(decoded, first);
}

#[test]
fn test_frame_with_corrupt_payload() {
    let frame = Frame {
        payload: Bytes::from_static(&[102, 0, 0, 0, 5, 0, 0, 0]),
    };
    let result = frame.envelope();
    assert!(matches!(
        result,
        Err(FrameError::Codec(CodecError::Truncated { .. }))
    ));
}

#[test]
fn test_codec_reply_envelope() {
    let reply = ProxyReply::ok(Reply::WorkflowQuery {
        result: b"\"RUNNING\"".to_vec(),
    });
    let env = reply.to_envelope(42).unwrap();
    let decoded = decode_envelope(encode_envelope(&env).unwrap()).unwrap();

    assert_eq!(decoded.request_id(), Some(42));
    assert_eq!(ProxyReply::from_envelope(&decoded).unwrap(), reply);
}

#[tokio::test]
async fn test_multiple_frames_on_one_stream() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    for id in 1..=3 {
        let mut env = Envelope::new(MessageType::PingRequest);
        env.set_request_id(id);
        write_frame(&mut client, &Frame::from_envelope(&env).unwrap())
            .await
            .unwrap();
    }

    for id in 1..=3 {
        let frame = read_frame(&mut server).await.unwrap();
        assert_eq!(frame.envelope().unwrap().request_id(), Some(id));
    }
}

#[tokio::test]
async fn test_partial_frame_then_eof() {
    let (mut client, server) = tokio::io::duplex(64);
    client.write_all(&[0, 0, 0, 10, 1, 2]).await.unwrap();
    drop(client);

    let mut framed = FramedStream::new(server);
    match framed.read_frame().await {
        Err(FrameError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected IO error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clean_eof_is_connection_closed() {
    let (client, server) = tokio::io::duplex(64);
    drop(client);

    let mut framed = FramedStream::new(server);
    assert!(matches!(
        framed.read_envelope().await,
        Err(FrameError::ConnectionClosed)
    ));
}
