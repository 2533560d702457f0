// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Length-prefixed property-list encoding of envelopes.
//!
//! Payload layout (all integers little-endian):
//! - 4 bytes: message type (`i32`)
//! - 4 bytes: property count (`i32`)
//! - per property:
//!   - 4 bytes key length + UTF-8 key
//!   - 1 byte kind tag (see [`PropertyKind`])
//!   - value: `String`/`Json` as 4-byte length + UTF-8, `Long` as `i64`,
//!     `Bool` as one byte, `Bytes` as 4-byte length + raw bytes

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::envelope::{Envelope, EnvelopeError, PropertyKind, PropertyValue, REQUEST_ID};
use crate::message_type::MessageType;

/// Errors that can occur while encoding or decoding an envelope payload.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot encode an envelope with an unspecified message type")]
    UnspecifiedType,

    #[error("truncated payload: needed {needed} more bytes for {what}")]
    Truncated { what: &'static str, needed: usize },

    #[error("negative length {0}")]
    NegativeLength(i32),

    #[error("length {0} does not fit the wire format")]
    LengthOverflow(usize),

    #[error("unknown property kind tag: {0}")]
    UnknownKind(u8),

    #[error("duplicate property '{0}'")]
    DuplicateProperty(String),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("{0} trailing bytes after the last property")]
    TrailingBytes(usize),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Encode an envelope into its wire payload.
pub fn encode_envelope(envelope: &Envelope) -> Result<Bytes, CodecError> {
    if envelope.message_type() == MessageType::Unspecified {
        return Err(CodecError::UnspecifiedType);
    }

    let mut buf = BytesMut::with_capacity(64);
    buf.put_i32_le(envelope.message_type() as i32);
    buf.put_i32_le(wire_len(envelope.len())?);

    for (name, value) in envelope.properties() {
        put_str(&mut buf, name)?;
        buf.put_u8(value.kind() as u8);
        match value {
            PropertyValue::String(s) => put_str(&mut buf, s)?,
            PropertyValue::Long(v) => buf.put_i64_le(*v),
            PropertyValue::Bool(v) => buf.put_u8(u8::from(*v)),
            PropertyValue::Bytes(b) => {
                buf.put_i32_le(wire_len(b.len())?);
                buf.put_slice(b);
            }
            PropertyValue::Json(text) => put_str(&mut buf, text)?,
        }
    }

    Ok(buf.freeze())
}

/// Decode a wire payload into an envelope.
///
/// The whole payload must be consumed; trailing bytes are an error.
pub fn decode_envelope(mut payload: Bytes) -> Result<Envelope, CodecError> {
    ensure(&payload, 8, "envelope header")?;
    let message_type = MessageType::try_from(payload.get_i32_le())?;
    let count = read_len(&mut payload)?;

    let mut envelope = Envelope::new(message_type);
    for _ in 0..count {
        let name = read_string(&mut payload, "property key")?;

        ensure(&payload, 1, "property kind")?;
        let tag = payload.get_u8();
        let kind = PropertyKind::try_from(tag).map_err(CodecError::UnknownKind)?;

        let value = match kind {
            PropertyKind::String => PropertyValue::String(read_string(&mut payload, "string")?),
            PropertyKind::Long => {
                ensure(&payload, 8, "long")?;
                PropertyValue::Long(payload.get_i64_le())
            }
            PropertyKind::Bool => {
                ensure(&payload, 1, "bool")?;
                PropertyValue::Bool(payload.get_u8() != 0)
            }
            PropertyKind::Bytes => {
                let len = read_len(&mut payload)?;
                ensure(&payload, len, "bytes")?;
                PropertyValue::Bytes(payload.split_to(len).to_vec())
            }
            // Parsed on access so one bad value cannot hide the request id
            PropertyKind::Json => PropertyValue::Json(read_string(&mut payload, "json")?),
        };

        if !envelope.insert_decoded(name.clone(), value) {
            return Err(CodecError::DuplicateProperty(name));
        }
    }

    if payload.has_remaining() {
        return Err(CodecError::TrailingBytes(payload.remaining()));
    }

    Ok(envelope)
}

/// Best-effort request id of a reply payload that [`decode_envelope`]
/// rejected.
///
/// Walks the property list without validating the message type, kind tags
/// of other properties or trailing bytes. Returns `None` for payloads that
/// are known requests, or when no `RequestId` long can be found.
pub fn peek_request_id(payload: &[u8]) -> Option<i64> {
    let mut payload = Bytes::copy_from_slice(payload);
    ensure(&payload, 8, "envelope header").ok()?;
    if let Ok(message_type) = MessageType::try_from(payload.get_i32_le())
        && message_type.is_request()
    {
        return None;
    }
    let count = read_len(&mut payload).ok()?;

    for _ in 0..count {
        let name = read_string(&mut payload, "property key").ok()?;
        ensure(&payload, 1, "property kind").ok()?;
        let kind = PropertyKind::try_from(payload.get_u8()).ok()?;
        let width = match kind {
            PropertyKind::Long => 8,
            PropertyKind::Bool => 1,
            PropertyKind::String | PropertyKind::Bytes | PropertyKind::Json => {
                read_len(&mut payload).ok()?
            }
        };
        ensure(&payload, width, "value").ok()?;
        if kind == PropertyKind::Long && name == REQUEST_ID {
            return Some(payload.get_i64_le());
        }
        payload.advance(width);
    }
    None
}

fn wire_len(len: usize) -> Result<i32, CodecError> {
    i32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))
}

fn put_str(buf: &mut BytesMut, s: &str) -> Result<(), CodecError> {
    buf.put_i32_le(wire_len(s.len())?);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn ensure(payload: &Bytes, len: usize, what: &'static str) -> Result<(), CodecError> {
    if payload.remaining() < len {
        return Err(CodecError::Truncated {
            what,
            needed: len - payload.remaining(),
        });
    }
    Ok(())
}

fn read_len(payload: &mut Bytes) -> Result<usize, CodecError> {
    ensure(payload, 4, "length")?;
    let len = payload.get_i32_le();
    usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))
}

fn read_string(payload: &mut Bytes, what: &'static str) -> Result<String, CodecError> {
    let len = read_len(payload)?;
    ensure(payload, len, what)?;
    let raw = payload.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8(what))
}
