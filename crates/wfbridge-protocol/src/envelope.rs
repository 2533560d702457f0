// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generic message envelope: a message type plus a typed property list.
//!
//! The envelope is the only untyped representation of a message and lives at
//! the wire boundary. Application code works with [`crate::Request`] and
//! [`crate::ProxyReply`], which convert to and from envelopes.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::message_type::MessageType;

/// Correlation id assigned by the client for every request.
pub const REQUEST_ID: &str = "RequestId";
/// Identifies the client connection on the proxy side.
pub const CLIENT_ID: &str = "ClientId";
/// Identifies the workflow context a workflow-scoped request belongs to.
pub const CONTEXT_ID: &str = "ContextId";
/// JSON-encoded [`crate::ProxyError`] carried by replies.
pub const ERROR: &str = "Error";

/// Errors raised while reading typed values out of an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unknown message type: {0}")]
    UnknownMessageType(i32),

    #[error("property '{name}' holds a {actual:?} value, expected {expected:?}")]
    KindMismatch {
        name: String,
        expected: PropertyKind,
        actual: PropertyKind,
    },

    #[error("property '{name}' holds invalid JSON: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("property '{name}' value {value} is out of range")]
    OutOfRange { name: String, value: i64 },

    #[error("{0:?} is not supported by the typed message layer")]
    Unsupported(MessageType),
}

/// Kind of a property value. The discriminant doubles as the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PropertyKind {
    String = 1,
    Long = 2,
    Bool = 3,
    Bytes = 4,
    Json = 5,
}

impl TryFrom<u8> for PropertyKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PropertyKind::String),
            2 => Ok(PropertyKind::Long),
            3 => Ok(PropertyKind::Bool),
            4 => Ok(PropertyKind::Bytes),
            5 => Ok(PropertyKind::Json),
            other => Err(other),
        }
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Long(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    /// JSON text as it travels on the wire; parsed on read.
    Json(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Long(_) => PropertyKind::Long,
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Bytes(_) => PropertyKind::Bytes,
            PropertyValue::Json(_) => PropertyKind::Json,
        }
    }
}

/// A typed request or reply as exchanged with the proxy.
///
/// `Clone` produces a fully independent deep copy, so a clone kept for
/// diagnostics never observes later changes to the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    message_type: MessageType,
    properties: BTreeMap<String, PropertyValue>,
}

impl Envelope {
    /// Create an empty envelope of the given type.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            properties: BTreeMap::new(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Number of properties that are set.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate properties in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Raw access to a property value.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Remove a property, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    /// Set a property value.
    ///
    /// # Panics
    ///
    /// Panics if `name` already holds a value of a different kind. Writing a
    /// key with two kinds is a programming error in the message layer.
    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        if let Some(existing) = self.properties.get(&name)
            && existing.kind() != value.kind()
        {
            panic!(
                "property '{}' already holds a {:?} value, cannot set {:?}",
                name,
                existing.kind(),
                value.kind()
            );
        }
        self.properties.insert(name, value);
    }

    pub fn set_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, PropertyValue::String(value.into()));
    }

    pub fn set_long(&mut self, name: impl Into<String>, value: i64) {
        self.set(name, PropertyValue::Long(value));
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) {
        self.set(name, PropertyValue::Bool(value));
    }

    pub fn set_bytes(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.set(name, PropertyValue::Bytes(value.into()));
    }

    /// Serialize `value` to JSON and store it.
    pub fn set_json<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), EnvelopeError> {
        let name = name.into();
        let json = serde_json::to_string(value).map_err(|source| EnvelopeError::Json {
            name: name.clone(),
            source,
        })?;
        self.set(name, PropertyValue::Json(json));
        Ok(())
    }

    /// String property, `""` when absent.
    pub fn get_string(&self, name: &str) -> Result<&str, EnvelopeError> {
        Ok(self.get_optional_string(name)?.unwrap_or(""))
    }

    /// String property, `None` when absent.
    pub fn get_optional_string(&self, name: &str) -> Result<Option<&str>, EnvelopeError> {
        match self.properties.get(name) {
            None => Ok(None),
            Some(PropertyValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(name, PropertyKind::String, other)),
        }
    }

    /// Integer property, `0` when absent.
    pub fn get_long(&self, name: &str) -> Result<i64, EnvelopeError> {
        match self.properties.get(name) {
            None => Ok(0),
            Some(PropertyValue::Long(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, PropertyKind::Long, other)),
        }
    }

    /// Boolean property, `false` when absent.
    pub fn get_bool(&self, name: &str) -> Result<bool, EnvelopeError> {
        match self.properties.get(name) {
            None => Ok(false),
            Some(PropertyValue::Bool(v)) => Ok(*v),
            Some(other) => Err(mismatch(name, PropertyKind::Bool, other)),
        }
    }

    /// Byte property, empty when absent.
    pub fn get_bytes(&self, name: &str) -> Result<&[u8], EnvelopeError> {
        match self.properties.get(name) {
            None => Ok(&[]),
            Some(PropertyValue::Bytes(v)) => Ok(v.as_slice()),
            Some(other) => Err(mismatch(name, PropertyKind::Bytes, other)),
        }
    }

    /// JSON property decoded into `T`, `T::default()` when absent or null.
    pub fn get_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, EnvelopeError> {
        Ok(self.get_optional_json(name)?.unwrap_or_default())
    }

    /// JSON property decoded into `T`, `None` when absent or null.
    ///
    /// Malformed JSON surfaces here, not when the envelope is decoded, so a
    /// reply with a bad payload still reaches the request waiting for it.
    pub fn get_optional_json<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, EnvelopeError> {
        let text = match self.properties.get(name) {
            None => return Ok(None),
            Some(PropertyValue::Json(text)) => text,
            Some(other) => return Err(mismatch(name, PropertyKind::Json, other)),
        };
        let json_err = |source| EnvelopeError::Json {
            name: name.to_string(),
            source,
        };
        let value: serde_json::Value = serde_json::from_str(text).map_err(json_err)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some).map_err(json_err)
    }

    /// Correlation id, if one has been stamped.
    pub fn request_id(&self) -> Option<i64> {
        match self.properties.get(REQUEST_ID) {
            Some(PropertyValue::Long(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn set_request_id(&mut self, request_id: i64) {
        self.set_long(REQUEST_ID, request_id);
    }

    pub fn client_id(&self) -> Result<i64, EnvelopeError> {
        self.get_long(CLIENT_ID)
    }

    pub fn set_client_id(&mut self, client_id: i64) {
        self.set_long(CLIENT_ID, client_id);
    }

    /// Insert a decoded property without kind checks. Returns false when the
    /// key was already present.
    pub(crate) fn insert_decoded(&mut self, name: String, value: PropertyValue) -> bool {
        use std::collections::btree_map::Entry;

        match self.properties.entry(name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

fn mismatch(name: &str, expected: PropertyKind, actual: &PropertyValue) -> EnvelopeError {
    EnvelopeError::KindMismatch {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}
