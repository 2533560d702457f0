// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Correlation registry: which requests are waiting for a reply.
//!
//! Every entry is registered once before its request is sent and removed
//! exactly once: by a matching reply, by [`CorrelationRegistry::fail_all`]
//! when the channel closes, or by the caller giving up on its wait. The
//! lock only guards map bookkeeping; completions are sent after it is
//! released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};
use wfbridge_protocol::{Envelope, MessageType};

use crate::error::{ClientError, Result};

type Completion = oneshot::Sender<Result<Envelope>>;

struct PendingEntry {
    expected: MessageType,
    completion: Completion,
}

#[derive(Default)]
struct RegistryState {
    /// Last id handed out. Ids start at 1.
    last_id: i64,
    pending: HashMap<i64, PendingEntry>,
    /// Set by `fail_all`; later registrations fail with this cause.
    closed: Option<String>,
}

/// Result of delivering a reply to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The waiting caller received the reply.
    Delivered,
    /// No request is waiting under this id (late or duplicate reply).
    Unknown,
    /// The reply type does not answer the pending request; the entry stays.
    TypeMismatch,
}

/// Maps outstanding request ids to their pending completions.
#[derive(Default)]
pub struct CorrelationRegistry {
    state: Mutex<RegistryState>,
}

impl CorrelationRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assign a fresh request id expecting a reply of type `expected`.
    pub fn register(self: &Arc<Self>, expected: MessageType) -> Result<PendingReply> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state();
        if let Some(cause) = &state.closed {
            return Err(ClientError::ChannelClosed(cause.clone()));
        }

        state.last_id += 1;
        let request_id = state.last_id;
        state.pending.insert(
            request_id,
            PendingEntry {
                expected,
                completion: tx,
            },
        );
        drop(state);

        debug!(request_id, ?expected, "registered pending request");
        Ok(PendingReply {
            request_id,
            receiver: rx,
            registry: Arc::clone(self),
            settled: false,
        })
    }

    /// Deliver a reply. Never fails: unknown ids and mismatched types are
    /// logged and discarded.
    pub fn resolve(&self, request_id: i64, reply: Envelope) -> ResolveOutcome {
        let mut state = self.state();
        let expected = match state.pending.get(&request_id) {
            Some(entry) => entry.expected,
            None => {
                drop(state);
                warn!(
                    request_id,
                    message_type = ?reply.message_type(),
                    "discarding reply with no pending request (late or duplicate)"
                );
                return ResolveOutcome::Unknown;
            }
        };

        if expected != reply.message_type() {
            drop(state);
            warn!(
                request_id,
                ?expected,
                actual = ?reply.message_type(),
                "discarding reply of unexpected type"
            );
            return ResolveOutcome::TypeMismatch;
        }

        let entry = state.pending.remove(&request_id);
        drop(state);

        if let Some(entry) = entry
            && entry.completion.send(Ok(reply)).is_err()
        {
            debug!(request_id, "caller stopped waiting before the reply arrived");
        }
        ResolveOutcome::Delivered
    }

    /// Fail every pending request with `ChannelClosed(cause)` and refuse new
    /// registrations. Returns the number of requests failed; later calls
    /// are no-ops returning 0.
    pub fn fail_all(&self, cause: &str) -> usize {
        let mut state = self.state();
        if state.closed.is_some() {
            return 0;
        }
        state.closed = Some(cause.to_string());
        let drained: Vec<(i64, PendingEntry)> = state.pending.drain().collect();
        drop(state);

        let count = drained.len();
        for (request_id, entry) in drained {
            debug!(request_id, "failing pending request");
            let _ = entry
                .completion
                .send(Err(ClientError::ChannelClosed(cause.to_string())));
        }
        if count > 0 {
            warn!(count, cause, "failed pending requests after channel closed");
        }
        count
    }

    /// Complete an entry with `error` instead of a reply. Used when a
    /// reply for it arrived but could not be decoded. Returns false if no
    /// request is waiting under this id.
    pub fn reject(&self, request_id: i64, error: ClientError) -> bool {
        let entry = self.state().pending.remove(&request_id);
        match entry {
            Some(entry) => {
                debug!(request_id, error = %error, "rejecting pending request");
                let _ = entry.completion.send(Err(error));
                true
            }
            None => {
                warn!(request_id, "discarding undecodable reply with no pending request");
                false
            }
        }
    }

    /// Remove an entry without completing it. Returns false if it was
    /// already resolved or failed.
    pub fn abandon(&self, request_id: i64) -> bool {
        let removed = self.state().pending.remove(&request_id).is_some();
        if removed {
            debug!(request_id, "abandoned pending request");
        }
        removed
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed.is_some()
    }
}

/// The caller's side of a registered request.
///
/// Dropping it before the reply arrives abandons the registry entry.
pub struct PendingReply {
    request_id: i64,
    receiver: oneshot::Receiver<Result<Envelope>>,
    registry: Arc<CorrelationRegistry>,
    settled: bool,
}

impl PendingReply {
    pub fn request_id(&self) -> i64 {
        self.request_id
    }

    /// Wait for the reply, optionally bounded by `timeout`.
    ///
    /// A timeout only abandons this wait; nothing is sent to the proxy.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<Envelope> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.receiver).await {
                Ok(received) => received,
                Err(_) => return Err(ClientError::Timeout(limit)),
            },
            None => (&mut self.receiver).await,
        };
        self.settled = true;

        match received {
            Ok(result) => result,
            // Sender dropped without completing: the registry went away
            Err(_) => Err(ClientError::ChannelClosed(
                "correlation registry dropped".to_string(),
            )),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.abandon(self.request_id);
        }
    }
}
