// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Child workflow dispatch table.
//!
//! The proxy numbers children per workflow context, so two contexts on one
//! connection can both own a child 1. Entries are keyed by
//! `(context_id, child_id)`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use wfbridge_protocol::WorkflowExecution;

use crate::error::{ClientError, Result};

/// A child workflow started from a workflow context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildHandle {
    pub child_id: i64,
    /// Workflow context that started the child.
    pub context_id: i64,
    pub execution: WorkflowExecution,
}

type ChildKey = (i64, i64);

#[derive(Default)]
pub struct ChildTable {
    children: Mutex<HashMap<ChildKey, ChildHandle>>,
}

impl ChildTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn children(&self) -> MutexGuard<'_, HashMap<ChildKey, ChildHandle>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a child under its context. The first handle for a
    /// `(context_id, child_id)` pair wins; a collision is logged and the new
    /// handle dropped. Returns whether it was added.
    pub fn add(&self, handle: ChildHandle) -> bool {
        let key = (handle.context_id, handle.child_id);
        match self.children().entry(key) {
            Entry::Occupied(existing) => {
                warn!(
                    context_id = handle.context_id,
                    child_id = handle.child_id,
                    existing = %existing.get().execution,
                    rejected = %handle.execution,
                    "child id already registered in this context, keeping the first handle"
                );
                false
            }
            Entry::Vacant(slot) => {
                debug!(
                    context_id = handle.context_id,
                    child_id = handle.child_id,
                    "child registered"
                );
                slot.insert(handle);
                true
            }
        }
    }

    pub fn get(&self, context_id: i64, child_id: i64) -> Result<ChildHandle> {
        self.children()
            .get(&(context_id, child_id))
            .cloned()
            .ok_or(ClientError::ChildNotFound(child_id))
    }

    pub fn remove(&self, context_id: i64, child_id: i64) -> Option<ChildHandle> {
        self.children().remove(&(context_id, child_id))
    }

    /// Drop every child owned by `context_id`. Returns how many were removed.
    pub fn remove_context(&self, context_id: i64) -> usize {
        let mut children = self.children();
        let before = children.len();
        children.retain(|(owner, _), _| *owner != context_id);
        let removed = before - children.len();
        if removed > 0 {
            debug!(context_id, removed, "released children of closed context");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }
}
