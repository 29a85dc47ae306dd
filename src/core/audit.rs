//! Audit sink implementations.
//!
//! Every mutation the assigner performs can be mirrored into a sink, giving
//! the host application a history of who got which dish and when.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{ItemId, OrderId, WorkItem, WorkerId};
use crate::util::clock::now;

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Pending item handed to a worker by a rebalance pass.
    Assign,
    /// Assigned item moved into the worker's active slot.
    Promote,
    /// Rejected item handed to a different worker.
    Reassign,
    /// Held item returned to the pending pool.
    Release,
    /// Item finished.
    Ready,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assign => "assign",
            Self::Promote => "promote",
            Self::Reassign => "reassign",
            Self::Release => "release",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: Uuid,
    /// Related item.
    pub item_id: ItemId,
    /// Order owning the item.
    pub order_id: OrderId,
    /// Worker the action concerns.
    pub worker_id: Option<WorkerId>,
    /// Action taken.
    pub action: AuditAction,
    /// When it happened.
    pub created_at: DateTime<Utc>,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Shared sinks let the host keep a handle for reading while the assigner writes.
impl<T: AuditSink> AuditSink for Arc<Mutex<T>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}

/// Sink that only emits a tracing line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            item = event.item_id,
            order = event.order_id,
            worker = ?event.worker_id,
            action = %event.action,
            "audit"
        );
    }
}

/// Helper to build an audit event for `item`.
pub fn build_audit_event(
    item: &WorkItem,
    worker_id: Option<WorkerId>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4(),
        item_id: item.id,
        order_id: item.order_id,
        worker_id,
        action,
        created_at: now(),
        detail,
    }
}
