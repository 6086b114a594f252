//! Audit collaborator: fire-and-forget event sinks.

use crate::context::BoardContext;
use crate::types::AuditEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receives audit events. Recording never blocks and never fails the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, event: AuditEvent) {
        (**self).record(event)
    }
}

/// Sink that appends events to per-board JSONL files from a background task.
///
/// The writer task ends once every clone of the log has been dropped and the
/// queue is drained; await the returned handle to flush.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ActivityLog {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(ctx: BoardContext) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match ctx.append_activity(&event).await {
                    Ok(()) => debug!(op = %event.op_string(), entity = %event.entity_id, "activity recorded"),
                    Err(err) => warn!(
                        op = %event.op_string(),
                        board = %event.board,
                        error = %err,
                        "failed to write activity"
                    ),
                }
            }
        });
        (Self { tx }, handle)
    }
}

impl AuditSink for ActivityLog {
    fn record(&self, event: AuditEvent) {
        if let Err(err) = self.tx.send(event) {
            warn!(op = %err.0.op_string(), "activity writer stopped, event dropped");
        }
    }
}

/// Sink that keeps events in memory
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
