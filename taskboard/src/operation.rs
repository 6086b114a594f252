//! Command-style operations and the processor that runs them.
//!
//! Operations are structs whose fields are their parameters. Each one names
//! itself with a verb and a noun and executes against a context, returning an
//! [`ExecutionResult`]. Mutating operations return `Logged` with the
//! [`Activity`] they performed; the [`BoardOperationProcessor`] attributes it to
//! the acting user and appends it to the board's activity log.

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::types::{AuditAction, AuditEvent, BoardId, EntityType, UserId};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Self-description of an operation
pub trait Operation {
    fn verb(&self) -> &'static str;
    fn noun(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Canonical op string, e.g. "move card"
    fn op_string(&self) -> String {
        format!("{} {}", self.verb(), self.noun())
    }
}

/// Implement [`Operation`] for a command struct
macro_rules! operation {
    ($ty:ty, verb = $verb:literal, noun = $noun:literal, description = $desc:literal) => {
        impl $crate::operation::Operation for $ty {
            fn verb(&self) -> &'static str {
                $verb
            }
            fn noun(&self) -> &'static str {
                $noun
            }
            fn description(&self) -> &'static str {
                $desc
            }
        }
    };
}
pub(crate) use operation;

/// Run an operation against a context
#[async_trait]
pub trait Execute<C: Sync, E>: Operation + Send + Sync {
    async fn execute(&self, ctx: &C) -> ExecutionResult<Value, E>;
}

/// Outcome of an operation
#[derive(Debug)]
pub enum ExecutionResult<T, E> {
    /// Succeeded and changed state
    Logged { value: T, activity: Activity },
    /// Succeeded without side effects
    Unlogged { value: T },
    Failed { error: E },
}

impl<T, E> ExecutionResult<T, E> {
    /// Wrap a mutating operation's result
    pub fn logged(result: std::result::Result<(T, Activity), E>) -> Self {
        match result {
            Ok((value, activity)) => Self::Logged { value, activity },
            Err(error) => Self::Failed { error },
        }
    }

    /// Wrap a read-only operation's result
    pub fn unlogged(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Unlogged { value },
            Err(error) => Self::Failed { error },
        }
    }

    pub fn into_result(self) -> std::result::Result<T, E> {
        self.split().0
    }

    /// Separate the value from the activity to record
    pub fn split(self) -> (std::result::Result<T, E>, Option<Activity>) {
        match self {
            Self::Logged { value, activity } => (Ok(value), Some(activity)),
            Self::Unlogged { value } => (Ok(value), None),
            Self::Failed { error } => (Err(error), None),
        }
    }

    pub fn should_log(&self) -> bool {
        matches!(self, Self::Logged { .. })
    }
}

/// An audit event before it is attributed to an actor
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub board: BoardId,
    pub metadata: Value,
}

impl Activity {
    pub fn new(
        action: AuditAction,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        board: BoardId,
    ) -> Self {
        Self {
            action,
            entity_type,
            entity_id: entity_id.into(),
            board,
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attribute to `actor`
    pub fn into_event(self, actor: UserId) -> AuditEvent {
        AuditEvent::new(
            self.action,
            self.entity_type,
            self.entity_id,
            actor,
            self.board,
        )
        .with_metadata(self.metadata)
    }
}

/// Runs operations on a [`BoardContext`] on behalf of one user
#[derive(Debug, Clone)]
pub struct BoardOperationProcessor {
    actor: UserId,
}

impl BoardOperationProcessor {
    pub fn new(actor: UserId) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &UserId {
        &self.actor
    }

    /// Execute under the storage lock and record the resulting activity.
    ///
    /// A failure to write the activity log is logged and does not fail the
    /// operation.
    pub async fn process<O>(&self, operation: &O, ctx: &BoardContext) -> Result<Value>
    where
        O: Execute<BoardContext, BoardError>,
    {
        ctx.ensure_directories().await?;
        let _lock = ctx.lock().await?;

        debug!(op = %operation.op_string(), actor = %self.actor, "processing operation");
        let (result, activity) = operation.execute(ctx).await.split();

        if let Some(activity) = activity {
            let event = activity.into_event(self.actor.clone());
            if let Err(err) = ctx.append_activity(&event).await {
                warn!(op = %event.op_string(), error = %err, "failed to record activity");
            }
        }
        if let Err(err) = &result {
            debug!(op = %operation.op_string(), error = %err, "operation failed");
        }
        result
    }
}
