//! ListActivity command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Execute, ExecutionResult};
use crate::types::BoardId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read a board's activity, newest first
#[derive(Debug, Deserialize, Serialize)]
pub struct ListActivity {
    pub board: BoardId,
    /// Maximum number of events to return
    #[serde(default)]
    pub limit: Option<usize>,
}

operation!(
    ListActivity,
    verb = "list",
    noun = "activity",
    description = "Show a board's activity, newest first"
);

impl ListActivity {
    pub fn new(board: impl Into<BoardId>) -> Self {
        Self {
            board: board.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for ListActivity {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::unlogged(self.run(ctx).await)
    }
}

impl ListActivity {
    async fn run(&self, ctx: &BoardContext) -> Result<Value> {
        ctx.read_board(&self.board).await?;
        let events = ctx.read_activity(&self.board, self.limit).await?;
        Ok(serde_json::json!({
            "count": events.len(),
            "events": events,
        }))
    }
}
