//! AddList command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, BoardId, EntityType, List};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append a list to a board
#[derive(Debug, Deserialize, Serialize)]
pub struct AddList {
    /// The board ID
    pub board: BoardId,
    /// The list title
    pub title: String,
}

operation!(
    AddList,
    verb = "add",
    noun = "list",
    description = "Add a list to the end of a board"
);

impl AddList {
    pub fn new(board: impl Into<BoardId>, title: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            title: title.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for AddList {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl AddList {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BoardError::missing_field("title"));
        }
        ctx.read_board(&self.board).await?;

        let order = ctx.next_list_order(&self.board).await?;
        let list = List::new(self.board.clone(), title, order);
        ctx.write_list(&list).await?;

        let activity = Activity::new(
            AuditAction::Create,
            EntityType::List,
            list.id.as_str(),
            self.board.clone(),
        )
        .with_metadata(serde_json::json!({ "title": list.title }));
        Ok((serde_json::to_value(&list)?, activity))
    }
}
