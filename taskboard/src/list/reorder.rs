//! ReorderLists command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::planner::ListOrder;
use crate::types::{AuditAction, BoardId, EntityType, ListId, Order};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Write the order keys of several lists of one board at once
#[derive(Debug, Deserialize, Serialize)]
pub struct ReorderLists {
    pub board: BoardId,
    pub lists: Vec<ListOrder>,
}

operation!(
    ReorderLists,
    verb = "reorder",
    noun = "lists",
    description = "Set the order keys of a board's lists"
);

impl ReorderLists {
    pub fn new(board: impl Into<BoardId>, lists: Vec<ListOrder>) -> Self {
        Self {
            board: board.into(),
            lists,
        }
    }

    /// Space the given lists 100, 200, ... in the order given
    pub fn spaced(board: impl Into<BoardId>, lists: impl IntoIterator<Item = ListId>) -> Self {
        let lists = lists
            .into_iter()
            .enumerate()
            .map(|(i, list_id)| ListOrder {
                list_id,
                order: Order::spaced(i),
            })
            .collect();
        Self::new(board, lists)
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for ReorderLists {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl ReorderLists {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        ctx.read_board(&self.board).await?;

        // Validate everything before writing anything
        let mut lists = Vec::with_capacity(self.lists.len());
        for entry in &self.lists {
            let mut list = ctx.read_list(&entry.list_id).await?;
            if list.board != self.board {
                return Err(BoardError::invalid_value(
                    "lists",
                    format!("list '{}' is not on board '{}'", list.id, self.board),
                ));
            }
            list.order = entry.order;
            lists.push(list);
        }
        for list in &lists {
            ctx.write_list(list).await?;
        }

        let sorted = ctx.read_lists(&self.board).await?;
        let activity = Activity::new(
            AuditAction::Update,
            EntityType::Board,
            self.board.as_str(),
            self.board.clone(),
        )
        .with_metadata(serde_json::json!({ "list_orders": self.lists }));
        Ok((serde_json::json!({ "lists": sorted }), activity))
    }
}
