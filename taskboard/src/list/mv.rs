//! MoveList command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, EntityType, ListId, Order};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Set a list's order key
#[derive(Debug, Deserialize, Serialize)]
pub struct MoveList {
    pub id: ListId,
    /// New order key among the board's lists
    pub order: Order,
}

operation!(
    MoveList,
    verb = "move",
    noun = "list",
    description = "Move a list to a new order key"
);

impl MoveList {
    pub fn new(id: impl Into<ListId>, order: impl Into<Order>) -> Self {
        Self {
            id: id.into(),
            order: order.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for MoveList {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl MoveList {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        if !self.order.value().is_finite() {
            return Err(BoardError::invalid_value("order", "must be a finite number"));
        }

        let mut list = ctx.read_list(&self.id).await?;
        let from = list.order;
        list.order = self.order;
        ctx.write_list(&list).await?;

        let activity = Activity::new(
            AuditAction::Move,
            EntityType::List,
            list.id.as_str(),
            list.board.clone(),
        )
        .with_metadata(serde_json::json!({ "from": from, "order": list.order }));
        Ok((serde_json::to_value(&list)?, activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::test_support::board_with_lists;
    use crate::types::BoardId;

    #[tokio::test]
    async fn test_move_list_reorders_board() {
        let (_temp, ctx, board, _todo, done) = board_with_lists().await;

        MoveList::new(done.as_str(), 50.0)
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let lists = ctx.read_lists(&BoardId::from_string(board)).await.unwrap();
        assert_eq!(lists[0].title, "Done");
        assert_eq!(lists[1].title, "To Do");
    }

    #[tokio::test]
    async fn test_move_list_rejects_nan() {
        let (_temp, ctx, _board, todo, _done) = board_with_lists().await;
        let result = MoveList::new(todo.as_str(), f64::NAN)
            .execute(&ctx)
            .await
            .into_result();
        assert!(matches!(result, Err(BoardError::InvalidValue { .. })));
    }
}
