//! MoveCard command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, CardId, EntityType, ListId, Order};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Set a card's parent list and order key
#[derive(Debug, Deserialize, Serialize)]
pub struct MoveCard {
    pub id: CardId,
    /// Destination list, on the same board
    pub list: ListId,
    /// Order key within the destination list
    pub order: Order,
}

operation!(
    MoveCard,
    verb = "move",
    noun = "card",
    description = "Move a card to a list and order key"
);

impl MoveCard {
    pub fn new(id: impl Into<CardId>, list: impl Into<ListId>, order: impl Into<Order>) -> Self {
        Self {
            id: id.into(),
            list: list.into(),
            order: order.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for MoveCard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl MoveCard {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        if !self.order.value().is_finite() {
            return Err(BoardError::invalid_value("order", "must be a finite number"));
        }

        let mut card = ctx.read_card(&self.id).await?;
        let board = ctx.board_of_card(&card).await?;
        let target = ctx.read_list(&self.list).await?;
        if target.board != board {
            return Err(BoardError::invalid_value(
                "list",
                format!("list '{}' is not on board '{}'", target.id, board),
            ));
        }

        let from = serde_json::json!({ "list": card.list, "order": card.order });
        card.list = self.list.clone();
        card.order = self.order;
        ctx.write_card(&card).await?;

        let activity = Activity::new(AuditAction::Move, EntityType::Card, card.id.as_str(), board)
            .with_metadata(serde_json::json!({
                "from": from,
                "to": { "list": card.list, "order": card.order },
            }));
        Ok((serde_json::to_value(&card)?, activity))
    }
}
