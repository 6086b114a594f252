//! DeleteCard command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, CardId, EntityType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Delete a card
#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteCard {
    pub id: CardId,
}

operation!(
    DeleteCard,
    verb = "delete",
    noun = "card",
    description = "Delete a card"
);

impl DeleteCard {
    pub fn new(id: impl Into<CardId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for DeleteCard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl DeleteCard {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        let card = ctx.read_card(&self.id).await?;
        let board = ctx.board_of_card(&card).await?;
        ctx.delete_card_file(&self.id).await?;

        let activity = Activity::new(AuditAction::Delete, EntityType::Card, card.id.as_str(), board)
            .with_metadata(serde_json::json!({ "title": card.title, "list": card.list }));
        Ok((serde_json::json!({ "deleted": true, "id": card.id }), activity))
    }
}
