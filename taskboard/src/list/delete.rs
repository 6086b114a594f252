//! DeleteList command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, EntityType, ListId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Delete a list and every card in it
#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteList {
    pub id: ListId,
}

operation!(
    DeleteList,
    verb = "delete",
    noun = "list",
    description = "Delete a list and its cards"
);

impl DeleteList {
    pub fn new(id: impl Into<ListId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for DeleteList {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl DeleteList {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        let list = ctx.read_list(&self.id).await?;
        let cards = ctx.read_cards(&self.id).await?;
        for card in &cards {
            ctx.delete_card_file(&card.id).await?;
        }
        ctx.delete_list_file(&self.id).await?;

        let card_ids: Vec<_> = cards.iter().map(|c| c.id.as_str()).collect();
        let activity = Activity::new(
            AuditAction::Delete,
            EntityType::List,
            list.id.as_str(),
            list.board.clone(),
        )
        .with_metadata(serde_json::json!({ "title": list.title, "cards": card_ids }));

        Ok((
            serde_json::json!({ "deleted": true, "id": list.id, "cards_deleted": cards.len() }),
            activity,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::AddCard;
    use crate::list::test_support::board_with_lists;
    use crate::types::CardId;

    #[tokio::test]
    async fn test_delete_list_cascades_to_cards() {
        let (_temp, ctx, _board, todo, done) = board_with_lists().await;
        let doomed = AddCard::new(todo.as_str(), "doomed")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let kept = AddCard::new(done.as_str(), "kept")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let value = DeleteList::new(todo.as_str())
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(value["cards_deleted"], 1);

        let doomed = CardId::from_string(doomed["id"].as_str().unwrap());
        let kept = CardId::from_string(kept["id"].as_str().unwrap());
        assert!(ctx.read_card(&doomed).await.is_err());
        assert!(ctx.read_card(&kept).await.is_ok());
        assert!(ctx.read_list(&ListId::from_string(todo)).await.is_err());
    }
}
