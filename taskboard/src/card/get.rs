//! GetCard command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Execute, ExecutionResult};
use crate::types::CardId;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read one card. The output adds the owning `board` and an `overdue` flag.
#[derive(Debug, Deserialize, Serialize)]
pub struct GetCard {
    pub id: CardId,
}

operation!(GetCard, verb = "get", noun = "card", description = "Show a card");

impl GetCard {
    pub fn new(id: impl Into<CardId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for GetCard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::unlogged(self.run(ctx).await)
    }
}

impl GetCard {
    async fn run(&self, ctx: &BoardContext) -> Result<Value> {
        let card = ctx.read_card(&self.id).await?;
        let board = ctx.board_of_card(&card).await?;
        let mut value = serde_json::to_value(&card)?;
        value["board"] = serde_json::json!(board);
        value["overdue"] = serde_json::json!(card.is_overdue(Utc::now()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{AddCard, UpdateCard};
    use crate::list::test_support::board_with_lists;

    #[tokio::test]
    async fn test_get_card() {
        let (_temp, ctx, board, todo, _done) = board_with_lists().await;
        let card = AddCard::new(todo.as_str(), "Read me")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let result = GetCard::new(card["id"].as_str().unwrap()).execute(&ctx).await;
        assert!(!result.should_log());
        let value = result.into_result().unwrap();
        assert_eq!(value["title"], "Read me");
        assert_eq!(value["board"], board.as_str());
        assert_eq!(value["overdue"], false);
    }

    #[tokio::test]
    async fn test_get_card_reports_overdue() {
        let (_temp, ctx, _board, todo, _done) = board_with_lists().await;
        let card = AddCard::new(todo.as_str(), "Late")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let id = card["id"].as_str().unwrap();
        UpdateCard::new(id)
            .with_due_date(Utc::now() - chrono::Duration::hours(1))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let value = GetCard::new(id).execute(&ctx).await.into_result().unwrap();
        assert_eq!(value["overdue"], true);
    }

    #[tokio::test]
    async fn test_get_missing_card() {
        let (_temp, ctx, _board, _todo, _done) = board_with_lists().await;
        let err = GetCard::new("nope").execute(&ctx).await.into_result().unwrap_err();
        assert!(err.is_not_found());
    }
}
