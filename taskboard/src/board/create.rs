//! CreateBoard command

use crate::context::BoardContext;
use crate::error::BoardError;
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, Board, EntityType, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Create a new, empty board
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBoard {
    /// The board title
    pub title: String,
    /// The owning user
    pub owner: UserId,
}

operation!(
    CreateBoard,
    verb = "create",
    noun = "board",
    description = "Create a new board"
);

impl CreateBoard {
    pub fn new(title: impl Into<String>, owner: impl Into<UserId>) -> Self {
        Self {
            title: title.into(),
            owner: owner.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for CreateBoard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(
            async {
                let title = self.title.trim();
                if title.is_empty() {
                    return Err(BoardError::missing_field("title"));
                }

                ctx.ensure_directories().await?;
                let board = Board::new(title, self.owner.clone());
                ctx.write_board(&board).await?;

                let activity = Activity::new(
                    AuditAction::Create,
                    EntityType::Board,
                    board.id.as_str(),
                    board.id.clone(),
                )
                .with_metadata(serde_json::json!({ "title": board.title }));
                Ok((serde_json::to_value(&board)?, activity))
            }
            .await,
        )
    }
}
