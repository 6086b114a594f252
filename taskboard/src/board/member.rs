//! AddMember command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, BoardId, EntityType, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Give a user access to a board
#[derive(Debug, Deserialize, Serialize)]
pub struct AddMember {
    /// The board ID
    pub board: BoardId,
    /// The user to add
    pub user: UserId,
}

operation!(
    AddMember,
    verb = "invite",
    noun = "member",
    description = "Add a member to a board"
);

impl AddMember {
    pub fn new(board: impl Into<BoardId>, user: impl Into<UserId>) -> Self {
        Self {
            board: board.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for AddMember {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl AddMember {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        let mut board = ctx.read_board(&self.board).await?;
        if !board.add_member(self.user.clone()) {
            return Err(BoardError::duplicate_id("member", self.user.as_str()));
        }
        ctx.write_board(&board).await?;

        let activity = Activity::new(
            AuditAction::Invite,
            EntityType::Member,
            self.user.as_str(),
            board.id.clone(),
        );
        Ok((serde_json::to_value(&board)?, activity))
    }
}
