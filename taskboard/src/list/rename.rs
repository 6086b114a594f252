//! RenameList command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, EntityType, ListId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Change a list's title
#[derive(Debug, Deserialize, Serialize)]
pub struct RenameList {
    pub id: ListId,
    pub title: String,
}

operation!(
    RenameList,
    verb = "update",
    noun = "list",
    description = "Rename a list"
);

impl RenameList {
    pub fn new(id: impl Into<ListId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for RenameList {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl RenameList {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BoardError::missing_field("title"));
        }

        let mut list = ctx.read_list(&self.id).await?;
        let previous = std::mem::replace(&mut list.title, title.to_string());
        ctx.write_list(&list).await?;

        let activity = Activity::new(
            AuditAction::Update,
            EntityType::List,
            list.id.as_str(),
            list.board.clone(),
        )
        .with_metadata(serde_json::json!({ "from": previous, "title": list.title }));
        Ok((serde_json::to_value(&list)?, activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::test_support::board_with_lists;

    #[tokio::test]
    async fn test_rename_list() {
        let (_temp, ctx, _board, todo, _done) = board_with_lists().await;

        let (result, activity) = RenameList::new(todo.as_str(), "Backlog")
            .execute(&ctx)
            .await
            .split();
        assert_eq!(result.unwrap()["title"], "Backlog");
        assert_eq!(activity.unwrap().metadata["from"], "To Do");

        let stored = ctx.read_list(&ListId::from_string(todo)).await.unwrap();
        assert_eq!(stored.title, "Backlog");
    }

    #[tokio::test]
    async fn test_rename_missing_list() {
        let (_temp, ctx, _board, _todo, _done) = board_with_lists().await;
        let result = RenameList::new("nope", "X").execute(&ctx).await.into_result();
        assert!(matches!(result, Err(BoardError::ListNotFound { .. })));
    }
}
