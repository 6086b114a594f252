//! ListBoards command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Execute, ExecutionResult};
use crate::types::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// List boards, optionally only those a user can access
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ListBoards {
    /// Only boards this user owns or is a member of
    pub user: Option<UserId>,
}

operation!(
    ListBoards,
    verb = "list",
    noun = "boards",
    description = "List boards visible to a user"
);

impl ListBoards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user: impl Into<UserId>) -> Self {
        Self {
            user: Some(user.into()),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for ListBoards {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::unlogged(self.run(ctx).await)
    }
}

impl ListBoards {
    async fn run(&self, ctx: &BoardContext) -> Result<Value> {
        let boards: Vec<_> = ctx
            .read_all_boards()
            .await?
            .into_iter()
            .filter(|b| self.user.as_ref().map_or(true, |u| b.is_member(u)))
            .collect();

        Ok(serde_json::json!({
            "boards": boards,
            "count": boards.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AddMember, CreateBoard};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_boards_by_membership() {
        let temp = TempDir::new().unwrap();
        let ctx = BoardContext::new(temp.path().join(".taskboard"));

        let shared = CreateBoard::new("Shared", "alice")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        CreateBoard::new("Private", "alice")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        AddMember::new(shared["id"].as_str().unwrap(), "bob")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let all = ListBoards::new().execute(&ctx).await.into_result().unwrap();
        assert_eq!(all["count"], 2);

        let bobs = ListBoards::for_user("bob")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(bobs["count"], 1);
        assert_eq!(bobs["boards"][0]["title"], "Shared");

        let carols = ListBoards::for_user("carol")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(carols["count"], 0);
    }

    #[tokio::test]
    async fn test_list_boards_empty_storage() {
        let temp = TempDir::new().unwrap();
        let ctx = BoardContext::new(temp.path().join(".taskboard"));
        let value = ListBoards::new().execute(&ctx).await.into_result().unwrap();
        assert_eq!(value["count"], 0);
    }
}
