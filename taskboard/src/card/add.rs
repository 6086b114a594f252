//! AddCard command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, Card, EntityType, ListId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append a card to a list
#[derive(Debug, Deserialize, Serialize)]
pub struct AddCard {
    /// The list ID
    pub list: ListId,
    /// The card title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Who created the card
    #[serde(default)]
    pub creator: Option<UserId>,
}

operation!(
    AddCard,
    verb = "add",
    noun = "card",
    description = "Add a card to the end of a list"
);

impl AddCard {
    pub fn new(list: impl Into<ListId>, title: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            title: title.into(),
            description: None,
            creator: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<UserId>) -> Self {
        self.creator = Some(creator.into());
        self
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for AddCard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl AddCard {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BoardError::missing_field("title"));
        }
        let list = ctx.read_list(&self.list).await?;

        let order = ctx.next_card_order(&self.list).await?;
        let mut card = Card::new(self.list.clone(), title, order);
        if let Some(description) = &self.description {
            card = card.with_description(description.as_str());
        }
        if let Some(creator) = &self.creator {
            card = card.with_creator(creator.clone());
        }
        ctx.write_card(&card).await?;

        let activity = Activity::new(
            AuditAction::Create,
            EntityType::Card,
            card.id.as_str(),
            list.board,
        )
        .with_metadata(serde_json::json!({ "title": card.title, "list": card.list }));
        Ok((serde_json::to_value(&card)?, activity))
    }
}
