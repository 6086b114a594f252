//! UpdateCard command

use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Activity, Execute, ExecutionResult};
use crate::types::{AuditAction, CardId, EntityType, Label};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Edit a card's fields. Absent fields are left unchanged.
///
/// Label changes apply in this order: `labels` replaces the whole set,
/// `add_labels` adds (rejecting names already present), `toggle_labels` flips
/// each label on or off. `clear_labels` runs first of all.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateCard {
    pub id: CardId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub clear_labels: bool,
    #[serde(default)]
    pub labels: Option<Vec<Label>>,
    #[serde(default)]
    pub add_labels: Vec<Label>,
    #[serde(default)]
    pub toggle_labels: Vec<Label>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_due_date: bool,
}

operation!(
    UpdateCard,
    verb = "update",
    noun = "card",
    description = "Edit a card's title, description, labels or due date"
);

impl UpdateCard {
    pub fn new(id: impl Into<CardId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_clear_labels(mut self) -> Self {
        self.clear_labels = true;
        self
    }

    pub fn add_label(mut self, label: Label) -> Self {
        self.add_labels.push(label);
        self
    }

    pub fn toggle_label(mut self, label: Label) -> Self {
        self.toggle_labels.push(label);
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_clear_due_date(mut self) -> Self {
        self.clear_due_date = true;
        self
    }

    fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.clear_labels
            || self.labels.is_some()
            || !self.add_labels.is_empty()
            || !self.toggle_labels.is_empty()
        {
            fields.push("labels");
        }
        if self.due_date.is_some() || self.clear_due_date {
            fields.push("due_date");
        }
        fields
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for UpdateCard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::logged(self.run(ctx).await)
    }
}

impl UpdateCard {
    async fn run(&self, ctx: &BoardContext) -> Result<(Value, Activity)> {
        if self.due_date.is_some() && self.clear_due_date {
            return Err(BoardError::invalid_value(
                "due_date",
                "cannot set and clear the due date at once",
            ));
        }

        let mut card = ctx.read_card(&self.id).await?;

        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(BoardError::missing_field("title"));
            }
            card.title = title.to_string();
        }
        if let Some(description) = &self.description {
            card.description = description.clone();
        }

        if self.clear_labels {
            card.labels.clear();
        }
        if let Some(labels) = &self.labels {
            card.set_labels(labels.iter().cloned());
        }
        for label in &self.add_labels {
            if !card.add_label(label.clone()) {
                return Err(BoardError::DuplicateLabel {
                    card: card.id.to_string(),
                    name: label.name.clone(),
                });
            }
        }
        for label in &self.toggle_labels {
            card.toggle_label(label.clone());
        }

        if let Some(due) = self.due_date {
            card.due_date = Some(due);
        }
        if self.clear_due_date {
            card.due_date = None;
        }

        let board = ctx.board_of_card(&card).await?;
        ctx.write_card(&card).await?;

        let activity = Activity::new(AuditAction::Update, EntityType::Card, card.id.as_str(), board)
            .with_metadata(serde_json::json!({ "fields": self.changed_fields() }));
        Ok((serde_json::to_value(&card)?, activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::AddCard;
    use crate::list::test_support::board_with_lists;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, BoardContext, String) {
        let (temp, ctx, _board, todo, _done) = board_with_lists().await;
        let card = AddCard::new(todo.as_str(), "Draft")
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let id = card["id"].as_str().unwrap().to_string();
        (temp, ctx, id)
    }

    #[tokio::test]
    async fn test_update_title_and_description() {
        let (_temp, ctx, id) = setup().await;

        let (result, activity) = UpdateCard::new(id.as_str())
            .with_title("Final")
            .with_description("Ready")
            .execute(&ctx)
            .await
            .split();
        let value = result.unwrap();
        assert_eq!(value["title"], "Final");
        assert_eq!(value["description"], "Ready");
        assert_eq!(
            activity.unwrap().metadata["fields"],
            serde_json::json!(["title", "description"])
        );
    }

    #[tokio::test]
    async fn test_toggle_labels() {
        let (_temp, ctx, id) = setup().await;

        UpdateCard::new(id.as_str())
            .toggle_label(Label::new("bug"))
            .toggle_label(Label::new("urgent"))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        let value = UpdateCard::new(id.as_str())
            .toggle_label(Label::new("bug"))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let names: Vec<_> = value["labels"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["urgent"]);
    }

    #[tokio::test]
    async fn test_add_duplicate_label_rejected() {
        let (_temp, ctx, id) = setup().await;
        UpdateCard::new(id.as_str())
            .add_label(Label::new("bug"))
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();

        let result = UpdateCard::new(id.as_str())
            .add_label(Label::new("bug").with_color("000000"))
            .execute(&ctx)
            .await
            .into_result();
        assert!(matches!(result, Err(BoardError::DuplicateLabel { .. })));
    }

    #[tokio::test]
    async fn test_set_and_clear_due_date() {
        let (_temp, ctx, id) = setup().await;
        let due = Utc::now();

        let value = UpdateCard::new(id.as_str())
            .with_due_date(due)
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert!(value.get("due_date").is_some());

        let value = UpdateCard::new(id.as_str())
            .with_clear_due_date()
            .execute(&ctx)
            .await
            .into_result()
            .unwrap();
        assert!(value.get("due_date").is_none());

        let result = UpdateCard::new(id.as_str())
            .with_due_date(due)
            .with_clear_due_date()
            .execute(&ctx)
            .await
            .into_result();
        assert!(matches!(result, Err(BoardError::InvalidValue { .. })));
    }
}
