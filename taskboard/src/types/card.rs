//! Card types: Card, Label

use super::ids::{CardId, ListId, UserId};
use super::order::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A colored label on a card. Names are unique per card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// 6-character hex color code without #
    pub color: String,
}

impl Label {
    /// Create a label with a deterministic color derived from its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let color = crate::auto_color::auto_color(&name).to_string();
        Self { name, color }
    }

    /// Override the color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into().trim_start_matches('#').to_string();
        self
    }
}

/// A card in a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    /// Committed parent list
    pub list: ListId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Order,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card in `list` at the given order key
    pub fn new(list: ListId, title: impl Into<String>, order: Order) -> Self {
        Self {
            id: CardId::new(),
            list,
            title: title.into(),
            description: String::new(),
            order,
            labels: Vec::new(),
            due_date: None,
            creator: None,
            created_at: Utc::now(),
        }
    }

    /// Override the generated id
    pub fn with_id(mut self, id: impl Into<CardId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the creator
    pub fn with_creator(mut self, creator: UserId) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Whether a label with this name is on the card
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }

    /// Add a label. Returns false if a label with the same name is already present.
    pub fn add_label(&mut self, label: Label) -> bool {
        if self.has_label(&label.name) {
            return false;
        }
        self.labels.push(label);
        true
    }

    /// Remove a label by name. Returns false if it was not present.
    pub fn remove_label(&mut self, name: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l.name != name);
        self.labels.len() != before
    }

    /// Remove the label if present, add it otherwise. Returns true if the label
    /// is on the card afterwards.
    pub fn toggle_label(&mut self, label: Label) -> bool {
        if self.remove_label(&label.name) {
            false
        } else {
            self.labels.push(label);
            true
        }
    }

    /// Replace all labels, keeping the first occurrence of each name
    pub fn set_labels(&mut self, labels: impl IntoIterator<Item = Label>) {
        self.labels.clear();
        for label in labels {
            self.add_label(label);
        }
    }

    /// Whether the due date has passed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map(|due| due < now).unwrap_or(false)
    }
}
