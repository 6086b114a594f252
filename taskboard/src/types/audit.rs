//! Audit event types for board activity tracking

use super::ids::{AuditEventId, BoardId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What happened to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Move,
    Invite,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Invite => "invite",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Board,
    List,
    Card,
    Member,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::List => "list",
            Self::Card => "card",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a board's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique ID for this event
    pub id: AuditEventId,

    /// When the change was made
    pub timestamp: DateTime<Utc>,

    pub action: AuditAction,

    pub entity_type: EntityType,

    /// Id of the affected board, list, card or member
    pub entity_id: String,

    /// Who made the change
    pub actor: UserId,

    /// Board the change belongs to
    pub board: BoardId,

    /// Additional context (e.g. destination list and order of a move)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl AuditEvent {
    /// Create a new event stamped with the current time
    pub fn new(
        action: AuditAction,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        actor: UserId,
        board: BoardId,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            timestamp: Utc::now(),
            action,
            entity_type,
            entity_id: entity_id.into(),
            actor,
            board,
            metadata: Value::Null,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Canonical op string (e.g. "move card")
    pub fn op_string(&self) -> String {
        format!("{} {}", self.action, self.entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = AuditEvent::new(
            AuditAction::Move,
            EntityType::Card,
            "c1",
            UserId::from_string("alice"),
            BoardId::from_string("b1"),
        );

        assert_eq!(event.op_string(), "move card");
        assert_eq!(event.entity_id, "c1");
        assert!(event.metadata.is_null());
    }

    #[test]
    fn test_event_wire_format() {
        let event = AuditEvent::new(
            AuditAction::Invite,
            EntityType::Member,
            "bob",
            UserId::from_string("alice"),
            BoardId::from_string("b1"),
        )
        .with_metadata(serde_json::json!({"role": "member"}));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "invite");
        assert_eq!(json["entity_type"], "member");
        assert_eq!(json["actor"], "alice");
        assert_eq!(json["metadata"]["role"], "member");

        let parsed: AuditEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_null_metadata_is_omitted() {
        let event = AuditEvent::new(
            AuditAction::Delete,
            EntityType::List,
            "l1",
            UserId::from_string("alice"),
            BoardId::from_string("b1"),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("metadata").is_none());
    }
}
