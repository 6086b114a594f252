//! Board-level types: Board, List

use super::ids::{BoardId, ListId, UserId};
use super::order::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A board - title plus membership.
///
/// The board does not embed its lists. Each list names its parent board and
/// carries its own order key, so reordering lists never rewrites the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub owner: UserId,
    #[serde(default)]
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Board {
    /// Create a new board owned by `owner`
    pub fn new(title: impl Into<String>, owner: UserId) -> Self {
        Self {
            id: BoardId::new(),
            title: title.into(),
            owner,
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a member (builder form)
    pub fn with_member(mut self, user: UserId) -> Self {
        self.add_member(user);
        self
    }

    /// Add a member. Returns false if the user already has access.
    pub fn add_member(&mut self, user: UserId) -> bool {
        if self.is_member(&user) {
            return false;
        }
        self.members.push(user);
        true
    }

    /// Whether the user owns the board or is one of its members
    pub fn is_member(&self, user: &UserId) -> bool {
        &self.owner == user || self.members.contains(user)
    }
}

/// A list (column) on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board: BoardId,
    pub title: String,
    pub order: Order,
    pub created_at: DateTime<Utc>,
}

impl List {
    /// Create a new list on `board` at the given order key
    pub fn new(board: BoardId, title: impl Into<String>, order: Order) -> Self {
        Self {
            id: ListId::new(),
            board,
            title: title.into(),
            order,
            created_at: Utc::now(),
        }
    }

    /// Override the generated id
    pub fn with_id(mut self, id: impl Into<ListId>) -> Self {
        self.id = id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_creation() {
        let board = Board::new("Launch", UserId::from_string("alice"));
        assert_eq!(board.title, "Launch");
        assert!(board.members.is_empty());
        assert_eq!(board.id.as_str().len(), 26);
    }

    #[test]
    fn test_membership() {
        let alice = UserId::from_string("alice");
        let bob = UserId::from_string("bob");
        let carol = UserId::from_string("carol");

        let mut board = Board::new("Launch", alice.clone()).with_member(bob.clone());
        assert!(board.is_member(&alice));
        assert!(board.is_member(&bob));
        assert!(!board.is_member(&carol));

        // Owner and existing members are not added twice
        assert!(!board.add_member(alice));
        assert!(!board.add_member(bob));
        assert_eq!(board.members.len(), 1);
    }

    #[test]
    fn test_list_serialization() {
        let list = List::new(BoardId::from_string("b1"), "To Do", Order::new(100.0)).with_id("l1");
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["id"], "l1");
        assert_eq!(json["board"], "b1");
        assert_eq!(json["order"], 100.0);

        let parsed: List = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, list);
    }
}
