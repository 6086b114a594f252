//! Persistence collaborator contract.
//!
//! Every call is fallible. A failed call means the command was not applied;
//! callers never assume a retry happened.

use crate::aggregate::BoardAggregate;
use crate::error::Result;
use crate::planner::{CardOrder, ListOrder, PersistCommand};
use crate::types::{BoardId, Card, CardId, List, ListId, Order};
use async_trait::async_trait;

/// Storage for boards, lists and cards
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Load a board with lists and cards nested and sorted by order key
    async fn load_board(&self, id: &BoardId) -> Result<BoardAggregate>;

    /// Commit a card's parent list and order key
    async fn save_card_position(&self, card: &CardId, list: &ListId, order: Order) -> Result<()>;

    /// Commit one list's order key
    async fn save_list_order(&self, list: &ListId, order: Order) -> Result<()>;

    /// Commit the order keys of several lists at once
    async fn save_list_sequence(&self, orders: &[ListOrder]) -> Result<()>;

    /// Commit the keys of several cards of one list at once. Either every
    /// card is written or none is.
    async fn save_card_sequence(&self, list: &ListId, orders: &[CardOrder]) -> Result<()>;

    async fn create_list(&self, list: &List) -> Result<()>;

    async fn create_card(&self, card: &Card) -> Result<()>;

    async fn delete_card(&self, id: &CardId) -> Result<()>;

    /// Delete a list and its cards. Returns the ids of the deleted cards.
    async fn delete_list(&self, id: &ListId) -> Result<Vec<CardId>>;

    /// Dispatch a planner command to the matching save call
    async fn apply(&self, command: &PersistCommand) -> Result<()> {
        match command {
            PersistCommand::CardPosition {
                card_id,
                list_id,
                order,
            } => self.save_card_position(card_id, list_id, *order).await,
            PersistCommand::ListOrder { list_id, order } => {
                self.save_list_order(list_id, *order).await
            }
            PersistCommand::ListSequence(orders) => self.save_list_sequence(orders).await,
            PersistCommand::CardSequence { list_id, cards } => {
                self.save_card_sequence(list_id, cards).await
            }
        }
    }
}
