//! Reorder planner: one drop → one aggregate mutation + at most one persistence command.
//!
//! A gesture is resolved in three steps. The drop target is translated into a
//! destination `(container, index)`; the aggregate performs the move and hands
//! back the neighbors of the new slot; the order key allocator turns those
//! neighbors into the moved item's new key. The result is compared with the
//! placement the item had when the gesture started, and only a real change
//! produces a [`PersistCommand`].
//!
//! List moves use single gap-fill: one `ListOrder` per move.
//! [`PersistCommand::ListSequence`] and [`PersistCommand::CardSequence`] carry a
//! whole respaced sequence and are only produced by [`respace_lists`] and
//! [`respace_cards`]. Each is committed by one store call, so a failed respace
//! leaves the stored order as it was.

use crate::aggregate::{BoardAggregate, Neighbors};
use crate::error::{BoardError, Result};
use crate::types::{allocate, CardId, ListId, Order};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The entity being dragged
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DragItem {
    Card(CardId),
    List(ListId),
}

impl DragItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Card(id) => id.as_str(),
            Self::List(id) => id.as_str(),
        }
    }
}

/// Screen-space rectangle delivered with hover events
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Vertical midpoint
    pub fn mid_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Whether this rect's midpoint lies below `other`'s midpoint
    pub fn is_below(&self, other: &Rect) -> bool {
        self.mid_y() > other.mid_y()
    }
}

/// What the pointer is over
#[derive(Debug, Clone, PartialEq)]
pub enum DropTarget {
    /// Another card (or the dragged card itself)
    Card { id: CardId, rect: Rect },
    /// The body of a list, outside any card
    List { id: ListId, rect: Rect },
}

impl DropTarget {
    pub fn card(id: impl Into<CardId>, rect: Rect) -> Self {
        Self::Card {
            id: id.into(),
            rect,
        }
    }

    pub fn list(id: impl Into<ListId>, rect: Rect) -> Self {
        Self::List {
            id: id.into(),
            rect,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Card { id, .. } => id.as_str(),
            Self::List { id, .. } => id.as_str(),
        }
    }
}

/// Where an item sits
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// The list holding a card; `None` for a list's own slot on the board
    pub container: Option<ListId>,
    pub index: usize,
    pub order: Order,
}

impl Placement {
    /// Whether both placements name the same slot, ignoring the key
    pub fn same_slot(&self, other: &Placement) -> bool {
        self.container == other.container && self.index == other.index
    }
}

/// One `{list, order}` pair of a list sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOrder {
    pub list_id: ListId,
    pub order: Order,
}

/// One `{card, order}` pair of a card sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardOrder {
    pub card_id: CardId,
    pub order: Order,
}

/// The persistence command a gesture commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum PersistCommand {
    CardPosition {
        card_id: CardId,
        list_id: ListId,
        order: Order,
    },
    ListOrder {
        list_id: ListId,
        order: Order,
    },
    ListSequence(Vec<ListOrder>),
    /// Every card of one list with its key
    CardSequence {
        list_id: ListId,
        cards: Vec<CardOrder>,
    },
}

// =============================================================================
// Placements
// =============================================================================

/// Current placement of a card
pub fn card_placement(aggregate: &BoardAggregate, card: &CardId) -> Result<Placement> {
    let (list, index) = aggregate
        .card_position(card)
        .ok_or_else(|| BoardError::CardNotFound {
            id: card.to_string(),
        })?;
    let order = aggregate.cards(&list)?[index].order;
    Ok(Placement {
        container: Some(list),
        index,
        order,
    })
}

/// Current placement of a list
pub fn list_placement(aggregate: &BoardAggregate, list: &ListId) -> Result<Placement> {
    let index = aggregate
        .list_position(list)
        .ok_or_else(|| BoardError::ListNotFound {
            id: list.to_string(),
        })?;
    Ok(Placement {
        container: None,
        index,
        order: aggregate.lists()[index].list.order,
    })
}

/// Current placement of either kind of item
pub fn placement(aggregate: &BoardAggregate, item: &DragItem) -> Result<Placement> {
    match item {
        DragItem::Card(id) => card_placement(aggregate, id),
        DragItem::List(id) => list_placement(aggregate, id),
    }
}

// =============================================================================
// Destinations
// =============================================================================

/// Resolve where a dragged card lands for a drop target.
///
/// - a list body: the end of that list
/// - the dragged card itself: its current slot
/// - a card in the same list: that card's slot, the neighbors shifting to make room
/// - a card in another list: before it, or after it when `pointer` is below the
///   target's vertical midpoint
pub fn card_destination(
    aggregate: &BoardAggregate,
    card: &CardId,
    target: &DropTarget,
    pointer: &Rect,
) -> Result<(ListId, usize)> {
    let (current_list, current_index) =
        aggregate
            .card_position(card)
            .ok_or_else(|| BoardError::CardNotFound {
                id: card.to_string(),
            })?;

    match target {
        DropTarget::List { id, .. } => {
            let len = aggregate.cards(id)?.len();
            let end = if *id == current_list { len - 1 } else { len };
            Ok((id.clone(), end))
        }
        DropTarget::Card { id, .. } if id == card => Ok((current_list, current_index)),
        DropTarget::Card { id, rect } => {
            let (target_list, target_index) =
                aggregate
                    .card_position(id)
                    .ok_or_else(|| BoardError::CardNotFound { id: id.to_string() })?;
            if target_list == current_list {
                Ok((target_list, target_index))
            } else {
                let shift = usize::from(pointer.is_below(rect));
                Ok((target_list, target_index + shift))
            }
        }
    }
}

/// Resolve the board index a dragged list lands on. A card target stands for
/// the list that holds it.
pub fn list_destination(
    aggregate: &BoardAggregate,
    list: &ListId,
    target: &DropTarget,
) -> Result<usize> {
    if aggregate.list_position(list).is_none() {
        return Err(BoardError::ListNotFound {
            id: list.to_string(),
        });
    }

    let target_list = match target {
        DropTarget::List { id, .. } => id.clone(),
        DropTarget::Card { id, .. } => {
            aggregate
                .card_position(id)
                .ok_or_else(|| BoardError::CardNotFound { id: id.to_string() })?
                .0
        }
    };
    aggregate
        .list_position(&target_list)
        .ok_or_else(|| BoardError::ListNotFound {
            id: target_list.to_string(),
        })
}

// =============================================================================
// Mutation
// =============================================================================

/// Move a card and give it a key for its new slot
pub fn apply_card_move(
    aggregate: &mut BoardAggregate,
    card: &CardId,
    list: &ListId,
    index: usize,
) -> Result<Placement> {
    let neighbors = aggregate.move_card(card, list, index)?;
    aggregate.set_card_order(card, slot_order(&neighbors))?;
    card_placement(aggregate, card)
}

/// Move a list and give it a key for its new slot
pub fn apply_list_move(
    aggregate: &mut BoardAggregate,
    list: &ListId,
    index: usize,
) -> Result<Placement> {
    let neighbors = aggregate.move_list(list, index)?;
    aggregate.set_list_order(list, slot_order(&neighbors))?;
    list_placement(aggregate, list)
}

fn slot_order(neighbors: &Neighbors) -> Order {
    if neighbors.is_alone() {
        return Order::BASE;
    }
    if let (Some(prev), Some(next)) = (neighbors.prev, neighbors.next) {
        if !Order::has_room(prev, next) {
            warn!(
                prev = prev.value(),
                next = next.value(),
                "order keys exhausted between neighbors, respace the sequence"
            );
        }
    }
    allocate(neighbors.prev, neighbors.next)
}

// =============================================================================
// Commit
// =============================================================================

/// Compare a card's current placement with the one it had at gesture start.
///
/// Unchanged slot: the committed key is restored and no command is produced.
pub fn settle_card(
    aggregate: &mut BoardAggregate,
    card: &CardId,
    committed: &Placement,
) -> Result<Option<PersistCommand>> {
    let current = card_placement(aggregate, card)?;
    if current.same_slot(committed) {
        aggregate.set_card_order(card, committed.order)?;
        debug!(card = %card, "card dropped on its own slot");
        return Ok(None);
    }

    let list_id = current
        .container
        .ok_or_else(|| BoardError::missing_field("list"))?;
    Ok(Some(PersistCommand::CardPosition {
        card_id: card.clone(),
        list_id,
        order: current.order,
    }))
}

/// List counterpart of [`settle_card`]
pub fn settle_list(
    aggregate: &mut BoardAggregate,
    list: &ListId,
    committed: &Placement,
) -> Result<Option<PersistCommand>> {
    let current = list_placement(aggregate, list)?;
    if current.same_slot(committed) {
        aggregate.set_list_order(list, committed.order)?;
        debug!(list = %list, "list dropped on its own slot");
        return Ok(None);
    }
    Ok(Some(PersistCommand::ListOrder {
        list_id: list.clone(),
        order: current.order,
    }))
}

/// Move a card to `(list, index)` and produce the command that commits it
pub fn plan_card_move(
    aggregate: &mut BoardAggregate,
    card: &CardId,
    list: &ListId,
    index: usize,
) -> Result<Option<PersistCommand>> {
    let committed = card_placement(aggregate, card)?;
    apply_card_move(aggregate, card, list, index)?;
    settle_card(aggregate, card, &committed)
}

/// Move a list to `index` and produce the command that commits it
pub fn plan_list_move(
    aggregate: &mut BoardAggregate,
    list: &ListId,
    index: usize,
) -> Result<Option<PersistCommand>> {
    let committed = list_placement(aggregate, list)?;
    apply_list_move(aggregate, list, index)?;
    settle_list(aggregate, list, &committed)
}

// =============================================================================
// Respacing
// =============================================================================

/// Respace every list on the board to 100, 200, ... as one sequence command.
///
/// Returns `None` when the keys already are evenly spaced.
pub fn respace_lists(aggregate: &mut BoardAggregate) -> Option<PersistCommand> {
    if aggregate.respace_lists().is_empty() {
        return None;
    }
    Some(PersistCommand::ListSequence(
        aggregate
            .lists()
            .iter()
            .map(|node| ListOrder {
                list_id: node.list.id.clone(),
                order: node.list.order,
            })
            .collect(),
    ))
}

/// Respace one list's cards to 100, 200, ... as one sequence command.
///
/// Returns `None` when the keys already are evenly spaced.
pub fn respace_cards(
    aggregate: &mut BoardAggregate,
    list: &ListId,
) -> Result<Option<PersistCommand>> {
    if aggregate.respace_cards(list)?.is_empty() {
        return Ok(None);
    }
    let cards = aggregate
        .cards(list)?
        .iter()
        .map(|card| CardOrder {
            card_id: card.id.clone(),
            order: card.order,
        })
        .collect();
    Ok(Some(PersistCommand::CardSequence {
        list_id: list.clone(),
        cards,
    }))
}
