//! In-memory board aggregate: Board → ordered Lists → ordered Cards.
//!
//! The aggregate is the one consistency unit a session mutates. Sequences are
//! kept in display order; a list's card sequence is sorted by order key
//! whenever it is built or extended, and every move hands back the neighbors the
//! caller needs to allocate a key for the moved item's new slot.

use crate::error::{BoardError, Result};
use crate::types::{Board, BoardId, Card, CardId, List, ListId, Order};
use std::cmp::Ordering;
use tracing::warn;

/// A list together with its cards in display order
#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub list: List,
    cards: Vec<Card>,
}

impl ListNode {
    /// Create an empty node for a list
    pub fn new(list: List) -> Self {
        Self {
            list,
            cards: Vec::new(),
        }
    }

    pub fn id(&self) -> &ListId {
        &self.list.id
    }

    /// Cards in display order
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn position(&self, id: &CardId) -> Option<usize> {
        self.cards.iter().position(|c| &c.id == id)
    }
}

/// Order keys on either side of a slot, excluding the item in the slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbors {
    pub prev: Option<Order>,
    pub next: Option<Order>,
    /// Length of the destination sequence, counting the moved item
    pub len: usize,
}

impl Neighbors {
    fn around<T>(items: &[T], index: usize, key: impl Fn(&T) -> Order) -> Self {
        Self {
            prev: index.checked_sub(1).map(|i| key(&items[i])),
            next: items.get(index + 1).map(&key),
            len: items.len(),
        }
    }

    /// Whether the moved item is the only item in its destination
    pub fn is_alone(&self) -> bool {
        self.len == 1
    }
}

/// The board tree owned by one session
#[derive(Debug, Clone, PartialEq)]
pub struct BoardAggregate {
    board: Board,
    lists: Vec<ListNode>,
}

impl BoardAggregate {
    /// Create an aggregate with no lists
    pub fn new(board: Board) -> Self {
        Self {
            board,
            lists: Vec::new(),
        }
    }

    /// Build an aggregate from flat collections, sorting everything by order key.
    ///
    /// Lists from other boards and cards whose list is absent are dropped.
    pub fn from_parts(
        board: Board,
        lists: impl IntoIterator<Item = List>,
        cards: impl IntoIterator<Item = Card>,
    ) -> Self {
        let mut nodes: Vec<ListNode> = Vec::new();
        for list in lists {
            if list.board != board.id {
                warn!(list = %list.id, board = %board.id, "dropping list that belongs to another board");
                continue;
            }
            nodes.push(ListNode::new(list));
        }
        sort_by_order(&mut nodes, |n| n.list.order);

        for card in cards {
            match nodes.iter_mut().find(|n| n.list.id == card.list) {
                Some(node) => node.cards.push(card),
                None => {
                    warn!(card = %card.id, list = %card.list, "dropping card whose list is not on the board")
                }
            }
        }
        for node in &mut nodes {
            sort_by_order(&mut node.cards, |c| c.order);
        }

        Self {
            board,
            lists: nodes,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn id(&self) -> &BoardId {
        &self.board.id
    }

    /// Lists in display order
    pub fn lists(&self) -> &[ListNode] {
        &self.lists
    }

    pub fn list(&self, id: &ListId) -> Option<&ListNode> {
        self.lists.iter().find(|n| &n.list.id == id)
    }

    /// Cards of a list in display order
    pub fn cards(&self, list: &ListId) -> Result<&[Card]> {
        let index = self.require_list(list)?;
        Ok(&self.lists[index].cards)
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.locate_card(id)
            .map(|(list, card)| &self.lists[list].cards[card])
    }

    pub fn card_count(&self) -> usize {
        self.lists.iter().map(ListNode::len).sum()
    }

    /// All card ids in display order, list by list
    pub fn card_ids(&self) -> Vec<CardId> {
        self.lists
            .iter()
            .flat_map(|n| n.cards.iter().map(|c| c.id.clone()))
            .collect()
    }

    /// The list a card is displayed under and its index there
    pub fn card_position(&self, id: &CardId) -> Option<(ListId, usize)> {
        self.locate_card(id)
            .map(|(list, card)| (self.lists[list].list.id.clone(), card))
    }

    /// Index of a list on the board
    pub fn list_position(&self, id: &ListId) -> Option<usize> {
        self.lists.iter().position(|n| &n.list.id == id)
    }

    /// Key for a card appended to the end of `list`
    pub fn next_card_order(&self, list: &ListId) -> Result<Order> {
        let cards = self.cards(list)?;
        Ok(max_order(cards.iter().map(|c| c.order))
            .map(Order::after)
            .unwrap_or(Order::BASE))
    }

    /// Key for a list appended to the end of the board
    pub fn next_list_order(&self) -> Order {
        max_order(self.lists.iter().map(|n| n.list.order))
            .map(Order::after)
            .unwrap_or(Order::BASE)
    }

    /// Whether every sequence is strictly increasing by order key
    pub fn is_sorted(&self) -> bool {
        let lists_sorted = self
            .lists
            .windows(2)
            .all(|w| w[0].list.order < w[1].list.order);
        lists_sorted
            && self
                .lists
                .iter()
                .all(|n| n.cards.windows(2).all(|w| w[0].order < w[1].order))
    }

    // =========================================================================
    // Moves
    // =========================================================================

    /// Move a card to `target_index` of `target_list`.
    ///
    /// The index is interpreted in the destination sequence after the card has
    /// been taken out of its current list, and is clamped to the end. Both ids
    /// are checked before anything changes. The card keeps its old order key;
    /// the caller allocates a new one from the returned neighbors.
    pub fn move_card(
        &mut self,
        card_id: &CardId,
        target_list: &ListId,
        target_index: usize,
    ) -> Result<Neighbors> {
        let (src_list, src_index) = self.require_card(card_id)?;
        let dst_list = self.require_list(target_list)?;

        let mut card = self.lists[src_list].cards.remove(src_index);
        card.list = target_list.clone();

        let cards = &mut self.lists[dst_list].cards;
        let index = target_index.min(cards.len());
        cards.insert(index, card);
        Ok(Neighbors::around(cards, index, |c| c.order))
    }

    /// Move a list to `target_index` on the board. Same contract as [`Self::move_card`].
    pub fn move_list(&mut self, list_id: &ListId, target_index: usize) -> Result<Neighbors> {
        let src = self.require_list(list_id)?;
        let node = self.lists.remove(src);
        let index = target_index.min(self.lists.len());
        self.lists.insert(index, node);
        Ok(Neighbors::around(&self.lists, index, |n| n.list.order))
    }

    /// Set a card's order key in place. The card does not change position.
    pub fn set_card_order(&mut self, id: &CardId, order: Order) -> Result<()> {
        let (list, card) = self.require_card(id)?;
        self.lists[list].cards[card].order = order;
        Ok(())
    }

    /// Set a list's order key in place. The list does not change position.
    pub fn set_list_order(&mut self, id: &ListId, order: Order) -> Result<()> {
        let index = self.require_list(id)?;
        self.lists[index].list.order = order;
        Ok(())
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Insert a card at the sorted position for its order key. Returns its index.
    pub fn insert_card(&mut self, card: Card) -> Result<usize> {
        if self.locate_card(&card.id).is_some() {
            return Err(BoardError::duplicate_id("card", card.id.as_str()));
        }
        let list = self.require_list(&card.list)?;
        let cards = &mut self.lists[list].cards;
        let index = sorted_slot(cards, card.order, |c| c.order);
        cards.insert(index, card);
        Ok(index)
    }

    /// Remove a card and return it
    pub fn remove_card(&mut self, id: &CardId) -> Result<Card> {
        let (list, card) = self.require_card(id)?;
        Ok(self.lists[list].cards.remove(card))
    }

    /// Insert an empty list at the sorted position for its order key. Returns its index.
    pub fn insert_list(&mut self, list: List) -> Result<usize> {
        if list.board != self.board.id {
            return Err(BoardError::invalid_value(
                "board",
                format!("list '{}' belongs to board '{}'", list.id, list.board),
            ));
        }
        if self.list_position(&list.id).is_some() {
            return Err(BoardError::duplicate_id("list", list.id.as_str()));
        }
        let index = sorted_slot(&self.lists, list.order, |n| n.list.order);
        self.lists.insert(index, ListNode::new(list));
        Ok(index)
    }

    /// Remove a list and, with it, all of its cards
    pub fn remove_list(&mut self, id: &ListId) -> Result<(List, Vec<Card>)> {
        let index = self.require_list(id)?;
        let node = self.lists.remove(index);
        Ok((node.list, node.cards))
    }

    /// Rewrite a list's card keys to 100, 200, ... Returns the cards whose key changed.
    pub fn respace_cards(&mut self, list: &ListId) -> Result<Vec<(CardId, Order)>> {
        let index = self.require_list(list)?;
        let mut changed = Vec::new();
        for (i, card) in self.lists[index].cards.iter_mut().enumerate() {
            let order = Order::spaced(i);
            if card.order != order {
                card.order = order;
                changed.push((card.id.clone(), order));
            }
        }
        Ok(changed)
    }

    /// Rewrite list keys to 100, 200, ... Returns the lists whose key changed.
    pub fn respace_lists(&mut self) -> Vec<(ListId, Order)> {
        let mut changed = Vec::new();
        for (i, node) in self.lists.iter_mut().enumerate() {
            let order = Order::spaced(i);
            if node.list.order != order {
                node.list.order = order;
                changed.push((node.list.id.clone(), order));
            }
        }
        changed
    }

    // =========================================================================
    // Lookup helpers
    // =========================================================================

    fn locate_card(&self, id: &CardId) -> Option<(usize, usize)> {
        self.lists
            .iter()
            .enumerate()
            .find_map(|(li, node)| node.position(id).map(|ci| (li, ci)))
    }

    fn require_card(&self, id: &CardId) -> Result<(usize, usize)> {
        self.locate_card(id)
            .ok_or_else(|| BoardError::CardNotFound { id: id.to_string() })
    }

    fn require_list(&self, id: &ListId) -> Result<usize> {
        self.list_position(id)
            .ok_or_else(|| BoardError::ListNotFound { id: id.to_string() })
    }
}

fn sort_by_order<T>(items: &mut [T], key: impl Fn(&T) -> Order) {
    items.sort_by(|a, b| key(a).total_cmp(&key(b)));
}

/// Index after every item whose key is <= `order`
fn sorted_slot<T>(items: &[T], order: Order, key: impl Fn(&T) -> Order) -> usize {
    items.partition_point(|item| key(item).total_cmp(&order) != Ordering::Greater)
}

fn max_order(orders: impl Iterator<Item = Order>) -> Option<Order> {
    orders.max_by(|a, b| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use proptest::prelude::*;

    fn board() -> Board {
        let mut board = Board::new("Test", UserId::from_string("alice"));
        board.id = BoardId::from_string("b1");
        board
    }

    fn list(id: &str, order: f64) -> List {
        List::new(BoardId::from_string("b1"), id.to_uppercase(), Order::new(order)).with_id(id)
    }

    fn card(id: &str, list: &str, order: f64) -> Card {
        Card::new(ListId::from_string(list), id, Order::new(order)).with_id(id)
    }

    /// a: [1:100, 2:200], b: []
    fn two_lists() -> BoardAggregate {
        BoardAggregate::from_parts(
            board(),
            vec![list("b", 200.0), list("a", 100.0)],
            vec![card("2", "a", 200.0), card("1", "a", 100.0)],
        )
    }

    fn ids(agg: &BoardAggregate, list: &str) -> Vec<String> {
        agg.cards(&ListId::from_string(list))
            .unwrap()
            .iter()
            .map(|c| c.id.to_string())
            .collect()
    }

    #[test]
    fn test_from_parts_sorts_lists_and_cards() {
        let agg = two_lists();
        let list_ids: Vec<_> = agg.lists().iter().map(|n| n.id().to_string()).collect();
        assert_eq!(list_ids, vec!["a", "b"]);
        assert_eq!(ids(&agg, "a"), vec!["1", "2"]);
        assert!(agg.is_sorted());
    }

    #[test]
    fn test_from_parts_drops_orphans() {
        let agg = BoardAggregate::from_parts(
            board(),
            vec![
                list("a", 100.0),
                List::new(BoardId::from_string("other"), "X", Order::BASE).with_id("x"),
            ],
            vec![card("1", "a", 100.0), card("9", "missing", 100.0)],
        );
        assert_eq!(agg.lists().len(), 1);
        assert_eq!(agg.card_count(), 1);
    }

    #[test]
    fn test_move_card_to_end_of_same_list() {
        let mut agg = two_lists();
        let n = agg
            .move_card(&CardId::from_string("1"), &ListId::from_string("a"), 99)
            .unwrap();
        assert_eq!(ids(&agg, "a"), vec!["2", "1"]);
        assert_eq!(n.prev, Some(Order::new(200.0)));
        assert_eq!(n.next, None);
        assert_eq!(n.len, 2);
    }

    #[test]
    fn test_move_card_across_lists() {
        let mut agg = two_lists();
        let n = agg
            .move_card(&CardId::from_string("2"), &ListId::from_string("b"), 0)
            .unwrap();
        assert_eq!(ids(&agg, "a"), vec!["1"]);
        assert_eq!(ids(&agg, "b"), vec!["2"]);
        assert!(n.is_alone());
        assert_eq!(agg.card(&CardId::from_string("2")).unwrap().list, "b");
    }

    #[test]
    fn test_move_card_to_current_slot_is_unchanged() {
        let mut agg = two_lists();
        let before = agg.clone();
        agg.move_card(&CardId::from_string("2"), &ListId::from_string("a"), 1)
            .unwrap();
        assert_eq!(agg, before);
    }

    #[test]
    fn test_move_card_unknown_ids_leave_aggregate_untouched() {
        let mut agg = two_lists();
        let before = agg.clone();

        let err = agg
            .move_card(&CardId::from_string("1"), &ListId::from_string("nope"), 0)
            .unwrap_err();
        assert!(matches!(err, BoardError::ListNotFound { .. }));

        let err = agg
            .move_card(&CardId::from_string("nope"), &ListId::from_string("a"), 0)
            .unwrap_err();
        assert!(matches!(err, BoardError::CardNotFound { .. }));

        assert_eq!(agg, before);
    }

    #[test]
    fn test_move_list() {
        let mut agg = two_lists();
        let n = agg.move_list(&ListId::from_string("b"), 0).unwrap();
        assert_eq!(agg.list_position(&ListId::from_string("b")), Some(0));
        assert_eq!(n.prev, None);
        assert_eq!(n.next, Some(Order::new(100.0)));
    }

    #[test]
    fn test_insert_card_lands_in_sorted_slot() {
        let mut agg = two_lists();
        let index = agg.insert_card(card("3", "a", 150.0)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(ids(&agg, "a"), vec!["1", "3", "2"]);

        let err = agg.insert_card(card("3", "a", 900.0)).unwrap_err();
        assert!(matches!(err, BoardError::DuplicateId { .. }));
    }

    #[test]
    fn test_insert_list_rejects_foreign_board() {
        let mut agg = two_lists();
        let foreign = List::new(BoardId::from_string("zzz"), "X", Order::BASE);
        assert!(matches!(
            agg.insert_list(foreign),
            Err(BoardError::InvalidValue { .. })
        ));
        assert_eq!(agg.insert_list(list("c", 150.0)).unwrap(), 1);
    }

    #[test]
    fn test_remove_list_cascades() {
        let mut agg = two_lists();
        let (list, cards) = agg.remove_list(&ListId::from_string("a")).unwrap();
        assert_eq!(list.id, "a");
        assert_eq!(cards.len(), 2);
        assert_eq!(agg.card_count(), 0);
        assert!(agg.card(&CardId::from_string("1")).is_none());
    }

    #[test]
    fn test_next_orders() {
        let agg = two_lists();
        assert_eq!(
            agg.next_card_order(&ListId::from_string("a")).unwrap(),
            Order::new(300.0)
        );
        assert_eq!(
            agg.next_card_order(&ListId::from_string("b")).unwrap(),
            Order::BASE
        );
        assert_eq!(agg.next_list_order(), Order::new(300.0));
        assert_eq!(BoardAggregate::new(board()).next_list_order(), Order::BASE);
    }

    #[test]
    fn test_respace_cards() {
        let mut agg = BoardAggregate::from_parts(
            board(),
            vec![list("a", 100.0)],
            vec![
                card("1", "a", 100.0),
                card("2", "a", 100.000001),
                card("3", "a", 300.0),
            ],
        );
        let changed = agg.respace_cards(&ListId::from_string("a")).unwrap();
        assert_eq!(changed, vec![(CardId::from_string("2"), Order::new(200.0))]);
        assert!(agg.is_sorted());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Card { card: usize, list: usize, index: usize },
        List { list: usize, index: usize },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8, 0usize..3, 0usize..10).prop_map(|(card, list, index)| Op::Card {
                card,
                list,
                index
            }),
            (0usize..3, 0usize..5).prop_map(|(list, index)| Op::List { list, index }),
        ]
    }

    proptest! {
        #[test]
        fn prop_moves_never_duplicate_or_lose_cards(ops in prop::collection::vec(op(), 0..40)) {
            let lists = vec![list("a", 100.0), list("b", 200.0), list("c", 300.0)];
            let cards: Vec<Card> = (0..8)
                .map(|i| card(&i.to_string(), ["a", "b", "c"][i % 3], 100.0 * (i + 1) as f64))
                .collect();
            let mut agg = BoardAggregate::from_parts(board(), lists, cards);

            let mut expected = agg.card_ids();
            expected.sort();

            for op in ops {
                match op {
                    Op::Card { card, list, index } => {
                        let target = ["a", "b", "c"][list];
                        agg.move_card(&CardId::from_string(card.to_string()), &ListId::from_string(target), index)
                            .unwrap();
                    }
                    Op::List { list, index } => {
                        agg.move_list(&ListId::from_string(["a", "b", "c"][list]), index).unwrap();
                    }
                }
                let mut actual = agg.card_ids();
                actual.sort();
                prop_assert_eq!(&actual, &expected);
            }
        }
    }
}
