//! A client session on one board.
//!
//! The session exclusively owns the board aggregate and the drag machine, so
//! no locking is needed inside it. Gestures mutate the aggregate
//! optimistically and persist one command at drop. Structural flows (create,
//! delete, respace) persist first and update the aggregate only once the
//! store accepted the change.
//!
//! Two sessions on the same board are not reconciled: the store keeps the last
//! write, and a session sees other writers' changes only after [`BoardSession::reload`].

use crate::aggregate::BoardAggregate;
use crate::audit::AuditSink;
use crate::config::DragConfig;
use crate::drag::{DragMachine, DragOutcome, Point, DEFAULT_ACTIVATION_DISTANCE};
use crate::error::{BoardError, Result};
use crate::operation::Activity;
use crate::planner::{self, DragItem, DropTarget, PersistCommand, Rect};
use crate::store::BoardStore;
use crate::types::{AuditAction, BoardId, Card, CardId, EntityType, List, ListId, UserId};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session behavior switches
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub activation_distance: f64,
    /// Restore the pre-move board when the store rejects a move.
    /// Off by default: the optimistic state stays and the error is returned.
    pub revert_on_failure: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            activation_distance: DEFAULT_ACTIVATION_DISTANCE,
            revert_on_failure: false,
        }
    }
}

impl From<&DragConfig> for SessionOptions {
    fn from(config: &DragConfig) -> Self {
        Self {
            activation_distance: config.activation_distance,
            revert_on_failure: config.revert_on_failure,
        }
    }
}

/// One user's live view of a board
pub struct BoardSession<S: BoardStore> {
    store: Arc<S>,
    audit: Arc<dyn AuditSink>,
    actor: UserId,
    options: SessionOptions,
    aggregate: BoardAggregate,
    drag: DragMachine,
}

impl<S: BoardStore> BoardSession<S> {
    /// Load a board and start a session on it
    pub async fn open(
        store: Arc<S>,
        board: &BoardId,
        actor: UserId,
        audit: Arc<dyn AuditSink>,
        options: SessionOptions,
    ) -> Result<Self> {
        let aggregate = store.load_board(board).await?;
        info!(board = %board, actor = %actor, lists = aggregate.lists().len(), "board session opened");
        Ok(Self {
            store,
            audit,
            actor,
            drag: DragMachine::new(options.activation_distance),
            options,
            aggregate,
        })
    }

    pub fn aggregate(&self) -> &BoardAggregate {
        &self.aggregate
    }

    pub fn board_id(&self) -> &BoardId {
        self.aggregate.id()
    }

    pub fn actor(&self) -> &UserId {
        &self.actor
    }

    pub fn drag(&self) -> &DragMachine {
        &self.drag
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    pub fn pointer_down(&mut self, item: DragItem, at: Point) -> Result<DragOutcome> {
        self.drag.pointer_down(&self.aggregate, item, at)
    }

    pub fn pointer_move(&mut self, at: Point) -> Result<DragOutcome> {
        self.drag.pointer_move(&self.aggregate, at)
    }

    pub fn pointer_over(&mut self, target: DropTarget, pointer: Rect) -> Result<DragOutcome> {
        self.drag.pointer_over(&mut self.aggregate, target, pointer)
    }

    pub fn pointer_leave(&mut self) -> DragOutcome {
        self.drag.pointer_leave()
    }

    pub fn cancel(&mut self) -> DragOutcome {
        self.drag.cancel(&mut self.aggregate)
    }

    /// Finish the gesture and persist its command, if any.
    ///
    /// A store failure comes back as [`BoardError::Persistence`].
    pub async fn pointer_up(&mut self) -> Result<DragOutcome> {
        let snapshot = self.revert_point(|drag| drag.snapshot().cloned());
        let outcome = self.drag.pointer_up(&mut self.aggregate)?;
        if let DragOutcome::Dropped {
            command: Some(command),
            ..
        } = &outcome
        {
            self.commit(command, snapshot).await?;
        }
        Ok(outcome)
    }

    // =========================================================================
    // Programmatic moves
    // =========================================================================

    /// Move a card to `index` of `list`, as a completed drag would.
    /// Returns the command that was persisted, `None` when nothing moved.
    pub async fn move_card(
        &mut self,
        card: &CardId,
        list: &ListId,
        index: usize,
    ) -> Result<Option<PersistCommand>> {
        self.ensure_idle()?;
        let snapshot = self.revert_point(|_| None);
        let command = planner::plan_card_move(&mut self.aggregate, card, list, index)?;
        if let Some(command) = &command {
            self.commit(command, snapshot).await?;
        }
        Ok(command)
    }

    /// Move a list to `index` on the board
    pub async fn move_list(
        &mut self,
        list: &ListId,
        index: usize,
    ) -> Result<Option<PersistCommand>> {
        self.ensure_idle()?;
        let snapshot = self.revert_point(|_| None);
        let command = planner::plan_list_move(&mut self.aggregate, list, index)?;
        if let Some(command) = &command {
            self.commit(command, snapshot).await?;
        }
        Ok(command)
    }

    /// Pre-move state to restore on failure, only kept when reverting is enabled.
    /// `from_drag` picks it from an active gesture; otherwise the current board is used.
    fn revert_point(
        &self,
        from_drag: impl FnOnce(&DragMachine) -> Option<BoardAggregate>,
    ) -> Option<BoardAggregate> {
        if !self.options.revert_on_failure {
            return None;
        }
        from_drag(&self.drag).or_else(|| Some(self.aggregate.clone()))
    }

    async fn commit(
        &mut self,
        command: &PersistCommand,
        snapshot: Option<BoardAggregate>,
    ) -> Result<()> {
        if let Err(err) = self.store.apply(command).await {
            warn!(error = %err, reverted = snapshot.is_some(), "move was not persisted");
            if let Some(snapshot) = snapshot {
                self.aggregate = snapshot;
            }
            return Err(BoardError::persistence(err.to_string()));
        }

        let activity = match command {
            PersistCommand::CardPosition {
                card_id,
                list_id,
                order,
            } => Activity::new(
                AuditAction::Move,
                EntityType::Card,
                card_id.as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "list_id": list_id, "order": order })),
            PersistCommand::ListOrder { list_id, order } => Activity::new(
                AuditAction::Move,
                EntityType::List,
                list_id.as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "order": order })),
            PersistCommand::ListSequence(orders) => Activity::new(
                AuditAction::Update,
                EntityType::Board,
                self.board_id().as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "list_orders": orders })),
            PersistCommand::CardSequence { list_id, cards } => Activity::new(
                AuditAction::Update,
                EntityType::List,
                list_id.as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "card_orders": cards })),
        };
        self.record(activity);
        Ok(())
    }

    // =========================================================================
    // Structural flows
    // =========================================================================

    /// Append a new list to the board
    pub async fn add_list(&mut self, title: impl Into<String>) -> Result<List> {
        self.ensure_idle()?;
        let title = required_title(title.into())?;
        let list = List::new(
            self.board_id().clone(),
            title,
            self.aggregate.next_list_order(),
        );

        self.store.create_list(&list).await?;
        self.aggregate.insert_list(list.clone())?;
        self.record(
            Activity::new(
                AuditAction::Create,
                EntityType::List,
                list.id.as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "title": list.title })),
        );
        Ok(list)
    }

    /// Append a new card to a list
    pub async fn add_card(&mut self, list: &ListId, title: impl Into<String>) -> Result<Card> {
        self.ensure_idle()?;
        let title = required_title(title.into())?;
        let order = self.aggregate.next_card_order(list)?;
        let card = Card::new(list.clone(), title, order).with_creator(self.actor.clone());

        self.store.create_card(&card).await?;
        self.aggregate.insert_card(card.clone())?;
        self.record(
            Activity::new(
                AuditAction::Create,
                EntityType::Card,
                card.id.as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "list_id": list, "title": card.title })),
        );
        Ok(card)
    }

    pub async fn delete_card(&mut self, card: &CardId) -> Result<Card> {
        self.ensure_idle()?;
        if self.aggregate.card(card).is_none() {
            return Err(BoardError::CardNotFound {
                id: card.to_string(),
            });
        }

        self.store.delete_card(card).await?;
        let removed = self.aggregate.remove_card(card)?;
        self.record(Activity::new(
            AuditAction::Delete,
            EntityType::Card,
            card.as_str(),
            self.board_id().clone(),
        ));
        Ok(removed)
    }

    /// Delete a list together with its cards
    pub async fn delete_list(&mut self, list: &ListId) -> Result<(List, Vec<Card>)> {
        self.ensure_idle()?;
        if self.aggregate.list(list).is_none() {
            return Err(BoardError::ListNotFound {
                id: list.to_string(),
            });
        }

        self.store.delete_list(list).await?;
        let (removed, cards) = self.aggregate.remove_list(list)?;
        self.record(
            Activity::new(
                AuditAction::Delete,
                EntityType::List,
                list.as_str(),
                self.board_id().clone(),
            )
            .with_metadata(json!({ "cards": cards.len() })),
        );
        Ok((removed, cards))
    }

    /// Rewrite one list's card keys to 100, 200, ...
    /// Returns how many card records were rewritten.
    ///
    /// The list is committed by one store call. If it fails the aggregate is
    /// reloaded from the store and the error is returned.
    pub async fn respace_list(&mut self, list: &ListId) -> Result<usize> {
        self.ensure_idle()?;
        let mut respaced = self.aggregate.clone();
        let changed = match planner::respace_cards(&mut respaced, list)? {
            Some(command) => {
                if let Err(err) = self.store.apply(&command).await {
                    self.resync().await;
                    return Err(err);
                }
                sequence_len(&command)
            }
            None => 0,
        };
        self.aggregate = respaced;

        if changed > 0 {
            self.record(
                Activity::new(
                    AuditAction::Update,
                    EntityType::List,
                    list.as_str(),
                    self.board_id().clone(),
                )
                .with_metadata(json!({ "respaced_cards": changed })),
            );
        }
        debug!(list = %list, changed, "list respaced");
        Ok(changed)
    }

    /// Rewrite list keys and every list's card keys to 100, 200, ...
    /// Returns how many records were rewritten.
    ///
    /// Each sequence (the lists, then each list's cards) is one store call.
    /// A failure part way leaves earlier sequences written, so the aggregate
    /// is reloaded from the store before the error is returned.
    pub async fn respace_board(&mut self) -> Result<usize> {
        self.ensure_idle()?;
        let mut respaced = self.aggregate.clone();
        let mut commands = Vec::new();
        commands.extend(planner::respace_lists(&mut respaced));
        let list_ids: Vec<ListId> = respaced.lists().iter().map(|n| n.id().clone()).collect();
        for list in &list_ids {
            commands.extend(planner::respace_cards(&mut respaced, list)?);
        }

        let mut changed = 0;
        for command in &commands {
            if let Err(err) = self.store.apply(command).await {
                warn!(error = %err, written = changed, "respace stopped part way");
                self.resync().await;
                return Err(err);
            }
            changed += sequence_len(command);
        }
        self.aggregate = respaced;

        if changed > 0 {
            self.record(
                Activity::new(
                    AuditAction::Update,
                    EntityType::Board,
                    self.board_id().as_str(),
                    self.board_id().clone(),
                )
                .with_metadata(json!({ "respaced": changed })),
            );
        }
        info!(board = %self.board_id(), changed, "board respaced");
        Ok(changed)
    }

    /// Reload after a failed multi-step write. A failed reload keeps the
    /// current aggregate.
    async fn resync(&mut self) {
        let board = self.board_id().clone();
        match self.store.load_board(&board).await {
            Ok(aggregate) => self.aggregate = aggregate,
            Err(err) => warn!(board = %board, error = %err, "could not reload board"),
        }
    }

    /// Replace the aggregate with the store's current state
    pub async fn reload(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let board = self.board_id().clone();
        self.aggregate = self.store.load_board(&board).await?;
        debug!(board = %board, "board reloaded");
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.drag.is_active() {
            return Err(BoardError::GestureActive);
        }
        Ok(())
    }

    fn record(&self, activity: Activity) {
        self.audit.record(activity.into_event(self.actor.clone()));
    }
}

fn required_title(title: String) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoardError::missing_field("title"));
    }
    Ok(trimmed.to_string())
}

fn sequence_len(command: &PersistCommand) -> usize {
    match command {
        PersistCommand::ListSequence(orders) => orders.len(),
        PersistCommand::CardSequence { cards, .. } => cards.len(),
        PersistCommand::CardPosition { .. } | PersistCommand::ListOrder { .. } => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::context::BoardContext;
    use crate::types::{Board, Order};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, BoardSession<BoardContext>, Arc<MemoryAuditLog>) {
        let temp = TempDir::new().unwrap();
        let ctx = BoardContext::new(temp.path().join(".taskboard"));
        ctx.create_directories().await.unwrap();
        let board = Board::new("Test", UserId::from_string("alice"));
        ctx.write_board(&board).await.unwrap();

        let audit = Arc::new(MemoryAuditLog::new());
        let session = BoardSession::open(
            Arc::new(ctx),
            &board.id,
            UserId::from_string("alice"),
            audit.clone(),
            SessionOptions::default(),
        )
        .await
        .unwrap();
        (temp, session, audit)
    }

    #[tokio::test]
    async fn test_add_list_and_cards() {
        let (_temp, mut session, audit) = setup().await;
        let todo = session.add_list("To Do").await.unwrap();
        let done = session.add_list("Done").await.unwrap();
        assert_eq!(todo.order, Order::new(100.0));
        assert_eq!(done.order, Order::new(200.0));

        let first = session.add_card(&todo.id, "first").await.unwrap();
        let second = session.add_card(&todo.id, "second").await.unwrap();
        assert_eq!(first.order, Order::new(100.0));
        assert_eq!(second.order, Order::new(200.0));
        assert_eq!(first.creator, Some(UserId::from_string("alice")));

        let events = audit.events();
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.action == AuditAction::Create));
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let (_temp, mut session, _audit) = setup().await;
        let err = session.add_list("   ").await.unwrap_err();
        assert!(matches!(err, BoardError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_structural_change_blocked_during_gesture() {
        let (_temp, mut session, _audit) = setup().await;
        let todo = session.add_list("To Do").await.unwrap();
        let card = session.add_card(&todo.id, "card").await.unwrap();

        session
            .pointer_down(DragItem::Card(card.id.clone()), Point::default())
            .unwrap();
        assert!(matches!(
            session.add_card(&todo.id, "other").await,
            Err(BoardError::GestureActive)
        ));
        assert!(matches!(
            session.delete_card(&card.id).await,
            Err(BoardError::GestureActive)
        ));

        session.cancel();
        session.delete_card(&card.id).await.unwrap();
        assert_eq!(session.aggregate().card_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_list_cascades_in_session_and_store() {
        let (_temp, mut session, audit) = setup().await;
        let todo = session.add_list("To Do").await.unwrap();
        session.add_card(&todo.id, "a").await.unwrap();
        session.add_card(&todo.id, "b").await.unwrap();

        let (_list, cards) = session.delete_list(&todo.id).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(session.aggregate().card_count(), 0);

        session.reload().await.unwrap();
        assert!(session.aggregate().lists().is_empty());
        assert_eq!(audit.events().last().unwrap().action, AuditAction::Delete);
    }

    #[tokio::test]
    async fn test_programmatic_move_persists_and_audits() {
        let (_temp, mut session, audit) = setup().await;
        let todo = session.add_list("To Do").await.unwrap();
        let done = session.add_list("Done").await.unwrap();
        let card = session.add_card(&todo.id, "a").await.unwrap();

        let command = session.move_card(&card.id, &done.id, 0).await.unwrap();
        assert_eq!(
            command,
            Some(PersistCommand::CardPosition {
                card_id: card.id.clone(),
                list_id: done.id.clone(),
                order: Order::BASE,
            })
        );
        let last = audit.events().pop().unwrap();
        assert_eq!(last.op_string(), "move card");
        assert_eq!(last.metadata["list_id"], done.id.as_str());

        // Same slot again: nothing persisted, nothing audited
        let before = audit.len();
        assert_eq!(session.move_card(&card.id, &done.id, 0).await.unwrap(), None);
        assert_eq!(audit.len(), before);

        session.reload().await.unwrap();
        assert_eq!(
            session.aggregate().card_position(&card.id),
            Some((done.id.clone(), 0))
        );
    }

    #[tokio::test]
    async fn test_respace_board() {
        let (_temp, mut session, _audit) = setup().await;
        let a = session.add_list("A").await.unwrap();
        let b = session.add_list("B").await.unwrap();
        session.move_list(&b.id, 0).await.unwrap();
        let card = session.add_card(&a.id, "x").await.unwrap();
        session.add_card(&a.id, "y").await.unwrap();
        session.move_card(&card.id, &a.id, 1).await.unwrap();

        let changed = session.respace_board().await.unwrap();
        assert!(changed >= 2);
        assert_eq!(session.respace_board().await.unwrap(), 0);

        session.reload().await.unwrap();
        let orders: Vec<f64> = session
            .aggregate()
            .lists()
            .iter()
            .map(|n| n.list.order.value())
            .collect();
        assert_eq!(orders, vec![100.0, 200.0]);
        assert_eq!(session.aggregate().lists()[0].id(), &b.id);
        let cards = session.aggregate().cards(&a.id).unwrap();
        assert_eq!(cards[0].order, Order::new(100.0));
        assert_eq!(cards[1].order, Order::new(200.0));
        assert_eq!(cards[1].id, card.id);
    }
}
