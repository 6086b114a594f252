//! BoardContext - file-backed storage for boards, lists, cards and activity
//!
//! The context is I/O primitives plus the [`BoardStore`] implementation built
//! from them. Operations and sessions do the work; the context only reads and
//! writes entity files.

use crate::aggregate::BoardAggregate;
use crate::error::{BoardError, Result};
use crate::planner::{CardOrder, ListOrder};
use crate::store::BoardStore;
use crate::types::{AuditEvent, Board, BoardId, Card, CardId, List, ListId, Order};
use async_trait::async_trait;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Handle on a storage root directory
#[derive(Debug, Clone)]
pub struct BoardContext {
    root: PathBuf,
}

impl BoardContext {
    /// Create a context for the given storage directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn boards_dir(&self) -> PathBuf {
        self.root.join("boards")
    }

    /// Path to a board file. Fails for ids that are not a single path component.
    pub fn board_path(&self, id: &BoardId) -> Result<PathBuf> {
        entity_path(&self.boards_dir(), id.as_str(), "json")
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.root.join("lists")
    }

    pub fn list_path(&self, id: &ListId) -> Result<PathBuf> {
        entity_path(&self.lists_dir(), id.as_str(), "json")
    }

    pub fn cards_dir(&self) -> PathBuf {
        self.root.join("cards")
    }

    pub fn card_path(&self, id: &CardId) -> Result<PathBuf> {
        entity_path(&self.cards_dir(), id.as_str(), "json")
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.root.join("activity")
    }

    /// Path to a board's activity log
    pub fn activity_path(&self, board: &BoardId) -> Result<PathBuf> {
        entity_path(&self.activity_dir(), board.as_str(), "jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Check if all entity directories exist
    pub fn directories_exist(&self) -> bool {
        self.boards_dir().is_dir()
            && self.lists_dir().is_dir()
            && self.cards_dir().is_dir()
            && self.activity_dir().is_dir()
    }

    /// Create the root and all entity directories. Idempotent.
    pub async fn create_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(self.boards_dir()).await?;
        fs::create_dir_all(self.lists_dir()).await?;
        fs::create_dir_all(self.cards_dir()).await?;
        fs::create_dir_all(self.activity_dir()).await?;
        Ok(())
    }

    /// Create directories only when something is missing
    pub async fn ensure_directories(&self) -> Result<()> {
        if !self.directories_exist() {
            self.create_directories().await?;
        }
        Ok(())
    }

    // =========================================================================
    // Board I/O
    // =========================================================================

    pub async fn read_board(&self, id: &BoardId) -> Result<Board> {
        read_json(&self.board_path(id)?)
            .await?
            .ok_or_else(|| BoardError::BoardNotFound { id: id.to_string() })
    }

    pub async fn write_board(&self, board: &Board) -> Result<()> {
        write_json(&self.board_path(&board.id)?, board).await
    }

    pub async fn board_exists(&self, id: &BoardId) -> bool {
        self.board_path(id).is_ok_and(|path| path.exists())
    }

    pub async fn list_board_ids(&self) -> Result<Vec<BoardId>> {
        Ok(list_stems(&self.boards_dir())
            .await?
            .into_iter()
            .map(BoardId::from_string)
            .collect())
    }

    pub async fn read_all_boards(&self) -> Result<Vec<Board>> {
        let mut boards = Vec::new();
        for id in self.list_board_ids().await? {
            boards.push(self.read_board(&id).await?);
        }
        boards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(boards)
    }

    // =========================================================================
    // List I/O
    // =========================================================================

    pub async fn read_list(&self, id: &ListId) -> Result<List> {
        read_json(&self.list_path(id)?)
            .await?
            .ok_or_else(|| BoardError::ListNotFound { id: id.to_string() })
    }

    pub async fn write_list(&self, list: &List) -> Result<()> {
        write_json(&self.list_path(&list.id)?, list).await
    }

    pub async fn delete_list_file(&self, id: &ListId) -> Result<()> {
        remove_if_exists(&self.list_path(id)?).await
    }

    pub async fn list_list_ids(&self) -> Result<Vec<ListId>> {
        Ok(list_stems(&self.lists_dir())
            .await?
            .into_iter()
            .map(ListId::from_string)
            .collect())
    }

    /// Lists of one board, sorted by order key
    pub async fn read_lists(&self, board: &BoardId) -> Result<Vec<List>> {
        let mut lists = Vec::new();
        for id in self.list_list_ids().await? {
            let list = self.read_list(&id).await?;
            if &list.board == board {
                lists.push(list);
            }
        }
        lists.sort_by(|a, b| a.order.total_cmp(&b.order));
        Ok(lists)
    }

    // =========================================================================
    // Card I/O
    // =========================================================================

    pub async fn read_card(&self, id: &CardId) -> Result<Card> {
        read_json(&self.card_path(id)?)
            .await?
            .ok_or_else(|| BoardError::CardNotFound { id: id.to_string() })
    }

    pub async fn write_card(&self, card: &Card) -> Result<()> {
        write_json(&self.card_path(&card.id)?, card).await
    }

    pub async fn delete_card_file(&self, id: &CardId) -> Result<()> {
        remove_if_exists(&self.card_path(id)?).await
    }

    pub async fn list_card_ids(&self) -> Result<Vec<CardId>> {
        Ok(list_stems(&self.cards_dir())
            .await?
            .into_iter()
            .map(CardId::from_string)
            .collect())
    }

    /// Cards of one list, sorted by order key
    pub async fn read_cards(&self, list: &ListId) -> Result<Vec<Card>> {
        let mut cards = self.read_cards_in(std::slice::from_ref(list)).await?;
        cards.sort_by(|a, b| a.order.total_cmp(&b.order));
        Ok(cards)
    }

    /// Cards belonging to any of `lists`, unsorted
    async fn read_cards_in(&self, lists: &[ListId]) -> Result<Vec<Card>> {
        let mut cards = Vec::new();
        for id in self.list_card_ids().await? {
            let card = self.read_card(&id).await?;
            if lists.contains(&card.list) {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    /// Board a card belongs to, through its list
    pub async fn board_of_card(&self, card: &Card) -> Result<BoardId> {
        Ok(self.read_list(&card.list).await?.board)
    }

    /// Largest card key in a list, plus one gap
    pub async fn next_card_order(&self, list: &ListId) -> Result<Order> {
        let cards = self.read_cards(list).await?;
        Ok(cards
            .last()
            .map(|c| Order::after(c.order))
            .unwrap_or(Order::BASE))
    }

    /// Largest list key on a board, plus one gap
    pub async fn next_list_order(&self, board: &BoardId) -> Result<Order> {
        let lists = self.read_lists(board).await?;
        Ok(lists
            .last()
            .map(|l| Order::after(l.order))
            .unwrap_or(Order::BASE))
    }

    /// Load a board with its lists and cards
    pub async fn read_aggregate(&self, board: &BoardId) -> Result<BoardAggregate> {
        let meta = self.read_board(board).await?;
        let lists = self.read_lists(board).await?;
        let list_ids: Vec<ListId> = lists.iter().map(|l| l.id.clone()).collect();
        let cards = self.read_cards_in(&list_ids).await?;
        Ok(BoardAggregate::from_parts(meta, lists, cards))
    }

    // =========================================================================
    // Activity logging
    // =========================================================================

    /// Append an event to its board's activity log
    pub async fn append_activity(&self, event: &AuditEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let path = self.activity_path(&event.board)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read a board's activity, newest first
    pub async fn read_activity(
        &self,
        board: &BoardId,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEvent>> {
        let path = self.activity_path(board)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut events: Vec<AuditEvent> = content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping malformed activity line");
                    None
                }
            })
            .collect();

        events.reverse();
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Take the exclusive advisory lock without blocking
    pub async fn lock(&self) -> Result<BoardLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(BoardLock { file }),
            Err(_) => Err(BoardError::LockBusy),
        }
    }
}

#[async_trait]
impl BoardStore for BoardContext {
    async fn load_board(&self, id: &BoardId) -> Result<BoardAggregate> {
        self.read_aggregate(id).await
    }

    async fn save_card_position(&self, card: &CardId, list: &ListId, order: Order) -> Result<()> {
        let _lock = self.lock().await?;
        self.read_list(list).await?;
        let mut stored = self.read_card(card).await?;
        stored.list = list.clone();
        stored.order = order;
        debug!(card = %card, list = %list, order = order.value(), "saving card position");
        self.write_card(&stored).await
    }

    async fn save_list_order(&self, list: &ListId, order: Order) -> Result<()> {
        let _lock = self.lock().await?;
        let mut stored = self.read_list(list).await?;
        stored.order = order;
        debug!(list = %list, order = order.value(), "saving list order");
        self.write_list(&stored).await
    }

    async fn save_list_sequence(&self, orders: &[ListOrder]) -> Result<()> {
        let _lock = self.lock().await?;
        // Read everything first so a missing list writes nothing
        let mut lists = Vec::with_capacity(orders.len());
        for entry in orders {
            let mut list = self.read_list(&entry.list_id).await?;
            list.order = entry.order;
            lists.push(list);
        }
        for list in &lists {
            self.write_list(list).await?;
        }
        debug!(count = lists.len(), "saved list sequence");
        Ok(())
    }

    async fn save_card_sequence(&self, list: &ListId, orders: &[CardOrder]) -> Result<()> {
        let _lock = self.lock().await?;
        self.read_list(list).await?;
        let mut cards = Vec::with_capacity(orders.len());
        for entry in orders {
            let mut card = self.read_card(&entry.card_id).await?;
            card.list = list.clone();
            card.order = entry.order;
            cards.push(card);
        }
        for card in &cards {
            self.write_card(card).await?;
        }
        debug!(list = %list, count = cards.len(), "saved card sequence");
        Ok(())
    }

    async fn create_list(&self, list: &List) -> Result<()> {
        let _lock = self.lock().await?;
        self.read_board(&list.board).await?;
        if self.list_path(&list.id)?.exists() {
            return Err(BoardError::duplicate_id("list", list.id.as_str()));
        }
        self.write_list(list).await
    }

    async fn create_card(&self, card: &Card) -> Result<()> {
        let _lock = self.lock().await?;
        self.read_list(&card.list).await?;
        if self.card_path(&card.id)?.exists() {
            return Err(BoardError::duplicate_id("card", card.id.as_str()));
        }
        self.write_card(card).await
    }

    async fn delete_card(&self, id: &CardId) -> Result<()> {
        let _lock = self.lock().await?;
        self.read_card(id).await?;
        self.delete_card_file(id).await
    }

    async fn delete_list(&self, id: &ListId) -> Result<Vec<CardId>> {
        let _lock = self.lock().await?;
        self.read_list(id).await?;
        let cards = self.read_cards(id).await?;
        let mut removed = Vec::with_capacity(cards.len());
        for card in cards {
            self.delete_card_file(&card.id).await?;
            removed.push(card.id);
        }
        self.delete_list_file(id).await?;
        Ok(removed)
    }
}

/// RAII lock guard - releases on drop
#[derive(Debug)]
pub struct BoardLock {
    file: std::fs::File,
}

impl Drop for BoardLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `dir/{id}.{ext}`, rejecting ids that would escape `dir`
fn entity_path(dir: &Path, id: &str, ext: &str) -> Result<PathBuf> {
    let unsafe_id = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0'])
        || id.contains("..");
    if unsafe_id {
        return Err(BoardError::invalid_value(
            "id",
            format!("'{id}' is not a valid identifier"),
        ));
    }
    Ok(dir.join(format!("{id}.{ext}")))
}

/// Read and parse a JSON file; `None` when it does not exist
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).await?;
    Ok(Some(serde_json::from_str(&content)?))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    atomic_write(path, content.as_bytes()).await
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).await?;
    }
    Ok(())
}

/// File stems of `*.json` entries in a directory
async fn list_stems(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut stems = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
    }
    stems.sort();
    Ok(stems)
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, BoardContext) {
        let temp = TempDir::new().unwrap();
        let ctx = BoardContext::new(temp.path().join(".taskboard"));
        ctx.create_directories().await.unwrap();
        (temp, ctx)
    }

    async fn seeded(ctx: &BoardContext) -> (Board, List, List) {
        let board = Board::new("Test", UserId::from_string("alice"));
        ctx.write_board(&board).await.unwrap();
        let todo = List::new(board.id.clone(), "To Do", Order::new(100.0));
        let done = List::new(board.id.clone(), "Done", Order::new(200.0));
        ctx.create_list(&done).await.unwrap();
        ctx.create_list(&todo).await.unwrap();
        (board, todo, done)
    }

    #[tokio::test]
    async fn test_paths() {
        let (temp, ctx) = setup().await;
        let root = temp.path().join(".taskboard");
        assert_eq!(ctx.root(), root);
        assert_eq!(
            ctx.board_path(&BoardId::from_string("b1")).unwrap(),
            root.join("boards").join("b1.json")
        );
        assert_eq!(
            ctx.activity_path(&BoardId::from_string("b1")).unwrap(),
            root.join("activity").join("b1.jsonl")
        );
    }

    #[tokio::test]
    async fn test_create_directories_creates_root() {
        let temp = TempDir::new().unwrap();
        let ctx = BoardContext::new(temp.path().join("nested").join(".taskboard"));
        assert!(!ctx.directories_exist());

        ctx.ensure_directories().await.unwrap();
        ctx.ensure_directories().await.unwrap();
        assert!(ctx.directories_exist());

        std::fs::remove_dir_all(ctx.cards_dir()).unwrap();
        assert!(!ctx.directories_exist());
        ctx.ensure_directories().await.unwrap();
        assert!(ctx.cards_dir().exists());
    }

    #[tokio::test]
    async fn test_missing_entities() {
        let (_temp, ctx) = setup().await;
        assert!(matches!(
            ctx.read_board(&BoardId::from_string("nope")).await,
            Err(BoardError::BoardNotFound { .. })
        ));
        assert!(matches!(
            ctx.read_card(&CardId::from_string("nope")).await,
            Err(BoardError::CardNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_board_sorted() {
        let (_temp, ctx) = setup().await;
        let (board, todo, done) = seeded(&ctx).await;

        let late = Card::new(todo.id.clone(), "late", Order::new(200.0));
        let early = Card::new(todo.id.clone(), "early", Order::new(100.0));
        ctx.create_card(&late).await.unwrap();
        ctx.create_card(&early).await.unwrap();

        let agg = ctx.load_board(&board.id).await.unwrap();
        assert_eq!(agg.lists()[0].id(), &todo.id);
        assert_eq!(agg.lists()[1].id(), &done.id);
        let titles: Vec<_> = agg.lists()[0].cards().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_save_card_position() {
        let (_temp, ctx) = setup().await;
        let (_board, todo, done) = seeded(&ctx).await;
        let card = Card::new(todo.id.clone(), "move me", Order::BASE);
        ctx.create_card(&card).await.unwrap();

        ctx.save_card_position(&card.id, &done.id, Order::new(50.0))
            .await
            .unwrap();
        let stored = ctx.read_card(&card.id).await.unwrap();
        assert_eq!(stored.list, done.id);
        assert_eq!(stored.order, Order::new(50.0));

        let err = ctx
            .save_card_position(&card.id, &ListId::from_string("nope"), Order::BASE)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_save_list_sequence_is_all_or_nothing() {
        let (_temp, ctx) = setup().await;
        let (_board, todo, done) = seeded(&ctx).await;

        let err = ctx
            .save_list_sequence(&[
                ListOrder {
                    list_id: done.id.clone(),
                    order: Order::new(100.0),
                },
                ListOrder {
                    list_id: ListId::from_string("nope"),
                    order: Order::new(200.0),
                },
            ])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(ctx.read_list(&done.id).await.unwrap().order, Order::new(200.0));

        ctx.save_list_sequence(&[
            ListOrder {
                list_id: done.id.clone(),
                order: Order::new(100.0),
            },
            ListOrder {
                list_id: todo.id.clone(),
                order: Order::new(200.0),
            },
        ])
        .await
        .unwrap();
        assert_eq!(ctx.read_list(&todo.id).await.unwrap().order, Order::new(200.0));
    }

    #[tokio::test]
    async fn test_save_card_sequence_is_all_or_nothing() {
        let (_temp, ctx) = setup().await;
        let (_board, todo, _done) = seeded(&ctx).await;
        let x = Card::new(todo.id.clone(), "x", Order::new(10.0));
        let y = Card::new(todo.id.clone(), "y", Order::new(20.0));
        ctx.create_card(&x).await.unwrap();
        ctx.create_card(&y).await.unwrap();

        let err = ctx
            .save_card_sequence(
                &todo.id,
                &[
                    CardOrder {
                        card_id: x.id.clone(),
                        order: Order::new(100.0),
                    },
                    CardOrder {
                        card_id: CardId::from_string("nope"),
                        order: Order::new(200.0),
                    },
                ],
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(ctx.read_card(&x.id).await.unwrap().order, Order::new(10.0));

        ctx.save_card_sequence(
            &todo.id,
            &[
                CardOrder {
                    card_id: x.id.clone(),
                    order: Order::new(100.0),
                },
                CardOrder {
                    card_id: y.id.clone(),
                    order: Order::new(200.0),
                },
            ],
        )
        .await
        .unwrap();
        let orders: Vec<f64> = ctx
            .read_cards(&todo.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.order.value())
            .collect();
        assert_eq!(orders, vec![100.0, 200.0]);
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_storage_root() {
        let (_temp, ctx) = setup().await;
        let (board, _todo, _done) = seeded(&ctx).await;

        for id in ["../boards/x", "..", "a/b", "a\\b", ""] {
            assert!(matches!(
                ctx.read_card(&CardId::from_string(id)).await,
                Err(BoardError::InvalidValue { .. })
            ));
        }
        let escaping = format!("../boards/{}", board.id);
        assert!(matches!(
            ctx.read_list(&ListId::from_string(escaping)).await,
            Err(BoardError::InvalidValue { .. })
        ));
        assert!(!ctx.board_exists(&BoardId::from_string("../x")).await);
    }

    #[tokio::test]
    async fn test_delete_list_cascades() {
        let (_temp, ctx) = setup().await;
        let (_board, todo, done) = seeded(&ctx).await;
        let a = Card::new(todo.id.clone(), "a", Order::BASE);
        let b = Card::new(done.id.clone(), "b", Order::BASE);
        ctx.create_card(&a).await.unwrap();
        ctx.create_card(&b).await.unwrap();

        let removed = ctx.delete_list(&todo.id).await.unwrap();
        assert_eq!(removed, vec![a.id.clone()]);
        assert!(!ctx.card_path(&a.id).unwrap().exists());
        assert!(ctx.card_path(&b.id).unwrap().exists());
        assert!(!ctx.list_path(&todo.id).unwrap().exists());
    }

    #[tokio::test]
    async fn test_next_orders() {
        let (_temp, ctx) = setup().await;
        let (board, todo, _done) = seeded(&ctx).await;
        assert_eq!(ctx.next_list_order(&board.id).await.unwrap(), Order::new(300.0));
        assert_eq!(ctx.next_card_order(&todo.id).await.unwrap(), Order::BASE);
    }

    #[tokio::test]
    async fn test_activity_newest_first() {
        use crate::types::{AuditAction, EntityType};

        let (_temp, ctx) = setup().await;
        let board = BoardId::from_string("b1");
        for id in ["c1", "c2", "c3"] {
            let event = AuditEvent::new(
                AuditAction::Create,
                EntityType::Card,
                id,
                UserId::from_string("alice"),
                board.clone(),
            );
            ctx.append_activity(&event).await.unwrap();
        }

        let events = ctx.read_activity(&board, None).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2", "c1"]);

        let limited = ctx.read_activity(&board, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert!(ctx
            .read_activity(&BoardId::from_string("other"), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_locking() {
        let (_temp, ctx) = setup().await;
        let lock1 = ctx.lock().await.unwrap();
        assert!(matches!(ctx.lock().await, Err(BoardError::LockBusy)));
        drop(lock1);
        let _lock2 = ctx.lock().await.unwrap();
    }
}
