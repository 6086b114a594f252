//! Collaborative task board engine with fractional ordering
//!
//! Boards contain ordered lists, lists contain ordered cards. Order is stored on
//! each list and card as a floating-point key, so moving one item never
//! renumbers its siblings: the moved item gets a key between its new neighbors.
//!
//! ## Overview
//!
//! - **Order keys** - [`allocate`] computes a key for a slot from its neighbors
//! - **Aggregate** - [`BoardAggregate`] is the in-memory board → lists → cards tree
//! - **Planner** - [`planner`] turns a drop into one aggregate mutation and one
//!   [`PersistCommand`]
//! - **Drag sessions** - [`DragMachine`] tracks a pointer gesture from press to release
//! - **Sessions** - [`BoardSession`] wires the above to a [`BoardStore`] and an [`AuditSink`]
//! - **Operations** - command structs (`AddCard`, `MoveList`, ...) executed against
//!   a file-backed [`BoardContext`] through a [`BoardOperationProcessor`]
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use taskboard::{
//!     board::CreateBoard, card::AddCard, list::AddList, BoardContext,
//!     BoardOperationProcessor, UserId,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = BoardContext::new("/path/to/.taskboard");
//! let alice = UserId::from_string("alice");
//! let processor = BoardOperationProcessor::new(alice.clone());
//!
//! let board = processor.process(&CreateBoard::new("Launch", alice), &ctx).await?;
//! let board_id = board["id"].as_str().unwrap();
//!
//! let list = processor.process(&AddList::new(board_id, "To Do"), &ctx).await?;
//! let card = processor
//!     .process(&AddCard::new(list["id"].as_str().unwrap(), "Write the release notes"), &ctx)
//!     .await?;
//!
//! println!("Created card {} at order {}", card["id"], card["order"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Structure
//!
//! ```text
//! .taskboard/
//! ├── boards/{id}.json        # Board metadata and membership
//! ├── lists/{id}.json         # List title, parent board, order key
//! ├── cards/{id}.json         # Card fields, parent list, order key
//! ├── activity/{board}.jsonl  # Per-board audit trail (append-only)
//! └── .lock                   # Advisory lock file
//! ```

pub mod aggregate;
pub mod audit;
pub mod auto_color;
pub mod config;
mod context;
pub mod drag;
mod error;
pub mod operation;
pub mod planner;
pub mod session;
pub mod store;
pub mod types;

// Command modules
pub mod activity;
pub mod board;
pub mod card;
pub mod list;

pub use aggregate::{BoardAggregate, ListNode, Neighbors};
pub use audit::{ActivityLog, AuditSink, MemoryAuditLog};
pub use config::{DragConfig, TaskboardConfig};
pub use context::{BoardContext, BoardLock};
pub use drag::{DragMachine, DragOutcome, DragState, Point};
pub use error::{BoardError, Result};
pub use operation::{
    Activity, BoardOperationProcessor, Execute, ExecutionResult, Operation,
};
pub use planner::{CardOrder, DragItem, DropTarget, ListOrder, PersistCommand, Placement, Rect};
pub use session::{BoardSession, SessionOptions};
pub use store::BoardStore;

// Re-export commonly used types
pub use types::{
    allocate, AuditAction, AuditEvent, AuditEventId, Board, BoardId, Card, CardId, EntityType,
    Label, List, ListId, Order, UserId, ORDER_BASE, ORDER_GAP,
};
