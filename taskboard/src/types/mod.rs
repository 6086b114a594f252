//! Core types for the task board engine

mod audit;
mod board;
mod card;
mod ids;
mod order;

// Re-export all types
pub use audit::{AuditAction, AuditEvent, EntityType};
pub use board::{Board, List};
pub use card::{Card, Label};
pub use ids::{AuditEventId, BoardId, CardId, ListId, UserId};
pub use order::{allocate, Order, ORDER_BASE, ORDER_GAP};
