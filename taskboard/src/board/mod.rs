//! Board commands

mod create;
mod get;
mod list;
mod member;

pub use create::CreateBoard;
pub use get::GetBoard;
pub use list::ListBoards;
pub use member::AddMember;
