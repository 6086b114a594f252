//! GetBoard command

use crate::aggregate::BoardAggregate;
use crate::context::BoardContext;
use crate::error::{BoardError, Result};
use crate::operation::{operation, Execute, ExecutionResult};
use crate::types::BoardId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Get a board with its lists and cards, all sorted by order key
#[derive(Debug, Deserialize, Serialize)]
pub struct GetBoard {
    /// The board ID
    pub id: BoardId,
}

operation!(
    GetBoard,
    verb = "get",
    noun = "board",
    description = "Retrieve a board with its lists and cards"
);

impl GetBoard {
    pub fn new(id: impl Into<BoardId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Execute<BoardContext, BoardError> for GetBoard {
    async fn execute(&self, ctx: &BoardContext) -> ExecutionResult<Value, BoardError> {
        ExecutionResult::unlogged(self.run(ctx).await)
    }
}

impl GetBoard {
    async fn run(&self, ctx: &BoardContext) -> Result<Value> {
        let aggregate = ctx.read_aggregate(&self.id).await?;
        board_to_json(&aggregate)
    }
}

/// Nested board document: the board fields plus `lists`, each with its `cards`
fn board_to_json(aggregate: &BoardAggregate) -> Result<Value> {
    let mut value = serde_json::to_value(aggregate.board())?;
    let mut lists = Vec::with_capacity(aggregate.lists().len());
    for node in aggregate.lists() {
        let mut list = serde_json::to_value(&node.list)?;
        list["cards"] = serde_json::to_value(node.cards())?;
        lists.push(list);
    }
    value["lists"] = Value::Array(lists);
    Ok(value)
}
