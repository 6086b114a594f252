//! Order keys for list and card ordering using gap-based fractional indexing.
//!
//! Siblings are sorted by a floating-point key. Inserting between two siblings
//! takes the midpoint of their keys, so a move touches exactly one record.
//! The price is precision: inserting repeatedly at the same boundary halves the
//! gap each time, and after roughly fifty halvings the two neighbors can no
//! longer be separated at `f64` precision. Nothing here renumbers
//! automatically; [`Order::has_room`] lets callers detect the condition and the
//! aggregate's respace helpers rewrite a sequence on request.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Key given to the first item of an empty container
pub const ORDER_BASE: f64 = 100.0;

/// Spacing used when appending after the last item
pub const ORDER_GAP: f64 = 100.0;

/// Sort key of a list within its board, or of a card within its list
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Order(f64);

impl Order {
    /// Key for the first item in an empty container
    pub const BASE: Order = Order(ORDER_BASE);

    /// Wrap a raw key
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw key
    pub fn value(self) -> f64 {
        self.0
    }

    /// Key after the last item
    pub fn after(prev: Order) -> Self {
        Self(prev.0 + ORDER_GAP)
    }

    /// Key before the first item
    ///
    /// Halves a positive key. Keys in this system start at 100 and only ever
    /// halve or grow, so `next` is positive in practice; a non-positive `next`
    /// steps down by one gap instead, which keeps the result strictly below it.
    pub fn before(next: Order) -> Self {
        if next.0 > 0.0 {
            Self(next.0 / 2.0)
        } else {
            Self(next.0 - ORDER_GAP)
        }
    }

    /// Key halfway between two neighbors
    pub fn between(prev: Order, next: Order) -> Self {
        Self(prev.0 + (next.0 - prev.0) / 2.0)
    }

    /// Key for the `index`-th item of a freshly respaced sequence: 100, 200, ...
    pub fn spaced(index: usize) -> Self {
        Self((index as f64 + 1.0) * ORDER_GAP)
    }

    /// Whether a key strictly between `prev` and `next` is representable
    pub fn has_room(prev: Order, next: Order) -> bool {
        let mid = Self::between(prev, next);
        prev < mid && mid < next
    }

    /// Total ordering used for every sort, so NaN can never panic a comparator
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::BASE
    }
}

impl From<f64> for Order {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the key for a slot given the keys of its neighbors.
///
/// | prev | next | result |
/// |------|------|--------|
/// | none | none | 100 |
/// | none | n    | n / 2 |
/// | p    | none | p + 100 |
/// | p    | n    | (p + n) / 2 |
pub fn allocate(prev: Option<Order>, next: Option<Order>) -> Order {
    match (prev, next) {
        (None, None) => Order::BASE,
        (None, Some(next)) => Order::before(next),
        (Some(prev), None) => Order::after(prev),
        (Some(prev), Some(next)) => Order::between(prev, next),
    }
}
