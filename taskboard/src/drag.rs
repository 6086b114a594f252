//! Drag session state machine.
//!
//! ```text
//! Idle ──pointer_down──▶ Pending ──pointer_move (> activation distance)──▶ Dragging
//!   ▲                      │                                              │
//!   └──── pointer_up ──────┘ (click)            pointer_up / cancel ◀─────┘
//! ```
//!
//! The machine never owns the aggregate. Every event that can touch the board
//! borrows it, so the session that owns the aggregate stays the only writer.
//! Entering `Dragging` snapshots the aggregate; `cancel` (or a drop outside any
//! target) puts that snapshot back.
//!
//! Hovering a card over a card or list body in *another* list moves it there
//! provisionally, so the user sees it change columns. Hovers inside the list
//! the card is displayed in, and every hover of a dragged list, are only
//! recorded and resolved at drop. Applying those immediately would shift the
//! hovered item away from under the pointer and the next hover event would move
//! it back.

use crate::aggregate::BoardAggregate;
use crate::error::Result;
use crate::planner::{self, DragItem, DropTarget, PersistCommand, Placement, Rect};
use tracing::debug;

/// Default movement, in pixels, before a press turns into a drag
pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 5.0;

/// Pointer position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Last hover delivered while dragging
#[derive(Debug, Clone, PartialEq)]
struct Hover {
    target: DropTarget,
    pointer: Rect,
    /// Whether the hover already moved the item in the aggregate
    applied: bool,
}

/// An activated gesture
#[derive(Debug, Clone)]
pub struct ActiveDrag {
    pub item: DragItem,
    /// Committed placement at gesture start
    pub origin: Placement,
    snapshot: BoardAggregate,
    hover: Option<Hover>,
}

impl ActiveDrag {
    /// Current hover target, if the pointer is over one
    pub fn target(&self) -> Option<&DropTarget> {
        self.hover.as_ref().map(|h| &h.target)
    }
}

/// Gesture state
#[derive(Debug, Clone, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed, not yet moved far enough to count as a drag
    Pending { item: DragItem, origin: Point },
    Dragging(Box<ActiveDrag>),
}

/// What an event did
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Event did not apply in the current state
    Ignored,
    /// Press registered, waiting for movement
    Pending,
    /// Drag activated
    Started,
    /// Hover recorded (and applied, for a cross-list card hover)
    Hovering,
    /// Pointer left every drop target
    TargetLost,
    /// Press and release without activation
    Click(DragItem),
    /// Gesture finished; `None` when the item ended where it started
    Dropped {
        item: DragItem,
        command: Option<PersistCommand>,
    },
    /// Gesture abandoned, aggregate restored
    Cancelled,
}

/// Tracks one pointer gesture at a time
#[derive(Debug, Clone)]
pub struct DragMachine {
    activation_distance: f64,
    state: DragState,
}

impl Default for DragMachine {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_DISTANCE)
    }
}

impl DragMachine {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            activation_distance: activation_distance.max(0.0),
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Whether a gesture (pending or dragging) is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// The item under the pointer, pending or dragging
    pub fn active_item(&self) -> Option<&DragItem> {
        match &self.state {
            DragState::Idle => None,
            DragState::Pending { item, .. } => Some(item),
            DragState::Dragging(drag) => Some(&drag.item),
        }
    }

    /// Aggregate as it was when the drag activated
    pub fn snapshot(&self) -> Option<&BoardAggregate> {
        match &self.state {
            DragState::Dragging(drag) => Some(&drag.snapshot),
            _ => None,
        }
    }

    /// Press on a draggable item
    pub fn pointer_down(
        &mut self,
        aggregate: &BoardAggregate,
        item: DragItem,
        at: Point,
    ) -> Result<DragOutcome> {
        if self.is_active() {
            debug!(item = item.id(), "pointer down ignored, gesture already active");
            return Ok(DragOutcome::Ignored);
        }
        planner::placement(aggregate, &item)?;

        if self.activation_distance == 0.0 {
            self.start(aggregate, item)?;
            return Ok(DragOutcome::Started);
        }
        debug!(item = item.id(), "pointer down");
        self.state = DragState::Pending { item, origin: at };
        Ok(DragOutcome::Pending)
    }

    /// Pointer movement; activates a pending press once it travelled far enough
    pub fn pointer_move(&mut self, aggregate: &BoardAggregate, at: Point) -> Result<DragOutcome> {
        let DragState::Pending { item, origin } = &self.state else {
            return Ok(DragOutcome::Ignored);
        };
        let dx = (at.x - origin.x).abs();
        let dy = (at.y - origin.y).abs();
        if dx <= self.activation_distance && dy <= self.activation_distance {
            return Ok(DragOutcome::Ignored);
        }

        let item = item.clone();
        if let Err(err) = self.start(aggregate, item) {
            self.state = DragState::Idle;
            return Err(err);
        }
        Ok(DragOutcome::Started)
    }

    fn start(&mut self, aggregate: &BoardAggregate, item: DragItem) -> Result<()> {
        let origin = planner::placement(aggregate, &item)?;
        debug!(item = item.id(), index = origin.index, "drag started");
        self.state = DragState::Dragging(Box::new(ActiveDrag {
            item,
            origin,
            snapshot: aggregate.clone(),
            hover: None,
        }));
        Ok(())
    }

    /// Pointer entered a drop target.
    ///
    /// An unknown target or item cancels the gesture and returns the error.
    pub fn pointer_over(
        &mut self,
        aggregate: &mut BoardAggregate,
        target: DropTarget,
        pointer: Rect,
    ) -> Result<DragOutcome> {
        let DragState::Dragging(drag) = &mut self.state else {
            return Ok(DragOutcome::Ignored);
        };

        let applied = match hover(aggregate, drag, &target, &pointer) {
            Ok(applied) => applied,
            Err(err) => {
                debug!(error = %err, "hover target invalid, cancelling drag");
                self.cancel(aggregate);
                return Err(err);
            }
        };
        drag.hover = Some(Hover {
            target,
            pointer,
            applied,
        });
        Ok(DragOutcome::Hovering)
    }

    /// Pointer left every drop target
    pub fn pointer_leave(&mut self) -> DragOutcome {
        match &mut self.state {
            DragState::Dragging(drag) => {
                drag.hover = None;
                DragOutcome::TargetLost
            }
            _ => DragOutcome::Ignored,
        }
    }

    /// Release.
    ///
    /// A pending press becomes a click. A drag with no hover target cancels.
    /// Otherwise the item is settled at its final slot and at most one command
    /// is returned for the caller to persist.
    pub fn pointer_up(&mut self, aggregate: &mut BoardAggregate) -> Result<DragOutcome> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => Ok(DragOutcome::Ignored),
            DragState::Pending { item, .. } => {
                debug!(item = item.id(), "click");
                Ok(DragOutcome::Click(item))
            }
            DragState::Dragging(drag) => {
                let drag = *drag;
                let Some(hover) = drag.hover.clone() else {
                    debug!(item = drag.item.id(), "dropped outside any target");
                    *aggregate = drag.snapshot;
                    return Ok(DragOutcome::Cancelled);
                };

                match settle(aggregate, &drag, &hover) {
                    Ok(command) => {
                        debug!(item = drag.item.id(), changed = command.is_some(), "dropped");
                        Ok(DragOutcome::Dropped {
                            item: drag.item,
                            command,
                        })
                    }
                    Err(err) => {
                        *aggregate = drag.snapshot;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Abandon the gesture, restoring the aggregate exactly
    pub fn cancel(&mut self, aggregate: &mut BoardAggregate) -> DragOutcome {
        match std::mem::take(&mut self.state) {
            DragState::Idle => DragOutcome::Ignored,
            DragState::Pending { .. } => DragOutcome::Cancelled,
            DragState::Dragging(drag) => {
                let drag = *drag;
                debug!(item = drag.item.id(), "drag cancelled");
                *aggregate = drag.snapshot;
                DragOutcome::Cancelled
            }
        }
    }
}

/// Apply or record a hover. Returns whether the aggregate was changed.
fn hover(
    aggregate: &mut BoardAggregate,
    drag: &ActiveDrag,
    target: &DropTarget,
    pointer: &Rect,
) -> Result<bool> {
    match &drag.item {
        DragItem::Card(card) => {
            let (list, index) = planner::card_destination(aggregate, card, target, pointer)?;
            let current = planner::card_placement(aggregate, card)?.container;
            if current.as_ref() != Some(&list) {
                planner::apply_card_move(aggregate, card, &list, index)?;
                return Ok(true);
            }
            // Still over the target that pulled the card into this list.
            let same_target = drag
                .hover
                .as_ref()
                .is_some_and(|h| h.applied && h.target.id() == target.id());
            Ok(same_target)
        }
        DragItem::List(list) => {
            planner::list_destination(aggregate, list, target)?;
            Ok(false)
        }
    }
}

/// Settle the dragged item at the end of the gesture
fn settle(
    aggregate: &mut BoardAggregate,
    drag: &ActiveDrag,
    hover: &Hover,
) -> Result<Option<PersistCommand>> {
    match &drag.item {
        DragItem::Card(card) => {
            if !hover.applied {
                let (list, index) =
                    planner::card_destination(aggregate, card, &hover.target, &hover.pointer)?;
                planner::apply_card_move(aggregate, card, &list, index)?;
            }
            planner::settle_card(aggregate, card, &drag.origin)
        }
        DragItem::List(list) => {
            let index = planner::list_destination(aggregate, list, &hover.target)?;
            planner::apply_list_move(aggregate, list, index)?;
            planner::settle_list(aggregate, list, &drag.origin)
        }
    }
}
