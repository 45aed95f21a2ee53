#![forbid(unsafe_code)]

//! Drag session lifecycle.
//!
//! ```text
//! Idle -> Armed -> Dragging -> Settling -> Idle
//!   \        \         \------> Idle (cancel / release over nothing)
//!    \        \-------------> Idle (release before threshold = click)
//!     \--------------> Dragging (keyboard grab)
//! ```
//!
//! [`DragSession::apply`] consumes one [`DragInput`] and always returns a
//! [`DragTransition`]. Inputs that make no sense in the current state are not
//! errors: they produce an explicit [`DragEffect::Noop`] with a
//! [`NoopReason`], so hosts can log them and tests can assert on them.
//!
//! The session never mutates the collection. A successful release yields
//! [`DragEffect::DropRequested`] and parks in `Settling` until the host has
//! run the move engine and handed the result to the sync client, then calls
//! [`DragSession::settle`].

use std::fmt;

use ordo_core::geometry::Point;
use ordo_model::{CollectionView, ContainerId, InsertAt, ItemId, MoveTarget, Slot};
use serde::{Deserialize, Serialize};

use crate::collision::{DropMap, DropTargetId};

/// Default pointer displacement, in logical pixels, that an armed press must
/// exceed to become a drag.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 3.0;

/// Drag session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Displacement from the press origin that must be exceeded to start a
    /// drag.
    pub threshold: f64,
    /// Whether the keyboard path (grab / step / drop) is enabled.
    pub keyboard: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DRAG_THRESHOLD,
            keyboard: true,
        }
    }
}

impl DragConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<(), DragConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(DragConfigError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Drag configuration errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragConfigError {
    InvalidThreshold { threshold: f64 },
}

impl fmt::Display for DragConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidThreshold { threshold } => {
                write!(f, "drag threshold must be finite and > 0 (got {threshold})")
            }
        }
    }
}

impl std::error::Error for DragConfigError {}

/// Something the permission oracle can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    Item(ItemId),
    Container(ContainerId),
}

/// External authorization seam.
///
/// Consulted before a press arms or a keyboard grab starts (`Subject::Item`)
/// and for every prospective target container (`Subject::Container`).
pub trait PermissionOracle {
    fn can_manipulate(&self, subject: Subject) -> bool;
}

impl<F> PermissionOracle for F
where
    F: Fn(Subject) -> bool,
{
    fn can_manipulate(&self, subject: Subject) -> bool {
        self(subject)
    }
}

/// Oracle that permits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionOracle for AllowAll {
    fn can_manipulate(&self, _subject: Subject) -> bool {
        true
    }
}

/// Borrowed collaborators a session needs to process one input.
#[derive(Clone, Copy)]
pub struct DragContext<'a> {
    pub drop_map: &'a DropMap,
    pub view: &'a dyn CollectionView,
    pub permissions: &'a dyn PermissionOracle,
}

impl<'a> DragContext<'a> {
    #[must_use]
    pub fn new(
        drop_map: &'a DropMap,
        view: &'a dyn CollectionView,
        permissions: &'a dyn PermissionOracle,
    ) -> Self {
        Self {
            drop_map,
            view,
            permissions,
        }
    }
}

impl fmt::Debug for DragContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragContext")
            .field("drop_map", self.drop_map)
            .finish_non_exhaustive()
    }
}

/// How an active drag is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DragSource {
    Pointer {
        pointer_id: u32,
        origin: Point,
        current: Point,
    },
    Keyboard,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    Armed {
        item: ItemId,
        pointer_id: u32,
        origin: Point,
        current: Point,
    },
    Dragging {
        item: ItemId,
        source: DragSource,
        over: Option<DropTargetId>,
        target: Option<MoveTarget>,
    },
    Settling {
        item: ItemId,
        target: MoveTarget,
    },
}

impl DragState {
    /// Item being manipulated, if any.
    #[must_use]
    pub const fn item(&self) -> Option<ItemId> {
        match self {
            Self::Idle => None,
            Self::Armed { item, .. } | Self::Dragging { item, .. } | Self::Settling { item, .. } => {
                Some(*item)
            }
        }
    }
}

/// Keyboard navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStep {
    Next,
    Previous,
    NextContainer,
    PreviousContainer,
}

/// Why a gesture was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    EscapeKey,
    Blur,
    PointerCanceled,
    Programmatic,
}

/// One input to the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum DragInput {
    PointerDown {
        item: ItemId,
        pointer_id: u32,
        position: Point,
    },
    PointerMove {
        pointer_id: u32,
        position: Point,
    },
    PointerUp {
        pointer_id: u32,
        position: Point,
    },
    Grab {
        item: ItemId,
    },
    Step {
        step: KeyStep,
    },
    Drop,
    Cancel {
        reason: CancelReason,
    },
}

/// Explicit diagnostics for inputs that are safely ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    IdleWithoutActiveDrag,
    ActiveDragAlreadyInProgress,
    PointerMismatch,
    ThresholdNotReached,
    ActiveStateDisallowsDiscreteInput,
    KeyboardDisabled,
    StepOutOfRange,
    SettlingInProgress,
    UnknownItem,
}

/// Observable drag feedback for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragFeedback {
    pub item: ItemId,
    /// Pointer position; `None` for keyboard drags.
    pub pointer: Option<Point>,
    pub over: Option<DropTargetId>,
    pub target: Option<MoveTarget>,
}

/// Effect emitted by one transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    Armed {
        item: ItemId,
        pointer_id: u32,
        origin: Point,
    },
    /// The permission oracle refused the item.
    Denied { item: ItemId },
    DragStarted(DragFeedback),
    Moved(DragFeedback),
    /// Press and release without crossing the threshold.
    Click { item: ItemId },
    /// Released over a valid target; the host should compute and commit.
    DropRequested { item: ItemId, target: MoveTarget },
    /// Released over nothing.
    DropRejected { item: ItemId },
    Settled { item: ItemId, target: MoveTarget },
    Canceled {
        item: Option<ItemId>,
        reason: CancelReason,
    },
    Noop { reason: NoopReason },
}

/// One lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragState,
    pub to: DragState,
    pub effect: DragEffect,
}

/// Drag lifecycle machine for one reorder surface.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DragSession {
    state: DragState,
    config: DragConfig,
    transition_counter: u64,
}

impl DragSession {
    /// Construct a session with a validated configuration.
    pub fn new(config: DragConfig) -> Result<Self, DragConfigError> {
        config.validate()?;
        Ok(Self {
            state: DragState::Idle,
            config,
            transition_counter: 0,
        })
    }

    #[must_use]
    pub const fn state(&self) -> DragState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> DragConfig {
        self.config
    }

    /// Whether a gesture is in progress (anything but `Idle`).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Current drag feedback, while dragging.
    #[must_use]
    pub fn feedback(&self) -> Option<DragFeedback> {
        match self.state {
            DragState::Dragging {
                item,
                source,
                over,
                target,
            } => Some(DragFeedback {
                item,
                pointer: pointer_of(source),
                over,
                target,
            }),
            _ => None,
        }
    }

    /// Apply one input.
    pub fn apply(&mut self, input: DragInput, ctx: &DragContext<'_>) -> DragTransition {
        let from = self.state;
        let effect = match (self.state, input) {
            (
                DragState::Idle,
                DragInput::PointerDown {
                    item,
                    pointer_id,
                    position,
                },
            ) => {
                if ctx.view.locate(item).is_none() {
                    DragEffect::Noop {
                        reason: NoopReason::UnknownItem,
                    }
                } else if !ctx.permissions.can_manipulate(Subject::Item(item)) {
                    DragEffect::Denied { item }
                } else {
                    self.state = DragState::Armed {
                        item,
                        pointer_id,
                        origin: position,
                        current: position,
                    };
                    DragEffect::Armed {
                        item,
                        pointer_id,
                        origin: position,
                    }
                }
            }
            (DragState::Idle, DragInput::Grab { item }) => self.grab(item, ctx),
            (DragState::Idle, _) => DragEffect::Noop {
                reason: NoopReason::IdleWithoutActiveDrag,
            },

            (
                DragState::Armed {
                    item,
                    pointer_id,
                    origin,
                    ..
                },
                DragInput::PointerMove {
                    pointer_id: incoming,
                    position,
                },
            ) => {
                if incoming != pointer_id {
                    DragEffect::Noop {
                        reason: NoopReason::PointerMismatch,
                    }
                } else if crossed_drag_threshold(origin, position, self.config.threshold) {
                    let (over, target) = resolve_pointer(ctx, item, position);
                    self.state = DragState::Dragging {
                        item,
                        source: DragSource::Pointer {
                            pointer_id,
                            origin,
                            current: position,
                        },
                        over,
                        target,
                    };
                    DragEffect::DragStarted(DragFeedback {
                        item,
                        pointer: Some(position),
                        over,
                        target,
                    })
                } else {
                    self.state = DragState::Armed {
                        item,
                        pointer_id,
                        origin,
                        current: position,
                    };
                    DragEffect::Noop {
                        reason: NoopReason::ThresholdNotReached,
                    }
                }
            }
            (
                DragState::Armed {
                    item, pointer_id, ..
                },
                DragInput::PointerUp {
                    pointer_id: incoming,
                    ..
                },
            ) => {
                if incoming == pointer_id {
                    self.state = DragState::Idle;
                    DragEffect::Click { item }
                } else {
                    DragEffect::Noop {
                        reason: NoopReason::PointerMismatch,
                    }
                }
            }
            (DragState::Armed { item, .. }, DragInput::Cancel { reason }) => {
                self.state = DragState::Idle;
                DragEffect::Canceled {
                    item: Some(item),
                    reason,
                }
            }
            (
                DragState::Armed { .. },
                DragInput::PointerDown { .. } | DragInput::Grab { .. },
            ) => DragEffect::Noop {
                reason: NoopReason::ActiveDragAlreadyInProgress,
            },
            (DragState::Armed { .. }, DragInput::Step { .. } | DragInput::Drop) => {
                DragEffect::Noop {
                    reason: NoopReason::ActiveStateDisallowsDiscreteInput,
                }
            }

            (
                DragState::Dragging {
                    item,
                    source:
                        DragSource::Pointer {
                            pointer_id, origin, ..
                        },
                    ..
                },
                DragInput::PointerMove {
                    pointer_id: incoming,
                    position,
                },
            ) if incoming == pointer_id => {
                let (over, target) = resolve_pointer(ctx, item, position);
                self.state = DragState::Dragging {
                    item,
                    source: DragSource::Pointer {
                        pointer_id,
                        origin,
                        current: position,
                    },
                    over,
                    target,
                };
                DragEffect::Moved(DragFeedback {
                    item,
                    pointer: Some(position),
                    over,
                    target,
                })
            }
            (
                DragState::Dragging {
                    item,
                    source: DragSource::Pointer { pointer_id, .. },
                    ..
                },
                DragInput::PointerUp {
                    pointer_id: incoming,
                    position,
                },
            ) if incoming == pointer_id => {
                let (_, target) = resolve_pointer(ctx, item, position);
                self.release(item, target)
            }
            (
                DragState::Dragging { .. },
                DragInput::PointerMove { .. } | DragInput::PointerUp { .. },
            ) => DragEffect::Noop {
                reason: NoopReason::PointerMismatch,
            },
            (
                DragState::Dragging {
                    item,
                    source: DragSource::Keyboard,
                    target,
                    ..
                },
                DragInput::Step { step },
            ) => match target.and_then(|target| keyboard_step(ctx, item, target, step)) {
                Some(next) => {
                    let over = match ctx.view.item_at(Slot::new(next.container, index_of(next))) {
                        Some(anchor) => DropTargetId::Item {
                            container: next.container,
                            item: anchor,
                        },
                        None => DropTargetId::Container {
                            container: next.container,
                        },
                    };
                    self.state = DragState::Dragging {
                        item,
                        source: DragSource::Keyboard,
                        over: Some(over),
                        target: Some(next),
                    };
                    DragEffect::Moved(DragFeedback {
                        item,
                        pointer: None,
                        over: Some(over),
                        target: Some(next),
                    })
                }
                None => DragEffect::Noop {
                    reason: NoopReason::StepOutOfRange,
                },
            },
            (
                DragState::Dragging {
                    item,
                    source: DragSource::Keyboard,
                    target,
                    ..
                },
                DragInput::Drop,
            ) => self.release(item, target),
            (DragState::Dragging { .. }, DragInput::Step { .. } | DragInput::Drop) => {
                DragEffect::Noop {
                    reason: NoopReason::ActiveStateDisallowsDiscreteInput,
                }
            }
            (DragState::Dragging { item, .. }, DragInput::Cancel { reason }) => {
                self.state = DragState::Idle;
                DragEffect::Canceled {
                    item: Some(item),
                    reason,
                }
            }
            (
                DragState::Dragging { .. },
                DragInput::PointerDown { .. } | DragInput::Grab { .. },
            ) => DragEffect::Noop {
                reason: NoopReason::ActiveDragAlreadyInProgress,
            },

            (DragState::Settling { .. }, _) => DragEffect::Noop {
                reason: NoopReason::SettlingInProgress,
            },
        };

        self.finish(from, effect)
    }

    /// Complete a requested drop: `Settling -> Idle`.
    ///
    /// Returns `None` when the session is not settling.
    pub fn settle(&mut self) -> Option<DragTransition> {
        let from = self.state;
        let DragState::Settling { item, target } = from else {
            return None;
        };
        self.state = DragState::Idle;
        Some(self.finish(from, DragEffect::Settled { item, target }))
    }

    /// Unconditionally reset to `Idle`.
    ///
    /// Safety valve for teardown paths where no well-formed input exists.
    /// Returns `None` if already idle.
    pub fn force_cancel(&mut self) -> Option<DragTransition> {
        let from = self.state;
        let item = from.item()?;
        self.state = DragState::Idle;
        Some(self.finish(
            from,
            DragEffect::Canceled {
                item: Some(item),
                reason: CancelReason::Programmatic,
            },
        ))
    }

    fn grab(&mut self, item: ItemId, ctx: &DragContext<'_>) -> DragEffect {
        if !self.config.keyboard {
            return DragEffect::Noop {
                reason: NoopReason::KeyboardDisabled,
            };
        }
        let Some(slot) = ctx.view.locate(item) else {
            return DragEffect::Noop {
                reason: NoopReason::UnknownItem,
            };
        };
        if !ctx.permissions.can_manipulate(Subject::Item(item)) {
            return DragEffect::Denied { item };
        }
        let over = Some(DropTargetId::Item {
            container: slot.container,
            item,
        });
        let target = Some(MoveTarget::at(slot.container, slot.index));
        self.state = DragState::Dragging {
            item,
            source: DragSource::Keyboard,
            over,
            target,
        };
        DragEffect::DragStarted(DragFeedback {
            item,
            pointer: None,
            over,
            target,
        })
    }

    fn release(&mut self, item: ItemId, target: Option<MoveTarget>) -> DragEffect {
        match target {
            Some(target) => {
                self.state = DragState::Settling { item, target };
                DragEffect::DropRequested { item, target }
            }
            None => {
                self.state = DragState::Idle;
                DragEffect::DropRejected { item }
            }
        }
    }

    fn finish(&mut self, from: DragState, effect: DragEffect) -> DragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        let transition = DragTransition {
            transition_id: self.transition_counter,
            from,
            to: self.state,
            effect,
        };
        tracing::debug!(
            target: "ordo.drag",
            transition_id = transition.transition_id,
            from = ?transition.from,
            to = ?transition.to,
            effect = ?transition.effect,
            "drag transition"
        );
        transition
    }
}

fn pointer_of(source: DragSource) -> Option<Point> {
    match source {
        DragSource::Pointer { current, .. } => Some(current),
        DragSource::Keyboard => None,
    }
}

fn crossed_drag_threshold(origin: Point, current: Point, threshold: f64) -> bool {
    current.is_finite() && origin.distance_squared(current) > threshold * threshold
}

/// Resolve the pointer to a drop target the oracle allows.
fn resolve_pointer(
    ctx: &DragContext<'_>,
    item: ItemId,
    pointer: Point,
) -> (Option<DropTargetId>, Option<MoveTarget>) {
    match ctx.drop_map.resolve(pointer, item, ctx.view) {
        Some(resolution)
            if ctx
                .permissions
                .can_manipulate(Subject::Container(resolution.target.container)) =>
        {
            (Some(resolution.over), Some(resolution.target))
        }
        _ => (None, None),
    }
}

fn index_of(target: MoveTarget) -> usize {
    match target.slot {
        InsertAt::Index(index) => index,
        InsertAt::End => usize::MAX,
    }
}

/// Largest final index `item` may take in `container`.
fn max_index(view: &dyn CollectionView, item: ItemId, container: ContainerId) -> Option<usize> {
    let len = view.container_len(container)?;
    let source = view.locate(item)?;
    if source.container == container {
        Some(len.saturating_sub(1))
    } else {
        Some(len)
    }
}

/// Next keyboard target; `None` at the edges (no wrap-around).
fn keyboard_step(
    ctx: &DragContext<'_>,
    item: ItemId,
    current: MoveTarget,
    step: KeyStep,
) -> Option<MoveTarget> {
    let max = max_index(ctx.view, item, current.container)?;
    let index = index_of(current).min(max);
    match step {
        KeyStep::Next => (index < max).then(|| MoveTarget::at(current.container, index + 1)),
        KeyStep::Previous => (index > 0).then(|| MoveTarget::at(current.container, index - 1)),
        KeyStep::NextContainer | KeyStep::PreviousContainer => {
            let containers = ctx.view.container_ids();
            let here = containers.iter().position(|id| *id == current.container)?;
            let candidates: Box<dyn Iterator<Item = &ContainerId>> =
                if step == KeyStep::NextContainer {
                    Box::new(containers[here + 1..].iter())
                } else {
                    Box::new(containers[..here].iter().rev())
                };
            let container = candidates
                .copied()
                .find(|id| ctx.permissions.can_manipulate(Subject::Container(*id)))?;
            let max = max_index(ctx.view, item, container)?;
            Some(MoveTarget::at(container, index.min(max)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionStrategy, DropZone};
    use ordo_core::geometry::{Axis, Rect};
    use ordo_model::{ContainerKind, OrderedCollection};

    fn c(raw: u64) -> ContainerId {
        ContainerId::new(raw)
    }

    fn i(raw: u64) -> ItemId {
        ItemId::new(raw)
    }

    fn board() -> OrderedCollection<()> {
        let mut collection = OrderedCollection::new();
        for (container, items) in [(1u64, vec![1u64, 2, 3]), (2, vec![4]), (3, vec![])] {
            collection
                .insert_container(c(container), ContainerKind::BoardList)
                .unwrap();
            for item in items {
                collection.push_item(c(container), i(item), ()).unwrap();
            }
        }
        collection
    }

    /// Three 200px columns, cards 40px tall stacked every 50px from y = 50.
    fn board_map() -> DropMap {
        let card = |column: f64, row: f64| {
            Rect::new(column * 220.0 + 10.0, 50.0 + row * 50.0, 180.0, 40.0)
        };
        DropMap::new(CollisionStrategy::for_layout(Axis::Horizontal))
            .with_zone(
                DropZone::new(c(1), Rect::new(0.0, 0.0, 200.0, 800.0))
                    .with_item(i(1), card(0.0, 0.0))
                    .with_item(i(2), card(0.0, 1.0))
                    .with_item(i(3), card(0.0, 2.0)),
            )
            .with_zone(
                DropZone::new(c(2), Rect::new(220.0, 0.0, 200.0, 800.0))
                    .with_item(i(4), card(1.0, 0.0)),
            )
            .with_zone(DropZone::new(c(3), Rect::new(440.0, 0.0, 200.0, 800.0)))
    }

    fn down(item: u64, x: f64, y: f64) -> DragInput {
        DragInput::PointerDown {
            item: i(item),
            pointer_id: 1,
            position: Point::new(x, y),
        }
    }

    fn move_to(x: f64, y: f64) -> DragInput {
        DragInput::PointerMove {
            pointer_id: 1,
            position: Point::new(x, y),
        }
    }

    fn up(x: f64, y: f64) -> DragInput {
        DragInput::PointerUp {
            pointer_id: 1,
            position: Point::new(x, y),
        }
    }

    fn step(step: KeyStep) -> DragInput {
        DragInput::Step { step }
    }

    // --- Pointer path ---

    #[test]
    fn below_threshold_release_is_click() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        let t = session.apply(down(1, 20.0, 60.0), &ctx);
        assert!(matches!(t.effect, DragEffect::Armed { item, .. } if item == i(1)));

        let t = session.apply(move_to(22.0, 60.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::ThresholdNotReached
            }
        );
        assert!(matches!(
            session.state(),
            DragState::Armed { current, .. } if current == Point::new(22.0, 60.0)
        ));

        let t = session.apply(up(22.0, 60.0), &ctx);
        assert_eq!(t.effect, DragEffect::Click { item: i(1) });
        assert_eq!(session.state(), DragState::Idle);
    }

    #[test]
    fn movement_equal_to_threshold_stays_armed() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 20.0, 60.0), &ctx);
        let t = session.apply(move_to(23.0, 60.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::ThresholdNotReached
            }
        );
        assert!(matches!(session.state(), DragState::Armed { .. }));

        let t = session.apply(up(23.0, 60.0), &ctx);
        assert_eq!(t.effect, DragEffect::Click { item: i(1) });
    }

    #[test]
    fn movement_beyond_threshold_starts_drag() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 20.0, 60.0), &ctx);
        let t = session.apply(move_to(23.01, 60.0), &ctx);
        assert!(matches!(t.effect, DragEffect::DragStarted(_)));
        assert!(session.is_dragging());

        // Euclidean, not per axis: 2.2 px on each axis is about 3.11 px.
        let mut session = DragSession::default();
        session.apply(down(1, 20.0, 60.0), &ctx);
        let t = session.apply(move_to(22.2, 62.2), &ctx);
        assert!(matches!(t.effect, DragEffect::DragStarted(_)));
    }

    #[test]
    fn threshold_measures_displacement_not_path() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 20.0, 60.0), &ctx);
        session.apply(move_to(22.0, 60.0), &ctx);
        session.apply(move_to(20.0, 60.0), &ctx);
        let t = session.apply(move_to(22.0, 60.0), &ctx);
        assert!(matches!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::ThresholdNotReached
            }
        ));
    }

    #[test]
    fn drag_across_columns_requests_drop() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 100.0, 70.0), &ctx);
        let t = session.apply(move_to(300.0, 55.0), &ctx);
        let DragEffect::DragStarted(feedback) = t.effect else {
            panic!("expected drag start, got {:?}", t.effect);
        };
        assert_eq!(feedback.target, Some(MoveTarget::at(c(2), 0)));
        assert_eq!(session.feedback(), Some(feedback));

        let t = session.apply(move_to(300.0, 700.0), &ctx);
        assert!(matches!(
            t.effect,
            DragEffect::Moved(DragFeedback { target: Some(target), .. }) if target == MoveTarget::at(c(2), 1)
        ));

        let t = session.apply(up(540.0, 300.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::DropRequested {
                item: i(1),
                target: MoveTarget::at(c(3), 0)
            }
        );
        assert!(matches!(session.state(), DragState::Settling { .. }));

        let t = session.settle().unwrap();
        assert!(matches!(t.effect, DragEffect::Settled { item, .. } if item == i(1)));
        assert_eq!(session.state(), DragState::Idle);
        assert!(session.settle().is_none());
    }

    #[test]
    fn release_over_nothing_is_rejected() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(2, 100.0, 120.0), &ctx);
        session.apply(move_to(100.0, 140.0), &ctx);
        let t = session.apply(up(100.0, 5000.0), &ctx);
        assert_eq!(t.effect, DragEffect::DropRejected { item: i(2) });
        assert_eq!(session.state(), DragState::Idle);
    }

    #[test]
    fn denied_item_stays_idle() {
        let collection = board();
        let map = board_map();
        let deny_item_two = |subject: Subject| subject != Subject::Item(i(2));
        let ctx = DragContext::new(&map, &collection, &deny_item_two);
        let mut session = DragSession::default();

        let t = session.apply(down(2, 100.0, 120.0), &ctx);
        assert_eq!(t.effect, DragEffect::Denied { item: i(2) });
        assert_eq!(session.state(), DragState::Idle);

        let t = session.apply(DragInput::Grab { item: i(2) }, &ctx);
        assert_eq!(t.effect, DragEffect::Denied { item: i(2) });
    }

    #[test]
    fn denied_container_is_not_a_target() {
        let collection = board();
        let map = board_map();
        let locked = |subject: Subject| subject != Subject::Container(c(2));
        let ctx = DragContext::new(&map, &collection, &locked);
        let mut session = DragSession::default();

        session.apply(down(1, 100.0, 70.0), &ctx);
        let t = session.apply(move_to(300.0, 55.0), &ctx);
        assert!(matches!(
            t.effect,
            DragEffect::DragStarted(DragFeedback {
                over: None,
                target: None,
                ..
            })
        ));
        let t = session.apply(up(300.0, 55.0), &ctx);
        assert_eq!(t.effect, DragEffect::DropRejected { item: i(1) });
    }

    #[test]
    fn unknown_item_press_is_ignored() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();
        let t = session.apply(down(99, 0.0, 0.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::UnknownItem
            }
        );
    }

    #[test]
    fn cancel_from_armed_and_dragging() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 100.0, 70.0), &ctx);
        let t = session.apply(
            DragInput::Cancel {
                reason: CancelReason::EscapeKey,
            },
            &ctx,
        );
        assert!(matches!(
            t.effect,
            DragEffect::Canceled {
                reason: CancelReason::EscapeKey,
                ..
            }
        ));
        assert_eq!(session.state(), DragState::Idle);

        session.apply(down(1, 100.0, 70.0), &ctx);
        session.apply(move_to(300.0, 55.0), &ctx);
        let t = session.apply(
            DragInput::Cancel {
                reason: CancelReason::Blur,
            },
            &ctx,
        );
        assert_eq!(
            t.effect,
            DragEffect::Canceled {
                item: Some(i(1)),
                reason: CancelReason::Blur
            }
        );
        assert_eq!(session.state(), DragState::Idle);
    }

    #[test]
    fn pointer_mismatch_is_noop() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 100.0, 70.0), &ctx);
        let foreign = DragInput::PointerMove {
            pointer_id: 7,
            position: Point::new(400.0, 400.0),
        };
        let t = session.apply(foreign, &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::PointerMismatch
            }
        );
        assert!(matches!(session.state(), DragState::Armed { .. }));
    }

    #[test]
    fn second_press_while_active_is_noop() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(down(1, 100.0, 70.0), &ctx);
        let t = session.apply(down(2, 100.0, 120.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::ActiveDragAlreadyInProgress
            }
        );
        let t = session.apply(DragInput::Drop, &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::ActiveStateDisallowsDiscreteInput
            }
        );
    }

    #[test]
    fn idle_ignores_moves_and_releases() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();
        for input in [move_to(1.0, 1.0), up(1.0, 1.0), DragInput::Drop] {
            let t = session.apply(input, &ctx);
            assert_eq!(
                t.effect,
                DragEffect::Noop {
                    reason: NoopReason::IdleWithoutActiveDrag
                }
            );
            assert_eq!(t.from, t.to);
        }
    }

    #[test]
    fn settling_rejects_new_input() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(DragInput::Grab { item: i(1) }, &ctx);
        session.apply(step(KeyStep::Next), &ctx);
        session.apply(DragInput::Drop, &ctx);
        let t = session.apply(down(2, 100.0, 120.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::SettlingInProgress
            }
        );
    }

    // --- Keyboard path ---

    #[test]
    fn keyboard_grab_starts_at_current_slot() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        let t = session.apply(DragInput::Grab { item: i(2) }, &ctx);
        assert!(matches!(
            t.effect,
            DragEffect::DragStarted(DragFeedback { pointer: None, target: Some(target), .. })
                if target == MoveTarget::at(c(1), 1)
        ));
    }

    #[test]
    fn keyboard_steps_clamp_without_wrapping() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();
        let target = |session: &DragSession| session.feedback().and_then(|f| f.target);

        session.apply(DragInput::Grab { item: i(2) }, &ctx);
        session.apply(step(KeyStep::Next), &ctx);
        assert_eq!(target(&session), Some(MoveTarget::at(c(1), 2)));

        let t = session.apply(step(KeyStep::Next), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::StepOutOfRange
            }
        );

        // Another container may also take the slot past its last item.
        session.apply(step(KeyStep::NextContainer), &ctx);
        assert_eq!(target(&session), Some(MoveTarget::at(c(2), 1)));
        let t = session.apply(step(KeyStep::Next), &ctx);
        assert!(matches!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::StepOutOfRange
            }
        ));

        session.apply(step(KeyStep::NextContainer), &ctx);
        assert_eq!(target(&session), Some(MoveTarget::at(c(3), 0)));
        let t = session.apply(step(KeyStep::NextContainer), &ctx);
        assert!(matches!(t.effect, DragEffect::Noop { .. }));

        session.apply(step(KeyStep::PreviousContainer), &ctx);
        session.apply(step(KeyStep::PreviousContainer), &ctx);
        assert_eq!(target(&session), Some(MoveTarget::at(c(1), 0)));
        let t = session.apply(step(KeyStep::Previous), &ctx);
        assert!(matches!(t.effect, DragEffect::Noop { .. }));

        let t = session.apply(DragInput::Drop, &ctx);
        assert_eq!(
            t.effect,
            DragEffect::DropRequested {
                item: i(2),
                target: MoveTarget::at(c(1), 0)
            }
        );
    }

    #[test]
    fn keyboard_container_step_skips_denied_containers() {
        let collection = board();
        let map = board_map();
        let locked = |subject: Subject| subject != Subject::Container(c(2));
        let ctx = DragContext::new(&map, &collection, &locked);
        let mut session = DragSession::default();

        session.apply(DragInput::Grab { item: i(1) }, &ctx);
        session.apply(step(KeyStep::NextContainer), &ctx);
        assert_eq!(
            session.feedback().and_then(|f| f.target),
            Some(MoveTarget::at(c(3), 0))
        );
    }

    #[test]
    fn keyboard_disabled_ignores_grab() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::new(DragConfig {
            keyboard: false,
            ..DragConfig::default()
        })
        .unwrap();
        let t = session.apply(DragInput::Grab { item: i(1) }, &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::KeyboardDisabled
            }
        );
    }

    #[test]
    fn pointer_input_during_keyboard_drag_is_noop() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        session.apply(DragInput::Grab { item: i(1) }, &ctx);
        let t = session.apply(up(100.0, 70.0), &ctx);
        assert_eq!(
            t.effect,
            DragEffect::Noop {
                reason: NoopReason::PointerMismatch
            }
        );
        assert!(session.is_dragging());
    }

    // --- Lifecycle ---

    #[test]
    fn force_cancel_resets_active_session() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        assert!(session.force_cancel().is_none());
        session.apply(down(1, 100.0, 70.0), &ctx);
        let t = session.force_cancel().unwrap();
        assert_eq!(
            t.effect,
            DragEffect::Canceled {
                item: Some(i(1)),
                reason: CancelReason::Programmatic
            }
        );
        assert!(!session.is_active());
    }

    #[test]
    fn transition_ids_are_monotonic() {
        let collection = board();
        let map = board_map();
        let ctx = DragContext::new(&map, &collection, &AllowAll);
        let mut session = DragSession::default();

        let ids: Vec<u64> = [down(1, 100.0, 70.0), move_to(101.0, 70.0), up(101.0, 70.0)]
            .into_iter()
            .map(|input| session.apply(input, &ctx).transition_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn config_validation() {
        assert!(DragConfig::default().validate().is_ok());
        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = DragConfig {
                threshold,
                ..DragConfig::default()
            };
            assert!(matches!(
                DragSession::new(config),
                Err(DragConfigError::InvalidThreshold { .. })
            ));
        }
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: DragConfig = serde_json::from_str(r#"{ "threshold": 5.0 }"#).unwrap();
        assert_eq!(config.threshold, 5.0);
        assert!(config.keyboard);
    }

    #[test]
    fn transitions_serialize_with_tags() {
        let json = serde_json::to_value(DragEffect::Click { item: i(3) }).unwrap();
        assert_eq!(json, serde_json::json!({ "effect": "click", "item": 3 }));
        let json = serde_json::to_value(DragState::Idle).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "idle" }));
    }
}
