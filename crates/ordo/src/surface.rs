#![forbid(unsafe_code)]

//! Reorder surface: the single owned state container for one instance.
//!
//! A [`ReorderSurface`] owns everything one board, list section, sidebar
//! group or calendar view needs to reorder its items: the collection, the
//! drag session, the renderer-supplied [`DropMap`], the optimistic sync
//! client and its collaborators. Hosts feed it canonical [`Event`]s and
//! remote responses; nothing else writes to the collection.
//!
//! # Event translation
//!
//! | Input | Session input |
//! |---|---|
//! | primary pointer down on an item | `PointerDown` (also focuses the item) |
//! | pointer move / primary up | `PointerMove` / `PointerUp` |
//! | platform pointer cancel | `Cancel { PointerCanceled }` |
//! | Space or Enter | `Grab` the focused item, or `Drop` while keyboard-dragging |
//! | Up / Down | `Step { Previous / Next }` |
//! | Left / Right | `Step { PreviousContainer / NextContainer }` |
//! | Escape | `Cancel { EscapeKey }` |
//! | focus lost | `Cancel { Blur }` |
//! | Tab / Shift+Tab, Home / End (idle) | move keyboard focus |
//!
//! A release that yields `DropRequested` is carried through to the move
//! engine and the sync client within the same call, then the session is
//! settled. Input handling never fails: a drop that cannot be committed
//! becomes [`SurfaceEvent::DropFailed`] plus a user notification.

use ordo_core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, PointerButton, PointerEvent, PointerEventKind,
};
use ordo_drag::{
    AllowAll, CancelReason, DragContext, DragEffect, DragInput, DragSession, DragSource,
    DragState, DragTransition, DropMap, KeyStep, PermissionOracle,
};
use ordo_model::{ItemId, MoveResult, OrderedCollection, compute_move};
use ordo_sync::{
    CommitId, CommitOutcome, NotificationSink, OptimisticSyncClient, RemoteStore, Resolution,
    TransportError, WriteAck,
};

use crate::config::OrdoConfig;
use crate::{Error, Result};

/// Message shown to the user when a drop is refused before any write.
pub const DROP_FAILED_MESSAGE: &str = "Couldn't move the item. Nothing was changed.";

/// What one handled input amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The input does not concern this surface.
    Ignored,
    /// Keyboard focus moved.
    FocusMoved(Option<ItemId>),
    /// The drag session stepped.
    Transition(DragTransition),
    /// A drop was applied locally (and dispatched unless it was a no-op).
    Committed {
        transition: DragTransition,
        result: MoveResult,
        outcome: CommitOutcome,
    },
    /// A requested drop was refused locally; the collection is unchanged
    /// and the user has been notified.
    DropFailed {
        transition: DragTransition,
        reason: String,
    },
}

impl SurfaceEvent {
    /// Item clicked (pressed and released below the drag threshold).
    #[must_use]
    pub fn clicked(&self) -> Option<ItemId> {
        match self {
            Self::Transition(DragTransition {
                effect: DragEffect::Click { item },
                ..
            }) => Some(*item),
            _ => None,
        }
    }

    /// Drag session transition carried by this event, if any.
    #[must_use]
    pub fn transition(&self) -> Option<&DragTransition> {
        match self {
            Self::Transition(transition)
            | Self::Committed { transition, .. }
            | Self::DropFailed { transition, .. } => Some(transition),
            _ => None,
        }
    }
}

/// One reorder instance.
pub struct ReorderSurface<P, R, N> {
    collection: OrderedCollection<P>,
    session: DragSession,
    sync: OptimisticSyncClient<P>,
    drop_map: DropMap,
    permissions: Box<dyn PermissionOracle>,
    remote: R,
    notifications: N,
    focus: Option<ItemId>,
}

impl<P, R, N> std::fmt::Debug for ReorderSurface<P, R, N>
where
    P: std::fmt::Debug + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderSurface")
            .field("collection", &self.collection)
            .field("session", &self.session)
            .field("pending", &self.sync.pending_len())
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

impl<P, R, N> ReorderSurface<P, R, N>
where
    P: Clone,
    R: RemoteStore,
    N: NotificationSink,
{
    /// Build a surface with a validated configuration and an allow-all
    /// permission oracle.
    pub fn new(
        collection: OrderedCollection<P>,
        remote: R,
        notifications: N,
        config: &OrdoConfig,
    ) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            collection,
            session: DragSession::new(config.drag)?,
            sync: OptimisticSyncClient::new(config.sync)?,
            drop_map: DropMap::new(config.collision),
            permissions: Box::new(AllowAll),
            remote,
            notifications,
            focus: None,
        })
    }

    /// Replace the permission oracle.
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl PermissionOracle + 'static) -> Self {
        self.permissions = Box::new(permissions);
        self
    }

    #[must_use]
    pub fn collection(&self) -> &OrderedCollection<P> {
        &self.collection
    }

    #[must_use]
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    #[must_use]
    pub fn sync(&self) -> &OptimisticSyncClient<P> {
        &self.sync
    }

    #[must_use]
    pub fn drop_map(&self) -> &DropMap {
        &self.drop_map
    }

    /// Install the renderer's latest layout. The configured container
    /// strategy is kept.
    pub fn set_drop_map(&mut self, mut drop_map: DropMap) {
        drop_map.container_strategy = self.drop_map.container_strategy;
        self.drop_map = drop_map;
    }

    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    #[must_use]
    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    #[must_use]
    pub const fn focus(&self) -> Option<ItemId> {
        self.focus
    }

    /// Set keyboard focus. Unknown items clear it.
    pub fn set_focus(&mut self, item: Option<ItemId>) {
        self.focus = item.filter(|id| self.collection.item(*id).is_some());
    }

    /// Translate and handle one canonical input event.
    pub fn handle(&mut self, event: &Event) -> SurfaceEvent {
        match event {
            Event::Pointer(pointer) => self.handle_pointer(pointer),
            Event::Key(key) => self.handle_key(key),
            Event::Focus(false) => self.apply_input(DragInput::Cancel {
                reason: CancelReason::Blur,
            }),
            Event::Focus(true) => SurfaceEvent::Ignored,
        }
    }

    /// Feed a session input directly.
    ///
    /// A requested drop that cannot be committed (the move no longer applies
    /// or too many writes are outstanding) snaps back: nothing is applied,
    /// the session settles, and the notification sink is told.
    pub fn apply_input(&mut self, input: DragInput) -> SurfaceEvent {
        let ctx = DragContext::new(&self.drop_map, &self.collection, self.permissions.as_ref());
        let transition = self.session.apply(input, &ctx);
        let DragEffect::DropRequested { item, target } = transition.effect else {
            return SurfaceEvent::Transition(transition);
        };

        let committed = compute_move(&self.collection, item, target)
            .map_err(Error::from)
            .and_then(|result| {
                self.sync
                    .commit(&mut self.collection, &result, &mut self.remote)
                    .map(|outcome| (result, outcome))
                    .map_err(Error::from)
            });
        // The gesture is over either way.
        self.session.settle();
        self.focus = Some(item);
        match committed {
            Ok((result, outcome)) => {
                tracing::debug!(
                    target: "ordo.surface",
                    item = %item,
                    to = ?result.to,
                    outcome = ?outcome,
                    "drop committed"
                );
                SurfaceEvent::Committed {
                    transition,
                    result,
                    outcome,
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: "ordo.surface",
                    item = %item,
                    %error,
                    "drop could not be committed"
                );
                self.notifications.notify_failure(DROP_FAILED_MESSAGE);
                SurfaceEvent::DropFailed {
                    transition,
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Deliver a remote response for a dispatched commit.
    pub fn acknowledge(
        &mut self,
        commit: CommitId,
        outcome: std::result::Result<WriteAck, TransportError>,
    ) -> Resolution {
        let resolution =
            self.sync
                .acknowledge(&mut self.collection, commit, outcome, &mut self.notifications);
        if matches!(resolution, Resolution::RolledBack { .. }) {
            // A rollback may have moved the focused item; keep focus valid.
            self.set_focus(self.focus);
        }
        resolution
    }

    /// Abort any gesture in progress (teardown, route change).
    pub fn force_cancel(&mut self) -> Option<DragTransition> {
        self.session.force_cancel()
    }

    fn handle_pointer(&mut self, pointer: &PointerEvent) -> SurfaceEvent {
        let input = match pointer.kind {
            PointerEventKind::Down(PointerButton::Primary) => {
                let Some((_, item)) = self.drop_map.hit_item(pointer.position) else {
                    return SurfaceEvent::Ignored;
                };
                if !self.session.is_active() {
                    self.focus = Some(item);
                }
                DragInput::PointerDown {
                    item,
                    pointer_id: pointer.pointer_id,
                    position: pointer.position,
                }
            }
            PointerEventKind::Down(_) => return SurfaceEvent::Ignored,
            PointerEventKind::Move if !self.session.is_active() => {
                return SurfaceEvent::Ignored;
            }
            PointerEventKind::Move => DragInput::PointerMove {
                pointer_id: pointer.pointer_id,
                position: pointer.position,
            },
            PointerEventKind::Up(PointerButton::Primary) => DragInput::PointerUp {
                pointer_id: pointer.pointer_id,
                position: pointer.position,
            },
            PointerEventKind::Up(_) => return SurfaceEvent::Ignored,
            PointerEventKind::Cancel => DragInput::Cancel {
                reason: CancelReason::PointerCanceled,
            },
        };
        self.apply_input(input)
    }

    fn handle_key(&mut self, key: &KeyEvent) -> SurfaceEvent {
        if key.kind == KeyEventKind::Release {
            return SurfaceEvent::Ignored;
        }
        let keyboard_drag = matches!(
            self.session.state(),
            DragState::Dragging {
                source: DragSource::Keyboard,
                ..
            }
        );
        let input = match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                if keyboard_drag {
                    DragInput::Drop
                } else if let Some(item) = self.focus {
                    DragInput::Grab { item }
                } else {
                    return SurfaceEvent::Ignored;
                }
            }
            KeyCode::Escape if self.session.is_active() => DragInput::Cancel {
                reason: CancelReason::EscapeKey,
            },
            KeyCode::Up if keyboard_drag => DragInput::Step {
                step: KeyStep::Previous,
            },
            KeyCode::Down if keyboard_drag => DragInput::Step {
                step: KeyStep::Next,
            },
            KeyCode::Left if keyboard_drag => DragInput::Step {
                step: KeyStep::PreviousContainer,
            },
            KeyCode::Right if keyboard_drag => DragInput::Step {
                step: KeyStep::NextContainer,
            },
            KeyCode::Tab | KeyCode::Home | KeyCode::End if !self.session.is_active() => {
                return self.move_focus(key);
            }
            _ => return SurfaceEvent::Ignored,
        };
        self.apply_input(input)
    }

    /// Focus traversal over items in container order.
    fn move_focus(&mut self, key: &KeyEvent) -> SurfaceEvent {
        let order: Vec<ItemId> = self
            .collection
            .containers()
            .iter()
            .flat_map(|container| container.items().iter().copied())
            .collect();
        if order.is_empty() {
            return SurfaceEvent::Ignored;
        }
        let current = self
            .focus
            .and_then(|item| order.iter().position(|id| *id == item));
        let last = order.len() - 1;
        let next = match (key.code, current) {
            (KeyCode::Home, _) => 0,
            (KeyCode::End, _) => last,
            (_, None) if key.shift() => last,
            (_, None) => 0,
            (_, Some(index)) if key.shift() => index.saturating_sub(1),
            (_, Some(index)) => (index + 1).min(last),
        };
        self.focus = Some(order[next]);
        SurfaceEvent::FocusMoved(self.focus)
    }
}
