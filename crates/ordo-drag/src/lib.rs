#![forbid(unsafe_code)]

//! Drag targeting and the drag session state machine.
//!
//! # Role in ordo
//! `ordo-drag` turns raw gesture input into intent. [`collision`] answers
//! "which slot is the pointer over?" and [`session`] sequences presses,
//! moves, releases and keyboard steps into a single
//! [`DragEffect::DropRequested`] (or a click, rejection or cancel).
//!
//! Neither module mutates an [`ordo_model::OrderedCollection`]; both read it
//! through [`ordo_model::CollectionView`].

pub mod collision;
pub mod session;

pub use collision::{
    Candidate, Collision, CollisionResolver, CollisionStrategy, DropMap, DropResolution,
    DropTargetId, DropZone, ItemZone,
};
pub use session::{
    AllowAll, CancelReason, DEFAULT_DRAG_THRESHOLD, DragConfig, DragConfigError, DragContext,
    DragEffect, DragFeedback, DragInput, DragSession, DragSource, DragState, DragTransition,
    KeyStep, NoopReason, PermissionOracle, Subject,
};
