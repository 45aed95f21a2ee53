#![forbid(unsafe_code)]

//! Ordered collections and the move engine.
//!
//! # Role in ordo
//! `ordo-model` owns the data that drag gestures rearrange: containers
//! holding dense, zero-based item positions ([`OrderedCollection`]) and the
//! pure function that turns "move this item there" into new container
//! sequences plus a minimal position diff ([`compute_move`]).
//!
//! Nothing here knows about pointers, rectangles, or the network. Drag
//! sessions (`ordo-drag`) decide *where* an item goes; the sync client
//! (`ordo-sync`) decides *when* the result is kept.

pub mod collection;
pub mod engine;
pub mod ids;

pub use collection::{
    CollectionError, CollectionView, Container, InvariantCode, InvariantIssue, InvariantReport,
    Item, ItemRecord, OrderedCollection,
};
pub use engine::{
    ContainerSequence, InsertAt, MoveError, MoveResult, MoveTarget, Placement, PositionAssignment,
    compute_move,
};
pub use ids::{ContainerId, ContainerKind, ItemId, Slot};
