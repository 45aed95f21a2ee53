#![forbid(unsafe_code)]

//! ordo public facade crate.
//!
//! Re-exports the types hosts need from the internal crates and provides
//! [`ReorderSurface`], which wires a drag session, the move engine and the
//! optimistic sync client around one [`OrderedCollection`].

use std::fmt;

pub mod config;
pub mod surface;

// --- Core re-exports -------------------------------------------------------

pub use ordo_core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, Modifiers, PointerButton, PointerEvent,
    PointerEventKind,
};
pub use ordo_core::geometry::{Axis, Point, Rect};

// --- Model re-exports ------------------------------------------------------

pub use ordo_model::{
    CollectionError, CollectionView, ContainerId, ContainerKind, InsertAt, InvariantReport,
    ItemId, ItemRecord, MoveError, MoveResult, MoveTarget, OrderedCollection, Placement,
    PositionAssignment, Slot, compute_move,
};

// --- Drag re-exports -------------------------------------------------------

pub use ordo_drag::{
    AllowAll, CancelReason, CollisionResolver, CollisionStrategy, DragConfig, DragConfigError,
    DragEffect, DragInput, DragSession, DragState, DragTransition, DropMap, DropTargetId,
    DropZone, KeyStep, PermissionOracle, Subject,
};

// --- Sync re-exports -------------------------------------------------------

pub use ordo_sync::{
    CommitId, CommitOutcome, MemoryRemote, NotificationLog, NotificationSink,
    OptimisticSyncClient, RemoteStore, Resolution, SyncConfig, SyncError, TransportError,
    WriteAck,
};

// --- Facade ----------------------------------------------------------------

pub use config::{ConfigError, OrdoConfig};
pub use surface::{DROP_FAILED_MESSAGE, ReorderSurface, SurfaceEvent};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for ordo hosts.
#[derive(Debug)]
pub enum Error {
    /// Configuration could not be loaded or failed validation.
    Config(ConfigError),
    /// Drag tuning rejected.
    DragConfig(DragConfigError),
    /// Move target names something that does not exist.
    Move(MoveError),
    /// Local apply failed or too many writes are outstanding.
    Sync(SyncError),
    /// Collection construction or mutation failed.
    Collection(CollectionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::DragConfig(err) => write!(f, "{err}"),
            Self::Move(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Collection(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::DragConfig(err) => Some(err),
            Self::Move(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Collection(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<DragConfigError> for Error {
    fn from(err: DragConfigError) -> Self {
        Self::DragConfig(err)
    }
}

impl From<MoveError> for Error {
    fn from(err: MoveError) -> Self {
        Self::Move(err)
    }
}

impl From<SyncError> for Error {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl From<CollectionError> for Error {
    fn from(err: CollectionError) -> Self {
        Self::Collection(err)
    }
}

/// Standard result type for ordo APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Install the JSON `tracing` subscriber (filter from `RUST_LOG`).
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_logging() -> bool {
    ordo_core::logging::init_json_subscriber()
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ContainerId, ContainerKind, DragEffect, DropMap, DropZone, Error, Event, ItemId,
        MoveTarget, OrderedCollection, OrdoConfig, Point, Rect, ReorderSurface, Resolution,
        Result, SurfaceEvent,
    };

    pub use crate::{core, drag, model, sync};
}

pub use ordo_core as core;
pub use ordo_drag as drag;
pub use ordo_model as model;
pub use ordo_sync as sync;
