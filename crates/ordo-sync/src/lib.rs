#![forbid(unsafe_code)]

//! Optimistic synchronization of moves with a remote store.
//!
//! # Role in ordo
//! A move computed by `ordo-model` is applied locally at once by
//! [`OptimisticSyncClient::commit`] and sent to a [`RemoteStore`]. When the
//! store answers, [`OptimisticSyncClient::acknowledge`] either confirms the
//! commit (optionally adopting the server's order) or rolls the collection
//! back to that commit's snapshot and tells a [`NotificationSink`].
//!
//! There is no async runtime here. Dispatch is fire-and-forget and the host
//! event loop feeds responses back whenever they arrive.

pub mod client;
pub mod remote;

pub use client::{
    CommitOutcome, NotificationLog, NotificationSink, OptimisticSyncClient, PendingCommit,
    ROLLBACK_MESSAGE, Resolution, SyncConfig, SyncError,
};
pub use remote::{
    CommitId, MemoryRemote, PositionWriteRequest, RemoteStore, TransportError, WriteAck,
    WriteOutcome,
};
