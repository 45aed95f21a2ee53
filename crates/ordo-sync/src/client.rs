#![forbid(unsafe_code)]

//! Optimistic commit with snapshot rollback.
//!
//! [`OptimisticSyncClient::commit`] applies a move to the local collection
//! immediately and dispatches its diff. Each dispatched commit becomes a
//! [`PendingCommit`] holding an `Arc` snapshot of the collection as it was
//! just before that commit was applied, plus the move intent (item and final
//! slot) so it can be replayed.
//!
//! # Commit protocol
//!
//! ```text
//! commit ──► Pending ──ack ok──► Confirmed ──(nothing pending below)──► dropped
//!               │
//!               └──ack failed──► rolled back, removed
//! ```
//!
//! Commits form a stack in dispatch order. Acknowledgements may arrive in any
//! order:
//!
//! - Success marks the entry confirmed. Confirmed entries are dropped once no
//!   pending entry sits below them; until then their intent is still needed
//!   for replay. When the ack carries the server's order for entry `k`, the
//!   state right after `k` is rebuilt from `k`'s snapshot with that order
//!   adopted, and the entries above `k` are replayed on top, so a late ack
//!   never undoes later moves.
//! - Failure of entry `k` restores `k`'s snapshot, then replays the intents of
//!   every entry above `k` in dispatch order, refreshing their snapshots as it
//!   goes. Entry `k` is removed and the notification sink is told.
//!
//! A later successful commit therefore survives an earlier commit's
//! late-arriving failure, and a rollback never resurrects state the user has
//! since moved on from.

use std::fmt;
use std::sync::Arc;

use ordo_model::{
    CollectionError, ContainerId, ItemId, MoveResult, MoveTarget, OrderedCollection,
    PositionAssignment, compute_move,
};
use serde::{Deserialize, Serialize};

use crate::remote::{CommitId, PositionWriteRequest, RemoteStore, TransportError, WriteAck};

/// Message shown to the user when a commit is rolled back.
pub const ROLLBACK_MESSAGE: &str = "Couldn't save the new order. Your change was undone.";

/// Sync client policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Skip the network call when a move changes nothing.
    pub skip_noop_writes: bool,
    /// Apply the server's returned order on success when it sends one.
    pub adopt_server_order: bool,
    /// Maximum number of unresolved commits kept for rollback.
    pub max_pending: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            skip_noop_writes: true,
            adopt_server_order: true,
            max_pending: 64,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_pending == 0 {
            return Err(SyncError::InvalidConfig(
                "max_pending must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of [`OptimisticSyncClient::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Empty diff; nothing applied or sent.
    Skipped,
    /// Applied locally and sent.
    Dispatched(CommitId),
}

/// Result of [`OptimisticSyncClient::acknowledge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed {
        commit: CommitId,
        /// Whether the server's order was applied locally.
        adopted: bool,
    },
    RolledBack {
        commit: CommitId,
        /// Later commits re-applied on top of the restored snapshot.
        replayed: usize,
        /// Later commits whose intent no longer applied.
        skipped: usize,
    },
    /// No pending commit with this id (late or duplicate ack).
    Unknown(CommitId),
}

/// Sync client errors. Remote failures never surface here; they resolve as
/// [`Resolution::RolledBack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The move result could not be applied locally.
    Apply(CollectionError),
    /// Too many unresolved commits.
    TooManyPending { limit: usize },
    InvalidConfig(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply(error) => write!(f, "cannot apply move locally: {error}"),
            Self::TooManyPending { limit } => {
                write!(f, "too many unresolved commits (limit {limit})")
            }
            Self::InvalidConfig(message) => write!(f, "invalid sync config: {message}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Apply(error) => Some(error),
            _ => None,
        }
    }
}

/// Receives a human-readable message whenever a rollback happens.
pub trait NotificationSink {
    fn notify_failure(&mut self, message: &str);
}

impl<F> NotificationSink for F
where
    F: FnMut(&str),
{
    fn notify_failure(&mut self, message: &str) {
        self(message);
    }
}

/// Sink that keeps every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationLog {
    messages: Vec<String>,
}

impl NotificationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl NotificationSink for NotificationLog {
    fn notify_failure(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitStatus {
    Pending,
    Confirmed,
}

/// One dispatched, not yet discarded commit.
#[derive(Debug, Clone)]
pub struct PendingCommit<P> {
    id: CommitId,
    snapshot: Arc<OrderedCollection<P>>,
    item: ItemId,
    target: MoveTarget,
    containers: Vec<ContainerId>,
    server_order: Option<Vec<PositionAssignment>>,
    status: CommitStatus,
}

impl<P> PendingCommit<P> {
    #[must_use]
    pub const fn id(&self) -> CommitId {
        self.id
    }

    /// Collection as it was just before this commit applied.
    #[must_use]
    pub fn snapshot(&self) -> &OrderedCollection<P> {
        &self.snapshot
    }

    #[must_use]
    pub const fn item(&self) -> ItemId {
        self.item
    }

    #[must_use]
    pub const fn target(&self) -> MoveTarget {
        self.target
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == CommitStatus::Confirmed
    }
}

/// Optimistic commit/rollback coordinator for one collection.
#[derive(Debug, Clone)]
pub struct OptimisticSyncClient<P> {
    config: SyncConfig,
    stack: Vec<PendingCommit<P>>,
    next_commit: u64,
}

impl<P> Default for OptimisticSyncClient<P> {
    fn default() -> Self {
        Self {
            config: SyncConfig::default(),
            stack: Vec::new(),
            next_commit: 1,
        }
    }
}

impl<P: Clone> OptimisticSyncClient<P> {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    #[must_use]
    pub const fn config(&self) -> SyncConfig {
        self.config
    }

    /// Number of commits still awaiting an ack.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.stack
            .iter()
            .filter(|entry| entry.status == CommitStatus::Pending)
            .count()
    }

    /// Ids of commits still awaiting an ack, in dispatch order.
    #[must_use]
    pub fn pending_commits(&self) -> Vec<CommitId> {
        self.stack
            .iter()
            .filter(|entry| entry.status == CommitStatus::Pending)
            .map(|entry| entry.id)
            .collect()
    }

    /// Whether an unacknowledged commit touches `container`.
    #[must_use]
    pub fn has_pending(&self, container: ContainerId) -> bool {
        self.stack.iter().any(|entry| {
            entry.status == CommitStatus::Pending && entry.containers.contains(&container)
        })
    }

    /// Retained commits (pending, plus confirmed ones still needed for
    /// replay), in dispatch order.
    #[must_use]
    pub fn retained(&self) -> &[PendingCommit<P>] {
        &self.stack
    }

    /// Apply `result` locally and dispatch its diff.
    ///
    /// The snapshot is taken from the current, possibly already optimistic,
    /// state. On error nothing is applied or sent.
    pub fn commit(
        &mut self,
        collection: &mut OrderedCollection<P>,
        result: &MoveResult,
        store: &mut dyn RemoteStore,
    ) -> Result<CommitOutcome, SyncError> {
        if result.is_noop() && self.config.skip_noop_writes {
            tracing::debug!(target: "ordo.sync", item = %result.item, "skipping no-op write");
            return Ok(CommitOutcome::Skipped);
        }
        if self.pending_len() >= self.config.max_pending {
            return Err(SyncError::TooManyPending {
                limit: self.config.max_pending,
            });
        }

        let snapshot = Arc::new(collection.clone());
        collection.apply(result).map_err(SyncError::Apply)?;

        let id = CommitId::new(self.next_commit);
        self.next_commit = self.next_commit.saturating_add(1);
        self.stack.push(PendingCommit {
            id,
            snapshot,
            item: result.item,
            target: MoveTarget::at(result.to.container, result.to.index),
            containers: result.containers().collect(),
            server_order: None,
            status: CommitStatus::Pending,
        });

        let request = PositionWriteRequest {
            commit: id,
            items: result.changes.clone(),
        };
        tracing::debug!(
            target: "ordo.sync",
            commit = %id,
            item = %result.item,
            changes = request.items.len(),
            pending = self.pending_len(),
            "dispatching position write"
        );
        store.dispatch(&request);
        Ok(CommitOutcome::Dispatched(id))
    }

    /// Resolve a commit with its eventual outcome.
    pub fn acknowledge(
        &mut self,
        collection: &mut OrderedCollection<P>,
        commit: CommitId,
        outcome: Result<WriteAck, TransportError>,
        sink: &mut dyn NotificationSink,
    ) -> Resolution {
        let Some(index) = self
            .stack
            .iter()
            .position(|entry| entry.id == commit && entry.status == CommitStatus::Pending)
        else {
            tracing::debug!(target: "ordo.sync", commit = %commit, "ack for unknown commit");
            return Resolution::Unknown(commit);
        };

        let resolution = match outcome {
            Ok(ack) if ack.success => self.confirm(collection, index, ack.items.as_deref()),
            Ok(_) => self.roll_back(collection, index, "rejected by server", sink),
            Err(error) => self.roll_back(collection, index, &error.to_string(), sink),
        };
        self.prune();
        resolution
    }

    fn confirm(
        &mut self,
        collection: &mut OrderedCollection<P>,
        index: usize,
        server_order: Option<&[PositionAssignment]>,
    ) -> Resolution {
        let commit = self.stack[index].id;
        self.stack[index].status = CommitStatus::Confirmed;

        let mut adopted = false;
        if let Some(assignments) = server_order.filter(|_| self.config.adopt_server_order) {
            // The server's order describes the state right after this commit,
            // so it is adopted there and later commits are replayed on top.
            let mut rebuilt = self.stack[index].snapshot.as_ref().clone();
            let entry = &self.stack[index];
            let fitted = apply_intent(&mut rebuilt, entry.item, entry.target).and_then(|()| {
                rebuilt
                    .apply_assignments(assignments)
                    .map_err(|error| error.to_string())
            });
            match fitted {
                Ok(()) => {
                    adopted = true;
                    self.stack[index].server_order = Some(assignments.to_vec());
                    let (replayed, skipped) = self.replay_from(&mut rebuilt, index + 1);
                    *collection = rebuilt;
                    tracing::debug!(
                        target: "ordo.sync",
                        commit = %commit,
                        replayed,
                        skipped,
                        "server order adopted"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        target: "ordo.sync",
                        commit = %commit,
                        %error,
                        "ignoring server order that does not fit local state"
                    );
                }
            }
        }

        tracing::info!(target: "ordo.sync", commit = %commit, adopted, "commit confirmed");
        Resolution::Confirmed { commit, adopted }
    }

    fn roll_back(
        &mut self,
        collection: &mut OrderedCollection<P>,
        index: usize,
        reason: &str,
        sink: &mut dyn NotificationSink,
    ) -> Resolution {
        let failed = self.stack.remove(index);
        *collection = failed.snapshot.as_ref().clone();
        let (replayed, skipped) = self.replay_from(collection, index);

        tracing::warn!(
            target: "ordo.sync",
            commit = %failed.id,
            item = %failed.item,
            reason,
            replayed,
            skipped,
            "commit failed; rolled back"
        );
        sink.notify_failure(ROLLBACK_MESSAGE);
        Resolution::RolledBack {
            commit: failed.id,
            replayed,
            skipped,
        }
    }

    /// Re-apply the intents of every entry from `start` upwards on top of
    /// `collection`, refreshing their snapshots. Adopted server order is
    /// re-applied after its entry's intent.
    ///
    /// Returns `(replayed, skipped)`.
    fn replay_from(
        &mut self,
        collection: &mut OrderedCollection<P>,
        start: usize,
    ) -> (usize, usize) {
        let mut replayed = 0;
        let mut skipped = 0;
        for entry in &mut self.stack[start..] {
            entry.snapshot = Arc::new(collection.clone());
            match apply_intent(collection, entry.item, entry.target) {
                Ok(()) => {
                    replayed += 1;
                    if let Some(assignments) = &entry.server_order {
                        if let Err(error) = collection.apply_assignments(assignments) {
                            tracing::debug!(
                                target: "ordo.sync",
                                commit = %entry.id,
                                %error,
                                "server order no longer fits after replay"
                            );
                        }
                    }
                }
                Err(error) => {
                    skipped += 1;
                    tracing::debug!(
                        target: "ordo.sync",
                        commit = %entry.id,
                        %error,
                        "later commit no longer applies after replay"
                    );
                }
            }
        }
        (replayed, skipped)
    }

    /// Drop confirmed commits that no pending commit sits below.
    fn prune(&mut self) {
        let keep_from = self
            .stack
            .iter()
            .position(|entry| entry.status == CommitStatus::Pending)
            .unwrap_or(self.stack.len());
        self.stack.drain(..keep_from);
    }
}

/// Recompute and apply a recorded move intent.
fn apply_intent<P: Clone>(
    collection: &mut OrderedCollection<P>,
    item: ItemId,
    target: MoveTarget,
) -> Result<(), String> {
    let result = compute_move(collection, item, target).map_err(|error| error.to_string())?;
    collection.apply(&result).map_err(|error| error.to_string())
}
