#![forbid(unsafe_code)]

//! Remote write protocol.
//!
//! A commit is sent as one [`PositionWriteRequest`] carrying the ordered
//! position diff. The store answers later with a [`WriteAck`] or a
//! [`TransportError`]; a non-success ack and a transport failure are handled
//! identically by the sync client.
//!
//! ```json
//! { "commit": 3, "items": [ { "id": 7, "position": 0, "containerId": 2 } ] }
//! { "success": true, "items": [ { "id": 7, "position": 0, "containerId": 2 } ] }
//! ```
//!
//! [`RemoteStore::dispatch`] is fire-and-forget: it must not block and has no
//! return value. The host event loop delivers the eventual outcome through
//! `OptimisticSyncClient::acknowledge`, in whatever order responses arrive.

use std::collections::VecDeque;
use std::fmt;

use ordo_model::PositionAssignment;
use serde::{Deserialize, Serialize};

/// Identifier of one dispatched commit, unique per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(u64);

impl CommitId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit#{}", self.0)
    }
}

/// Batched position write for one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionWriteRequest {
    pub commit: CommitId,
    /// Every item whose container or position changed, in diff order.
    pub items: Vec<PositionAssignment>,
}

impl PositionWriteRequest {
    /// Serialize to the JSON wire body.
    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|error| TransportError::Decode(error.to_string()))
    }
}

/// Store response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAck {
    pub success: bool,
    /// Authoritative order as normalized by the server, when it sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<PositionAssignment>>,
}

impl WriteAck {
    /// Plain success with no server order.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            items: None,
        }
    }

    /// Success carrying the server's order.
    #[must_use]
    pub fn authoritative(items: Vec<PositionAssignment>) -> Self {
        Self {
            success: true,
            items: Some(items),
        }
    }

    /// Explicit rejection.
    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            success: false,
            items: None,
        }
    }

    /// Parse a JSON response body.
    pub fn from_json(body: &str) -> Result<Self, TransportError> {
        serde_json::from_str(body).map_err(|error| TransportError::Decode(error.to_string()))
    }
}

/// Why a write never produced a usable ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection-level failure.
    Network(String),
    /// Non-2xx HTTP status.
    Status(u16),
    Timeout,
    /// Body could not be (de)serialized.
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Status(status) => write!(f, "server responded with status {status}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Decode(message) => write!(f, "malformed body: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outcome of one write as delivered to the sync client.
pub type WriteOutcome = Result<WriteAck, TransportError>;

/// Fire-and-forget sink for position writes.
pub trait RemoteStore {
    fn dispatch(&mut self, request: &PositionWriteRequest);
}

/// In-memory store for offline use and tests.
///
/// Records every request and answers it with the next scripted outcome
/// (plain success once the script runs dry). Responses are held until the
/// host takes them, so delivery order is under the caller's control.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    requests: Vec<PositionWriteRequest>,
    script: VecDeque<WriteOutcome>,
    inflight: VecDeque<(CommitId, WriteOutcome)>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next dispatched request.
    pub fn script(&mut self, outcome: WriteOutcome) -> &mut Self {
        self.script.push_back(outcome);
        self
    }

    /// Queue a transport failure for the next dispatched request.
    pub fn fail_next(&mut self, error: TransportError) -> &mut Self {
        self.script(Err(error))
    }

    /// Every request received so far, in dispatch order.
    #[must_use]
    pub fn requests(&self) -> &[PositionWriteRequest] {
        &self.requests
    }

    /// Number of responses not yet taken.
    #[must_use]
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// Take the oldest undelivered response.
    pub fn next_response(&mut self) -> Option<(CommitId, WriteOutcome)> {
        self.inflight.pop_front()
    }

    /// Take the response for a specific commit, leaving the others queued.
    pub fn take_response(&mut self, commit: CommitId) -> Option<WriteOutcome> {
        let index = self.inflight.iter().position(|(id, _)| *id == commit)?;
        self.inflight.remove(index).map(|(_, outcome)| outcome)
    }

    /// Take every undelivered response in dispatch order.
    pub fn drain_responses(&mut self) -> Vec<(CommitId, WriteOutcome)> {
        self.inflight.drain(..).collect()
    }
}

impl RemoteStore for MemoryRemote {
    fn dispatch(&mut self, request: &PositionWriteRequest) {
        let outcome = self.script.pop_front().unwrap_or_else(|| Ok(WriteAck::ok()));
        tracing::trace!(
            target: "ordo.sync",
            commit = %request.commit,
            items = request.items.len(),
            ok = matches!(outcome, Ok(WriteAck { success: true, .. })),
            "memory remote received write"
        );
        self.requests.push(request.clone());
        self.inflight.push_back((request.commit, outcome));
    }
}
