#![forbid(unsafe_code)]

//! Ordered containers of items with dense positions.
//!
//! [`OrderedCollection`] is the single source of truth for order. Each
//! container holds a sequence of [`ItemId`]s and every [`Item`] records its
//! owning container and zero-based `position`.
//!
//! # Invariants
//!
//! 1. Within a container, positions are exactly `0..len` and equal each
//!    item's index in the container sequence.
//! 2. Every item belongs to exactly one container.
//! 3. Reorders and relocations never create, destroy, or duplicate items.
//!
//! The mutation primitives ([`apply`](OrderedCollection::apply) and
//! [`apply_assignments`](OrderedCollection::apply_assignments)) validate the
//! whole request before writing, so a rejected request leaves the collection
//! untouched.
//!
//! Containers and items are created by external collaborators through the
//! ingest methods ([`from_records`](OrderedCollection::from_records),
//! [`push_item`](OrderedCollection::push_item),
//! [`remove_item`](OrderedCollection::remove_item)); the move engine only ever
//! reassigns container membership and order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{MoveResult, PositionAssignment};
use crate::ids::{ContainerId, ContainerKind, ItemId, Slot};

/// An ordered grouping of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    id: ContainerId,
    kind: ContainerKind,
    items: Vec<ItemId>,
}

impl Container {
    #[must_use]
    pub const fn id(&self) -> ContainerId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Item ids in position order.
    #[must_use]
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single orderable entity with an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<P> {
    id: ItemId,
    container: ContainerId,
    position: usize,
    payload: P,
}

impl<P> Item<P> {
    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub const fn container(&self) -> ContainerId {
        self.container
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        Slot::new(self.container, self.position)
    }

    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Mutable payload access for collaborators editing item fields.
    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }
}

/// Item as delivered by the backing store, before normalization.
///
/// `position` may be sparse or unsorted; ingest sorts by it (ties keep
/// delivery order) and renumbers densely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord<P> {
    pub id: ItemId,
    pub container_id: ContainerId,
    pub position: u64,
    pub payload: P,
}

/// Read-only ordering queries.
///
/// Lets drag sessions navigate slots (keyboard path) without owning or
/// knowing the payload type of the collection.
pub trait CollectionView {
    /// Container ids in traversal order.
    fn container_ids(&self) -> Vec<ContainerId>;

    /// Number of items in a container, `None` if the container is unknown.
    fn container_len(&self, container: ContainerId) -> Option<usize>;

    /// Current slot of an item.
    fn locate(&self, item: ItemId) -> Option<Slot>;

    /// Item at a given slot.
    fn item_at(&self, slot: Slot) -> Option<ItemId>;
}

/// Containers and their items with dense positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedCollection<P> {
    containers: Vec<Container>,
    container_index: BTreeMap<ContainerId, usize>,
    items: BTreeMap<ItemId, Item<P>>,
}

impl<P> Default for OrderedCollection<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> OrderedCollection<P> {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: Vec::new(),
            container_index: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    /// Build a collection from store records.
    ///
    /// Containers keep the given traversal order. Item positions are
    /// normalized per container.
    pub fn from_records(
        containers: impl IntoIterator<Item = (ContainerId, ContainerKind)>,
        records: impl IntoIterator<Item = ItemRecord<P>>,
    ) -> Result<Self, CollectionError> {
        let mut collection = Self::new();
        for (id, kind) in containers {
            collection.insert_container(id, kind)?;
        }

        let mut staged: BTreeMap<ContainerId, Vec<(u64, usize, ItemId)>> = BTreeMap::new();
        for (arrival, record) in records.into_iter().enumerate() {
            if !collection.container_index.contains_key(&record.container_id) {
                return Err(CollectionError::UnknownContainer(record.container_id));
            }
            if collection.items.contains_key(&record.id) {
                return Err(CollectionError::DuplicateItem(record.id));
            }
            staged
                .entry(record.container_id)
                .or_default()
                .push((record.position, arrival, record.id));
            collection.items.insert(
                record.id,
                Item {
                    id: record.id,
                    container: record.container_id,
                    position: 0,
                    payload: record.payload,
                },
            );
        }

        for (container, mut rows) in staged {
            rows.sort_by_key(|&(position, arrival, _)| (position, arrival));
            let sequence = rows.into_iter().map(|(_, _, id)| id).collect();
            collection.write_sequence(container, sequence);
        }
        Ok(collection)
    }

    /// Register an empty container at the end of the traversal order.
    pub fn insert_container(
        &mut self,
        id: ContainerId,
        kind: ContainerKind,
    ) -> Result<(), CollectionError> {
        if self.container_index.contains_key(&id) {
            return Err(CollectionError::DuplicateContainer(id));
        }
        self.container_index.insert(id, self.containers.len());
        self.containers.push(Container {
            id,
            kind,
            items: Vec::new(),
        });
        Ok(())
    }

    /// Append a new item to the end of a container.
    pub fn push_item(
        &mut self,
        container: ContainerId,
        id: ItemId,
        payload: P,
    ) -> Result<usize, CollectionError> {
        if self.items.contains_key(&id) {
            return Err(CollectionError::DuplicateItem(id));
        }
        let index = *self
            .container_index
            .get(&container)
            .ok_or(CollectionError::UnknownContainer(container))?;
        let position = self.containers[index].items.len();
        self.containers[index].items.push(id);
        self.items.insert(
            id,
            Item {
                id,
                container,
                position,
                payload,
            },
        );
        Ok(position)
    }

    /// Remove an item and close the gap it leaves.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Item<P>, CollectionError> {
        let item = self
            .items
            .remove(&id)
            .ok_or(CollectionError::UnknownItem(id))?;
        let mut sequence = self.items_of(item.container).unwrap_or_default().to_vec();
        sequence.retain(|candidate| *candidate != id);
        self.write_sequence(item.container, sequence);
        Ok(item)
    }

    /// Containers in traversal order.
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.container_index
            .get(&id)
            .map(|&index| &self.containers[index])
    }

    /// Item ids of a container in position order.
    #[must_use]
    pub fn items_of(&self, id: ContainerId) -> Option<&[ItemId]> {
        self.container(id).map(Container::items)
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item<P>> {
        self.items.get(&id)
    }

    #[must_use]
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item<P>> {
        self.items.get_mut(&id)
    }

    /// Iterate items of a container in position order.
    pub fn iter_container(&self, id: ContainerId) -> impl Iterator<Item = &Item<P>> + '_ {
        self.items_of(id)
            .unwrap_or_default()
            .iter()
            .filter_map(|item| self.items.get(item))
    }

    /// Number of containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Total number of items across all containers.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Apply a move result computed by the move engine.
    ///
    /// Replaces the affected containers' sequences and renumbers positions.
    /// An empty result is a no-op.
    pub fn apply(&mut self, result: &MoveResult) -> Result<(), CollectionError> {
        if result.sequences.is_empty() {
            return Ok(());
        }
        let replacements: Vec<(ContainerId, Vec<ItemId>)> = result
            .sequences
            .iter()
            .map(|sequence| (sequence.container, sequence.items.clone()))
            .collect();
        self.replace_sequences(replacements)
    }

    /// Adopt authoritative `(item, container, position)` triples.
    ///
    /// Every container touched by an assignment (as old or new owner) is
    /// re-sorted by position, assigned items first on ties, and renumbered.
    pub fn apply_assignments(
        &mut self,
        assignments: &[PositionAssignment],
    ) -> Result<(), CollectionError> {
        if assignments.is_empty() {
            return Ok(());
        }

        let mut assigned: BTreeMap<ItemId, &PositionAssignment> = BTreeMap::new();
        let mut touched: BTreeSet<ContainerId> = BTreeSet::new();
        for assignment in assignments {
            let item = self
                .items
                .get(&assignment.id)
                .ok_or(CollectionError::UnknownItem(assignment.id))?;
            if !self.container_index.contains_key(&assignment.container_id) {
                return Err(CollectionError::UnknownContainer(assignment.container_id));
            }
            if assigned.insert(assignment.id, assignment).is_some() {
                return Err(CollectionError::DuplicateItem(assignment.id));
            }
            touched.insert(item.container);
            touched.insert(assignment.container_id);
        }

        let mut replacements = Vec::with_capacity(touched.len());
        for container in &self.containers {
            if !touched.contains(&container.id) {
                continue;
            }
            // (position, tie rank, previous index, id); assigned rows win ties.
            let mut rows: Vec<(usize, u8, usize, ItemId)> = container
                .items
                .iter()
                .enumerate()
                .filter(|(_, id)| !assigned.contains_key(id))
                .map(|(index, id)| (index, 1, index, *id))
                .collect();
            rows.extend(
                assigned
                    .values()
                    .filter(|assignment| assignment.container_id == container.id)
                    .map(|assignment| {
                        let previous = self
                            .items
                            .get(&assignment.id)
                            .map_or(usize::MAX, |item| item.position);
                        (assignment.position, 0, previous, assignment.id)
                    }),
            );
            rows.sort_unstable();
            replacements.push((container.id, rows.into_iter().map(|row| row.3).collect()));
        }
        self.replace_sequences(replacements)
    }

    /// Check the density and membership invariants.
    #[must_use]
    pub fn check_invariants(&self) -> InvariantReport {
        let mut issues = Vec::new();
        let mut seen: BTreeMap<ItemId, ContainerId> = BTreeMap::new();

        for container in &self.containers {
            for (index, id) in container.items.iter().enumerate() {
                if let Some(first) = seen.insert(*id, container.id) {
                    issues.push(InvariantIssue {
                        code: InvariantCode::DuplicateMembership,
                        container: Some(container.id),
                        item: Some(*id),
                        message: format!("{id} listed in both {first} and {}", container.id),
                    });
                }
                match self.items.get(id) {
                    None => issues.push(InvariantIssue {
                        code: InvariantCode::UnknownMember,
                        container: Some(container.id),
                        item: Some(*id),
                        message: format!("{} lists unknown {id}", container.id),
                    }),
                    Some(item) if item.container != container.id => {
                        issues.push(InvariantIssue {
                            code: InvariantCode::ContainerMismatch,
                            container: Some(container.id),
                            item: Some(*id),
                            message: format!(
                                "{id} is listed in {} but records {}",
                                container.id, item.container
                            ),
                        });
                    }
                    Some(item) if item.position != index => {
                        let code = if item.position > index {
                            InvariantCode::PositionGap
                        } else {
                            InvariantCode::PositionMismatch
                        };
                        issues.push(InvariantIssue {
                            code,
                            container: Some(container.id),
                            item: Some(*id),
                            message: format!(
                                "{id} at index {index} records position {}",
                                item.position
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for item in self.items.values() {
            if !seen.contains_key(&item.id) {
                issues.push(InvariantIssue {
                    code: InvariantCode::OrphanItem,
                    container: Some(item.container),
                    item: Some(item.id),
                    message: format!("{} is not listed by any container", item.id),
                });
            }
        }

        InvariantReport { issues }
    }

    /// Validate then write whole container sequences.
    fn replace_sequences(
        &mut self,
        replacements: Vec<(ContainerId, Vec<ItemId>)>,
    ) -> Result<(), CollectionError> {
        let mut containers = BTreeSet::new();
        let mut before = Vec::new();
        let mut after = Vec::new();
        for (container, sequence) in &replacements {
            if !containers.insert(*container) {
                return Err(CollectionError::DuplicateSequence(*container));
            }
            let current = self
                .items_of(*container)
                .ok_or(CollectionError::UnknownContainer(*container))?;
            before.extend_from_slice(current);
            after.extend_from_slice(sequence);
        }

        before.sort_unstable();
        after.sort_unstable();
        if let Some(pair) = after.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CollectionError::DuplicateItem(pair[0]));
        }
        if before != after {
            return Err(CollectionError::MembershipChanged {
                expected: before.len(),
                actual: after.len(),
            });
        }

        for (container, sequence) in replacements {
            tracing::trace!(
                target: "ordo.model",
                container = %container,
                len = sequence.len(),
                "sequence replaced"
            );
            self.write_sequence(container, sequence);
        }
        Ok(())
    }

    /// Store a sequence and renumber its items. Caller validated ids.
    fn write_sequence(&mut self, container: ContainerId, sequence: Vec<ItemId>) {
        for (position, id) in sequence.iter().enumerate() {
            if let Some(item) = self.items.get_mut(id) {
                item.container = container;
                item.position = position;
            }
        }
        if let Some(&index) = self.container_index.get(&container) {
            self.containers[index].items = sequence;
        }
    }
}

impl<P> CollectionView for OrderedCollection<P> {
    fn container_ids(&self) -> Vec<ContainerId> {
        self.containers.iter().map(Container::id).collect()
    }

    fn container_len(&self, container: ContainerId) -> Option<usize> {
        self.container(container).map(Container::len)
    }

    fn locate(&self, item: ItemId) -> Option<Slot> {
        self.items.get(&item).map(Item::slot)
    }

    fn item_at(&self, slot: Slot) -> Option<ItemId> {
        self.items_of(slot.container)
            .and_then(|items| items.get(slot.index))
            .copied()
    }
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    /// Recorded position is past the item's index (a hole precedes it).
    PositionGap,
    /// Recorded position is before the item's index (duplicate or shifted).
    PositionMismatch,
    /// Item listed by more than one container.
    DuplicateMembership,
    /// Container sequence names an item the collection does not hold.
    UnknownMember,
    /// Item records a different owner than the container listing it.
    ContainerMismatch,
    /// Item held by the collection but listed by no container.
    OrphanItem,
}

/// One invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub container: Option<ContainerId>,
    pub item: Option<ItemId>,
    pub message: String,
}

/// Structured invariant report over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvariantReport {
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    /// True when no invariant is violated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Findings with the given code.
    pub fn with_code(&self, code: InvariantCode) -> impl Iterator<Item = &InvariantIssue> + '_ {
        self.issues.iter().filter(move |issue| issue.code == code)
    }
}

/// Rejected collection mutation or ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    UnknownContainer(ContainerId),
    UnknownItem(ItemId),
    DuplicateContainer(ContainerId),
    DuplicateItem(ItemId),
    /// The same container appears twice in one replacement request.
    DuplicateSequence(ContainerId),
    /// Replacement sequences do not hold exactly the items they replace.
    MembershipChanged { expected: usize, actual: usize },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownContainer(id) => write!(f, "unknown {id}"),
            Self::UnknownItem(id) => write!(f, "unknown {id}"),
            Self::DuplicateContainer(id) => write!(f, "{id} already exists"),
            Self::DuplicateItem(id) => write!(f, "{id} appears more than once"),
            Self::DuplicateSequence(id) => {
                write!(f, "{id} is replaced more than once in one request")
            }
            Self::MembershipChanged { expected, actual } => write!(
                f,
                "replacement must keep the same items (expected {expected}, got {actual})"
            ),
        }
    }
}

impl std::error::Error for CollectionError {}
