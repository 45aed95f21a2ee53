#![forbid(unsafe_code)]

//! Move engine: same-container reorder and cross-container relocation.
//!
//! [`compute_move`] is a pure function over an [`OrderedCollection`]. It
//! returns a [`MoveResult`] holding the new sequences of every affected
//! container plus the minimal diff (one [`PositionAssignment`] per item whose
//! container or position changes). The diff is what gets sent to the remote
//! store; the sequences are what [`OrderedCollection::apply`] writes.
//!
//! # Index semantics
//!
//! A [`MoveTarget`] index is the item's *final* index in the target
//! container:
//!
//! - same container: clamped to `[0, len - 1]`; equal to the current index
//!   means no-op,
//! - other container: clamped to `[0, len]`; anything past the end appends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collection::{CollectionView, OrderedCollection};
use crate::ids::{ContainerId, ItemId, Slot};

/// Where the moving item should land inside the target container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "at", content = "index", rename_all = "snake_case")]
pub enum InsertAt {
    /// Final index within the target container.
    Index(usize),
    /// After the last item.
    End,
}

/// Drop destination for a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveTarget {
    pub container: ContainerId,
    pub slot: InsertAt,
}

/// Side of an anchor item to insert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Before,
    After,
}

impl MoveTarget {
    /// Insert at a final index.
    #[must_use]
    pub const fn at(container: ContainerId, index: usize) -> Self {
        Self {
            container,
            slot: InsertAt::Index(index),
        }
    }

    /// Append to the end.
    #[must_use]
    pub const fn end(container: ContainerId) -> Self {
        Self {
            container,
            slot: InsertAt::End,
        }
    }

    /// Target next to an anchor item.
    ///
    /// Accounts for the index shift caused by removing `moving` from the
    /// anchor's container before reinserting it. Anchoring on the moving item
    /// itself yields its current slot.
    pub fn relative_to(
        view: &dyn CollectionView,
        moving: ItemId,
        anchor: ItemId,
        placement: Placement,
    ) -> Result<Self, MoveError> {
        let source = view.locate(moving).ok_or(MoveError::UnknownItem(moving))?;
        let anchor_slot = view.locate(anchor).ok_or(MoveError::UnknownItem(anchor))?;
        if moving == anchor {
            return Ok(Self::at(source.container, source.index));
        }

        let j = anchor_slot.index;
        let index = if source.container == anchor_slot.container && source.index < j {
            match placement {
                Placement::Before => j - 1,
                Placement::After => j,
            }
        } else {
            match placement {
                Placement::Before => j,
                Placement::After => j + 1,
            }
        };
        Ok(Self::at(anchor_slot.container, index))
    }
}

/// Authoritative `(item, container, position)` triple.
///
/// Serialized as `{ "id", "position", "containerId" }`, the remote write
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAssignment {
    pub id: ItemId,
    pub position: usize,
    pub container_id: ContainerId,
}

impl PositionAssignment {
    #[must_use]
    pub const fn new(id: ItemId, container_id: ContainerId, position: usize) -> Self {
        Self {
            id,
            position,
            container_id,
        }
    }
}

/// Full new order of one affected container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSequence {
    pub container: ContainerId,
    pub items: Vec<ItemId>,
}

/// Outcome of a move computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    /// The item being moved.
    pub item: ItemId,
    /// Where it was.
    pub from: Slot,
    /// Where it ends up.
    pub to: Slot,
    /// New sequences of the affected containers; empty for a no-op.
    pub sequences: Vec<ContainerSequence>,
    /// Items whose container or position changed.
    pub changes: Vec<PositionAssignment>,
}

impl MoveResult {
    fn noop(item: ItemId, at: Slot) -> Self {
        Self {
            item,
            from: at,
            to: at,
            sequences: Vec::new(),
            changes: Vec::new(),
        }
    }

    /// True when nothing changes.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    /// True when the item changes container.
    #[must_use]
    pub fn is_relocation(&self) -> bool {
        self.from.container != self.to.container
    }

    /// Containers whose sequences change.
    pub fn containers(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.sequences.iter().map(|sequence| sequence.container)
    }
}

/// Move computation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    UnknownItem(ItemId),
    UnknownContainer(ContainerId),
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownItem(id) => write!(f, "cannot move unknown {id}"),
            Self::UnknownContainer(id) => write!(f, "cannot move into unknown {id}"),
        }
    }
}

impl std::error::Error for MoveError {}

/// Compute the result of moving `item` to `target` without mutating
/// `collection`.
pub fn compute_move<P>(
    collection: &OrderedCollection<P>,
    item: ItemId,
    target: MoveTarget,
) -> Result<MoveResult, MoveError> {
    let from = collection
        .locate(item)
        .ok_or(MoveError::UnknownItem(item))?;
    let target_items = collection
        .items_of(target.container)
        .ok_or(MoveError::UnknownContainer(target.container))?;

    if target.container == from.container {
        let mut sequence = target_items.to_vec();
        let last = sequence.len().saturating_sub(1);
        let to_index = match target.slot {
            InsertAt::Index(index) => index.min(last),
            InsertAt::End => last,
        };
        if to_index == from.index {
            return Ok(MoveResult::noop(item, from));
        }
        let moved = sequence.remove(from.index);
        sequence.insert(to_index, moved);

        let sequences = vec![ContainerSequence {
            container: from.container,
            items: sequence,
        }];
        let changes = diff(collection, &sequences);
        return Ok(MoveResult {
            item,
            from,
            to: Slot::new(from.container, to_index),
            sequences,
            changes,
        });
    }

    let mut source = collection
        .items_of(from.container)
        .unwrap_or_default()
        .to_vec();
    source.remove(from.index);

    let mut destination = target_items.to_vec();
    let to_index = match target.slot {
        InsertAt::Index(index) => index.min(destination.len()),
        InsertAt::End => destination.len(),
    };
    destination.insert(to_index, item);

    let sequences = vec![
        ContainerSequence {
            container: from.container,
            items: source,
        },
        ContainerSequence {
            container: target.container,
            items: destination,
        },
    ];
    let changes = diff(collection, &sequences);
    Ok(MoveResult {
        item,
        from,
        to: Slot::new(target.container, to_index),
        sequences,
        changes,
    })
}

fn diff<P>(
    collection: &OrderedCollection<P>,
    sequences: &[ContainerSequence],
) -> Vec<PositionAssignment> {
    let mut changes = Vec::new();
    for sequence in sequences {
        for (position, id) in sequence.items.iter().enumerate() {
            let unchanged = collection.locate(*id) == Some(Slot::new(sequence.container, position));
            if !unchanged {
                changes.push(PositionAssignment::new(*id, sequence.container, position));
            }
        }
    }
    changes
}
