#![forbid(unsafe_code)]

//! Collision resolution: which drop target does the pointer mean?
//!
//! [`CollisionResolver::resolve`] is a pure function of the pointer and the
//! candidate list. Two strategies exist:
//!
//! - [`CollisionStrategy::CenterDistance`]: nearest rectangle centre by
//!   Euclidean distance. Used for vertical lists and item-level targeting.
//!   Resolves to `None` when the pointer is inside no candidate.
//! - [`CollisionStrategy::AxisConstrained`]: for containers laid out along one
//!   axis (board columns side by side). Only candidates whose cross-axis
//!   extent contains the pointer compete, and they are ranked by distance
//!   along the layout axis alone, so a column several screens below the
//!   cursor never wins on a short horizontal gap.
//!
//! # Determinism
//!
//! Candidates are scanned in slice order and a later candidate only wins on a
//! strictly smaller distance, so equidistant candidates resolve to the
//! earliest one. No hashing or unordered iteration is involved.
//!
//! # Layered resolution
//!
//! [`DropMap::resolve`] composes the two: first the container (using the
//! map's container strategy), then the nearest item inside that container,
//! then the insertion side (before/after the anchor's centre along the
//! container's item axis). An empty container resolves to index 0.

use ordo_core::geometry::{Axis, Point, Rect};
use ordo_model::{CollectionView, ContainerId, ItemId, MoveTarget, Placement};
use serde::{Deserialize, Serialize};

/// Identity of a drop candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTargetId {
    /// A container as a whole.
    Container { container: ContainerId },
    /// A specific item, used as an insertion anchor.
    Item { container: ContainerId, item: ItemId },
}

impl DropTargetId {
    /// Container the target belongs to.
    #[must_use]
    pub const fn container(self) -> ContainerId {
        match self {
            Self::Container { container } | Self::Item { container, .. } => container,
        }
    }

    /// Anchor item, if the target is item-level.
    #[must_use]
    pub const fn item(self) -> Option<ItemId> {
        match self {
            Self::Container { .. } => None,
            Self::Item { item, .. } => Some(item),
        }
    }
}

/// One droppable candidate with its on-screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: DropTargetId,
    pub rect: Rect,
}

impl Candidate {
    #[must_use]
    pub const fn new(id: DropTargetId, rect: Rect) -> Self {
        Self { id, rect }
    }
}

/// Candidate ranking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CollisionStrategy {
    /// Nearest centre, Euclidean.
    #[default]
    CenterDistance,
    /// Distance along `axis` among candidates spanning the pointer on the
    /// cross axis.
    AxisConstrained { axis: Axis },
}

impl CollisionStrategy {
    /// Strategy suited to containers laid out along `axis`.
    #[must_use]
    pub const fn for_layout(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Self::AxisConstrained {
                axis: Axis::Horizontal,
            },
            Axis::Vertical => Self::CenterDistance,
        }
    }
}

/// Winning candidate and its distance under the active strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub target: DropTargetId,
    pub distance: f64,
}

/// Stateless resolver configured with a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionResolver {
    strategy: CollisionStrategy,
}

impl CollisionResolver {
    #[must_use]
    pub const fn new(strategy: CollisionStrategy) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub const fn strategy(&self) -> CollisionStrategy {
        self.strategy
    }

    /// Pick the single best candidate for `pointer`.
    #[must_use]
    pub fn resolve(&self, pointer: Point, candidates: &[Candidate]) -> Option<Collision> {
        if !pointer.is_finite() {
            return None;
        }
        match self.strategy {
            CollisionStrategy::CenterDistance => {
                let over_any = candidates
                    .iter()
                    .any(|candidate| !candidate.rect.is_empty() && candidate.rect.contains(pointer));
                if !over_any {
                    return None;
                }
                nearest_center(pointer, candidates)
            }
            CollisionStrategy::AxisConstrained { axis } => {
                nearest_along_axis(pointer, candidates, axis)
            }
        }
    }
}

/// Nearest centre among all non-empty candidates, earliest on ties.
fn nearest_center(pointer: Point, candidates: &[Candidate]) -> Option<Collision> {
    let mut best: Option<(f64, DropTargetId)> = None;
    for candidate in candidates {
        if candidate.rect.is_empty() {
            continue;
        }
        let distance = candidate.rect.center().distance_squared(pointer);
        match best {
            Some((current, _)) if distance >= current => {}
            _ => best = Some((distance, candidate.id)),
        }
    }
    best.map(|(distance, target)| Collision {
        target,
        distance: distance.sqrt(),
    })
}

fn nearest_along_axis(pointer: Point, candidates: &[Candidate], axis: Axis) -> Option<Collision> {
    let cross = axis.cross();
    let row = pointer.along(cross);
    let mut best: Option<Collision> = None;
    for candidate in candidates {
        if candidate.rect.is_empty() || !candidate.rect.spans(cross, row) {
            continue;
        }
        let distance = (pointer.along(axis) - candidate.rect.center().along(axis)).abs();
        match best {
            Some(current) if distance >= current.distance => {}
            _ => {
                best = Some(Collision {
                    target: candidate.id,
                    distance,
                });
            }
        }
    }
    best
}

/// An item's rectangle inside a drop zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemZone {
    pub item: ItemId,
    pub rect: Rect,
}

/// A container's rectangle and the rectangles of the items it renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropZone {
    pub container: ContainerId,
    pub rect: Rect,
    /// Direction the container lays its items out in.
    pub item_axis: Axis,
    /// Item rectangles in render order.
    pub items: Vec<ItemZone>,
}

impl DropZone {
    #[must_use]
    pub fn new(container: ContainerId, rect: Rect) -> Self {
        Self {
            container,
            rect,
            item_axis: Axis::Vertical,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_item_axis(mut self, axis: Axis) -> Self {
        self.item_axis = axis;
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: ItemId, rect: Rect) -> Self {
        self.items.push(ItemZone { item, rect });
        self
    }
}

/// Resolved drop location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropResolution {
    /// Candidate the pointer is over.
    pub over: DropTargetId,
    /// Where the active item would land.
    pub target: MoveTarget,
}

/// Renderer-supplied layout of every droppable container and item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DropMap {
    /// Strategy used to pick the container.
    pub container_strategy: CollisionStrategy,
    /// Zones in traversal order.
    pub zones: Vec<DropZone>,
}

impl DropMap {
    #[must_use]
    pub fn new(container_strategy: CollisionStrategy) -> Self {
        Self {
            container_strategy,
            zones: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_zone(mut self, zone: DropZone) -> Self {
        self.zones.push(zone);
        self
    }

    /// Container-level candidates in traversal order.
    #[must_use]
    pub fn container_candidates(&self) -> Vec<Candidate> {
        self.zones
            .iter()
            .map(|zone| {
                Candidate::new(
                    DropTargetId::Container {
                        container: zone.container,
                    },
                    zone.rect,
                )
            })
            .collect()
    }

    /// Item whose rectangle contains `pointer` (first in traversal order).
    #[must_use]
    pub fn hit_item(&self, pointer: Point) -> Option<(ContainerId, ItemId)> {
        self.zones.iter().find_map(|zone| {
            zone.items
                .iter()
                .find(|entry| entry.rect.contains(pointer))
                .map(|entry| (zone.container, entry.item))
        })
    }

    /// Resolve the drop location of `active` for a pointer position.
    #[must_use]
    pub fn resolve(
        &self,
        pointer: Point,
        active: ItemId,
        view: &dyn CollectionView,
    ) -> Option<DropResolution> {
        let resolver = CollisionResolver::new(self.container_strategy);
        let container = resolver
            .resolve(pointer, &self.container_candidates())?
            .target
            .container();
        let zone = self.zones.iter().find(|zone| zone.container == container)?;

        let anchors: Vec<Candidate> = zone
            .items
            .iter()
            .map(|entry| {
                Candidate::new(
                    DropTargetId::Item {
                        container,
                        item: entry.item,
                    },
                    entry.rect,
                )
            })
            .collect();

        let Some(anchor) = nearest_center(pointer, &anchors) else {
            view.container_len(container)?;
            return Some(DropResolution {
                over: DropTargetId::Container { container },
                target: MoveTarget::at(container, 0),
            });
        };

        let anchor_item = anchor.target.item()?;
        let anchor_rect = zone
            .items
            .iter()
            .find(|entry| entry.item == anchor_item)?
            .rect;
        let placement = if pointer.along(zone.item_axis) < anchor_rect.center().along(zone.item_axis)
        {
            Placement::Before
        } else {
            Placement::After
        };
        let target = MoveTarget::relative_to(view, active, anchor_item, placement).ok()?;
        Some(DropResolution {
            over: anchor.target,
            target,
        })
    }
}
