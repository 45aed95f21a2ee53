#![forbid(unsafe_code)]

//! Opaque identifiers and container classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of an orderable item (task, nav link, calendar entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Wrap a raw backend identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Stable identifier of a container (board list, section, nav group, day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Wrap a raw backend identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ContainerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Kind of container.
///
/// Carried as data for the collaborators that interpret committed moves
/// (e.g. deriving a task status from its board column). The move engine and
/// collision resolution treat every kind the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A column on a task board.
    #[default]
    BoardList,
    /// A section in the list view.
    ListSection,
    /// A navigation group in the sidebar.
    SidebarGroup,
    /// A date bucket in the calendar view.
    CalendarDay,
}

impl ContainerKind {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BoardList => "board_list",
            Self::ListSection => "list_section",
            Self::SidebarGroup => "sidebar_group",
            Self::CalendarDay => "calendar_day",
        }
    }
}

/// Location of an item: its container and zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub container: ContainerId,
    pub index: usize,
}

impl Slot {
    /// Create a slot.
    #[must_use]
    pub const fn new(container: ContainerId, index: usize) -> Self {
        Self { container, index }
    }
}
