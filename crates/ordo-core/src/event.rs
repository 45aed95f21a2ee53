#![forbid(unsafe_code)]

//! Canonical input event types.
//!
//! Host adapters (browser bindings, test drivers) translate their native
//! pointer and keyboard events into these before handing them to a reorder
//! surface. All events derive `Clone` and `PartialEq` for use in tests.
//!
//! # Design Notes
//!
//! - Pointer coordinates are logical pixels relative to the page.
//! - `pointer_id` distinguishes concurrent pointers (touch, pen, mouse).
//! - `Modifiers` use bitflags for easy combination.

use bitflags::bitflags;

use crate::geometry::Point;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A pointer (mouse, touch, pen) event.
    Pointer(PointerEvent),

    /// A keyboard event.
    Key(KeyEvent),

    /// Focus gained or lost.
    ///
    /// `true` = focus gained, `false` = focus lost.
    Focus(bool),
}

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// The type of pointer event.
    pub kind: PointerEventKind,

    /// Identifier of the pointer that produced the event.
    pub pointer_id: u32,

    /// Location in logical pixels.
    pub position: Point,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Create a primary-pointer event without modifiers.
    #[must_use]
    pub const fn new(kind: PointerEventKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            pointer_id: 0,
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    /// Set the pointer identifier.
    #[must_use]
    pub const fn with_pointer_id(mut self, pointer_id: u32) -> Self {
        self.pointer_id = pointer_id;
        self
    }

    /// Create a pointer event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// The type of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Button pressed / contact started.
    Down(PointerButton),

    /// Pointer moved (with or without a button held).
    Move,

    /// Button released / contact ended.
    Up(PointerButton),

    /// The platform aborted the pointer stream (e.g. touch scroll takeover).
    Cancel,
}

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerButton {
    /// Primary (left) button or touch contact.
    #[default]
    Primary,
    /// Secondary (right) button.
    Secondary,
    /// Middle button.
    Middle,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a new key event with default modifiers and Press kind.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check if Shift modifier is held.
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// Key codes relevant to keyboard reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Tab key.
    Tab,

    /// Home key.
    Home,

    /// End key.
    End,

    /// Up arrow key.
    Up,

    /// Down arrow key.
    Down,

    /// Left arrow key.
    Left,

    /// Right arrow key.
    Right,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during an input event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_event_builders() {
        let ev = PointerEvent::new(PointerEventKind::Down(PointerButton::Primary), 4.0, 5.0)
            .with_pointer_id(7)
            .with_modifiers(Modifiers::SHIFT);
        assert_eq!(ev.pointer_id, 7);
        assert_eq!(ev.position, Point::new(4.0, 5.0));
        assert!(ev.modifiers.contains(Modifiers::SHIFT));
    }

    #[test]
    fn key_event_defaults_to_press() {
        let ev = KeyEvent::new(KeyCode::Char(' '));
        assert_eq!(ev.kind, KeyEventKind::Press);
        assert!(!ev.shift());
        let ev = ev.with_modifiers(Modifiers::SHIFT | Modifiers::CTRL);
        assert!(ev.shift());
    }

    #[test]
    fn modifiers_default_is_none() {
        assert_eq!(Modifiers::default(), Modifiers::NONE);
        assert!(Modifiers::NONE.is_empty());
    }
}
