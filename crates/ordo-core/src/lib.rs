// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: geometry, canonical input events, and logging glue.
//!
//! # Role in ordo
//! `ordo-core` is the leaf layer. It owns the coordinate primitives used by
//! collision resolution and the normalized pointer/keyboard events that a
//! reorder surface consumes.
//!
//! # How it fits in the system
//! `ordo-model` (collections and the move engine) does not depend on input at
//! all. `ordo-drag` consumes [`geometry`] for hit testing and `ordo` turns
//! [`event::Event`] values into drag-session inputs.

pub mod event;
pub mod geometry;
pub mod logging;
