//! Domain models for the hotbar store.
//!
//! # Core Concepts
//!
//! - [`EntityReference`]: A pinned catalog entity, identified by its stable
//!   `uid` and carrying a display cache (`name`, `source`) that may be stale.
//! - [`Slot`]: One position of a hotbar, either empty or occupied.
//! - [`Slots`]: The fixed-length slot sequence. Its length never changes, so
//!   slot indices stay stable across every mutation.
//! - [`Hotbar`]: A named, identified row of slots with pin/unpin/move
//!   operations.
//! - [`StoreDocument`]: The persisted root holding every hotbar, the active
//!   selection, and the schema version.

mod document;
mod entity;
mod hotbar;
mod slot;

pub use document::*;
pub use entity::*;
pub use hotbar::*;
pub use slot::*;
