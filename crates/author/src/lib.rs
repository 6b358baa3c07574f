//! In-World Authoring: place and remove blocks on resident terrain, undo/redo.
//!
//! # Invariants
//! - All edits are reversible.
//! - Every applied edit publishes a `BlockChanged` event.
//! - Edits never rebake; each returns the chunk the caller should rebake.

mod editor;

pub use editor::{EditCommand, EditError, Editor};
