//! # Copperline Cleanup
//!
//! Bulk cleanup of a board's track network. The [`TracksCleaner`] runs an
//! ordered pipeline of phases, each iterated to a fixed point:
//!
//! 1. duplicate/redundant vias, zero-length and duplicate segments, collinear merges
//! 2. tracks shorting different nets
//! 3. tracks lying entirely inside a pad
//! 4. dangling tracks and vias
//! 5. collinear merges again, when the dangling pass removed anything
//!
//! Every action is reported as a [`CleanupItem`]; board edits flow through a
//! [`CommitSink`](copperline_core::CommitSink).

pub mod cleaner;
pub mod cleanup_item;
pub mod error;
pub mod options;

pub use cleaner::TracksCleaner;
pub use cleanup_item::{CleanupCode, CleanupItem};
pub use error::CleanupError;
pub use options::CleanupOptions;
