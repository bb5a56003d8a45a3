//! Structural diffs over dialogue graphs and timelines.
//!
//! Two diff passes are always computed together for a (baseline,
//! candidate) pair: a set diff over all nodes keyed by stable UUID, and
//! an order diff over the designated ordered sibling sequence (dialogue
//! roots; per-phase effects for timelines).

pub mod dialog;
pub mod order;
pub mod timeline;
pub mod types;

pub use dialog::{diff_dialog_nodes, diff_dialog_roots, dialog_nodes_equal};
pub use order::diff_key_order;
pub use timeline::diff_timeline_effects;
pub use types::{DiffState, NodeDiff, TimelineDiff, TimelineDiffEntry};
