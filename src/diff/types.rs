//! Core types for diff operations
//!

use std::fmt;

use indexmap::IndexMap;

/// Classification of one node key relative to a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffState {
    /// Node exists only in the candidate.
    Added,
    /// Node exists only in the baseline.
    Deleted,
    /// Node exists in both with different content (or position).
    Modified,
}

impl fmt::Display for DiffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Deleted => write!(f, "deleted"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// Diff over a set of nodes keyed by their stable UUID attribute.
///
/// Insertion-ordered so that merge replay is deterministic.
pub type NodeDiff = IndexMap<String, DiffState>;

/// One timeline diff entry: the state plus the owning phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineDiffEntry {
    /// Added/Deleted/Modified.
    pub state: DiffState,
    /// Beat UUID of the phase owning the effect.
    pub phase: String,
}

/// Diff over timeline effects keyed by effect ID.
pub type TimelineDiff = IndexMap<String, TimelineDiffEntry>;
