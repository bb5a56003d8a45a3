//! # modweave
//!
//! Conflict detection and priority-ordered merging for Baldur's Gate 3
//! mods.
//!
//! Many mods independently edit the same dialogue graphs and cinematic
//! timelines; installing several of them silently drops all but one
//! mod's edits. modweave scans the installed packages, groups mods by
//! the content they jointly touch, and deterministically reconstructs a
//! single merged asset per contested dialog/timeline that keeps every
//! mod's non-overlapping changes, resolved by a user-chosen priority
//! order.
//!
//! The proprietary package container and the tree wire format stay
//! outside this crate: hosts supply them through the
//! [`pak::PackageReader`], [`pak::PackageWriter`] and [`pak::TreeCodec`]
//! traits.
//!
//! ## Quick Start
//!
//! ```no_run
//! use modweave::merge::{ConflictResolver, NoBaselines, ResolutionMethod, ResolutionSettings};
//! use modweave::pak::PakContentsCache;
//! # fn host_reader() -> Box<dyn modweave::pak::PackageReader> { unimplemented!() }
//! # fn host_codec() -> Box<dyn modweave::pak::TreeCodec> { unimplemented!() }
//! # fn host_writer() -> Box<dyn modweave::pak::PackageWriter> { unimplemented!() }
//!
//! let reader = host_reader();
//! let codec = host_codec();
//! let writer = host_writer();
//! let mut cache = PakContentsCache::new();
//! let mut resolver = ConflictResolver::new(
//!     reader.as_ref(),
//!     codec.as_ref(),
//!     writer.as_ref(),
//!     &NoBaselines,
//!     "/tmp/modweave",
//! );
//! resolver.scan_mods(&["ModA.pak".into(), "ModB.pak".into()], &mut cache, None)?;
//! resolver.detect();
//!
//! let settings = ResolutionSettings {
//!     chosen_conflicts: vec![0],
//!     priority_order: resolver.conflicts()[0].mods.clone(),
//!     metadata: None,
//!     method: ResolutionMethod::Merge,
//! };
//! let outcome = resolver.resolve(&settings, &mut cache, None);
//! println!("{}", outcome.message);
//! # Ok::<(), modweave::Error>(())
//! ```

pub mod content;
pub mod diff;
pub mod error;
pub mod index;
pub mod merge;
pub mod pak;
pub mod tree;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::tree::{
        AssetDocument, Attribute, AttributeValue, ChildGroup, FixedTime, Node, Region,
        node_signature,
    };

    pub use crate::content::{DialogTree, Phase, TimelineTree};

    pub use crate::diff::{
        DiffState, NodeDiff, TimelineDiff, TimelineDiffEntry, diff_dialog_nodes,
        diff_dialog_roots, diff_key_order, diff_timeline_effects,
    };

    pub use crate::index::{
        ConflictGroup, ContentBundle, ContentIndex, ModInfo, ModRegistry, ModVersion,
        detect_conflicts,
    };

    pub use crate::merge::{
        BaselineProvider, ConflictResolver, ExclusionTracker, NoBaselines, OutputModMetadata,
        OverlapCatalog, Report, ResolutionMethod, ResolutionSettings, ResourceBanks, RunOutcome,
    };

    pub use crate::pak::{
        PackageReader, PackageWriter, PakContentsCache, TreeCodec,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
