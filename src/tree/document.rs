//! Asset document structures
//!
//!

use serde::{Deserialize, Serialize};

use super::node::Node;
use crate::error::{Error, Result};

/// A parsed asset document.
///
/// The version quadruple is carried through untouched so the external
/// codec can round-trip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDocument {
    /// Major version number.
    pub major: u32,
    /// Minor version number.
    pub minor: u32,
    /// Revision number.
    pub revision: u32,
    /// Build number.
    pub build: u32,
    /// Document regions containing the data.
    pub regions: Vec<Region>,
}

/// A region in an asset document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Region identifier.
    pub id: String,
    /// Root nodes in this region.
    pub nodes: Vec<Node>,
}

impl AssetDocument {
    /// Creates a new document with the specified version.
    #[must_use]
    pub fn new(major: u32, minor: u32, revision: u32, build: u32) -> Self {
        AssetDocument {
            major,
            minor,
            revision,
            build,
            regions: Vec::new(),
        }
    }

    /// Get version as a string.
    #[must_use]
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.major, self.minor, self.revision, self.build
        )
    }

    /// Find a region by id.
    #[must_use]
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Find a region by id, mutably.
    pub fn region_mut(&mut self, id: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id == id)
    }

    /// Find a region by id, or fail with [`Error::MissingRegion`].
    pub fn require_region(&self, id: &str) -> Result<&Region> {
        self.region(id)
            .ok_or_else(|| Error::MissingRegion(id.to_string()))
    }

    /// Find a region by id mutably, or fail with [`Error::MissingRegion`].
    pub fn require_region_mut(&mut self, id: &str) -> Result<&mut Region> {
        self.region_mut(id)
            .ok_or_else(|| Error::MissingRegion(id.to_string()))
    }
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Region {
            id: id.into(),
            nodes: Vec::new(),
        }
    }

    /// First root node of the given kind, if any.
    #[must_use]
    pub fn node(&self, kind: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == kind)
    }

    /// First root node of the given kind, mutably.
    pub fn node_mut(&mut self, kind: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.kind == kind)
    }
}
