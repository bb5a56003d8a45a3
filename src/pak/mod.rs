//! External interfaces: codec, package access, and the contents cache.
//!
//! The proprietary package container and the tree wire format are not
//! part of this crate. The engine reaches them only through the traits
//! below; hosts plug in their own implementations, and tests plug in
//! in-memory fakes.

pub mod cache;

use std::path::Path;

use crate::error::Result;
use crate::tree::AssetDocument;

pub use cache::{CacheStats, PakContentsCache};

/// Parses and serializes the asset tree wire format.
///
/// Implementations must preserve attribute type metadata and ordered-map
/// semantics on a round trip; a serialization that drops the attribute
/// type tag breaks a later re-parse.
pub trait TreeCodec {
    /// Parse raw bytes into a document.
    fn parse(&self, bytes: &[u8]) -> Result<AssetDocument>;

    /// Serialize a document back to bytes.
    fn serialize(&self, doc: &AssetDocument) -> Result<Vec<u8>>;
}

/// Read access to a mod package.
pub trait PackageReader {
    /// List every file path in the package, in manifest order.
    fn list_files(&self, package: &Path) -> Result<Vec<String>>;

    /// Extract one file's bytes by its package-relative path.
    fn extract_file(&self, package: &Path, path: &str) -> Result<Vec<u8>>;
}

/// Builds a package from a directory tree.
pub trait PackageWriter {
    /// Package up the directory's contents, returning the raw bytes.
    fn create_package(&self, dir: &Path) -> Result<Vec<u8>>;
}
