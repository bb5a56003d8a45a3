//! Caller-owned package contents cache.
//!
//! One resolution run reads the same bank files from the same packages
//! many times (content indexing, bank merging, overlap merging). The
//! cache keys on package path plus modification timestamp, so a package
//! replaced on disk between reads misses cleanly instead of serving
//! stale bytes. The cache is an explicit object owned by the caller -
//! its lifetime is one host-process run, never global state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

use super::PackageReader;

/// Cache key: package path plus its modification timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl CacheKey {
    fn for_package(path: &Path) -> Self {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        CacheKey {
            path: path.to_path_buf(),
            modified,
        }
    }
}

/// Cache statistics for debugging.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

/// Cache of package listings and extracted entries.
#[derive(Debug, Default)]
pub struct PakContentsCache {
    listings: HashMap<CacheKey, Vec<String>>,
    entries: HashMap<(CacheKey, String), Vec<u8>>,
    stats: CacheStats,
}

impl PakContentsCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        PakContentsCache::default()
    }

    /// List a package's files, reading through the cache.
    pub fn list_files<R: PackageReader + ?Sized>(
        &mut self,
        reader: &R,
        package: &Path,
    ) -> Result<Vec<String>> {
        let key = CacheKey::for_package(package);
        if let Some(files) = self.listings.get(&key) {
            self.stats.hits += 1;
            return Ok(files.clone());
        }
        self.stats.misses += 1;
        let files = reader.list_files(package)?;
        self.listings.insert(key, files.clone());
        Ok(files)
    }

    /// Extract one package entry, reading through the cache.
    pub fn extract_file<R: PackageReader + ?Sized>(
        &mut self,
        reader: &R,
        package: &Path,
        path: &str,
    ) -> Result<Vec<u8>> {
        let key = (CacheKey::for_package(package), path.to_string());
        if let Some(bytes) = self.entries.get(&key) {
            self.stats.hits += 1;
            return Ok(bytes.clone());
        }
        self.stats.misses += 1;
        let bytes = reader.extract_file(package, path)?;
        self.entries.insert(key, bytes.clone());
        Ok(bytes)
    }

    /// Drop every cached listing and entry for a package path,
    /// regardless of timestamp.
    pub fn invalidate(&mut self, package: &Path) {
        let before = self.listings.len() + self.entries.len();
        self.listings.retain(|k, _| k.path != package);
        self.entries.retain(|(k, _), _| k.path != package);
        let dropped = before - (self.listings.len() + self.entries.len());
        if dropped > 0 {
            self.stats.invalidations += 1;
            tracing::debug!("invalidated {dropped} cache entries for {}", package.display());
        }
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CountingReader {
        calls: RefCell<usize>,
    }

    impl PackageReader for CountingReader {
        fn list_files(&self, _package: &Path) -> Result<Vec<String>> {
            *self.calls.borrow_mut() += 1;
            Ok(vec!["meta.lsx".to_string()])
        }

        fn extract_file(&self, _package: &Path, path: &str) -> Result<Vec<u8>> {
            *self.calls.borrow_mut() += 1;
            Ok(path.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_repeat_reads_hit_cache() {
        let reader = CountingReader {
            calls: RefCell::new(0),
        };
        let mut cache = PakContentsCache::new();
        let pkg = Path::new("/nonexistent/mod.pak");
        cache.list_files(&reader, pkg).unwrap();
        cache.list_files(&reader, pkg).unwrap();
        cache.extract_file(&reader, pkg, "meta.lsx").unwrap();
        cache.extract_file(&reader, pkg, "meta.lsx").unwrap();
        assert_eq!(*reader.calls.borrow(), 2);
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_invalidate_forces_reread() {
        let reader = CountingReader {
            calls: RefCell::new(0),
        };
        let mut cache = PakContentsCache::new();
        let pkg = Path::new("/nonexistent/mod.pak");
        cache.list_files(&reader, pkg).unwrap();
        cache.invalidate(pkg);
        cache.list_files(&reader, pkg).unwrap();
        assert_eq!(*reader.calls.borrow(), 2);
    }
}
