//! Installed-mod metadata and the scan registry.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pak::{PackageReader, PakContentsCache, TreeCodec};
use crate::tree::{AssetDocument, Node};

use super::content::{ContentIndex, build_content_index};

/// Longest allowed short name.
const SHORT_NAME_MAX: usize = 48;

/// Four-part mod version decoded from the packed `Version64` integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModVersion {
    pub major: u64,
    pub minor: u64,
    pub revision: u64,
    pub build: u64,
}

impl ModVersion {
    /// Decode the packed `Version64` layout:
    /// `major << 55 | minor << 47 | revision << 31 | build`.
    #[must_use]
    pub fn from_version64(v: i64) -> Self {
        let v = v as u64;
        ModVersion {
            major: v >> 55,
            minor: (v >> 47) & 0xff,
            revision: (v >> 31) & 0xffff,
            build: v & 0x7ffffff,
        }
    }

    /// Encode back into the packed `Version64` layout.
    #[must_use]
    pub fn to_version64(self) -> i64 {
        ((self.major << 55) | (self.minor << 47) | (self.revision << 31) | self.build) as i64
    }

    /// A plain 1.0.0.0.
    #[must_use]
    pub fn one() -> Self {
        ModVersion {
            major: 1,
            minor: 0,
            revision: 0,
            build: 0,
        }
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.revision, self.build
        )
    }
}

/// Everything known about one installed mod package.
#[derive(Debug, Clone)]
pub struct ModInfo {
    /// Mod UUID from `meta.lsx`.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Sanitized short name (alnum/`.`/`-`/`_`, at most 48 chars).
    pub short_name: String,
    /// Mod description.
    pub description: String,
    /// Author, `Anonymous` when unset.
    pub author: String,
    /// Mod folder name under `Mods/`/`Public/`.
    pub folder: String,
    /// Decoded version.
    pub version: ModVersion,
    /// Path of the package on disk.
    pub pak_path: PathBuf,
    /// Full file manifest, in package order.
    pub files: Vec<String>,
    /// Content UUID -> backing-file bundle.
    pub content: ContentIndex,
}

/// Strip a display name down to the allowed short-name alphabet.
#[must_use]
pub fn make_short_name(name: &str) -> String {
    let mut result: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    result.truncate(SHORT_NAME_MAX);
    result
}

/// Registry of scanned mods, in scan order.
#[derive(Debug, Default)]
pub struct ModRegistry {
    mods: Vec<ModInfo>,
}

impl ModRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        ModRegistry::default()
    }

    /// Scanned mods, in scan order.
    #[must_use]
    pub fn mods(&self) -> &[ModInfo] {
        &self.mods
    }

    /// Register a mod directly, replacing any entry with the same UUID.
    ///
    /// Scanning normally builds entries; this is for hosts that learn
    /// about mods from a load-order file before their packages are read.
    pub fn register(&mut self, info: ModInfo) {
        if let Some(existing) = self.mods.iter_mut().find(|m| m.uuid == info.uuid) {
            *existing = info;
        } else {
            self.mods.push(info);
        }
    }

    /// Look up a mod by UUID.
    ///
    /// # Errors
    /// [`Error::UnknownMod`] when absent.
    pub fn get(&self, uuid: &str) -> Result<&ModInfo> {
        self.mods
            .iter()
            .find(|m| m.uuid == uuid)
            .ok_or_else(|| Error::UnknownMod(uuid.to_string()))
    }

    /// Scan one package and register (or refresh) its mod.
    ///
    /// A package whose UUID is already known updates the existing entry
    /// in place; later scans re-populate the fields the earlier pass
    /// could not fill.
    pub fn scan_package<R, C>(
        &mut self,
        pak_path: &Path,
        reader: &R,
        codec: &C,
        cache: &mut PakContentsCache,
    ) -> Result<()>
    where
        R: PackageReader + ?Sized,
        C: TreeCodec + ?Sized,
    {
        let files = cache.list_files(reader, pak_path)?;
        let Some(meta_path) = files.iter().find(|f| f.ends_with("meta.lsx")) else {
            tracing::warn!("no meta.lsx in {}, skipping", pak_path.display());
            return Ok(());
        };
        let meta_bytes = cache.extract_file(reader, pak_path, meta_path)?;
        let meta_doc = codec.parse(&meta_bytes)?;
        let Some(module_info) = find_module_info(&meta_doc) else {
            tracing::warn!("meta.lsx in {} has no ModuleInfo", pak_path.display());
            return Ok(());
        };

        let uuid = module_info.required_str("UUID")?;
        let name = module_info.required_str("Name")?;
        let folder = module_info.required_str("Folder")?;
        let description = module_info.attribute_str("Description").unwrap_or_default();
        let author = module_info
            .attribute_str("Author")
            .unwrap_or_else(|| "Anonymous".to_string());
        let version = module_info
            .attribute_str("Version64")
            .and_then(|v| v.parse::<i64>().ok())
            .map(ModVersion::from_version64)
            .unwrap_or_default();

        let content = build_content_index(&files, pak_path, reader, codec, cache)?;
        tracing::debug!(
            "scanned {}: {} files, {} content entries",
            pak_path.display(),
            files.len(),
            content.len()
        );

        let info = ModInfo {
            short_name: make_short_name(&name),
            uuid,
            name,
            description,
            author,
            folder,
            version,
            pak_path: pak_path.to_path_buf(),
            files,
            content,
        };
        self.register(info);
        Ok(())
    }

    /// Scan every `.pak` file in a directory, in name order.
    pub fn scan_directory<R, C>(
        &mut self,
        mods_dir: &Path,
        reader: &R,
        codec: &C,
        cache: &mut PakContentsCache,
    ) -> Result<()>
    where
        R: PackageReader + ?Sized,
        C: TreeCodec + ?Sized,
    {
        let mut paks: Vec<PathBuf> = std::fs::read_dir(mods_dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("pak")
            })
            .collect();
        paks.sort();
        for pak in paks {
            self.scan_package(&pak, reader, codec, cache)?;
        }
        Ok(())
    }
}

/// Locate the `ModuleInfo` node of a parsed `meta.lsx` document.
#[must_use]
pub fn find_module_info(doc: &AssetDocument) -> Option<&Node> {
    doc.region("Config")?
        .node("root")?
        .find_child("children", |n| n.kind == "ModuleInfo")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version64_decode() {
        // 1.0.0.0
        let v = ModVersion::from_version64(36028797018963968);
        assert_eq!(v.to_string(), "1.0.0.0");
    }

    #[test]
    fn test_version64_decode_fields() {
        let packed: i64 = (2_i64 << 55) | (3_i64 << 47) | (7_i64 << 31) | 42;
        let v = ModVersion::from_version64(packed);
        assert_eq!((v.major, v.minor, v.revision, v.build), (2, 3, 7, 42));
    }

    #[test]
    fn test_make_short_name_strips_and_truncates() {
        assert_eq!(make_short_name("My Mod! (v2)"), "MyModv2");
        assert_eq!(make_short_name("safe_name-1.2"), "safe_name-1.2");
        let long = "x".repeat(60);
        assert_eq!(make_short_name(&long).len(), 48);
    }
}
