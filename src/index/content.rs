//! Per-mod content index: which dialogs/timelines a package supplies.
//!
//! Bank registry files live under `Public/<Mod>/Content/` and list, per
//! content UUID, where the backing dialog or timeline file lives inside
//! the package. The index is what conflict detection runs on.

use std::path::Path;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pak::{PackageReader, PakContentsCache, TreeCodec};
use crate::tree::{AssetDocument, Node};

/// Region/node id of a dialog bank.
pub const DIALOG_BANK: &str = "DialogBank";
/// Region/node id of a timeline bank.
pub const TIMELINE_BANK: &str = "TimelineBank";
/// Group holding bank resources.
pub const RESOURCES_GROUP: &str = "Resources";

/// Backing files of one content UUID inside one mod package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentBundle {
    /// Package path of the dialog file, if the mod overrides the dialog.
    pub dialog_file: Option<String>,
    /// Package path of the timeline file, if present.
    pub timeline_file: Option<String>,
    /// UUID of the timeline resource, if present.
    pub timeline_uuid: Option<String>,
    /// The mod's dialog bank resource node for this content.
    pub dialog_resource: Option<Node>,
    /// The mod's timeline bank resource node for this content.
    pub timeline_resource: Option<Node>,
}

/// Content UUID -> bundle, in bank order.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    bundles: IndexMap<String, ContentBundle>,
}

impl ContentIndex {
    /// Number of indexed content UUIDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Indexed content UUIDs, in bank order.
    pub fn content_uuids(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Whether this mod supplies the content.
    #[must_use]
    pub fn has_content(&self, content_uuid: &str) -> bool {
        self.bundles.contains_key(content_uuid)
    }

    /// The bundle for a content UUID.
    #[must_use]
    pub fn bundle(&self, content_uuid: &str) -> Option<&ContentBundle> {
        self.bundles.get(content_uuid)
    }

    fn entry(&mut self, content_uuid: &str) -> &mut ContentBundle {
        self.bundles.entry(content_uuid.to_string()).or_default()
    }

    /// Register a bundle directly, bypassing the bank scan.
    pub fn insert(&mut self, content_uuid: &str, bundle: ContentBundle) {
        self.bundles.insert(content_uuid.to_string(), bundle);
    }

    #[cfg(test)]
    pub(crate) fn test_insert(&mut self, content_uuid: &str) {
        self.insert(content_uuid, ContentBundle::default());
    }
}

/// Rewrite a dialog-bank source path to the packed binary location.
///
/// Banks reference the editor-side `/Story/Dialogs/*.lsj` source; the
/// file actually shipped in the package is the binary variant under
/// `/Story/DialogsBinary/`.
#[must_use]
pub fn normalize_dialog_source(path: &str) -> String {
    if path.contains("/Story/Dialogs/") {
        path.replace("/Story/Dialogs/", "/Story/DialogsBinary/")
            .replace(".lsj", ".lsf")
    } else {
        path.to_string()
    }
}

/// Whether a package path is a content bank registry file.
#[must_use]
pub fn is_bank_path(path: &str) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() > 2 && parts[0] == "Public" && parts[2] == "Content" && path.ends_with(".lsf")
}

/// Validate a content identifier.
///
/// # Errors
/// [`Error::MalformedContentUuid`] when the value is not a UUID.
pub fn validate_content_uuid(value: &str) -> Result<()> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| Error::MalformedContentUuid(value.to_string()))
}

/// Build the content index for one mod from its file manifest.
///
/// Malformed registry entries are structural errors scoped to that one
/// entry: they are logged and skipped, and the scan continues.
pub fn build_content_index<R, C>(
    files: &[String],
    pak_path: &Path,
    reader: &R,
    codec: &C,
    cache: &mut PakContentsCache,
) -> Result<ContentIndex>
where
    R: PackageReader + ?Sized,
    C: TreeCodec + ?Sized,
{
    let mut index = ContentIndex::default();
    for file in files {
        if !is_bank_path(file) {
            continue;
        }
        let bytes = cache.extract_file(reader, pak_path, file)?;
        let doc = match codec.parse(&bytes) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!("unreadable bank file {file}: {err}");
                continue;
            }
        };
        index_bank_document(&mut index, &doc, file);
    }
    Ok(index)
}

fn index_bank_document(index: &mut ContentIndex, doc: &AssetDocument, file: &str) {
    if let Some(bank) = doc.region(DIALOG_BANK).and_then(|r| r.node(DIALOG_BANK)) {
        for resource in bank.children(RESOURCES_GROUP) {
            let (Some(uuid), Some(source)) = (
                resource.attribute_str("UUID"),
                resource.attribute_str("SourceFile"),
            ) else {
                tracing::warn!("dialog bank entry without UUID/SourceFile in {file}");
                continue;
            };
            if let Err(err) = validate_content_uuid(&uuid) {
                tracing::warn!("skipping dialog bank entry in {file}: {err}");
                continue;
            }
            let bundle = index.entry(&uuid);
            bundle.dialog_file = Some(normalize_dialog_source(&source));
            bundle.dialog_resource = Some(resource.clone());
        }
    }
    if let Some(bank) = doc.region(TIMELINE_BANK).and_then(|r| r.node(TIMELINE_BANK)) {
        for resource in bank.children(RESOURCES_GROUP) {
            let (Some(timeline_uuid), Some(dialog_uuid), Some(source)) = (
                resource.attribute_str("UUID"),
                resource.attribute_str("DialogResourceUuid"),
                resource.attribute_str("SourceFile"),
            ) else {
                tracing::warn!("timeline bank entry missing attributes in {file}");
                continue;
            };
            if let Err(err) = validate_content_uuid(&dialog_uuid) {
                tracing::warn!("skipping timeline bank entry in {file}: {err}");
                continue;
            }
            let bundle = index.entry(&dialog_uuid);
            bundle.timeline_file = Some(source);
            bundle.timeline_uuid = Some(timeline_uuid);
            bundle.timeline_resource = Some(resource.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dialog_source() {
        assert_eq!(
            normalize_dialog_source("Mods/Foo/Story/Dialogs/act1/banter.lsj"),
            "Mods/Foo/Story/DialogsBinary/act1/banter.lsf"
        );
        assert_eq!(
            normalize_dialog_source("Mods/Foo/Story/DialogsBinary/act1/banter.lsf"),
            "Mods/Foo/Story/DialogsBinary/act1/banter.lsf"
        );
    }

    #[test]
    fn test_is_bank_path() {
        assert!(is_bank_path("Public/FooMod/Content/UI/_merged.lsf"));
        assert!(!is_bank_path("Mods/FooMod/Story/DialogsBinary/a.lsf"));
        assert!(!is_bank_path("Public/FooMod/Content/UI/_merged.lsx"));
    }

    #[test]
    fn test_validate_content_uuid() {
        assert!(validate_content_uuid("0e5a8f1c-2f6b-4a4a-9e9c-1d2c3b4a5f60").is_ok());
        assert!(matches!(
            validate_content_uuid("not-a-uuid"),
            Err(Error::MalformedContentUuid(_))
        ));
    }
}
