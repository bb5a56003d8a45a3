//! Output mod metadata document.

use serde::{Deserialize, Serialize};

use crate::index::mod_info::ModVersion;
use crate::tree::{AssetDocument, Attribute, Node, Region};

/// Identity of the merged output mod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputModMetadata {
    /// Mod name.
    pub name: String,
    /// Description shown in mod managers.
    pub description: String,
    /// UUID of the output mod.
    pub uuid: String,
    /// Author credit.
    pub author: String,
    /// Version of the output mod.
    pub version: ModVersion,
}

/// Build the `meta.lsx` document for the output mod.
///
/// Same `ModuleInfo` shape the scanner reads back, so a merged mod can
/// itself participate in a later resolution run.
#[must_use]
pub fn build_meta_document(meta: &OutputModMetadata, folder: &str) -> AssetDocument {
    let mut module_info = Node::new("ModuleInfo");
    let attrs: [(&str, &str, String); 7] = [
        ("Author", "LSString", meta.author.clone()),
        ("Description", "LSString", meta.description.clone()),
        ("Folder", "LSString", folder.to_string()),
        ("Name", "LSString", meta.name.clone()),
        ("Type", "FixedString", "Add-on".to_string()),
        ("UUID", "FixedString", meta.uuid.clone()),
        (
            "Version64",
            "int64",
            meta.version.to_version64().to_string(),
        ),
    ];
    for (name, type_name, value) in attrs {
        module_info
            .attributes
            .insert(name.to_string(), Attribute::text(type_name, value));
    }

    let mut root = Node::new("root");
    root.insert_child("children", Node::new("Dependencies"), None);
    root.insert_child("children", module_info, None);

    let mut region = Region::new("Config");
    region.nodes.push(root);
    let mut doc = AssetDocument::new(4, 0, 9, 331);
    doc.regions.push(region);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::mod_info::find_module_info;

    #[test]
    fn test_meta_document_scans_back() {
        let meta = OutputModMetadata {
            name: "Merged Patch".to_string(),
            description: "Two mods, one pak".to_string(),
            uuid: "11111111-2222-3333-4444-555555555555".to_string(),
            author: "someone".to_string(),
            version: ModVersion::one(),
        };
        let doc = build_meta_document(&meta, "MergedPatch");
        let module_info = find_module_info(&doc).unwrap();
        assert_eq!(module_info.required_str("Name").unwrap(), "Merged Patch");
        assert_eq!(module_info.required_str("Folder").unwrap(), "MergedPatch");
        assert_eq!(
            module_info.required_str("Version64").unwrap(),
            "36028797018963968"
        );
    }
}
