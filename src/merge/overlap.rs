//! Keyed map-merge for same-named assets shared by multiple mods.
//!
//! When two mods ship the same logical file (a gossip table, a visual
//! bank, a template container), the entries of the lower-priority copy
//! are appended to the higher-priority copy unless an entry with the
//! same dedup key already exists: first seen wins, scanned in priority
//! order. Which node group and dedup attribute apply is fixed per asset
//! kind by an extensible catalog, never inferred from the data.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::Result;
use crate::index::mod_info::ModInfo;
use crate::pak::{PackageReader, PakContentsCache, TreeCodec};
use crate::tree::AssetDocument;

use super::exclusion::ExclusionTracker;
use super::progress::{ProgressThrottle, clip_message};
use super::report::Report;

/// Placeholder for the mod-folder path segment while grouping overlaps.
const FOLDER_PLACEHOLDER: &str = "$ModName$";

/// One catalog rule: where the mergeable entries live and how they
/// deduplicate.
#[derive(Debug, Clone)]
pub struct OverlapRule {
    /// Short label for report lines.
    pub label: &'static str,
    /// Region id of the container.
    pub region: &'static str,
    /// Kind of the container node inside the region.
    pub container: &'static str,
    /// Child group holding the mergeable entries.
    pub group: &'static str,
    /// Attribute whose value deduplicates entries.
    pub dedup_attr: &'static str,
}

/// The asset-kind catalog driving the generic overlap merge.
///
/// Seeded with the known mergeable kinds; hosts can push additional
/// rules for asset kinds that need the same treatment.
#[derive(Debug, Clone)]
pub struct OverlapCatalog {
    rules: Vec<OverlapRule>,
}

impl Default for OverlapCatalog {
    fn default() -> Self {
        OverlapCatalog {
            rules: vec![
                OverlapRule {
                    label: "gossips",
                    region: "Gossips",
                    container: "root",
                    group: "Gossips",
                    dedup_attr: "DialogUUID",
                },
                OverlapRule {
                    label: "game objects",
                    region: "Templates",
                    container: "Templates",
                    group: "GameObjects",
                    dedup_attr: "MapKey",
                },
                OverlapRule {
                    label: "translated string keys",
                    region: "TranslatedStringKeys",
                    container: "TranslatedStringKeys",
                    group: "TranslatedStringKey",
                    dedup_attr: "UUID",
                },
                OverlapRule {
                    label: "character visuals",
                    region: "CharacterVisualBank",
                    container: "CharacterVisualBank",
                    group: "Resources",
                    dedup_attr: "ID",
                },
            ],
        }
    }
}

impl OverlapCatalog {
    /// The seeded catalog.
    #[must_use]
    pub fn new() -> Self {
        OverlapCatalog::default()
    }

    /// Register an additional rule.
    pub fn push(&mut self, rule: OverlapRule) {
        self.rules.push(rule);
    }

    /// The active rules.
    #[must_use]
    pub fn rules(&self) -> &[OverlapRule] {
        &self.rules
    }
}

/// Whether the generic overlap merge may touch this file at all.
///
/// Dialog and timeline outputs are excluded - the conflict pass already
/// produced those - and only bank-bearing `.lsf` files and gossip tables
/// are eligible.
#[must_use]
pub fn is_mergeable(path: &str) -> bool {
    if path.starts_with("Mods/") && path.contains("/Story/DialogsBinary/") {
        return false;
    }
    if path.starts_with("Public/") && path.contains("/Timeline/Generated/") {
        return false;
    }
    if path.ends_with(".lsf") {
        return true;
    }
    path.contains("/Gossips/")
}

/// Replace the mod-folder path segment with a placeholder so the same
/// logical file groups across differently named mod folders.
#[must_use]
pub fn fold_mod_folder(path: &str) -> String {
    let mut parts: Vec<String> = path.split('/').map(ToString::to_string).collect();
    if parts.len() > 2 && (parts[0] == "Mods" || parts[0] == "Public") {
        parts[1] = FOLDER_PLACEHOLDER.to_string();
    }
    if parts.len() > 3 && parts[0] == "Generated" && parts[1] == "Public" {
        parts[2] = FOLDER_PLACEHOLDER.to_string();
    }
    parts.join("/")
}

/// Substitute a concrete mod folder back into a folded path.
#[must_use]
pub fn unfold_mod_folder(path: &str, folder: &str) -> String {
    path.replace(FOLDER_PLACEHOLDER, folder)
}

/// Merge one lower-priority document into the base document.
///
/// Returns the label of the rule that applied, or `None` when no rule
/// matched both documents.
pub fn merge_overlapping_documents(
    base: &mut AssetDocument,
    overlay: &AssetDocument,
    catalog: &OverlapCatalog,
) -> Result<Option<&'static str>> {
    for rule in catalog.rules() {
        let overlay_entries = overlay
            .region(rule.region)
            .and_then(|r| r.node(rule.container))
            .map(|n| n.children(rule.group));
        let base_container = base
            .region_mut(rule.region)
            .and_then(|r| r.node_mut(rule.container));
        let (Some(entries), Some(container)) = (overlay_entries, base_container) else {
            continue;
        };

        let existing: HashSet<String> = container
            .children(rule.group)
            .iter()
            .filter_map(|n| n.attribute_str(rule.dedup_attr))
            .collect();
        for entry in entries {
            let Some(key) = entry.attribute_str(rule.dedup_attr) else {
                tracing::warn!(
                    "{} entry without {} attribute, skipped",
                    rule.label,
                    rule.dedup_attr
                );
                continue;
            };
            if existing.contains(&key) {
                continue;
            }
            container.insert_child(rule.group, entry.clone(), None);
        }
        return Ok(Some(rule.label));
    }
    Ok(None)
}

/// A merged overlap file ready to be written to the output tree.
#[derive(Debug)]
pub struct MergedOverlapFile {
    /// Package-relative path (with the base mod's folder).
    pub path: String,
    /// The merged document.
    pub document: AssetDocument,
}

/// Find and merge every file shared by two or more mods.
///
/// Files are grouped by their folded path; the highest-priority copy is
/// the base, every other copy merges into it and lands in its owning
/// mod's exclusion set.
pub fn merge_overlapping_files<R, C>(
    mods: &[&ModInfo],
    catalog: &OverlapCatalog,
    reader: &R,
    codec: &C,
    cache: &mut PakContentsCache,
    exclusions: &mut ExclusionTracker,
    report: &mut Report,
    progress: &mut ProgressThrottle<'_>,
) -> Result<Vec<MergedOverlapFile>>
where
    R: PackageReader + ?Sized,
    C: TreeCodec + ?Sized,
{
    progress.emit_now(0, 0, "Merging overlapping files...");

    // folded path -> (base mod index, overlapping mod indices)
    let mut groups: IndexMap<String, (usize, Vec<usize>)> = IndexMap::new();
    for (mod_index, info) in mods.iter().enumerate() {
        for file in &info.files {
            if !is_mergeable(file) {
                continue;
            }
            let folded = fold_mod_folder(file);
            match groups.get_mut(&folded) {
                Some((_, overlapping)) => overlapping.push(mod_index),
                None => {
                    groups.insert(folded, (mod_index, Vec::new()));
                }
            }
        }
    }

    let total = groups.len();
    let mut merged = Vec::new();
    for (count, (folded, (base_index, overlapping))) in groups.iter().enumerate() {
        if overlapping.is_empty() {
            continue;
        }
        let base_info = mods[*base_index];
        let base_path = unfold_mod_folder(folded, &base_info.folder);
        progress.emit(
            count + 1,
            total,
            clip_message("Merging overlapping files: ", &base_path),
        );

        let base_doc = cache
            .extract_file(reader, &base_info.pak_path, &base_path)
            .and_then(|bytes| codec.parse(&bytes));
        let mut base_doc = match base_doc {
            Ok(doc) => doc,
            Err(err) => {
                report.add(format!("unreadable overlapping file {base_path}: {err}"));
                continue;
            }
        };

        for overlay_index in overlapping {
            let overlay_info = mods[*overlay_index];
            let overlay_path = unfold_mod_folder(folded, &overlay_info.folder);
            report.add(format!("merging files: {base_path} <- {overlay_path}"));
            let overlay_doc = cache
                .extract_file(reader, &overlay_info.pak_path, &overlay_path)
                .and_then(|bytes| codec.parse(&bytes));
            match overlay_doc {
                Ok(overlay_doc) => {
                    if let Some(label) =
                        merge_overlapping_documents(&mut base_doc, &overlay_doc, catalog)?
                    {
                        report.add(format!(
                            "merging {label}: {base_path} <- {overlay_path}"
                        ));
                    }
                    exclusions.add(&overlay_info.uuid, &overlay_path);
                }
                Err(err) => {
                    report.add(format!("unreadable overlapping file {overlay_path}: {err}"));
                }
            }
        }
        exclusions.add(&base_info.uuid, &base_path);
        merged.push(MergedOverlapFile {
            path: base_path,
            document: base_doc,
        });
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Attribute, Node, Region};

    fn make_gossip_doc(lines: &[(&str, &str)]) -> AssetDocument {
        let mut root = Node::new("root");
        for (uuid, text) in lines {
            let mut gossip = Node::new("Gossip");
            gossip
                .attributes
                .insert("DialogUUID".into(), Attribute::text("guid", *uuid));
            gossip
                .attributes
                .insert("Name".into(), Attribute::text("LSString", *text));
            root.insert_child("Gossips", gossip, None);
        }
        let mut region = Region::new("Gossips");
        region.nodes.push(root);
        let mut doc = AssetDocument::new(4, 0, 9, 330);
        doc.regions.push(region);
        doc
    }

    fn gossip_entries(doc: &AssetDocument) -> Vec<(String, String)> {
        doc.region("Gossips")
            .unwrap()
            .node("root")
            .unwrap()
            .children("Gossips")
            .iter()
            .map(|n| {
                (
                    n.attribute_str("DialogUUID").unwrap(),
                    n.attribute_str("Name").unwrap(),
                )
            })
            .collect()
    }

    /// Scenario C: line `g1` exists in A only, `g2` in both with
    /// different text. With A prioritized, A's `g1` and A's `g2`
    /// survive.
    #[test]
    fn test_first_seen_wins_keyed_merge() {
        let mut base = make_gossip_doc(&[("g1", "a-only"), ("g2", "a-version")]);
        let overlay = make_gossip_doc(&[("g2", "b-version"), ("g3", "b-only")]);
        let label =
            merge_overlapping_documents(&mut base, &overlay, &OverlapCatalog::new()).unwrap();
        assert_eq!(label, Some("gossips"));
        assert_eq!(
            gossip_entries(&base),
            [
                ("g1".to_string(), "a-only".to_string()),
                ("g2".to_string(), "a-version".to_string()),
                ("g3".to_string(), "b-only".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_rule_matches() {
        let mut base = AssetDocument::new(4, 0, 9, 330);
        let overlay = make_gossip_doc(&[("g1", "x")]);
        let label =
            merge_overlapping_documents(&mut base, &overlay, &OverlapCatalog::new()).unwrap();
        assert_eq!(label, None);
    }

    #[test]
    fn test_catalog_is_extensible() {
        let mut catalog = OverlapCatalog::new();
        catalog.push(OverlapRule {
            label: "origins",
            region: "Origins",
            container: "root",
            group: "Origin",
            dedup_attr: "GlobalTemplate",
        });
        assert_eq!(catalog.rules().len(), 5);
    }

    #[test]
    fn test_is_mergeable_excludes_merged_content() {
        assert!(!is_mergeable("Mods/Foo/Story/DialogsBinary/banter.lsf"));
        assert!(!is_mergeable("Public/Foo/Timeline/Generated/tl.lsf"));
        assert!(is_mergeable("Public/Foo/Content/visuals.lsf"));
        assert!(is_mergeable("Mods/Foo/Gossips/gossip.lsx"));
        assert!(!is_mergeable("Mods/Foo/Story/notes.txt"));
    }

    #[test]
    fn test_fold_unfold_mod_folder() {
        assert_eq!(
            fold_mod_folder("Public/FooMod/Content/visuals.lsf"),
            "Public/$ModName$/Content/visuals.lsf"
        );
        assert_eq!(
            fold_mod_folder("Generated/Public/FooMod/x.lsf"),
            "Generated/Public/$ModName$/x.lsf"
        );
        assert_eq!(
            unfold_mod_folder("Public/$ModName$/Content/visuals.lsf", "BarMod"),
            "Public/BarMod/Content/visuals.lsf"
        );
        assert_eq!(fold_mod_folder("meta.lsx"), "meta.lsx");
    }
}
