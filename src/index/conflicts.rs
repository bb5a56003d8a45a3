//! Conflict detection across scanned mods.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::mod_info::ModRegistry;

/// A set of mods jointly touching the same content, plus that content.
///
/// Two overlapping-but-not-identical contributor sets are different
/// groups: content contested by `{A, B}` is tracked separately from
/// content contested by `{A, B, C}`. A mod with no overlapping
/// contributors still yields a singleton group (empty content list) so
/// every mod appears somewhere in the caller's UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictGroup {
    /// Contributing mod UUIDs, sorted.
    pub mods: Vec<String>,
    /// Contested content UUIDs, sorted. Empty for singleton groups.
    pub contents: Vec<String>,
}

impl ConflictGroup {
    /// Whether more than one mod contributes.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.mods.len() > 1
    }

    /// Human-readable group name for UI and report lines.
    #[must_use]
    pub fn display_name(&self, registry: &ModRegistry) -> String {
        let names: Vec<String> = self
            .mods
            .iter()
            .map(|uuid| {
                registry
                    .get(uuid)
                    .map_or_else(|_| uuid.clone(), |m| m.short_name.clone())
            })
            .collect();
        if self.is_conflict() {
            format!("CONFLICT: {}", names.join("/"))
        } else {
            format!("MOD: {}", names.join("/"))
        }
    }
}

/// Group every scanned mod by contested content.
///
/// Output is stable and order-independent for the same input set:
/// contributor tuples and content lists are sorted before grouping, and
/// groups are emitted in sorted-tuple order, singletons last.
#[must_use]
pub fn detect_conflicts(registry: &ModRegistry) -> Vec<ConflictGroup> {
    // content UUID -> sorted contributing mods
    let mut contributors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for info in registry.mods() {
        for content_uuid in info.content.content_uuids() {
            contributors
                .entry(content_uuid)
                .or_default()
                .insert(info.uuid.as_str());
        }
    }
    contributors.retain(|_, mods| mods.len() > 1);

    // sorted contributor tuple -> contested content
    let mut grouped: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
    for (content_uuid, mods) in &contributors {
        let key: Vec<String> = mods.iter().map(ToString::to_string).collect();
        grouped.entry(key).or_default().push((*content_uuid).to_string());
    }

    let mut result = Vec::new();
    let mut conflicted_mods: BTreeSet<&str> = BTreeSet::new();
    for (mods, mut contents) in grouped {
        contents.sort_unstable();
        for uuid in &mods {
            if let Ok(info) = registry.get(uuid) {
                conflicted_mods.insert(info.uuid.as_str());
            }
        }
        result.push(ConflictGroup { mods, contents });
    }

    let mut singles: Vec<&str> = registry
        .mods()
        .iter()
        .filter(|m| !conflicted_mods.contains(m.uuid.as_str()))
        .map(|m| m.uuid.as_str())
        .collect();
    singles.sort_unstable();
    for uuid in singles {
        result.push(ConflictGroup {
            mods: vec![uuid.to_string()],
            contents: Vec::new(),
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::content::ContentIndex;
    use crate::index::mod_info::{ModInfo, ModVersion, make_short_name};

    fn make_registry(mods: &[(&str, &[&str])]) -> ModRegistry {
        let mut registry = ModRegistry::new();
        for (uuid, contents) in mods {
            let mut content = ContentIndex::default();
            for c in *contents {
                content.test_insert(c);
            }
            registry.register(ModInfo {
                uuid: (*uuid).to_string(),
                name: format!("Mod {uuid}"),
                short_name: make_short_name(&format!("Mod {uuid}")),
                description: String::new(),
                author: "Anonymous".to_string(),
                folder: format!("Folder{uuid}"),
                version: ModVersion::default(),
                pak_path: format!("/mods/{uuid}.pak").into(),
                files: Vec::new(),
                content,
            });
        }
        registry
    }

    #[test]
    fn test_two_mods_same_content_conflict() {
        let registry = make_registry(&[("m1", &["c1"]), ("m2", &["c1"])]);
        let groups = detect_conflicts(&registry);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].mods, ["m1", "m2"]);
        assert_eq!(groups[0].contents, ["c1"]);
        assert!(groups[0].is_conflict());
    }

    #[test]
    fn test_overlapping_contributor_sets_stay_separate() {
        // c1 touched by {m1, m2}; c2 touched by {m1, m2, m3}
        let registry = make_registry(&[
            ("m1", &["c1", "c2"]),
            ("m2", &["c1", "c2"]),
            ("m3", &["c2"]),
        ]);
        let groups = detect_conflicts(&registry);
        let conflicted: Vec<&ConflictGroup> = groups.iter().filter(|g| g.is_conflict()).collect();
        assert_eq!(conflicted.len(), 2);
        assert!(conflicted
            .iter()
            .any(|g| g.mods == ["m1", "m2"] && g.contents == ["c1"]));
        assert!(conflicted
            .iter()
            .any(|g| g.mods == ["m1", "m2", "m3"] && g.contents == ["c2"]));
    }

    #[test]
    fn test_unconflicted_mod_yields_singleton() {
        let registry = make_registry(&[("m1", &["c1"]), ("m2", &["c1"]), ("m3", &["c9"])]);
        let groups = detect_conflicts(&registry);
        let single = groups.iter().find(|g| !g.is_conflict()).unwrap();
        assert_eq!(single.mods, ["m3"]);
        assert!(single.contents.is_empty());
    }

    #[test]
    fn test_detection_is_order_independent() {
        let a = detect_conflicts(&make_registry(&[
            ("m1", &["c1"]),
            ("m2", &["c1", "c2"]),
            ("m3", &["c2"]),
        ]));
        let b = detect_conflicts(&make_registry(&[
            ("m3", &["c2"]),
            ("m1", &["c1"]),
            ("m2", &["c2", "c1"]),
        ]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_content_in_exactly_one_group() {
        let registry = make_registry(&[
            ("m1", &["c1", "c2"]),
            ("m2", &["c1"]),
            ("m3", &["c2", "c3"]),
        ]);
        let groups = detect_conflicts(&registry);
        let mut seen: Vec<&str> = Vec::new();
        for g in &groups {
            for c in &g.contents {
                assert!(!seen.contains(&c.as_str()), "content {c} in two groups");
                seen.push(c);
            }
        }
        assert!(seen.contains(&"c1"));
        assert!(seen.contains(&"c2"));
        // c3 has a single contributor: no conflict entry
        assert!(!seen.contains(&"c3"));
    }
}
