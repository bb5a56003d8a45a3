//! Resource bank aggregation across mods.
//!
//! Each mod may contribute dialog/timeline bank entries, voice soundbank
//! speaker maps and localization text lines. Entries whose backing file
//! was already folded into a merged artifact are skipped; everything
//! else is appended in mod-scan order, first seen wins.

use indexmap::IndexMap;

use crate::error::Result;
use crate::index::content::{
    DIALOG_BANK, RESOURCES_GROUP, TIMELINE_BANK, is_bank_path, normalize_dialog_source,
};
use crate::index::mod_info::ModInfo;
use crate::pak::{PackageReader, PakContentsCache, TreeCodec};
use crate::tree::{AssetDocument, Attribute, Node, Region};

use super::exclusion::ExclusionTracker;
use super::progress::{ProgressThrottle, clip_message};
use super::report::Report;

/// Region/node id of a voice metadata soundbank.
pub const VOICE_META: &str = "VoiceMetaData";
/// Speaker entry kind inside a soundbank.
pub const VOICE_SPEAKER: &str = "VoiceSpeakerMetaData";
/// Voice line entry kind inside a speaker map.
pub const VOICE_TEXT: &str = "VoiceTextMetaData";
/// Region/node id of aggregated localization text.
pub const LOCA_REGION: &str = "TranslatedContents";
/// Localization entry kind.
pub const LOCA_ENTRY: &str = "Content";
/// Group holding localization entries.
pub const LOCA_GROUP: &str = "Contents";

/// One aggregated localization line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaLine {
    /// Handle version.
    pub version: u16,
    /// The text.
    pub text: String,
}

/// Aggregated registries for every bank kind.
#[derive(Debug, Default)]
pub struct ResourceBanks {
    dialog_resources: Vec<Node>,
    timeline_resources: Vec<Node>,
    soundbanks: IndexMap<String, Vec<Node>>,
    loca: IndexMap<String, LocaLine>,
}

impl ResourceBanks {
    /// Create empty banks.
    #[must_use]
    pub fn new() -> Self {
        ResourceBanks::default()
    }

    /// Aggregated dialog bank resources.
    #[must_use]
    pub fn dialog_resources(&self) -> &[Node] {
        &self.dialog_resources
    }

    /// Aggregated timeline bank resources.
    #[must_use]
    pub fn timeline_resources(&self) -> &[Node] {
        &self.timeline_resources
    }

    /// Aggregated voice entries per speaker.
    #[must_use]
    pub fn soundbanks(&self) -> &IndexMap<String, Vec<Node>> {
        &self.soundbanks
    }

    /// Aggregated localization lines, keyed by handle.
    #[must_use]
    pub fn loca_lines(&self) -> &IndexMap<String, LocaLine> {
        &self.loca
    }

    /// Append a dialog bank resource; duplicates by UUID are dropped.
    pub fn add_dialog_resource(&mut self, resource: Node) -> bool {
        add_unique(&mut self.dialog_resources, resource, "UUID")
    }

    /// Append a timeline bank resource; duplicates by UUID are dropped.
    pub fn add_timeline_resource(&mut self, resource: Node) -> bool {
        add_unique(&mut self.timeline_resources, resource, "UUID")
    }

    /// Append a voice entry under a speaker; duplicates by handle are
    /// dropped.
    pub fn add_voice_entry(&mut self, speaker: &str, entry: Node) -> bool {
        add_unique(
            self.soundbanks.entry(speaker.to_string()).or_default(),
            entry,
            "MapKey",
        )
    }

    /// Record a localization line; the first mod to supply a handle wins.
    pub fn add_loca_line(&mut self, handle: &str, version: u16, text: &str) -> bool {
        if self.loca.contains_key(handle) {
            return false;
        }
        self.loca.insert(
            handle.to_string(),
            LocaLine {
                version,
                text: text.to_string(),
            },
        );
        true
    }

    /// Build the aggregate dialog bank document.
    #[must_use]
    pub fn dialog_bank_document(&self) -> AssetDocument {
        bank_document(DIALOG_BANK, &self.dialog_resources)
    }

    /// Build the aggregate timeline bank document.
    #[must_use]
    pub fn timeline_bank_document(&self) -> AssetDocument {
        bank_document(TIMELINE_BANK, &self.timeline_resources)
    }

    /// Build one speaker's aggregate soundbank document.
    #[must_use]
    pub fn soundbank_document(&self, speaker: &str) -> Option<AssetDocument> {
        let entries = self.soundbanks.get(speaker)?;
        let mut speaker_node = Node::new(VOICE_SPEAKER);
        speaker_node
            .attributes
            .insert("MapKey".into(), Attribute::text("FixedString", speaker));
        for entry in entries {
            speaker_node.insert_child(VOICE_TEXT, entry.clone(), None);
        }
        let mut container = Node::new(VOICE_META);
        container.insert_child(VOICE_SPEAKER, speaker_node, None);
        let mut region = Region::new(VOICE_META);
        region.nodes.push(container);
        let mut doc = AssetDocument::new(4, 0, 9, 330);
        doc.regions.push(region);
        Some(doc)
    }

    /// Build the aggregate localization document.
    #[must_use]
    pub fn loca_document(&self) -> AssetDocument {
        let mut container = Node::new(LOCA_REGION);
        for (handle, line) in &self.loca {
            let mut entry = Node::new(LOCA_ENTRY);
            entry
                .attributes
                .insert("ContentUid".into(), Attribute::text("FixedString", handle));
            entry.attributes.insert(
                "Version".into(),
                Attribute::text("uint16", line.version.to_string()),
            );
            entry
                .attributes
                .insert("Text".into(), Attribute::text("LSString", &line.text));
            container.insert_child(LOCA_GROUP, entry, None);
        }
        let mut region = Region::new(LOCA_REGION);
        region.nodes.push(container);
        let mut doc = AssetDocument::new(4, 0, 9, 330);
        doc.regions.push(region);
        doc
    }
}

fn add_unique(list: &mut Vec<Node>, node: Node, key_attr: &str) -> bool {
    let key = node.attribute_str(key_attr);
    let duplicate = key.as_ref().is_some_and(|k| {
        list.iter()
            .any(|n| n.attribute_str(key_attr).as_ref() == Some(k))
    });
    if duplicate {
        return false;
    }
    list.push(node);
    true
}

fn bank_document(bank_kind: &str, resources: &[Node]) -> AssetDocument {
    let mut container = Node::new(bank_kind);
    for resource in resources {
        container.insert_child(RESOURCES_GROUP, resource.clone(), None);
    }
    let mut region = Region::new(bank_kind);
    region.nodes.push(container);
    let mut doc = AssetDocument::new(4, 0, 9, 330);
    doc.regions.push(region);
    doc
}

/// Whether a path is a voice soundbank file.
fn is_soundbank_path(path: &str) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() > 4
        && parts[0] == "Mods"
        && parts[2] == "Localization"
        && parts[4] == "Soundbanks"
        && path.ends_with(".lsf")
}

/// Whether a path is a localization text file.
fn is_loca_path(path: &str) -> bool {
    if !(path.ends_with(".loca") || path.ends_with(".xml")) {
        return false;
    }
    if path.starts_with("Localization/") {
        return true;
    }
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() > 2 && parts[0] == "Mods" && parts[2] == "Localization"
}

/// Fold every mod's registries into the aggregate banks.
///
/// Entries whose backing file sits in the owning mod's exclusion set
/// were already merged by the conflict pass and are skipped; the
/// registry files themselves are excluded from the later bulk copy.
pub fn merge_resource_banks<R, C>(
    banks: &mut ResourceBanks,
    mods: &[&ModInfo],
    reader: &R,
    codec: &C,
    cache: &mut PakContentsCache,
    exclusions: &mut ExclusionTracker,
    report: &mut Report,
    progress: &mut ProgressThrottle<'_>,
) -> Result<()>
where
    R: PackageReader + ?Sized,
    C: TreeCodec + ?Sized,
{
    let total: usize = mods.iter().map(|m| m.files.len()).sum();
    let mut count = 0;

    for info in mods {
        for file in &info.files {
            count += 1;
            progress.emit(
                count,
                total,
                clip_message("Processing resource banks: ", file),
            );

            if is_bank_path(file) {
                let Some(doc) = read_registry_file(reader, codec, cache, info, file, report)
                else {
                    continue;
                };
                merge_bank_file(banks, info, file, &doc, exclusions, report);
            } else if is_soundbank_path(file) {
                let Some(doc) = read_registry_file(reader, codec, cache, info, file, report)
                else {
                    continue;
                };
                merge_soundbank_file(banks, info, file, &doc, exclusions, report);
            } else if is_loca_path(file) {
                let Some(doc) = read_registry_file(reader, codec, cache, info, file, report)
                else {
                    continue;
                };
                exclusions.add(&info.uuid, file);
                merge_loca_file(banks, &doc);
                report.add(format!("merged the text bank: {file}"));
            }
        }
    }
    Ok(())
}

/// Extract and parse one registry file; failures are scoped to the
/// entry: reported, and the scan continues.
fn read_registry_file<R, C>(
    reader: &R,
    codec: &C,
    cache: &mut PakContentsCache,
    info: &ModInfo,
    file: &str,
    report: &mut Report,
) -> Option<AssetDocument>
where
    R: PackageReader + ?Sized,
    C: TreeCodec + ?Sized,
{
    let bytes = match cache.extract_file(reader, &info.pak_path, file) {
        Ok(bytes) => bytes,
        Err(err) => {
            report.add(format!("unreadable package entry {file}: {err}"));
            return None;
        }
    };
    match codec.parse(&bytes) {
        Ok(doc) => Some(doc),
        Err(err) => {
            report.add(format!("unparsable registry file {file}: {err}"));
            None
        }
    }
}

fn merge_bank_file(
    banks: &mut ResourceBanks,
    info: &ModInfo,
    file: &str,
    doc: &AssetDocument,
    exclusions: &mut ExclusionTracker,
    report: &mut Report,
) {
    if let Some(bank) = doc.region(DIALOG_BANK).and_then(|r| r.node(DIALOG_BANK)) {
        let resources = bank.children(RESOURCES_GROUP);
        if !resources.is_empty() {
            report.add(format!(
                "found dialog bank {file} with {} resources",
                resources.len()
            ));
            exclusions.add(&info.uuid, file);
            for resource in resources {
                let Some(source) = resource.attribute_str("SourceFile") else {
                    report.add(format!("dialog bank entry without SourceFile in {file}"));
                    continue;
                };
                let source = normalize_dialog_source(&source);
                if exclusions.contains(&info.uuid, &source) {
                    report.add(format!(
                        "not added to the dialog bank because this file is in exclusion list: {source}"
                    ));
                } else if banks.add_dialog_resource(resource.clone()) {
                    report.add(format!("added to the dialog bank: {source}"));
                } else {
                    report.add(format!("already in the dialog bank, skipped: {source}"));
                }
            }
        }
    }
    if let Some(bank) = doc.region(TIMELINE_BANK).and_then(|r| r.node(TIMELINE_BANK)) {
        let resources = bank.children(RESOURCES_GROUP);
        if !resources.is_empty() {
            report.add(format!(
                "found timeline bank {file} with {} resources",
                resources.len()
            ));
            exclusions.add(&info.uuid, file);
            for resource in resources {
                let Some(source) = resource.attribute_str("SourceFile") else {
                    report.add(format!("timeline bank entry without SourceFile in {file}"));
                    continue;
                };
                if exclusions.contains(&info.uuid, &source) {
                    report.add(format!(
                        "not added to the timeline bank because this file is in exclusion list: {source}"
                    ));
                } else if banks.add_timeline_resource(resource.clone()) {
                    report.add(format!("added to the timeline bank: {source}"));
                } else {
                    report.add(format!("already in the timeline bank, skipped: {source}"));
                }
            }
        }
    }
}

fn merge_soundbank_file(
    banks: &mut ResourceBanks,
    info: &ModInfo,
    file: &str,
    doc: &AssetDocument,
    exclusions: &mut ExclusionTracker,
    report: &mut Report,
) {
    let Some(container) = doc.region(VOICE_META).and_then(|r| r.node(VOICE_META)) else {
        return;
    };
    for speaker in container.children(VOICE_SPEAKER) {
        let Some(speaker_uuid) = speaker.attribute_str("MapKey") else {
            report.add(format!("soundbank speaker without MapKey in {file}"));
            continue;
        };
        let entries = speaker.children(VOICE_TEXT);
        if entries.is_empty() {
            continue;
        }
        report.add(format!(
            "found sound (voice text) bank {file} with {} resources",
            entries.len()
        ));
        exclusions.add(&info.uuid, file);
        for entry in entries {
            let Some(handle) = entry.attribute_str("MapKey") else {
                report.add(format!("voice entry without MapKey in {file}"));
                continue;
            };
            if banks.add_voice_entry(&speaker_uuid, entry.clone()) {
                report.add(format!("added to the sound bank {speaker_uuid}: {handle}"));
            }
        }
    }
}

fn merge_loca_file(banks: &mut ResourceBanks, doc: &AssetDocument) {
    let Some(container) = doc.region(LOCA_REGION).and_then(|r| r.node(LOCA_REGION)) else {
        return;
    };
    for entry in container.children(LOCA_GROUP) {
        let (Some(handle), Some(text)) = (
            entry.attribute_str("ContentUid"),
            entry.attribute_str("Text"),
        ) else {
            continue;
        };
        let version = entry
            .attribute_str("Version")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        banks.add_loca_line(&handle, version, &text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_resource(uuid: &str, source: &str) -> Node {
        let mut n = Node::new("Resource");
        n.attributes
            .insert("UUID".into(), Attribute::text("FixedString", uuid));
        n.attributes
            .insert("SourceFile".into(), Attribute::text("LSString", source));
        n
    }

    #[test]
    fn test_distinct_loca_entries_both_kept() {
        // two mods each add a distinct localization entry; both land in
        // the aggregate exactly once, under either priority order
        let mut banks = ResourceBanks::new();
        assert!(banks.add_loca_line("h1", 1, "first"));
        assert!(banks.add_loca_line("h2", 1, "second"));
        assert_eq!(banks.loca_lines().len(), 2);

        let mut reversed = ResourceBanks::new();
        assert!(reversed.add_loca_line("h2", 1, "second"));
        assert!(reversed.add_loca_line("h1", 1, "first"));
        assert_eq!(reversed.loca_lines().len(), 2);
        assert_eq!(reversed.loca_lines()["h1"].text, "first");
    }

    #[test]
    fn test_loca_first_seen_wins() {
        let mut banks = ResourceBanks::new();
        assert!(banks.add_loca_line("h1", 1, "priority"));
        assert!(!banks.add_loca_line("h1", 2, "lower"));
        assert_eq!(banks.loca_lines()["h1"].text, "priority");
        assert_eq!(banks.loca_lines()["h1"].version, 1);
    }

    #[test]
    fn test_dialog_resource_dedup_by_uuid() {
        let mut banks = ResourceBanks::new();
        assert!(banks.add_dialog_resource(make_resource("d1", "a.lsf")));
        assert!(!banks.add_dialog_resource(make_resource("d1", "b.lsf")));
        assert_eq!(banks.dialog_resources().len(), 1);
        assert_eq!(
            banks.dialog_resources()[0].attribute_str("SourceFile").unwrap(),
            "a.lsf"
        );
    }

    #[test]
    fn test_bank_document_roundtrip_shape() {
        let mut banks = ResourceBanks::new();
        banks.add_dialog_resource(make_resource("d1", "a.lsf"));
        let doc = banks.dialog_bank_document();
        let bank = doc.region(DIALOG_BANK).unwrap().node(DIALOG_BANK).unwrap();
        assert_eq!(bank.children(RESOURCES_GROUP).len(), 1);
    }

    #[test]
    fn test_loca_document_contains_lines() {
        let mut banks = ResourceBanks::new();
        banks.add_loca_line("h1", 3, "hello");
        let doc = banks.loca_document();
        let mut round = ResourceBanks::new();
        merge_loca_file(&mut round, &doc);
        assert_eq!(round.loca_lines()["h1"].version, 3);
        assert_eq!(round.loca_lines()["h1"].text, "hello");
    }

    #[test]
    fn test_path_classifiers() {
        assert!(is_soundbank_path(
            "Mods/Foo/Localization/English/Soundbanks/v_speaker.lsf"
        ));
        assert!(!is_soundbank_path("Mods/Foo/Localization/English/x.lsf"));
        assert!(is_loca_path("Localization/English/foo.loca"));
        assert!(is_loca_path("Mods/Foo/Localization/english.xml"));
        assert!(!is_loca_path("Mods/Foo/Localization/banks.lsf"));
    }
}
