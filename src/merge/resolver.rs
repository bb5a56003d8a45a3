//! The resolution run.
//!
//! One run: scan mods, detect conflicts, then resolve a chosen set of
//! conflicts under a caller-supplied priority order. Every engine
//! failure is caught at this boundary and converted into a success flag
//! plus message; the report worklog is flushed on every exit path.
//!
//! Runs are sequential and self-contained - a run owns its registry,
//! conflict groups and exclusion tracker, and two concurrent runs must
//! not share a resolver or target the same output directory.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::content::dialog::DialogTree;
use crate::content::timeline::TimelineTree;
use crate::diff::{
    NodeDiff, diff_dialog_nodes, diff_dialog_roots, diff_timeline_effects,
};
use crate::error::{Error, Result};
use crate::index::conflicts::{ConflictGroup, detect_conflicts};
use crate::index::content::ContentBundle;
use crate::index::mod_info::{ModInfo, ModRegistry, make_short_name};
use crate::pak::{PackageReader, PackageWriter, PakContentsCache, TreeCodec};
use crate::tree::{AssetDocument, Node};

use super::banks::{ResourceBanks, merge_resource_banks};
use super::copy::{copy_mod_files, remap_mod_folder};
use super::engine::merge_dialog_nodes;
use super::exclusion::{ExclusionTracker, normalize_path};
use super::meta::{OutputModMetadata, build_meta_document};
use super::overlap::{OverlapCatalog, merge_overlapping_files};
use super::progress::{ProgressCallback, ProgressThrottle, clip_message};
use super::report::Report;
use super::timeline::merge_timeline_effects;

/// Osiris story-compilation artifacts that must never be copied into a
/// merged mod.
const OSIRIS_CLUTTER: &[&str] = &[
    "/Story/story_ac.dat",
    "/Story/story.div",
    "/Story/story.div.osi",
    "/Story/goals.raw",
    "/Story/log.txt",
    "/Story/story_orphanqueries_found.txt",
    "/Story/story_orphanqueries_ignore.txt",
    "/Story/RawFiles/story_definitions.div",
    "/Story/RawFiles/story_header.div",
];

/// Supplies the pre-mod (vanilla) variants of contested content.
///
/// Diffs are computed against the vanilla asset when one exists;
/// otherwise the highest-priority mod's variant stands in as the
/// reference baseline.
pub trait BaselineProvider {
    /// Vanilla dialog document for a content UUID.
    fn dialog(&self, content_uuid: &str) -> Result<Option<AssetDocument>>;

    /// Vanilla timeline document for a content UUID.
    fn timeline(&self, content_uuid: &str) -> Result<Option<AssetDocument>>;

    /// Vanilla dialog bank resource node.
    fn dialog_resource(&self, content_uuid: &str) -> Result<Option<Node>>;

    /// Vanilla timeline bank resource node.
    fn timeline_resource(&self, content_uuid: &str) -> Result<Option<Node>>;

    /// Display name of a dialog, for report lines.
    fn dialog_name(&self, content_uuid: &str) -> Option<String>;
}

/// A provider with no vanilla assets; the highest-priority mod always
/// becomes the baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBaselines;

impl BaselineProvider for NoBaselines {
    fn dialog(&self, _content_uuid: &str) -> Result<Option<AssetDocument>> {
        Ok(None)
    }

    fn timeline(&self, _content_uuid: &str) -> Result<Option<AssetDocument>> {
        Ok(None)
    }

    fn dialog_resource(&self, _content_uuid: &str) -> Result<Option<Node>> {
        Ok(None)
    }

    fn timeline_resource(&self, _content_uuid: &str) -> Result<Option<Node>> {
        Ok(None)
    }

    fn dialog_name(&self, _content_uuid: &str) -> Option<String> {
        None
    }
}

/// How a resolution run treats files outside the selected conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionMethod {
    /// Resolve conflicts and fold every mod into one output package.
    Merge,
    /// Resolve only the selected conflicts; the output package carries
    /// nothing but the merged content.
    Patch,
}

/// Inputs to one resolution run.
#[derive(Debug, Clone)]
pub struct ResolutionSettings {
    /// Indices into the detected conflict groups.
    pub chosen_conflicts: Vec<usize>,
    /// Mod UUIDs, highest priority first.
    pub priority_order: Vec<String>,
    /// Output mod identity; defaults to the highest-priority mod's.
    pub metadata: Option<OutputModMetadata>,
    /// Merge or patch.
    pub method: ResolutionMethod,
}

/// One resolved content UUID's merged trees.
#[derive(Debug)]
pub struct MergedContent {
    /// Merged dialog document.
    pub dialog: Option<AssetDocument>,
    /// Package-relative path the dialog was written to.
    pub dialog_path: Option<String>,
    /// Merged timeline document.
    pub timeline: Option<AssetDocument>,
    /// Package-relative path the timeline was written to.
    pub timeline_path: Option<String>,
}

/// Everything a resolution run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Whether the run completed.
    pub success: bool,
    /// Human-readable completion or failure message.
    pub message: String,
    /// Merged trees per resolved content UUID.
    pub merged: IndexMap<String, MergedContent>,
    /// Aggregated registries.
    pub banks: ResourceBanks,
    /// Exclusion tracker snapshot: mod UUID -> consumed files.
    pub exclusions: BTreeMap<String, Vec<String>>,
    /// The full report.
    pub report: Vec<String>,
    /// Where the worklog was flushed, when the write succeeded.
    pub worklog_path: Option<PathBuf>,
    /// The built output package, on success.
    pub package_path: Option<PathBuf>,
}

/// The conflict resolution engine.
pub struct ConflictResolver<'a, R, C, W, B>
where
    R: PackageReader + ?Sized,
    C: TreeCodec + ?Sized,
    W: PackageWriter + ?Sized,
    B: BaselineProvider + ?Sized,
{
    reader: &'a R,
    codec: &'a C,
    writer: &'a W,
    baselines: &'a B,
    catalog: OverlapCatalog,
    output_root: PathBuf,
    registry: ModRegistry,
    conflicts: Vec<ConflictGroup>,
    report: Report,
    exclusions: ExclusionTracker,
}

impl<'a, R, C, W, B> ConflictResolver<'a, R, C, W, B>
where
    R: PackageReader + ?Sized,
    C: TreeCodec + ?Sized,
    W: PackageWriter + ?Sized,
    B: BaselineProvider + ?Sized,
{
    /// Create a resolver writing into `output_root`.
    pub fn new(
        reader: &'a R,
        codec: &'a C,
        writer: &'a W,
        baselines: &'a B,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        ConflictResolver {
            reader,
            codec,
            writer,
            baselines,
            catalog: OverlapCatalog::new(),
            output_root: output_root.into(),
            registry: ModRegistry::new(),
            conflicts: Vec::new(),
            report: Report::new(),
            exclusions: ExclusionTracker::new(),
        }
    }

    /// The overlap catalog, for registering extra asset kinds.
    pub fn catalog_mut(&mut self) -> &mut OverlapCatalog {
        &mut self.catalog
    }

    /// The scanned mod registry.
    #[must_use]
    pub fn registry(&self) -> &ModRegistry {
        &self.registry
    }

    /// The detected conflict groups.
    #[must_use]
    pub fn conflicts(&self) -> &[ConflictGroup] {
        &self.conflicts
    }

    /// Scan a set of mod packages.
    pub fn scan_mods(
        &mut self,
        paks: &[PathBuf],
        cache: &mut PakContentsCache,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<()> {
        let mut progress = ProgressThrottle::new(progress);
        for (i, pak) in paks.iter().enumerate() {
            progress.emit_now(
                i + 1,
                paks.len(),
                clip_message(
                    &format!("[{:3}/{:3}] Reading pak file: ", i + 1, paks.len()),
                    &pak.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                ),
            );
            self.registry
                .scan_package(pak, self.reader, self.codec, cache)?;
        }
        Ok(())
    }

    /// Run conflict detection over the scanned mods.
    ///
    /// Returns whether any genuine conflict exists.
    pub fn detect(&mut self) -> bool {
        self.conflicts = detect_conflicts(&self.registry);
        self.report.add("=== conflict detection results ===");
        let mut found = false;
        for group in &self.conflicts {
            if !group.is_conflict() {
                continue;
            }
            found = true;
            self.report
                .add(format!("conflict detected: {}", group.display_name(&self.registry)));
            for content_uuid in &group.contents {
                let name = self
                    .baselines
                    .dialog_name(content_uuid)
                    .unwrap_or_default();
                self.report.add(format!("{content_uuid} {name}"));
            }
        }
        self.report.add("=== === ===");
        found
    }

    /// Resolve the selected conflicts.
    ///
    /// Never returns `Err`: failures land in the outcome's success flag
    /// and message, and the worklog is flushed regardless.
    pub fn resolve(
        &mut self,
        settings: &ResolutionSettings,
        cache: &mut PakContentsCache,
        progress: Option<ProgressCallback<'_>>,
    ) -> RunOutcome {
        self.report.clear();
        self.exclusions.clear();
        let mut merged = IndexMap::new();
        let mut banks = ResourceBanks::new();

        let run = self.run(settings, cache, &mut merged, &mut banks, progress);
        let (success, message, package_path) = match run {
            Ok(package_path) => (true, "Success".to_string(), package_path),
            Err(err) => {
                self.report.add(format!("run failed: {err}"));
                (false, err.to_string(), None)
            }
        };

        let worklog_path = match self.report.write_worklog(&self.output_root, success) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::error!("failed to flush worklog: {err}");
                None
            }
        };

        RunOutcome {
            success,
            message,
            merged,
            banks,
            exclusions: self.exclusions.snapshot(),
            report: self.report.lines().to_vec(),
            worklog_path,
            package_path,
        }
    }

    fn run(
        &mut self,
        settings: &ResolutionSettings,
        cache: &mut PakContentsCache,
        merged: &mut IndexMap<String, MergedContent>,
        banks: &mut ResourceBanks,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<Option<PathBuf>> {
        let mut progress = ProgressThrottle::new(progress);
        progress.emit_now(0, 0, "Getting ready...");
        self.report.add("*** resolve_conflicts ***");

        let first_uuid = settings
            .priority_order
            .first()
            .ok_or_else(|| Error::Invariant("empty priority order".to_string()))?
            .clone();

        // output mod identity
        let (out_name, out_uuid, out_folder) = match &settings.metadata {
            Some(meta) => {
                let short = make_short_name(&meta.name);
                let folder = format!("{short}_{}", meta.uuid);
                (short, meta.uuid.clone(), folder)
            }
            None => {
                let info = self.registry.get(&first_uuid)?;
                (info.short_name.clone(), info.uuid.clone(), info.folder.clone())
            }
        };
        self.report
            .add(format!("result mod name = {out_name}, mod uuid = {out_uuid}"));

        // output directory is scoped to this run
        let out_dir = self.output_root.join("output");
        if out_dir.exists() {
            std::fs::remove_dir_all(&out_dir)?;
        }
        std::fs::create_dir_all(&out_dir)?;

        if let Some(meta) = &settings.metadata {
            // the generated meta.lsx replaces the first mod's
            self.exclusions.add(&first_uuid, "/meta.lsx");
            let doc = build_meta_document(meta, &out_folder);
            let rel = format!("Mods/{out_folder}/meta.lsx");
            self.write_document(&out_dir, &rel, &doc)?;
            self.report.add(format!("generated {rel}"));
        }

        self.report.add("mod priority order:");
        let mut order: Vec<ModInfo> = Vec::new();
        for uuid in &settings.priority_order {
            let info = self.registry.get(uuid)?.clone();
            self.report.add(format!("{} [{}]", info.name, info.uuid));
            order.push(info);
        }

        // selected conflicts
        let mut selected: Vec<String> = Vec::new();
        for index in &settings.chosen_conflicts {
            let group = self.conflicts.get(*index).ok_or_else(|| {
                Error::Invariant(format!("conflict index {index} out of range"))
            })?;
            if group.mods.is_empty() {
                return Err(Error::EmptyConflictGroup);
            }
            selected.extend(group.contents.iter().cloned());
        }

        let total = selected.len();
        for (count, content_uuid) in selected.iter().enumerate() {
            let name = self
                .baselines
                .dialog_name(content_uuid)
                .unwrap_or_else(|| content_uuid.clone());
            progress.emit_now(
                count + 1,
                total,
                clip_message("Resolving conflicts in ", &name),
            );
            match self.merge_conflicting_content(content_uuid, &order, cache, banks) {
                Ok(content) => {
                    merged.insert(content_uuid.clone(), content);
                }
                Err(err) if is_run_fatal(&err) => return Err(err),
                Err(err) => {
                    // scoped to this content UUID; the rest of the run
                    // continues
                    self.report
                        .add(format!("failed to resolve content {content_uuid}: {err}"));
                }
            }
        }

        // write merged trees into the output
        for (content_uuid, content) in merged.iter() {
            if let (Some(doc), Some(path)) = (&content.dialog, &content.dialog_path) {
                let rel = remap_mod_folder(&normalize_path(path), &out_folder);
                self.write_document(&out_dir, &rel, doc)?;
                self.report
                    .add(format!("added dialog {content_uuid} to the build, file name {rel}"));
            }
            if let (Some(doc), Some(path)) = (&content.timeline, &content.timeline_path) {
                let rel = remap_mod_folder(&normalize_path(path), &out_folder);
                self.write_document(&out_dir, &rel, doc)?;
                self.report.add(format!(
                    "added timeline {content_uuid} to the build, file name {rel}"
                ));
            }
        }

        if settings.method == ResolutionMethod::Merge {
            for info in &order {
                for clutter in OSIRIS_CLUTTER {
                    self.exclusions.add(&info.uuid, clutter);
                }
            }
            for info in order.iter().skip(1) {
                self.exclusions.add(&info.uuid, "/meta.lsx");
                self.exclusions.add(&info.uuid, "/mod_publish_logo.png");
            }

            let mod_refs: Vec<&ModInfo> = order.iter().collect();
            merge_resource_banks(
                banks,
                &mod_refs,
                self.reader,
                self.codec,
                cache,
                &mut self.exclusions,
                &mut self.report,
                &mut progress,
            )?;

            let overlap_files = merge_overlapping_files(
                &mod_refs,
                &self.catalog,
                self.reader,
                self.codec,
                cache,
                &mut self.exclusions,
                &mut self.report,
                &mut progress,
            )?;
            for file in overlap_files {
                let rel = remap_mod_folder(&file.path, &out_folder);
                self.write_document(&out_dir, &rel, &file.document)?;
                self.report.add(format!("added merged overlap file {rel}"));
            }

            self.write_banks(&out_dir, &out_name, &out_folder, banks)?;

            for info in &order {
                progress.emit_now(0, 0, clip_message("Unpacking ", &info.name));
                let src_root = self.unpack_mod(info, cache)?;
                copy_mod_files(
                    &src_root,
                    &out_dir,
                    &out_folder,
                    &info.uuid,
                    &self.exclusions,
                    &mut self.report,
                    &mut progress,
                )?;
            }
        } else {
            self.write_banks(&out_dir, &out_name, &out_folder, banks)?;
        }

        progress.emit_now(0, 0, "Building package...");
        let bytes = self.writer.create_package(&out_dir)?;
        let package_path = self.output_root.join(format!("{out_name}.pak"));
        std::fs::write(&package_path, bytes)?;
        self.report
            .add(format!("built package {}", package_path.display()));
        Ok(Some(package_path))
    }

    /// Resolve one contested content UUID across the priority order.
    fn merge_conflicting_content(
        &mut self,
        content_uuid: &str,
        order: &[ModInfo],
        cache: &mut PakContentsCache,
        banks: &mut ResourceBanks,
    ) -> Result<MergedContent> {
        let display = self
            .baselines
            .dialog_name(content_uuid)
            .unwrap_or_else(|| content_uuid.to_string());
        self.report
            .add(format!("resolving conflicts in dialog {display}"));

        let mut result_dialog: Option<DialogTree> = None;
        let mut reference_dialog: Option<DialogTree> = None;
        let mut dialog_path: Option<String> = None;
        let mut dialog_resource: Option<Node> = None;
        let mut claimed = NodeDiff::new();
        let mut claimed_roots = NodeDiff::new();

        let mut result_timeline: Option<TimelineTree> = None;
        let mut reference_timeline: Option<TimelineTree> = None;
        let mut timeline_path: Option<String> = None;
        let mut timeline_resource: Option<Node> = None;
        let mut claimed_phases: HashSet<String> = HashSet::new();

        for info in order {
            if !info.content.has_content(content_uuid) {
                continue;
            }
            let bundle: ContentBundle = info
                .content
                .bundle(content_uuid)
                .cloned()
                .unwrap_or_default();

            // ==================== dialog ====================
            if let Some(dialog_file) = &bundle.dialog_file {
                let doc = self.load_packaged_document(info, dialog_file, cache)?;
                let tree = DialogTree::new(doc)?;
                if let Some(result) = result_dialog.as_mut() {
                    self.report.add(format!(
                        "merging dialog {display} from mod {} [{}]",
                        info.short_name, info.uuid
                    ));
                    self.exclusions.add(&info.uuid, dialog_file);
                    let reference = reference_dialog.as_ref().unwrap_or(&tree);
                    let diff = diff_dialog_nodes(reference, &tree)?;
                    let root_diff = diff_dialog_roots(reference, &tree)?;
                    merge_dialog_nodes(
                        content_uuid,
                        result,
                        &mut claimed,
                        &mut claimed_roots,
                        &tree,
                        &diff,
                        &root_diff,
                        &mut self.report,
                    )?;
                    if dialog_path.is_none() {
                        dialog_path = Some(dialog_file.clone());
                    }
                } else {
                    self.report.add(format!(
                        "baseline dialog {display} is taken from mod {} [{}]",
                        info.short_name, info.uuid
                    ));
                    self.exclusions.add(&info.uuid, dialog_file);
                    let reference = match self.baselines.dialog(content_uuid)? {
                        Some(doc) => DialogTree::new(doc)?,
                        None => tree.clone(),
                    };
                    claimed = diff_dialog_nodes(&reference, &tree)?;
                    claimed_roots = diff_dialog_roots(&reference, &tree)?;
                    dialog_path = Some(dialog_file.clone());
                    reference_dialog = Some(reference);
                    result_dialog = Some(tree);
                }
                if dialog_resource.is_none() {
                    dialog_resource = match bundle.dialog_resource.clone() {
                        Some(resource) => Some(resource),
                        None => self.baselines.dialog_resource(content_uuid)?,
                    };
                }
            } else if result_dialog.is_none() {
                // this mod touches the content without shipping the
                // dialog itself; the vanilla dialog becomes the base
                let doc = self
                    .baselines
                    .dialog(content_uuid)?
                    .ok_or_else(|| Error::MissingBaseline {
                        content: content_uuid.to_string(),
                    })?;
                self.report
                    .add(format!("baseline dialog {display} is taken from the vanilla game"));
                let tree = DialogTree::new(doc)?;
                reference_dialog = Some(tree.clone());
                result_dialog = Some(tree);
                dialog_resource = self.baselines.dialog_resource(content_uuid)?;
            }

            // ==================== timeline ====================
            if let Some(timeline_file) = &bundle.timeline_file {
                let doc = self.load_packaged_document(info, timeline_file, cache)?;
                let tree = TimelineTree::new(doc)?;
                if let Some(result) = result_timeline.as_mut() {
                    self.report.add(format!(
                        "merging timeline {display} from mod {} [{}]",
                        info.short_name, info.uuid
                    ));
                    self.exclusions.add(&info.uuid, timeline_file);
                    self.exclusions
                        .add(&info.uuid, &timeline_file.replace(".lsf", "_Scene.lsf"));
                    let reference = reference_timeline.as_ref().unwrap_or(&tree);
                    let diff = diff_timeline_effects(reference, &tree)?;
                    merge_timeline_effects(
                        content_uuid,
                        result,
                        &mut claimed_phases,
                        &tree,
                        &diff,
                        &mut self.report,
                    )?;
                    if timeline_path.is_none() {
                        timeline_path = Some(timeline_file.clone());
                    }
                } else {
                    self.report.add(format!(
                        "baseline timeline {display} is taken from mod {} [{}]",
                        info.short_name, info.uuid
                    ));
                    self.exclusions.add(&info.uuid, timeline_file);
                    let reference = match self.baselines.timeline(content_uuid)? {
                        Some(doc) => TimelineTree::new(doc)?,
                        None => tree.clone(),
                    };
                    let base_diff = diff_timeline_effects(&reference, &tree)?;
                    for entry in base_diff.values() {
                        claimed_phases.insert(entry.phase.clone());
                    }
                    timeline_path = Some(timeline_file.clone());
                    reference_timeline = Some(reference);
                    result_timeline = Some(tree);
                }
                if timeline_resource.is_none() {
                    timeline_resource = match bundle.timeline_resource.clone() {
                        Some(resource) => Some(resource),
                        None => self.baselines.timeline_resource(content_uuid)?,
                    };
                }
            } else if result_timeline.is_none()
                && let Some(doc) = self.baselines.timeline(content_uuid)?
            {
                self.report.add(format!(
                    "baseline timeline {display} is taken from the vanilla game"
                ));
                let tree = TimelineTree::new(doc)?;
                reference_timeline = Some(tree.clone());
                result_timeline = Some(tree);
                timeline_resource = self.baselines.timeline_resource(content_uuid)?;
            }
        }

        if result_dialog.is_none() && result_timeline.is_none() {
            self.report.add(format!(
                "no mod in the priority order supplies content {content_uuid}"
            ));
        }

        if let Some(resource) = dialog_resource
            && banks.add_dialog_resource(resource)
        {
            self.report
                .add(format!("added dialog {display} to the dialog bank"));
        }
        if let Some(resource) = timeline_resource
            && banks.add_timeline_resource(resource)
        {
            self.report
                .add(format!("added timeline {display} to the timeline bank"));
        }
        self.report.add(format!(
            "finished resolving conflicts in dialog {display}"
        ));

        Ok(MergedContent {
            dialog: result_dialog.map(DialogTree::into_document),
            dialog_path,
            timeline: result_timeline.map(TimelineTree::into_document),
            timeline_path,
        })
    }

    fn load_packaged_document(
        &self,
        info: &ModInfo,
        path: &str,
        cache: &mut PakContentsCache,
    ) -> Result<AssetDocument> {
        let bytes = cache.extract_file(self.reader, &info.pak_path, path)?;
        self.codec.parse(&bytes)
    }

    fn write_document(&self, out_dir: &Path, relative: &str, doc: &AssetDocument) -> Result<()> {
        let bytes = self.codec.serialize(doc)?;
        let path = out_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn write_banks(
        &mut self,
        out_dir: &Path,
        out_name: &str,
        out_folder: &str,
        banks: &ResourceBanks,
    ) -> Result<()> {
        if !banks.dialog_resources().is_empty() {
            let rel = format!("Public/{out_folder}/Content/MergedDialogBank.lsf");
            self.write_document(out_dir, &rel, &banks.dialog_bank_document())?;
            self.report.add(format!("wrote aggregate dialog bank {rel}"));
        }
        if !banks.timeline_resources().is_empty() {
            let rel = format!("Public/{out_folder}/Content/MergedTimelineBank.lsf");
            self.write_document(out_dir, &rel, &banks.timeline_bank_document())?;
            self.report
                .add(format!("wrote aggregate timeline bank {rel}"));
        }
        let speakers: Vec<String> = banks.soundbanks().keys().cloned().collect();
        for speaker in speakers {
            if let Some(doc) = banks.soundbank_document(&speaker) {
                let rel = format!(
                    "Mods/{out_folder}/Localization/English/Soundbanks/v_{speaker}.lsf"
                );
                self.write_document(out_dir, &rel, &doc)?;
                self.report.add(format!("wrote aggregate soundbank {rel}"));
            }
        }
        if !banks.loca_lines().is_empty() {
            let rel = format!("Localization/English/{out_name}.loca");
            self.write_document(out_dir, &rel, &banks.loca_document())?;
            self.report.add(format!("wrote aggregate text bank {rel}"));
        }
        Ok(())
    }

    fn unpack_mod(&mut self, info: &ModInfo, cache: &mut PakContentsCache) -> Result<PathBuf> {
        let dest = self.output_root.join("build").join(&info.uuid);
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        std::fs::create_dir_all(&dest)?;
        for file in &info.files {
            let bytes = match cache.extract_file(self.reader, &info.pak_path, file) {
                Ok(bytes) => bytes,
                Err(err) => {
                    self.report
                        .add(format!("unreadable package entry {file}: {err}"));
                    continue;
                }
            };
            let path = dest.join(normalize_path(file));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, bytes)?;
        }
        Ok(dest)
    }
}

/// Whether an error indicates a bug upstream of the engine; these abort
/// the whole run instead of one content UUID.
fn is_run_fatal(err: &Error) -> bool {
    match err {
        Error::Invariant(_) | Error::EmptyConflictGroup => true,
        Error::DialogMergeFailed { source, .. } | Error::TimelineMergeFailed { source, .. } => {
            is_run_fatal(source)
        }
        _ => false,
    }
}
