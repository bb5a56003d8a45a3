//! Bulk file copy from unpacked mods into the output tree.
//!
//! Runs last, after merging: every non-excluded file is transferred,
//! with the mod-folder path segment remapped to the output mod's folder.
//! A file already present at the destination is resolved by a fixed
//! per-path-pattern policy, never by raising.

use std::path::Path;

use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::Result;

use super::exclusion::{ExclusionTracker, normalize_path};
use super::progress::{ProgressThrottle, clip_message};
use super::report::Report;

/// How to resolve a destination file that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Append the source's text to the destination (stats entries).
    AppendText,
    /// Copy under a new name with a random suffix (osiris goal scripts).
    RenameWithSuffix,
    /// Leave the destination alone and log the skip.
    Skip,
}

/// The fixed policy for a destination path.
#[must_use]
pub fn duplicate_policy(dest: &str) -> DuplicatePolicy {
    if dest.contains("/Stats/") {
        DuplicatePolicy::AppendText
    } else if dest.contains("/Story/RawFiles/Goals/") && dest.ends_with(".txt") {
        DuplicatePolicy::RenameWithSuffix
    } else {
        DuplicatePolicy::Skip
    }
}

/// Remap the mod-folder path segment of a relative path to the output
/// mod's folder.
#[must_use]
pub fn remap_mod_folder(relative: &str, folder: &str) -> String {
    let mut parts: Vec<String> = relative.split('/').map(ToString::to_string).collect();
    if parts.len() > 2 && (parts[0] == "Mods" || parts[0] == "Public") {
        parts[1] = folder.to_string();
    }
    if parts.len() > 3 && parts[0] == "Generated" && parts[1] == "Public" {
        parts[2] = folder.to_string();
    }
    parts.join("/")
}

/// Copy one unpacked mod tree into the output tree.
///
/// Excluded files are skipped with a report line; duplicate
/// destinations follow [`duplicate_policy`].
pub fn copy_mod_files(
    src_root: &Path,
    dest_root: &Path,
    mod_folder: &str,
    mod_uuid: &str,
    exclusions: &ExclusionTracker,
    report: &mut Report,
    progress: &mut ProgressThrottle<'_>,
) -> Result<()> {
    report.add(format!(
        "copying files from mod {mod_uuid}, source root path {}, destination root path {}",
        src_root.display(),
        dest_root.display()
    ));

    let files: Vec<walkdir::DirEntry> = WalkDir::new(src_root)
        .sort_by_file_name()
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .collect();
    let total = files.len();

    for (count, entry) in files.iter().enumerate() {
        let src_path = entry.path();
        let relative = normalize_path(
            &src_path
                .strip_prefix(src_root)
                .map_or_else(|_| src_path.to_string_lossy().into_owned(), |p| {
                    p.to_string_lossy().into_owned()
                }),
        );
        progress.emit(count + 1, total, clip_message("Copying files: ", &relative));

        if exclusions.contains(mod_uuid, &relative) {
            report.add(format!(
                "skipped {relative} because it is in exclusion list of [{mod_uuid}]"
            ));
            continue;
        }

        let remapped = remap_mod_folder(&relative, mod_folder);
        let dest_path = dest_root.join(&remapped);
        if dest_path.is_file() {
            match duplicate_policy(&remapped) {
                DuplicatePolicy::AppendText => {
                    append_text(&dest_path, src_path)?;
                    report.add(format!(
                        "a file already exists at destination {remapped}, merged text from {relative}"
                    ));
                }
                DuplicatePolicy::RenameWithSuffix => {
                    let suffix = Uuid::new_v4().to_string();
                    let renamed = remapped.replace(
                        ".txt",
                        &format!("{}.txt", &suffix[..8]),
                    );
                    let renamed_path = dest_root.join(&renamed);
                    report.add(format!("copying {relative} to {renamed}"));
                    copy_file(src_path, &renamed_path)?;
                }
                DuplicatePolicy::Skip => {
                    report.add(format!(
                        "a file already exists at destination {remapped}, skipped copying {relative}"
                    ));
                }
            }
        } else {
            report.add(format!("copying {relative} to {remapped}"));
            copy_file(src_path, &dest_path)?;
        }
    }

    report.add(format!("finished copying files from mod {mod_uuid}"));
    Ok(())
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dest)?;
    Ok(())
}

fn append_text(dest: &Path, src: &Path) -> Result<()> {
    use std::io::Write;
    let content = std::fs::read_to_string(src)?;
    let mut file = std::fs::OpenOptions::new().append(true).open(dest)?;
    writeln!(file)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_plain_copy_with_folder_remap() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "Mods/OldFolder/ScriptExtender/config.json", "{}");

        let mut report = Report::new();
        let mut progress = ProgressThrottle::new(None);
        copy_mod_files(
            src.path(),
            dest.path(),
            "NewFolder",
            "m1",
            &ExclusionTracker::new(),
            &mut report,
            &mut progress,
        )
        .unwrap();

        assert!(
            dest.path()
                .join("Mods/NewFolder/ScriptExtender/config.json")
                .is_file()
        );
    }

    #[test]
    fn test_excluded_file_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "Mods/Foo/Story/DialogsBinary/banter.lsf", "x");

        let mut exclusions = ExclusionTracker::new();
        exclusions.add("m1", "Mods/Foo/Story/DialogsBinary/banter.lsf");
        let mut report = Report::new();
        let mut progress = ProgressThrottle::new(None);
        copy_mod_files(
            src.path(),
            dest.path(),
            "Foo",
            "m1",
            &exclusions,
            &mut report,
            &mut progress,
        )
        .unwrap();

        assert!(
            !dest
                .path()
                .join("Mods/Foo/Story/DialogsBinary/banter.lsf")
                .exists()
        );
    }

    #[test]
    fn test_stats_duplicate_appends() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "Public/Foo/Stats/Generated/Data/armor.txt", "from-src");
        write(dest.path(), "Public/Out/Stats/Generated/Data/armor.txt", "existing");

        let mut report = Report::new();
        let mut progress = ProgressThrottle::new(None);
        copy_mod_files(
            src.path(),
            dest.path(),
            "Out",
            "m1",
            &ExclusionTracker::new(),
            &mut report,
            &mut progress,
        )
        .unwrap();

        let merged = std::fs::read_to_string(
            dest.path().join("Public/Out/Stats/Generated/Data/armor.txt"),
        )
        .unwrap();
        assert!(merged.starts_with("existing"));
        assert!(merged.contains("from-src"));
    }

    #[test]
    fn test_goal_duplicate_renamed() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "Mods/Foo/Story/RawFiles/Goals/quest.txt", "src");
        write(dest.path(), "Mods/Out/Story/RawFiles/Goals/quest.txt", "dst");

        let mut report = Report::new();
        let mut progress = ProgressThrottle::new(None);
        copy_mod_files(
            src.path(),
            dest.path(),
            "Out",
            "m1",
            &ExclusionTracker::new(),
            &mut report,
            &mut progress,
        )
        .unwrap();

        let goals_dir = dest.path().join("Mods/Out/Story/RawFiles/Goals");
        let entries: Vec<_> = std::fs::read_dir(&goals_dir).unwrap().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            std::fs::read_to_string(goals_dir.join("quest.txt")).unwrap(),
            "dst"
        );
    }

    #[test]
    fn test_other_duplicate_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(src.path(), "Public/Foo/Assets/model.gr2", "src");
        write(dest.path(), "Public/Out/Assets/model.gr2", "dst");

        let mut report = Report::new();
        let mut progress = ProgressThrottle::new(None);
        copy_mod_files(
            src.path(),
            dest.path(),
            "Out",
            "m1",
            &ExclusionTracker::new(),
            &mut report,
            &mut progress,
        )
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.path().join("Public/Out/Assets/model.gr2")).unwrap(),
            "dst"
        );
    }
}
