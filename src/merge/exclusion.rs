//! Per-mod exclusion tracking.
//!
//! Every file consumed as a merge source is recorded here under its
//! owning mod; the final bulk copy consults the tracker so already
//! merged content is not also copied verbatim. Matching is by path
//! suffix: the same relative tail matches regardless of which root the
//! path was observed under.

use std::collections::BTreeMap;

/// Normalize path separators to forward slashes. Case is preserved.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Append-only, per-mod record of files folded into a merge.
#[derive(Debug, Default)]
pub struct ExclusionTracker {
    files: BTreeMap<String, Vec<String>>,
}

impl ExclusionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        ExclusionTracker::default()
    }

    /// Forget everything. Called at the start of each resolution run.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Record a consumed file under its owning mod.
    pub fn add(&mut self, mod_uuid: &str, path: &str) {
        let normalized = normalize_path(path);
        tracing::debug!("exclusion list of [{mod_uuid}] += {normalized}");
        self.files
            .entry(mod_uuid.to_string())
            .or_default()
            .push(normalized);
    }

    /// Whether a path is excluded for a mod, by suffix match.
    #[must_use]
    pub fn contains(&self, mod_uuid: &str, path: &str) -> bool {
        let Some(entries) = self.files.get(mod_uuid) else {
            return false;
        };
        let normalized = normalize_path(path);
        entries.iter().any(|e| normalized.ends_with(e.as_str()))
    }

    /// Snapshot of the tracker for the run outcome.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.files.clone()
    }
}
