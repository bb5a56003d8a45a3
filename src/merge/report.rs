//! The decision report.
//!
//! Every claim, skip, copy and rename made during a resolution run lands
//! here, timestamped. The report is a required engine output - conflict
//! resolution is unauditable without it - and the worklog file is
//! written on every exit path, success or failure.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};

use crate::error::Result;

/// Timestamped append-only report of every decision made during a run.
#[derive(Debug, Default)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Report::default()
    }

    /// Append a timestamped line. Also emitted via `tracing`.
    pub fn add(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!("{message}");
        self.lines
            .push(format!("{}: {message}", Utc::now().format("%Y-%m-%d %H:%M:%S")));
    }

    /// The report lines accumulated so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Discard all lines. Called at the start of each run.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The report as a JSON array, for machine consumption.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.lines)?)
    }

    /// Flush the report to a timestamped worklog file.
    ///
    /// The file name records the run outcome:
    /// `worklog-{success|failure}-YYYYMMDD-HHMMSS.txt`.
    pub fn write_worklog(&self, dir: &Path, success: bool) -> Result<PathBuf> {
        let suffix = if success { "success" } else { "failure" };
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("worklog-{suffix}-{stamp}.txt"));
        std::fs::create_dir_all(dir)?;
        let mut file = std::fs::File::create(&path)?;
        for line in &self.lines {
            writeln!(file, "{line}")?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_timestamped() {
        let mut report = Report::new();
        report.add("resolved something");
        assert_eq!(report.lines().len(), 1);
        assert!(report.lines()[0].ends_with(": resolved something"));
    }

    #[test]
    fn test_json_dump() {
        let mut report = Report::new();
        report.add("claimed node n1");
        let json = report.to_json().unwrap();
        let lines: Vec<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("claimed node n1"));
    }

    #[test]
    fn test_worklog_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new();
        report.add("first");
        report.add("second");
        let path = report.write_worklog(dir.path(), false).unwrap();
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("worklog-failure-")
        );
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("first"));
    }
}
