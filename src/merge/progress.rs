//! Progress reporting for long resolution runs.
//!
//! The host's callback must never become the bottleneck, so per-file
//! loops emit through a throttle that fires at most once a second;
//! phase transitions emit immediately.

use std::time::{Duration, Instant};

/// Longest progress message before truncation.
const PROGRESS_MSG_LEN: usize = 72;

/// Minimum interval between throttled emissions.
const THROTTLE: Duration = Duration::from_secs(1);

/// One progress update.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Current item number (1-indexed), 0 for indeterminate.
    pub current: usize,
    /// Total number of items, 0 for indeterminate.
    pub total: usize,
    /// Short human-readable message.
    pub message: String,
}

/// Progress callback type for resolution runs.
pub type ProgressCallback<'a> = &'a (dyn Fn(&Progress) + Sync + Send);

/// Truncate a message to the display width, keeping the tail of the
/// path-like part visible.
#[must_use]
pub fn clip_message(prefix: &str, detail: &str) -> String {
    let full = format!("{prefix}{detail}");
    if full.len() <= PROGRESS_MSG_LEN {
        return full;
    }
    let overflow = full.len() - PROGRESS_MSG_LEN;
    if let Some(tail) = detail.get(overflow + 3..) {
        format!("{prefix}...{tail}")
    } else {
        let mut clipped: String = full.chars().take(PROGRESS_MSG_LEN - 3).collect();
        clipped.push_str("...");
        clipped
    }
}

/// Rate-limited progress emitter.
pub struct ProgressThrottle<'a> {
    callback: Option<ProgressCallback<'a>>,
    last: Option<Instant>,
}

impl<'a> ProgressThrottle<'a> {
    /// Wrap an optional callback.
    #[must_use]
    pub fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        ProgressThrottle {
            callback,
            last: None,
        }
    }

    /// Emit unconditionally (phase transitions).
    pub fn emit_now(&mut self, current: usize, total: usize, message: impl Into<String>) {
        if let Some(cb) = self.callback {
            cb(&Progress {
                current,
                total,
                message: message.into(),
            });
            self.last = Some(Instant::now());
        }
    }

    /// Emit if at least a second has passed since the last emission.
    pub fn emit(&mut self, current: usize, total: usize, message: impl Into<String>) {
        let due = self.last.is_none_or(|t| t.elapsed() >= THROTTLE);
        if self.callback.is_some() && due {
            self.emit_now(current, total, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_message_keeps_tail() {
        let long = "a/".repeat(60);
        let clipped = clip_message("Copying files: ", &long);
        assert_eq!(clipped.len(), PROGRESS_MSG_LEN);
        assert!(clipped.starts_with("Copying files: ..."));
        assert!(clipped.ends_with("a/"));
    }

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(clip_message("Reading: ", "meta.lsx"), "Reading: meta.lsx");
    }

    #[test]
    fn test_throttle_suppresses_rapid_emissions() {
        let count = std::sync::atomic::AtomicUsize::new(0);
        let cb = |_: &Progress| {
            count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        };
        let mut throttle = ProgressThrottle::new(Some(&cb));
        for i in 0..100 {
            throttle.emit(i, 100, "working");
        }
        // only the first emission fits inside the window
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
