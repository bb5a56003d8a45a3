//! Order diff over two ordered key sequences.
//!
//! This is a pure function over key lists - no tree or file access - so
//! the anchor-walk rules are unit testable in isolation.

use std::collections::HashSet;

use super::types::{DiffState, NodeDiff};

/// Diff the positions of keys between a baseline and a candidate
/// sequence.
///
/// Keys present on only one side are classified Added/Deleted. For keys
/// present in both:
/// - first in both, or last in both: unchanged (boundary anchors are
///   exempt - their movement is a weak signal already captured by the
///   set diff);
/// - first or last in exactly one: Modified;
/// - otherwise the anchor walk applies: scan forward from the
///   candidate's position to the next candidate key that is not itself
///   new-in-candidate, and compare it with the baseline's immediate
///   successor. Anything other than an exact match is Modified.
///
/// The walk over new-in-candidate keys is what keeps anchors stable when
/// an unrelated mod inserted siblings between two previously adjacent
/// keys: naive adjacent-pair comparison would flag both neighbors.
#[must_use]
pub fn diff_key_order(baseline: &[String], candidate: &[String]) -> NodeDiff {
    let base_len = baseline.len();
    let cand_len = candidate.len();
    let base_set: HashSet<&str> = baseline.iter().map(String::as_str).collect();
    let cand_set: HashSet<&str> = candidate.iter().map(String::as_str).collect();

    let mut result = NodeDiff::new();
    for key in baseline {
        if !cand_set.contains(key.as_str()) {
            result.insert(key.clone(), DiffState::Deleted);
        }
    }
    for key in candidate {
        if !base_set.contains(key.as_str()) {
            result.insert(key.clone(), DiffState::Added);
        }
    }

    for (cand_idx, key) in candidate.iter().enumerate() {
        let Some(base_idx) = baseline.iter().position(|k| k == key) else {
            continue;
        };
        let first_in_base = base_idx == 0;
        let first_in_cand = cand_idx == 0;
        let last_in_base = base_idx + 1 == base_len;
        let last_in_cand = cand_idx + 1 == cand_len;

        if (first_in_base && first_in_cand) || (last_in_base && last_in_cand) {
            continue;
        }
        if first_in_base != first_in_cand || last_in_base != last_in_cand {
            result.insert(key.clone(), DiffState::Modified);
            continue;
        }

        // anchor walk: next candidate key that also exists in baseline
        let base_successor = baseline[base_idx + 1].as_str();
        let cand_successor = candidate[cand_idx + 1..]
            .iter()
            .find(|k| base_set.contains(k.as_str()))
            .map_or("", String::as_str);
        if base_successor != cand_successor {
            result.insert(key.clone(), DiffState::Modified);
        }
    }

    result
}
