//! Set diff over timeline effects, with phase attribution.
//!
//! Every entry records the beat UUID of the phase owning the effect so
//! the merge engine can skip an entire phase once a higher-priority mod
//! has touched it. Effect offsets are compared phase-relative: re-laying
//! out phases moves every absolute offset, and that alone must not flag
//! each effect as modified.

use indexmap::IndexMap;

use crate::content::timeline::{EFFECT_ID_ATTR, TimelineTree, shift_effect_times};
use crate::error::Result;
use crate::tree::{Node, node_signature};

use super::types::{DiffState, TimelineDiff, TimelineDiffEntry};

/// Set diff over all effect nodes, keyed by effect ID.
pub fn diff_timeline_effects(
    baseline: &TimelineTree,
    candidate: &TimelineTree,
) -> Result<TimelineDiff> {
    let base_effects = index_effects(baseline)?;
    let cand_effects = index_effects(candidate)?;

    let mut result = TimelineDiff::new();
    for (id, (_, phase)) in &base_effects {
        if !cand_effects.contains_key(id) {
            result.insert(
                id.clone(),
                TimelineDiffEntry {
                    state: DiffState::Deleted,
                    phase: phase.clone(),
                },
            );
        }
    }
    for (id, (cand_node, cand_phase)) in &cand_effects {
        match base_effects.get(id) {
            None => {
                result.insert(
                    id.clone(),
                    TimelineDiffEntry {
                        state: DiffState::Added,
                        phase: cand_phase.clone(),
                    },
                );
            }
            Some((base_node, base_phase)) => {
                let moved = base_phase != cand_phase;
                let changed = relative_signature(baseline, base_node)?
                    != relative_signature(candidate, cand_node)?;
                if moved || changed {
                    result.insert(
                        id.clone(),
                        TimelineDiffEntry {
                            state: DiffState::Modified,
                            phase: cand_phase.clone(),
                        },
                    );
                }
            }
        }
    }
    Ok(result)
}

/// Effect ID -> (node, owning phase UUID), in document order.
fn index_effects(tree: &TimelineTree) -> Result<IndexMap<String, (&Node, String)>> {
    let mut map = IndexMap::new();
    for node in tree.effect_nodes()? {
        let id = node.required_str(EFFECT_ID_ATTR)?;
        let phase = tree.effect_phase(node)?;
        map.insert(id, (node, phase.uuid));
    }
    Ok(map)
}

/// Canonical signature of an effect with its offsets re-based to the
/// start of its owning phase.
fn relative_signature(tree: &TimelineTree, effect: &Node) -> Result<String> {
    let phase = tree.effect_phase(effect)?;
    let normalized = shift_effect_times(effect, -phase.start)?;
    Ok(node_signature(&normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::timeline::test_support::make_timeline;

    #[test]
    fn test_identical_timelines_empty_diff() {
        let a = make_timeline(&[("p1", "10.0")], &[("e1", 0, "1.0", "2.0")]);
        let b = make_timeline(&[("p1", "10.0")], &[("e1", 0, "1.0", "2.0")]);
        assert!(diff_timeline_effects(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn test_added_effect_records_phase() {
        let a = make_timeline(&[("p1", "10.0"), ("p2", "5.0")], &[]);
        let b = make_timeline(
            &[("p1", "10.0"), ("p2", "5.0")],
            &[("e1", 1, "11.0", "12.0")],
        );
        let diff = diff_timeline_effects(&a, &b).unwrap();
        assert_eq!(diff["e1"].state, DiffState::Added);
        assert_eq!(diff["e1"].phase, "p2");
    }

    #[test]
    fn test_deleted_effect_records_baseline_phase() {
        let a = make_timeline(&[("p1", "10.0")], &[("e1", 0, "1.0", "2.0")]);
        let b = make_timeline(&[("p1", "10.0")], &[]);
        let diff = diff_timeline_effects(&a, &b).unwrap();
        assert_eq!(diff["e1"].state, DiffState::Deleted);
        assert_eq!(diff["e1"].phase, "p1");
    }

    #[test]
    fn test_phase_relayout_alone_is_not_a_change() {
        // p1 grows from 10 to 12 seconds, shifting p2's absolute start;
        // the effect inside p2 keeps its phase-relative offset
        let a = make_timeline(
            &[("p1", "10.0"), ("p2", "5.0")],
            &[("e1", 1, "11.0", "12.0")],
        );
        let b = make_timeline(
            &[("p1", "12.0"), ("p2", "5.0")],
            &[("e1", 1, "13.0", "14.0")],
        );
        let diff = diff_timeline_effects(&a, &b).unwrap();
        assert_eq!(diff.get("e1"), None);
    }

    #[test]
    fn test_offset_change_within_phase_detected() {
        let a = make_timeline(&[("p1", "10.0")], &[("e1", 0, "1.0", "2.0")]);
        let b = make_timeline(&[("p1", "10.0")], &[("e1", 0, "1.5", "2.0")]);
        let diff = diff_timeline_effects(&a, &b).unwrap();
        assert_eq!(diff["e1"].state, DiffState::Modified);
    }

    #[test]
    fn test_effect_moved_between_phases_detected() {
        let a = make_timeline(
            &[("p1", "10.0"), ("p2", "5.0")],
            &[("e1", 0, "1.0", "2.0")],
        );
        let b = make_timeline(
            &[("p1", "10.0"), ("p2", "5.0")],
            &[("e1", 1, "11.0", "12.0")],
        );
        let diff = diff_timeline_effects(&a, &b).unwrap();
        assert_eq!(diff["e1"].state, DiffState::Modified);
        assert_eq!(diff["e1"].phase, "p2");
    }
}
