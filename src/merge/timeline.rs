//! Claim-based timeline merging.
//!
//! Timelines claim whole phases, not individual effects: once any
//! higher-priority mod touched a phase, every later entry in that phase
//! is skipped. Effects copied across timelines are re-based from the
//! source phase's start to the destination phase's start in exact
//! fixed-point arithmetic.

use std::collections::HashSet;

use crate::content::timeline::{
    EFFECT_PHASE_ATTR, TimelineTree, shift_effect_times,
};
use crate::diff::{DiffState, TimelineDiff};
use crate::error::{Error, Result};
use crate::tree::AttributeValue;

use super::report::Report;

/// Replay one source mod's timeline diff onto the destination.
///
/// `claimed_phases` carries every phase already decided by a
/// higher-priority mod; phases touched here are added to it after this
/// mod's entries are processed (a mod never blocks its own entries).
pub fn merge_timeline_effects(
    content_uuid: &str,
    destination: &mut TimelineTree,
    claimed_phases: &mut HashSet<String>,
    source: &TimelineTree,
    source_diff: &TimelineDiff,
    report: &mut Report,
) -> Result<()> {
    apply(
        content_uuid,
        destination,
        claimed_phases,
        source,
        source_diff,
        report,
    )
    .map_err(|err| Error::TimelineMergeFailed {
        content: content_uuid.to_string(),
        source: Box::new(err),
    })
}

fn apply(
    content_uuid: &str,
    destination: &mut TimelineTree,
    claimed_phases: &mut HashSet<String>,
    source: &TimelineTree,
    source_diff: &TimelineDiff,
    report: &mut Report,
) -> Result<()> {
    report.add(format!("merging timeline nodes for {content_uuid}"));
    let mut touched: HashSet<String> = HashSet::new();

    for (effect_id, entry) in source_diff {
        report.add(format!(
            "timeline node {effect_id}, diff {}, phase {}",
            entry.state, entry.phase
        ));
        if claimed_phases.contains(&entry.phase) {
            report.add(format!(
                "timeline phase {} is already changed in higher priority mod, skipped timeline node {effect_id}",
                entry.phase
            ));
            continue;
        }
        match entry.state {
            DiffState::Deleted => {
                if destination.remove_effect(effect_id)?.is_some() {
                    report.add(format!(
                        "timeline node {effect_id} is deleted in the source, removed it from the result"
                    ));
                }
                touched.insert(entry.phase.clone());
            }
            DiffState::Added | DiffState::Modified => {
                let destination_phase = if destination.has_phase(&entry.phase)? {
                    let phase = destination.require_phase(&entry.phase)?;
                    report.add(format!(
                        "timeline phase {} exists in the result, phase index {}",
                        entry.phase, phase.index
                    ));
                    phase
                } else {
                    let source_phase_node = source
                        .phase_node(&entry.phase)?
                        .ok_or_else(|| Error::MissingPhase {
                            phase: entry.phase.clone(),
                        })?
                        .clone();
                    let phase = destination.add_phase_from(&source_phase_node)?;
                    report.add(format!(
                        "timeline phase {} was created in the result, phase index {}",
                        entry.phase, phase.index
                    ));
                    phase
                };

                if destination.remove_effect(effect_id)?.is_some() {
                    report.add(format!(
                        "timeline phase {} in the result contains existing node {effect_id}, removed it",
                        entry.phase
                    ));
                }

                let effect = source
                    .find_effect(effect_id)?
                    .ok_or_else(|| Error::MissingDiffNode {
                        node: effect_id.clone(),
                        content: content_uuid.to_string(),
                    })?;
                let source_phase = source.require_phase(&entry.phase)?;
                let delta = destination_phase.start - source_phase.start;
                let mut rebased = shift_effect_times(effect, delta)?;
                rebased.set_attribute(
                    EFFECT_PHASE_ATTR,
                    AttributeValue::Text(destination_phase.index.to_string()),
                    None,
                )?;
                report.add(format!(
                    "normalized node {effect_id}, source phase start {}, start in the result {}",
                    source_phase.start, destination_phase.start
                ));
                destination.insert_effect(rebased)?;
                touched.insert(entry.phase.clone());
                report.add(format!(
                    "timeline phase {}, added node {effect_id} to the result",
                    entry.phase
                ));
            }
        }
    }

    claimed_phases.extend(touched);
    report.add(format!("finished merging timeline nodes for {content_uuid}"));
    Ok(())
}
