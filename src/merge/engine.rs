//! Claim-based dialogue merging.
//!
//! The destination starts as the highest-priority mod's dialogue; every
//! later mod's diff is replayed on top, but only for keys no earlier mod
//! has claimed. First claim wins.

use std::collections::HashSet;

use crate::content::dialog::DialogTree;
use crate::diff::{DiffState, NodeDiff};
use crate::error::{Error, Result};

use super::report::Report;

/// Replay one source mod's dialogue diff onto the destination.
///
/// `claimed`/`claimed_roots` carry every key already decided by a
/// higher-priority mod; keys applied here are added to them.
pub fn merge_dialog_nodes(
    content_uuid: &str,
    destination: &mut DialogTree,
    claimed: &mut NodeDiff,
    claimed_roots: &mut NodeDiff,
    source: &DialogTree,
    source_diff: &NodeDiff,
    source_root_diff: &NodeDiff,
    report: &mut Report,
) -> Result<()> {
    apply(
        content_uuid,
        destination,
        claimed,
        claimed_roots,
        source,
        source_diff,
        source_root_diff,
        report,
    )
    .map_err(|err| Error::DialogMergeFailed {
        content: content_uuid.to_string(),
        source: Box::new(err),
    })
}

fn apply(
    content_uuid: &str,
    destination: &mut DialogTree,
    claimed: &mut NodeDiff,
    claimed_roots: &mut NodeDiff,
    source: &DialogTree,
    source_diff: &NodeDiff,
    source_root_diff: &NodeDiff,
    report: &mut Report,
) -> Result<()> {
    report.add(format!("merging dialog nodes for {content_uuid}"));

    for (node_uuid, state) in source_diff {
        report.add(format!("dialog node {node_uuid}, diff {state}"));
        if claimed.contains_key(node_uuid) {
            report.add(format!(
                "dialog node {node_uuid} is already changed in higher priority mod, skipped"
            ));
            continue;
        }
        match state {
            DiffState::Deleted => {
                // node content deletions carry no payload; root-order
                // entries are where deletions take effect
                report.add(format!("dialog node {node_uuid} is deleted, no action"));
            }
            DiffState::Added | DiffState::Modified => {
                if destination.has_node(node_uuid)? {
                    destination.delete_node(node_uuid)?;
                    report.add(format!(
                        "dialog node {node_uuid}, found and removed existing node"
                    ));
                }
                let node = source
                    .find_node(node_uuid)?
                    .ok_or_else(|| Error::MissingDiffNode {
                        node: node_uuid.clone(),
                        content: content_uuid.to_string(),
                    })?
                    .clone();
                destination.add_node(node)?;
                claimed.insert(node_uuid.clone(), *state);
                report.add(format!("copied dialog node {node_uuid} into the result"));
            }
        }
    }

    let source_roots = source.root_uuids()?;
    for (root_uuid, state) in source_root_diff {
        report.add(format!("root dialog node {root_uuid}, diff {state}"));
        if claimed_roots.contains_key(root_uuid) {
            report.add(format!(
                "root dialog node {root_uuid} is already changed in higher priority mod, skipped"
            ));
            continue;
        }
        match state {
            DiffState::Deleted => {
                destination.remove_root(root_uuid)?;
                claimed_roots.insert(root_uuid.clone(), *state);
                report.add(format!(
                    "root dialog node {root_uuid} is deleted, removed it from the result"
                ));
            }
            DiffState::Added | DiffState::Modified => {
                let destination_roots: HashSet<String> =
                    destination.root_uuids()?.into_iter().collect();
                // anchor on the next source root that survives in the
                // destination; unrelated mods may have inserted siblings
                // in between
                let source_pos = source_roots.iter().position(|u| u == root_uuid);
                let anchor = source_pos.and_then(|pos| {
                    source_roots[pos + 1..]
                        .iter()
                        .find(|u| destination_roots.contains(*u))
                });
                if destination_roots.contains(root_uuid) {
                    destination.remove_root(root_uuid)?;
                    report.add(format!(
                        "root dialog node {root_uuid}, removed existing entry from the result"
                    ));
                }
                match anchor {
                    Some(next) => {
                        destination.add_root_before(next, root_uuid)?;
                        report.add(format!(
                            "root dialog node {root_uuid}, added to the result before {next}"
                        ));
                    }
                    None => {
                        destination.add_root(root_uuid)?;
                        report.add(format!(
                            "root dialog node {root_uuid}, added to the tail of the result"
                        ));
                    }
                }
                claimed_roots.insert(root_uuid.clone(), *state);
            }
        }
    }

    report.add(format!("finished merging dialog nodes for {content_uuid}"));
    Ok(())
}
