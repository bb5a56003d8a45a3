//! Set and order diffs over dialogue graphs.
//!
//! Node equality is four independent comparisons: ordinary attributes,
//! the ordered list of outgoing child references, flag groups, and
//! tagged-text groups. A node counts as unmodified only when all four
//! match - attribute equality alone misses edits buried in the grouped
//! sub-nodes, and vice versa.

use indexmap::IndexMap;

use crate::content::dialog::{DialogTree, NODE_UUID_ATTR};
use crate::error::Result;
use crate::tree::{Node, node_signature};

use super::order::diff_key_order;
use super::types::{DiffState, NodeDiff};

/// Set diff over all dialogue nodes, keyed by the stable UUID attribute.
///
/// Keys only in the baseline are Deleted, keys only in the candidate are
/// Added, keys in both are Modified iff [`dialog_nodes_equal`] fails.
pub fn diff_dialog_nodes(baseline: &DialogTree, candidate: &DialogTree) -> Result<NodeDiff> {
    let base_nodes = index_by_uuid(baseline)?;
    let cand_nodes = index_by_uuid(candidate)?;

    let mut result = NodeDiff::new();
    for uuid in base_nodes.keys() {
        if !cand_nodes.contains_key(uuid) {
            result.insert(uuid.clone(), DiffState::Deleted);
        }
    }
    for (uuid, cand_node) in &cand_nodes {
        match base_nodes.get(uuid) {
            None => {
                result.insert(uuid.clone(), DiffState::Added);
            }
            Some(base_node) => {
                if !dialog_nodes_equal(base_node, cand_node) {
                    result.insert(uuid.clone(), DiffState::Modified);
                }
            }
        }
    }
    Ok(result)
}

/// Order diff over the dialogue root sequence.
///
/// Delegates to the pure [`diff_key_order`] anchor-walk over the two
/// root UUID lists.
pub fn diff_dialog_roots(baseline: &DialogTree, candidate: &DialogTree) -> Result<NodeDiff> {
    Ok(diff_key_order(
        &baseline.root_uuids()?,
        &candidate.root_uuids()?,
    ))
}

fn index_by_uuid(tree: &DialogTree) -> Result<IndexMap<String, &Node>> {
    let mut map = IndexMap::new();
    for node in tree.dialog_nodes()? {
        map.insert(node.required_str(NODE_UUID_ATTR)?, node);
    }
    Ok(map)
}

/// Compare two dialogue nodes across all four content dimensions.
#[must_use]
pub fn dialog_nodes_equal(a: &Node, b: &Node) -> bool {
    node_signature(a) == node_signature(b)
        && child_refs_signature(a) == child_refs_signature(b)
        && flags_signature(a) == flags_signature(b)
        && tagged_texts_signature(a) == tagged_texts_signature(b)
}

/// Ordered outgoing edges: every attribute of every `child` node in the
/// `children` group, in document order.
fn child_refs_signature(node: &Node) -> String {
    let mut parts = Vec::new();
    for child in node.children("children") {
        if child.kind != "child" {
            continue;
        }
        for attr in child.attributes.values() {
            parts.push(attr.value.render());
        }
    }
    parts.join("|")
}

/// Flag conditions: `check`/`set` action, flag UUID, group type, param
/// and value, in document order.
fn flags_signature(node: &Node) -> String {
    let mut parts = Vec::new();
    for group_kind in ["checkflags", "setflags"] {
        let action = group_kind.trim_end_matches("flags");
        for flag_group in node.children(group_kind) {
            let flag_type = flag_group.attribute_str("type").unwrap_or_default();
            for flag in flag_group.children("flags") {
                let uuid = flag.attribute_str("UUID").unwrap_or_default();
                let value = flag.attribute_str("value").unwrap_or_default();
                let paramval = flag.attribute_str("paramval").unwrap_or_default();
                parts.push(format!("{action} {uuid}:{flag_type}:{paramval}={value}"));
            }
        }
    }
    parts.join("|")
}

/// Localized lines: sorted rule tags plus sorted text handles per
/// tagged-text entry.
fn tagged_texts_signature(node: &Node) -> String {
    let mut parts = Vec::new();
    for tagged_text in node.children("TaggedTexts") {
        let mut tags: Vec<String> = tagged_text
            .children("Rules")
            .iter()
            .flat_map(|rule| rule.children("Tags"))
            .filter_map(|tag| tag.attribute_str("Object"))
            .map(|object| format!("[{object}]"))
            .collect();
        tags.sort_unstable();
        let mut handles: Vec<String> = tagged_text
            .children("TagTexts")
            .iter()
            .filter_map(|t| t.translated_ref("TagText"))
            .map(|(handle, _)| handle.to_string())
            .collect();
        handles.sort_unstable();
        parts.push(format!("{}{}", tags.concat(), handles.join(",")));
    }
    parts.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::dialog::test_support::{make_dialog, make_dialog_node};
    use crate::tree::{Attribute, AttributeValue};

    fn add_child_ref(node: &mut Node, target: &str) {
        let mut child = Node::new("child");
        child.attributes.insert(
            "UUID".to_string(),
            Attribute::text("guid", target),
        );
        node.insert_child("children", child, None);
    }

    fn add_tagged_text(node: &mut Node, handle: &str) {
        let mut text = Node::new("TagText");
        text.attributes.insert(
            "TagText".to_string(),
            Attribute {
                type_name: "TranslatedString".to_string(),
                value: AttributeValue::TranslatedRef {
                    handle: handle.to_string(),
                    version: 1,
                },
            },
        );
        let mut tagged = Node::new("TaggedText");
        tagged.insert_child("TagTexts", text, None);
        node.insert_child("TaggedTexts", tagged, None);
    }

    fn add_flag(node: &mut Node, group_kind: &str, uuid: &str, value: &str) {
        let mut flag = Node::new("flag");
        flag.attributes
            .insert("UUID".to_string(), Attribute::text("guid", uuid));
        flag.attributes
            .insert("value".to_string(), Attribute::text("bool", value));
        let mut flag_group = Node::new("flaggroup");
        flag_group
            .attributes
            .insert("type".to_string(), Attribute::text("FixedString", "Global"));
        flag_group.insert_child("flags", flag, None);
        node.insert_child(group_kind, flag_group, None);
    }

    #[test]
    fn test_attribute_change_detected() {
        let baseline = make_dialog(&[("n1", "a")], &["n1"]);
        let candidate = make_dialog(&[("n1", "b")], &["n1"]);
        let diff = diff_dialog_nodes(&baseline, &candidate).unwrap();
        assert_eq!(diff["n1"], DiffState::Modified);
    }

    #[test]
    fn test_added_and_deleted_nodes() {
        let baseline = make_dialog(&[("n1", "a"), ("n2", "b")], &[]);
        let candidate = make_dialog(&[("n2", "b"), ("n3", "c")], &[]);
        let diff = diff_dialog_nodes(&baseline, &candidate).unwrap();
        assert_eq!(diff["n1"], DiffState::Deleted);
        assert_eq!(diff["n3"], DiffState::Added);
        assert_eq!(diff.get("n2"), None);
    }

    #[test]
    fn test_child_ref_change_detected_with_equal_attributes() {
        let mut a = make_dialog_node("n1", "same");
        let mut b = make_dialog_node("n1", "same");
        add_child_ref(&mut a, "t1");
        add_child_ref(&mut b, "t2");
        assert!(!dialog_nodes_equal(&a, &b));
    }

    #[test]
    fn test_child_ref_order_matters() {
        let mut a = make_dialog_node("n1", "same");
        let mut b = make_dialog_node("n1", "same");
        add_child_ref(&mut a, "t1");
        add_child_ref(&mut a, "t2");
        add_child_ref(&mut b, "t2");
        add_child_ref(&mut b, "t1");
        assert!(!dialog_nodes_equal(&a, &b));
    }

    #[test]
    fn test_flag_change_detected() {
        let mut a = make_dialog_node("n1", "same");
        let mut b = make_dialog_node("n1", "same");
        add_flag(&mut a, "setflags", "f1", "True");
        add_flag(&mut b, "setflags", "f1", "False");
        assert!(!dialog_nodes_equal(&a, &b));
    }

    #[test]
    fn test_check_and_set_flags_not_interchangeable() {
        let mut a = make_dialog_node("n1", "same");
        let mut b = make_dialog_node("n1", "same");
        add_flag(&mut a, "checkflags", "f1", "True");
        add_flag(&mut b, "setflags", "f1", "True");
        assert!(!dialog_nodes_equal(&a, &b));
    }

    #[test]
    fn test_tagged_text_handle_change_detected() {
        let mut a = make_dialog_node("n1", "same");
        let mut b = make_dialog_node("n1", "same");
        add_tagged_text(&mut a, "h1");
        add_tagged_text(&mut b, "h2");
        assert!(!dialog_nodes_equal(&a, &b));
    }

    #[test]
    fn test_equal_nodes_across_all_dimensions() {
        let mut a = make_dialog_node("n1", "same");
        let mut b = make_dialog_node("n1", "same");
        for node in [&mut a, &mut b] {
            add_child_ref(node, "t1");
            add_flag(node, "checkflags", "f1", "True");
            add_tagged_text(node, "h1");
        }
        assert!(dialog_nodes_equal(&a, &b));
    }

    #[test]
    fn test_set_diff_completeness() {
        let baseline = make_dialog(&[("n1", "a"), ("n2", "b"), ("n3", "c")], &[]);
        let candidate = make_dialog(&[("n2", "b"), ("n3", "x"), ("n4", "d")], &[]);
        let diff = diff_dialog_nodes(&baseline, &candidate).unwrap();
        // every key lands in exactly one bucket
        let all: Vec<&str> = vec!["n1", "n2", "n3", "n4"];
        let mut classified = 0;
        for key in &all {
            match diff.get(*key) {
                Some(DiffState::Deleted) => {
                    assert_eq!(*key, "n1");
                    classified += 1;
                }
                Some(DiffState::Added) => {
                    assert_eq!(*key, "n4");
                    classified += 1;
                }
                Some(DiffState::Modified) => {
                    assert_eq!(*key, "n3");
                    classified += 1;
                }
                None => assert_eq!(*key, "n2"),
            }
        }
        assert_eq!(classified, 3);
    }
}
