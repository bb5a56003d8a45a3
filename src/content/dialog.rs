//! Typed view over a dialogue graph document.
//!
//! Expected shape, as produced by the external codec:
//!
//! ```text
//! region "dialog"
//!   node "dialog"
//!     group "nodes"     - dialogue nodes (kind "node", stable UUID attribute)
//!     group "RootNodes" - ordered root references (attribute RootNodes = uuid)
//! ```
//!
//! Dialogue nodes carry their outgoing edges in a `children` group of
//! `child` nodes, flag conditions in `checkflags`/`setflags` groups and
//! localized lines in a `TaggedTexts` group.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::tree::{AssetDocument, Attribute, AttributeValue, Node};

/// Region id of a dialogue document.
pub const DIALOG_REGION: &str = "dialog";
/// Group holding the dialogue nodes.
pub const NODES_GROUP: &str = "nodes";
/// Group holding the ordered root references.
pub const ROOTS_GROUP: &str = "RootNodes";
/// Attribute naming a root reference's target.
pub const ROOT_REF_ATTR: &str = "RootNodes";
/// Stable identity attribute of a dialogue node.
pub const NODE_UUID_ATTR: &str = "UUID";

/// A dialogue graph with typed access to its nodes and root order.
#[derive(Debug, Clone)]
pub struct DialogTree {
    doc: AssetDocument,
}

impl DialogTree {
    /// Wrap a parsed dialogue document.
    ///
    /// # Errors
    /// [`Error::MissingRegion`] if the document has no `dialog` region.
    pub fn new(doc: AssetDocument) -> Result<Self> {
        doc.require_region(DIALOG_REGION)?;
        Ok(DialogTree { doc })
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &AssetDocument {
        &self.doc
    }

    /// Consume the wrapper, returning the document.
    #[must_use]
    pub fn into_document(self) -> AssetDocument {
        self.doc
    }

    fn container(&self) -> Result<&Node> {
        self.doc
            .require_region(DIALOG_REGION)?
            .node(DIALOG_REGION)
            .ok_or_else(|| Error::MissingRegion(DIALOG_REGION.to_string()))
    }

    fn container_mut(&mut self) -> Result<&mut Node> {
        self.doc
            .require_region_mut(DIALOG_REGION)?
            .node_mut(DIALOG_REGION)
            .ok_or_else(|| Error::MissingRegion(DIALOG_REGION.to_string()))
    }

    // ==================== Dialogue nodes ====================

    /// All dialogue nodes, in document order.
    pub fn dialog_nodes(&self) -> Result<&[Node]> {
        Ok(self.container()?.children(NODES_GROUP))
    }

    /// Dialogue node UUIDs in document order.
    pub fn node_uuids(&self) -> Result<Vec<String>> {
        self.dialog_nodes()?
            .iter()
            .map(|n| n.required_str(NODE_UUID_ATTR))
            .collect()
    }

    /// Find a dialogue node by UUID.
    pub fn find_node(&self, uuid: &str) -> Result<Option<&Node>> {
        Ok(self.container()?.find_child(NODES_GROUP, |n| {
            n.attribute_str(NODE_UUID_ATTR).is_some_and(|u| u == uuid)
        }))
    }

    /// Whether a dialogue node with this UUID exists.
    pub fn has_node(&self, uuid: &str) -> Result<bool> {
        Ok(self.find_node(uuid)?.is_some())
    }

    /// Append a dialogue node.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        self.container_mut()?.insert_child(NODES_GROUP, node, None);
        Ok(())
    }

    /// Remove a dialogue node by UUID. Returns the removed node.
    pub fn delete_node(&mut self, uuid: &str) -> Result<Option<Node>> {
        Ok(self.container_mut()?.remove_child(NODES_GROUP, |n| {
            n.attribute_str(NODE_UUID_ATTR).is_some_and(|u| u == uuid)
        }))
    }

    // ==================== Root order ====================

    /// Root node UUIDs in document order.
    pub fn root_uuids(&self) -> Result<Vec<String>> {
        self.container()?
            .children(ROOTS_GROUP)
            .iter()
            .map(|n| n.required_str(ROOT_REF_ATTR))
            .collect()
    }

    /// Root UUID -> position map.
    pub fn root_order(&self) -> Result<IndexMap<String, usize>> {
        Ok(self
            .root_uuids()?
            .into_iter()
            .enumerate()
            .map(|(i, u)| (u, i))
            .collect())
    }

    /// Remove a root reference, if present.
    pub fn remove_root(&mut self, uuid: &str) -> Result<()> {
        self.container_mut()?.remove_child(ROOTS_GROUP, |n| {
            n.attribute_str(ROOT_REF_ATTR).is_some_and(|u| u == uuid)
        });
        Ok(())
    }

    /// Append a root reference at the tail.
    pub fn add_root(&mut self, uuid: &str) -> Result<()> {
        let node = make_root_ref(uuid);
        self.container_mut()?.insert_child(ROOTS_GROUP, node, None);
        Ok(())
    }

    /// Insert a root reference immediately before another root.
    ///
    /// Falls back to appending when `before` is not present.
    pub fn add_root_before(&mut self, before: &str, uuid: &str) -> Result<()> {
        let node = make_root_ref(uuid);
        let container = self.container_mut()?;
        let position = container
            .children(ROOTS_GROUP)
            .iter()
            .position(|n| n.attribute_str(ROOT_REF_ATTR).is_some_and(|u| u == before));
        container.insert_child(ROOTS_GROUP, node, position);
        Ok(())
    }
}

fn make_root_ref(uuid: &str) -> Node {
    let mut node = Node::new(ROOTS_GROUP);
    node.attributes.insert(
        ROOT_REF_ATTR.to_string(),
        Attribute {
            type_name: "guid".to_string(),
            value: AttributeValue::Text(uuid.to_string()),
        },
    );
    node
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::tree::Region;

    /// Build a dialogue document from (uuid, payload) node specs and a
    /// root order.
    pub fn make_dialog(nodes: &[(&str, &str)], roots: &[&str]) -> DialogTree {
        let mut dialog = Node::new(DIALOG_REGION);
        for (uuid, payload) in nodes {
            dialog.insert_child(NODES_GROUP, make_dialog_node(uuid, payload), None);
        }
        for uuid in roots {
            dialog.insert_child(ROOTS_GROUP, make_root_ref(uuid), None);
        }
        let mut region = Region::new(DIALOG_REGION);
        region.nodes.push(dialog);
        let mut doc = AssetDocument::new(4, 0, 9, 330);
        doc.regions.push(region);
        DialogTree::new(doc).unwrap()
    }

    /// A dialogue node with a UUID and one payload attribute.
    pub fn make_dialog_node(uuid: &str, payload: &str) -> Node {
        let mut n = Node::new("node");
        n.set_attribute(
            NODE_UUID_ATTR,
            AttributeValue::Text(uuid.to_string()),
            Some("guid"),
        )
        .unwrap();
        n.set_attribute(
            "constructor",
            AttributeValue::Text(payload.to_string()),
            Some("FixedString"),
        )
        .unwrap();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::make_dialog;
    use super::*;

    #[test]
    fn test_root_order_roundtrip() {
        let d = make_dialog(&[("n1", "a"), ("n2", "b")], &["n1", "n2"]);
        assert_eq!(d.root_uuids().unwrap(), ["n1", "n2"]);
        assert_eq!(d.root_order().unwrap()["n2"], 1);
    }

    #[test]
    fn test_add_root_before() {
        let mut d = make_dialog(&[], &["r1", "r3"]);
        d.add_root_before("r3", "r2").unwrap();
        assert_eq!(d.root_uuids().unwrap(), ["r1", "r2", "r3"]);
    }

    #[test]
    fn test_add_root_before_missing_appends() {
        let mut d = make_dialog(&[], &["r1"]);
        d.add_root_before("nope", "r2").unwrap();
        assert_eq!(d.root_uuids().unwrap(), ["r1", "r2"]);
    }

    #[test]
    fn test_delete_node() {
        let mut d = make_dialog(&[("n1", "a"), ("n2", "b")], &[]);
        let removed = d.delete_node("n1").unwrap().unwrap();
        assert_eq!(removed.attribute_str("constructor").unwrap(), "a");
        assert!(!d.has_node("n1").unwrap());
        assert!(d.has_node("n2").unwrap());
    }
}
