//! Typed nodes with ordered attributes and named child groups.
//!
//! Children are nested one level under a named group node: all `Rule`
//! nodes of a rule set live inside a `Rules` group, timeline effects live
//! inside an `EffectComponents` group, and so on. Lookups are by group
//! kind plus, for map-like groups, a designated key attribute.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default key attribute for map-like child groups.
pub const MAP_KEY: &str = "MapKey";

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Scalar string value.
    Text(String),
    /// Localized text reference: handle plus version.
    TranslatedRef {
        /// Localization handle.
        handle: String,
        /// Handle version.
        version: u16,
    },
    /// Float vector of 2-4 components.
    FloatVec(Vec<f32>),
}

impl AttributeValue {
    /// Render the value the way the canonical signature does.
    ///
    /// References render as `handle:version`, vectors as space-joined
    /// components.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::TranslatedRef { handle, version } => {
                format!("{handle}:{version}")
            }
            AttributeValue::FloatVec(components) => components
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Text payload, if this is a scalar.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// An attribute on a node: type tag plus value.
///
/// The type tag is preserved verbatim so the external codec can
/// re-serialize the document; the engine compares values only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Type name as it appears on the wire (e.g. `FixedString`, `guid`).
    pub type_name: String,
    /// The attribute value.
    pub value: AttributeValue,
}

impl Attribute {
    /// Create a scalar attribute.
    #[must_use]
    pub fn text(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            type_name: type_name.into(),
            value: AttributeValue::Text(value.into()),
        }
    }
}

/// An ordered, named group of child nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildGroup {
    /// Group kind (e.g. `Rules`, `children`, `EffectComponents`).
    pub kind: String,
    /// Member nodes, in document order.
    pub nodes: Vec<Node>,
}

impl ChildGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        ChildGroup {
            kind: kind.into(),
            nodes: Vec::new(),
        }
    }
}

/// A node in the asset tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node kind tag.
    pub kind: String,
    /// Ordered attribute map. Insertion order matters for round-trip
    /// fidelity but not for equality; names are unique within a node.
    pub attributes: IndexMap<String, Attribute>,
    /// Named child groups, in document order.
    pub groups: Vec<ChildGroup>,
}

impl Node {
    /// Creates a new node with the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Node {
            kind: kind.into(),
            attributes: IndexMap::new(),
            groups: Vec::new(),
        }
    }

    // ==================== Attributes ====================

    /// Look up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Rendered value of an attribute, if present.
    #[must_use]
    pub fn attribute_str(&self, name: &str) -> Option<String> {
        self.attributes.get(name).map(|a| a.value.render())
    }

    /// Rendered value of a required attribute.
    ///
    /// # Errors
    /// [`Error::MissingAttribute`], carrying this node's signature.
    pub fn required_str(&self, name: &str) -> Result<String> {
        self.attribute_str(name)
            .ok_or_else(|| self.missing_attribute(name))
    }

    /// Localization handle of an attribute, if it is a reference.
    #[must_use]
    pub fn translated_ref(&self, name: &str) -> Option<(&str, u16)> {
        match self.attributes.get(name).map(|a| &a.value) {
            Some(AttributeValue::TranslatedRef { handle, version }) => {
                Some((handle.as_str(), *version))
            }
            _ => None,
        }
    }

    /// Localization handle of a required reference attribute.
    ///
    /// # Errors
    /// [`Error::MissingAttribute`] if absent or not a reference.
    pub fn required_translated_ref(&self, name: &str) -> Result<(&str, u16)> {
        self.translated_ref(name)
            .ok_or_else(|| self.missing_attribute(name))
    }

    /// Create or update an attribute.
    ///
    /// Updating an existing attribute with `type_name: None` preserves
    /// the existing type tag; creating a new attribute requires one.
    ///
    /// # Errors
    /// [`Error::AttributeTypeRequired`] when creating without a type tag.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: AttributeValue,
        type_name: Option<&str>,
    ) -> Result<()> {
        if let AttributeValue::FloatVec(components) = &value
            && !(2..=4).contains(&components.len())
        {
            return Err(Error::InvalidVectorArity(components.len()));
        }
        if let Some(existing) = self.attributes.get_mut(name) {
            if let Some(t) = type_name {
                existing.type_name = t.to_string();
            }
            existing.value = value;
            return Ok(());
        }
        let Some(t) = type_name else {
            return Err(Error::AttributeTypeRequired(name.to_string()));
        };
        self.attributes.insert(
            name.to_string(),
            Attribute {
                type_name: t.to_string(),
                value,
            },
        );
        Ok(())
    }

    /// Delete an attribute.
    ///
    /// # Errors
    /// [`Error::MissingAttribute`] if absent.
    pub fn delete_attribute(&mut self, name: &str) -> Result<()> {
        // shift_remove keeps the remaining insertion order intact
        self.attributes
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| self.missing_attribute(name))
    }

    fn missing_attribute(&self, name: &str) -> Error {
        Error::MissingAttribute {
            name: name.to_string(),
            kind: self.kind.clone(),
            signature: super::signature::node_signature(self),
        }
    }

    // ==================== Child groups ====================

    /// Look up a child group by kind.
    #[must_use]
    pub fn group(&self, kind: &str) -> Option<&ChildGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// Look up a child group by kind, mutably.
    pub fn group_mut(&mut self, kind: &str) -> Option<&mut ChildGroup> {
        self.groups.iter_mut().find(|g| g.kind == kind)
    }

    /// Look up a child group, creating an empty one at the end if absent.
    pub fn group_mut_or_create(&mut self, kind: &str) -> &mut ChildGroup {
        let pos = match self.groups.iter().position(|g| g.kind == kind) {
            Some(pos) => pos,
            None => {
                self.groups.push(ChildGroup::new(kind));
                self.groups.len() - 1
            }
        };
        &mut self.groups[pos]
    }

    /// Member nodes of a group, empty if the group is absent.
    #[must_use]
    pub fn children(&self, group: &str) -> &[Node] {
        self.group(group).map_or(&[], |g| g.nodes.as_slice())
    }

    /// First child in a group matching a predicate.
    pub fn find_child<P>(&self, group: &str, predicate: P) -> Option<&Node>
    where
        P: Fn(&Node) -> bool,
    {
        self.children(group).iter().find(|n| predicate(n))
    }

    /// Insert a child into a group at `position` (append when `None`).
    pub fn insert_child(&mut self, group: &str, node: Node, position: Option<usize>) {
        let g = self.group_mut_or_create(group);
        match position {
            Some(pos) if pos < g.nodes.len() => g.nodes.insert(pos, node),
            _ => g.nodes.push(node),
        }
    }

    /// Remove the first child in a group matching a predicate.
    ///
    /// Returns the removed node, or `None` if nothing matched.
    pub fn remove_child<P>(&mut self, group: &str, predicate: P) -> Option<Node>
    where
        P: Fn(&Node) -> bool,
    {
        let g = self.group_mut(group)?;
        let pos = g.nodes.iter().position(|n| predicate(n))?;
        Some(g.nodes.remove(pos))
    }

    // ==================== Map-keyed groups ====================

    /// Find a group entry by its `MapKey` attribute.
    #[must_use]
    pub fn find_by_map_key(&self, group: &str, key: &str) -> Option<&Node> {
        self.find_child(group, |n| {
            n.attribute_str(MAP_KEY).is_some_and(|k| k == key)
        })
    }

    /// Insert an entry into a map-keyed group.
    ///
    /// An entry with the same `MapKey` is replaced and moved to the end
    /// of the group: last write wins, append on conflict.
    ///
    /// # Errors
    /// [`Error::MissingAttribute`] if `node` has no `MapKey`.
    pub fn put_by_map_key(&mut self, group: &str, node: Node) -> Result<()> {
        let key = node.required_str(MAP_KEY)?;
        let g = self.group_mut_or_create(group);
        if let Some(pos) = g
            .nodes
            .iter()
            .position(|n| n.attribute_str(MAP_KEY).is_some_and(|k| k == key))
        {
            g.nodes.remove(pos);
        }
        g.nodes.push(node);
        Ok(())
    }

    /// Remove an entry from a map-keyed group.
    ///
    /// # Errors
    /// [`Error::MissingMapEntry`] if no entry carries the key.
    pub fn remove_by_map_key(&mut self, group: &str, key: &str) -> Result<Node> {
        self.remove_child(group, |n| {
            n.attribute_str(MAP_KEY).is_some_and(|k| k == key)
        })
        .ok_or_else(|| Error::MissingMapEntry {
            key: key.to_string(),
            group: group.to_string(),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keyed(key: &str, label: &str) -> Node {
        let mut n = Node::new("Object");
        n.set_attribute(
            MAP_KEY,
            AttributeValue::Text(key.to_string()),
            Some("FixedString"),
        )
        .unwrap();
        n.set_attribute(
            "Label",
            AttributeValue::Text(label.to_string()),
            Some("LSString"),
        )
        .unwrap();
        n
    }

    #[test]
    fn test_set_attribute_preserves_type() {
        let mut n = Node::new("node");
        n.set_attribute("Speed", AttributeValue::Text("1".into()), Some("float"))
            .unwrap();
        n.set_attribute("Speed", AttributeValue::Text("2".into()), None)
            .unwrap();
        assert_eq!(n.attribute("Speed").unwrap().type_name, "float");
        assert_eq!(n.attribute_str("Speed").unwrap(), "2");
    }

    #[test]
    fn test_set_attribute_requires_type_on_create() {
        let mut n = Node::new("node");
        let err = n
            .set_attribute("Speed", AttributeValue::Text("1".into()), None)
            .unwrap_err();
        assert!(matches!(err, Error::AttributeTypeRequired(_)));
    }

    #[test]
    fn test_required_str_reports_signature() {
        let mut n = Node::new("node");
        n.set_attribute("UUID", AttributeValue::Text("abc".into()), Some("guid"))
            .unwrap();
        let err = n.required_str("Missing").unwrap_err();
        match err {
            Error::MissingAttribute { name, signature, .. } => {
                assert_eq!(name, "Missing");
                assert_eq!(signature, "UUID=abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_put_by_map_key_moves_to_end() {
        let mut parent = Node::new("Map");
        parent.insert_child("children", make_keyed("a", "first"), None);
        parent.insert_child("children", make_keyed("b", "second"), None);

        parent
            .put_by_map_key("children", make_keyed("a", "replaced"))
            .unwrap();

        let kids = parent.children("children");
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].attribute_str(MAP_KEY).unwrap(), "b");
        assert_eq!(kids[1].attribute_str(MAP_KEY).unwrap(), "a");
        assert_eq!(kids[1].attribute_str("Label").unwrap(), "replaced");
    }

    #[test]
    fn test_vector_arity_checked() {
        let mut n = Node::new("node");
        let err = n
            .set_attribute(
                "Position",
                AttributeValue::FloatVec(vec![1.0]),
                Some("fvec3"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidVectorArity(1)));
    }

    #[test]
    fn test_insert_child_at_position() {
        let mut parent = Node::new("root");
        parent.insert_child("children", Node::new("a"), None);
        parent.insert_child("children", Node::new("c"), None);
        parent.insert_child("children", Node::new("b"), Some(1));
        let kinds: Vec<&str> = parent
            .children("children")
            .iter()
            .map(|n| n.kind.as_str())
            .collect();
        assert_eq!(kinds, ["a", "b", "c"]);
    }
}
