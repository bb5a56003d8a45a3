//! Canonical node signatures.
//!
//! Two nodes are content-equal iff their signatures match. The signature
//! is a pure function of the node's attributes, so equality is cheap to
//! recompute and to cache; attribute insertion order does not affect it.

use super::node::Node;

/// Separator between `name=value` pairs.
const SEP: &str = "|";

/// Canonical signature of a node's attributes.
///
/// Pairs are rendered `name=value` (references as `name=handle:version`,
/// vectors space-joined) and sorted by attribute name before joining, so
/// two nodes that differ only in attribute order compare equal.
#[must_use]
pub fn node_signature(node: &Node) -> String {
    let mut pairs: Vec<String> = node
        .attributes
        .iter()
        .map(|(name, attr)| format!("{name}={}", attr.value.render()))
        .collect();
    pairs.sort_unstable();
    pairs.join(SEP)
}
