//! Typed view over a cinematic timeline document.
//!
//! Expected shape, as produced by the external codec:
//!
//! ```text
//! region "TimelineContent"
//!   node "Timeline"
//!     group "Phases"           - sequential beats (DialogNodeId, Duration)
//!     group "EffectComponents" - effect nodes (ID, PhaseIndex, StartTime, EndTime)
//! ```
//!
//! Phases are laid out back to back: a phase's start time is the sum of
//! the durations of every phase before it. Effect offsets are absolute
//! within the timeline, which is why moving an effect between phases
//! requires a re-base (§ [`shift_effect_times`]).

use crate::error::{Error, Result};
use crate::tree::{AssetDocument, AttributeValue, FixedTime, Node};

/// Region id of a timeline document.
pub const TIMELINE_REGION: &str = "TimelineContent";
/// Root node kind.
pub const TIMELINE_NODE: &str = "Timeline";
/// Group holding the phases.
pub const PHASES_GROUP: &str = "Phases";
/// Group holding the effect components.
pub const EFFECTS_GROUP: &str = "EffectComponents";
/// Phase attribute naming the dialogue beat it belongs to.
pub const PHASE_UUID_ATTR: &str = "DialogNodeId";
/// Phase duration attribute.
pub const PHASE_DURATION_ATTR: &str = "Duration";
/// Effect identity attribute.
pub const EFFECT_ID_ATTR: &str = "ID";
/// Effect attribute indexing into the phase list.
pub const EFFECT_PHASE_ATTR: &str = "PhaseIndex";
/// Effect start offset attribute.
pub const EFFECT_START_ATTR: &str = "StartTime";
/// Effect end offset attribute.
pub const EFFECT_END_ATTR: &str = "EndTime";

/// Computed view of one timeline phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// Dialogue-node UUID identifying the beat.
    pub uuid: String,
    /// Position in the phase list.
    pub index: usize,
    /// Absolute start time (sum of preceding durations).
    pub start: FixedTime,
    /// Phase duration.
    pub duration: FixedTime,
}

/// A timeline with typed access to its phases and effects.
#[derive(Debug, Clone)]
pub struct TimelineTree {
    doc: AssetDocument,
}

impl TimelineTree {
    /// Wrap a parsed timeline document.
    ///
    /// # Errors
    /// [`Error::MissingRegion`] if the document has no timeline region.
    pub fn new(doc: AssetDocument) -> Result<Self> {
        doc.require_region(TIMELINE_REGION)?;
        Ok(TimelineTree { doc })
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
            .require_region(TIMELINE_REGION)?
            .node(TIMELINE_NODE)
            .ok_or_else(|| Error::MissingRegion(TIMELINE_REGION.to_string()))
    }

    fn container_mut(&mut self) -> Result<&mut Node> {
        self.doc
            .require_region_mut(TIMELINE_REGION)?
            .node_mut(TIMELINE_NODE)
            .ok_or_else(|| Error::MissingRegion(TIMELINE_REGION.to_string()))
    }

    // ==================== Phases ====================

    /// Phase nodes in document order.
    pub fn phase_nodes(&self) -> Result<&[Node]> {
        Ok(self.container()?.children(PHASES_GROUP))
    }

    /// Computed phase views, in order.
    pub fn phases(&self) -> Result<Vec<Phase>> {
        let mut start = FixedTime::ZERO;
        let mut out = Vec::new();
        for (index, node) in self.phase_nodes()?.iter().enumerate() {
            let uuid = node.required_str(PHASE_UUID_ATTR)?;
            let duration = FixedTime::parse(&node.required_str(PHASE_DURATION_ATTR)?)?;
            out.push(Phase {
                uuid,
                index,
                start,
                duration,
            });
            start = start + duration;
        }
        Ok(out)
    }

    /// Find a phase by its dialogue-beat UUID.
    pub fn phase(&self, uuid: &str) -> Result<Option<Phase>> {
        Ok(self.phases()?.into_iter().find(|p| p.uuid == uuid))
    }

    /// Find a phase by its dialogue-beat UUID, or fail.
    ///
    /// # Errors
    /// [`Error::MissingPhase`] when absent.
    pub fn require_phase(&self, uuid: &str) -> Result<Phase> {
        self.phase(uuid)?.ok_or_else(|| Error::MissingPhase {
            phase: uuid.to_string(),
        })
    }

    /// Phase at a list position.
    ///
    /// # Errors
    /// [`Error::Invariant`] when the index is out of range, since effect
    /// nodes must never point outside the phase list.
    pub fn phase_at(&self, index: usize) -> Result<Phase> {
        self.phases()?.into_iter().nth(index).ok_or_else(|| {
            Error::Invariant(format!("effect references phase index {index} out of range"))
        })
    }

    /// Whether a phase with this beat UUID exists.
    pub fn has_phase(&self, uuid: &str) -> Result<bool> {
        Ok(self.phase(uuid)?.is_some())
    }

    /// The raw phase node for a beat UUID, if present.
    pub fn phase_node(&self, uuid: &str) -> Result<Option<&Node>> {
        Ok(self.container()?.find_child(PHASES_GROUP, |n| {
            n.attribute_str(PHASE_UUID_ATTR).is_some_and(|u| u == uuid)
        }))
    }

    /// Append a phase cloned from another timeline's phase node.
    ///
    /// The clone keeps the source phase's duration and grouped sub-nodes.
    /// Returns the new phase view.
    pub fn add_phase_from(&mut self, source: &Node) -> Result<Phase> {
        let uuid = source.required_str(PHASE_UUID_ATTR)?;
        self.container_mut()?
            .insert_child(PHASES_GROUP, source.clone(), None);
        self.require_phase(&uuid)
    }

    // ==================== Effects ====================

    /// Effect nodes in document order.
    pub fn effect_nodes(&self) -> Result<&[Node]> {
        Ok(self.container()?.children(EFFECTS_GROUP))
    }

    /// Find an effect by its ID attribute.
    pub fn find_effect(&self, id: &str) -> Result<Option<&Node>> {
        Ok(self.container()?.find_child(EFFECTS_GROUP, |n| {
            n.attribute_str(EFFECT_ID_ATTR).is_some_and(|u| u == id)
        }))
    }

    /// Whether an effect with this ID exists.
    pub fn has_effect(&self, id: &str) -> Result<bool> {
        Ok(self.find_effect(id)?.is_some())
    }

    /// Remove an effect by ID, if present.
    pub fn remove_effect(&mut self, id: &str) -> Result<Option<Node>> {
        Ok(self.container_mut()?.remove_child(EFFECTS_GROUP, |n| {
            n.attribute_str(EFFECT_ID_ATTR).is_some_and(|u| u == id)
        }))
    }

    /// Append an effect node.
    pub fn insert_effect(&mut self, node: Node) -> Result<()> {
        self.container_mut()?.insert_child(EFFECTS_GROUP, node, None);
        Ok(())
    }

    /// The phase owning an effect node.
    pub fn effect_phase(&self, effect: &Node) -> Result<Phase> {
        let raw = effect.required_str(EFFECT_PHASE_ATTR)?;
        let index: usize = raw
            .parse()
            .map_err(|_| Error::Invariant(format!("malformed phase index '{raw}'")))?;
        self.phase_at(index)
    }
}

/// Shift an effect's start/end offsets by a delta, preserving exact
/// fixed-point precision.
///
/// Re-basing an effect from a source phase into a destination phase is
/// `shift_effect_times(effect, dst.start - src.start)`.
pub fn shift_effect_times(effect: &Node, delta: FixedTime) -> Result<Node> {
    let mut shifted = effect.clone();
    for attr in [EFFECT_START_ATTR, EFFECT_END_ATTR] {
        if let Some(raw) = shifted.attribute_str(attr) {
            let moved = FixedTime::parse(&raw)? + delta;
            shifted.set_attribute(attr, AttributeValue::Text(moved.to_string()), None)?;
        }
    }
    Ok(shifted)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::tree::Region;

    /// Build a timeline from phase specs `(uuid, duration)` and effect
    /// specs `(id, phase_index, start, end)`.
    pub fn make_timeline(phases: &[(&str, &str)], effects: &[(&str, usize, &str, &str)]) -> TimelineTree {
        let mut timeline = Node::new(TIMELINE_NODE);
        for (uuid, duration) in phases {
            timeline.insert_child(PHASES_GROUP, make_phase(uuid, duration), None);
        }
        for (id, phase, start, end) in effects {
            timeline.insert_child(EFFECTS_GROUP, make_effect(id, *phase, start, end), None);
        }
        let mut region = Region::new(TIMELINE_REGION);
        region.nodes.push(timeline);
        let mut doc = AssetDocument::new(4, 0, 9, 330);
        doc.regions.push(region);
        TimelineTree::new(doc).unwrap()
    }

    pub fn make_phase(uuid: &str, duration: &str) -> Node {
        let mut n = Node::new("Phase");
        n.set_attribute(
            PHASE_UUID_ATTR,
            AttributeValue::Text(uuid.to_string()),
            Some("guid"),
        )
        .unwrap();
        n.set_attribute(
            PHASE_DURATION_ATTR,
            AttributeValue::Text(duration.to_string()),
            Some("float"),
        )
        .unwrap();
        n
    }

    pub fn make_effect(id: &str, phase: usize, start: &str, end: &str) -> Node {
        let mut n = Node::new("EffectComponent");
        n.set_attribute(
            EFFECT_ID_ATTR,
            AttributeValue::Text(id.to_string()),
            Some("guid"),
        )
        .unwrap();
        n.set_attribute(
            EFFECT_PHASE_ATTR,
            AttributeValue::Text(phase.to_string()),
            Some("int64"),
        )
        .unwrap();
        n.set_attribute(
            EFFECT_START_ATTR,
            AttributeValue::Text(start.to_string()),
            Some("float"),
        )
        .unwrap();
        n.set_attribute(
            EFFECT_END_ATTR,
            AttributeValue::Text(end.to_string()),
            Some("float"),
        )
        .unwrap();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::make_timeline;
    use super::*;

    #[test]
    fn test_phase_starts_accumulate() {
        let t = make_timeline(&[("p1", "10.0"), ("p2", "4.5"), ("p3", "2.0")], &[]);
        let phases = t.phases().unwrap();
        assert_eq!(phases[0].start, FixedTime::ZERO);
        assert_eq!(phases[1].start, FixedTime::parse("10.0").unwrap());
        assert_eq!(phases[2].start, FixedTime::parse("14.5").unwrap());
    }

    #[test]
    fn test_effect_phase_lookup() {
        let t = make_timeline(
            &[("p1", "10.0"), ("p2", "4.5")],
            &[("e1", 1, "11.0", "12.0")],
        );
        let effect = t.find_effect("e1").unwrap().unwrap();
        let phase = t.effect_phase(effect).unwrap();
        assert_eq!(phase.uuid, "p2");
    }

    #[test]
    fn test_shift_effect_times_exact() {
        let t = make_timeline(&[("p1", "10.0")], &[("e1", 0, "12.3400", "13.0000")]);
        let effect = t.find_effect("e1").unwrap().unwrap();
        let delta = FixedTime::parse("5.0").unwrap() - FixedTime::parse("10.0").unwrap();
        let shifted = shift_effect_times(effect, delta).unwrap();
        assert_eq!(shifted.attribute_str(EFFECT_START_ATTR).unwrap(), "7.3400");
        assert_eq!(shifted.attribute_str(EFFECT_END_ATTR).unwrap(), "8.0000");
    }

    #[test]
    fn test_phase_out_of_range_is_invariant() {
        let t = make_timeline(&[("p1", "10.0")], &[("e1", 3, "0.0", "1.0")]);
        let effect = t.find_effect("e1").unwrap().unwrap();
        assert!(matches!(
            t.effect_phase(effect),
            Err(Error::Invariant(_))
        ));
    }
}
