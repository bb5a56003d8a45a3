//! The canonical in-memory asset tree and its equality primitives.
//!
//! Dialogs, timelines, resource banks and mod metadata all parse into the
//! same [`AssetDocument`] shape via the external codec. The merge engine
//! never sees the wire format - only this model.

pub mod document;
pub mod node;
pub mod signature;
pub mod time;

pub use document::{AssetDocument, Region};
pub use node::{Attribute, AttributeValue, ChildGroup, Node};
pub use signature::node_signature;
pub use time::FixedTime;
