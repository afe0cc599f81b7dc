//! Host page abstraction used by threadtrim.
//!
//! The windowing engine never talks to a browser directly. Everything it reads
//! (geometry, class names, tree shape) and everything it writes (detaching and
//! reinserting message blocks, the placeholder node) goes through [`HostDom`].
//! [`MemoryDom`] is an arena-backed implementation used by the CLI and tests.

mod error;
mod fragment;
mod geometry;
mod memory;
mod snapshot;

pub use error::DomError;
pub use fragment::Fragment;
pub use geometry::{ComputedStyle, Layout, Position, Rect, Viewport};
pub use memory::MemoryDom;
pub use snapshot::{PageSnapshot, SnapshotError, SnapshotNode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a node owned by a [`HostDom`].
///
/// Handles stay valid after the node is detached from the document, which is
/// what allows detached message blocks to be reinserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Child-list change observed under the watched subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Everything threadtrim needs from the page it runs in.
///
/// Reads never fail: unknown nodes yield empty/zero values so heuristics can
/// degrade instead of erroring. Writes return [`DomError`] when the requested
/// tree operation is impossible.
pub trait HostDom {
    fn viewport(&self) -> Viewport;

    /// Path component of the current location, used to derive session ids.
    fn location_path(&self) -> String;

    fn document_root(&self) -> NodeId;

    /// Connected elements with the given tag in document order, at most `limit`.
    fn elements_by_tag(&self, tag: &str, limit: usize) -> Vec<NodeId>;

    /// Connected elements whose class attribute contains any of `needles`
    /// (ASCII case-insensitive), in document order.
    fn elements_with_class_containing(&self, needles: &[String]) -> Vec<NodeId>;

    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn class_name(&self, node: NodeId) -> &str;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn layout(&self, node: NodeId) -> Layout;

    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn is_connected(&self, node: NodeId) -> bool;

    /// Descendants (excluding `node`) with the given tag, in document order.
    fn descendants_by_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|child| *child == node)?;
        siblings.get(position + 1).copied()
    }

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DomError>;

    /// Inserts `node` under `parent` before `reference`, or appends when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError>;

    /// Detaches `node` from its parent. The node itself stays alive.
    fn remove(&mut self, node: NodeId) -> Result<(), DomError>;

    fn set_scroll_top(&mut self, node: NodeId, value: f64) -> Result<(), DomError>;

    fn serialize(&self, node: NodeId) -> Result<Fragment, DomError>;

    /// Builds a fresh detached subtree from a fragment.
    fn instantiate(&mut self, fragment: &Fragment) -> NodeId;

    /// Starts recording child-list mutations under `root`, replacing any
    /// previous observation.
    fn observe(&mut self, root: NodeId);

    fn disconnect(&mut self);

    fn observed_root(&self) -> Option<NodeId>;

    fn take_mutation_records(&mut self) -> Vec<MutationRecord>;
}
