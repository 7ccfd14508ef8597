//! Host page abstraction
//!
//! The engine never touches a concrete DOM. Everything it needs from the host
//! page goes through [`HostDom`], implemented by the browser binding
//! (`web-sys`) and by [`memory::MemoryDom`] for tests and headless hosts.
//!
//! Nodes are addressed by [`NodeId`] handles. An implementation must keep a
//! handle pointing at the same element for as long as that element stays
//! attached; once detached the handle may be released.

pub(crate) mod css;
pub mod memory;
pub mod selectors;

use crate::error::DomError;
use std::fmt;

pub use memory::MemoryDom;

/// Stable handle to one host element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One add/remove notification from the observation subscription
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Records delivered together; classified as a single moment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn new(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    /// Batch containing a single record that adds `nodes`
    pub fn added(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            records: vec![MutationRecord {
                added: nodes.into_iter().collect(),
                removed: Vec::new(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.added.is_empty() && r.removed.is_empty())
    }

    pub fn added_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.iter().flat_map(|r| r.added.iter().copied())
    }

    pub fn removed_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.iter().flat_map(|r| r.removed.iter().copied())
    }
}

/// Read/write access to the host page
///
/// `scope: None` means the whole document.
pub trait HostDom {
    fn query(&self, scope: Option<NodeId>, selector: &str) -> Option<NodeId>;

    fn query_all(&self, scope: Option<NodeId>, selector: &str) -> Vec<NodeId>;

    fn matches(&self, node: NodeId, selector: &str) -> bool;

    /// The node itself or its nearest ancestor matching `selector`
    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId>;

    /// Inclusive: a node contains itself
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    /// Visible text of the node and its descendants
    fn rendered_text(&self, node: NodeId) -> String;

    fn is_connected(&self, node: NodeId) -> bool;

    /// Start delivering mutation batches for the subtree under `root`
    fn observe(&mut self, root: NodeId) -> Result<(), DomError>;

    fn disconnect(&mut self);

    /// The engine holds no further state for `node`
    fn release(&mut self, _node: NodeId) {}
}

/// Try each selector in order and return the first match
pub fn find_first<D: HostDom + ?Sized>(
    dom: &D,
    scope: Option<NodeId>,
    selectors: &[&str],
) -> Option<NodeId> {
    selectors
        .iter()
        .find_map(|selector| dom.query(scope, selector))
}

/// Set an attribute only when its current value differs
///
/// Returns `Ok(true)` when a write happened.
pub fn set_attribute_if_changed<D: HostDom + ?Sized>(
    dom: &mut D,
    node: NodeId,
    name: &str,
    value: &str,
) -> Result<bool, DomError> {
    if dom.attribute(node, name).as_deref() == Some(value) {
        return Ok(false);
    }
    dom.set_attribute(node, name, value)?;
    Ok(true)
}
