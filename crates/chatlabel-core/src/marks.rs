//! Per-node processing markers
//!
//! The engine never writes bookkeeping into the host page. Instead each node
//! it has touched gets a small status record here, dropped once the node is
//! confirmed detached so the map tracks the visible list rather than history.

use crate::dom::{HostDom, NodeId};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatus {
    /// The annotation pass has handled this node
    pub processed: bool,
    /// Label written by the last pass or re-label, if any
    pub label: Option<String>,
    /// A "new message" announcement has fired
    pub announced: bool,
    /// An announcement is scheduled but has not fired yet
    pub pending: bool,
}

#[derive(Debug, Default)]
pub struct NodeMarks {
    entries: HashMap<NodeId, NodeStatus>,
}

impl NodeMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeStatus> {
        self.entries.get(&node)
    }

    pub fn is_processed(&self, node: NodeId) -> bool {
        self.entries.get(&node).is_some_and(|s| s.processed)
    }

    pub fn is_announced(&self, node: NodeId) -> bool {
        self.entries.get(&node).is_some_and(|s| s.announced)
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.entries.get(&node).is_some_and(|s| s.pending)
    }

    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.entries.get(&node).and_then(|s| s.label.as_deref())
    }

    pub fn mark_processed(&mut self, node: NodeId, label: Option<String>) {
        let status = self.entries.entry(node).or_default();
        status.processed = true;
        status.label = label;
    }

    pub fn set_pending(&mut self, node: NodeId, pending: bool) {
        self.entries.entry(node).or_default().pending = pending;
    }

    pub fn mark_announced(&mut self, node: NodeId) {
        let status = self.entries.entry(node).or_default();
        status.announced = true;
        status.pending = false;
    }

    /// Forget the processed state of every node so the next pass relabels
    ///
    /// Announcement state is kept: a language switch must not re-announce.
    pub fn clear_processed(&mut self) {
        for status in self.entries.values_mut() {
            status.processed = false;
            status.label = None;
        }
    }

    /// Forget every scheduled-but-unfired announcement
    pub fn clear_pending(&mut self) {
        for status in self.entries.values_mut() {
            status.pending = false;
        }
    }

    /// Drop entries for nodes the host has detached and release their handles
    ///
    /// Returns how many entries were evicted.
    pub fn evict_detached<D: HostDom + ?Sized>(&mut self, dom: &mut D) -> usize {
        let detached: Vec<NodeId> = self
            .entries
            .keys()
            .copied()
            .filter(|n| !dom.is_connected(*n))
            .collect();
        self.evict(dom, &detached)
    }

    /// Drop entries for `nodes` that are no longer attached
    pub fn evict_if_detached<D: HostDom + ?Sized>(
        &mut self,
        dom: &mut D,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> usize {
        let detached: Vec<NodeId> = nodes
            .into_iter()
            .filter(|n| self.entries.contains_key(n) && !dom.is_connected(*n))
            .collect();
        self.evict(dom, &detached)
    }

    fn evict<D: HostDom + ?Sized>(&mut self, dom: &mut D, nodes: &[NodeId]) -> usize {
        for node in nodes {
            self.entries.remove(node);
            dom.release(*node);
        }
        if !nodes.is_empty() {
            debug!("Evicted {} detached node marks", nodes.len());
        }
        nodes.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn test_flags_are_independent() {
        let mut marks = NodeMarks::new();
        let node = NodeId(7);

        marks.set_pending(node, true);
        assert!(marks.is_pending(node));
        assert!(!marks.is_processed(node));

        marks.mark_processed(node, Some("hi".into()));
        marks.mark_announced(node);
        assert!(marks.is_processed(node));
        assert!(marks.is_announced(node));
        assert!(!marks.is_pending(node));
        assert_eq!(marks.label(node), Some("hi"));
    }

    #[test]
    fn test_clear_processed_keeps_announced() {
        let mut marks = NodeMarks::new();
        marks.mark_processed(NodeId(1), Some("a".into()));
        marks.mark_announced(NodeId(1));

        marks.clear_processed();
        assert!(!marks.is_processed(NodeId(1)));
        assert_eq!(marks.label(NodeId(1)), None);
        assert!(marks.is_announced(NodeId(1)));
    }

    #[test]
    fn test_evict_detached_releases_handles() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let kept = dom.append_element(body, "div", &[]);
        let gone = dom.append_element(body, "div", &[]);

        let mut marks = NodeMarks::new();
        marks.mark_processed(kept, None);
        marks.mark_processed(gone, None);
        dom.remove(gone);

        assert_eq!(marks.evict_detached(&mut dom), 1);
        assert_eq!(marks.len(), 1);
        assert!(marks.is_processed(kept));
        assert!(marks.get(gone).is_none());
        assert_eq!(dom.released(), &[gone]);
    }

    #[test]
    fn test_evict_if_detached_ignores_connected_and_unknown() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let a = dom.append_element(body, "div", &[]);
        let b = dom.append_element(body, "div", &[]);
        let mut marks = NodeMarks::new();
        marks.mark_announced(a);

        dom.remove(b);
        assert_eq!(marks.evict_if_detached(&mut dom, [a, b]), 0);
        dom.remove(a);
        assert_eq!(marks.evict_if_detached(&mut dom, [a]), 1);
        assert!(marks.is_empty());
    }
}
