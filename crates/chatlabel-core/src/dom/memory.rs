//! Arena-backed DOM used by tests and headless hosts
//!
//! Elements live in a `Vec` indexed by [`NodeId`]; ids are never reused, so a
//! handle to a detached subtree stays valid (and reports disconnected).
//! While observing, structural changes under the observed root are recorded
//! and handed out by [`MemoryDom::take_batch`], one record per change.

use super::css::{self, Complex, ElementView, SelectorList};
use super::{HostDom, MutationBatch, MutationRecord, NodeId};
use crate::error::DomError;
use tracing::warn;

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ElementView for Element {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory document with `html > body` pre-created
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<Element>,
    body: NodeId,
    observed: Option<NodeId>,
    pending: Vec<MutationRecord>,
    attribute_writes: usize,
    released: Vec<NodeId>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            body: NodeId(1),
            observed: None,
            pending: Vec::new(),
            attribute_writes: 0,
            released: Vec::new(),
        };
        let html = dom.create_element("html", &[]);
        let body = dom.create_element("body", &[]);
        dom.link(html, body);
        dom.body = body;
        dom
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Attach `child` (and its whole subtree) as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() {
            warn!("append_child with unknown node {} -> {}", child, parent);
            return;
        }
        if let Some(old_parent) = self.nodes[child.0 as usize].parent {
            self.unlink(old_parent, child);
        }
        self.link(parent, child);
        if self.is_observed(parent) {
            self.pending.push(MutationRecord {
                added: vec![child],
                removed: Vec::new(),
            });
        }
    }

    /// Create an element and attach it in one step
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag, attrs);
        self.append_child(parent, id);
        id
    }

    /// Create an element carrying its own text and attach it
    pub fn append_text(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let id = self.create_element(tag, attrs);
        self.set_text(id, text);
        self.append_child(parent, id);
        id
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(el) = self.get_mut(node) {
            el.text = text.to_string();
        }
    }

    /// Detach `node` from its parent
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.get(node).and_then(|el| el.parent) else {
            return;
        };
        let observed = self.is_observed(parent);
        self.unlink(parent, node);
        if observed {
            self.pending.push(MutationRecord {
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    /// Drain everything recorded since the last call
    pub fn take_batch(&mut self) -> MutationBatch {
        MutationBatch::new(std::mem::take(&mut self.pending))
    }

    pub fn is_observing(&self) -> bool {
        self.observed.is_some()
    }

    /// Number of attribute writes performed through [`HostDom::set_attribute`]
    pub fn attribute_writes(&self) -> usize {
        self.attribute_writes
    }

    /// Handles the engine released, in release order
    pub fn released(&self) -> &[NodeId] {
        &self.released
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|el| el.parent)
    }

    fn get(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.0 as usize)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node.0 as usize)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0 as usize].parent = Some(parent);
        self.nodes[parent.0 as usize].children.push(child);
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0 as usize].children.retain(|c| *c != child);
        self.nodes[child.0 as usize].parent = None;
    }

    fn is_observed(&self, node: NodeId) -> bool {
        match self.observed {
            Some(root) => self.is_connected(node) && self.contains(root, node),
            None => false,
        }
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |n| self.parent(*n))
    }

    /// Descendants of `node` in document order, excluding `node`
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(node) {
            Some(el) => el.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(el) = self.get(current) {
                stack.extend(el.children.iter().rev().copied());
            }
        }
        out
    }

    fn parse_selector(selector: &str) -> Option<SelectorList> {
        match css::parse(selector) {
            Ok(list) => Some(list),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn matches_complex(&self, node: NodeId, complex: &Complex) -> bool {
        let Some((subject, ancestors)) = complex.0.split_last() else {
            return false;
        };
        let Some(el) = self.get(node) else {
            return false;
        };
        if !subject.matches(el) {
            return false;
        }

        let mut remaining = ancestors.iter().rev().peekable();
        for ancestor in self.ancestors(node) {
            let Some(wanted) = remaining.peek() else {
                break;
            };
            if self.get(ancestor).is_some_and(|a| wanted.matches(a)) {
                remaining.next();
            }
        }
        remaining.peek().is_none()
    }

    fn matches_list(&self, node: NodeId, list: &SelectorList) -> bool {
        list.0.iter().any(|c| self.matches_complex(node, c))
    }
}

impl HostDom for MemoryDom {
    fn query(&self, scope: Option<NodeId>, selector: &str) -> Option<NodeId> {
        let list = Self::parse_selector(selector)?;
        self.descendants(scope.unwrap_or(Self::ROOT))
            .into_iter()
            .find(|n| self.matches_list(*n, &list))
    }

    fn query_all(&self, scope: Option<NodeId>, selector: &str) -> Vec<NodeId> {
        let Some(list) = Self::parse_selector(selector) else {
            return Vec::new();
        };
        self.descendants(scope.unwrap_or(Self::ROOT))
            .into_iter()
            .filter(|n| self.matches_list(*n, &list))
            .collect()
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        Self::parse_selector(selector).is_some_and(|list| self.matches_list(node, &list))
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let list = Self::parse_selector(selector)?;
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|n| self.matches_list(*n, &list))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.get(node)?.attr(name).map(str::to_string)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let el = self.get_mut(node).ok_or(DomError::UnknownNode(node.0))?;
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
        self.attribute_writes += 1;
        Ok(())
    }

    fn rendered_text(&self, node: NodeId) -> String {
        if self.get(node).is_none() {
            return String::new();
        }
        std::iter::once(node)
            .chain(self.descendants(node))
            .filter_map(|n| self.get(n))
            .map(|e| e.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_connected(&self, node: NodeId) -> bool {
        node == Self::ROOT || self.ancestors(node).any(|a| a == Self::ROOT)
    }

    fn observe(&mut self, root: NodeId) -> Result<(), DomError> {
        if self.get(root).is_none() {
            return Err(DomError::UnknownNode(root.0));
        }
        if !self.is_connected(root) {
            return Err(DomError::Detached(root.0));
        }
        self.observed = Some(root);
        self.pending.clear();
        Ok(())
    }

    fn disconnect(&mut self) {
        self.observed = None;
        self.pending.clear();
    }

    fn release(&mut self, node: NodeId) {
        self.released.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_respects_scope_and_order() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let main = dom.append_element(body, "div", &[("id", "main")]);
        let a = dom.append_element(main, "div", &[("class", "message-in")]);
        let b = dom.append_element(main, "div", &[("class", "message-out")]);
        let outside = dom.append_element(body, "div", &[("class", "message-in")]);

        let all = dom.query_all(Some(main), "[class*=\"message-in\"], [class*=\"message-out\"]");
        assert_eq!(all, vec![a, b]);
        assert_eq!(dom.query(None, ".message-in"), Some(a));
        assert!(dom.query_all(None, ".message-in").contains(&outside));
    }

    #[test]
    fn test_descendant_selector_uses_ancestors_outside_scope() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let footer = dom.append_element(body, "footer", &[]);
        let wrapper = dom.append_element(footer, "div", &[]);
        let input = dom.append_element(wrapper, "div", &[("contenteditable", "true")]);

        assert_eq!(dom.query(Some(wrapper), "footer [contenteditable=\"true\"]"), Some(input));
        assert_eq!(dom.query(Some(footer), "footer footer"), None);
    }

    #[test]
    fn test_rendered_text_joins_descendants() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let msg = dom.append_element(body, "div", &[]);
        dom.append_text(msg, "span", &[], "Hello there");
        dom.append_text(msg, "span", &[], "10:42");

        assert_eq!(dom.rendered_text(msg), "Hello there 10:42");
    }

    #[test]
    fn test_remove_disconnects_subtree() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let list = dom.append_element(body, "div", &[]);
        let item = dom.append_element(list, "div", &[]);

        assert!(dom.is_connected(item));
        dom.remove(list);
        assert!(!dom.is_connected(item));
        assert!(!dom.is_connected(list));
        assert!(dom.contains(list, item));
    }

    #[test]
    fn test_observation_records_changes_under_root_only() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let app = dom.append_element(body, "div", &[("id", "app")]);
        let elsewhere = dom.append_element(body, "div", &[]);

        dom.observe(app).unwrap();
        let added = dom.append_element(app, "div", &[]);
        dom.append_element(elsewhere, "div", &[]);
        dom.remove(added);

        let batch = dom.take_batch();
        assert_eq!(batch.added_nodes().collect::<Vec<_>>(), vec![added]);
        assert_eq!(batch.removed_nodes().collect::<Vec<_>>(), vec![added]);
        assert!(dom.take_batch().is_empty());

        dom.disconnect();
        dom.append_element(app, "div", &[]);
        assert!(dom.take_batch().is_empty());
    }

    #[test]
    fn test_detached_subtree_appended_as_single_record() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        dom.observe(body).unwrap();

        let fragment = dom.create_element("div", &[]);
        dom.append_element(fragment, "div", &[("class", "message-in")]);
        dom.append_element(fragment, "div", &[("class", "message-in")]);
        dom.append_child(body, fragment);

        let batch = dom.take_batch();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].added, vec![fragment]);
    }

    #[test]
    fn test_set_attribute_unknown_node() {
        let mut dom = MemoryDom::new();
        assert_eq!(
            dom.set_attribute(NodeId(999), "aria-label", "x"),
            Err(DomError::UnknownNode(999))
        );
    }
}
