//! Decide which added nodes are genuinely new messages
//!
//! Opening a chat or scrolling up inserts whole pages of history through the
//! same mutation stream as a freshly received message. Two guards separate
//! them: a batch with too many message nodes is treated as backfill, and of
//! what survives only the node that is currently last in the open
//! conversation may be announced.

use crate::config::EngineConfig;
use crate::dom::{selectors, HostDom, MutationBatch, NodeId};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    /// Read the direction marker from a bubble's class list
    pub fn from_class(class: &str) -> Option<Self> {
        if class.contains(selectors::MESSAGE_IN_CLASS) {
            Some(Direction::Incoming)
        } else if class.contains(selectors::MESSAGE_OUT_CLASS) {
            Some(Direction::Outgoing)
        } else {
            None
        }
    }

    pub fn of<D: HostDom + ?Sized>(dom: &D, node: NodeId) -> Option<Self> {
        dom.attribute(node, "class")
            .as_deref()
            .and_then(Self::from_class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub node: NodeId,
    pub direction: Direction,
}

/// Message nodes referenced by `batch`, de-duplicated, in first-seen order,
/// restricted to the open conversation
pub fn collect_message_nodes<D: HostDom + ?Sized>(
    dom: &D,
    batch: &MutationBatch,
    main_panel: NodeId,
) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for added in batch.added_nodes() {
        if !dom.is_connected(added) || !dom.contains(main_panel, added) {
            continue;
        }
        let found = if dom.matches(added, selectors::MESSAGE) {
            vec![added]
        } else {
            dom.query_all(Some(added), selectors::MESSAGE)
        };
        for node in found {
            if seen.insert(node) {
                nodes.push(node);
            }
        }
    }

    nodes
}

/// Candidates worth announcing from one mutation batch
pub fn classify<D: HostDom + ?Sized>(
    dom: &D,
    batch: &MutationBatch,
    config: &EngineConfig,
) -> Vec<Candidate> {
    let Some(main_panel) = dom.query(None, selectors::MAIN_PANEL) else {
        return Vec::new();
    };

    let nodes = collect_message_nodes(dom, batch, main_panel);
    if nodes.is_empty() {
        return Vec::new();
    }
    if nodes.len() >= config.bulk_threshold {
        debug!(
            "Batch with {} message nodes treated as history load",
            nodes.len()
        );
        return Vec::new();
    }

    let Some(tail) = dom
        .query_all(Some(main_panel), selectors::MESSAGE)
        .last()
        .copied()
    else {
        return Vec::new();
    };

    nodes
        .into_iter()
        .filter(|node| *node == tail)
        .filter_map(|node| {
            Direction::of(dom, node).map(|direction| Candidate { node, direction })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    struct Page {
        dom: MemoryDom,
        main: NodeId,
        list: NodeId,
    }

    fn page() -> Page {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let app = dom.append_element(body, "div", &[("id", "app")]);
        dom.append_element(app, "div", &[("id", "pane-side")]);
        let main = dom.append_element(app, "div", &[("id", "main")]);
        let list = dom.append_element(main, "div", &[("role", "application")]);
        Page { dom, main, list }
    }

    fn message(dom: &mut MemoryDom, parent: NodeId, class: &str, text: &str) -> NodeId {
        let msg = dom.append_element(parent, "div", &[("class", class)]);
        dom.append_text(msg, "span", &[("class", "selectable-text")], text);
        msg
    }

    #[test]
    fn test_direction_from_class() {
        assert_eq!(
            Direction::from_class("_a focusable-list-item message-in"),
            Some(Direction::Incoming)
        );
        assert_eq!(Direction::from_class("message-out x"), Some(Direction::Outgoing));
        assert_eq!(Direction::from_class("copyable-text"), None);
    }

    #[test]
    fn test_single_new_tail_message() {
        let mut p = page();
        message(&mut p.dom, p.list, "message-in", "old");
        let new = message(&mut p.dom, p.list, "message-in", "new");

        let found = classify(&p.dom, &MutationBatch::added([new]), &EngineConfig::default());
        assert_eq!(
            found,
            vec![Candidate {
                node: new,
                direction: Direction::Incoming
            }]
        );
    }

    #[test]
    fn test_container_descendants_are_searched() {
        let mut p = page();
        let row = p.dom.append_element(p.list, "div", &[("role", "row")]);
        let msg = message(&mut p.dom, row, "message-out", "sent");

        let found = classify(&p.dom, &MutationBatch::added([row]), &EngineConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].node, msg);
        assert_eq!(found[0].direction, Direction::Outgoing);
    }

    #[test]
    fn test_bulk_guard() {
        let mut p = page();
        let config = EngineConfig::default();
        let added: Vec<_> = (0..config.bulk_threshold)
            .map(|i| message(&mut p.dom, p.list, "message-in", &format!("m{}", i)))
            .collect();

        assert!(classify(&p.dom, &MutationBatch::added(added), &config).is_empty());
    }

    #[test]
    fn test_tail_guard_keeps_only_last() {
        let mut p = page();
        let a = message(&mut p.dom, p.list, "message-in", "a");
        let b = message(&mut p.dom, p.list, "message-in", "b");
        let c = message(&mut p.dom, p.list, "message-out", "c");

        let found = classify(&p.dom, &MutationBatch::added([a, b, c]), &EngineConfig::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].node, c);
    }

    #[test]
    fn test_prepended_history_is_not_tail() {
        let mut p = page();
        let existing = message(&mut p.dom, p.list, "message-in", "latest");
        let fragment = p.dom.create_element("div", &[]);
        let older = message(&mut p.dom, fragment, "message-in", "older");
        // insert before the existing tail by rebuilding the list order
        p.dom.remove(existing);
        p.dom.append_child(p.list, fragment);
        p.dom.append_child(p.list, existing);

        let found = classify(&p.dom, &MutationBatch::added([older]), &EngineConfig::default());
        assert!(found.is_empty());
    }

    #[test]
    fn test_duplicates_within_batch() {
        let mut p = page();
        let row = p.dom.append_element(p.list, "div", &[]);
        let msg = message(&mut p.dom, row, "message-in", "x");

        let nodes = collect_message_nodes(&p.dom, &MutationBatch::added([row, msg, row]), p.main);
        assert_eq!(nodes, vec![msg]);
    }

    #[test]
    fn test_outside_main_panel_dropped() {
        let mut p = page();
        let side = p.dom.query(None, "#pane-side").unwrap();
        let preview = message(&mut p.dom, side, "message-in", "preview");

        assert!(classify(&p.dom, &MutationBatch::added([preview]), &EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_no_open_conversation() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let msg = message(&mut dom, body, "message-in", "x");

        assert!(classify(&dom, &MutationBatch::added([msg]), &EngineConfig::default()).is_empty());
    }
}
