//! `HostDom` over the live browser document
//!
//! Elements are handed to the engine as numeric handles. The registry maps
//! handles to elements and back (through a JS `Map`, which keys on object
//! identity), so nothing is ever written onto the host page's nodes to
//! track them.

use chatlabel_core::{DomError, HostDom, MutationBatch, MutationRecord, NodeId};
use std::cell::RefCell;
use std::collections::HashMap;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, MutationObserver, MutationObserverInit, NodeList};

struct Registry {
    by_id: HashMap<u64, Element>,
    ids: js_sys::Map,
    next: u64,
}

impl Registry {
    fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            ids: js_sys::Map::new(),
            next: 0,
        }
    }

    fn lookup(&self, el: &Element) -> Option<NodeId> {
        self.ids.get(el).as_f64().map(|id| NodeId(id as u64))
    }

    fn handle(&mut self, el: Element) -> NodeId {
        if let Some(id) = self.lookup(&el) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.ids.set(&el, &JsValue::from_f64(id as f64));
        self.by_id.insert(id, el);
        NodeId(id)
    }

    fn forget(&mut self, node: NodeId) {
        if let Some(el) = self.by_id.remove(&node.0) {
            self.ids.delete(&el);
        }
    }
}

pub struct WebDom {
    document: Document,
    registry: RefCell<Registry>,
    listener: Option<js_sys::Function>,
    observer: Option<MutationObserver>,
}

fn host_error(e: JsValue) -> DomError {
    DomError::Host(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            registry: RefCell::new(Registry::new()),
            listener: None,
            observer: None,
        }
    }

    /// Callback handed to the `MutationObserver` on `observe`
    pub fn set_listener(&mut self, listener: js_sys::Function) {
        self.listener = Some(listener);
    }

    fn element(&self, node: NodeId) -> Option<Element> {
        self.registry.borrow().by_id.get(&node.0).cloned()
    }

    fn handle(&self, el: Element) -> NodeId {
        self.registry.borrow_mut().handle(el)
    }

    fn handles(&self, list: NodeList) -> Vec<NodeId> {
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|n| n.dyn_into::<Element>().ok())
            .map(|el| self.handle(el))
            .collect()
    }

    /// Translate the observer's records into a batch of handles
    ///
    /// Removed nodes the engine never saw are left out; there is nothing
    /// to forget about them.
    pub fn batch_from_records(&self, records: &js_sys::Array) -> MutationBatch {
        let mut out = Vec::new();
        for record in records.iter() {
            let Ok(record) = record.dyn_into::<web_sys::MutationRecord>() else {
                continue;
            };
            let added = self.handles(record.added_nodes());
            let removed_list = record.removed_nodes();
            let registry = self.registry.borrow();
            let removed = (0..removed_list.length())
                .filter_map(|i| removed_list.get(i))
                .filter_map(|n| n.dyn_into::<Element>().ok())
                .filter_map(|el| registry.lookup(&el))
                .collect();
            out.push(MutationRecord { added, removed });
        }
        MutationBatch::new(out)
    }

    /// Forget every handle whose element left the document
    pub fn sweep(&mut self) -> usize {
        let registry = self.registry.get_mut();
        let gone: Vec<u64> = registry
            .by_id
            .iter()
            .filter(|(_, el)| !el.is_connected())
            .map(|(id, _)| *id)
            .collect();
        for id in &gone {
            registry.forget(NodeId(*id));
        }
        gone.len()
    }

    pub fn tracked(&self) -> usize {
        self.registry.borrow().by_id.len()
    }
}

impl HostDom for WebDom {
    fn query(&self, scope: Option<NodeId>, selector: &str) -> Option<NodeId> {
        let found = match scope {
            None => self.document.query_selector(selector),
            Some(node) => self.element(node)?.query_selector(selector),
        };
        match found {
            Ok(el) => el.map(|el| self.handle(el)),
            Err(e) => {
                tracing::warn!("query '{}' failed: {:?}", selector, e);
                None
            }
        }
    }

    fn query_all(&self, scope: Option<NodeId>, selector: &str) -> Vec<NodeId> {
        let found = match scope {
            None => self.document.query_selector_all(selector),
            Some(node) => match self.element(node) {
                Some(el) => el.query_selector_all(selector),
                None => return Vec::new(),
            },
        };
        match found {
            Ok(list) => self.handles(list),
            Err(e) => {
                tracing::warn!("query_all '{}' failed: {:?}", selector, e);
                Vec::new()
            }
        }
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        self.element(node)
            .and_then(|el| el.matches(selector).ok())
            .unwrap_or(false)
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let el = self.element(node)?.closest(selector).ok()??;
        Some(self.handle(el))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        match (self.element(ancestor), self.element(node)) {
            (Some(a), Some(n)) => a.contains(Some(&n)),
            _ => false,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let el = self.element(node).ok_or(DomError::UnknownNode(node.0))?;
        if !el.is_connected() {
            return Err(DomError::Detached(node.0));
        }
        el.set_attribute(name, value).map_err(host_error)
    }

    fn rendered_text(&self, node: NodeId) -> String {
        let Some(el) = self.element(node) else {
            return String::new();
        };
        match el.dyn_ref::<HtmlElement>() {
            Some(html) => html.inner_text(),
            None => el.text_content().unwrap_or_default(),
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|el| el.is_connected())
    }

    fn observe(&mut self, root: NodeId) -> Result<(), DomError> {
        let el = self.element(root).ok_or(DomError::UnknownNode(root.0))?;
        let listener = self
            .listener
            .clone()
            .ok_or_else(|| DomError::Host("no mutation listener installed".to_string()))?;

        self.disconnect();
        let observer = MutationObserver::new(&listener).map_err(host_error)?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&el, &init)
            .map_err(host_error)?;
        self.observer = Some(observer);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
    }

    fn release(&mut self, node: NodeId) {
        self.registry.get_mut().forget(node);
    }
}
