//! Idempotent labeling of the visible surface
//!
//! The pass re-scans the whole open conversation every time it runs, but a
//! message node is only ever worked on once: after its first visit it is
//! marked processed and skipped. That bounded cost is what lets the engine
//! run the pass after every mutation burst.

use crate::dom::{find_first, selectors, set_attribute_if_changed, HostDom, NodeId};
use crate::extract::extract;
use crate::locale::Strings;
use crate::marks::NodeMarks;
use crate::sanitize::sanitize;
use serde::Serialize;
use tracing::{debug, warn};

pub const ARIA_LABEL: &str = "aria-label";

/// What one pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Messages labeled from an extracted description
    pub labeled: usize,
    /// Messages labeled from sanitized raw text
    pub fallback: usize,
    /// Messages with nothing usable to say
    pub unlabeled: usize,
    /// Messages already processed by an earlier pass
    pub skipped: usize,
    /// Attribute writes performed
    pub writes: usize,
}

/// Label the compose footer and every unprocessed message
pub fn run<D: HostDom + ?Sized>(dom: &mut D, marks: &mut NodeMarks, strings: &Strings) -> PassReport {
    let mut report = PassReport::default();
    annotate_footer(dom, strings, &mut report);
    annotate_messages(dom, marks, strings, &mut report);
    debug!("Annotation pass: {:?}", report);
    report
}

/// Write `label` onto a message and mirror it onto its text node
///
/// The label goes on the most specific focusable descendant (else the
/// message itself). The mirror on the inner text node makes character and
/// word navigation read the cleaned text too. Returns the number of writes.
pub fn apply_label<D: HostDom + ?Sized>(dom: &mut D, node: NodeId, label: &str) -> usize {
    let target = dom.query(Some(node), selectors::FOCUSABLE).unwrap_or(node);
    let mut writes = write_label(dom, target, label) as usize;

    if let Some(text_node) = dom.query(Some(node), selectors::SELECTABLE_TEXT) {
        if text_node != target {
            writes += write_label(dom, text_node, label) as usize;
        }
    }
    writes
}

fn write_label<D: HostDom + ?Sized>(dom: &mut D, node: NodeId, label: &str) -> bool {
    match set_attribute_if_changed(dom, node, ARIA_LABEL, label) {
        Ok(written) => written,
        Err(e) => {
            warn!("Skipping label on {}: {}", node, e);
            false
        }
    }
}

fn annotate_footer<D: HostDom + ?Sized>(dom: &mut D, strings: &Strings, report: &mut PassReport) {
    let Some(footer) = dom.query(None, selectors::FOOTER) else {
        debug!("No footer; skipping compose labels");
        return;
    };

    if let Some(input) = dom.query(Some(footer), selectors::COMPOSE_INPUT) {
        let name = conversation_title(dom).unwrap_or_default();
        let label = format!("{}{}", strings.write_to, name);
        report.writes += write_label(dom, input, &label) as usize;
    }

    for (icon_selector, label) in [
        (selectors::SEND_ICON, strings.send),
        (selectors::RECORD_ICON, strings.record),
    ] {
        if let Some(icon) = dom.query(None, icon_selector) {
            let target = dom.closest(icon, selectors::BUTTON).unwrap_or(icon);
            report.writes += write_label(dom, target, label) as usize;
        }
    }
}

/// Display name of the open conversation
pub fn conversation_title<D: HostDom + ?Sized>(dom: &D) -> Option<String> {
    let title = find_first(dom, None, selectors::HEADER_TITLE)?;
    let text = dom.rendered_text(title);
    let text = text.trim();
    if !text.is_empty() {
        return Some(text.to_string());
    }
    dom.attribute(title, "title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn annotate_messages<D: HostDom + ?Sized>(
    dom: &mut D,
    marks: &mut NodeMarks,
    strings: &Strings,
    report: &mut PassReport,
) {
    let Some(main) = dom.query(None, selectors::MAIN_PANEL) else {
        debug!("No open conversation; skipping message labels");
        return;
    };

    for node in dom.query_all(Some(main), selectors::MESSAGE) {
        if marks.is_processed(node) {
            report.skipped += 1;
            continue;
        }

        report.writes += label_audio_controls(dom, node, strings);

        let label = match extract(dom, node, strings) {
            Some(description) => {
                report.labeled += 1;
                Some(description)
            }
            None => {
                let raw = sanitize(&dom.rendered_text(node));
                if raw.is_empty() {
                    report.unlabeled += 1;
                    None
                } else {
                    report.fallback += 1;
                    Some(raw)
                }
            }
        };

        if let Some(label) = &label {
            report.writes += apply_label(dom, node, label);
        }
        marks.mark_processed(node, label);
    }
}

fn label_audio_controls<D: HostDom + ?Sized>(dom: &mut D, node: NodeId, strings: &Strings) -> usize {
    let buttons: Vec<NodeId> = dom
        .query_all(Some(node), selectors::AUDIO_PLAY_ICON)
        .into_iter()
        .filter_map(|icon| dom.closest(icon, selectors::BUTTON))
        .collect();
    buttons
        .into_iter()
        .map(|button| write_label(dom, button, strings.play) as usize)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::locale::Locale;
    use pretty_assertions::assert_eq;

    struct Page {
        dom: MemoryDom,
        header_title: NodeId,
        input: NodeId,
        send: NodeId,
        list: NodeId,
    }

    fn page() -> Page {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let app = dom.append_element(body, "div", &[("id", "app")]);
        dom.append_element(app, "div", &[("id", "pane-side")]);
        let main = dom.append_element(app, "div", &[("id", "main")]);
        let header = dom.append_element(main, "header", &[]);
        let header_title = dom.append_text(header, "span", &[("title", "Ana")], "Ana");
        let list = dom.append_element(main, "div", &[]);
        let footer = dom.append_element(main, "footer", &[]);
        let input = dom.append_element(footer, "div", &[("contenteditable", "true")]);
        let send = dom.append_element(footer, "button", &[]);
        dom.append_element(send, "span", &[("data-icon", "send")]);
        Page {
            dom,
            header_title,
            input,
            send,
            list,
        }
    }

    fn text_message(dom: &mut MemoryDom, list: NodeId, text: &str) -> (NodeId, NodeId, NodeId) {
        let msg = dom.append_element(list, "div", &[("class", "message-in")]);
        let focusable = dom.append_element(msg, "div", &[("tabindex", "-1")]);
        let span = dom.append_text(focusable, "span", &[("class", "selectable-text")], text);
        dom.append_text(focusable, "span", &[], "10:42");
        (msg, focusable, span)
    }

    #[test]
    fn test_footer_labels() {
        let mut p = page();
        let mut marks = NodeMarks::new();
        run(&mut p.dom, &mut marks, Locale::PtBr.strings());

        assert_eq!(
            p.dom.attribute(p.input, ARIA_LABEL).as_deref(),
            Some("Escrever para: Ana")
        );
        assert_eq!(
            p.dom.attribute(p.send, ARIA_LABEL).as_deref(),
            Some("Enviar mensagem")
        );
    }

    #[test]
    fn test_footer_follows_open_conversation() {
        let mut p = page();
        let mut marks = NodeMarks::new();
        let strings = Locale::EnUs.strings();
        run(&mut p.dom, &mut marks, strings);

        p.dom.set_text(p.header_title, "Bruno");
        run(&mut p.dom, &mut marks, strings);
        assert_eq!(
            p.dom.attribute(p.input, ARIA_LABEL).as_deref(),
            Some("Write to: Bruno")
        );
    }

    #[test]
    fn test_message_label_and_mirror() {
        let mut p = page();
        let (msg, focusable, span) = text_message(&mut p.dom, p.list, "Nome: 11 99999-9999 chegando");
        let mut marks = NodeMarks::new();

        let report = run(&mut p.dom, &mut marks, Locale::EnUs.strings());
        assert_eq!(report.labeled, 1);
        assert_eq!(
            p.dom.attribute(focusable, ARIA_LABEL).as_deref(),
            Some("Nome: chegando")
        );
        assert_eq!(
            p.dom.attribute(span, ARIA_LABEL).as_deref(),
            Some("Nome: chegando")
        );
        assert!(marks.is_processed(msg));
        assert_eq!(marks.label(msg), Some("Nome: chegando"));
    }

    #[test]
    fn test_second_pass_writes_nothing() {
        let mut p = page();
        text_message(&mut p.dom, p.list, "one");
        text_message(&mut p.dom, p.list, "two");
        let mut marks = NodeMarks::new();
        let strings = Locale::EnUs.strings();

        let first = run(&mut p.dom, &mut marks, strings);
        assert!(first.writes > 0);
        let writes_after_first = p.dom.attribute_writes();

        let second = run(&mut p.dom, &mut marks, strings);
        assert_eq!(second.writes, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(p.dom.attribute_writes(), writes_after_first);
    }

    #[test]
    fn test_unusable_message_still_processed() {
        let mut p = page();
        let msg = p.dom.append_element(p.list, "div", &[("class", "message-out")]);
        let mut marks = NodeMarks::new();

        let report = run(&mut p.dom, &mut marks, Locale::EnUs.strings());
        assert_eq!(report.unlabeled, 1);
        assert!(marks.is_processed(msg));
        assert_eq!(p.dom.attribute(msg, ARIA_LABEL), None);
    }

    #[test]
    fn test_time_only_message_falls_back_to_raw_text() {
        let mut p = page();
        let msg = p.dom.append_element(p.list, "div", &[("class", "message-out")]);
        p.dom.append_text(msg, "span", &[], "10:42");
        let mut marks = NodeMarks::new();

        let report = run(&mut p.dom, &mut marks, Locale::EnUs.strings());
        assert_eq!(report.fallback, 1);
        assert_eq!(p.dom.attribute(msg, ARIA_LABEL).as_deref(), Some("10:42"));
    }

    #[test]
    fn test_audio_button_labeled() {
        let mut p = page();
        let msg = p.dom.append_element(p.list, "div", &[("class", "message-in")]);
        let button = p.dom.append_element(msg, "button", &[]);
        p.dom.append_element(button, "span", &[("data-icon", "audio-play")]);
        let mut marks = NodeMarks::new();

        run(&mut p.dom, &mut marks, Locale::EsEs.strings());
        assert_eq!(
            p.dom.attribute(button, ARIA_LABEL).as_deref(),
            Some("Reproducir")
        );
    }

    #[test]
    fn test_no_conversation_open() {
        let mut dom = MemoryDom::new();
        let mut marks = NodeMarks::new();
        let report = run(&mut dom, &mut marks, Locale::EnUs.strings());
        assert_eq!(report, PassReport::default());
        assert_eq!(dom.attribute_writes(), 0);
    }
}
