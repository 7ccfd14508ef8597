//! Best-effort description of a message bubble
//!
//! No single DOM shape is stable across message types, so extraction is an
//! ordered chain of strategies where the first one producing text wins:
//!
//! 1. Contact card ("start chat with <name>" affordance)
//! 2. Selectable message text
//! 3. System/event notice
//! 4. Image with its alt text
//! 5. Voice message play control
//! 6. Raw visible text minus the trailing time
//!
//! Everything except contact cards is sanitized; names on contact cards may
//! legitimately contain digits. Results are never cached because the host
//! keeps filling bubbles in after inserting them.

use crate::dom::{selectors, HostDom, NodeId};
use crate::locale::Strings;
use crate::sanitize::{sanitize, strip_trailing_timestamp};

/// Which step of the chain produced a description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ContactCard,
    Text,
    System,
    Image,
    Voice,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub strategy: Strategy,
    pub text: String,
}

/// Description of `node`, or `None` when nothing usable was found
pub fn extract<D: HostDom + ?Sized>(dom: &D, node: NodeId, strings: &Strings) -> Option<String> {
    extract_detailed(dom, node, strings).map(|e| e.text)
}

pub fn extract_detailed<D: HostDom + ?Sized>(
    dom: &D,
    node: NodeId,
    strings: &Strings,
) -> Option<Extraction> {
    const CHAIN: [Strategy; 6] = [
        Strategy::ContactCard,
        Strategy::Text,
        Strategy::System,
        Strategy::Image,
        Strategy::Voice,
        Strategy::Fallback,
    ];

    CHAIN.iter().find_map(|strategy| {
        let raw = match strategy {
            Strategy::ContactCard => contact_card_name(dom, node)
                .map(|name| format!("{}{}", strings.contact, name)),
            Strategy::Text => text_of(dom, node, selectors::SELECTABLE_TEXT),
            Strategy::System => text_of(dom, node, selectors::SYSTEM_TEXT),
            Strategy::Image => image_description(dom, node, strings),
            Strategy::Voice => query_inclusive(dom, node, selectors::AUDIO_PLAY_ICON)
                .map(|_| strings.play.to_string()),
            Strategy::Fallback => Some(strip_trailing_timestamp(&dom.rendered_text(node))),
        }?;
        // names on contact cards may legitimately contain digits
        let text = match strategy {
            Strategy::ContactCard => raw,
            _ => sanitize(&raw),
        };
        (!text.is_empty()).then_some(Extraction {
            strategy: *strategy,
            text,
        })
    })
}

fn query_inclusive<D: HostDom + ?Sized>(dom: &D, node: NodeId, selector: &str) -> Option<NodeId> {
    if dom.matches(node, selector) {
        return Some(node);
    }
    dom.query(Some(node), selector)
}

fn contact_card_name<D: HostDom + ?Sized>(dom: &D, node: NodeId) -> Option<String> {
    let mut holders = dom.query_all(Some(node), selectors::CONTACT_CARD_ACTION);
    if dom.matches(node, selectors::CONTACT_CARD_ACTION) {
        holders.insert(0, node);
    }

    holders.into_iter().find_map(|holder| {
        let title = dom.attribute(holder, "title")?;
        selectors::CONTACT_CARD_PREFIXES.iter().find_map(|prefix| {
            let name = title.strip_prefix(prefix)?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
    })
}

fn text_of<D: HostDom + ?Sized>(dom: &D, node: NodeId, selector: &str) -> Option<String> {
    let target = query_inclusive(dom, node, selector)?;
    let text = dom.rendered_text(target);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn image_description<D: HostDom + ?Sized>(
    dom: &D,
    node: NodeId,
    strings: &Strings,
) -> Option<String> {
    let image = query_inclusive(dom, node, selectors::IMAGE)?;
    let alt = dom.attribute(image, "alt").unwrap_or_default();
    let alt = alt.trim();
    if alt.is_empty() {
        Some(strings.image_no_description.to_string())
    } else {
        Some(format!("{}{}", strings.image, alt))
    }
}
