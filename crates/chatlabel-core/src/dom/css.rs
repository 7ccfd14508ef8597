//! Minimal CSS selector support for [`super::MemoryDom`]
//!
//! Covers exactly what the selector table uses: type, `#id`, `.class`,
//! `[attr]`, `[attr="v"]`, `[attr*="v"]`, `[attr^="v"]`, the descendant
//! combinator and comma-separated lists.

use crate::error::DomError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrSelector {
    pub name: String,
    pub op: AttrOp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
}

/// Descendant chain, outermost first; the last compound is the subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Complex(pub Vec<Compound>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(pub Vec<Complex>);

/// Read-only view of one element used during matching
pub(crate) trait ElementView {
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl Compound {
    pub fn matches<E: ElementView + ?Sized>(&self, el: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = el.attr("class").unwrap_or("");
            let has_all = self
                .classes
                .iter()
                .all(|wanted| class_attr.split_whitespace().any(|c| c == wanted));
            if !has_all {
                return false;
            }
        }
        self.attrs.iter().all(|a| match (&a.op, el.attr(&a.name)) {
            (_, None) => false,
            (AttrOp::Exists, Some(_)) => true,
            (AttrOp::Equals(v), Some(actual)) => actual == v,
            (AttrOp::Contains(v), Some(actual)) => !v.is_empty() && actual.contains(v.as_str()),
            (AttrOp::Prefix(v), Some(actual)) => !v.is_empty() && actual.starts_with(v.as_str()),
        })
    }
}

pub(crate) fn parse(input: &str) -> Result<SelectorList, DomError> {
    let mut list = Vec::new();
    for part in split_top_level(input, |c| c == ',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(DomError::Selector(input.to_string()));
        }
        let compounds = split_top_level(part, char::is_whitespace)
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(parse_compound)
            .collect::<Result<Vec<_>, _>>()?;
        list.push(Complex(compounds));
    }
    if list.is_empty() {
        return Err(DomError::Selector(input.to_string()));
    }
    Ok(SelectorList(list))
}

/// Split on `is_sep` outside of brackets and quotes
fn split_top_level(input: &str, is_sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if depth == 0 && is_sep(c) => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_compound(input: &str) -> Result<Compound, DomError> {
    let err = || DomError::Selector(input.to_string());
    let mut compound = Compound::default();
    let mut rest = input;

    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '*'))
        .unwrap_or(rest.len());
    if tag_len > 0 {
        let tag = &rest[..tag_len];
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_len..];
    }

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let len = body
                    .find(|c: char| matches!(c, '#' | '.' | '['))
                    .unwrap_or(body.len());
                if len == 0 {
                    return Err(err());
                }
                let name = body[..len].to_string();
                if first == '#' {
                    compound.id = Some(name);
                } else {
                    compound.classes.push(name);
                }
                rest = &body[len..];
            }
            '[' => {
                let close = find_attr_close(rest).ok_or_else(err)?;
                compound.attrs.push(parse_attr(&rest[1..close]).ok_or_else(err)?);
                rest = &rest[close + 1..];
            }
            _ => return Err(err()),
        }
    }

    Ok(compound)
}

fn find_attr_close(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attr(inner: &str) -> Option<AttrSelector> {
    let Some(eq) = inner.find('=') else {
        let name = inner.trim();
        return (!name.is_empty()).then(|| AttrSelector {
            name: name.to_string(),
            op: AttrOp::Exists,
        });
    };

    let (name, modifier) = match inner[..eq].trim_end() {
        n if n.ends_with('*') => (&n[..n.len() - 1], Some('*')),
        n if n.ends_with('^') => (&n[..n.len() - 1], Some('^')),
        n => (n, None),
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let raw = inner[eq + 1..].trim();
    let value = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(raw)
        .to_string();

    let op = match modifier {
        Some('*') => AttrOp::Contains(value),
        Some('^') => AttrOp::Prefix(value),
        _ => AttrOp::Equals(value),
    };
    Some(AttrSelector {
        name: name.to_string(),
        op,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct El {
        tag: &'static str,
        attrs: HashMap<&'static str, &'static str>,
    }

    impl ElementView for El {
        fn tag(&self) -> &str {
            self.tag
        }
        fn attr(&self, name: &str) -> Option<&str> {
            self.attrs.get(name).copied()
        }
    }

    fn el(tag: &'static str, attrs: &[(&'static str, &'static str)]) -> El {
        El {
            tag,
            attrs: attrs.iter().copied().collect(),
        }
    }

    #[test]
    fn test_parse_list_and_descendants() {
        let list = parse("#main header span[title], footer [contenteditable=\"true\"]").unwrap();
        assert_eq!(list.0.len(), 2);
        assert_eq!(list.0[0].0.len(), 3);
        assert_eq!(list.0[0].0[0].id.as_deref(), Some("main"));
        assert_eq!(list.0[1].0[1].attrs[0].op, AttrOp::Equals("true".into()));
    }

    #[test]
    fn test_attribute_operators() {
        let bubble = el("div", &[("class", "focusable message-in x"), ("title", "Chat with Ana")]);

        assert!(parse("[class*=\"message-in\"]").unwrap().0[0].0[0].matches(&bubble));
        assert!(parse("div[title^='Chat with ']").unwrap().0[0].0[0].matches(&bubble));
        assert!(parse(".message-in.focusable").unwrap().0[0].0[0].matches(&bubble));
        assert!(!parse("span[title]").unwrap().0[0].0[0].matches(&bubble));
        assert!(!parse("[class*=\"message-out\"]").unwrap().0[0].0[0].matches(&bubble));
    }

    #[test]
    fn test_invalid_selectors_rejected() {
        assert!(parse("").is_err());
        assert!(parse("div,").is_err());
        assert!(parse("[title").is_err());
        assert!(parse("div > span").is_err());
    }
}
