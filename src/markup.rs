//! HTML output with addressable regions, and the read-only prop view
//! components render from.
//!
//! DESIGN
//! ======
//! A region is a named slice of markup that depends on one prop. The client
//! view replaces a single region when that prop resolves, leaving every other
//! part of the page byte-for-byte untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

// =============================================================================
// MARKUP
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Html(String),
    Region { name: String, html: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Markup {
    parts: Vec<Part>,
}

impl Markup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append trusted HTML.
    pub fn push_str(&mut self, html: &str) {
        if let Some(Part::Html(last)) = self.parts.last_mut() {
            last.push_str(html);
        } else {
            self.parts.push(Part::Html(html.to_owned()));
        }
    }

    /// Append text, escaped.
    pub fn text(&mut self, text: &str) {
        self.push_str(&html_escape::encode_text(text));
    }

    /// Append a named region.
    pub fn region(&mut self, name: &str, content: Markup) {
        self.parts.push(Part::Region { name: name.to_owned(), html: content.to_html() });
    }

    /// Append another markup, keeping its regions addressable.
    pub fn append(&mut self, other: Markup) {
        for part in other.parts {
            match part {
                Part::Html(html) => self.push_str(&html),
                region @ Part::Region { .. } => self.parts.push(region),
            }
        }
    }

    /// Replace the content of region `name`. Returns false if there is none.
    pub fn replace_region(&mut self, name: &str, content: Markup) -> bool {
        let html = content.to_html();
        let mut found = false;
        for part in &mut self.parts {
            if let Part::Region { name: n, html: h } = part {
                if n == name {
                    h.clone_from(&html);
                    found = true;
                }
            }
        }
        found
    }

    /// Flatten to HTML. Regions are wrapped in a `data-region` element.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Html(html) => out.push_str(html),
                Part::Region { name, html } => {
                    out.push_str("<div data-region=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(name));
                    out.push_str("\">");
                    out.push_str(html);
                    out.push_str("</div>");
                }
            }
        }
        out
    }
}

impl fmt::Write for Markup {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

/// Escape a value for a double-quoted attribute.
#[must_use]
pub fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

// =============================================================================
// PROPS VIEW
// =============================================================================

/// Where a prop stands from a component's point of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slot<'a> {
    /// Not sent and not expected.
    Missing,
    /// Deferred; a follow-up request will deliver it.
    Pending,
    Ready(&'a Value),
    /// The follow-up request failed.
    Failed(&'a str),
}

#[derive(Clone, Debug)]
pub struct PropsView<'a> {
    props: &'a Map<String, Value>,
    pending: BTreeSet<&'a str>,
    failed: BTreeMap<&'a str, &'a str>,
}

impl<'a> PropsView<'a> {
    #[must_use]
    pub fn new(props: &'a Map<String, Value>) -> Self {
        Self { props, pending: BTreeSet::new(), failed: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_pending(mut self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        self.pending.extend(keys);
        self
    }

    #[must_use]
    pub fn with_failed(mut self, key: &'a str, message: &'a str) -> Self {
        self.failed.insert(key, message);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.props.get(key)
    }

    #[must_use]
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn slot(&self, key: &str) -> Slot<'a> {
        if let Some(&message) = self.failed.get(key) {
            return Slot::Failed(message);
        }
        match self.props.get(key) {
            Some(value) => Slot::Ready(value),
            None if self.pending.contains(key) => Slot::Pending,
            None => Slot::Missing,
        }
    }
}

#[cfg(test)]
#[path = "markup_test.rs"]
mod tests;
