//! Partial reload filtering.
//!
//! A partial reload only applies when the client names the component being
//! rendered. `X-Inertia-Partial-Except` wins over `X-Inertia-Partial-Data`
//! when both are sent.

use std::collections::BTreeSet;

use wire::{
    HEADER_EXCEPT_ONCE_PROPS, HEADER_INFINITE_SCROLL_MERGE_INTENT, HEADER_PARTIAL_COMPONENT, HEADER_PARTIAL_EXCEPT,
    HEADER_PARTIAL_ONLY, HEADER_RESET, PROP_ERRORS, PROP_FLASH, PROP_OLD,
};

use crate::scope::RequestInfo;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Filter {
    All,
    Only(BTreeSet<String>),
    Except(BTreeSet<String>),
}

#[derive(Clone, Debug)]
pub struct PartialConfig {
    filter: Filter,
    reset: BTreeSet<String>,
    except_once: BTreeSet<String>,
    force_include: BTreeSet<String>,
    scroll_merge_intent: String,
}

impl PartialConfig {
    /// Read partial reload headers for a render of `component`.
    ///
    /// `csrf_prop` is always included in a partial response when set.
    #[must_use]
    pub fn from_request(req: &RequestInfo, component: &str, csrf_prop: Option<&str>) -> Self {
        let list = |name: &str| req.header(name).and_then(wire::parse_header_list).unwrap_or_default();

        let component_matches = req.header(HEADER_PARTIAL_COMPONENT) == Some(component);
        let filter = if component_matches {
            if let Some(except) = req.header(HEADER_PARTIAL_EXCEPT) {
                Filter::Except(wire::parse_header_list(except).unwrap_or_default())
            } else if let Some(only) = req.header(HEADER_PARTIAL_ONLY) {
                Filter::Only(wire::parse_header_list(only).unwrap_or_default())
            } else {
                Filter::All
            }
        } else {
            Filter::All
        };

        let mut force_include = BTreeSet::new();
        if filter != Filter::All {
            force_include.extend([PROP_ERRORS, PROP_FLASH, PROP_OLD].map(str::to_owned));
            if let Some(csrf) = csrf_prop.filter(|p| !p.is_empty()) {
                force_include.insert(csrf.to_owned());
            }
        }

        Self {
            filter,
            reset: list(HEADER_RESET),
            except_once: list(HEADER_EXCEPT_ONCE_PROPS),
            force_include,
            scroll_merge_intent: req
                .header(HEADER_INFINITE_SCROLL_MERGE_INTENT)
                .map(str::to_ascii_lowercase)
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.filter != Filter::All
    }

    /// Whether a regular prop makes it into this response.
    #[must_use]
    pub fn should_include(&self, key: &str) -> bool {
        if self.force_include.contains(key) {
            return true;
        }
        match &self.filter {
            Filter::All => true,
            Filter::Only(keys) => keys.contains(key),
            Filter::Except(keys) => !keys.contains(key),
        }
    }

    /// Named in `X-Inertia-Partial-Data`. Deferred and optional props need this.
    #[must_use]
    pub fn explicitly_included(&self, key: &str) -> bool {
        matches!(&self.filter, Filter::Only(keys) if keys.contains(key))
    }

    /// Merge metadata for `key` is dropped on this response.
    #[must_use]
    pub fn is_reset(&self, key: &str) -> bool {
        self.reset.contains(key)
    }

    /// The client already holds the once prop and did not ask for it again.
    #[must_use]
    pub fn should_skip_once(&self, once_key: &str, prop_key: &str) -> bool {
        self.except_once.contains(once_key) && !self.explicitly_included(prop_key)
    }

    #[must_use]
    pub fn prepend_scroll(&self) -> bool {
        self.scroll_merge_intent == "prepend"
    }
}

#[cfg(test)]
#[path = "partial_test.rs"]
mod tests;
