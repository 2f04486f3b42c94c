//! Page descriptor assembly.
//!
//! DESIGN
//! ======
//! Props are applied in precedence order, each later source overriding the
//! earlier one for the same key:
//!
//! 1. shared props (skipped when a later source sets the same key)
//! 2. flash data left in the session by the previous request
//! 3. props collected on the request scope
//! 4. props passed to `render`
//!
//! Each prop passes through its kind's rules (deferred, optional, merge, ...)
//! and the partial reload filter. Lazy props are evaluated only when the
//! response includes them, at most once per render.
//!
//! ERROR HANDLING
//! ==============
//! A failing lazy prop is logged and left out of the response; the rest of
//! the page still renders.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};
use wire::{HEADER_ERROR_BAG, OncePropConfig, Page, PROP_ERRORS, PROP_FLASH, PROP_OLD};

use crate::partial::PartialConfig;
use crate::props::{MergeStrategy, Prop, PropKind, PropSource, Props};
use crate::scope::{RequestInfo, ScopeState};
use crate::session::FlashBag;

/// Everything that contributes props to one render.
pub(crate) struct PageSources<'a> {
    pub req: &'a RequestInfo,
    pub component: &'a str,
    pub version: &'a str,
    pub shared: &'a Props,
    pub session_flash: Option<FlashBag>,
    pub scope: &'a ScopeState,
    pub props: &'a Props,
    pub csrf_prop: Option<&'a str>,
}

pub(crate) async fn build_page(sources: PageSources<'_>) -> Page {
    let PageSources { req, component, version, shared, session_flash, scope, props, csrf_prop } = sources;

    let mut builder = PageBuilder {
        req,
        partial: PartialConfig::from_request(req, component, csrf_prop),
        page: Page {
            component: component.to_owned(),
            url: req.original_url().to_owned(),
            version: version.to_owned(),
            ..Page::default()
        },
        lazy_cache: HashMap::new(),
    };

    let scope_props = scope_props(scope);
    let overridden: BTreeSet<&str> = props.keys().chain(scope_props.keys()).collect();

    for (key, prop) in shared.iter().filter(|(key, _)| !overridden.contains(key)) {
        builder.set_prop(key, prop).await;
    }
    if let Some(bag) = session_flash {
        for (key, prop) in flash_bag_props(bag).iter() {
            builder.set_prop(key, prop).await;
        }
    }
    for (key, prop) in scope_props.iter() {
        builder.set_prop(key, prop).await;
    }
    for (key, prop) in props.iter() {
        builder.set_prop(key, prop).await;
    }

    let mut page = builder.page;
    for key in &scope.match_props_on {
        push_unique(&mut page.match_props_on, key);
    }
    page.props.entry(PROP_ERRORS).or_insert_with(|| Value::Object(Map::new()));
    if let Some(bag) = req.header(HEADER_ERROR_BAG) {
        apply_error_bag(&mut page.props, bag);
    }
    page
}

struct PageBuilder<'a> {
    req: &'a RequestInfo,
    partial: PartialConfig,
    page: Page,
    lazy_cache: HashMap<String, Value>,
}

impl PageBuilder<'_> {
    async fn set_prop(&mut self, key: &str, prop: &Prop) {
        if let Some(once) = &prop.once {
            let once_key = once.key.as_deref().unwrap_or(key);
            self.page
                .once_props
                .insert(once_key.to_owned(), OncePropConfig { prop: key.to_owned(), expires_at: once.expires_at });
            if self.partial.should_skip_once(once_key, key) {
                return;
            }
        }

        if let Some(group) = &prop.deferred {
            push_unique(self.page.deferred_props.entry(group.clone()).or_default(), key);
            if !self.partial.explicitly_included(key) {
                return;
            }
        }

        let include = match &prop.kind {
            PropKind::Plain => self.partial.should_include(key),
            PropKind::Optional => self.partial.explicitly_included(key),
            PropKind::Always => true,
            PropKind::Merge(strategy) => {
                if !self.partial.is_reset(key) {
                    let list = match strategy {
                        MergeStrategy::Append => &mut self.page.merge_props,
                        MergeStrategy::Prepend => &mut self.page.prepend_props,
                        MergeStrategy::Deep => &mut self.page.deep_merge_props,
                    };
                    push_unique(list, key);
                }
                self.partial.should_include(key)
            }
            PropKind::Scroll(config) => {
                self.page.scroll_props.insert(key.to_owned(), config.clone());
                if !self.partial.is_reset(key) {
                    let list = if self.partial.prepend_scroll() {
                        &mut self.page.prepend_props
                    } else {
                        &mut self.page.merge_props
                    };
                    push_unique(list, key);
                }
                self.partial.should_include(key)
            }
        };
        if !include {
            return;
        }

        if let Some(value) = self.resolve(key, &prop.source).await {
            self.page.props.insert(key.to_owned(), value);
        }
    }

    async fn resolve(&mut self, key: &str, source: &PropSource) -> Option<Value> {
        match source {
            PropSource::Value(value) => Some(value.clone()),
            PropSource::Lazy(lazy) => {
                if let Some(cached) = self.lazy_cache.get(key) {
                    return Some(cached.clone());
                }
                match lazy.evaluate(self.req).await {
                    Ok(value) => {
                        self.lazy_cache.insert(key.to_owned(), value.clone());
                        Some(value)
                    }
                    Err(e) => {
                        tracing::warn!(key, error = %e, "failed to evaluate prop");
                        None
                    }
                }
            }
        }
    }
}

/// Props the request scope contributes, reserved keys included.
fn scope_props(scope: &ScopeState) -> Props {
    let mut props = scope.props.clone();
    if !scope.flash.is_empty() {
        props.insert(PROP_FLASH, string_map(&scope.flash));
    }
    if !scope.errors.is_empty() {
        props.insert(PROP_ERRORS, string_map(&scope.errors));
    }
    if let Some(old) = &scope.old {
        props.insert(PROP_OLD, Value::Object(old.clone()));
    }
    props
}

fn flash_bag_props(bag: FlashBag) -> Props {
    let mut props = Props::new();
    if !bag.flash.is_empty() {
        props.insert(PROP_FLASH, string_map(&bag.flash));
    }
    if !bag.errors.is_empty() {
        props.insert(PROP_ERRORS, string_map(&bag.errors));
    }
    if let Some(old) = bag.old.filter(|old| !old.is_empty()) {
        props.insert(PROP_OLD, Value::Object(old));
    }
    props
}

pub(crate) fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
}

/// Nest the errors prop under `bag`.
///
/// Flat `{field: msg}` errors are wrapped; `{field: [msgs]}` errors keep their
/// first message; errors already keyed by bag just gain an empty entry.
fn apply_error_bag(props: &mut Map<String, Value>, bag: &str) {
    let wrapped = match props.remove(PROP_ERRORS) {
        Some(Value::Object(errors)) if errors.values().all(Value::is_string) => Value::Object(errors),
        Some(Value::Object(errors)) if errors.values().all(Value::is_array) => {
            let normalized = wire::normalize_validation_errors(&Value::Object(errors));
            let flat = wire::flatten_validation_errors(&normalized);
            Value::Object(flat.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
        }
        Some(Value::Object(mut bags)) => {
            bags.entry(bag).or_insert_with(|| Value::Object(Map::new()));
            props.insert(PROP_ERRORS.to_owned(), Value::Object(bags));
            return;
        }
        _ => Value::Object(Map::new()),
    };
    let mut outer = Map::new();
    outer.insert(bag.to_owned(), wrapped);
    props.insert(PROP_ERRORS.to_owned(), Value::Object(outer));
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|item| item == value) {
        list.push(value.to_owned());
    }
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
