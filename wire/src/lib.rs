//! Shared page protocol for the server adapter and the client view.
//!
//! This crate owns the wire representation exchanged between the router,
//! the SSR renderer and the browser-side view: the page descriptor, the SSR
//! response, the protocol headers and the validation error shapes. Payloads
//! stay flexible (`serde_json::Value`) and are encoded as JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// HEADERS
// =============================================================================

/// Marks a request (and its response) as a page visit rather than a full load.
pub const HEADER_INERTIA: &str = "X-Inertia";
/// Location to hard-reload on version mismatch or external redirect.
pub const HEADER_LOCATION: &str = "X-Inertia-Location";
/// Asset version the client was built against.
pub const HEADER_VERSION: &str = "X-Inertia-Version";
/// Component the partial reload targets.
pub const HEADER_PARTIAL_COMPONENT: &str = "X-Inertia-Partial-Component";
/// Comma-separated prop names to include on a partial reload.
pub const HEADER_PARTIAL_ONLY: &str = "X-Inertia-Partial-Data";
/// Comma-separated prop names to exclude on a partial reload.
pub const HEADER_PARTIAL_EXCEPT: &str = "X-Inertia-Partial-Except";
/// Comma-separated merge props whose merge metadata is dropped.
pub const HEADER_RESET: &str = "X-Inertia-Reset";
/// Error bag name wrapping the `errors` prop.
pub const HEADER_ERROR_BAG: &str = "X-Inertia-Error-Bag";
/// Comma-separated once-prop keys the client already holds.
pub const HEADER_EXCEPT_ONCE_PROPS: &str = "X-Inertia-Except-Once-Props";
/// `append` or `prepend` for infinite-scroll props.
pub const HEADER_INFINITE_SCROLL_MERGE_INTENT: &str = "X-Inertia-Infinite-Scroll-Merge-Intent";
/// Marks a validation-only request.
pub const HEADER_PRECOGNITION: &str = "Precognition";
/// Set on a successful validation-only response.
pub const HEADER_PRECOGNITION_SUCCESS: &str = "Precognition-Success";
/// Comma-separated fields a validation-only request cares about.
pub const HEADER_PRECOGNITION_VALIDATE_ONLY: &str = "Precognition-Validate-Only";

// =============================================================================
// RESERVED PROP KEYS
// =============================================================================

pub const PROP_ERRORS: &str = "errors";
pub const PROP_OLD: &str = "old";
pub const PROP_FLASH: &str = "flash";
pub const PROP_CSRF_TOKEN: &str = "csrf_token";

/// Group used for deferred props declared without one.
pub const DEFAULT_DEFERRED_GROUP: &str = "default";

// =============================================================================
// TYPES
// =============================================================================

/// Field-keyed validation messages, e.g. `{"email": ["invalid"]}`.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// Error returned by [`decode_page`] and [`decode_ssr`].
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The bytes were not a valid JSON document of the expected shape.
    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The page descriptor: which component to render and with what props.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Logical component name resolved through the page registry.
    pub component: String,
    /// Props handed verbatim to the component.
    pub props: Map<String, Value>,
    /// Original request URL (path and query).
    pub url: String,
    /// Asset version of the server build.
    pub version: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub encrypt_history: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_history: bool,
    /// Deferred prop names keyed by group.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deferred_props: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge_props: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepend_props: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deep_merge_props: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_props_on: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scroll_props: BTreeMap<String, ScrollPropConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub once_props: BTreeMap<String, OncePropConfig>,
}

impl Page {
    /// Return every deferred prop name, across all groups.
    #[must_use]
    pub fn deferred_keys(&self) -> BTreeSet<&str> {
        self.deferred_props
            .values()
            .flat_map(|keys| keys.iter().map(String::as_str))
            .collect()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Pagination metadata attached to an infinite-scroll prop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPropConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<Value>,
}

/// Once-prop bookkeeping. `expires_at` is unix milliseconds; `None` encodes as `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OncePropConfig {
    pub prop: String,
    pub expires_at: Option<i64>,
}

/// Response of an SSR renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsrResponse {
    /// Head tags, one per entry.
    #[serde(default)]
    pub head: Vec<String>,
    /// Rendered body markup, including the mount element.
    #[serde(default)]
    pub body: String,
}

/// Body of a 422 validation-only response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationBody {
    #[serde(default)]
    pub errors: Value,
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a page descriptor as JSON bytes.
///
/// Map keys are ordered, so equal pages always encode to equal bytes.
#[must_use]
pub fn encode_page(page: &Page) -> Vec<u8> {
    // Serializing a `Page` cannot fail: all keys are strings and all values
    // are already JSON.
    serde_json::to_vec(page).unwrap_or_default()
}

/// Decode a page descriptor from JSON bytes.
///
/// # Errors
///
/// Returns [`WireError::Decode`] for malformed JSON or a missing `component`.
pub fn decode_page(bytes: &[u8]) -> Result<Page, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode an SSR response from JSON bytes.
///
/// # Errors
///
/// Returns [`WireError::Decode`] when the body is not an SSR response.
pub fn decode_ssr(bytes: &[u8]) -> Result<SsrResponse, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

// =============================================================================
// HEADER LISTS
// =============================================================================

/// Parse a comma-separated header list into a set.
///
/// Blank items are dropped; an empty result is `None`.
#[must_use]
pub fn parse_header_list(value: &str) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();
    if set.is_empty() { None } else { Some(set) }
}

/// Join prop names into a header list value.
#[must_use]
pub fn join_header_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items.into_iter().collect::<Vec<_>>().join(",")
}

// =============================================================================
// VALIDATION ERRORS
// =============================================================================

/// Normalize any of the accepted error shapes into field → messages.
///
/// Accepted: `{field: "msg"}`, `{field: ["msg", ...]}` and bags
/// `{bag: {field: "msg"}}` (nested objects are flattened by field name).
#[must_use]
pub fn normalize_validation_errors(value: &Value) -> ValidationErrors {
    let mut out = ValidationErrors::new();
    if let Value::Object(map) = value {
        for (field, val) in map {
            merge_validation_value(&mut out, field, val);
        }
    }
    out
}

fn merge_validation_value(dst: &mut ValidationErrors, field: &str, value: &Value) {
    match value {
        Value::String(msg) => {
            dst.insert(field.to_owned(), vec![msg.clone()]);
        }
        Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect();
            if !msgs.is_empty() {
                dst.insert(field.to_owned(), msgs);
            }
        }
        Value::Object(nested) => {
            for (nested_field, nested_val) in nested {
                merge_validation_value(dst, nested_field, nested_val);
            }
        }
        _ => {}
    }
}

/// Keep only the first message for each field.
#[must_use]
pub fn flatten_validation_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .iter()
        .filter_map(|(field, msgs)| msgs.first().map(|m| (field.clone(), m.clone())))
        .collect()
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
