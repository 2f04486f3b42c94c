//! Prop values and the wrappers that control when they reach the client.
//!
//! DESIGN
//! ======
//! A `Prop` is a value source (eager JSON or a lazy async closure) plus a
//! delivery kind (plain, optional, always, merge, scroll), an optional
//! deferred group and an optional once marker. Deferral sits beside the kind,
//! so a deferred prop can still merge into what the client holds once its
//! follow-up arrives. The page builder resolves a prop in a single pass.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use wire::{DEFAULT_DEFERRED_GROUP, ScrollPropConfig};

use crate::scope::RequestInfo;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PropError {
    #[error("{0}")]
    Failed(String),
    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// LAZY PROPS
// =============================================================================

pub type PropFuture = BoxFuture<'static, Result<Value, PropError>>;

/// A prop computed only when the response actually includes it.
///
/// Evaluated at most once per render; the closure receives the request so it
/// can pull headers or the URL before going async.
#[derive(Clone)]
pub struct LazyProp(Arc<dyn Fn(&RequestInfo) -> PropFuture + Send + Sync>);

impl LazyProp {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(&RequestInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, PropError>> + Send + 'static,
    {
        Self(Arc::new(move |req| Box::pin(f(req))))
    }

    pub fn evaluate(&self, req: &RequestInfo) -> PropFuture {
        (self.0)(req)
    }
}

impl fmt::Debug for LazyProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyProp(..)")
    }
}

// =============================================================================
// PROP
// =============================================================================

#[derive(Clone, Debug)]
pub enum PropSource {
    Value(Value),
    Lazy(LazyProp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    Append,
    Prepend,
    Deep,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropKind {
    /// Included unless a partial reload filters it out.
    Plain,
    /// Included only when a partial reload asks for it by name.
    Optional,
    /// Included on every response, partial or not.
    Always,
    /// Client merges the value into what it holds.
    Merge(MergeStrategy),
    /// Infinite-scroll list with pagination metadata.
    Scroll(ScrollPropConfig),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OnceSpec {
    /// Client-side cache key; defaults to the prop name.
    pub key: Option<String>,
    /// Unix milliseconds.
    pub expires_at: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct Prop {
    pub(crate) source: PropSource,
    pub(crate) kind: PropKind,
    /// Left out of the first response; listed under this group for a follow-up.
    pub(crate) deferred: Option<String>,
    pub(crate) once: Option<OnceSpec>,
}

impl Prop {
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self { source: PropSource::Value(value.into()), kind: PropKind::Plain, deferred: None, once: None }
    }

    /// Serialize any value into a plain prop.
    ///
    /// # Errors
    ///
    /// Returns [`PropError::Serialize`] if `value` cannot be represented as JSON.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self, PropError> {
        Ok(Self::value(serde_json::to_value(value)?))
    }

    pub fn lazy<F, Fut>(f: F) -> Self
    where
        F: Fn(&RequestInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, PropError>> + Send + 'static,
    {
        Self { source: PropSource::Lazy(LazyProp::new(f)), kind: PropKind::Plain, deferred: None, once: None }
    }

    /// Defer to a follow-up request. An empty group means the default group.
    /// Composes with the merge and scroll kinds.
    #[must_use]
    pub fn deferred(mut self, group: &str) -> Self {
        let group = if group.is_empty() { DEFAULT_DEFERRED_GROUP } else { group };
        self.deferred = Some(group.to_owned());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.kind = PropKind::Optional;
        self
    }

    #[must_use]
    pub fn always(mut self) -> Self {
        self.kind = PropKind::Always;
        self
    }

    #[must_use]
    pub fn merge(mut self) -> Self {
        self.kind = PropKind::Merge(MergeStrategy::Append);
        self
    }

    #[must_use]
    pub fn prepend(mut self) -> Self {
        self.kind = PropKind::Merge(MergeStrategy::Prepend);
        self
    }

    #[must_use]
    pub fn deep_merge(mut self) -> Self {
        self.kind = PropKind::Merge(MergeStrategy::Deep);
        self
    }

    #[must_use]
    pub fn scroll(mut self, config: ScrollPropConfig) -> Self {
        self.kind = PropKind::Scroll(config);
        self
    }

    /// Send once; the client keeps it across visits until it expires.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once.get_or_insert_with(OnceSpec::default);
        self
    }

    #[must_use]
    pub fn once_key(mut self, key: impl Into<String>) -> Self {
        self.once.get_or_insert_with(OnceSpec::default).key = Some(key.into());
        self
    }

    #[must_use]
    pub fn expires_at(mut self, unix_ms: i64) -> Self {
        self.once.get_or_insert_with(OnceSpec::default).expires_at = Some(unix_ms);
        self
    }

    #[must_use]
    pub fn kind(&self) -> &PropKind {
        &self.kind
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Self::value(value)
    }
}

impl From<&str> for Prop {
    fn from(value: &str) -> Self {
        Self::value(value)
    }
}

impl From<String> for Prop {
    fn from(value: String) -> Self {
        Self::value(value)
    }
}

impl From<i64> for Prop {
    fn from(value: i64) -> Self {
        Self::value(value)
    }
}

impl From<bool> for Prop {
    fn from(value: bool) -> Self {
        Self::value(value)
    }
}

impl From<LazyProp> for Prop {
    fn from(value: LazyProp) -> Self {
        Self { source: PropSource::Lazy(value), kind: PropKind::Plain, deferred: None, once: None }
    }
}

// =============================================================================
// PROPS
// =============================================================================

/// Ordered prop set handed to `Inertia::render`.
#[derive(Clone, Debug, Default)]
pub struct Props(BTreeMap<String, Prop>);

impl Props {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, prop: impl Into<Prop>) -> Self {
        self.insert(key, prop);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, prop: impl Into<Prop>) {
        self.0.insert(key.into(), prop.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Prop> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn extend(&mut self, other: Props) {
        self.0.extend(other.0);
    }
}

impl<K: Into<String>> FromIterator<(K, Prop)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, Prop)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
#[path = "props_test.rs"]
mod tests;
