//! Per-request scope: request metadata plus the props, errors and flash
//! messages handlers accumulate before rendering.
//!
//! DESIGN
//! ======
//! The middleware creates one `InertiaRequest` per request and stores it in
//! the request extensions; handlers pull it out with the extractor. The same
//! shared state is read back by the middleware after the handler returns, to
//! persist flash data for the next visit. Nothing here is global.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde_json::{Map, Value};
use wire::{HEADER_INERTIA, HEADER_PRECOGNITION, ValidationErrors};

use crate::error::{FlashLevel, FlashMessage};
use crate::props::{Prop, Props};

// =============================================================================
// REQUEST INFO
// =============================================================================

/// Immutable request metadata visible to lazy props and the page builder.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        Self { method: parts.method.clone(), uri: parts.uri.clone(), headers: parts.headers.clone() }
    }

    /// Header value, trimmed; `None` when absent, blank or not valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_inertia(&self) -> bool {
        self.header(HEADER_INERTIA).is_some()
    }

    #[must_use]
    pub fn is_precognition(&self) -> bool {
        self.header(HEADER_PRECOGNITION).is_some()
    }

    /// Path and query as the client requested them.
    #[must_use]
    pub fn original_url(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    #[must_use]
    pub fn referer(&self) -> Option<&str> {
        self.header(axum::http::header::REFERER.as_str())
    }

    #[must_use]
    pub fn is_mutating(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
    }

    #[cfg(test)]
    pub(crate) fn for_test(method: Method, uri: &str) -> Self {
        Self { method, uri: uri.parse().unwrap_or_default(), headers: HeaderMap::new() }
    }
}

// =============================================================================
// SCOPE STATE
// =============================================================================

#[derive(Debug, Default, Clone)]
pub(crate) struct ScopeState {
    pub props: Props,
    pub view_data: Map<String, Value>,
    pub match_props_on: Vec<String>,
    pub flash: BTreeMap<String, String>,
    pub errors: BTreeMap<String, String>,
    pub old: Option<Map<String, Value>>,
}

impl ScopeState {
    pub fn has_flash_data(&self) -> bool {
        !self.flash.is_empty() || !self.errors.is_empty() || self.old.is_some()
    }
}

// =============================================================================
// INERTIA REQUEST
// =============================================================================

/// Handle to the current request's scope. Cheap to clone.
#[derive(Clone, Debug)]
pub struct InertiaRequest {
    info: Arc<RequestInfo>,
    state: Arc<Mutex<ScopeState>>,
    session_id: Arc<str>,
}

impl InertiaRequest {
    #[must_use]
    pub fn new(info: RequestInfo, session_id: &str) -> Self {
        Self { info: Arc::new(info), state: Arc::new(Mutex::new(ScopeState::default())), session_id: session_id.into() }
    }

    #[must_use]
    pub fn info(&self) -> &RequestInfo {
        &self.info
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn is_precognition(&self) -> bool {
        self.info.is_precognition()
    }

    fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> ScopeState {
        self.lock().clone()
    }

    /// Add a prop that overrides shared props of the same name.
    pub fn with_prop(&self, key: impl Into<String>, prop: impl Into<Prop>) {
        self.lock().props.insert(key, prop);
    }

    /// Add a value for the root template only; never sent as a prop.
    pub fn with_view_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().view_data.insert(key.into(), value.into());
    }

    pub fn with_errors<K, V>(&self, errors: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut state = self.lock();
        for (field, message) in errors {
            state.errors.insert(field.into(), message.into());
        }
    }

    pub fn with_error(&self, field: impl Into<String>, message: impl Into<String>) {
        self.with_errors([(field.into(), message.into())]);
    }

    /// Keep the first message for each field.
    pub fn with_validation_errors(&self, errors: &ValidationErrors) {
        self.with_errors(wire::flatten_validation_errors(errors));
    }

    pub fn with_flash(&self, level: FlashLevel, message: impl Into<String>) {
        self.lock().flash.insert(level.as_str().to_owned(), message.into());
    }

    pub fn with_flash_success(&self, message: impl Into<String>) {
        self.with_flash(FlashLevel::Success, message);
    }

    pub fn with_flash_info(&self, message: impl Into<String>) {
        self.with_flash(FlashLevel::Info, message);
    }

    pub fn with_flash_warning(&self, message: impl Into<String>) {
        self.with_flash(FlashLevel::Warning, message);
    }

    pub fn with_flash_error(&self, message: impl Into<String>) {
        self.with_flash(FlashLevel::Error, message);
    }

    pub fn with_flash_messages(&self, messages: &[FlashMessage]) {
        for msg in messages {
            self.with_flash(msg.level, msg.message.clone());
        }
    }

    /// Previous form input, echoed back after a failed submission.
    pub fn with_old(&self, data: Map<String, Value>) {
        self.lock().old = Some(data);
    }

    pub fn with_match_props_on(&self, props: &[&str]) {
        let mut state = self.lock();
        for prop in props.iter().filter(|p| !p.is_empty()) {
            if !state.match_props_on.iter().any(|p| p == prop) {
                state.match_props_on.push((*prop).to_owned());
            }
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.lock().errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.lock().errors.clone()
    }
}

impl<S> FromRequestParts<S> for InertiaRequest
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<InertiaRequest>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "page middleware not installed"))
    }
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod tests;
