//! Client-side page view.
//!
//! DESIGN
//! ======
//! `PageView::mount` paints immediately: deferred props missing from the
//! descriptor render as placeholders. `load_deferred` then issues one
//! follow-up per deferred group, all concurrently, and each response updates
//! only its own props and re-renders only the regions named after them.
//! Requests go through the `Transport` trait so the view runs against a live
//! server or an in-memory fake.
//!
//! ERROR HANDLING
//! ==============
//! A failed follow-up is not fatal. Its props move to `PropState::Failed`
//! and the component draws the failure in place; the rest of the page is
//! left as it was.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Method;
use serde_json::{Map, Value};
use wire::{Page, ValidationErrors};

use crate::markup::{Markup, PropsView};
use crate::pages::settings::form_markup;
use crate::registry::{ComponentDef, PageRegistry};
use crate::render::{RenderContext, RenderError, render_component};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// TRANSPORT
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    /// The server asked for a full page visit to `location`.
    #[error("server requested a full visit to {location}")]
    Conflict { location: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("response for {received} while viewing {expected}")]
    StaleResponse { expected: String, received: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl From<wire::WireError> for TransportError {
    fn from(e: wire::WireError) -> Self {
        Self::Decode(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitRequest {
    pub method: Method,
    /// Path and query, resolved against the transport's base URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl VisitRequest {
    /// Inertia GET for `url` at the given asset version.
    #[must_use]
    pub fn visit(url: &str, version: &str) -> Self {
        Self {
            method: Method::GET,
            url: url.to_owned(),
            headers: vec![
                (wire::HEADER_INERTIA.to_owned(), "true".to_owned()),
                (wire::HEADER_VERSION.to_owned(), version.to_owned()),
            ],
            body: None,
        }
    }

    /// Partial reload of `page` asking for `keys` only.
    #[must_use]
    pub fn partial<'a>(page: &Page, keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self::visit(&page.url, &page.version)
            .header(wire::HEADER_PARTIAL_COMPONENT, &page.component)
            .header(wire::HEADER_PARTIAL_ONLY, &wire::join_header_list(keys))
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisitResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl VisitResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decode an Inertia page response.
    ///
    /// # Errors
    ///
    /// A 409 with `X-Inertia-Location` becomes [`TransportError::Conflict`],
    /// any other non-200 status [`TransportError::Status`].
    pub fn into_page(self) -> Result<Page, TransportError> {
        match self.status {
            200 => Ok(wire::decode_page(&self.body)?),
            409 => match self.header(wire::HEADER_LOCATION) {
                Some(location) => Err(TransportError::Conflict { location: location.to_owned() }),
                None => Err(TransportError::Status(409)),
            },
            status => Err(TransportError::Status(status)),
        }
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: VisitRequest) -> Result<VisitResponse, TransportError>;
}

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: VisitRequest) -> Result<VisitResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.url);
        let mut builder = self.http.request(request.method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
            .collect();
        let body = response.bytes().await.map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(VisitResponse { status, headers, body: body.to_vec() })
    }
}

// =============================================================================
// PAGE VIEW
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum PropState {
    Pending,
    Resolved(Value),
    Failed(String),
}

pub struct PageView {
    registry: Arc<PageRegistry>,
    page: Page,
    component: ComponentDef,
    markup: Markup,
    /// Deferred props only.
    states: BTreeMap<String, PropState>,
}

impl PageView {
    /// Resolve the component and paint with placeholders for missing deferred props.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::PageNotFound`] for an unknown component.
    pub fn mount(registry: Arc<PageRegistry>, page: Page) -> Result<Self, RenderError> {
        let component = registry.resolve_with_layout(&page.component)?;
        let states = initial_states(&page);
        let mut view = Self { registry, page, component, markup: Markup::new(), states };
        view.render_all();
        Ok(view)
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.markup.to_html()
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[must_use]
    pub fn prop_state(&self, key: &str) -> Option<&PropState> {
        self.states.get(key)
    }

    /// One follow-up per deferred group that still has pending props.
    #[must_use]
    pub fn deferred_requests(&self) -> Vec<(String, VisitRequest)> {
        self.page
            .deferred_props
            .iter()
            .filter_map(|(group, keys)| {
                let pending: Vec<&str> = keys
                    .iter()
                    .map(String::as_str)
                    .filter(|key| matches!(self.states.get(*key), Some(PropState::Pending)))
                    .collect();
                (!pending.is_empty()).then(|| (group.clone(), VisitRequest::partial(&self.page, pending)))
            })
            .collect()
    }

    /// Fetch every pending deferred group concurrently.
    pub async fn load_deferred(&mut self, transport: &dyn Transport) {
        let requests = self.deferred_requests();
        let responses = join_all(requests.iter().map(|(_, request)| transport.send(request.clone()))).await;
        for ((group, request), response) in requests.into_iter().zip(responses) {
            let keys = wire::parse_header_list(request.header_value(wire::HEADER_PARTIAL_ONLY).unwrap_or_default())
                .unwrap_or_default();
            let keys: Vec<String> = keys.into_iter().collect();
            match response.and_then(VisitResponse::into_page) {
                Ok(page) => self.apply_group(&keys, page),
                Err(e) => {
                    tracing::warn!(group = %group, error = %e, "deferred props failed to load");
                    self.fail(&keys, &e.to_string());
                }
            }
        }
    }

    /// Reload the current page with only `keys`, merging per the response's
    /// merge metadata.
    ///
    /// # Errors
    ///
    /// Returns the transport failure; the view is left unchanged.
    pub async fn reload_only(&mut self, transport: &dyn Transport, keys: &[&str]) -> Result<(), TransportError> {
        let request = VisitRequest::partial(&self.page, keys.iter().copied());
        let page = transport.send(request).await?.into_page()?;
        self.ensure_current(&page)?;

        let mut changed = Vec::new();
        for key in keys {
            if let Some(incoming) = page.props.get(*key) {
                merge_prop(&mut self.page.props, key, incoming.clone(), &page);
                if self.states.contains_key(*key) {
                    let value = self.page.props.get(*key).cloned().unwrap_or(Value::Null);
                    self.states.insert((*key).to_owned(), PropState::Resolved(value));
                }
                changed.push((*key).to_owned());
            }
        }
        self.refresh(&changed);
        Ok(())
    }

    /// Visit `url` and replace the view. Pending follow-up state is discarded.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, a [`TransportError::Conflict`] when the
    /// server asks for a full page load, or a render error.
    pub async fn navigate(&mut self, transport: &dyn Transport, url: &str) -> Result<(), TransportError> {
        let request = VisitRequest::visit(url, &self.page.version);
        let page = transport.send(request).await?.into_page()?;
        self.component = self.registry.resolve_with_layout(&page.component)?;
        self.states = initial_states(&page);
        self.page = page;
        self.render_all();
        Ok(())
    }

    fn ensure_current(&self, page: &Page) -> Result<(), TransportError> {
        if page.component == self.page.component {
            Ok(())
        } else {
            Err(TransportError::StaleResponse { expected: self.page.component.clone(), received: page.component.clone() })
        }
    }

    fn apply_group(&mut self, keys: &[String], page: Page) {
        if let Err(e) = self.ensure_current(&page) {
            self.fail(keys, &e.to_string());
            return;
        }
        for key in keys {
            match page.props.get(key) {
                Some(incoming) => {
                    merge_prop(&mut self.page.props, key, incoming.clone(), &page);
                    let value = self.page.props.get(key).cloned().unwrap_or(Value::Null);
                    self.states.insert(key.clone(), PropState::Resolved(value));
                }
                None => {
                    self.states.insert(key.clone(), PropState::Failed("missing from response".to_owned()));
                }
            }
        }
        self.refresh(keys);
    }

    fn fail(&mut self, keys: &[String], message: &str) {
        for key in keys {
            self.states.insert(key.clone(), PropState::Failed(message.to_owned()));
        }
        self.refresh(keys);
    }

    /// Re-render the regions named after `keys`; fall back to a full render
    /// when the component has no region for one of them.
    fn refresh(&mut self, keys: &[String]) {
        let view = props_view(&self.page.props, &self.states);
        for key in keys {
            let replaced = match self.component.view.render_region(key, &view) {
                Some(region) => self.markup.replace_region(key, region),
                None => false,
            };
            if !replaced {
                self.render_all();
                return;
            }
        }
    }

    fn render_all(&mut self) {
        let view = props_view(&self.page.props, &self.states);
        self.markup = render_component(&self.component, &view, &mut RenderContext::new());
    }
}

fn initial_states(page: &Page) -> BTreeMap<String, PropState> {
    page.deferred_keys()
        .into_iter()
        .map(|key| {
            let state = page.props.get(key).map_or(PropState::Pending, |v| PropState::Resolved(v.clone()));
            (key.to_owned(), state)
        })
        .collect()
}

fn props_view<'a>(props: &'a Map<String, Value>, states: &'a BTreeMap<String, PropState>) -> PropsView<'a> {
    let pending = states
        .iter()
        .filter(|(_, state)| matches!(state, PropState::Pending))
        .map(|(key, _)| key.as_str());
    let mut view = PropsView::new(props).with_pending(pending);
    for (key, state) in states {
        if let PropState::Failed(message) = state {
            view = view.with_failed(key, message);
        }
    }
    view
}

/// Store `incoming` under `key`, appending or prepending arrays when the
/// response marks the prop as mergeable.
fn merge_prop(props: &mut Map<String, Value>, key: &str, incoming: Value, response: &Page) {
    let listed = |list: &[String]| list.iter().any(|k| k == key);
    let merged = match (props.remove(key), incoming) {
        (Some(Value::Array(mut current)), Value::Array(new)) if listed(&response.merge_props) => {
            current.extend(new);
            Value::Array(current)
        }
        (Some(Value::Array(current)), Value::Array(mut new)) if listed(&response.prepend_props) => {
            new.extend(current);
            Value::Array(new)
        }
        (Some(current @ Value::Object(_)), new @ Value::Object(_)) if listed(&response.deep_merge_props) => {
            deep_merge(current, new)
        }
        (_, incoming) => incoming,
    };
    props.insert(key.to_owned(), merged);
}

/// Objects merge key by key at every depth; anything else is replaced.
fn deep_merge(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Object(mut current), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let merged = match current.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                current.insert(key, merged);
            }
            Value::Object(current)
        }
        (_, incoming) => incoming,
    }
}

// =============================================================================
// VALIDATION FORM
// =============================================================================

/// Create-user form that validates through precognition requests.
pub struct ValidationForm {
    url: String,
    version: String,
    values: BTreeMap<String, String>,
    errors: ValidationErrors,
}

impl ValidationForm {
    #[must_use]
    pub fn new(url: &str, version: &str) -> Self {
        Self { url: url.to_owned(), version: version.to_owned(), values: BTreeMap::new(), errors: ValidationErrors::new() }
    }

    pub fn set(&mut self, field: &str, value: &str) {
        self.values.insert(field.to_owned(), value.to_owned());
    }

    #[must_use]
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// First error for `field`.
    #[must_use]
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).and_then(|messages| messages.first()).map(String::as_str)
    }

    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn html(&self) -> String {
        form_markup(&self.values, &self.errors).to_html()
    }

    /// Ask the server to validate without submitting. `only` limits the
    /// fields validated and updated; empty means all of them.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or an unexpected status; errors already
    /// shown are kept in that case.
    pub async fn validate(&mut self, transport: &dyn Transport, only: &[&str]) -> Result<(), TransportError> {
        let body = serde_urlencoded::to_string(&self.values).map_err(|e| TransportError::Decode(e.to_string()))?;
        let mut request = VisitRequest::visit(&self.url, &self.version)
            .header(wire::HEADER_PRECOGNITION, "true")
            .header("Content-Type", "application/x-www-form-urlencoded");
        request.method = Method::POST;
        request.body = Some(body.into_bytes());
        if !only.is_empty() {
            request = request.header(wire::HEADER_PRECOGNITION_VALIDATE_ONLY, &wire::join_header_list(only.iter().copied()));
        }

        let response = transport.send(request).await?;
        let fresh = match response.status {
            200 | 204 => ValidationErrors::new(),
            422 => {
                let body: Value =
                    serde_json::from_slice(&response.body).map_err(|e| TransportError::Decode(e.to_string()))?;
                body.get(wire::PROP_ERRORS).map(wire::normalize_validation_errors).unwrap_or_default()
            }
            status => return Err(TransportError::Status(status)),
        };

        if only.is_empty() {
            self.errors = fresh;
        } else {
            for field in only {
                match fresh.get(*field) {
                    Some(messages) => self.errors.insert((*field).to_owned(), messages.clone()),
                    None => self.errors.remove(*field),
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
