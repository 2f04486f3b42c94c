//! The page adapter: shared props, rendering and Inertia-aware redirects.
//!
//! DESIGN
//! ======
//! `Inertia` is built once at startup and cloned into the router state. It
//! owns everything that is fixed for the process (shared props, templates,
//! the page registry, SSR engine, session store, CSRF hooks). Everything that
//! varies per request lives in the `InertiaRequest` scope.
//!
//! A render answers in one of three shapes:
//!
//! - precognition: 204 when the scope holds no errors, 422 with the errors
//!   otherwise; no page is built
//! - Inertia visit: the page descriptor as JSON
//! - browser visit: the root template with the descriptor embedded, SSR
//!   markup included when an engine is configured
//!
//! ERROR HANDLING
//! ==============
//! Render failures come back as `InertiaError` so handlers can `?` them into
//! `AppError`; the page middleware then turns the error into the right
//! response for the kind of request.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION, VARY};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use serde_json::{Map, Value};
use wire::{HEADER_INERTIA, HEADER_LOCATION, HEADER_PRECOGNITION, HEADER_PRECOGNITION_SUCCESS, Page, ValidationBody};

use crate::config::{AppConfig, SsrMode};
use crate::error::{AppError, InertiaError, error_details};
use crate::page::{PageSources, build_page};
use crate::props::{LazyProp, Prop, PropError, Props};
use crate::registry::PageRegistry;
use crate::scope::{InertiaRequest, RequestInfo};
use crate::session::{FlashBag, SessionStore, store_flash, take_flash};
use crate::ssr::{HttpSsr, LocalSsr, SsrEngine, SsrError};
use crate::template::Templates;

/// Produces the CSRF token shared with every page.
pub type CsrfTokenProvider = Arc<dyn Fn(&RequestInfo) -> Result<String, PropError> + Send + Sync>;

/// Verifies the CSRF token of a mutating request.
pub type CsrfTokenChecker = Arc<dyn Fn(&RequestInfo) -> Result<(), AppError> + Send + Sync>;

/// Decides per request whether error causes may be shown to the user.
pub type ExposeDetails = Arc<dyn Fn(&RequestInfo) -> bool + Send + Sync>;

const INTERNAL_ERROR_BODY: &str = "Internal server error";

// =============================================================================
// BUILDER
// =============================================================================

pub struct InertiaBuilder {
    base_url: String,
    asset_version: String,
    registry: Arc<PageRegistry>,
    templates: Templates,
    shared_props: Props,
    shared_view_data: Map<String, Value>,
    sessions: Option<Arc<dyn SessionStore>>,
    ssr: Option<Arc<dyn SsrEngine>>,
    csrf_provider: Option<CsrfTokenProvider>,
    csrf_checker: Option<CsrfTokenChecker>,
    csrf_prop: String,
    expose_details: ExposeDetails,
    precognition_vary: bool,
}

impl InertiaBuilder {
    #[must_use]
    pub fn new(base_url: &str, registry: Arc<PageRegistry>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            asset_version: String::new(),
            registry,
            templates: Templates::new(None, "public".into(), crate::config::DEFAULT_HOT_FILE, false),
            shared_props: Props::new(),
            shared_view_data: Map::new(),
            sessions: None,
            ssr: None,
            csrf_provider: None,
            csrf_checker: None,
            csrf_prop: wire::PROP_CSRF_TOKEN.to_owned(),
            expose_details: Arc::new(|_| false),
            precognition_vary: true,
        }
    }

    /// Builder preset from typed config, SSR engine included.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP SSR client cannot be built.
    pub fn from_config(config: &AppConfig, registry: Arc<PageRegistry>) -> Result<Self, SsrError> {
        let ssr: Option<Arc<dyn SsrEngine>> = match config.ssr_mode {
            SsrMode::Off => None,
            SsrMode::Local => Some(Arc::new(LocalSsr::new(Arc::clone(&registry)))),
            SsrMode::Http => Some(Arc::new(HttpSsr::new(config.ssr.clone())?)),
        };
        let expose = config.expose_error_details;
        let mut builder = Self::new(&config.base_url, registry)
            .asset_version(&config.asset_version)
            .templates(Templates::from_config(config))
            .expose_details(Arc::new(move |_| expose))
            .precognition_vary(config.precognition_vary);
        builder.ssr = ssr;
        Ok(builder)
    }

    #[must_use]
    pub fn asset_version(mut self, version: &str) -> Self {
        version.clone_into(&mut self.asset_version);
        self
    }

    #[must_use]
    pub fn templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    #[must_use]
    pub fn shared_prop(mut self, key: impl Into<String>, prop: impl Into<Prop>) -> Self {
        self.shared_props.insert(key, prop);
        self
    }

    #[must_use]
    pub fn shared_view_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.shared_view_data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    #[must_use]
    pub fn ssr(mut self, engine: Arc<dyn SsrEngine>) -> Self {
        self.ssr = Some(engine);
        self
    }

    #[must_use]
    pub fn csrf_token_provider(mut self, provider: CsrfTokenProvider) -> Self {
        self.csrf_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn csrf_token_checker(mut self, checker: CsrfTokenChecker) -> Self {
        self.csrf_checker = Some(checker);
        self
    }

    /// Rename the shared CSRF prop. Blank names keep the default.
    #[must_use]
    pub fn csrf_prop_name(mut self, name: &str) -> Self {
        let name = name.trim();
        if !name.is_empty() {
            name.clone_into(&mut self.csrf_prop);
        }
        self
    }

    #[must_use]
    pub fn expose_details(mut self, decide: ExposeDetails) -> Self {
        self.expose_details = decide;
        self
    }

    #[must_use]
    pub fn precognition_vary(mut self, enabled: bool) -> Self {
        self.precognition_vary = enabled;
        self
    }

    #[must_use]
    pub fn build(mut self) -> Inertia {
        let csrf_prop = self.csrf_provider.as_ref().map(|provider| {
            let provider = Arc::clone(provider);
            let lazy = LazyProp::new(move |req: &RequestInfo| {
                let token = provider(req);
                async move { token.map(Value::String) }
            });
            self.shared_props.insert(self.csrf_prop.clone(), lazy);
            self.csrf_prop.clone()
        });

        Inertia {
            inner: Arc::new(InertiaInner {
                base_url: self.base_url,
                asset_version: self.asset_version,
                registry: self.registry,
                templates: self.templates,
                shared_props: self.shared_props,
                shared_view_data: self.shared_view_data,
                sessions: self.sessions,
                ssr: self.ssr,
                csrf_checker: self.csrf_checker,
                csrf_prop,
                expose_details: self.expose_details,
                precognition_vary: self.precognition_vary,
            }),
        }
    }
}

// =============================================================================
// ADAPTER
// =============================================================================

struct InertiaInner {
    base_url: String,
    asset_version: String,
    registry: Arc<PageRegistry>,
    templates: Templates,
    shared_props: Props,
    shared_view_data: Map<String, Value>,
    sessions: Option<Arc<dyn SessionStore>>,
    ssr: Option<Arc<dyn SsrEngine>>,
    csrf_checker: Option<CsrfTokenChecker>,
    csrf_prop: Option<String>,
    expose_details: ExposeDetails,
    precognition_vary: bool,
}

/// Shared page adapter. Cheap to clone.
#[derive(Clone)]
pub struct Inertia {
    inner: Arc<InertiaInner>,
}

impl Inertia {
    #[must_use]
    pub fn asset_version(&self) -> &str {
        &self.inner.asset_version
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PageRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn templates(&self) -> &Templates {
        &self.inner.templates
    }

    #[must_use]
    pub fn precognition_vary(&self) -> bool {
        self.inner.precognition_vary
    }

    #[must_use]
    pub fn can_expose_details(&self, info: &RequestInfo) -> bool {
        (self.inner.expose_details)(info)
    }

    /// Render `component` with `props` for the current request.
    ///
    /// # Errors
    ///
    /// Returns [`InertiaError::PageNotFound`] for an unregistered component,
    /// or the SSR or template failure of an HTML render.
    pub async fn render(&self, req: &InertiaRequest, component: &str, props: Props) -> Result<Response, InertiaError> {
        if !self.inner.registry.contains(component) {
            return Err(InertiaError::PageNotFound(component.to_owned()));
        }
        let info = req.info();
        let scope = req.snapshot();
        if info.is_precognition() {
            return Ok(precognition_response(info, &scope.errors));
        }

        let session_flash = self.load_flash(req).await;
        let page = build_page(PageSources {
            req: info,
            component,
            version: &self.inner.asset_version,
            shared: &self.inner.shared_props,
            session_flash,
            scope: &scope,
            props: &props,
            csrf_prop: self.inner.csrf_prop.as_deref(),
        })
        .await;

        if info.is_inertia() {
            return Ok(json_response(&page));
        }

        let mut view_data = self.inner.shared_view_data.clone();
        view_data.extend(scope.view_data);
        self.html_response(&page, &view_data).await
    }

    async fn html_response(&self, page: &Page, view_data: &Map<String, Value>) -> Result<Response, InertiaError> {
        let ssr = match &self.inner.ssr {
            Some(engine) => Some(engine.render(page).await.inspect_err(|e| {
                tracing::error!(component = %page.component, error = %e, "SSR render failed");
            })?),
            None => None,
        };
        let html = self.inner.templates.render_app(page, ssr.as_ref(), view_data)?;
        Ok(Html(html).into_response())
    }

    /// HTML error page. Falls back to a plain 500 if the template fails.
    #[must_use]
    pub fn error_page(&self, code: StatusCode, message: &str, details: &str) -> Response {
        let details = Some(details).filter(|d| !d.is_empty());
        match self.inner.templates.render_error(code.as_u16(), message, details) {
            Ok(html) => (code, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "error template failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
            }
        }
    }

    /// Precognition answer for a failed request.
    #[must_use]
    pub fn precognition_error(&self, err: &AppError, can_expose: bool) -> Response {
        let mut response = if err.validation_errors().is_empty() {
            let body = serde_json::json!({ "message": error_details(err, can_expose) });
            (err.code, axum::Json(body)).into_response()
        } else {
            let body = ValidationBody { errors: serde_json::to_value(err.validation_errors()).unwrap_or_default() };
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response()
        };
        response.headers_mut().insert(HEADER_PRECOGNITION, HeaderValue::from_static("true"));
        response
    }

    // -------------------------------------------------------------------------
    // Redirects
    // -------------------------------------------------------------------------

    /// 302 to `url`. For Inertia visits to another origin, a 409 external
    /// redirect instead. Empty or `/` targets go to the base URL.
    #[must_use]
    pub fn redirect(&self, req: &InertiaRequest, url: &str) -> Response {
        let target = self.target(url);
        if req.info().is_inertia() && self.is_external(&target) {
            return self.redirect_external(&target);
        }
        found(&target)
    }

    /// Force a full page load: 409 with `X-Inertia-Location`.
    #[must_use]
    pub fn redirect_external(&self, url: &str) -> Response {
        let target = self.target(url);
        let mut response = StatusCode::CONFLICT.into_response();
        if let Ok(value) = HeaderValue::from_str(&target) {
            response.headers_mut().insert(HEADER_LOCATION, value.clone());
            response.headers_mut().insert(LOCATION, value);
        }
        response
    }

    /// Redirect to the `Referer`, or the current URL without one.
    #[must_use]
    pub fn redirect_back(&self, req: &InertiaRequest) -> Response {
        let target = req.info().referer().unwrap_or_else(|| req.info().original_url()).to_owned();
        self.redirect(req, &target)
    }

    #[must_use]
    pub fn redirect_back_with_errors(&self, req: &InertiaRequest, errors: &wire::ValidationErrors) -> Response {
        req.with_validation_errors(errors);
        self.redirect_back(req)
    }

    /// Absolute URL for `original_url` under the base URL.
    #[must_use]
    pub fn location(&self, original_url: &str) -> String {
        if original_url.is_empty() {
            return self.inner.base_url.clone();
        }
        if original_url.parse::<Uri>().is_ok_and(|uri| uri.scheme().is_some()) {
            return original_url.to_owned();
        }
        if original_url.starts_with('/') {
            format!("{}{original_url}", self.inner.base_url)
        } else {
            format!("{}/{original_url}", self.inner.base_url)
        }
    }

    fn target(&self, url: &str) -> String {
        match url.trim() {
            "" | "/" => self.inner.base_url.clone(),
            other => other.to_owned(),
        }
    }

    /// Absolute URL on a different scheme or host than the base URL.
    fn is_external(&self, target: &str) -> bool {
        let Ok(target) = target.parse::<Uri>() else {
            return false;
        };
        let (Some(scheme), Some(host)) = (target.scheme_str(), target.authority()) else {
            return false;
        };
        let Ok(base) = self.inner.base_url.parse::<Uri>() else {
            return true;
        };
        match (base.scheme_str(), base.authority()) {
            (Some(base_scheme), Some(base_host)) => {
                !base_scheme.eq_ignore_ascii_case(scheme) || !base_host.as_str().eq_ignore_ascii_case(host.as_str())
            }
            _ => true,
        }
    }

    // -------------------------------------------------------------------------
    // Middleware hooks
    // -------------------------------------------------------------------------

    /// Run the CSRF checker for mutating requests.
    ///
    /// # Errors
    ///
    /// Returns the checker's error.
    pub fn check_csrf(&self, info: &RequestInfo) -> Result<(), AppError> {
        match &self.inner.csrf_checker {
            Some(check) if info.is_mutating() => check(info),
            _ => Ok(()),
        }
    }

    /// Write the scope's flash data to the session for the next request.
    pub(crate) async fn persist_flash(&self, req: &InertiaRequest) {
        let Some(store) = &self.inner.sessions else {
            return;
        };
        let scope = req.snapshot();
        if !scope.has_flash_data() {
            return;
        }
        let bag = FlashBag { flash: scope.flash, errors: scope.errors, old: scope.old };
        if let Err(e) = store_flash(store.as_ref(), req.session_id(), &bag).await {
            tracing::error!(error = %e, "could not set flash session props");
        }
    }

    async fn load_flash(&self, req: &InertiaRequest) -> Option<FlashBag> {
        let store = self.inner.sessions.as_ref()?;
        take_flash(store.as_ref(), req.session_id()).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load flash session props");
            None
        })
    }
}

fn precognition_response(info: &RequestInfo, errors: &std::collections::BTreeMap<String, String>) -> Response {
    let only: Option<BTreeSet<String>> =
        info.header(wire::HEADER_PRECOGNITION_VALIDATE_ONLY).and_then(wire::parse_header_list);
    let errors: wire::ValidationErrors = errors
        .iter()
        .filter(|(field, _)| only.as_ref().is_none_or(|only| only.contains(*field)))
        .map(|(k, v)| (k.clone(), vec![v.clone()]))
        .collect();

    let mut response = if errors.is_empty() {
        let mut response = StatusCode::NO_CONTENT.into_response();
        response.headers_mut().insert(HEADER_PRECOGNITION_SUCCESS, HeaderValue::from_static("true"));
        response
    } else {
        (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(ValidationBody { errors: serde_json::to_value(&errors).unwrap_or_default() })).into_response()
    };
    response.headers_mut().insert(HEADER_PRECOGNITION, HeaderValue::from_static("true"));
    response
}

fn json_response(page: &Page) -> Response {
    let mut response = Response::new(Body::from(wire::encode_page(page)));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(VARY, HeaderValue::from_static(HEADER_INERTIA));
    headers.insert(HEADER_INERTIA, HeaderValue::from_static("true"));
    response
}

fn found(target: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(value) = HeaderValue::from_str(target) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

#[cfg(test)]
#[path = "inertia_test.rs"]
mod tests;
