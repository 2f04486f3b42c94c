//! In-process SSR through the page registry, and the HTTP endpoint serving it.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use wire::{Page, SsrResponse};

use super::{SsrEngine, SsrError};
use crate::registry::PageRegistry;
use crate::render::{RenderError, modules_meta, render_page};

#[derive(Clone)]
pub struct LocalSsr {
    registry: Arc<PageRegistry>,
}

impl LocalSsr {
    #[must_use]
    pub fn new(registry: Arc<PageRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait::async_trait]
impl SsrEngine for LocalSsr {
    async fn render(&self, page: &Page) -> Result<SsrResponse, SsrError> {
        let output = render_page(&self.registry, page).map_err(|e| match e {
            RenderError::PageNotFound(name) => SsrError::PageNotFound(name),
            other => SsrError::Render(other.to_string()),
        })?;
        let mut head = output.head;
        head.extend(modules_meta(&output.modules));
        Ok(SsrResponse { head, body: output.body })
    }
}

/// `POST /render` takes a page descriptor and answers `{head, body}`.
pub fn ssr_router(engine: LocalSsr) -> Router {
    Router::new()
        .route("/render", post(render_endpoint))
        .route("/health", get(health))
        .with_state(engine)
}

async fn render_endpoint(State(engine): State<LocalSsr>, body: Bytes) -> Response {
    let page = match wire::decode_page(&body) {
        Ok(page) => page,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match engine.render(&page).await {
        Ok(response) => Json(response).into_response(),
        Err(SsrError::PageNotFound(name)) => {
            tracing::warn!(component = %name, "SSR render for unknown page");
            (StatusCode::NOT_FOUND, format!("page not found: {name}")).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "SSR render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;
