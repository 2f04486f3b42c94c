//! Server-side rendering engines.
//!
//! DESIGN
//! ======
//! `SsrEngine` is the seam the adapter renders through. `HttpSsr` posts the
//! page descriptor to a remote renderer with timeout, retry and a response
//! cache. `LocalSsr` renders in-process through the page registry, and
//! `ssr_router` exposes that same renderer as an HTTP endpoint.
//!
//! ERROR HANDLING
//! ==============
//! Failures surface as `SsrError` and propagate to the caller; the only
//! retry is the configured one inside `HttpSsr`.

pub mod cache;
pub mod client;
pub mod local;

use std::time::Duration;

use wire::{Page, SsrResponse};

pub use cache::SsrCache;
pub use client::{HttpSsr, ReqwestSsrClient, SsrClient};
pub use local::{LocalSsr, ssr_router};

#[derive(Debug, thiserror::Error)]
pub enum SsrError {
    #[error("SSR page not found: {0}")]
    PageNotFound(String),
    #[error("SSR render failed: {0}")]
    Render(String),
    #[error("SSR request failed: {0}")]
    Transport(String),
    #[error("SSR server responded with status {0}")]
    Status(u16),
    #[error("SSR timed out after {0:?}")]
    Timeout(Duration),
    #[error("SSR response invalid: {0}")]
    Decode(#[from] wire::WireError),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Renders a page descriptor to head tags and body markup.
#[async_trait::async_trait]
pub trait SsrEngine: Send + Sync {
    async fn render(&self, page: &Page) -> Result<SsrResponse, SsrError>;
}
