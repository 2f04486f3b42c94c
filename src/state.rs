//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the page adapter and the typed config it was built from. The page
//! registry and SSR engine live inside the adapter, so handlers only ever
//! talk to `Inertia`.

use std::sync::Arc;

use axum::extract::FromRef;
use serde_json::json;

use crate::config::{AppConfig, ConfigError};
use crate::inertia::{Inertia, InertiaBuilder};
use crate::render::RenderError;
use crate::session::MemorySessionStore;
use crate::ssr::SsrError;
use crate::template::TemplateError;

/// Anything that can stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("page registry: {0}")]
    Registry(#[from] RenderError),
    #[error("ssr: {0}")]
    Ssr(#[from] SsrError),
    #[error("templates: {0}")]
    Template(#[from] TemplateError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state. Clone is required by Axum; fields are Arc-backed.
#[derive(Clone)]
pub struct AppState {
    pub inertia: Inertia,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build the demo adapter: page registry, SSR engine, memory sessions and
    /// the shared navigation menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry, SSR client or templates fail to load.
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let registry = Arc::new(crate::pages::registry()?);
        let inertia = InertiaBuilder::from_config(&config, registry)?
            .session_store(Arc::new(MemorySessionStore::new()))
            .shared_prop("menu", menu())
            .build();
        inertia.templates().validate()?;
        Ok(Self { inertia, config: Arc::new(config) })
    }
}

impl FromRef<AppState> for Inertia {
    fn from_ref(state: &AppState) -> Self {
        state.inertia.clone()
    }
}

fn menu() -> serde_json::Value {
    json!([
        { "label": "Home", "href": "/" },
        { "label": "Users", "href": "/users" },
        { "label": "Settings", "href": "/settings" },
        { "label": "Conflict (409)", "href": "/not-found" },
        { "label": "Not Found", "href": "/not-found-404" },
    ])
}
