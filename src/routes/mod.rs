//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Page routes sit behind the page middleware, which owns sessions, version
//! checks and error rendering. Static assets and the health check are added
//! after the middleware layer so they never touch a session.

pub mod pages;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware::page_middleware;
use crate::state::AppState;

/// Mount point for files under `PUBLIC_DIR`.
pub const PUBLIC_PREFIX: &str = "/public";

/// Full demo app: page routes, static files, health check.
pub fn app(state: AppState) -> Router {
    let public_dir = state.config.public_dir.clone();

    Router::new()
        .route("/", get(pages::home))
        .route("/users", get(pages::users))
        .route("/users/create", post(pages::create_user))
        .route("/settings", get(pages::settings))
        .route("/not-found", get(pages::not_found_conflict))
        .fallback(pages::fallback)
        .layer(middleware::from_fn_with_state(state.inertia.clone(), page_middleware))
        .nest_service(PUBLIC_PREFIX, ServeDir::new(public_dir))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
