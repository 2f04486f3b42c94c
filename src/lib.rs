//! Server-driven page adapter for axum.
//!
//! Handlers pick a page component and its props; the adapter answers with a
//! JSON page descriptor for client-side visits or a full HTML document (with
//! optional server-side rendering) for browser loads. `view` holds the client
//! half: a page view that resolves deferred props and a validation-only form.

pub mod config;
pub mod error;
pub mod inertia;
pub mod markup;
pub mod middleware;
mod page;
pub mod pages;
pub mod partial;
pub mod props;
pub mod registry;
pub mod render;
pub mod routes;
pub mod scope;
pub mod session;
pub mod ssr;
pub mod state;
pub mod template;
pub mod view;
