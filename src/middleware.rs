//! Page middleware: wraps every route that renders pages.
//!
//! DESIGN
//! ======
//! Per request, in order:
//!
//! 1. resolve the session cookie, minting a new session id if absent
//! 2. install the `InertiaRequest` scope in the request extensions
//! 3. reject mutating requests that fail the CSRF check
//! 4. answer stale Inertia GETs with a 409 version conflict
//! 5. run the handler; an `ErrorReport` on its response goes through the
//!    error listener
//! 6. finish: persist flash on redirects, add `Vary`, and turn 301/302 after
//!    a mutating Inertia request into 303
//!
//! ERROR HANDLING
//! ==============
//! Handler errors never reach the client as-is. Precognition requests get
//! JSON, browser GETs get the HTML error page, everything else is redirected
//! back with the error flashed.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, VARY};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use wire::{HEADER_INERTIA, HEADER_LOCATION, HEADER_PRECOGNITION, HEADER_VERSION};

use crate::config::env_bool;
use crate::error::{AppError, ErrorReport, error_details};
use crate::inertia::Inertia;
use crate::scope::{InertiaRequest, RequestInfo};
use crate::session::{SESSION_COOKIE, generate_session_id, is_valid_session_id};

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn page_middleware(State(inertia): State<Inertia>, jar: CookieJar, request: Request, next: Next) -> Response {
    let existing = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()).filter(|v| is_valid_session_id(v));
    let is_new_session = existing.is_none();
    let session_id = existing.unwrap_or_else(generate_session_id);

    let (parts, body) = request.into_parts();
    let req = InertiaRequest::new(RequestInfo::from_parts(&parts), &session_id);
    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(req.clone());

    let response = if let Err(err) = inertia.check_csrf(req.info()) {
        handle_error(&inertia, &req, err)
    } else if let Some(conflict) = version_conflict(&inertia, req.info()) {
        conflict
    } else {
        let mut response = next.run(request).await;
        match response.extensions_mut().remove::<ErrorReport>() {
            Some(ErrorReport(err)) => handle_error(&inertia, &req, err),
            None => response,
        }
    };

    let response = finish(&inertia, &req, response).await;
    if is_new_session {
        (CookieJar::new().add(session_cookie(session_id)), response).into_response()
    } else {
        response
    }
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(env_bool("COOKIE_SECURE").unwrap_or(false))
        .build()
}

/// 409 when an Inertia GET carries a different asset version.
fn version_conflict(inertia: &Inertia, info: &RequestInfo) -> Option<Response> {
    if !info.is_inertia() || info.method != Method::GET || info.is_precognition() {
        return None;
    }
    let client_version = info.headers.get(HEADER_VERSION).and_then(|v| v.to_str().ok()).unwrap_or("");
    if client_version == inertia.asset_version() {
        return None;
    }
    tracing::debug!(client_version, server_version = inertia.asset_version(), "asset version mismatch");

    let mut response = StatusCode::CONFLICT.into_response();
    if let Ok(location) = HeaderValue::from_str(&inertia.location(info.original_url())) {
        response.headers_mut().insert(HEADER_LOCATION, location);
    }
    Some(response)
}

// =============================================================================
// ERROR LISTENER
// =============================================================================

fn handle_error(inertia: &Inertia, req: &InertiaRequest, err: AppError) -> Response {
    let info = req.info();
    if err.code.is_server_error() {
        tracing::error!(status = err.code.as_u16(), url = info.original_url(), error = %err, cause = ?err.cause(), "request failed");
    } else {
        tracing::debug!(status = err.code.as_u16(), url = info.original_url(), error = %err, "request rejected");
    }

    let can_expose = inertia.can_expose_details(info);
    if info.is_precognition() {
        return inertia.precognition_error(&err, can_expose);
    }

    let details = error_details(&err, can_expose);
    if !info.is_inertia() && info.method == Method::GET {
        return inertia.error_page(err.code, &err.message, &details);
    }

    req.with_validation_errors(err.validation_errors());
    req.with_flash_messages(err.flash_messages());
    if err.validation_errors().is_empty() && !details.is_empty() {
        req.with_flash_error(details);
    }
    inertia.redirect_back(req)
}

// =============================================================================
// FINISH
// =============================================================================

async fn finish(inertia: &Inertia, req: &InertiaRequest, mut response: Response) -> Response {
    let status = response.status();
    if is_flash_boundary(status) {
        inertia.persist_flash(req).await;
    }

    let info = req.info();
    if !info.is_inertia() && !info.is_precognition() {
        return response;
    }

    let headers = response.headers_mut();
    add_vary(headers, HEADER_INERTIA);
    if inertia.precognition_vary() {
        add_vary(headers, HEADER_PRECOGNITION);
    }
    if info.is_precognition() {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }

    if info.is_mutating() && matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND) {
        *response.status_mut() = StatusCode::SEE_OTHER;
        response.headers_mut().remove(CONTENT_LENGTH);
        *response.body_mut() = Body::empty();
    }
    response
}

/// Responses after which the client makes another request.
fn is_flash_boundary(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308 | 409)
}

fn add_vary(headers: &mut HeaderMap, name: &'static str) {
    let present = headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| v.trim().eq_ignore_ascii_case(name));
    if !present {
        headers.append(VARY, HeaderValue::from_static(name));
    }
}

#[cfg(test)]
#[path = "middleware_test.rs"]
mod tests;
