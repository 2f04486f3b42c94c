//! Error types shared by the adapter and the demo handlers.
//!
//! ERROR HANDLING
//! ==============
//! Adapter internals return `InertiaError`. Handlers return `AppError`, which
//! converts into a bare response carrying an `ErrorReport` extension; the page
//! middleware picks that up and decides how the client sees it (validation
//! JSON, HTML error page, or flash + redirect back).

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use wire::ValidationErrors;

use crate::render::RenderError;
use crate::session::SessionError;
use crate::ssr::SsrError;
use crate::template::TemplateError;

const GENERIC_DETAILS: &str = "Something went wrong. Try again later";

// =============================================================================
// FLASH
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// User-facing message shown after a redirect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    #[must_use]
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

// =============================================================================
// ADAPTER ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InertiaError {
    #[error("page not found: {0}")]
    PageNotFound(String),
    #[error("template: {0}")]
    Template(#[from] TemplateError),
    #[error("ssr: {0}")]
    Ssr(#[from] SsrError),
    #[error("render: {0}")]
    Render(#[from] RenderError),
    #[error("session: {0}")]
    Session(#[from] SessionError),
    #[error("encode page: {0}")]
    Encode(#[from] serde_json::Error),
}

impl InertiaError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PageNotFound(_)
            | Self::Ssr(SsrError::PageNotFound(_))
            | Self::Render(RenderError::PageNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// =============================================================================
// APP ERROR
// =============================================================================

/// Handler-facing error with an HTTP status and optional user feedback.
#[derive(Clone, Debug)]
pub struct AppError {
    pub code: StatusCode,
    pub message: String,
    cause: Option<String>,
    flash: Vec<FlashMessage>,
    validation: ValidationErrors,
}

impl AppError {
    /// An empty message falls back to the status reason phrase.
    #[must_use]
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() { code.canonical_reason().unwrap_or("Unknown").to_owned() } else { message };
        Self { code, message, cause: None, flash: Vec::new(), validation: ValidationErrors::new() }
    }

    #[must_use]
    pub fn internal(cause: impl fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "").with_cause(cause)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "")
    }

    /// Field errors plus a warning flash carrying `message`.
    #[must_use]
    pub fn validation(code: StatusCode, message: impl Into<String>, errors: ValidationErrors) -> Self {
        let message = message.into();
        let mut err = Self::new(code, message.clone());
        err.validation = errors;
        err.with_flash(FlashLevel::Warning, message)
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    #[must_use]
    pub fn with_flash(mut self, level: FlashLevel, message: impl Into<String>) -> Self {
        self.flash.push(FlashMessage::new(level, message));
        self
    }

    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    #[must_use]
    pub fn flash_messages(&self) -> &[FlashMessage] {
        &self.flash
    }

    #[must_use]
    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AppError {}

impl From<InertiaError> for AppError {
    fn from(err: InertiaError) -> Self {
        Self::new(err.status(), "").with_cause(err)
    }
}

/// Attached to error responses so the page middleware can render them.
#[derive(Clone, Debug)]
pub struct ErrorReport(pub AppError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.code, self.message.clone()).into_response();
        response.extensions_mut().insert(ErrorReport(self));
        response
    }
}

/// Message shown to the user for `err`.
///
/// With `can_expose` the message and its cause are shown verbatim; otherwise
/// a fixed message per status class.
#[must_use]
pub fn error_details(err: &AppError, can_expose: bool) -> String {
    if can_expose {
        return match err.cause() {
            Some(cause) if cause != err.message => format!("{}: {cause}", err.message),
            _ => err.message.clone(),
        };
    }
    match err.code.as_u16() {
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Permission denied",
        404 => "Page not found",
        419 => "The page expired, please try again",
        429 => "Too many request",
        _ => GENERIC_DETAILS,
    }
    .to_owned()
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
