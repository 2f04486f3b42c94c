//! Error page for statuses rendered as components (e.g. the 404 fallback).

use super::value_text;
use crate::markup::{Markup, PropsView};
use crate::registry::PageComponent;

pub const MODULE: &str = "pages/error";

pub struct ErrorPage;

impl PageComponent for ErrorPage {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup) {
        out.push_str(r#"<div class="error-page"><div class="error-code">"#);
        out.text(&props.get("status").map(value_text).unwrap_or_default());
        out.push_str(r#"</div><p class="error-message">"#);
        let message = props.str("message").filter(|m| !m.is_empty()).unwrap_or("Something went wrong");
        out.text(message);
        out.push_str(r#"</p><a href="/" class="btn">Go Home</a></div>"#);
    }
}
