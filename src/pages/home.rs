//! Home page. `heavy` arrives deferred and renders in its own region.

use serde_json::Value;

use super::value_text;
use crate::markup::{Markup, PropsView, Slot};
use crate::registry::PageComponent;

pub const MODULE: &str = "pages/home";

pub const HEAVY_PLACEHOLDER: &str = "Loading heavy data…";

pub struct HomePage;

impl PageComponent for HomePage {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup) {
        out.push_str("<div><h1>");
        out.text(props.str("title").unwrap_or_default());
        out.push_str("</h1><p>Welcome to the Home page.</p>");
        if let Some(plan) = props.get("plan") {
            out.push_str(r#"<p class="plan">Plan: "#);
            out.text(&value_text(plan));
            out.push_str("</p>");
        }
        out.push_str(r#"<a href="/undefined-page">Example link to a non-existent page</a>"#);
        out.push_str(r#"<section class="heavy"><h2>Heavy data</h2>"#);
        out.region("heavy", heavy(props));
        out.push_str("</section></div>");
    }

    fn render_region(&self, region: &str, props: &PropsView<'_>) -> Option<Markup> {
        (region == "heavy").then(|| heavy(props))
    }
}

fn heavy(props: &PropsView<'_>) -> Markup {
    let mut out = Markup::new();
    match props.slot("heavy") {
        Slot::Ready(Value::Array(items)) => {
            out.push_str("<ul>");
            for item in items {
                out.push_str("<li>");
                out.text(&value_text(item));
                out.push_str("</li>");
            }
            out.push_str("</ul>");
        }
        Slot::Ready(other) => {
            out.push_str("<p>");
            out.text(&value_text(other));
            out.push_str("</p>");
        }
        Slot::Failed(message) => {
            out.push_str(r#"<p class="error">Failed to load heavy data: "#);
            out.text(message);
            out.push_str("</p>");
        }
        Slot::Pending | Slot::Missing => {
            out.push_str(r#"<p class="loading">"#);
            out.text(HEAVY_PLACEHOLDER);
            out.push_str("</p>");
        }
    }
    out
}
