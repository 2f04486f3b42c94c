//! Default layout: navigation menu and flash messages around the page.

use std::fmt::Write;

use serde_json::Value;

use super::value_text;
use crate::markup::{Markup, PropsView, attr};
use crate::registry::Layout;

pub const MODULE: &str = "pages/layout";

const FLASH_ORDER: [&str; 4] = ["success", "info", "warning", "error"];

pub struct AppLayout;

impl Layout for AppLayout {
    fn module(&self) -> &str {
        MODULE
    }

    fn wrap(&self, props: &PropsView<'_>, content: Markup) -> Markup {
        let mut out = Markup::new();
        out.push_str(r#"<div class="layout"><nav class="menu">"#);
        if let Some(Value::Array(items)) = props.get("menu") {
            for item in items {
                let label = item.get("label").map(value_text).unwrap_or_default();
                let href = item.get("href").and_then(Value::as_str).unwrap_or("/");
                let _ = write!(out, r#"<a href="{}">"#, attr(href));
                out.text(&label);
                out.push_str("</a>");
            }
        }
        out.push_str("</nav>");

        if let Some(Value::Object(flash)) = props.get("flash") {
            for level in FLASH_ORDER {
                if let Some(message) = flash.get(level).and_then(Value::as_str) {
                    let _ = write!(out, r#"<div class="flash flash-{level}">"#);
                    out.text(message);
                    out.push_str("</div>");
                }
            }
        }

        out.push_str("<main>");
        out.append(content);
        out.push_str("</main></div>");
        out
    }
}
