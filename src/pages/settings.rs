//! Settings page: on-demand diagnostics and the create-user form.
//!
//! `diagnostics` is optional. It is absent on a normal visit and the page
//! shows a call to action that reloads only that prop.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::Value;
use wire::ValidationErrors;

use super::value_text;
use crate::markup::{Markup, PropsView, Slot, attr};
use crate::registry::PageComponent;

pub const MODULE: &str = "pages/settings";

pub const DIAGNOSTICS_CTA: &str = "Load diagnostics";

/// Form fields posted to `/users/create`, in display order.
pub const FORM_FIELDS: [(&str, &str); 2] = [("name", "Name"), ("email", "Email")];

pub struct SettingsPage;

impl PageComponent for SettingsPage {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup) {
        out.push_str("<div><h1>");
        out.text(props.str("title").unwrap_or_default());
        out.push_str("</h1>");

        out.push_str(r#"<section class="diagnostics"><h2>Diagnostics</h2>"#);
        out.region("diagnostics", diagnostics(props));
        out.push_str("</section>");

        let errors = props.get(wire::PROP_ERRORS).map(wire::normalize_validation_errors).unwrap_or_default();
        let values = old_values(props);
        out.push_str(r#"<section class="create-user"><h2>Create user</h2>"#);
        out.append(form_markup(&values, &errors));
        out.push_str("</section></div>");
    }

    fn render_region(&self, region: &str, props: &PropsView<'_>) -> Option<Markup> {
        (region == "diagnostics").then(|| diagnostics(props))
    }
}

fn diagnostics(props: &PropsView<'_>) -> Markup {
    let mut out = Markup::new();
    match props.slot("diagnostics") {
        Slot::Ready(Value::Object(fields)) => {
            out.push_str(r#"<dl class="diagnostics">"#);
            for (key, value) in fields {
                out.push_str("<dt>");
                out.text(key);
                out.push_str("</dt><dd>");
                out.text(&value_text(value));
                out.push_str("</dd>");
            }
            out.push_str("</dl>");
        }
        Slot::Ready(other) => {
            out.push_str(r#"<pre class="diagnostics">"#);
            out.text(&value_text(other));
            out.push_str("</pre>");
        }
        Slot::Failed(message) => {
            out.push_str(r#"<p class="error">Failed to load diagnostics: "#);
            out.text(message);
            out.push_str("</p>");
            load_link(&mut out);
        }
        Slot::Pending | Slot::Missing => load_link(&mut out),
    }
    out
}

fn load_link(out: &mut Markup) {
    out.push_str(r#"<a href="/settings" data-inertia-only="diagnostics" class="load-diagnostics">"#);
    out.text(DIAGNOSTICS_CTA);
    out.push_str("</a>");
}

fn old_values(props: &PropsView<'_>) -> BTreeMap<String, String> {
    match props.get(wire::PROP_OLD) {
        Some(Value::Object(old)) => old.iter().map(|(k, v)| (k.clone(), value_text(v))).collect(),
        _ => BTreeMap::new(),
    }
}

/// The create-user form with field values and the first error per field.
#[must_use]
pub fn form_markup(values: &BTreeMap<String, String>, errors: &ValidationErrors) -> Markup {
    let mut out = Markup::new();
    out.push_str(r#"<form method="post" action="/users/create" class="user-form">"#);
    for (field, label) in FORM_FIELDS {
        let value = values.get(field).map(String::as_str).unwrap_or_default();
        let _ = write!(
            out,
            r#"<label>{label} <input name="{field}" value="{}"></label>"#,
            attr(value)
        );
        if let Some(message) = errors.get(field).and_then(|messages| messages.first()) {
            let _ = write!(out, r#"<p class="field-error" data-field="{field}">"#);
            out.text(message);
            out.push_str("</p>");
        }
    }
    out.push_str(r#"<button type="submit">Create</button></form>"#);
    out
}
