use super::*;
use serde_json::json;
use std::fmt::Write as _;

#[test]
fn text_is_escaped_html_is_not() {
    let mut out = Markup::new();
    out.push_str("<h1>");
    out.text("Tom & <Jerry>");
    out.push_str("</h1>");
    assert_eq!(out.to_html(), "<h1>Tom &amp; &lt;Jerry&gt;</h1>");
}

#[test]
fn write_macro_appends() {
    let mut out = Markup::new();
    let _ = write!(out, "<p>{}</p>", 42);
    assert_eq!(out.to_html(), "<p>42</p>");
}

#[test]
fn regions_are_wrapped_and_replaceable() {
    let mut loading = Markup::new();
    loading.push_str("<p>Loading</p>");
    let mut out = Markup::new();
    out.push_str("<main>");
    out.region("heavy", loading);
    out.push_str("</main>");
    assert_eq!(out.to_html(), r#"<main><div data-region="heavy"><p>Loading</p></div></main>"#);

    let mut done = Markup::new();
    done.push_str("<ul></ul>");
    assert!(out.replace_region("heavy", done));
    assert!(!out.replace_region("other", Markup::new()));
    assert_eq!(out.to_html(), r#"<main><div data-region="heavy"><ul></ul></div></main>"#);
}

#[test]
fn append_keeps_regions() {
    let mut inner = Markup::new();
    inner.region("diagnostics", Markup::new());
    let mut outer = Markup::new();
    outer.push_str("<nav></nav>");
    outer.append(inner);
    let mut ready = Markup::new();
    ready.push_str("<pre>ok</pre>");
    assert!(outer.replace_region("diagnostics", ready));
    assert_eq!(outer.to_html(), r#"<nav></nav><div data-region="diagnostics"><pre>ok</pre></div>"#);
}

#[test]
fn slot_states() {
    let props = json!({"title": "Home"});
    let props = props.as_object().unwrap();
    let view = PropsView::new(props).with_pending(["heavy"]).with_failed("stats", "timeout");

    assert_eq!(view.slot("title"), Slot::Ready(&json!("Home")));
    assert_eq!(view.slot("heavy"), Slot::Pending);
    assert_eq!(view.slot("stats"), Slot::Failed("timeout"));
    assert_eq!(view.slot("diagnostics"), Slot::Missing);
    assert_eq!(view.str("title"), Some("Home"));
}
