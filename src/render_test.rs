use super::*;
use crate::markup::Slot;
use crate::registry::{ComponentDef, Layout, PageComponent, PageRegistryBuilder};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

struct Heavy;

impl PageComponent for Heavy {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup) {
        out.push_str("<h1>");
        out.text(props.str("title").unwrap_or_default());
        out.push_str("</h1>");
        match props.slot("heavy") {
            Slot::Pending => out.push_str("<p>Loading</p>"),
            Slot::Ready(Value::Array(items)) => {
                for item in items {
                    out.push_str("<li>");
                    out.text(&item.to_string());
                    out.push_str("</li>");
                }
            }
            _ => out.push_str("<p>none</p>"),
        }
    }
}

struct Frame;

impl Layout for Frame {
    fn module(&self) -> &str {
        "test/frame"
    }

    fn wrap(&self, _props: &PropsView<'_>, content: Markup) -> Markup {
        let mut out = Markup::new();
        out.push_str("<frame>");
        out.append(content);
        out.push_str("</frame>");
        out
    }
}

fn registry() -> PageRegistry {
    PageRegistryBuilder::new()
        .default_layout(Arc::new(Frame))
        .register(ComponentDef::new("Home", "test/home", Heavy))
        .unwrap()
        .register(ComponentDef::new("Bare", "test/bare", Heavy).without_layout())
        .unwrap()
        .build()
}

fn page(component: &str, props: Value) -> Page {
    Page {
        component: component.to_owned(),
        props: props.as_object().cloned().unwrap_or_default(),
        url: "/".to_owned(),
        version: "v1".to_owned(),
        ..Page::default()
    }
}

#[test]
fn render_embeds_descriptor_and_content() {
    let out = render_page(&registry(), &page("Home", json!({ "title": "Hi & bye" }))).unwrap();
    assert!(out.body.starts_with(r#"<div id="app" data-page="{&quot;component&quot;:&quot;Home&quot;"#));
    assert!(out.body.contains("<frame><h1>Hi &amp; bye</h1>"));
    assert!(out.body.ends_with("</frame></div>"));
    assert_eq!(out.head, vec!["<title inertia>Hi &amp; bye</title>".to_owned()]);
}

#[test]
fn render_records_component_and_layout_modules() {
    let out = render_page(&registry(), &page("Home", json!({}))).unwrap();
    assert_eq!(out.modules.iter().map(String::as_str).collect::<Vec<_>>(), vec!["test/frame", "test/home"]);
}

#[test]
fn disabled_layout_is_not_applied() {
    let out = render_page(&registry(), &page("Bare", json!({}))).unwrap();
    assert!(!out.body.contains("<frame>"));
    assert_eq!(out.modules.len(), 1);
}

#[test]
fn unknown_component_is_page_not_found() {
    let err = render_page(&registry(), &page("Missing", json!({}))).unwrap_err();
    assert!(matches!(err, RenderError::PageNotFound(name) if name == "Missing"));
}

#[test]
fn deferred_prop_without_value_is_pending() {
    let mut descriptor = page("Home", json!({}));
    descriptor.deferred_props = BTreeMap::from([("default".to_owned(), vec!["heavy".to_owned()])]);
    let out = render_page(&registry(), &descriptor).unwrap();
    assert!(out.body.contains("<p>Loading</p>"));
}

#[test]
fn resolved_prop_renders_in_order() {
    let out = render_page(&registry(), &page("Home", json!({ "heavy": [3, 1, 2] }))).unwrap();
    assert!(out.body.contains("<li>3</li><li>1</li><li>2</li>"));
}

#[test]
fn head_title_falls_back_to_component_name() {
    let out = render_page(&registry(), &page("Home", json!({}))).unwrap();
    assert_eq!(out.head, vec!["<title inertia>Home</title>".to_owned()]);
}

#[test]
fn concurrent_renders_keep_separate_module_sets() {
    let registry = Arc::new(registry());
    let handles: Vec<_> = ["Home", "Bare"]
        .into_iter()
        .map(|name| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || render_page(&registry, &page(name, json!({}))).unwrap().modules)
        })
        .collect();
    let sets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(sets[0].len(), 2);
    assert_eq!(sets[1].len(), 1);
}

#[test]
fn context_records_each_module_once() {
    let mut ctx = RenderContext::new();
    ctx.record("a");
    ctx.record("a");
    ctx.record("b");
    assert_eq!(ctx.modules().len(), 2);
}

#[test]
fn modules_meta_lists_modules_in_order() {
    let modules = BTreeSet::from(["pages/users".to_owned(), "pages/layout".to_owned()]);
    assert_eq!(modules_meta(&modules).as_deref(), Some(r#"<meta name="page-modules" content="pages/layout pages/users">"#));
    assert_eq!(modules_meta(&BTreeSet::new()), None);
}
