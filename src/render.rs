//! Server-side render entry: page descriptor in, HTML out.
//!
//! DESIGN
//! ======
//! The modules touched by a render are collected in a `RenderContext` owned by
//! that render and returned with the output; concurrent renders never share
//! it. Props are handed to components exactly as they arrived. Deferred props
//! absent from the descriptor are exposed as pending so components draw their
//! placeholders.

use std::collections::BTreeSet;

use wire::Page;

use crate::markup::{Markup, PropsView, attr};
use crate::registry::{ComponentDef, LayoutSlot, PageRegistry};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("page not found: {0}")]
    PageNotFound(String),
    #[error("page already registered: {0}")]
    DuplicatePage(String),
}

/// Per-render bookkeeping.
#[derive(Debug, Default)]
pub struct RenderContext {
    modules: BTreeSet<String>,
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, module: &str) {
        if !self.modules.contains(module) {
            self.modules.insert(module.to_owned());
        }
    }

    #[must_use]
    pub fn modules(&self) -> &BTreeSet<String> {
        &self.modules
    }

    #[must_use]
    pub fn into_modules(self) -> BTreeSet<String> {
        self.modules
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutput {
    pub head: Vec<String>,
    /// Mount element with the page descriptor and the rendered content.
    pub body: String,
    pub modules: BTreeSet<String>,
}

/// Render `page` to HTML.
///
/// # Errors
///
/// Returns [`RenderError::PageNotFound`] if the component is not registered;
/// nothing is rendered in that case.
pub fn render_page(registry: &PageRegistry, page: &Page) -> Result<RenderOutput, RenderError> {
    let component = registry.resolve_with_layout(&page.component)?;
    let mut ctx = RenderContext::new();
    let view = pending_view(page);
    let content = render_component(&component, &view, &mut ctx);

    let json = String::from_utf8_lossy(&wire::encode_page(page)).into_owned();
    let body = format!(r#"<div id="app" data-page="{}">{}</div>"#, attr(&json), content.to_html());

    Ok(RenderOutput { head: head_tags(page), body, modules: ctx.into_modules() })
}

/// Props view where deferred props without a value are pending.
#[must_use]
pub fn pending_view(page: &Page) -> PropsView<'_> {
    PropsView::new(&page.props).with_pending(page.deferred_keys())
}

/// Render a resolved component and its layout into markup.
pub fn render_component(component: &ComponentDef, view: &PropsView<'_>, ctx: &mut RenderContext) -> Markup {
    ctx.record(&component.module);
    let mut content = Markup::new();
    component.view.render(view, &mut content);

    match &component.layout {
        LayoutSlot::Declared(layout) => {
            ctx.record(layout.module());
            layout.wrap(view, content)
        }
        LayoutSlot::Undeclared | LayoutSlot::Disabled => content,
    }
}

fn head_tags(page: &Page) -> Vec<String> {
    let title = page.props.get("title").and_then(|v| v.as_str()).unwrap_or(&page.component);
    vec![format!("<title inertia>{}</title>", html_escape::encode_text(title))]
}

/// `<meta>` head tag listing the modules a render used, for preloading on the
/// client. `None` when nothing was recorded.
#[must_use]
pub fn modules_meta(modules: &BTreeSet<String>) -> Option<String> {
    if modules.is_empty() {
        return None;
    }
    let list = modules.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
    Some(format!(r#"<meta name="page-modules" content="{}">"#, attr(&list)))
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
