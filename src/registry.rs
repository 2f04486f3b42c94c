//! Page registry: component name to renderable definition.
//!
//! DESIGN
//! ======
//! The registry is assembled once through `PageRegistryBuilder` and is
//! read-only afterwards, so it is shared behind an `Arc` without locking.
//! Definitions are never mutated; applying the default layout produces a new
//! definition.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::markup::{Markup, PropsView};
use crate::render::RenderError;

/// A page that turns props into markup.
pub trait PageComponent: Send + Sync {
    fn render(&self, props: &PropsView<'_>, out: &mut Markup);

    /// Re-render a single region after the prop it depends on changed.
    fn render_region(&self, _region: &str, _props: &PropsView<'_>) -> Option<Markup> {
        None
    }
}

/// Chrome wrapped around page content.
pub trait Layout: Send + Sync {
    /// Module name recorded when the layout is used.
    fn module(&self) -> &str;

    fn wrap(&self, props: &PropsView<'_>, content: Markup) -> Markup;
}

#[derive(Clone)]
pub enum LayoutSlot {
    /// No layout declared; the registry default applies.
    Undeclared,
    /// Explicitly rendered without any layout.
    Disabled,
    Declared(Arc<dyn Layout>),
}

impl fmt::Debug for LayoutSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undeclared => f.write_str("Undeclared"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Declared(layout) => write!(f, "Declared({})", layout.module()),
        }
    }
}

#[derive(Clone)]
pub struct ComponentDef {
    pub name: String,
    pub module: String,
    pub view: Arc<dyn PageComponent>,
    pub layout: LayoutSlot,
}

impl ComponentDef {
    pub fn new(name: impl Into<String>, module: impl Into<String>, view: impl PageComponent + 'static) -> Self {
        Self { name: name.into(), module: module.into(), view: Arc::new(view), layout: LayoutSlot::Undeclared }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.layout = LayoutSlot::Declared(layout);
        self
    }

    #[must_use]
    pub fn without_layout(mut self) -> Self {
        self.layout = LayoutSlot::Disabled;
        self
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Copy of `component` using `fallback` when it declares no layout.
///
/// An explicitly disabled layout stays disabled.
#[must_use]
pub fn with_default_layout(component: &ComponentDef, fallback: &Arc<dyn Layout>) -> ComponentDef {
    let mut resolved = component.clone();
    if matches!(resolved.layout, LayoutSlot::Undeclared) {
        resolved.layout = LayoutSlot::Declared(Arc::clone(fallback));
    }
    resolved
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Default)]
pub struct PageRegistryBuilder {
    pages: BTreeMap<String, ComponentDef>,
    default_layout: Option<Arc<dyn Layout>>,
}

impl PageRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`RenderError::DuplicatePage`] if the name is already taken.
    pub fn register(mut self, component: ComponentDef) -> Result<Self, RenderError> {
        if self.pages.contains_key(&component.name) {
            return Err(RenderError::DuplicatePage(component.name));
        }
        self.pages.insert(component.name.clone(), component);
        Ok(self)
    }

    #[must_use]
    pub fn default_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.default_layout = Some(layout);
        self
    }

    #[must_use]
    pub fn build(self) -> PageRegistry {
        PageRegistry { pages: self.pages, default_layout: self.default_layout }
    }
}

pub struct PageRegistry {
    pages: BTreeMap<String, ComponentDef>,
    default_layout: Option<Arc<dyn Layout>>,
}

impl PageRegistry {
    /// # Errors
    ///
    /// Returns [`RenderError::PageNotFound`] for an unregistered name.
    pub fn resolve(&self, name: &str) -> Result<&ComponentDef, RenderError> {
        self.pages.get(name).ok_or_else(|| RenderError::PageNotFound(name.to_owned()))
    }

    /// Resolve `name` and apply the default layout.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::PageNotFound`] for an unregistered name.
    pub fn resolve_with_layout(&self, name: &str) -> Result<ComponentDef, RenderError> {
        let component = self.resolve(name)?;
        Ok(match &self.default_layout {
            Some(layout) => with_default_layout(component, layout),
            None => component.clone(),
        })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
