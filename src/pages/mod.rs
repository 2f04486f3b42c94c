//! Demo page components and the registry that names them.

pub mod error;
pub mod home;
pub mod layout;
pub mod settings;
pub mod users;

use std::sync::Arc;

use serde_json::Value;

use crate::registry::{ComponentDef, PageRegistry, PageRegistryBuilder};
use crate::render::RenderError;

/// Registry of the demo pages with `AppLayout` as the default layout.
///
/// # Errors
///
/// Returns [`RenderError::DuplicatePage`] if two pages share a name.
pub fn registry() -> Result<PageRegistry, RenderError> {
    Ok(PageRegistryBuilder::new()
        .default_layout(Arc::new(layout::AppLayout))
        .register(ComponentDef::new("Home", home::MODULE, home::HomePage))?
        .register(ComponentDef::new("Users", users::MODULE, users::UsersPage))?
        .register(ComponentDef::new("Settings", settings::MODULE, settings::SettingsPage))?
        .register(ComponentDef::new("Error", error::MODULE, error::ErrorPage))?
        .build())
}

/// Display text for a prop value: strings bare, everything else as JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
