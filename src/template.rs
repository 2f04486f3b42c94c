//! Root HTML templates.
//!
//! `app.html` wraps every full page load and `error.html` renders browser
//! errors. Both are Tera templates, loaded from `TEMPLATE_DIR` when set and
//! embedded otherwise. Outside dev mode they are parsed once and cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};
use tera::{Context, Tera};
use wire::{Page, SsrResponse};

use crate::config::AppConfig;

pub const APP_TEMPLATE: &str = "app.html";
pub const ERROR_TEMPLATE: &str = "error.html";

const EMBEDDED_APP: &str = include_str!("../templates/app.html");
const EMBEDDED_ERROR: &str = include_str!("../templates/error.html");

const ASSET_PREFIX: &str = "/public/dist/";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Tera(#[from] tera::Error),
}

pub struct Templates {
    dir: Option<PathBuf>,
    public_dir: PathBuf,
    hot_file: String,
    dev_mode: bool,
    engine: OnceLock<Arc<Tera>>,
    hot_url: OnceLock<Option<String>>,
}

impl Templates {
    #[must_use]
    pub fn new(dir: Option<PathBuf>, public_dir: PathBuf, hot_file: impl Into<String>, dev_mode: bool) -> Self {
        Self {
            dir,
            public_dir,
            hot_file: hot_file.into(),
            dev_mode,
            engine: OnceLock::new(),
            hot_url: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.template_dir.clone(), config.public_dir.clone(), config.hot_file.clone(), config.dev_mode)
    }

    /// Parse both templates now instead of on first request.
    ///
    /// # Errors
    ///
    /// Returns the read or parse error of the first broken template.
    pub fn validate(&self) -> Result<(), TemplateError> {
        self.engine().map(|_| ())
    }

    /// Render the root page. `ssr` replaces the mount element when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to load or render.
    pub fn render_app(
        &self,
        page: &Page,
        ssr: Option<&SsrResponse>,
        view_data: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        let mut ctx = Context::new();
        for (key, value) in view_data {
            ctx.insert(key.as_str(), value);
        }
        ctx.insert("page", page);
        ctx.insert("page_json", &String::from_utf8_lossy(&wire::encode_page(page)));
        ctx.insert("ssr", &ssr);
        ctx.insert("hot_server_url", &self.hot_server_url());
        Ok(self.engine()?.render(APP_TEMPLATE, &ctx)?)
    }

    /// # Errors
    ///
    /// Returns an error if the template fails to load or render.
    pub fn render_error(&self, code: u16, message: &str, details: Option<&str>) -> Result<String, TemplateError> {
        let mut ctx = Context::new();
        ctx.insert("code", &code);
        ctx.insert("message", message);
        ctx.insert("details", &details.filter(|d| !d.is_empty()));
        Ok(self.engine()?.render(ERROR_TEMPLATE, &ctx)?)
    }

    /// Vite dev server URL from the hot file, if one is running.
    #[must_use]
    pub fn hot_server_url(&self) -> Option<String> {
        if self.dev_mode {
            return read_hot_file(&self.public_dir.join(&self.hot_file));
        }
        self.hot_url.get_or_init(|| read_hot_file(&self.public_dir.join(&self.hot_file))).clone()
    }

    fn engine(&self) -> Result<Arc<Tera>, TemplateError> {
        if self.dev_mode {
            return Ok(Arc::new(self.load()?));
        }
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }
        let engine = Arc::new(self.load()?);
        let _ = self.engine.set(Arc::clone(&engine));
        Ok(engine)
    }

    fn load(&self) -> Result<Tera, TemplateError> {
        let (app, error) = match &self.dir {
            Some(dir) => (read_template(&dir.join(APP_TEMPLATE))?, read_template(&dir.join(ERROR_TEMPLATE))?),
            None => (EMBEDDED_APP.to_owned(), EMBEDDED_ERROR.to_owned()),
        };
        let mut tera = Tera::default();
        tera.register_function("asset", asset);
        tera.add_raw_templates([(APP_TEMPLATE, app), (ERROR_TEMPLATE, error)])?;
        Ok(tera)
    }
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|source| TemplateError::Read { path: path.to_owned(), source })
}

fn read_hot_file(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let url = raw.trim();
    (!url.is_empty()).then(|| url.to_owned())
}

/// `asset(path="app.js")` -> `/public/dist/app.js`.
fn asset(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let path = args
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("asset() needs a string `path` argument"))?;
    Ok(Value::String(format!("{ASSET_PREFIX}{}", path.trim_start_matches('/'))))
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
