//! Adapter and server configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8383;
pub const DEFAULT_HOT_FILE: &str = "hot";
pub const DEFAULT_SSR_URL: &str = "http://127.0.0.1:13714/render";
pub const DEFAULT_SSR_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_SSR_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_SSR_CACHE_MAX_ENTRIES: usize = 1024;
pub const DEFAULT_SSR_MAX_RETRIES: u32 = 1;
pub const DEFAULT_SSR_RETRY_DELAY_MS: u64 = 10;

/// Fallback cache bound when a zero bound is configured alongside a TTL.
pub const FALLBACK_SSR_CACHE_MAX_ENTRIES: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("unknown SSR_MODE: {0}")]
    UnknownSsrMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsrMode {
    /// Pages render client-side only.
    Off,
    /// Pages render in-process through the page registry.
    Local,
    /// Pages render on a remote SSR server over HTTP.
    Http,
}

/// SSR client tuning. Mirrors what a remote renderer needs: where, how long,
/// how often to retry and how long to keep responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrConfig {
    pub url: String,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Statuses that trigger a retry. Empty means "any 5xx".
    pub retry_statuses: Vec<u16>,
    pub disable_retries: bool,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SSR_URL.to_owned(),
            timeout: Duration::from_millis(DEFAULT_SSR_TIMEOUT_MS),
            headers: Vec::new(),
            cache_ttl: Duration::from_secs(DEFAULT_SSR_CACHE_TTL_SECS),
            cache_max_entries: DEFAULT_SSR_CACHE_MAX_ENTRIES,
            max_retries: DEFAULT_SSR_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_SSR_RETRY_DELAY_MS),
            retry_statuses: Vec::new(),
            disable_retries: false,
        }
    }
}

impl SsrConfig {
    /// Apply retry defaults. `disable_retries` forces zero retries; a zero
    /// delay falls back to the default delay.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.disable_retries {
            self.max_retries = 0;
        }
        if self.retry_delay.is_zero() {
            self.retry_delay = Duration::from_millis(DEFAULT_SSR_RETRY_DELAY_MS);
        }
        self
    }

    /// Whether a response with `status` (0 for a transport failure) should be retried.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        if status == 0 {
            return true;
        }
        if self.retry_statuses.is_empty() {
            return status >= 500;
        }
        self.retry_statuses.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub base_url: String,
    pub asset_version: String,
    /// Directory holding `app.html` and `error.html`. Embedded templates when `None`.
    pub template_dir: Option<PathBuf>,
    pub public_dir: PathBuf,
    pub hot_file: String,
    pub dev_mode: bool,
    pub expose_error_details: bool,
    pub precognition_vary: bool,
    pub ssr_mode: SsrMode,
    pub ssr: SsrConfig,
    /// Also serve the SSR render endpoint on this port.
    pub ssr_server_port: Option<u16>,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional (defaults in parentheses):
    /// - `PORT` (8383), `BASE_URL` (`http://localhost:{PORT}`), `ASSET_VERSION` ("")
    /// - `TEMPLATE_DIR` (embedded), `PUBLIC_DIR` (`public`), `HOT_FILE` (`hot`)
    /// - `DEV_MODE`, `EXPOSE_ERROR_DETAILS` (false), `PRECOGNITION_VARY` (true)
    /// - `SSR_MODE`: `off` (default), `local` or `http`
    /// - `SSR_URL`, `SSR_TIMEOUT_MS`, `SSR_CACHE_TTL_SECS`, `SSR_CACHE_MAX_ENTRIES`,
    ///   `SSR_MAX_RETRIES`, `SSR_RETRY_DELAY_MS`, `SSR_RETRY_STATUSES`,
    ///   `SSR_DISABLE_RETRIES`, `SSR_SERVER_PORT`
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable numbers or an unknown `SSR_MODE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse_strict("PORT", DEFAULT_PORT)?;
        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();
        let ssr_mode = parse_ssr_mode(std::env::var("SSR_MODE").ok().as_deref())?;

        let ssr = SsrConfig {
            url: std::env::var("SSR_URL").unwrap_or_else(|_| DEFAULT_SSR_URL.to_owned()),
            timeout: Duration::from_millis(env_parse_strict("SSR_TIMEOUT_MS", DEFAULT_SSR_TIMEOUT_MS)?),
            headers: Vec::new(),
            cache_ttl: Duration::from_secs(env_parse_strict("SSR_CACHE_TTL_SECS", DEFAULT_SSR_CACHE_TTL_SECS)?),
            cache_max_entries: env_parse_strict("SSR_CACHE_MAX_ENTRIES", DEFAULT_SSR_CACHE_MAX_ENTRIES)?,
            max_retries: env_parse_strict("SSR_MAX_RETRIES", DEFAULT_SSR_MAX_RETRIES)?,
            retry_delay: Duration::from_millis(env_parse_strict("SSR_RETRY_DELAY_MS", DEFAULT_SSR_RETRY_DELAY_MS)?),
            retry_statuses: parse_status_list(std::env::var("SSR_RETRY_STATUSES").ok().as_deref())?,
            disable_retries: env_bool("SSR_DISABLE_RETRIES").unwrap_or(false),
        }
        .normalized();

        let ssr_server_port = match std::env::var("SSR_SERVER_PORT") {
            Ok(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid { var: "SSR_SERVER_PORT", value: raw })?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            port,
            base_url,
            asset_version: std::env::var("ASSET_VERSION").unwrap_or_default(),
            template_dir: std::env::var("TEMPLATE_DIR").ok().map(PathBuf::from),
            public_dir: std::env::var("PUBLIC_DIR").map_or_else(|_| PathBuf::from("public"), PathBuf::from),
            hot_file: std::env::var("HOT_FILE").unwrap_or_else(|_| DEFAULT_HOT_FILE.to_owned()),
            dev_mode: env_bool("DEV_MODE").unwrap_or(false),
            expose_error_details: env_bool("EXPOSE_ERROR_DETAILS").unwrap_or(false),
            precognition_vary: env_bool("PRECOGNITION_VARY").unwrap_or(true),
            ssr_mode,
            ssr,
            ssr_server_port,
        })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse_strict<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var: key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_ssr_mode(raw: Option<&str>) -> Result<SsrMode, ConfigError> {
    match raw.map(str::trim).unwrap_or("off") {
        "off" | "" => Ok(SsrMode::Off),
        "local" => Ok(SsrMode::Local),
        "http" => Ok(SsrMode::Http),
        other => Err(ConfigError::UnknownSsrMode(other.to_owned())),
    }
}

fn parse_status_list(raw: Option<&str>) -> Result<Vec<u16>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "SSR_RETRY_STATUSES", value: raw.to_owned() })
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
