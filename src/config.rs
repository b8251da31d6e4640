use crate::error::ConfigError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Per-attempt timeout used when the config file does not set one.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Config File
// =============================================================================

/// Raw contents of the JSON config file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    /// Target endpoint
    pub url: String,

    /// HTTP method, case-insensitive
    #[serde(default = "default_method")]
    pub method: String,

    /// Headers sent with every request
    #[serde(default)]
    pub header: HashMap<String, String>,

    /// Request body sent with every request
    #[serde(default)]
    pub body: String,

    /// Extra attempts after the first one
    #[serde(default)]
    pub retry: u32,

    /// Log file, empty for stdout
    #[serde(default)]
    pub log: String,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&content)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(sonic_rs::from_str(content)?)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        let trimmed = self.log.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    /// Validate the raw values into the immutable request description shared
    /// by all workers.
    pub fn to_run_config(&self) -> Result<RunConfig, ConfigError> {
        let url = Url::parse(self.url.trim()).map_err(|source| ConfigError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        let method = parse_method(&self.method)?;
        let headers = parse_headers(&self.header)?;

        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(RunConfig {
            url,
            method,
            headers,
            body: self.body.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.retry,
        })
    }
}

fn parse_method(raw: &str) -> Result<Method, ConfigError> {
    let normalized = raw.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(normalized.as_bytes())
        .map_err(|_| ConfigError::InvalidMethod(raw.to_string()))
}

fn parse_headers(raw: &HashMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

// =============================================================================
// Run Config
// =============================================================================

/// The request every worker repeats. Built once and never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: String,
    pub timeout: Duration,
    pub max_retries: u32,
}
