//! Runtime configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The file lives at `$ANNOSEARCH_CONFIG` when set,
//! otherwise `annosearch/config.toml` under the XDG/platform config dir.
//!
//! # Example Configuration
//!
//! ```toml
//! quickwit_base_url = "http://quickwit.internal:7280/api/v1/"
//! request_timeout_secs = 10
//! host = "0.0.0.0"
//! port = 8080
//! public_url = "https://search.example.org"
//! max_hits = 20
//! snippet_length = 25
//! cors_origin = "https://viewer.example.org"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUICKWIT_BASE_URL: &str = "http://localhost:7280/api/v1/";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_HITS: usize = 20;
pub const DEFAULT_SNIPPET_LENGTH: usize = 25;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    Env { key: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnoSearchConfig {
    /// Base URL of the engine REST API, including the version prefix.
    pub quickwit_base_url: String,
    /// Client-level timeout applied to every engine and document request.
    pub request_timeout_secs: u64,
    pub host: String,
    pub port: u16,
    /// Public base URL used in response ids. Defaults to `http://{host}:{port}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    /// Page size for search results.
    pub max_hits: usize,
    /// Characters of context captured either side of a highlight.
    pub snippet_length: usize,
    pub cors_origin: String,
    pub log_level: String,
}

impl Default for AnnoSearchConfig {
    fn default() -> Self {
        Self {
            quickwit_base_url: DEFAULT_QUICKWIT_BASE_URL.to_string(),
            request_timeout_secs: 5,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: None,
            max_hits: DEFAULT_MAX_HITS,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
            cors_origin: "*".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AnnoSearchConfig {
    /// Load configuration from a specific path.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the config file path.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var("ANNOSEARCH_CONFIG") {
            return Some(PathBuf::from(explicit));
        }
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join("annosearch").join("config.toml"));
        }
        dirs::config_dir().map(|p| p.join("annosearch").join("config.toml"))
    }

    /// Apply `QUICKWIT_*` / `ANNOSEARCH_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("QUICKWIT_BASE_URL") {
            self.quickwit_base_url = url;
        }
        if let Some(secs) = env_parse::<u64>("QUICKWIT_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }
        if let Ok(host) = std::env::var("ANNOSEARCH_HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse::<u16>("ANNOSEARCH_PORT")? {
            self.port = port;
        }
        if let Ok(url) = std::env::var("ANNOSEARCH_PUBLIC_URL") {
            self.public_url = Some(url);
        }
        if let Some(max_hits) = env_parse::<usize>("ANNOSEARCH_MAX_HITS")? {
            self.max_hits = max_hits;
        }
        if let Some(len) = env_parse::<usize>("ANNOSEARCH_SNIPPET_LENGTH")? {
            self.snippet_length = len;
        }
        if let Ok(origin) = std::env::var("ANNOSEARCH_CORS_ORIGIN") {
            self.cors_origin = origin;
        }
        if let Ok(level) = std::env::var("ANNOSEARCH_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quickwit_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Engine base URL cannot be empty".into(),
            ));
        }
        if self.host.is_empty() {
            return Err(ConfigError::Validation("Host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("Port cannot be zero".into()));
        }
        if self.max_hits == 0 {
            return Err(ConfigError::Validation(
                "max_hits must be a positive integer".into(),
            ));
        }
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid log level: {other}. Must be one of: trace, debug, info, warn, error"
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL that search and autocomplete ids are minted under.
    pub fn search_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value }),
        Err(_) => Ok(None),
    }
}
