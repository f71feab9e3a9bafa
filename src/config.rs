//! Configuration file parser for `gsa-sync.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each one.
//! The loaded value is validated once and then treated as immutable.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::content::Whitelist;
use crate::feed::{validate_data_source, FeedError};
use crate::util::{validate_http_url, UrlValidationError};

/// Environment variable that overrides `gsa.password`.
pub const PASSWORD_ENV: &str = "GSA_PASSWORD";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid URL for '{key}': {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: UrlValidationError,
    },

    #[error("Invalid gsa.data_source: {0}")]
    DataSource(#[from] FeedError),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite content store used by bulk sync.
    pub database: PathBuf,

    /// Content categories eligible for push. Empty disables pushing.
    pub whitelist: Vec<String>,

    /// Category whose display URL comes from the node's link field
    /// instead of its canonical route.
    pub link_category: Option<String>,

    pub site: SiteConfig,

    pub gsa: GsaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("gsa-sync.db"),
            whitelist: Vec::new(),
            link_category: Some("link".to_string()),
            site: SiteConfig::default(),
            gsa: GsaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host used to build record URLs when no request origin
    /// is available (CLI, bulk sync).
    pub origin: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
        }
    }
}

/// Search appliance connection settings.
///
/// Custom Debug impl masks `password`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GsaConfig {
    /// Feed endpoint, usually `http://<appliance>:19900/xmlfeed`.
    pub endpoint: String,

    /// System identifier written into the feed DOCTYPE.
    pub dtd_url: String,

    /// Data source name the records are filed under.
    pub data_source: String,

    pub username: Option<String>,

    /// Basic-auth password (alternative to the GSA_PASSWORD env var).
    /// Env var takes precedence over config file.
    pub password: Option<String>,

    /// Treat non-2xx responses as push failures.
    pub raise_on_http_error: bool,
}

impl Default for GsaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:19900/xmlfeed".to_string(),
            dtd_url: "http://localhost:7800/gsafeed.dtd".to_string(),
            data_source: "cms".to_string(),
            username: None,
            password: None,
            raise_on_http_error: true,
        }
    }
}

impl std::fmt::Debug for GsaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsaConfig")
            .field("endpoint", &self.endpoint)
            .field("dtd_url", &self.dtd_url)
            .field("data_source", &self.data_source)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("raise_on_http_error", &self.raise_on_http_error)
            .finish()
    }
}

impl GsaConfig {
    pub fn dtd_url(&self) -> Result<Url, ConfigError> {
        validate_http_url(&self.dtd_url).map_err(|source| ConfigError::InvalidUrl {
            key: "gsa.dtd_url",
            source,
        })
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        validate_http_url(&self.endpoint).map_err(|source| ConfigError::InvalidUrl {
            key: "gsa.endpoint",
            source,
        })
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = ["database", "whitelist", "link_category", "site", "gsa"];

    /// Load configuration from a TOML file and validate it.
    ///
    /// - Missing file → defaults
    /// - Empty file → defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - `GSA_PASSWORD` in the environment replaces `gsa.password`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.apply_password_override(std::env::var(PASSWORD_ENV).ok());
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            endpoint = %config.gsa.endpoint,
            data_source = %config.gsa.data_source,
            whitelist = ?config.whitelist,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text, without validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        Ok(toml::from_str(content)?)
    }

    /// Replace the configured password with one from the environment.
    pub fn apply_password_override(&mut self, password: Option<String>) {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.gsa.password = Some(password);
        }
    }

    /// Check every URL and the data source name up front, so a bad value
    /// fails at startup rather than on the first push.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site_origin()?;
        self.gsa.endpoint_url()?;
        self.gsa.dtd_url()?;
        validate_data_source(&self.gsa.data_source)?;
        if self.whitelist().is_empty() {
            tracing::warn!("Category whitelist is empty, no content will be pushed");
        }
        Ok(())
    }

    pub fn site_origin(&self) -> Result<Url, ConfigError> {
        validate_http_url(&self.site.origin).map_err(|source| ConfigError::InvalidUrl {
            key: "site.origin",
            source,
        })
    }

    pub fn whitelist(&self) -> Whitelist {
        Whitelist::new(&self.whitelist)
    }
}

// ============================================================================
// Tests
// ============================================================================
