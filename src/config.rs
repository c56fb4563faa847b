//! Configuration file parser for the feed builder.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which reproduces the storefront the tool was written for. Unknown keys
//! are ignored by serde, though we log a warning when the file contains
//! potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FetchLimits, RenderOptions, DEFAULT_FEED_VARIABLE, MAX_PAGE_SIZE};
use crate::util::{validate_url, UrlValidationError};

/// Storefront page read by default.
pub const DEFAULT_FEED_URL: &str = "https://idyl.com/pages/borderfree-xml-feed";
/// Output written by default, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "feed.xml";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed_url: {0}")]
    InvalidUrl(#[from] UrlValidationError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Run configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storefront page containing the embedded feed.
    pub feed_url: String,

    /// Destination of the generated feed; replaced on every successful run.
    pub output_path: PathBuf,

    /// Script variable the page assigns its feed literal to.
    pub feed_variable: String,

    /// Emit `<g:sale_price>` alongside `<g:price>`.
    pub emit_sale_price: bool,

    /// Timeout for the page request, in seconds.
    pub request_timeout_secs: u64,

    /// Largest page body accepted, in bytes.
    pub max_page_bytes: usize,

    /// User-Agent header sent with the page request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            feed_variable: DEFAULT_FEED_VARIABLE.to_string(),
            emit_sale_price: false,
            request_timeout_secs: 30,
            max_page_bytes: MAX_PAGE_SIZE,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "feed_url",
        "output_path",
        "feed_variable",
        "emit_sale_price",
        "request_timeout_secs",
        "max_page_bytes",
        "user_agent",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
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
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feed_url = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Checks values that parse fine but cannot drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.feed_url)?;
        if self.feed_variable.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "feed_variable",
                reason: "must not be empty".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_page_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_page_bytes",
                reason: "must be greater than zero".into(),
            });
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output_path",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_page_bytes,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            emit_sale_price: self.emit_sale_price,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
