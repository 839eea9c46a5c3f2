//! Configuration file parser for `~/.config/rss-digest/config.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde and reported with a warning, since they
//! are usually typos.
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FeedSettings, SortKey, SortOrder};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Unknown timezone '{0}' (expected an IANA name such as \"UTC\" or \"Europe/Berlin\")")]
    InvalidTimezone(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Struct
// ============================================================================

const KNOWN_KEYS: &[&str] = &[
    "feeds",
    "opml",
    "timezone",
    "full_articles",
    "request_timeout_secs",
    "max_concurrency",
    "deadline_secs",
    "block_private_hosts",
    "output_dir",
    "sort_key",
    "sort_descending",
];

/// Top-level digest configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, in the order their sections appear in the digest.
    pub feeds: Vec<String>,

    /// OPML subscription file whose feeds are appended to `feeds`.
    pub opml: Option<PathBuf>,

    /// IANA timezone all timestamps are shown in.
    pub timezone: String,

    /// Carry full article content instead of summaries where feeds provide it.
    pub full_articles: bool,

    /// Per-request timeout in seconds. Must be greater than zero.
    pub request_timeout_secs: u64,

    /// Maximum feeds fetched at once. 0 = one concurrent fetch per feed.
    pub max_concurrency: usize,

    /// Overall deadline for a run in seconds. 0 = no deadline.
    pub deadline_secs: u64,

    /// Refuse to fetch from localhost and private network addresses.
    pub block_private_hosts: bool,

    /// Directory the dated digest file is written to.
    pub output_dir: PathBuf,

    pub sort_key: SortKey,

    pub sort_descending: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            opml: None,
            timezone: "UTC".to_string(),
            full_articles: false,
            request_timeout_secs: 30,
            max_concurrency: 0,
            deadline_secs: 0,
            block_private_hosts: false,
            output_dir: PathBuf::from("data"),
            sort_key: SortKey::Published,
            sort_descending: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Default config location: `$HOME/.config/rss-digest/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("rss-digest")
                .join("config.toml")
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// Values are not validated here; see [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            timezone = %config.timezone,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Resolves the configured timezone name.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Checks values serde cannot: the timezone name and a non-zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the reader-wide settings for an aggregation run.
    pub fn feed_settings(&self) -> Result<FeedSettings, ConfigError> {
        self.validate()?;
        Ok(FeedSettings {
            timezone: self.timezone()?,
            full_articles: self.full_articles,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_concurrency: (self.max_concurrency > 0).then_some(self.max_concurrency),
            deadline: (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs)),
            block_private_hosts: self.block_private_hosts,
        })
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_descending(self.sort_descending)
    }
}

// ============================================================================
// Tests
// ============================================================================
