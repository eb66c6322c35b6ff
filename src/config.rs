//! Configuration file parser for `feedflow.toml`.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged, since they are
//! usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

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

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Pipeline configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Number of extraction workers.
    pub workers: usize,

    /// Maximum number of links waiting for a worker.
    pub queue_capacity: usize,

    /// Hard limit for fetching and reading one feed document.
    pub feed_timeout_secs: u64,

    /// Request timeout for article pages.
    pub page_timeout_secs: u64,

    /// TCP/TLS connect timeout for every request.
    pub connect_timeout_secs: u64,

    /// Refresh interval for feeds whose stored interval is not positive.
    pub default_refresh_secs: u64,

    /// Upper bound of the random delay added to each feed's interval.
    pub refresh_jitter_ms: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("feed.db"),
            workers: 3,
            queue_capacity: 10_000,
            feed_timeout_secs: 60,
            page_timeout_secs: 120,
            connect_timeout_secs: 30,
            default_refresh_secs: 3600,
            refresh_jitter_ms: 10_000,
            user_agent: concat!("feedflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "database_path",
        "workers",
        "queue_capacity",
        "feed_timeout_secs",
        "page_timeout_secs",
        "connect_timeout_secs",
        "default_refresh_secs",
        "refresh_jitter_ms",
        "user_agent",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
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
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [(self.workers, "workers"), (self.queue_capacity, "queue_capacity")];
        let durations = [
            (self.feed_timeout_secs, "feed_timeout_secs"),
            (self.page_timeout_secs, "page_timeout_secs"),
            (self.connect_timeout_secs, "connect_timeout_secs"),
            (self.default_refresh_secs, "default_refresh_secs"),
        ];

        let zero = counts
            .iter()
            .filter(|(value, _)| *value == 0)
            .map(|(_, key)| *key)
            .chain(
                durations
                    .iter()
                    .filter(|(value, _)| *value == 0)
                    .map(|(_, key)| *key),
            )
            .next();

        match zero {
            Some(key) => Err(ConfigError::Invalid(format!("{key} must be greater than zero"))),
            None => Ok(()),
        }
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn default_refresh(&self) -> Duration {
        Duration::from_secs(self.default_refresh_secs)
    }

    pub fn refresh_jitter(&self) -> Duration {
        Duration::from_millis(self.refresh_jitter_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
