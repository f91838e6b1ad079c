//! Configuration management for feedticker.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "feedticker";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "cache.db";

/// Feed fetched when none is configured.
pub const DEFAULT_FEED_URL: &str = "http://feeds.bbci.co.uk/news/rss.xml";

/// CORS proxy prefixed to the feed URL when proxying is enabled.
pub const DEFAULT_CORS_PROXY_URL: &str = "https://cors-anywhere.herokuapp.com";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FEEDTICKER_`, sections split by `__`)
/// 2. TOML config file at `~/.config/feedticker/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed source configuration.
    pub feed: FeedConfig,
    /// Refresh loop configuration.
    pub ticker: TickerConfig,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Output configuration.
    pub display: DisplayConfig,
}

/// Where and how the feed is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// URL of the RSS feed.
    pub url: String,
    /// Route requests through the CORS proxy.
    pub cors_proxy_enabled: bool,
    /// Base URL of the CORS proxy.
    pub cors_proxy_url: String,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// User agent sent with each request.
    pub user_agent: String,
}

/// Refresh loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Maximum number of entries kept and displayed.
    pub limit: usize,
    /// Interval between refreshes in milliseconds.
    pub cache_interval_ms: u64,
}

/// Cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the cache database.
    /// Defaults to `~/.local/share/feedticker/cache.db`
    pub database_path: Option<PathBuf>,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Column width used to truncate snippets.
    pub width: usize,
    /// Show the snippet under each title.
    pub show_snippets: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            cors_proxy_enabled: false,
            cors_proxy_url: DEFAULT_CORS_PROXY_URL.to_string(),
            request_timeout_secs: 10,
            user_agent: format!("feedticker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            limit: 7,
            cache_interval_ms: 3000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 80,
            show_snippets: true,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(config_file))
    }

    fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("FEEDTICKER_").split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.limit == 0 {
            return Err(Error::ConfigValidation {
                message: "limit must be greater than 0".to_string(),
            });
        }

        if self.ticker.cache_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "cache_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.feed.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if reqwest::Url::parse(&self.feed.url).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid feed url: {:?}", self.feed.url),
            });
        }

        if self.feed.cors_proxy_enabled && reqwest::Url::parse(&self.feed.cors_proxy_url).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid cors proxy url: {:?}", self.feed.cors_proxy_url),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.cache
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the refresh interval as a Duration.
    #[must_use]
    pub fn cache_interval(&self) -> Duration {
        Duration::from_millis(self.ticker.cache_interval_ms)
    }

    /// Get the HTTP request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.request_timeout_secs)
    }

    /// The CORS proxy base URL, if proxying is enabled.
    #[must_use]
    pub fn cors_proxy(&self) -> Option<&str> {
        self.feed
            .cors_proxy_enabled
            .then_some(self.feed.cors_proxy_url.as_str())
    }
}
