//! Configuration management for the kobo99 crawler
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `KOBO99_*` environment variables. Every section is optional in the
//! file.

pub mod rules;

pub use rules::{ExtractionRules, RegionPolicy, WeekOverride};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawler configuration
    pub crawler: CrawlerConfig,

    /// Extraction rule tables
    pub extraction: ExtractionRules,

    /// Entry store configuration
    pub storage: StorageConfig,

    /// Calendar output configuration
    pub calendar: CalendarConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Blog root; weekly article slugs are appended
    pub base_url: String,

    /// Referer sent with every request
    pub blog_referer: String,

    /// Rate limit (requests per second)
    pub rate_limit: f64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum retries per article
    pub max_retries: u32,

    /// Base delay for exponential backoff
    pub retry_base_delay_ms: u64,

    /// Pause between consecutive articles
    pub request_delay_ms: u64,

    /// Fixed User-Agent; rotates through a browser pool when unset
    pub user_agent: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://www.kobo.com/zh/blog"),
            blog_referer: String::from("https://www.kobo.com/zh/blog"),
            rate_limit: 1.0,
            request_timeout_secs: 15,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            request_delay_ms: 200,
            user_agent: None,
        }
    }
}

/// Entry store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding every resolved entry
    pub data_store: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_store: PathBuf::from("data/events.json"),
        }
    }
}

/// Calendar output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub ics_path: PathBuf,

    /// `X-WR-CALNAME` shown by subscribing clients
    pub calendar_name: String,

    pub summary_prefix: String,

    /// Events older than this many days are left out
    pub retention_past_days: i64,

    /// Events further ahead than this many days are left out
    pub retention_future_days: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            ics_path: PathBuf::from("docs/kobo99.ics"),
            calendar_name: String::from("Kobo 99 選書"),
            summary_prefix: String::from("99元 - "),
            retention_past_days: 180,
            retention_future_days: 365,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// File (when given), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay `KOBO99_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("KOBO99_BASE_URL") {
            self.crawler.base_url = v;
        }
        if let Some(v) = env_parse("KOBO99_RATE_LIMIT") {
            self.crawler.rate_limit = v;
        }
        if let Some(v) = env_parse("KOBO99_REQUEST_TIMEOUT") {
            self.crawler.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("KOBO99_MAX_RETRIES") {
            self.crawler.max_retries = v;
        }
        if let Ok(v) = std::env::var("KOBO99_USER_AGENT") {
            self.crawler.user_agent = Some(v);
        }
        if let Ok(v) = std::env::var("KOBO99_DATA_STORE") {
            self.storage.data_store = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("KOBO99_ICS_PATH") {
            self.calendar.ics_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("KOBO99_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("KOBO99_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawler.rate_limit.is_nan() || self.crawler.rate_limit <= 0.0 {
            anyhow::bail!("rate_limit must be positive");
        }

        if self.crawler.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        url::Url::parse(&self.crawler.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.crawler.base_url))?;

        if self.calendar.retention_past_days < 0 || self.calendar.retention_future_days < 0 {
            anyhow::bail!("retention windows must not be negative");
        }

        self.extraction
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid extraction rules: {e}"))?;

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }

    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.crawler.request_delay_ms)
    }
}
