//! Application configuration
//!
//! Built once at process start (see `AppConfig::from_env`) and handed to the
//! services explicitly. Nothing below `main` reads the environment.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A configured RSS/Atom feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Display name, used when the feed carries no title of its own
    pub name: String,
    pub url: String,
}

impl FeedConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Optional secondary article source (a JSON endpoint returning articles)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondarySourceConfig {
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Optional external summarization service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizerConfig {
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_max_words")]
    pub max_words: u32,
    /// Articles enriched per served page
    #[serde(default = "default_max_per_request")]
    pub max_per_request: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            max_words: default_max_words(),
            max_per_request: default_max_per_request(),
        }
    }
}

/// Top-level configuration for the swipefeed service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub feeds: Vec<FeedConfig>,
    /// How long an aggregated article pool is served before refreshing
    pub cache_ttl_secs: u64,
    pub feed_timeout_ms: u64,
    pub page_timeout_ms: u64,
    pub max_feed_bytes: usize,
    pub max_page_bytes: usize,
    /// Fetch article pages for og:image when a feed entry has no image
    pub page_image_fallback: bool,
    /// SQLite file for preference state; in-memory store when unset
    pub preferences_db_path: Option<String>,
    /// JSON file overriding the built-in classification tables
    #[serde(default)]
    pub rules_path: Option<String>,
    pub secondary_source: SecondarySourceConfig,
    pub summarizer: SummarizerConfig,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            cache_ttl_secs: 300,
            feed_timeout_ms: 10_000,
            page_timeout_ms: 3_500,
            max_feed_bytes: 5 * 1024 * 1024,
            max_page_bytes: 2 * 1024 * 1024,
            page_image_fallback: true,
            preferences_db_path: None,
            rules_path: None,
            secondary_source: SecondarySourceConfig::default(),
            summarizer: SummarizerConfig::default(),
            server_port: 3001,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// Recognized:
    /// - SWIPEFEED_FEEDS: JSON array of `{"name": .., "url": ..}`
    /// - CACHE_TTL_SECS, FEED_TIMEOUT_MS, PAGE_TIMEOUT_MS
    /// - PAGE_IMAGE_FALLBACK
    /// - PREFERENCES_DB_PATH, RULES_PATH
    /// - SECONDARY_SOURCE_ENABLED, SECONDARY_SOURCE_ENDPOINT
    /// - SUMMARIZER_ENABLED, SUMMARIZER_ENDPOINT, SUMMARIZER_MAX_WORDS
    /// - SERVER_PORT
    pub fn from_env() -> CoreResult<Self> {
        let defaults = Self::default();

        let feeds = match env::var("SWIPEFEED_FEEDS") {
            Ok(json) => serde_json::from_str::<Vec<FeedConfig>>(&json).map_err(|e| {
                CoreError::config(format!("Invalid JSON in SWIPEFEED_FEEDS: {}", e))
            })?,
            Err(_) => defaults.feeds,
        };

        let config = Self {
            feeds,
            cache_ttl_secs: parse_var("CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl_secs),
            feed_timeout_ms: parse_var("FEED_TIMEOUT_MS")?.unwrap_or(defaults.feed_timeout_ms),
            page_timeout_ms: parse_var("PAGE_TIMEOUT_MS")?.unwrap_or(defaults.page_timeout_ms),
            max_feed_bytes: defaults.max_feed_bytes,
            max_page_bytes: defaults.max_page_bytes,
            page_image_fallback: parse_var("PAGE_IMAGE_FALLBACK")?
                .unwrap_or(defaults.page_image_fallback),
            preferences_db_path: env::var("PREFERENCES_DB_PATH").ok(),
            rules_path: env::var("RULES_PATH").ok(),
            secondary_source: SecondarySourceConfig {
                enabled: parse_var("SECONDARY_SOURCE_ENABLED")?.unwrap_or(false),
                endpoint: env::var("SECONDARY_SOURCE_ENDPOINT").ok(),
            },
            summarizer: SummarizerConfig {
                enabled: parse_var("SUMMARIZER_ENABLED")?.unwrap_or(false),
                endpoint: env::var("SUMMARIZER_ENDPOINT").ok(),
                max_words: parse_var("SUMMARIZER_MAX_WORDS")?.unwrap_or_else(default_max_words),
                max_per_request: default_max_per_request(),
            },
            server_port: parse_var("SERVER_PORT")?.unwrap_or(defaults.server_port),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot work at runtime
    pub fn validate(&self) -> CoreResult<()> {
        if self.secondary_source.enabled && self.secondary_source.endpoint.is_none() {
            return Err(CoreError::config(
                "secondary source enabled without an endpoint",
            ));
        }
        if self.summarizer.enabled && self.summarizer.endpoint.is_none() {
            return Err(CoreError::config("summarizer enabled without an endpoint"));
        }
        if self.feeds.is_empty() && !self.secondary_source.enabled {
            return Err(CoreError::config("no feeds configured"));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> CoreResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CoreError::config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

fn default_max_words() -> u32 {
    60
}

fn default_max_per_request() -> usize {
    5
}

/// Curated general-news feeds used when none are configured
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new("BBC News", "https://feeds.bbci.co.uk/news/rss.xml"),
        FeedConfig::new("BBC World", "https://feeds.bbci.co.uk/news/world/rss.xml"),
        FeedConfig::new("BBC Technology", "https://feeds.bbci.co.uk/news/technology/rss.xml"),
        FeedConfig::new("NPR News", "https://feeds.npr.org/1001/rss.xml"),
        FeedConfig::new("Guardian World", "https://www.theguardian.com/world/rss"),
        FeedConfig::new("Guardian US", "https://www.theguardian.com/us-news/rss"),
        FeedConfig::new("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
        FeedConfig::new("DW News", "https://rss.dw.com/rdf/rss-en-all"),
        FeedConfig::new("CBS News", "https://www.cbsnews.com/latest/rss/main"),
        FeedConfig::new("CNBC Top News", "https://search.cnbc.com/rs/search/combinedcms/view.xml?partnerId=wrss01&id=100003114"),
        FeedConfig::new("MIT Technology Review", "https://www.technologyreview.com/feed/"),
        FeedConfig::new("ESPN", "https://www.espn.com/espn/rss/news"),
        FeedConfig::new("NASA", "https://www.nasa.gov/rss/dyn/breaking_news.rss"),
    ]
}
