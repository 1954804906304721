//! Article sources consumed by the aggregation cache
//!
//! Each configured feed becomes one `RssFeedSource`; the optional secondary
//! JSON endpoint becomes a `SecondarySource`. Both yield normalized articles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use swipefeed_core::{Article, FeedConfig};
use tracing::{debug, instrument};

use crate::error::NewsError;
use crate::fetcher::HttpFetcher;
use crate::normalizer::Normalizer;
use crate::parser::parse_feed;

/// Entries normalized concurrently per feed (bounds page-image lookups)
const NORMALIZE_CONCURRENCY: usize = 8;

/// Anything that can produce a batch of normalized articles
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError>;
}

/// One RSS/Atom feed
pub struct RssFeedSource {
    feed: FeedConfig,
    fetcher: HttpFetcher,
    normalizer: Arc<Normalizer>,
    timeout: Duration,
    max_bytes: usize,
}

impl RssFeedSource {
    pub fn new(
        feed: FeedConfig,
        fetcher: HttpFetcher,
        normalizer: Arc<Normalizer>,
        timeout: Duration,
        max_bytes: usize,
    ) -> Self {
        Self {
            feed,
            fetcher,
            normalizer,
            timeout,
            max_bytes,
        }
    }
}

#[async_trait]
impl ArticleSource for RssFeedSource {
    fn name(&self) -> &str {
        &self.feed.name
    }

    #[instrument(skip(self), fields(feed = %self.feed.name))]
    async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
        let response = self
            .fetcher
            .fetch(&self.feed.url, self.timeout, self.max_bytes)
            .await?
            .error_for_status()?;

        let parsed = parse_feed(&response.body)?;
        // The document's own title wins over the configured display name
        let feed_title = parsed.title.clone().unwrap_or_else(|| self.feed.name.clone());
        let feed_title = feed_title.as_str();
        let feed_url = self.feed.url.as_str();
        let normalizer = self.normalizer.as_ref();
        debug!(entries = parsed.entries.len(), "Parsed feed");

        let articles = stream::iter(parsed.entries)
            .map(|entry| async move {
                normalizer
                    .normalize(&entry, Some(feed_title), feed_url)
                    .await
            })
            .buffered(NORMALIZE_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(articles)
    }
}

/// Payload accepted from the secondary endpoint
#[derive(Deserialize)]
#[serde(untagged)]
enum SecondaryPayload {
    List(Vec<Article>),
    Wrapped { articles: Vec<Article> },
}

/// JSON endpoint returning already-normalized articles
pub struct SecondarySource {
    endpoint: String,
    fetcher: HttpFetcher,
    timeout: Duration,
    max_bytes: usize,
}

impl SecondarySource {
    pub fn new(endpoint: String, fetcher: HttpFetcher, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            endpoint,
            fetcher,
            timeout,
            max_bytes,
        }
    }
}

#[async_trait]
impl ArticleSource for SecondarySource {
    fn name(&self) -> &str {
        "secondary"
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
        let response = self
            .fetcher
            .fetch(&self.endpoint, self.timeout, self.max_bytes)
            .await?
            .error_for_status()?;

        let payload: SecondaryPayload = serde_json::from_slice(&response.body)
            .map_err(|e| NewsError::Parse(format!("secondary source payload: {}", e)))?;

        Ok(match payload {
            SecondaryPayload::List(articles) => articles,
            SecondaryPayload::Wrapped { articles } => articles,
        })
    }
}
