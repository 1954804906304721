//! Aggregation cache
//!
//! Fetches every configured source, merges, deduplicates and orders the
//! result, and serves that snapshot until the TTL runs out. There is no
//! refresh lock: overlapping refreshes each hit the network and the last one
//! to finish replaces the snapshot.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use swipefeed_core::Article;
use swipefeed_news::ArticleSource;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::error::ServiceError;

/// Sources fetched concurrently during a refresh
const FETCH_CONCURRENCY: usize = 4;

/// Cached snapshot with the time it was fetched
struct CacheEntry {
    articles: Arc<Vec<Article>>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// Process-wide article pool, shared by `Arc`
pub struct ArticleCache {
    sources: Vec<Arc<dyn ArticleSource>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl ArticleCache {
    pub fn new(sources: Vec<Arc<dyn ArticleSource>>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        info!(sources = sources.len(), ttl_secs = ttl.as_secs(), "Initializing article cache");
        Self {
            sources,
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    /// Current snapshot, refreshed when missing, expired or empty
    ///
    /// If every source fails but an older snapshot exists, the stale
    /// snapshot is served and its timestamp left alone so the next call
    /// retries.
    pub async fn get_articles(&self) -> Result<Arc<Vec<Article>>, ServiceError> {
        {
            let entry = self.entry.read().await;
            if let Some(entry) = entry.as_ref() {
                if !entry.articles.is_empty() && entry.is_fresh(self.clock.now(), self.ttl) {
                    debug!("Using cached articles ({} articles)", entry.articles.len());
                    return Ok(Arc::clone(&entry.articles));
                }
            }
        }

        match self.refresh().await {
            Ok(articles) => Ok(articles),
            Err(ServiceError::NoAccessibleSource) => {
                let entry = self.entry.read().await;
                match entry.as_ref() {
                    Some(stale) => {
                        warn!(
                            "All sources failed, serving stale snapshot ({} articles)",
                            stale.articles.len()
                        );
                        Ok(Arc::clone(&stale.articles))
                    }
                    None => Err(ServiceError::NoAccessibleSource),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch every source now and replace the snapshot
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Vec<Article>>, ServiceError> {
        let results: Vec<_> = stream::iter(self.sources.iter().cloned())
            .map(|source| async move { (source.name().to_string(), source.fetch_articles().await) })
            .boxed()
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut batches = Vec::with_capacity(results.len());
        let mut failures = 0;
        for (name, result) in results {
            match result {
                Ok(articles) => {
                    debug!(source = %name, count = articles.len(), "Fetched source");
                    batches.push(articles);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Failed to fetch source, skipping");
                    failures += 1;
                }
            }
        }

        if !self.sources.is_empty() && failures == self.sources.len() {
            return Err(ServiceError::NoAccessibleSource);
        }

        let articles = Arc::new(aggregate(batches));
        info!(
            "Aggregated {} articles from {} sources ({} failed)",
            articles.len(),
            self.sources.len(),
            failures
        );

        let mut entry = self.entry.write().await;
        *entry = Some(CacheEntry {
            articles: Arc::clone(&articles),
            fetched_at: self.clock.now(),
        });

        Ok(articles)
    }

    /// Size of the current snapshot without triggering a refresh;
    /// `None` until the first successful refresh
    pub async fn snapshot_len(&self) -> Option<usize> {
        self.entry.read().await.as_ref().map(|entry| entry.articles.len())
    }

    /// Drop the snapshot so the next read refetches
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

/// Concatenate batches, dedupe by canonical URL and id, newest first
///
/// Articles without a URL are dropped. The sort is stable and undated
/// articles go last.
pub fn aggregate(batches: Vec<Vec<Article>>) -> Vec<Article> {
    let mut seen_urls = HashSet::new();
    let mut seen_ids = HashSet::new();

    let mut articles: Vec<Article> = batches
        .into_iter()
        .flatten()
        .filter(|article| {
            let Some(url) = article.canonical_url() else {
                return false;
            };
            seen_urls.insert(url) && seen_ids.insert(article.id.clone())
        })
        .collect();

    articles.sort_by(newest_first);
    articles
}

fn newest_first(a: &Article, b: &Article) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use swipefeed_core::{Category, Enrichment, Region};
    use swipefeed_news::NewsError;

    fn article(id: &str, url: Option<&str>, hour: Option<u32>) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {}", id),
            url: url.map(String::from),
            source: "Wire".to_string(),
            description: String::new(),
            image_url: None,
            published_at: hour.map(|h| Utc.with_ymd_and_hms(2025, 6, 10, h, 0, 0).unwrap()),
            category: Category::Other,
            region: Region::Global,
            enrichment: Enrichment::default(),
        }
    }

    struct StubSource {
        name: String,
        articles: std::sync::Mutex<Vec<Article>>,
        fail: std::sync::atomic::AtomicBool,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(name: &str, articles: Vec<Article>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                articles: std::sync::Mutex::new(articles),
                fail: std::sync::atomic::AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            let source = Self::new(name, Vec::new());
            source.set_failing(true);
            source
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, AtomicOrdering::SeqCst);
        }

        fn set_articles(&self, articles: Vec<Article>) {
            *self.articles.lock().unwrap() = articles;
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl ArticleSource for StubSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail.load(AtomicOrdering::SeqCst) {
                return Err(NewsError::Network("connection refused".to_string()));
            }
            Ok(self.articles.lock().unwrap().clone())
        }
    }

    const TTL: Duration = Duration::from_secs(300);

    fn cache(stubs: Vec<Arc<StubSource>>, clock: Arc<ManualClock>) -> ArticleCache {
        let sources = stubs
            .into_iter()
            .map(|s| s as Arc<dyn ArticleSource>)
            .collect();
        ArticleCache::new(sources, TTL, clock)
    }

    #[tokio::test]
    async fn test_dedup_across_feeds() {
        let feed_a = StubSource::new(
            "a",
            vec![
                article("a1", Some("http://x/1"), Some(9)),
                article("a2", Some("http://x/1#utm_source=rss"), Some(8)),
                article("a3", Some("http://x/1#comments"), Some(7)),
            ],
        );
        let feed_b = StubSource::new(
            "b",
            vec![
                article("b1", Some("http://y/1"), Some(10)),
                article("b2", Some("http://y/2"), Some(6)),
            ],
        );

        let cache = cache(vec![feed_a, feed_b], Arc::new(ManualClock::new()));
        let articles = cache.get_articles().await.unwrap();

        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "a1", "b2"]);
    }

    #[test]
    fn test_aggregate_drops_missing_urls_and_repeated_ids() {
        let articles = aggregate(vec![
            vec![
                article("a1", None, Some(1)),
                article("a2", Some("http://x/2"), Some(2)),
            ],
            vec![article("a2", Some("http://x/other"), Some(3))],
        ]);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url.as_deref(), Some("http://x/2"));
    }

    #[test]
    fn test_recency_order_with_undated_last() {
        let articles = aggregate(vec![vec![
            article("undated-1", Some("http://x/u1"), None),
            article("old", Some("http://x/old"), Some(1)),
            article("undated-2", Some("http://x/u2"), None),
            article("new", Some("http://x/new"), Some(12)),
        ]]);

        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated-1", "undated-2"]);

        let dated: Vec<_> = articles.iter().filter_map(|a| a.published_at).collect();
        assert!(dated.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_ttl_serves_same_snapshot() {
        let clock = Arc::new(ManualClock::new());
        let feed_a = StubSource::new("a", vec![article("a1", Some("http://x/1"), Some(1))]);
        let feed_b = StubSource::new("b", vec![article("b1", Some("http://x/2"), Some(2))]);
        let cache = cache(vec![feed_a.clone(), feed_b.clone()], clock.clone());

        let first = cache.get_articles().await.unwrap();
        clock.advance(Duration::from_secs(299));
        let second = cache.get_articles().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(feed_a.calls(), 1);
        assert_eq!(feed_b.calls(), 1);

        clock.advance(Duration::from_secs(2));
        let third = cache.get_articles().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(feed_a.calls(), 2);
        assert_eq!(feed_b.calls(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_is_tolerated() {
        let good = StubSource::new("good", vec![article("g1", Some("http://x/1"), Some(1))]);
        let bad = StubSource::failing("bad");
        let cache = cache(vec![bad, good], Arc::new(ManualClock::new()));

        let articles = cache.get_articles().await.unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing() {
        let cache = cache(
            vec![StubSource::failing("a"), StubSource::failing("b")],
            Arc::new(ManualClock::new()),
        );
        assert!(matches!(
            cache.get_articles().await,
            Err(ServiceError::NoAccessibleSource)
        ));
    }

    #[tokio::test]
    async fn test_stale_snapshot_served_when_everything_fails() {
        let clock = Arc::new(ManualClock::new());
        let feed = StubSource::new("a", vec![article("a1", Some("http://x/1"), Some(1))]);
        let cache = cache(vec![feed.clone()], clock.clone());

        let fresh = cache.get_articles().await.unwrap();
        feed.set_failing(true);
        clock.advance(TTL + Duration::from_secs(1));

        let stale = cache.get_articles().await.unwrap();
        assert!(Arc::ptr_eq(&fresh, &stale));

        // Still expired, so the next read tries again
        let _ = cache.get_articles().await.unwrap();
        assert_eq!(feed.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_refetched() {
        let clock = Arc::new(ManualClock::new());
        let feed = StubSource::new("a", Vec::new());
        let cache = cache(vec![feed.clone()], clock.clone());

        assert!(cache.get_articles().await.unwrap().is_empty());
        assert_eq!(cache.snapshot_len().await, Some(0));

        feed.set_articles(vec![article("a1", Some("http://x/1"), Some(1))]);
        clock.advance(Duration::from_secs(1));

        let articles = cache.get_articles().await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(feed.calls(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_len_does_not_fetch() {
        let clock = Arc::new(ManualClock::new());
        let feed = StubSource::new("a", vec![article("a1", Some("http://x/1"), Some(1))]);
        let cache = cache(vec![feed.clone()], clock.clone());

        assert_eq!(cache.snapshot_len().await, None);
        cache.get_articles().await.unwrap();

        clock.advance(TTL + Duration::from_secs(1));
        assert_eq!(cache.snapshot_len().await, Some(1));
        assert_eq!(feed.calls(), 1);
    }

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Wire</title>
<item><title>Early</title><link>https://wire.example/early</link><guid>early</guid>
<pubDate>Tue, 10 Jun 2025 08:00:00 GMT</pubDate></item>
<item><title>Late</title><link>https://wire.example/late</link><guid>late</guid>
<pubDate>Tue, 10 Jun 2025 11:00:00 GMT</pubDate></item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_refresh_real_feeds_from_spawned_task() {
        use swipefeed_core::FeedConfig;
        use swipefeed_news::{ClassificationRules, HttpFetcher, Normalizer, NormalizerConfig, RssFeedSource};

        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/wire.xml")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(RSS)
            .create_async()
            .await;
        let _down = server
            .mock("GET", "/down.xml")
            .with_status(500)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let normalizer = Arc::new(Normalizer::new(
            fetcher.clone(),
            Arc::new(ClassificationRules::builtin().unwrap()),
            NormalizerConfig {
                page_image_fallback: false,
                ..NormalizerConfig::default()
            },
        ));
        let sources: Vec<Arc<dyn ArticleSource>> = ["wire", "down"]
            .into_iter()
            .map(|name| {
                Arc::new(RssFeedSource::new(
                    FeedConfig {
                        name: name.to_string(),
                        url: format!("{}/{}.xml", server.url(), name),
                    },
                    fetcher.clone(),
                    Arc::clone(&normalizer),
                    Duration::from_secs(5),
                    1024 * 1024,
                )) as Arc<dyn ArticleSource>
            })
            .collect();
        let cache = Arc::new(ArticleCache::new(sources, TTL, Arc::new(ManualClock::new())));

        let task = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.refresh().await })
        };
        let articles = task.await.unwrap().unwrap();

        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early"]);
        assert_eq!(articles[0].source, "Wire");
    }
}
