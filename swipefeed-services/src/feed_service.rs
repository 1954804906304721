//! Feed service
//!
//! The facade the HTTP layer talks to: serves article pages (plain or
//! personalized), search, and preference updates. Optional summarizer
//! enrichment is applied to the served page only and never blocks it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use swipefeed_core::{ActivityEvent, Article, Enrichment, UserPreferenceState};
use swipefeed_news::SummarizerClient;
use tracing::{debug, instrument, warn};

use crate::article_cache::ArticleCache;
use crate::error::ServiceError;
use crate::personalization::{recent_articles, search_articles, select_articles};
use crate::preference_learner::PreferenceLearner;

/// Parameters of an article page request
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub limit: usize,
    pub seen_ids: HashSet<String>,
    /// Personalize for this user when present
    pub user_id: Option<String>,
}

/// Optional enrichment step
struct Enricher {
    client: SummarizerClient,
    max_per_request: usize,
    /// Summaries by article id; articles are immutable once cached
    cache: DashMap<String, Enrichment>,
    /// Snapshot the cache was last pruned against
    pruned_for: Mutex<Weak<Vec<Article>>>,
}

impl Enricher {
    /// Keep only summaries of articles still in `pool`, once per snapshot
    fn prune(&self, pool: &Arc<Vec<Article>>) {
        let Ok(mut pruned_for) = self.pruned_for.lock() else {
            return;
        };
        if Weak::ptr_eq(&pruned_for, &Arc::downgrade(pool)) {
            return;
        }

        let live: HashSet<&str> = pool.iter().map(|a| a.id.as_str()).collect();
        let before = self.cache.len();
        self.cache.retain(|id, _| live.contains(id.as_str()));
        *pruned_for = Arc::downgrade(pool);
        debug!(before, after = self.cache.len(), "Pruned summary cache");
    }
}

pub struct FeedService {
    cache: Arc<ArticleCache>,
    learner: Arc<PreferenceLearner>,
    enricher: Option<Enricher>,
}

impl FeedService {
    pub fn new(cache: Arc<ArticleCache>, learner: Arc<PreferenceLearner>) -> Self {
        Self {
            cache,
            learner,
            enricher: None,
        }
    }

    /// Enrich up to `max_per_request` articles of every served page
    pub fn with_summarizer(mut self, client: SummarizerClient, max_per_request: usize) -> Self {
        self.enricher = Some(Enricher {
            client,
            max_per_request,
            cache: DashMap::new(),
            pruned_for: Mutex::new(Weak::new()),
        });
        self
    }

    /// One page of articles, personalized when a user id is given
    #[instrument(skip(self, query), fields(limit = query.limit, seen = query.seen_ids.len(), user_id = ?query.user_id))]
    pub async fn get_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, ServiceError> {
        let pool = self.cache.get_articles().await?;

        let page = match query.user_id.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(user_id) => {
                let preferences = self.learner.load_preferences(user_id).await;
                select_articles(
                    &pool,
                    &preferences,
                    preferences.customization_level,
                    &query.seen_ids,
                    query.limit,
                )
            }
            None => recent_articles(&pool, &query.seen_ids, query.limit),
        };

        debug!(served = page.len(), pool = pool.len(), "Selected articles");
        Ok(self.enrich(&pool, page).await)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>, ServiceError> {
        let pool = self.cache.get_articles().await?;
        let results = search_articles(&pool, query, limit);
        Ok(self.enrich(&pool, results).await)
    }

    pub async fn record_activity(&self, event: ActivityEvent) -> Result<(), ServiceError> {
        self.learner.record_activity(event).await.map(|_| ())
    }

    pub async fn set_customization_level(
        &self,
        user_id: &str,
        level: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.learner
            .set_customization_level(user_id, level, updated_at)
            .await
            .map(|_| ())
    }

    pub async fn preferences(&self, user_id: &str) -> UserPreferenceState {
        self.learner.load_preferences(user_id).await
    }

    /// Merge summaries into the first articles of `page`; failures leave the
    /// article as it was
    async fn enrich(&self, pool: &Arc<Vec<Article>>, mut page: Vec<Article>) -> Vec<Article> {
        let Some(enricher) = &self.enricher else {
            return page;
        };
        enricher.prune(pool);

        let count = page.len().min(enricher.max_per_request);
        let lookups = page[..count].iter().map(|article| async move {
            if let Some(hit) = enricher.cache.get(&article.id) {
                return Some(hit.value().clone());
            }
            match enricher.client.summarize(article).await {
                Ok(enrichment) => {
                    enricher
                        .cache
                        .insert(article.id.clone(), enrichment.clone());
                    Some(enrichment)
                }
                Err(e) => {
                    warn!(article_id = %article.id, error = %e, "Summarizer failed, serving unenriched");
                    None
                }
            }
        });
        let results = join_all(lookups).await;

        for (article, enrichment) in page.iter_mut().zip(results) {
            if let Some(enrichment) = enrichment.filter(|e| !e.is_empty()) {
                article.enrichment = enrichment;
            }
        }
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::preference_store::MemoryPreferenceStore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;
    use swipefeed_core::{ActivityAction, ArticleMetadata, Category, Region};
    use swipefeed_news::{ArticleSource, NewsError};

    struct FixedSource(Vec<Article>);

    #[async_trait]
    impl ArticleSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl ArticleSource for DownSource {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
            Err(NewsError::Timeout(Duration::from_secs(10)))
        }
    }

    fn fixed(articles: Vec<Article>) -> Arc<dyn ArticleSource> {
        Arc::new(FixedSource(articles))
    }

    fn article(id: &str, source: &str, hour: u32) -> Article {
        Article {
            id: id.to_string(),
            title: format!("{} story {}", source, id),
            url: Some(format!("https://example.com/{}", id)),
            source: source.to_string(),
            description: "Body".to_string(),
            image_url: None,
            published_at: Some(Utc.with_ymd_and_hms(2025, 6, 10, hour, 0, 0).unwrap()),
            category: Category::World,
            region: Region::Europe,
            enrichment: Enrichment::default(),
        }
    }

    fn service(sources: Vec<Arc<dyn ArticleSource>>) -> FeedService {
        let cache = ArticleCache::new(sources, Duration::from_secs(300), Arc::new(ManualClock::new()));
        let learner = PreferenceLearner::new(Arc::new(MemoryPreferenceStore::new()));
        FeedService::new(Arc::new(cache), Arc::new(learner))
    }

    fn pool() -> Vec<Article> {
        vec![
            article("bbc-1", "BBC", 1),
            article("cnn-1", "CNN", 4),
            article("npr-1", "NPR", 3),
            article("dw-1", "DW", 2),
        ]
    }

    #[tokio::test]
    async fn test_anonymous_page_is_recency_order() {
        let service = service(vec![fixed(pool())]);
        let page = service
            .get_articles(&ArticleQuery {
                limit: 3,
                seen_ids: ["cnn-1".to_string()].into(),
                user_id: None,
            })
            .await
            .unwrap();

        let ids: Vec<&str> = page.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["npr-1", "dw-1", "bbc-1"]);
    }

    #[tokio::test]
    async fn test_personalized_page_after_likes() {
        let service = service(vec![fixed(pool())]);
        let at = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();

        service
            .record_activity(ActivityEvent {
                user_id: "u1".to_string(),
                article_id: "bbc-0".to_string(),
                action: ActivityAction::Liked,
                timestamp: at,
                metadata: Some(ArticleMetadata {
                    source: Some("BBC".to_string()),
                    ..ArticleMetadata::default()
                }),
            })
            .await
            .unwrap();
        service.set_customization_level("u1", 100, at).await.unwrap();

        let page = service
            .get_articles(&ArticleQuery {
                limit: 2,
                seen_ids: HashSet::new(),
                user_id: Some("u1".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "bbc-1");
        assert_eq!(service.preferences("u1").await.customization_level, 100);
    }

    #[tokio::test]
    async fn test_no_accessible_source() {
        let service = service(vec![Arc::new(DownSource) as Arc<dyn ArticleSource>]);
        let result = service.get_articles(&ArticleQuery::default()).await;
        assert!(matches!(result, Err(ServiceError::NoAccessibleSource)));
    }

    #[tokio::test]
    async fn test_search_uses_cached_pool() {
        let service = service(vec![fixed(pool())]);
        let results = service.search("npr story", 10).await.unwrap();
        assert_eq!(results[0].id, "npr-1");
        assert!(service.search("volcano", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarizer_failure_serves_plain_articles() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/summarize")
            .with_status(502)
            .create_async()
            .await;

        let client = SummarizerClient::new(
            format!("{}/summarize", server.url()),
            60,
            Duration::from_secs(2),
        )
        .unwrap();
        let service = service(vec![fixed(pool())]).with_summarizer(client, 2);

        let page = service
            .get_articles(&ArticleQuery {
                limit: 4,
                ..ArticleQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 4);
        assert!(page.iter().all(|a| a.enrichment.is_empty()));
    }

    #[tokio::test]
    async fn test_summarizer_enriches_leading_articles() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary": "Short.", "bullets": [], "keywords": ["k"], "sentiment": "neutral", "confidence": 0.5}"#)
            .expect(2)
            .create_async()
            .await;

        let client = SummarizerClient::new(
            format!("{}/summarize", server.url()),
            60,
            Duration::from_secs(2),
        )
        .unwrap();
        let service = service(vec![fixed(pool())]).with_summarizer(client, 2);
        let query = ArticleQuery {
            limit: 3,
            ..ArticleQuery::default()
        };

        let page = service.get_articles(&query).await.unwrap();
        assert_eq!(page[0].enrichment.summary.as_deref(), Some("Short."));
        assert_eq!(page[1].enrichment.summary.as_deref(), Some("Short."));
        assert!(page[2].enrichment.is_empty());

        // Second request is served from the summary cache
        service.get_articles(&query).await.unwrap();
        mock.assert_async().await;
    }

    struct RotatingSource {
        batches: std::sync::Mutex<std::collections::VecDeque<Vec<Article>>>,
    }

    #[async_trait]
    impl ArticleSource for RotatingSource {
        fn name(&self) -> &str {
            "rotating"
        }

        async fn fetch_articles(&self) -> Result<Vec<Article>, NewsError> {
            let mut batches = self.batches.lock().unwrap();
            let batch = batches.front().cloned().unwrap_or_default();
            if batches.len() > 1 {
                batches.pop_front();
            }
            Ok(batch)
        }
    }

    #[tokio::test]
    async fn test_summary_cache_follows_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/summarize")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary": "Short."}"#)
            .expect(6)
            .create_async()
            .await;

        let source: Arc<dyn ArticleSource> = Arc::new(RotatingSource {
            batches: std::sync::Mutex::new(
                vec![
                    vec![article("a1", "AP", 1), article("a2", "AP", 2), article("a3", "AP", 3)],
                    vec![article("b1", "DW", 4), article("b2", "DW", 5), article("b3", "DW", 6)],
                ]
                .into(),
            ),
        });
        let clock = Arc::new(ManualClock::new());
        let cache = ArticleCache::new(vec![source], Duration::from_secs(300), clock.clone());
        let learner = PreferenceLearner::new(Arc::new(MemoryPreferenceStore::new()));
        let client = SummarizerClient::new(
            format!("{}/summarize", server.url()),
            60,
            Duration::from_secs(2),
        )
        .unwrap();
        let service = FeedService::new(Arc::new(cache), Arc::new(learner)).with_summarizer(client, 3);
        let query = ArticleQuery {
            limit: 3,
            ..ArticleQuery::default()
        };
        let summaries = |service: &FeedService| service.enricher.as_ref().unwrap().cache.len();

        service.get_articles(&query).await.unwrap();
        assert_eq!(summaries(&service), 3);

        clock.advance(Duration::from_secs(301));
        let page = service.get_articles(&query).await.unwrap();
        assert_eq!(page[0].id, "b3");
        assert_eq!(summaries(&service), 3);
        assert!(service
            .enricher
            .as_ref()
            .unwrap()
            .cache
            .iter()
            .all(|entry| entry.key().starts_with('b')));

        mock.assert_async().await;
    }
}
