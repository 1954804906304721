//! Swipefeed API Server
//!
//! Serves aggregated, optionally personalized news articles and records
//! user interactions.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use swipefeed_core::AppConfig;
use swipefeed_news::{
    ArticleSource, ClassificationRules, HttpFetcher, Normalizer, NormalizerConfig, RssFeedSource,
    RuleTables, SecondarySource, SummarizerClient,
};
use swipefeed_services::{
    ArticleCache, FeedService, MemoryPreferenceStore, PreferenceLearner, PreferenceStore,
    SqlitePreferenceStore, SystemClock,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub feed_service: Arc<FeedService>,
    pub article_cache: Arc<ArticleCache>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,swipefeed_api=debug")),
        )
        .init();

    info!("Starting swipefeed API");

    let config = AppConfig::from_env()?;
    info!(
        "Loaded config: {} feeds, cache TTL {}s, secondary source {}, summarizer {}",
        config.feeds.len(),
        config.cache_ttl_secs,
        config.secondary_source.enabled,
        config.summarizer.enabled
    );

    let rules = match &config.rules_path {
        Some(path) => {
            info!("Loading classification rules from {}", path);
            RuleTables::from_json(&std::fs::read_to_string(path)?)?.compile()?
        }
        None => ClassificationRules::builtin()?,
    };

    let fetcher = HttpFetcher::new()?;
    let normalizer = Arc::new(Normalizer::new(
        fetcher.clone(),
        Arc::new(rules),
        NormalizerConfig {
            page_image_fallback: config.page_image_fallback,
            page_timeout: config.page_timeout(),
            max_page_bytes: config.max_page_bytes,
        },
    ));

    let mut sources: Vec<Arc<dyn ArticleSource>> = config
        .feeds
        .iter()
        .map(|feed| {
            Arc::new(RssFeedSource::new(
                feed.clone(),
                fetcher.clone(),
                Arc::clone(&normalizer),
                config.feed_timeout(),
                config.max_feed_bytes,
            )) as Arc<dyn ArticleSource>
        })
        .collect();

    if config.secondary_source.enabled {
        if let Some(endpoint) = &config.secondary_source.endpoint {
            info!("Secondary source enabled: {}", endpoint);
            sources.push(Arc::new(SecondarySource::new(
                endpoint.clone(),
                fetcher.clone(),
                config.feed_timeout(),
                config.max_feed_bytes,
            )));
        }
    }

    let article_cache = Arc::new(ArticleCache::new(
        sources,
        config.cache_ttl(),
        Arc::new(SystemClock),
    ));

    let store: Arc<dyn PreferenceStore> = match &config.preferences_db_path {
        Some(path) => {
            info!("Initializing preference store at: {}", path);
            Arc::new(SqlitePreferenceStore::new(path)?)
        }
        None => {
            info!("No PREFERENCES_DB_PATH set, preferences are kept in memory");
            Arc::new(MemoryPreferenceStore::new())
        }
    };
    let learner = Arc::new(PreferenceLearner::new(store));

    let mut feed_service = FeedService::new(Arc::clone(&article_cache), learner);
    if let Some(client) = SummarizerClient::from_config(&config.summarizer, config.feed_timeout())? {
        feed_service = feed_service.with_summarizer(client, config.summarizer.max_per_request);
    }

    // Warm the cache so the first request doesn't wait on every feed
    {
        let cache = Arc::clone(&article_cache);
        tokio::spawn(async move {
            match cache.refresh().await {
                Ok(articles) => info!("Initial refresh loaded {} articles", articles.len()),
                Err(e) => warn!("Initial refresh failed: {}", e),
            }
        });
    }

    let state = AppState {
        feed_service: Arc::new(feed_service),
        article_cache,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = routes::app(state).layer(TraceLayer::new_for_http()).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
