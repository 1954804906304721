//! Swipefeed services
//!
//! Business logic layered over `swipefeed-news`:
//! - `ArticleCache`: TTL-cached aggregation of every article source
//! - `personalization`: bucket-select mixing, recency feed and search
//! - `PreferenceLearner`: activity log and preference counters
//! - `FeedService`: the facade the HTTP layer calls

pub mod article_cache;
pub mod clock;
pub mod error;
pub mod feed_service;
pub mod personalization;
pub mod preference_learner;
pub mod preference_store;

pub use article_cache::{aggregate, ArticleCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ServiceError, StoreError};
pub use feed_service::{ArticleQuery, FeedService};
pub use personalization::{personalized_count, recent_articles, search_articles, select_articles};
pub use preference_learner::PreferenceLearner;
pub use preference_store::{
    MemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore, UpdateFn,
};
