//! Per-user preference state and interaction records

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::article::Article;

/// Maximum number of interactions kept in a user's activity log
pub const MAX_ACTIVITIES: usize = 1000;

/// Personalization mix used until the user picks one
pub const DEFAULT_CUSTOMIZATION_LEVEL: u8 = 50;

/// Kind of interaction a user had with an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Viewed,
    Liked,
    Disliked,
    Shared,
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActivityAction::Viewed => "viewed",
            ActivityAction::Liked => "liked",
            ActivityAction::Disliked => "disliked",
            ActivityAction::Shared => "shared",
        };
        write!(f, "{}", name)
    }
}

/// Article labels reported alongside an interaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// One entry of the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub article_id: String,
    pub action: ActivityAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// An interaction reported by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub user_id: String,
    pub article_id: String,
    pub action: ActivityAction,
    /// Time of the interaction; receipt time when the client omits it
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "articleMetadata")]
    pub metadata: Option<ArticleMetadata>,
}

impl ActivityEvent {
    /// Log entry for this event
    pub fn to_record(&self) -> ActivityRecord {
        let metadata = self.metadata.clone().unwrap_or_default();
        ActivityRecord {
            article_id: self.article_id.clone(),
            action: self.action,
            timestamp: self.timestamp,
            category: metadata.category,
            source: metadata.source,
            region: metadata.region,
        }
    }
}

/// Learned preferences of a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferenceState {
    /// 0 = pure recency feed, 100 = fully personalized
    pub customization_level: u8,
    #[serde(default)]
    pub preferred_sources: BTreeMap<String, u32>,
    #[serde(default)]
    pub preferred_categories: BTreeMap<String, u32>,
    /// Region weights
    #[serde(default)]
    pub preferred_labels: BTreeMap<String, u32>,
    #[serde(default)]
    pub activities: VecDeque<ActivityRecord>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserPreferenceState {
    fn default() -> Self {
        Self {
            customization_level: DEFAULT_CUSTOMIZATION_LEVEL,
            preferred_sources: BTreeMap::new(),
            preferred_categories: BTreeMap::new(),
            preferred_labels: BTreeMap::new(),
            activities: VecDeque::new(),
            updated_at: None,
        }
    }
}

impl UserPreferenceState {
    /// Append to the activity log, evicting the oldest entries past the cap
    pub fn push_activity(&mut self, record: ActivityRecord) {
        self.activities.push_back(record);
        while self.activities.len() > MAX_ACTIVITIES {
            self.activities.pop_front();
        }
    }

    /// Bump the counters for every label present in `metadata`
    pub fn reinforce(&mut self, metadata: &ArticleMetadata) {
        if let Some(region) = non_blank(metadata.region.as_deref()) {
            *self.preferred_labels.entry(region.to_string()).or_insert(0) += 1;
        }
        if let Some(source) = non_blank(metadata.source.as_deref()) {
            *self.preferred_sources.entry(source.to_string()).or_insert(0) += 1;
        }
        if let Some(category) = non_blank(metadata.category.as_deref()) {
            *self
                .preferred_categories
                .entry(category.to_string())
                .or_insert(0) += 1;
        }
    }

    /// Whether any counter carries a positive weight
    pub fn has_preferences(&self) -> bool {
        [
            &self.preferred_sources,
            &self.preferred_categories,
            &self.preferred_labels,
        ]
        .iter()
        .any(|map| map.values().any(|w| *w > 0))
    }

    /// Whether the article's source, category or region is a preferred one
    pub fn matches(&self, article: &Article) -> bool {
        positive(&self.preferred_sources, &article.source)
            || positive(&self.preferred_categories, article.category.label())
            || positive(&self.preferred_labels, article.region.label())
    }
}

fn positive(weights: &BTreeMap<String, u32>, key: &str) -> bool {
    weights.get(key).is_some_and(|w| *w > 0)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
