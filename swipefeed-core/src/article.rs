//! Canonical article model produced by feed normalization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::labels::{Category, Region};
use crate::preferences::ArticleMetadata;

/// Placeholder title for entries that carry none
pub const UNTITLED: &str = "(untitled)";

/// A normalized news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Stable identifier (feed GUID, else link, else `feedUrl#title`)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Publisher name
    pub source: String,
    /// Plain-text summary of the entry content
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub region: Region,
    /// Fields merged in from the external summarizer, if any
    #[serde(flatten, default)]
    pub enrichment: Enrichment,
}

/// Optional enrichment produced outside the core pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.bullets.is_empty()
            && self.sentiment.is_none()
            && self.confidence.is_none()
            && self.keywords.is_empty()
    }
}

impl Article {
    /// Canonical (fragment-stripped) form of the article URL
    pub fn canonical_url(&self) -> Option<String> {
        self.url.as_deref().and_then(canonicalize_url)
    }

    /// Metadata recorded alongside an interaction with this article
    pub fn metadata(&self) -> ArticleMetadata {
        ArticleMetadata {
            category: Some(self.category.label().to_string()),
            source: Some(self.source.clone()),
            region: Some(self.region.label().to_string()),
        }
    }

    /// Text searched by free-text queries (lower-cased)
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.category.label(),
            self.region.label()
        )
        .to_lowercase()
    }
}

/// Strip the fragment from a URL. Unparseable input falls back to cutting at `#`.
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            Some(url.to_string())
        }
        Err(_) => {
            let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
            if without_fragment.is_empty() {
                None
            } else {
                Some(without_fragment.to_string())
            }
        }
    }
}
