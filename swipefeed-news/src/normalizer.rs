//! Raw feed entry -> canonical `Article`

use std::sync::Arc;
use std::time::Duration;

use swipefeed_core::article::UNTITLED;
use swipefeed_core::{Article, Enrichment};
use tracing::debug;

use crate::fetcher::HttpFetcher;
use crate::html::{extract_meta_image, first_image_in_html, host_label, resolve_url, strip_html};
use crate::parser::RawEntry;
use crate::rules::{CategoryInput, ClassificationRules};

/// Settings for the page-image fallback
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub page_image_fallback: bool,
    pub page_timeout: Duration,
    pub max_page_bytes: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            page_image_fallback: true,
            page_timeout: Duration::from_millis(3_500),
            max_page_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Converts parsed entries into articles
#[derive(Debug, Clone)]
pub struct Normalizer {
    fetcher: HttpFetcher,
    rules: Arc<ClassificationRules>,
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(fetcher: HttpFetcher, rules: Arc<ClassificationRules>, config: NormalizerConfig) -> Self {
        Self {
            fetcher,
            rules,
            config,
        }
    }

    /// Normalize an entry, fetching the article page for an image when the
    /// feed itself carries none
    pub async fn normalize(&self, entry: &RawEntry, feed_title: Option<&str>, feed_url: &str) -> Article {
        let mut article = self.build_article(entry, feed_title, feed_url);

        if article.image_url.is_none() && self.config.page_image_fallback {
            if let Some(page_url) = article.url.clone() {
                article.image_url = self.fetch_page_image(&page_url).await;
            }
        }

        article
    }

    /// Everything except the network fallback
    pub fn build_article(&self, entry: &RawEntry, feed_title: Option<&str>, feed_url: &str) -> Article {
        let title = entry
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        let link = entry
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        let id = entry
            .guid
            .clone()
            .or_else(|| link.clone())
            .unwrap_or_else(|| format!("{}#{}", feed_url, title));

        let feed_title = feed_title.map(str::trim).filter(|t| !t.is_empty());
        let source = feed_title
            .map(str::to_string)
            .or_else(|| link.as_deref().and_then(host_label))
            .or_else(|| host_label(feed_url))
            .unwrap_or_else(|| "Unknown".to_string());

        let description = describe(entry);

        let category = self.rules.classify_category(&CategoryInput {
            entry_categories: &entry.categories,
            title: &title,
            snippet: entry
                .snippet
                .as_deref()
                .or(entry.summary.as_deref())
                .unwrap_or_default(),
            feed_title: feed_title.unwrap_or_default(),
            link: link.as_deref().unwrap_or_default(),
            feed_url,
        });
        let region = self.rules.classify_region(&title, &description);

        Article {
            id,
            image_url: entry_image(entry, feed_url),
            title,
            url: link,
            source,
            description,
            published_at: entry.published,
            category,
            region,
            enrichment: Enrichment::default(),
        }
    }

    /// `og:image`/`twitter:image` of the article page; any failure yields None
    async fn fetch_page_image(&self, page_url: &str) -> Option<String> {
        let response = match self
            .fetcher
            .fetch(page_url, self.config.page_timeout, self.config.max_page_bytes)
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %page_url, error = %e, "Page image lookup failed");
                return None;
            }
        };

        let candidate = extract_meta_image(&response.text())?;
        resolve_url(&candidate, Some(response.final_url.as_str()))
    }
}

/// Plain text from the richest field: snippet, summary, encoded content, raw content
fn describe(entry: &RawEntry) -> String {
    [
        &entry.snippet,
        &entry.summary,
        &entry.content_encoded,
        &entry.content,
    ]
    .into_iter()
    .filter_map(|field| field.as_deref())
    .map(strip_html)
    .find(|text| !text.is_empty())
    .unwrap_or_default()
}

/// Image from the feed entry itself, first hit wins:
/// enclosure, media:content, widest media:thumbnail, first `<img>` in the body
fn entry_image(entry: &RawEntry, feed_url: &str) -> Option<String> {
    let base = Some(feed_url);

    let widest_thumbnail = entry
        .media_thumbnails
        .iter()
        .enumerate()
        // Ties keep document order
        .max_by_key(|(index, thumb)| (thumb.width.unwrap_or(0), std::cmp::Reverse(*index)))
        .map(|(_, thumb)| thumb.url.as_str());

    let candidates = [
        entry.enclosure_url.as_deref(),
        entry.media_content.as_deref(),
        widest_thumbnail,
    ];
    if let Some(url) = candidates
        .into_iter()
        .flatten()
        .find_map(|c| resolve_url(c, base))
    {
        return Some(url);
    }

    [entry.content_encoded.as_deref(), entry.content.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(first_image_in_html)
        .find_map(|c| resolve_url(&c, base))
}
