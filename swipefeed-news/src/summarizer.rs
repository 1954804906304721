//! Client for the optional external summarization service

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use swipefeed_core::{Article, Enrichment, SummarizerConfig};
use tracing::instrument;

use crate::error::NewsError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeRequest<'a> {
    title: &'a str,
    text: &'a str,
    max_words: u32,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    bullets: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Summarization client
#[derive(Debug, Clone)]
pub struct SummarizerClient {
    client: Client,
    endpoint: String,
    max_words: u32,
    timeout: Duration,
}

impl SummarizerClient {
    pub fn new(endpoint: String, max_words: u32, timeout: Duration) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NewsError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            max_words,
            timeout,
        })
    }

    /// Build from config; None when disabled or missing an endpoint
    pub fn from_config(config: &SummarizerConfig, timeout: Duration) -> Result<Option<Self>, NewsError> {
        match (&config.endpoint, config.enabled) {
            (Some(endpoint), true) => Self::new(endpoint.clone(), config.max_words, timeout).map(Some),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, article), fields(article_id = %article.id))]
    pub async fn summarize(&self, article: &Article) -> Result<Enrichment, NewsError> {
        let request = SummarizeRequest {
            title: &article.title,
            text: &article.description,
            max_words: self.max_words,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NewsError::Timeout(self.timeout)
                } else {
                    NewsError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::HttpStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body: SummarizeResponse = response
            .json()
            .await
            .map_err(|e| NewsError::Parse(format!("summarizer response: {}", e)))?;

        Ok(Enrichment {
            summary: body.summary.filter(|s| !s.trim().is_empty()),
            bullets: body.bullets,
            sentiment: body.sentiment,
            confidence: body.confidence,
            keywords: body.keywords,
        })
    }
}
