//! HTTP(S) fetcher shared by feed, page and secondary-source requests
//!
//! Redirects are followed manually so the hop count can be enforced and
//! relative `Location` headers resolved against the current URL. Every fetch
//! runs under a caller-supplied timeout and a response byte budget.

use std::time::Duration;

use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::error::NewsError;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 3;

/// Browser-like user agent; several publishers reject unknown clients
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const ACCEPT_FEEDS_AND_PAGES: &str = "application/rss+xml, application/atom+xml, \
application/xml;q=0.9, text/xml;q=0.9, text/html;q=0.8, application/json;q=0.8, */*;q=0.5";

/// A completed response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// URL after following redirects
    pub final_url: Url,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with `HttpStatus` unless the status is 2xx
    pub fn error_for_status(self) -> Result<Self, NewsError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(NewsError::HttpStatus {
                status: self.status,
                url: self.final_url.to_string(),
            })
        }
    }
}

/// Fetcher with manual redirect handling
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, NewsError> {
        Self::with_max_redirects(MAX_REDIRECTS)
    }

    pub fn with_max_redirects(max_redirects: usize) -> Result<Self, NewsError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| NewsError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_redirects,
        })
    }

    /// Fetch `url`, following up to `max_redirects` hops
    ///
    /// The timeout covers the whole exchange, redirects and body included.
    /// Dropping the in-flight future on expiry closes the connection.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<FetchResponse, NewsError> {
        let start = Url::parse(url).map_err(|e| NewsError::InvalidUrl(format!("{}: {}", url, e)))?;

        match tokio::time::timeout(timeout, self.fetch_following(start, max_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(NewsError::Timeout(timeout)),
        }
    }

    async fn fetch_following(&self, start: Url, max_bytes: usize) -> Result<FetchResponse, NewsError> {
        let mut current = start.clone();
        let mut hops = 0;

        loop {
            match current.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(NewsError::InvalidUrl(format!(
                        "unsupported scheme {} in {}",
                        other, current
                    )))
                }
            }

            let response = self
                .client
                .get(current.clone())
                .header(ACCEPT, ACCEPT_FEEDS_AND_PAGES)
                .send()
                .await
                .map_err(|e| NewsError::Network(e.to_string()))?;

            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if let (true, Some(location)) = (status.is_redirection(), location) {
                if hops >= self.max_redirects {
                    return Err(NewsError::TooManyRedirects {
                        url: start.to_string(),
                        limit: self.max_redirects,
                    });
                }
                let next = current.join(&location).map_err(|e| {
                    NewsError::InvalidUrl(format!("bad redirect target {}: {}", location, e))
                })?;
                debug!(from = %current, to = %next, hop = hops + 1, "Following redirect");
                current = next;
                hops += 1;
                continue;
            }

            let body = read_limited(response, max_bytes).await?;
            return Ok(FetchResponse {
                status: status.as_u16(),
                final_url: current,
                body,
            });
        }
    }
}

/// Read the body in chunks, failing as soon as it grows past `max_bytes`
async fn read_limited(mut response: Response, max_bytes: usize) -> Result<Vec<u8>, NewsError> {
    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(NewsError::BodyTooLarge { limit: max_bytes });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| NewsError::Network(e.to_string()))?
    {
        if body.len() + chunk.len() > max_bytes {
            return Err(NewsError::BodyTooLarge { limit: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
