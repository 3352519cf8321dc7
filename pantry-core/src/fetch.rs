//! Page fetching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::charset::decode_bytes_to_utf8;
use crate::error::FetchError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36 Pantry/0.1";

/// Source of page HTML. A blank body counts as a failure.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain reqwest-backed fetcher with charset detection.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        tracing::debug!(url, "network: fetching page");
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, %status, "network: request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await?;
        let html = decode_bytes_to_utf8(&bytes, content_type.as_deref());

        if html.trim().is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }

        tracing::debug!(url, bytes = bytes.len(), "network: fetched successfully");
        Ok(html)
    }
}

#[derive(Debug, Clone)]
enum MockPage {
    Html(String),
    Error(String),
}

/// In-memory fetcher for tests. Counts every call.
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: HashMap<String, MockPage>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(mut self, url: &str, html: &str) -> Self {
        self.pages
            .insert(url.to_string(), MockPage::Html(html.to_string()));
        self
    }

    pub fn with_error(mut self, url: &str, error: &str) -> Self {
        self.pages
            .insert(url.to_string(), MockPage::Error(error.to_string()));
        self
    }

    /// Number of `fetch_html` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(MockPage::Html(html)) if html.trim().is_empty() => {
                Err(FetchError::EmptyBody(url.to_string()))
            }
            Some(MockPage::Html(html)) => Ok(html.clone()),
            Some(MockPage::Error(e)) => Err(FetchError::Unavailable(e.clone())),
            None => Err(FetchError::Unavailable(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }
}
