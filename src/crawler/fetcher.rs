//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the site's expected User-Agent and a fixed timeout
//! - GET requests for listing and detail pages
//! - Error classification into [`FetchCause`]
//!
//! There are no retries at this layer; a failed fetch is reported once to the caller.

use crate::config::{CrawlerConfig, SiteConfig};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// A failed page fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch of {url} failed: {cause}")]
pub struct FetchError {
    /// The URL that was requested
    pub url: String,

    /// The classified failure
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(url: &Url, cause: FetchCause) -> Self {
        Self {
            url: url.to_string(),
            cause,
        }
    }

    /// Returns true if the request hit the configured timeout
    pub fn is_timeout(&self) -> bool {
        self.cause == FetchCause::Timeout
    }
}

/// Source of page markup
///
/// The coordinator only talks to pages through this trait, so any source
/// that is safe to call concurrently can drive a crawl.
pub trait PageSource: Send + Sync + 'static {
    /// Fetches `url` and returns its body
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// [`PageSource`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the site and crawler configuration
    pub fn from_config(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(site, crawler)?))
    }
}

impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        fetch_url(&self.client, url).await
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `site` - Supplies the User-Agent header
/// * `crawler` - Supplies the request timeout
///
/// # Example
///
/// ```no_run
/// use book_harvest::config::{CrawlerConfig, SiteConfig};
/// use book_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&SiteConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(crawler.request_timeout_ms);

    Client::builder()
        .user_agent(site.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns the body of a 2xx response
///
/// # Error Classification
///
/// | Condition | Cause |
/// |-----------|-------|
/// | Timeout (connect, headers or body) | `Timeout` |
/// | Connection refused, DNS failure, TLS error | `Connect` |
/// | Non-2xx status | `Status(code)` |
/// | Body could not be read | `Body` |
/// | Anything else | `Request` |
pub async fn fetch_url(client: &Client, url: &Url) -> Result<String, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::new(url, classify(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(url, FetchCause::Status(status.as_u16())));
    }

    response.text().await.map_err(|e| {
        let cause = if e.is_timeout() {
            FetchCause::Timeout
        } else {
            FetchCause::Body(e.to_string())
        };
        FetchError::new(url, cause)
    })
}

/// Maps a transport-level `reqwest` error onto a [`FetchCause`]
fn classify(error: &reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout
    } else if error.is_connect() {
        FetchCause::Connect(error.to_string())
    } else {
        FetchCause::Request(error.to_string())
    }
}
