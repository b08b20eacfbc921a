//! Page fetching
//!
//! This module obtains the listing page for a site:
//! - Static mode: one HTTP GET with a browser-like client
//! - Rendered mode: a headless browser render (see the `browser` module)
//! - Error classification into network failure, timeout or missing dependency
//!
//! Fetchers never retry; the run controller decides whether to.

use crate::config::{FetchMode, HttpConfig, SiteConfig};
use crate::pipeline::browser::BrowserFetcher;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Errors that end a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Timed out after {waited:?} fetching {url}")]
    Timeout { url: String, waited: Duration },

    #[error("Missing dependency: {0}")]
    DependencyMissing(String),
}

/// Raw HTML of a fetched page
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    /// Final URL after redirects
    pub url: Url,
    pub body: String,
}

/// Source of listing pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `target` and returns its HTML
    async fn fetch(&self, target: &Url) -> Result<HtmlDocument, FetchError>;

    /// Short name for logs
    fn mode(&self) -> &'static str;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```
/// use cyber_news_scraper::config::HttpConfig;
/// use cyber_news_scraper::pipeline::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches server-rendered pages with a single GET
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn classify(&self, target: &Url, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: target.to_string(),
                waited: self.timeout,
            }
        } else if error.is_connect() {
            FetchError::Network {
                url: target.to_string(),
                message: format!("connection failed: {}", error),
            }
        } else {
            FetchError::Network {
                url: target.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, target: &Url) -> Result<HtmlDocument, FetchError> {
        debug!(url = %target, "GET");

        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| self.classify(target, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network {
                url: target.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(target, e))?;

        info!(url = %final_url, status = status.as_u16(), bytes = body.len(), "Page fetched");

        Ok(HtmlDocument {
            url: final_url,
            body,
        })
    }

    fn mode(&self) -> &'static str {
        "static"
    }
}

/// Builds the fetcher a site's fetch mode calls for
pub fn fetcher_for(
    site: &SiteConfig,
    http: &HttpConfig,
) -> Result<Box<dyn PageFetcher>, FetchError> {
    match &site.fetch {
        FetchMode::Static => {
            let fetcher = HttpFetcher::new(http).map_err(|e| FetchError::Network {
                url: site.url.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
            Ok(Box::new(fetcher))
        }
        FetchMode::Rendered(options) => Ok(Box::new(BrowserFetcher::new(options.clone()))),
    }
}
