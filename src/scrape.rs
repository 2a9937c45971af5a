//! Concurrent JMX scraping.
//!
//! One task per URL, joined in completion order. A failing endpoint is logged
//! and contributes nothing; it never fails the whole scrape.

use crate::bean::{Bean, BeanList};
use crate::scrape_stats::ScrapeStats;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("{url} returned a body that is not JSON: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned JSON without a bean list")]
    Shape { url: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Verify TLS certificates of https targets.
    pub verify: bool,
    /// Honor `HTTP_PROXY` and friends.
    pub trust_env: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify: true,
            trust_env: true,
        }
    }
}

/// Extracts the bean list from a `/jmx` response (`{"beans": [...]}`) or a
/// query engine `/v1/jmx/mbean` response (a bare array).
pub fn parse_beans(body: Value) -> Option<BeanList> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("beans") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    Some(items.into_iter().filter_map(Bean::from_value).collect())
}

/// Fetches bean lists from a fixed set of URLs of one daemon category.
pub struct ScrapeSource {
    category: String,
    client: reqwest::Client,
    urls: Vec<String>,
    stats: Option<Arc<ScrapeStats>>,
}

impl ScrapeSource {
    pub fn new(category: impl Into<String>, urls: Vec<String>, options: &ScrapeOptions) -> Result<Self, ScrapeError> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify);
        if !options.trust_env {
            builder = builder.no_proxy();
        }
        Ok(Self {
            category: category.into(),
            client: builder.build().map_err(ScrapeError::Client)?,
            urls,
            stats: None,
        })
    }

    /// Records every outcome in `stats`.
    pub fn with_stats(mut self, stats: Arc<ScrapeStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn set_urls(&mut self, urls: Vec<String>) {
        self.urls = urls;
    }

    /// Scrapes every URL concurrently and returns the non-empty bean lists in
    /// completion order.
    #[instrument(skip(self), fields(category = %self.category, targets = self.urls.len()))]
    pub async fn scrape(&self) -> Vec<BeanList> {
        let mut tasks = JoinSet::new();
        for url in &self.urls {
            let client = self.client.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let result = fetch(&client, &url).await;
                (url, result)
            });
        }

        let mut lists = Vec::with_capacity(self.urls.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((url, Ok(beans))) => {
                    debug!("Scraped {} beans from {}", beans.len(), url);
                    self.record(true);
                    if !beans.is_empty() {
                        lists.push(beans);
                    }
                }
                Ok((_, Err(e))) => {
                    warn!("Can't scrape metrics: {}", e);
                    self.record(false);
                }
                Err(e) => {
                    warn!("Scrape task for {} failed: {}", self.category, e);
                    self.record(false);
                }
            }
        }
        lists
    }

    fn record(&self, success: bool) {
        if let Some(stats) = &self.stats {
            if success {
                stats.record_success(&self.category);
            } else {
                stats.record_failure(&self.category);
            }
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<BeanList, ScrapeError> {
    let response = client.get(url).send().await.map_err(|source| ScrapeError::Request {
        url: url.to_string(),
        source,
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status,
        });
    }
    let body: Value = response.json().await.map_err(|source| ScrapeError::Body {
        url: url.to_string(),
        source,
    })?;
    parse_beans(body).ok_or_else(|| ScrapeError::Shape { url: url.to_string() })
}
