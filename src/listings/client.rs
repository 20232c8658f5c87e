//! HTTP client for the lounge listing source
//!
//! Wraps `reqwest` with a request timeout, a desktop user-agent, and retry
//! middleware (bounded exponential backoff on timeouts, connection errors,
//! and 429/5xx responses). Exposes the [`ListingSource`] seam the pipeline
//! works against.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use tracing::{debug, info, warn};

use super::parser;
use crate::Result;
use crate::cache::PageCache;
use crate::config::SourceConfig;
use crate::error::LoungeMapError;
use crate::models::{ListingTarget, RawListing};

/// Capability the pipeline needs from the listing source: a work list of
/// airport pages, and one raw page per work-list item.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the work list of airport page targets
    async fn airport_index(&self) -> Result<Vec<ListingTarget>>;

    /// Fetch one airport page as a raw listing
    async fn airport_page(&self, target: &ListingTarget) -> Result<RawListing>;
}

/// Priority Pass site client
pub struct PriorityPassClient {
    http: ClientWithMiddleware,
    base_url: String,
    index_path: String,
    cache: Option<Arc<PageCache>>,
    cache_ttl: Duration,
}

impl PriorityPassClient {
    /// Create a new client from source configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LoungeMapError::config(format!("failed to build HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let http = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index_path: config.index_path.clone(),
            cache: None,
            cache_ttl: Duration::ZERO,
        })
    }

    /// Attach a persistent page cache with the given entry TTL
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<PageCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    fn index_url(&self) -> String {
        format!("{}{}", self.base_url, self.index_path)
    }

    /// Fetch a page body, going through the cache when one is attached.
    ///
    /// Cache failures degrade to a live fetch; they never fail the item.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        if let Some(cache) = &self.cache {
            match cache.get(url).await {
                Ok(Some(body)) => {
                    debug!("Page cache hit: {url}");
                    return Ok(body);
                }
                Ok(None) => {}
                Err(e) => warn!("Page cache read failed for {url}: {e}"),
            }
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| LoungeMapError::network(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                429 => LoungeMapError::rate_limit(format!(
                    "{url} still rate limited after retries"
                )),
                _ => LoungeMapError::network(format!("{url} returned HTTP {status}")),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| LoungeMapError::network(format!("failed to read body of {url}: {e}")))?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(url, &body, self.cache_ttl).await {
                warn!("Page cache write failed for {url}: {e}");
            }
        }
        Ok(body)
    }
}

#[async_trait]
impl ListingSource for PriorityPassClient {
    async fn airport_index(&self) -> Result<Vec<ListingTarget>> {
        let url = self.index_url();
        info!("Fetching airport index from {url}");

        let body = self.fetch_text(&url).await?;
        let targets = parser::extract_airport_targets(&body, &self.base_url);

        info!("Found {} airport pages on the listing source", targets.len());
        Ok(targets)
    }

    async fn airport_page(&self, target: &ListingTarget) -> Result<RawListing> {
        debug!("Fetching airport page: {}", target.url);
        let body = self.fetch_text(&target.url).await?;
        Ok(RawListing {
            body,
            source_url: target.url.clone(),
            country_slug: target.country_slug.clone(),
            airport_slug: target.airport_slug.clone(),
        })
    }
}
