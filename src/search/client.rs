//! HTTP client for the search server that produces raw result pages.

use crate::config::SearchConfig;
use crate::retry::{RetryPolicy, retry};
use crate::search::cache::FileCache;
use crate::search::error::FetchError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, debug_span, instrument};
use url::Url;

/// Default timeout for search requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    user_id: &'a str,
    query: &'a str,
}

/// Client posting queries to the search server
#[derive(Clone)]
pub struct SearchClient {
    client: ReqwestClient,
    endpoint: Url,
    user_id: String,
    cache: Option<FileCache>,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry: RetryPolicy,
}

impl SearchClient {
    /// Create a client for `endpoint`, issuing searches as `user_id`
    pub fn new(endpoint: &str, user_id: impl Into<String>) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            user_id: user_id.into(),
            cache: None,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::MIN))),
            retry: RetryPolicy::default(),
        })
    }

    /// Create a client from configuration, with the file cache enabled
    pub fn from_config(config: &SearchConfig, retry: RetryPolicy) -> Result<Self, FetchError> {
        Ok(Self::new(&config.endpoint, config.user_id.clone())?
            .with_cache(FileCache::new(&config.cache_dir))
            .with_rate_limit(config.requests_per_second)
            .with_retry_policy(retry))
    }

    /// Serve repeated queries from `cache`
    pub fn with_cache(mut self, cache: FileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Limit requests per second sent to the server
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        self.limiter = Arc::new(RateLimiter::direct(Quota::per_second(rate)));
        self
    }

    /// Replace the retry policy used for requests
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// User searches are issued for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Fetch the JSON payload for `query`, from the cache when present
    #[instrument(skip(self))]
    pub async fn fetch(&self, query: &str) -> Result<Value, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(query).await? {
                return Ok(payload);
            }
        }

        let payload = retry(&self.retry, "search_fetch", move || self.request(query)).await?;

        if let Some(cache) = &self.cache {
            cache.put(query, &payload).await?;
        }
        Ok(payload)
    }

    /// Fetch the result page markup for `query`
    pub async fn fetch_result_html(&self, query: &str) -> Result<String, FetchError> {
        let payload = self.fetch(query).await?;
        result_html(&payload)
            .map(str::to_string)
            .ok_or_else(|| FetchError::MissingResult(query.to_string()))
    }

    async fn request(&self, query: &str) -> Result<Value, FetchError> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("limiter"))
            .await;

        debug!("Sending search request for '{}' to {}", query, self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&SearchRequest {
                user_id: &self.user_id,
                query,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

/// The `result` markup of a search server payload
pub fn result_html(payload: &Value) -> Option<&str> {
    payload.get("result").and_then(Value::as_str)
}
