//! HTTP fetching of OpenAPI documents with caching and bounded concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use ravelin_model::{parse_document, Document, ParseError};
use ravelin_telemetry::events;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};

use crate::cache::TaggedCache;

/// Configuration for the document fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Process-wide limit on concurrent fetch attempts.
    pub concurrency: usize,
    /// Timeout applied to each individual attempt (primary and fallbacks).
    pub attempt_timeout: Duration,
    /// TTL for successfully fetched documents.
    pub success_ttl: Duration,
    /// TTL for cached failures; intentionally shorter than `success_ttl` to
    /// bound retries against an unhealthy backend without hammering it.
    pub failure_ttl: Duration,
    /// Paths tried in order after the primary path fails.
    pub fallback_paths: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            attempt_timeout: Duration::from_secs(10),
            success_ttl: Duration::from_secs(300),
            failure_ttl: Duration::from_secs(30),
            fallback_paths: vec![
                "/swagger/v1/swagger.json".to_string(),
                "/openapi.yaml".to_string(),
                "/openapi.yml".to_string(),
            ],
        }
    }
}

/// A cached fetch outcome: a parsed document or a known failure.
#[derive(Debug, Clone)]
pub enum CachedFetch {
    Document(Arc<Document>),
    Failure,
}

impl CachedFetch {
    fn into_document(self) -> Option<Arc<Document>> {
        match self {
            CachedFetch::Document(doc) => Some(doc),
            CachedFetch::Failure => None,
        }
    }
}

/// Contract violations reported synchronously to the caller. Transient
/// downstream failures never surface here; they come back as `Ok(None)`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("base URL must not be blank")]
    BlankBaseUrl,

    #[error("spec path must not be blank")]
    BlankPath,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Why one attempt against one path failed. Internal; surfaces only as
/// diagnostics.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("non-success status: {0}")]
    Status(u16),

    #[error("unparseable document: {0}")]
    Parse(#[from] ParseError),
}

/// Fetches raw OpenAPI documents with per-endpoint caching, fallback paths
/// and a shared concurrency limit.
#[derive(Clone)]
pub struct DocumentFetcher {
    client: Client,
    cache: TaggedCache<CachedFetch>,
    limiter: Arc<Semaphore>,
    inflight: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
    config: FetcherConfig,
}

impl DocumentFetcher {
    /// Build a fetcher with its own cache and limiter.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self {
            client,
            cache: TaggedCache::new(),
            limiter: Arc::new(Semaphore::new(config.concurrency)),
            inflight: Arc::new(RwLock::new(HashMap::new())),
            config,
        })
    }

    /// A handle to the raw-document cache, shared with the invalidator.
    pub fn cache(&self) -> TaggedCache<CachedFetch> {
        self.cache.clone()
    }

    /// Fetch `{base_url}{primary_path}` without invalidation tags.
    pub async fn fetch(
        &self,
        base_url: &str,
        primary_path: &str,
    ) -> Result<Option<Arc<Document>>, FetchError> {
        self.fetch_with_tags(base_url, primary_path, &[]).await
    }

    /// Fetch a document, caching the outcome under the given tags.
    ///
    /// Returns `Ok(None)` when the endpoint is unavailable or serves nothing
    /// parseable; that outcome is itself cached for `failure_ttl`. Dropping
    /// the returned future cancels the fetch without writing to the cache.
    pub async fn fetch_with_tags(
        &self,
        base_url: &str,
        primary_path: &str,
        tags: &[String],
    ) -> Result<Option<Arc<Document>>, FetchError> {
        if base_url.trim().is_empty() {
            return Err(FetchError::BlankBaseUrl);
        }
        if primary_path.trim().is_empty() {
            return Err(FetchError::BlankPath);
        }

        let key = cache_key(base_url, primary_path);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.into_document());
        }

        // One flight per key: losers of this lock find the winner's result
        // in the cache instead of fetching again.
        let gate = self.inflight_gate(&key);
        let _guard = gate.lock().await;
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.into_document());
        }

        let Ok(_permit) = self.limiter.acquire().await else {
            // The semaphore is never closed while a fetcher exists.
            return Ok(None);
        };
        // Re-check: a racing caller for a different key may have populated
        // this one via a shared upstream while we waited for a permit.
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.into_document());
        }

        for path in self.candidate_paths(primary_path) {
            match self.attempt(base_url, path).await {
                Ok(document) => {
                    let document = Arc::new(document);
                    tracing::info!(
                        event = events::SPEC_FETCHED,
                        base_url,
                        path,
                        "fetched spec document"
                    );
                    self.cache.set(
                        &key,
                        CachedFetch::Document(Arc::clone(&document)),
                        self.config.success_ttl,
                        tags,
                    );
                    return Ok(Some(document));
                }
                Err(err) => {
                    tracing::debug!(base_url, path, error = %err, "spec fetch attempt failed");
                }
            }
        }

        tracing::warn!(
            event = events::SPEC_FETCH_FAILED,
            base_url,
            path = primary_path,
            "all spec fetch attempts failed, caching failure"
        );
        self.cache
            .set(&key, CachedFetch::Failure, self.config.failure_ttl, tags);
        Ok(None)
    }

    fn candidate_paths<'a>(&'a self, primary_path: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(primary_path).chain(
            self.config
                .fallback_paths
                .iter()
                .map(String::as_str)
                .filter(move |p| *p != primary_path),
        )
    }

    async fn attempt(&self, base_url: &str, path: &str) -> Result<Document, AttemptError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.attempt_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(parse_document(&body)?)
    }

    fn inflight_gate(&self, key: &str) -> Arc<Mutex<()>> {
        {
            let gates = self.inflight.read();
            if let Some(gate) = gates.get(key) {
                return Arc::clone(gate);
            }
        }
        let mut gates = self.inflight.write();
        // Gates nobody holds anymore belong to completed flights; sweep
        // them here so the map stays bounded by concurrent keys.
        gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        Arc::clone(gates.entry(key.to_string()).or_default())
    }

    #[cfg(test)]
    fn inflight_gate_count(&self) -> usize {
        self.inflight.read().len()
    }
}

fn cache_key(base_url: &str, path: &str) -> String {
    format!("{}|{}", base_url.trim_end_matches('/'), path)
}
