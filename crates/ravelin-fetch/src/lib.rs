//! Document fetching and caching.
//!
//! Retrieves raw OpenAPI documents over HTTP with per-endpoint caching,
//! fallback paths, a process-wide concurrency limit and failure caching, and
//! provides the tag-scoped invalidation surface shared with the aggregate
//! layer.

pub mod cache;
pub mod fetcher;
pub mod invalidate;

pub use cache::{CacheStats, TagEvict, TaggedCache, WILDCARD_TAG};
pub use fetcher::{CachedFetch, DocumentFetcher, FetchError, FetcherConfig};
pub use invalidate::{cluster_tag, service_tag, CacheInvalidator};
