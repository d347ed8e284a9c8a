//! Tag-scoped cache invalidation.
//!
//! One invalidator fronts every cache layer that participates in the tag
//! contract (raw documents and computed aggregates). Invalidation is
//! best-effort and idempotent: removing a tag nobody wrote under is not an
//! error. It may race with an in-flight fetch; a fetch completing afterwards
//! can transiently repopulate the cache, resolved by the next expiry or
//! invalidation.

use std::sync::Arc;

use ravelin_telemetry::events;

use crate::cache::{TagEvict, WILDCARD_TAG};

/// Invalidation tag for a service name.
pub fn service_tag(name: &str) -> String {
    format!("service:{name}")
}

/// Invalidation tag for a cluster id.
pub fn cluster_tag(id: &str) -> String {
    format!("cluster:{id}")
}

/// Evicts cache entries by service, by cluster, or globally.
#[derive(Clone, Default)]
pub struct CacheInvalidator {
    caches: Vec<Arc<dyn TagEvict>>,
}

impl CacheInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register another cache layer to invalidate.
    pub fn with_cache(mut self, cache: Arc<dyn TagEvict>) -> Self {
        self.caches.push(cache);
        self
    }

    /// Drop everything cached for one service.
    pub fn invalidate_service(&self, name: &str) {
        self.remove(&service_tag(name));
    }

    /// Drop everything cached for one cluster.
    pub fn invalidate_cluster(&self, id: &str) {
        self.remove(&cluster_tag(id));
    }

    /// Drop every entry in every registered cache.
    pub fn invalidate_all(&self) {
        self.remove(WILDCARD_TAG);
    }

    fn remove(&self, tag: &str) {
        let mut removed = 0;
        for cache in &self.caches {
            removed += cache.remove_by_tag(tag);
        }
        tracing::info!(
            event = events::CACHE_INVALIDATED,
            tag,
            removed,
            "cache entries invalidated"
        );
    }
}
