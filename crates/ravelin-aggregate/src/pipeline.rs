//! The aggregation orchestrator.
//!
//! One [`Aggregator`] owns the fetcher, the aggregate cache and the service
//! configuration snapshot. An aggregate run fans out one fetch per mapping,
//! then takes each fetched document through reachability analysis, pruning
//! and schema prefixing before the final merge.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use ravelin_fetch::{
    cluster_tag, service_tag, CacheInvalidator, DocumentFetcher, FetchError, FetcherConfig,
    TaggedCache,
};
use ravelin_model::Document;
use ravelin_routing::{
    analyze_document, NonAnalyzableStrategy, ServiceMapping, ServiceSpecification,
};
use ravelin_telemetry::events;
use thiserror::Error;

use crate::merge::{merge, MergeError};
use crate::prune::prune;
use crate::rename::apply_prefix;

/// Aggregator configuration.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub fetcher: FetcherConfig,
    /// TTL for computed aggregate documents.
    pub aggregate_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            aggregate_ttl: Duration::from_secs(300),
        }
    }
}

/// A built aggregate: the merged document plus every warning the run
/// produced (reachability policies and merge conflicts).
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub document: Arc<Document>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("no documents could be fetched for service '{0}'")]
    NoDocuments(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Builds and caches aggregate documents for configured services.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: DocumentFetcher,
    aggregates: TaggedCache<AggregateResult>,
    services: Vec<ServiceSpecification>,
    aggregate_ttl: Duration,
}

impl Aggregator {
    pub fn new(
        services: Vec<ServiceSpecification>,
        config: AggregatorConfig,
    ) -> Result<Self, AggregateError> {
        Ok(Self {
            fetcher: DocumentFetcher::new(config.fetcher)?,
            aggregates: TaggedCache::new(),
            services,
            aggregate_ttl: config.aggregate_ttl,
        })
    }

    /// Names of every configured service, in configuration order.
    pub fn list_services(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|s| s.service_name.clone())
            .collect()
    }

    /// An invalidator wired to both cache layers: raw documents and
    /// computed aggregates.
    pub fn invalidator(&self) -> CacheInvalidator {
        CacheInvalidator::new()
            .with_cache(Arc::new(self.fetcher.cache()))
            .with_cache(Arc::new(self.aggregates.clone()))
    }

    /// The aggregate document for `service_name`, built on a cache miss.
    pub async fn aggregate(&self, service_name: &str) -> Result<AggregateResult, AggregateError> {
        let service = self
            .services
            .iter()
            .find(|s| s.service_name == service_name)
            .ok_or_else(|| AggregateError::UnknownService(service_name.to_string()))?;

        if let Some(hit) = self.aggregates.get(service_name) {
            return Ok(hit);
        }

        let result = self.build(service).await?;

        let mut tags = vec![service_tag(service_name)];
        for mapping in enabled_mappings(service) {
            let tag = cluster_tag(&mapping.cluster.id);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        self.aggregates
            .set(service_name, result.clone(), self.aggregate_ttl, &tags);

        Ok(result)
    }

    async fn build(&self, service: &ServiceSpecification) -> Result<AggregateResult, AggregateError> {
        let mappings: Vec<&ServiceMapping> = enabled_mappings(service).collect();

        let fetches = mappings
            .iter()
            .map(|mapping| self.fetch_mapping(&service.service_name, mapping));
        let fetched = join_all(fetches).await;

        let mut warnings = Vec::new();
        let mut documents = Vec::new();
        let all_enabled: Vec<ServiceMapping> = mappings.iter().map(|m| (*m).clone()).collect();

        for (mapping, outcome) in mappings.iter().zip(fetched) {
            let Some(document) = outcome? else {
                continue;
            };

            let strategy = mapping.cluster.metadata.non_analyzable;
            let report = analyze_document(&document, &all_enabled, strategy);
            warnings.extend(report.warnings.iter().cloned());

            if strategy == NonAnalyzableStrategy::SkipService && report.reachable.is_empty() {
                tracing::warn!(
                    event = events::SERVICE_SKIPPED,
                    service_name = %service.service_name,
                    cluster_id = %mapping.cluster.id,
                    "document dropped by skip-service policy"
                );
                continue;
            }

            let mut document = prune(&document, &report);
            if let Some(prefix) = &mapping.cluster.metadata.schema_prefix {
                document = apply_prefix(&document, prefix);
            }
            documents.push(document);
        }

        if documents.is_empty() {
            return Err(AggregateError::NoDocuments(service.service_name.clone()));
        }

        let (merged, conflicts) = merge(&documents, &service.service_name)?;
        warnings.extend(conflicts.iter().map(|c| c.to_string()));

        tracing::info!(
            event = events::AGGREGATE_BUILT,
            service_name = %service.service_name,
            documents = documents.len(),
            paths = merged.paths.len(),
            warnings = warnings.len(),
            "aggregate document built"
        );

        Ok(AggregateResult {
            document: Arc::new(merged),
            warnings,
        })
    }

    /// Fetch one mapping's document, trying the cluster's destinations in
    /// declaration order.
    async fn fetch_mapping(
        &self,
        service_name: &str,
        mapping: &ServiceMapping,
    ) -> Result<Option<Arc<Document>>, FetchError> {
        let path = mapping
            .route
            .metadata
            .openapi_path_override
            .as_deref()
            .unwrap_or(&mapping.cluster.metadata.openapi_path);
        let tags = vec![service_tag(service_name), cluster_tag(&mapping.cluster.id)];

        for destination in &mapping.cluster.destinations {
            if let Some(document) = self.fetcher.fetch_with_tags(destination, path, &tags).await? {
                return Ok(Some(document));
            }
        }
        Ok(None)
    }
}

fn enabled_mappings(
    service: &ServiceSpecification,
) -> impl Iterator<Item = &ServiceMapping> {
    service
        .mappings
        .iter()
        .filter(|m| m.route.metadata.enabled)
}
