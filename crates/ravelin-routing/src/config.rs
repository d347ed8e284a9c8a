//! Immutable route/cluster configuration snapshot.
//!
//! The proxy's live configuration is external; each pipeline run receives a
//! snapshot of these types and never observes updates mid-run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A typed path transform, one per configured transform entry.
///
/// The proxy configures transforms as loose string dictionaries; the key
/// sniffing happens once in [`PathTransform::from_raw`] and the rest of the
/// pipeline only sees this sum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathTransform {
    /// Forward: prepend this prefix to the forwarded path.
    PathPrefix(String),
    /// Forward: strip this prefix from the incoming path.
    PathRemovePrefix(String),
    /// Forward: rewrite using a pattern applied to the catch-all remainder.
    PathPattern(String),
    /// Forward: replace the whole path with this constant.
    PathSet(String),
    /// Unrecognized transform; carries the first configuration key for
    /// diagnostics.
    Unknown(String),
}

impl PathTransform {
    /// Classify one raw transform dictionary by which known key it carries.
    pub fn from_raw(raw: &IndexMap<String, String>) -> Self {
        for (key, value) in raw {
            match key.as_str() {
                "PathPrefix" => return PathTransform::PathPrefix(value.clone()),
                "PathRemovePrefix" => return PathTransform::PathRemovePrefix(value.clone()),
                "PathPattern" => return PathTransform::PathPattern(value.clone()),
                "PathSet" => return PathTransform::PathSet(value.clone()),
                _ => {}
            }
        }
        let key = raw
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "<empty>".to_string());
        PathTransform::Unknown(key)
    }
}

/// A proxy route: match pattern plus the ordered transforms applied to
/// matched requests before forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,

    #[serde(rename = "clusterId")]
    pub cluster_id: String,

    /// Match pattern, optionally ending in a single `{**catch-all}` segment.
    #[serde(rename = "matchPath")]
    pub match_path: String,

    #[serde(default)]
    pub transforms: Vec<PathTransform>,

    #[serde(default)]
    pub metadata: RouteMetadata,
}

/// Per-route aggregation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetadata {
    #[serde(rename = "serviceName", default)]
    pub service_name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides the cluster's spec path for this route only.
    #[serde(rename = "openApiPathOverride", default)]
    pub openapi_path_override: Option<String>,
}

impl Default for RouteMetadata {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            enabled: true,
            openapi_path_override: None,
        }
    }
}

/// A destination cluster with at least one base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,

    /// Destination base URLs, tried in declaration order.
    pub destinations: Vec<String>,

    #[serde(default)]
    pub metadata: ClusterMetadata,
}

/// Per-cluster aggregation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetadata {
    /// Prefix applied to every component schema name of this cluster's
    /// documents before merging.
    #[serde(rename = "schemaPrefix", default)]
    pub schema_prefix: Option<String>,

    /// Policy for routes whose transforms cannot be inverted.
    #[serde(rename = "nonAnalyzable", default)]
    pub non_analyzable: NonAnalyzableStrategy,

    /// Default path the spec document is served under.
    #[serde(rename = "openApiPath", default = "default_openapi_path")]
    pub openapi_path: String,
}

impl Default for ClusterMetadata {
    fn default() -> Self {
        Self {
            schema_prefix: None,
            non_analyzable: NonAnalyzableStrategy::default(),
            openapi_path: default_openapi_path(),
        }
    }
}

/// What to do with a path whose winning route is non-analyzable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonAnalyzableStrategy {
    /// Keep the path unchanged and record a warning.
    #[default]
    IncludeWithWarning,
    /// Drop the path and record a warning.
    ExcludeWithWarning,
    /// Drop every path of the service and record a single warning.
    SkipService,
}

/// One (route, cluster) pair contributing to a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMapping {
    pub route: Route,
    pub cluster: Cluster,
}

/// Everything the pipeline needs to aggregate one named service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpecification {
    #[serde(rename = "serviceName")]
    pub service_name: String,

    pub mappings: Vec<ServiceMapping>,
}

fn default_true() -> bool {
    true
}

fn default_openapi_path() -> String {
    "/openapi.json".to_string()
}
