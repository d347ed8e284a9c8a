//! Route transform analysis and reachability.
//!
//! Consumes an immutable snapshot of the proxy's route/cluster configuration,
//! classifies each route's path transforms, inverts them to map backend paths
//! to gateway paths, and splits a fetched document's paths into reachable and
//! unreachable sets.

pub mod config;
pub mod reachability;
pub mod transform;

pub use config::{
    Cluster, ClusterMetadata, NonAnalyzableStrategy, PathTransform, Route, RouteMetadata,
    ServiceMapping, ServiceSpecification,
};
pub use reachability::{analyze_document, PathAnalysis, ReachabilityReport};
pub use transform::{
    analyze, is_path_reachable, map_backend_to_gateway_path, TransformAnalysis, TransformKind,
};
