//! Splits a fetched document's paths into reachable and unreachable sets.

use indexmap::IndexMap;
use ravelin_model::{Document, PathItem};

use crate::config::{NonAnalyzableStrategy, ServiceMapping};
use crate::transform;

/// One analyzed backend path with the operations it carries.
#[derive(Debug, Clone)]
pub struct PathAnalysis {
    /// Path as the backend publishes it.
    pub backend_path: String,
    /// Path a gateway client must request, when one exists.
    pub gateway_path: Option<String>,
    /// Route that decided this path's fate, when one did.
    pub route_id: Option<String>,
    /// The path item with its surviving operations.
    pub item: PathItem,
}

/// Disjoint reachable/unreachable path sets plus accumulated warnings.
#[derive(Debug, Clone, Default)]
pub struct ReachabilityReport {
    /// Keyed by gateway path.
    pub reachable: IndexMap<String, PathAnalysis>,
    /// Keyed by backend path.
    pub unreachable: IndexMap<String, PathAnalysis>,
    pub warnings: Vec<String>,
}

enum Decision {
    Reachable { gateway_path: String, route_id: String },
    NonAnalyzable { route_id: String },
    Unreachable,
}

/// Classify every path of `document` against the service's candidate
/// mappings, first match wins. Paths with zero operations are skipped
/// entirely. A non-analyzable winning route is resolved by `strategy`.
pub fn analyze_document(
    document: &Document,
    mappings: &[ServiceMapping],
    strategy: NonAnalyzableStrategy,
) -> ReachabilityReport {
    let mut report = ReachabilityReport::default();

    for (backend_path, item) in &document.paths {
        if item.is_empty() {
            continue;
        }

        match decide(backend_path, mappings) {
            Decision::Reachable {
                gateway_path,
                route_id,
            } => {
                report.reachable.insert(
                    gateway_path.clone(),
                    PathAnalysis {
                        backend_path: backend_path.clone(),
                        gateway_path: Some(gateway_path),
                        route_id: Some(route_id),
                        item: item.clone(),
                    },
                );
            }
            Decision::NonAnalyzable { route_id } => match strategy {
                NonAnalyzableStrategy::IncludeWithWarning => {
                    let warning = format!(
                        "route '{route_id}' has non-analyzable transforms; \
                         including path '{backend_path}' unchanged"
                    );
                    tracing::warn!(route_id = %route_id, backend_path = %backend_path, "non-analyzable route, including path");
                    report.warnings.push(warning);
                    report.reachable.insert(
                        backend_path.clone(),
                        PathAnalysis {
                            backend_path: backend_path.clone(),
                            gateway_path: Some(backend_path.clone()),
                            route_id: Some(route_id),
                            item: item.clone(),
                        },
                    );
                }
                NonAnalyzableStrategy::ExcludeWithWarning => {
                    let warning = format!(
                        "route '{route_id}' has non-analyzable transforms; \
                         excluding path '{backend_path}'"
                    );
                    tracing::warn!(route_id = %route_id, backend_path = %backend_path, "non-analyzable route, excluding path");
                    report.warnings.push(warning);
                    report.unreachable.insert(
                        backend_path.clone(),
                        PathAnalysis {
                            backend_path: backend_path.clone(),
                            gateway_path: None,
                            route_id: Some(route_id),
                            item: item.clone(),
                        },
                    );
                }
                NonAnalyzableStrategy::SkipService => {
                    let warning = format!(
                        "route '{route_id}' has non-analyzable transforms; \
                         skipping the whole service"
                    );
                    tracing::warn!(route_id = %route_id, "non-analyzable route, skipping service");
                    return ReachabilityReport {
                        reachable: IndexMap::new(),
                        unreachable: IndexMap::new(),
                        warnings: vec![warning],
                    };
                }
            },
            Decision::Unreachable => {
                report.unreachable.insert(
                    backend_path.clone(),
                    PathAnalysis {
                        backend_path: backend_path.clone(),
                        gateway_path: None,
                        route_id: None,
                        item: item.clone(),
                    },
                );
            }
        }
    }

    report
}

/// First mapping that claims the path wins: a non-analyzable route claims it
/// for the policy, an analyzable one claims it by mapping successfully.
fn decide(backend_path: &str, mappings: &[ServiceMapping]) -> Decision {
    for mapping in mappings {
        if !mapping.route.metadata.enabled {
            continue;
        }
        let analysis = transform::analyze(&mapping.route);
        if !analysis.analyzable {
            return Decision::NonAnalyzable {
                route_id: mapping.route.id.clone(),
            };
        }
        if let Some(gateway_path) =
            transform::map_backend_to_gateway_path(&mapping.route, backend_path)
        {
            return Decision::Reachable {
                gateway_path,
                route_id: mapping.route.id.clone(),
            };
        }
    }
    Decision::Unreachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cluster, ClusterMetadata, PathTransform, Route, RouteMetadata};
    use ravelin_model::parse_document;

    fn mapping(id: &str, match_path: &str, transforms: Vec<PathTransform>) -> ServiceMapping {
        ServiceMapping {
            route: Route {
                id: id.to_string(),
                cluster_id: "c1".to_string(),
                match_path: match_path.to_string(),
                transforms,
                metadata: RouteMetadata::default(),
            },
            cluster: Cluster {
                id: "c1".to_string(),
                destinations: vec!["http://backend".to_string()],
                metadata: ClusterMetadata::default(),
            },
        }
    }

    fn doc() -> Document {
        parse_document(
            r##"{
                "openapi": "3.0.1",
                "info": {"title": "t", "version": "1"},
                "paths": {
                    "/svc/users": {"get": {"responses": {"200": {"description": "ok"}}}},
                    "/private/jobs": {"post": {"responses": {"201": {"description": "ok"}}}},
                    "/empty": {"summary": "no operations here"}
                }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn reachable_paths_are_rekeyed_to_gateway_paths() {
        let mappings = vec![mapping(
            "users-route",
            "/api/{**rest}",
            vec![PathTransform::PathPrefix("/svc".into())],
        )];
        let report =
            analyze_document(&doc(), &mappings, NonAnalyzableStrategy::IncludeWithWarning);

        let entry = &report.reachable["/api/users"];
        assert_eq!(entry.backend_path, "/svc/users");
        assert_eq!(entry.route_id.as_deref(), Some("users-route"));
        assert_eq!(entry.item.operation_count(), 1);

        assert!(report.unreachable.contains_key("/private/jobs"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn zero_operation_paths_are_skipped() {
        let mappings = vec![mapping("direct", "/{**rest}", vec![])];
        let report =
            analyze_document(&doc(), &mappings, NonAnalyzableStrategy::IncludeWithWarning);
        assert!(!report.reachable.contains_key("/empty"));
        assert!(!report.unreachable.contains_key("/empty"));
    }

    #[test]
    fn first_matching_route_wins() {
        let mappings = vec![
            mapping(
                "first",
                "/a/{**rest}",
                vec![PathTransform::PathPrefix("/svc".into())],
            ),
            mapping(
                "second",
                "/b/{**rest}",
                vec![PathTransform::PathPrefix("/svc".into())],
            ),
        ];
        let report =
            analyze_document(&doc(), &mappings, NonAnalyzableStrategy::IncludeWithWarning);
        assert_eq!(
            report.reachable["/a/users"].route_id.as_deref(),
            Some("first")
        );
        assert!(!report.reachable.contains_key("/b/users"));
    }

    #[test]
    fn disabled_routes_are_ignored() {
        let mut disabled = mapping(
            "disabled",
            "/a/{**rest}",
            vec![PathTransform::PathPrefix("/svc".into())],
        );
        disabled.route.metadata.enabled = false;
        let enabled = mapping(
            "enabled",
            "/b/{**rest}",
            vec![PathTransform::PathPrefix("/svc".into())],
        );
        let report = analyze_document(
            &doc(),
            &[disabled, enabled],
            NonAnalyzableStrategy::IncludeWithWarning,
        );
        assert_eq!(
            report.reachable["/b/users"].route_id.as_deref(),
            Some("enabled")
        );
    }

    #[test]
    fn include_policy_keeps_path_unchanged_with_warning() {
        let mappings = vec![mapping(
            "custom",
            "/api/{**rest}",
            vec![PathTransform::Unknown("ResponseHeader".into())],
        )];
        let report =
            analyze_document(&doc(), &mappings, NonAnalyzableStrategy::IncludeWithWarning);
        assert!(report.reachable.contains_key("/svc/users"));
        assert_eq!(
            report.reachable["/svc/users"].gateway_path.as_deref(),
            Some("/svc/users")
        );
        assert_eq!(report.warnings.len(), 2); // one per non-empty path
    }

    #[test]
    fn exclude_policy_drops_path_with_warning() {
        let mappings = vec![mapping(
            "custom",
            "/api/{**rest}",
            vec![PathTransform::Unknown("ResponseHeader".into())],
        )];
        let report =
            analyze_document(&doc(), &mappings, NonAnalyzableStrategy::ExcludeWithWarning);
        assert!(report.reachable.is_empty());
        assert!(report.unreachable.contains_key("/svc/users"));
        assert_eq!(report.unreachable["/svc/users"].route_id.as_deref(), Some("custom"));
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn skip_service_empties_everything_with_one_warning() {
        let mappings = vec![mapping(
            "custom",
            "/api/{**rest}",
            vec![PathTransform::Unknown("ResponseHeader".into())],
        )];
        let report = analyze_document(&doc(), &mappings, NonAnalyzableStrategy::SkipService);
        assert!(report.reachable.is_empty());
        assert!(report.unreachable.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }
}
