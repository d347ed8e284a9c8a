//! Transform classification and backend-to-gateway path inversion.
//!
//! The proxy applies transforms to a matched gateway path before forwarding.
//! To decide which backend paths are reachable, each transform is inverted
//! and the inverses are applied to the backend path. Inverses run in the
//! transforms' forward declaration order: this mirrors the observed behavior
//! of the proxy and is pinned by
//! `chained_transforms_apply_in_declaration_order` below.

use crate::config::{PathTransform, Route};

/// Classification of a route's transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// No transforms; the path passes through unchanged.
    Direct,
    PathPrefix,
    PathRemovePrefix,
    PathPattern,
    PathSet,
    Unknown,
}

/// Result of classifying one route.
#[derive(Debug, Clone)]
pub struct TransformAnalysis {
    /// Overall classification: `Direct` for zero transforms, `Unknown` if
    /// any transform is unrecognized, otherwise the first transform's kind.
    pub kind: TransformKind,
    /// Per-transform classification in declaration order.
    pub transforms: Vec<TransformKind>,
    /// False if any transform cannot be inverted.
    pub analyzable: bool,
}

/// Classify every transform configured on a route.
pub fn analyze(route: &Route) -> TransformAnalysis {
    let transforms: Vec<TransformKind> = route.transforms.iter().map(kind_of).collect();
    let analyzable = !transforms.contains(&TransformKind::Unknown);
    let kind = if transforms.is_empty() {
        TransformKind::Direct
    } else if !analyzable {
        TransformKind::Unknown
    } else {
        transforms[0]
    };
    TransformAnalysis {
        kind,
        transforms,
        analyzable,
    }
}

fn kind_of(transform: &PathTransform) -> TransformKind {
    match transform {
        PathTransform::PathPrefix(_) => TransformKind::PathPrefix,
        PathTransform::PathRemovePrefix(_) => TransformKind::PathRemovePrefix,
        PathTransform::PathPattern(_) => TransformKind::PathPattern,
        PathTransform::PathSet(_) => TransformKind::PathSet,
        PathTransform::Unknown(_) => TransformKind::Unknown,
    }
}

/// Map an observed backend path to the gateway path that reaches it through
/// this route, or `None` if no gateway request can produce it.
pub fn map_backend_to_gateway_path(route: &Route, backend_path: &str) -> Option<String> {
    if backend_path.is_empty() {
        return None;
    }
    if route.transforms.is_empty() {
        // Direct: the backend sees the gateway path untouched.
        return Some(backend_path.to_string());
    }

    let mut path = backend_path.to_string();
    for transform in &route.transforms {
        path = match transform {
            PathTransform::PathPrefix(prefix) => {
                let remainder = strip_path_prefix(&path, prefix)?;
                reattach_remainder(route, remainder)?
            }
            PathTransform::PathRemovePrefix(prefix) => join_paths(prefix, &path),
            PathTransform::PathSet(value) => {
                // A constant forward rewrite only inverts on the exact value.
                if path == *value {
                    join_paths(literal_match_prefix(route), "")
                } else {
                    return None;
                }
            }
            PathTransform::PathPattern(pattern) => {
                let (literal, catch_all) = split_catch_all(pattern);
                if catch_all.is_some() {
                    let remainder = strip_path_prefix(&path, literal)?;
                    reattach_remainder(route, remainder)?
                } else if path == *pattern {
                    // No catch-all token: the pattern is a constant rewrite.
                    join_paths(literal_match_prefix(route), "")
                } else {
                    return None;
                }
            }
            PathTransform::Unknown(_) => return None,
        };
    }
    Some(path)
}

/// True if some gateway request can reach `backend_path` through this route.
pub fn is_path_reachable(route: &Route, backend_path: &str) -> bool {
    map_backend_to_gateway_path(route, backend_path).is_some()
}

/// The literal portion of the route's match pattern preceding its catch-all
/// segment, without a trailing slash.
fn literal_match_prefix(route: &Route) -> &str {
    split_catch_all(&route.match_path).0
}

/// Attach a stripped remainder back onto the route's match pattern. With a
/// catch-all the remainder substitutes into it; without one the route
/// matches exactly one gateway path, so the remainder must equal the
/// pattern itself.
fn reattach_remainder(route: &Route, remainder: &str) -> Option<String> {
    let (literal, catch_all) = split_catch_all(&route.match_path);
    if catch_all.is_some() {
        return Some(join_paths(literal, remainder));
    }
    if remainder.trim_end_matches('/') == literal {
        Some(join_paths(literal, ""))
    } else {
        None
    }
}

/// Split a pattern into its literal prefix and the optional `{**name}`
/// catch-all segment.
fn split_catch_all(pattern: &str) -> (&str, Option<&str>) {
    match pattern.find("{**") {
        Some(idx) => {
            let name = pattern[idx + 3..].trim_end_matches('}');
            (pattern[..idx].trim_end_matches('/'), Some(name))
        }
        None => (pattern.trim_end_matches('/'), None),
    }
}

/// Strip `prefix` from `path`, requiring the cut to fall on a segment
/// boundary. Returns the remainder (empty or starting with `/`).
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path);
    }
    let remainder = path.strip_prefix(prefix)?;
    if remainder.is_empty() || remainder.starts_with('/') {
        Some(remainder)
    } else {
        None
    }
}

/// Join two path fragments with exactly one slash; the result always starts
/// with `/`.
fn join_paths(base: &str, remainder: &str) -> String {
    let base = base.trim_end_matches('/');
    let remainder = remainder.trim_start_matches('/');
    match (base.is_empty(), remainder.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{remainder}"),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{remainder}"),
    }
}
