//! Helpers for `#/components/{kind}/{name}` reference strings.

/// Prefix of every local component reference.
pub const COMPONENTS_PREFIX: &str = "#/components/";

/// Prefix of schema references specifically.
pub const SCHEMAS_PREFIX: &str = "#/components/schemas/";

/// Extract the schema name from a `#/components/schemas/{name}` reference.
pub fn schema_ref_name(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(SCHEMAS_PREFIX)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

/// Build a `#/components/schemas/{name}` reference.
pub fn schema_ref(name: &str) -> String {
    format!("{SCHEMAS_PREFIX}{name}")
}

/// Split any local component reference into `(kind, name)`, e.g.
/// `#/components/responses/NotFound` into `("responses", "NotFound")`.
pub fn split_component_ref(reference: &str) -> Option<(&str, &str)> {
    let rest = reference.strip_prefix(COMPONENTS_PREFIX)?;
    let (kind, name) = rest.split_once('/')?;
    if kind.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((kind, name))
}
