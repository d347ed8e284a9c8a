use serde_json::Value;

use crate::document::Document;
use crate::error::ParseError;

/// Parse an OpenAPI 3.x document from a YAML or JSON string.
///
/// JSON is valid YAML, so a single YAML parse handles both. The input goes
/// through a `serde_json::Value` first so the version gate can run before
/// the full model deserialization.
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
    let root: Value =
        serde_yaml::from_str(input).map_err(|e| ParseError::Syntax(e.to_string()))?;

    let version = root
        .get("openapi")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if !version.starts_with("3.") {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    serde_json::from_value(root).map_err(|e| ParseError::Structure(e.to_string()))
}

/// Serialize a document to pretty-printed JSON.
pub fn to_json(document: &Document) -> Result<String, ParseError> {
    serde_json::to_string_pretty(document).map_err(|e| ParseError::Serialize(e.to_string()))
}

/// Serialize a document to YAML.
pub fn to_yaml(document: &Document) -> Result<String, ParseError> {
    serde_yaml::to_string(document).map_err(|e| ParseError::Serialize(e.to_string()))
}
