use thiserror::Error;

/// Errors produced while reading or writing OpenAPI documents.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input is not valid YAML/JSON.
    #[error("parse error: {0}")]
    Syntax(String),

    /// Root `openapi` field is missing or not a 3.x version.
    #[error("unsupported OpenAPI version: {0} (only 3.x supported)")]
    UnsupportedVersion(String),

    /// Input parsed but does not match the document structure.
    #[error("invalid document structure: {0}")]
    Structure(String),

    /// Serialization back to text failed.
    #[error("serialization error: {0}")]
    Serialize(String),
}
