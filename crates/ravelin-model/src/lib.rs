//! OpenAPI 3.x document model.
//!
//! Owns the recursive document tree the aggregation pipeline operates on:
//! paths, operations, component collections and schemas. Parses YAML/JSON
//! (JSON is valid YAML, so one parse path handles both) and serializes back
//! to either format.

pub mod components;
pub mod document;
pub mod error;
pub mod parser;
pub mod reference;
pub mod schema;

pub use components::Components;
pub use document::{
    Document, ExternalDocs, Info, MediaType, Operation, Parameter, PathItem, RefOr, RequestBody,
    Response, SecurityRequirement, Server, Tag, HTTP_METHODS,
};
pub use error::ParseError;
pub use parser::{parse_document, to_json, to_yaml};
pub use schema::{AdditionalProperties, Schema, SchemaOrRef};
