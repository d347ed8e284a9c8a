//! Per-service schema name prefixing.
//!
//! Rewrites every `#/components/schemas/*` reference in the document to its
//! prefixed name so that documents from different services can merge without
//! colliding. References are rewritten wherever the pruner chases them,
//! including inside opaque headers, links and component values, so renaming
//! never leaves a dangling reference. Every touched node is rebuilt; the
//! input document may be a shared cache entry concurrently renamed under
//! other prefixes.

use std::collections::HashMap;

use indexmap::IndexMap;
use ravelin_model::reference::{schema_ref, schema_ref_name};
use ravelin_model::{
    AdditionalProperties, Components, Document, MediaType, Operation, Parameter, PathItem, RefOr,
    RequestBody, Response, Schema, SchemaOrRef,
};
use serde_json::Value;

/// Rename map: lowercased old name to prefixed new name. Lookups are
/// case-insensitive so a ref whose casing differs from the schema key still
/// lands on the renamed component.
type Renames = HashMap<String, String>;

/// Apply `prefix` to every component schema name and rewrite all references.
///
/// A blank prefix or an empty schema collection makes this a plain copy.
/// References that do not point into this document's own schemas are left
/// untouched (external references are not ours to rewrite).
pub fn apply_prefix(document: &Document, prefix: &str) -> Document {
    if prefix.trim().is_empty() || document.components.schemas.is_empty() {
        return document.clone();
    }

    let mut renames = Renames::new();
    for name in document.components.schemas.keys() {
        let lowered = name.to_lowercase();
        if renames.contains_key(&lowered) {
            // Names differing only in case collapse in the lookup map; the
            // first occurrence's target wins for reference rewriting.
            tracing::warn!(
                schema = %name,
                "schema name collides case-insensitively with an earlier one"
            );
            continue;
        }
        renames.insert(lowered, format!("{prefix}{name}"));
    }

    Document {
        openapi: document.openapi.clone(),
        info: document.info.clone(),
        servers: document.servers.clone(),
        paths: document
            .paths
            .iter()
            .map(|(path, item)| (path.clone(), rewrite_path_item(item, &renames)))
            .collect(),
        components: rewrite_components(&document.components, prefix, &renames),
        security: document.security.clone(),
        tags: document.tags.clone(),
        external_docs: document.external_docs.clone(),
    }
}

fn rewrite_components(components: &Components, prefix: &str, renames: &Renames) -> Components {
    Components {
        schemas: components
            .schemas
            .iter()
            .map(|(name, schema)| {
                (
                    format!("{prefix}{name}"),
                    rewrite_schema_or_ref(schema, renames),
                )
            })
            .collect(),
        responses: components
            .responses
            .iter()
            .map(|(name, response)| (name.clone(), rewrite_response_ref(response, renames)))
            .collect(),
        parameters: components
            .parameters
            .iter()
            .map(|(name, parameter)| (name.clone(), rewrite_parameter_ref(parameter, renames)))
            .collect(),
        request_bodies: components
            .request_bodies
            .iter()
            .map(|(name, body)| (name.clone(), rewrite_request_body_ref(body, renames)))
            .collect(),
        // Opaque kinds still get their embedded `$ref` strings rewritten;
        // the pruner chases references in these, so renaming must follow.
        security_schemes: rewrite_value_map(&components.security_schemes, renames),
        headers: rewrite_value_map(&components.headers, renames),
        examples: rewrite_value_map(&components.examples, renames),
        links: rewrite_value_map(&components.links, renames),
        callbacks: rewrite_value_map(&components.callbacks, renames),
    }
}

fn rewrite_path_item(item: &PathItem, renames: &Renames) -> PathItem {
    let mut rewritten = PathItem {
        summary: item.summary.clone(),
        description: item.description.clone(),
        parameters: item
            .parameters
            .iter()
            .map(|p| rewrite_parameter_ref(p, renames))
            .collect(),
        ..PathItem::default()
    };
    for (method, operation) in item.operations() {
        rewritten.set_operation(method, rewrite_operation(operation, renames));
    }
    rewritten
}

fn rewrite_operation(operation: &Operation, renames: &Renames) -> Operation {
    Operation {
        operation_id: operation.operation_id.clone(),
        summary: operation.summary.clone(),
        description: operation.description.clone(),
        tags: operation.tags.clone(),
        parameters: operation
            .parameters
            .iter()
            .map(|p| rewrite_parameter_ref(p, renames))
            .collect(),
        request_body: operation
            .request_body
            .as_ref()
            .map(|b| rewrite_request_body_ref(b, renames)),
        responses: operation
            .responses
            .iter()
            .map(|(status, response)| (status.clone(), rewrite_response_ref(response, renames)))
            .collect(),
        security: operation.security.clone(),
    }
}

fn rewrite_parameter_ref(parameter: &RefOr<Parameter>, renames: &Renames) -> RefOr<Parameter> {
    match parameter {
        RefOr::Ref { reference } => RefOr::Ref {
            reference: reference.clone(),
        },
        RefOr::Item(p) => RefOr::Item(Parameter {
            name: p.name.clone(),
            location: p.location.clone(),
            description: p.description.clone(),
            required: p.required,
            schema: p.schema.as_ref().map(|s| rewrite_schema_or_ref(s, renames)),
        }),
    }
}

fn rewrite_request_body_ref(body: &RefOr<RequestBody>, renames: &Renames) -> RefOr<RequestBody> {
    match body {
        RefOr::Ref { reference } => RefOr::Ref {
            reference: reference.clone(),
        },
        RefOr::Item(b) => RefOr::Item(RequestBody {
            description: b.description.clone(),
            required: b.required,
            content: rewrite_content(&b.content, renames),
        }),
    }
}

fn rewrite_response_ref(response: &RefOr<Response>, renames: &Renames) -> RefOr<Response> {
    match response {
        RefOr::Ref { reference } => RefOr::Ref {
            reference: reference.clone(),
        },
        RefOr::Item(r) => RefOr::Item(Response {
            description: r.description.clone(),
            headers: rewrite_value_map(&r.headers, renames),
            content: rewrite_content(&r.content, renames),
            links: rewrite_value_map(&r.links, renames),
        }),
    }
}

fn rewrite_content(
    content: &IndexMap<String, MediaType>,
    renames: &Renames,
) -> IndexMap<String, MediaType> {
    content
        .iter()
        .map(|(media_type, media)| {
            (
                media_type.clone(),
                MediaType {
                    schema: media.schema.as_ref().map(|s| rewrite_schema_or_ref(s, renames)),
                    extra: rewrite_value_map(&media.extra, renames),
                },
            )
        })
        .collect()
}

fn rewrite_schema_or_ref(schema: &SchemaOrRef, renames: &Renames) -> SchemaOrRef {
    match schema {
        SchemaOrRef::Ref { reference } => SchemaOrRef::Ref {
            reference: rewrite_reference(reference, renames),
        },
        SchemaOrRef::Inline(inline) => SchemaOrRef::Inline(Box::new(rewrite_schema(inline, renames))),
    }
}

fn rewrite_schema(schema: &Schema, renames: &Renames) -> Schema {
    Schema {
        schema_type: schema.schema_type.clone(),
        format: schema.format.clone(),
        title: schema.title.clone(),
        description: schema.description.clone(),
        properties: schema
            .properties
            .iter()
            .map(|(name, nested)| (name.clone(), rewrite_schema_or_ref(nested, renames)))
            .collect(),
        required: schema.required.clone(),
        items: schema
            .items
            .as_ref()
            .map(|items| Box::new(rewrite_schema_or_ref(items, renames))),
        all_of: schema
            .all_of
            .iter()
            .map(|s| rewrite_schema_or_ref(s, renames))
            .collect(),
        one_of: schema
            .one_of
            .iter()
            .map(|s| rewrite_schema_or_ref(s, renames))
            .collect(),
        any_of: schema
            .any_of
            .iter()
            .map(|s| rewrite_schema_or_ref(s, renames))
            .collect(),
        not: schema
            .not
            .as_ref()
            .map(|not| Box::new(rewrite_schema_or_ref(not, renames))),
        additional_properties: schema.additional_properties.as_ref().map(|ap| match ap {
            AdditionalProperties::Bool(b) => AdditionalProperties::Bool(*b),
            AdditionalProperties::Schema(nested) => {
                AdditionalProperties::Schema(Box::new(rewrite_schema_or_ref(nested, renames)))
            }
        }),
        enum_values: schema.enum_values.clone(),
        nullable: schema.nullable,
        example: schema.example.clone(),
        extra: rewrite_value_map(&schema.extra, renames),
    }
}

fn rewrite_value_map(map: &IndexMap<String, Value>, renames: &Renames) -> IndexMap<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), rewrite_value(value, renames)))
        .collect()
}

/// Rewrite `$ref` strings inside opaque values, mirroring the pruner's walk.
fn rewrite_value(value: &Value, renames: &Renames) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, nested)| {
                    if key == "$ref" {
                        if let Value::String(reference) = nested {
                            return (
                                key.clone(),
                                Value::String(rewrite_reference(reference, renames)),
                            );
                        }
                    }
                    (key.clone(), rewrite_value(nested, renames))
                })
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| rewrite_value(v, renames)).collect())
        }
        _ => value.clone(),
    }
}

fn rewrite_reference(reference: &str, renames: &Renames) -> String {
    if let Some(name) = schema_ref_name(reference) {
        if let Some(renamed) = renames.get(&name.to_lowercase()) {
            return schema_ref(renamed);
        }
    }
    reference.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravelin_model::parse_document;

    fn doc() -> Document {
        parse_document(
            r##"{
                "openapi": "3.0.1",
                "info": {"title": "orders", "version": "1"},
                "paths": {
                    "/orders": {
                        "get": {
                            "responses": {
                                "200": {
                                    "description": "ok",
                                    "content": {
                                        "application/json": {
                                            "schema": {
                                                "type": "array",
                                                "items": {"$ref": "#/components/schemas/order"}
                                            }
                                        }
                                    }
                                }
                            }
                        },
                        "post": {
                            "requestBody": {
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Order"}
                                    }
                                }
                            },
                            "responses": {"201": {"description": "created"}}
                        }
                    }
                },
                "components": {
                    "schemas": {
                        "Order": {
                            "type": "object",
                            "properties": {
                                "customer": {"$ref": "#/components/schemas/Customer"},
                                "external": {"$ref": "https://example.com/common.json#/Address"}
                            }
                        },
                        "Customer": {
                            "allOf": [{"$ref": "#/components/schemas/Order"}]
                        }
                    }
                }
            }"##,
        )
        .unwrap()
    }

    fn ref_of(schema: &SchemaOrRef) -> &str {
        match schema {
            SchemaOrRef::Ref { reference } => reference,
            SchemaOrRef::Inline(_) => panic!("expected a reference"),
        }
    }

    #[test]
    fn blank_prefix_is_a_no_op() {
        let document = doc();
        assert_eq!(apply_prefix(&document, ""), document);
        assert_eq!(apply_prefix(&document, "   "), document);
    }

    #[test]
    fn empty_schema_map_is_a_no_op() {
        let mut document = doc();
        document.components.schemas.clear();
        assert_eq!(apply_prefix(&document, "Orders"), document);
    }

    #[test]
    fn schema_keys_and_references_are_renamed_together() {
        let renamed = apply_prefix(&doc(), "Orders");

        let keys: Vec<&str> = renamed.components.schemas.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["OrdersOrder", "OrdersCustomer"]);

        let SchemaOrRef::Inline(order) = &renamed.components.schemas["OrdersOrder"] else {
            panic!("expected inline schema");
        };
        assert_eq!(
            ref_of(&order.properties["customer"]),
            "#/components/schemas/OrdersCustomer"
        );

        let SchemaOrRef::Inline(customer) = &renamed.components.schemas["OrdersCustomer"] else {
            panic!("expected inline schema");
        };
        assert_eq!(
            ref_of(&customer.all_of[0]),
            "#/components/schemas/OrdersOrder"
        );
    }

    #[test]
    fn references_are_matched_case_insensitively() {
        let renamed = apply_prefix(&doc(), "Orders");
        let get = renamed.paths["/orders"].get.as_ref().unwrap();
        let RefOr::Item(ok) = &get.responses["200"] else {
            panic!("expected inline response");
        };
        let SchemaOrRef::Inline(array) = ok.content["application/json"].schema.as_ref().unwrap()
        else {
            panic!("expected inline schema");
        };
        // The ref was lowercase "order"; it still lands on the renamed key.
        assert_eq!(
            ref_of(array.items.as_ref().unwrap()),
            "#/components/schemas/OrdersOrder"
        );
    }

    #[test]
    fn external_references_are_left_alone() {
        let renamed = apply_prefix(&doc(), "Orders");
        let SchemaOrRef::Inline(order) = &renamed.components.schemas["OrdersOrder"] else {
            panic!("expected inline schema");
        };
        assert_eq!(
            ref_of(&order.properties["external"]),
            "https://example.com/common.json#/Address"
        );
    }

    #[test]
    fn every_renamed_reference_resolves() {
        let renamed = apply_prefix(&doc(), "Orders");
        let text = serde_json::to_string(&renamed).unwrap();
        // No un-prefixed schema refs survive anywhere in the tree.
        assert!(!text.contains("#/components/schemas/Order\""));
        assert!(!text.contains("#/components/schemas/order\""));
        assert!(!text.contains("#/components/schemas/Customer\""));
    }

    #[test]
    fn references_inside_response_headers_and_links_are_rewritten() {
        let document = parse_document(
            r##"{
                "openapi": "3.0.1",
                "info": {"title": "meta", "version": "1"},
                "paths": {
                    "/things": {
                        "get": {
                            "responses": {
                                "200": {
                                    "description": "ok",
                                    "headers": {
                                        "X-Meta": {"schema": {"$ref": "#/components/schemas/Meta"}}
                                    }
                                }
                            }
                        }
                    }
                },
                "components": {
                    "schemas": {"Meta": {"type": "object"}},
                    "headers": {
                        "RateLimit": {"schema": {"$ref": "#/components/schemas/Meta"}}
                    }
                }
            }"##,
        )
        .unwrap();

        let renamed = apply_prefix(&document, "Svc");
        assert!(renamed.components.schemas.contains_key("SvcMeta"));

        let text = serde_json::to_string(&renamed).unwrap();
        // Both the inline response header and the opaque component header
        // now point at the renamed schema; no stale reference survives.
        assert!(!text.contains("#/components/schemas/Meta\""));
        assert_eq!(text.matches("#/components/schemas/SvcMeta").count(), 2);
    }

    #[test]
    fn case_colliding_schema_names_keep_the_first_target() {
        let document = parse_document(
            r##"{
                "openapi": "3.0.1",
                "info": {"title": "c", "version": "1"},
                "paths": {},
                "components": {
                    "schemas": {
                        "User": {"type": "object"},
                        "user": {
                            "type": "object",
                            "properties": {"self": {"$ref": "#/components/schemas/user"}}
                        }
                    }
                }
            }"##,
        )
        .unwrap();

        let renamed = apply_prefix(&document, "Svc");
        // Keys are prefixed independently; references resolve through the
        // first occurrence's target.
        assert!(renamed.components.schemas.contains_key("SvcUser"));
        assert!(renamed.components.schemas.contains_key("Svcuser"));
        let SchemaOrRef::Inline(lower) = &renamed.components.schemas["Svcuser"] else {
            panic!("expected inline schema");
        };
        assert_eq!(
            ref_of(&lower.properties["self"]),
            "#/components/schemas/SvcUser"
        );
    }

    #[test]
    fn rename_does_not_mutate_its_input() {
        let document = doc();
        let before = document.clone();
        let _ = apply_prefix(&document, "Orders");
        assert_eq!(document, before);
    }
}
