//! Drops unreachable paths and sweeps the component graph.
//!
//! After the reachable paths are rekeyed to their gateway paths, a
//! transitive closure walk from the retained operations decides which
//! components survive: schema references are followed through properties,
//! items, the composition keywords and additionalProperties, and opaque
//! component bodies are scanned for `$ref` strings so no dangling reference
//! is left behind.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use ravelin_model::reference::split_component_ref;
use ravelin_model::{
    Components, Document, MediaType, Operation, Parameter, PathItem, RefOr, RequestBody, Response,
    Schema, SchemaOrRef,
};
use ravelin_routing::ReachabilityReport;
use serde_json::Value;

/// Rebuild `document` keeping only the reachable paths (under their gateway
/// keys) and the components transitively referenced by them.
pub fn prune(document: &Document, report: &ReachabilityReport) -> Document {
    let mut paths = IndexMap::new();
    for (gateway_path, analysis) in &report.reachable {
        paths.insert(gateway_path.clone(), analysis.item.clone());
    }

    let mut sweep = Sweep::new(&document.components);
    for item in paths.values() {
        sweep.visit_path_item(item);
    }
    // Document-level security requirements root the security schemes.
    for requirement in &document.security {
        for scheme in requirement.keys() {
            sweep.mark(Kind::SecurityScheme, scheme);
        }
    }
    let reached = sweep.run();

    Document {
        openapi: document.openapi.clone(),
        info: document.info.clone(),
        servers: document.servers.clone(),
        paths,
        components: reached.filter(&document.components),
        security: document.security.clone(),
        tags: document.tags.clone(),
        external_docs: document.external_docs.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Schema,
    Response,
    Parameter,
    RequestBody,
    SecurityScheme,
    Header,
    Example,
    Link,
    Callback,
}

impl Kind {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "schemas" => Some(Kind::Schema),
            "responses" => Some(Kind::Response),
            "parameters" => Some(Kind::Parameter),
            "requestBodies" => Some(Kind::RequestBody),
            "securitySchemes" => Some(Kind::SecurityScheme),
            "headers" => Some(Kind::Header),
            "examples" => Some(Kind::Example),
            "links" => Some(Kind::Link),
            "callbacks" => Some(Kind::Callback),
            _ => None,
        }
    }
}

/// Names reached per component collection.
#[derive(Debug, Default)]
struct Reached {
    names: BTreeSet<(Kind, String)>,
}

impl Reached {
    fn contains(&self, kind: Kind, name: &str) -> bool {
        self.names.contains(&(kind, name.to_string()))
    }

    fn filter(&self, components: &Components) -> Components {
        Components {
            schemas: filter_map(&components.schemas, |n| self.contains(Kind::Schema, n)),
            responses: filter_map(&components.responses, |n| self.contains(Kind::Response, n)),
            parameters: filter_map(&components.parameters, |n| {
                self.contains(Kind::Parameter, n)
            }),
            request_bodies: filter_map(&components.request_bodies, |n| {
                self.contains(Kind::RequestBody, n)
            }),
            security_schemes: filter_map(&components.security_schemes, |n| {
                self.contains(Kind::SecurityScheme, n)
            }),
            headers: filter_map(&components.headers, |n| self.contains(Kind::Header, n)),
            examples: filter_map(&components.examples, |n| self.contains(Kind::Example, n)),
            links: filter_map(&components.links, |n| self.contains(Kind::Link, n)),
            callbacks: filter_map(&components.callbacks, |n| self.contains(Kind::Callback, n)),
        }
    }
}

fn filter_map<V: Clone>(map: &IndexMap<String, V>, keep: impl Fn(&str) -> bool) -> IndexMap<String, V> {
    map.iter()
        .filter(|(name, _)| keep(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Worklist-driven closure over the component graph.
struct Sweep<'a> {
    components: &'a Components,
    reached: Reached,
    queue: Vec<(Kind, String)>,
}

impl<'a> Sweep<'a> {
    fn new(components: &'a Components) -> Self {
        Self {
            components,
            reached: Reached::default(),
            queue: Vec::new(),
        }
    }

    fn run(mut self) -> Reached {
        while let Some((kind, name)) = self.queue.pop() {
            self.visit_component(kind, &name);
        }
        self.reached
    }

    fn mark(&mut self, kind: Kind, name: &str) {
        if self.reached.names.insert((kind, name.to_string())) {
            self.queue.push((kind, name.to_string()));
        }
    }

    fn visit_ref_str(&mut self, reference: &str) {
        if let Some((key, name)) = split_component_ref(reference) {
            if let Some(kind) = Kind::from_key(key) {
                self.mark(kind, name);
            }
        }
    }

    fn visit_component(&mut self, kind: Kind, name: &str) {
        match kind {
            Kind::Schema => {
                if let Some(schema) = self.components.schemas.get(name).cloned() {
                    self.visit_schema_or_ref(&schema);
                }
            }
            Kind::Response => {
                if let Some(response) = self.components.responses.get(name).cloned() {
                    match &response {
                        RefOr::Ref { reference } => self.visit_ref_str(reference),
                        RefOr::Item(r) => self.visit_response(r),
                    }
                }
            }
            Kind::Parameter => {
                if let Some(parameter) = self.components.parameters.get(name).cloned() {
                    self.visit_parameter_or_ref(&parameter);
                }
            }
            Kind::RequestBody => {
                if let Some(body) = self.components.request_bodies.get(name).cloned() {
                    match &body {
                        RefOr::Ref { reference } => self.visit_ref_str(reference),
                        RefOr::Item(b) => self.visit_request_body(b),
                    }
                }
            }
            Kind::SecurityScheme => {
                if let Some(value) = self.components.security_schemes.get(name).cloned() {
                    self.visit_value(&value);
                }
            }
            Kind::Header => {
                if let Some(value) = self.components.headers.get(name).cloned() {
                    self.visit_value(&value);
                }
            }
            Kind::Example => {
                if let Some(value) = self.components.examples.get(name).cloned() {
                    self.visit_value(&value);
                }
            }
            Kind::Link => {
                if let Some(value) = self.components.links.get(name).cloned() {
                    self.visit_value(&value);
                }
            }
            Kind::Callback => {
                if let Some(value) = self.components.callbacks.get(name).cloned() {
                    self.visit_value(&value);
                }
            }
        }
    }

    fn visit_path_item(&mut self, item: &PathItem) {
        for parameter in &item.parameters {
            self.visit_parameter_or_ref(parameter);
        }
        for (_, operation) in item.operations() {
            self.visit_operation(operation);
        }
    }

    fn visit_operation(&mut self, operation: &Operation) {
        for parameter in &operation.parameters {
            self.visit_parameter_or_ref(parameter);
        }
        if let Some(body) = &operation.request_body {
            match body {
                RefOr::Ref { reference } => self.visit_ref_str(reference),
                RefOr::Item(b) => self.visit_request_body(b),
            }
        }
        for response in operation.responses.values() {
            match response {
                RefOr::Ref { reference } => self.visit_ref_str(reference),
                RefOr::Item(r) => self.visit_response(r),
            }
        }
        for requirement in &operation.security {
            for scheme in requirement.keys() {
                self.mark(Kind::SecurityScheme, scheme);
            }
        }
    }

    fn visit_parameter_or_ref(&mut self, parameter: &RefOr<Parameter>) {
        match parameter {
            RefOr::Ref { reference } => self.visit_ref_str(reference),
            RefOr::Item(p) => {
                if let Some(schema) = &p.schema {
                    self.visit_schema_or_ref(schema);
                }
            }
        }
    }

    fn visit_request_body(&mut self, body: &RequestBody) {
        for media in body.content.values() {
            self.visit_media_type(media);
        }
    }

    fn visit_response(&mut self, response: &Response) {
        for media in response.content.values() {
            self.visit_media_type(media);
        }
        for value in response.headers.values() {
            self.visit_value(value);
        }
        for value in response.links.values() {
            self.visit_value(value);
        }
    }

    fn visit_media_type(&mut self, media: &MediaType) {
        if let Some(schema) = &media.schema {
            self.visit_schema_or_ref(schema);
        }
        for value in media.extra.values() {
            self.visit_value(value);
        }
    }

    fn visit_schema_or_ref(&mut self, schema: &SchemaOrRef) {
        match schema {
            SchemaOrRef::Ref { reference } => self.visit_ref_str(reference),
            SchemaOrRef::Inline(inline) => self.visit_schema(inline),
        }
    }

    fn visit_schema(&mut self, schema: &Schema) {
        for nested in schema.properties.values() {
            self.visit_schema_or_ref(nested);
        }
        if let Some(items) = &schema.items {
            self.visit_schema_or_ref(items);
        }
        for nested in schema
            .all_of
            .iter()
            .chain(&schema.one_of)
            .chain(&schema.any_of)
        {
            self.visit_schema_or_ref(nested);
        }
        if let Some(not) = &schema.not {
            self.visit_schema_or_ref(not);
        }
        if let Some(ravelin_model::AdditionalProperties::Schema(nested)) =
            &schema.additional_properties
        {
            self.visit_schema_or_ref(nested);
        }
        for value in schema.extra.values() {
            self.visit_value(value);
        }
    }

    /// Chase `$ref` strings inside opaque values.
    fn visit_value(&mut self, value: &Value) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    self.visit_ref_str(reference);
                }
                for nested in map.values() {
                    self.visit_value(nested);
                }
            }
            Value::Array(items) => {
                for nested in items {
                    self.visit_value(nested);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravelin_model::parse_document;
    use ravelin_routing::{
        analyze_document, Cluster, ClusterMetadata, NonAnalyzableStrategy, PathTransform, Route,
        RouteMetadata, ServiceMapping,
    };

    fn doc() -> Document {
        parse_document(
            r##"{
                "openapi": "3.0.1",
                "info": {"title": "inventory", "version": "1"},
                "security": [{"bearer": []}],
                "paths": {
                    "/svc/items": {
                        "get": {
                            "parameters": [{"$ref": "#/components/parameters/Page"}],
                            "responses": {
                                "200": {
                                    "description": "ok",
                                    "content": {
                                        "application/json": {
                                            "schema": {"$ref": "#/components/schemas/Item"}
                                        }
                                    }
                                },
                                "404": {"$ref": "#/components/responses/NotFound"}
                            }
                        },
                        "post": {
                            "requestBody": {"$ref": "#/components/requestBodies/CreateItem"},
                            "responses": {"201": {"description": "created"}}
                        }
                    },
                    "/svc/internal/audit": {
                        "get": {
                            "responses": {
                                "200": {
                                    "description": "ok",
                                    "content": {
                                        "application/json": {
                                            "schema": {"$ref": "#/components/schemas/AuditRecord"}
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "components": {
                    "schemas": {
                        "Item": {
                            "type": "object",
                            "properties": {
                                "price": {"$ref": "#/components/schemas/Price"},
                                "tags": {"type": "array", "items": {"type": "string"}}
                            }
                        },
                        "Price": {"type": "number"},
                        "AuditRecord": {"type": "object"},
                        "Orphan": {"type": "string"}
                    },
                    "responses": {
                        "NotFound": {
                            "description": "missing",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Error"}
                                }
                            }
                        }
                    },
                    "parameters": {
                        "Page": {"name": "page", "in": "query", "schema": {"type": "integer"}}
                    },
                    "requestBodies": {
                        "CreateItem": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/Item"}
                                }
                            }
                        }
                    },
                    "securitySchemes": {
                        "bearer": {"type": "http", "scheme": "bearer"},
                        "legacyKey": {"type": "apiKey", "in": "header", "name": "X-Key"}
                    }
                }
            }"##,
        )
        .unwrap()
    }

    fn add_error_schema(document: &mut Document) {
        let error: SchemaOrRef = serde_json::from_str(r#"{"type": "object"}"#).unwrap();
        document
            .components
            .schemas
            .insert("Error".to_string(), error);
    }

    fn report_for(document: &Document, reachable_prefix: &str) -> ReachabilityReport {
        let mappings = vec![ServiceMapping {
            route: Route {
                id: "r1".to_string(),
                cluster_id: "c1".to_string(),
                match_path: "/api/{**rest}".to_string(),
                transforms: vec![PathTransform::PathPrefix(reachable_prefix.to_string())],
                metadata: RouteMetadata::default(),
            },
            cluster: Cluster {
                id: "c1".to_string(),
                destinations: vec!["http://backend".to_string()],
                metadata: ClusterMetadata::default(),
            },
        }];
        analyze_document(document, &mappings, NonAnalyzableStrategy::IncludeWithWarning)
    }

    #[test]
    fn keeps_reachable_paths_under_gateway_keys() {
        let mut document = doc();
        add_error_schema(&mut document);
        let report = report_for(&document, "/svc/items");
        let pruned = prune(&document, &report);

        assert!(pruned.paths.contains_key("/api"));
        assert!(!pruned.paths.contains_key("/svc/items"));
        assert!(!pruned.paths.contains_key("/svc/internal/audit"));
    }

    #[test]
    fn components_equal_the_reference_closure() {
        let mut document = doc();
        add_error_schema(&mut document);
        let report = report_for(&document, "/svc/items");
        let pruned = prune(&document, &report);

        let schemas: Vec<&str> = pruned.components.schemas.keys().map(String::as_str).collect();
        assert_eq!(schemas, vec!["Item", "Price", "Error"]);
        assert!(pruned.components.responses.contains_key("NotFound"));
        assert!(pruned.components.parameters.contains_key("Page"));
        assert!(pruned.components.request_bodies.contains_key("CreateItem"));
    }

    #[test]
    fn document_security_roots_security_schemes() {
        let mut document = doc();
        add_error_schema(&mut document);
        let report = report_for(&document, "/svc/items");
        let pruned = prune(&document, &report);

        assert!(pruned.components.security_schemes.contains_key("bearer"));
        assert!(!pruned.components.security_schemes.contains_key("legacyKey"));
    }

    #[test]
    fn nothing_reachable_empties_paths_and_components() {
        let document = doc();
        let report = report_for(&document, "/elsewhere");
        let pruned = prune(&document, &report);

        assert!(pruned.paths.is_empty());
        assert!(pruned.components.schemas.is_empty());
        // Document-level security still pins its scheme.
        assert!(pruned.components.security_schemes.contains_key("bearer"));
    }

    #[test]
    fn prune_does_not_mutate_its_input() {
        let mut document = doc();
        add_error_schema(&mut document);
        let before = document.clone();
        let report = report_for(&document, "/svc/items");
        let _ = prune(&document, &report);
        assert_eq!(document, before);
    }
}
