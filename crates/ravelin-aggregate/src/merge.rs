//! Merging per-service documents into one aggregate.
//!
//! Inputs arrive already pruned and prefixed, so genuine collisions are rare.
//! When two documents still disagree on a path operation or a component, the
//! first occurrence wins and the disagreement is reported as a conflict.

use std::fmt;

use indexmap::IndexMap;
use ravelin_model::{Document, Info, Tag};
use ravelin_telemetry::events;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no documents to merge")]
    NoDocuments,

    #[error("service name must not be blank")]
    BlankServiceName,
}

/// A disagreement between two input documents. The earlier document's value
/// was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeConflict {
    DuplicateOperation { path: String, method: String },
    DuplicateComponent { collection: &'static str, name: String },
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOperation { path, method } => write!(
                f,
                "duplicate operation {} {path}, kept the first",
                method.to_uppercase()
            ),
            Self::DuplicateComponent { collection, name } => {
                write!(f, "duplicate {collection} component '{name}', kept the first")
            }
        }
    }
}

/// Merge `documents` into a single document titled `service_name`.
///
/// A single input passes through retitled. With several inputs the version
/// comes from the first document, servers are deduplicated by URL, tags by
/// name (both case-insensitively, order preserved), document-level security
/// requirements are concatenated and paths and components are unioned with
/// first-wins on collisions.
pub fn merge(
    documents: &[Document],
    service_name: &str,
) -> Result<(Document, Vec<MergeConflict>), MergeError> {
    if documents.is_empty() {
        return Err(MergeError::NoDocuments);
    }
    if service_name.trim().is_empty() {
        return Err(MergeError::BlankServiceName);
    }

    if let [only] = documents {
        let mut merged = only.clone();
        merged.info.title = service_name.to_string();
        return Ok((merged, Vec::new()));
    }

    let mut conflicts = Vec::new();
    let mut merged = Document {
        openapi: documents[0].openapi.clone(),
        info: Info {
            title: service_name.to_string(),
            version: documents[0].info.version.clone(),
            description: synthesized_description(documents, service_name),
        },
        servers: Vec::new(),
        paths: IndexMap::new(),
        components: Default::default(),
        security: Vec::new(),
        tags: Vec::new(),
        external_docs: documents[0].external_docs.clone(),
    };

    for document in documents {
        merge_servers(&mut merged, document);
        merge_tags(&mut merged, document);
        merged.security.extend(document.security.iter().cloned());
        merge_paths(&mut merged, document, &mut conflicts);
        merge_components(&mut merged, document, &mut conflicts);
    }

    for conflict in &conflicts {
        tracing::warn!(
            event = events::MERGE_CONFLICT,
            service_name = %service_name,
            conflict = %conflict,
            "merge conflict, kept the first occurrence"
        );
    }

    Ok((merged, conflicts))
}

fn synthesized_description(documents: &[Document], service_name: &str) -> Option<String> {
    documents
        .iter()
        .any(|d| d.info.description.is_some())
        .then(|| {
            format!(
                "Aggregated API for {service_name}. Combined from {} service(s).",
                documents.len()
            )
        })
}

fn merge_servers(merged: &mut Document, document: &Document) {
    for server in &document.servers {
        let seen = merged
            .servers
            .iter()
            .any(|s| s.url.eq_ignore_ascii_case(&server.url));
        if !seen {
            merged.servers.push(server.clone());
        }
    }
}

fn merge_tags(merged: &mut Document, document: &Document) {
    for tag in &document.tags {
        let seen = merged
            .tags
            .iter()
            .any(|t: &Tag| t.name.eq_ignore_ascii_case(&tag.name));
        if !seen {
            merged.tags.push(tag.clone());
        }
    }
}

fn merge_paths(merged: &mut Document, document: &Document, conflicts: &mut Vec<MergeConflict>) {
    for (path, item) in &document.paths {
        let Some(existing) = merged.paths.get_mut(path) else {
            merged.paths.insert(path.clone(), item.clone());
            continue;
        };
        for (method, operation) in item.operations() {
            match existing.operation(method) {
                None => existing.set_operation(method, operation.clone()),
                Some(kept) if kept == operation => {}
                Some(_) => conflicts.push(MergeConflict::DuplicateOperation {
                    path: path.clone(),
                    method: method.to_string(),
                }),
            }
        }
    }
}

fn merge_components(
    merged: &mut Document,
    document: &Document,
    conflicts: &mut Vec<MergeConflict>,
) {
    merge_collection(
        &mut merged.components.schemas,
        &document.components.schemas,
        "schemas",
        conflicts,
    );
    merge_collection(
        &mut merged.components.responses,
        &document.components.responses,
        "responses",
        conflicts,
    );
    merge_collection(
        &mut merged.components.parameters,
        &document.components.parameters,
        "parameters",
        conflicts,
    );
    merge_collection(
        &mut merged.components.request_bodies,
        &document.components.request_bodies,
        "requestBodies",
        conflicts,
    );
    merge_collection(
        &mut merged.components.security_schemes,
        &document.components.security_schemes,
        "securitySchemes",
        conflicts,
    );
    merge_collection(
        &mut merged.components.headers,
        &document.components.headers,
        "headers",
        conflicts,
    );
    merge_collection(
        &mut merged.components.examples,
        &document.components.examples,
        "examples",
        conflicts,
    );
    merge_collection(
        &mut merged.components.links,
        &document.components.links,
        "links",
        conflicts,
    );
    merge_collection(
        &mut merged.components.callbacks,
        &document.components.callbacks,
        "callbacks",
        conflicts,
    );
}

fn merge_collection<V: Clone + PartialEq>(
    target: &mut IndexMap<String, V>,
    source: &IndexMap<String, V>,
    collection: &'static str,
    conflicts: &mut Vec<MergeConflict>,
) {
    for (name, value) in source {
        match target.get(name) {
            None => {
                target.insert(name.clone(), value.clone());
            }
            Some(kept) if kept == value => {}
            Some(_) => conflicts.push(MergeConflict::DuplicateComponent {
                collection,
                name: name.clone(),
            }),
        }
    }
}
