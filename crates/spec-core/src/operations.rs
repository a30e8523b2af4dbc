//! Operation extraction from dereferenced documents
//!
//! Flattens every `(path, method)` pair into a [`NormalizedOperation`]
//! with path-item and operation parameters merged, path params forced
//! required, and security fallback applied.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::types::*;

/// Flattens path items into a normalized operation list
pub struct OperationIndex;

impl OperationIndex {
    /// Extract all operations from a dereferenced document.
    ///
    /// Output is sorted by `(path, method)` so the derived command tree
    /// is deterministic.
    pub fn build(doc: &Value) -> Vec<NormalizedOperation> {
        let mut operations = Vec::new();

        let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
            return operations;
        };

        let doc_security = doc.get("security").map(parse_security);

        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };

            let shared_params: Vec<NormalizedParameter> = item
                .get("parameters")
                .and_then(Value::as_array)
                .map(|params| params.iter().filter_map(parse_parameter).collect())
                .unwrap_or_default();

            for method in HttpMethod::ALL {
                if let Some(op) = item.get(method.lower()) {
                    if let Some(normalized) =
                        extract_operation(path, method, op, &shared_params, doc_security.as_deref())
                    {
                        operations.push(normalized);
                    }
                }
            }
        }

        operations.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
        });

        debug!("extracted {} operations", operations.len());
        operations
    }
}

fn extract_operation(
    path: &str,
    method: HttpMethod,
    op: &Value,
    shared_params: &[NormalizedParameter],
    doc_security: Option<&[SecurityAlternative]>,
) -> Option<NormalizedOperation> {
    let obj = op.as_object()?;

    // Merge keyed on (location, name); operation-level entries win.
    let mut merged: IndexMap<(ParameterLocation, String), NormalizedParameter> = IndexMap::new();
    for param in shared_params {
        merged.insert((param.location, param.name.clone()), param.clone());
    }
    if let Some(params) = obj.get("parameters").and_then(Value::as_array) {
        for param in params.iter().filter_map(parse_parameter) {
            merged.insert((param.location, param.name.clone()), param);
        }
    }

    let security = match obj.get("security") {
        // An explicit empty array disables auth, so it must survive
        Some(value) => Some(parse_security(value)),
        None => doc_security.map(<[SecurityAlternative]>::to_vec),
    };

    Some(NormalizedOperation {
        method,
        path: path.to_string(),
        operation_id: obj
            .get("operationId")
            .and_then(Value::as_str)
            .map(String::from),
        tags: obj
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        summary: obj.get("summary").and_then(Value::as_str).map(String::from),
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        deprecated: obj
            .get("deprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        security,
        parameters: merged.into_values().collect(),
        request_body: obj.get("requestBody").and_then(parse_request_body),
    })
}

fn parse_parameter(value: &Value) -> Option<NormalizedParameter> {
    let obj = value.as_object()?;
    let name = obj.get("name").and_then(Value::as_str)?;
    if name.is_empty() {
        return None;
    }
    let location = ParameterLocation::parse(obj.get("in").and_then(Value::as_str)?)?;

    Some(NormalizedParameter {
        name: name.to_string(),
        location,
        // Path parameters are required no matter what the source says
        required: location == ParameterLocation::Path
            || obj.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        schema: obj.get("schema").cloned(),
    })
}

fn parse_request_body(value: &Value) -> Option<NormalizedRequestBody> {
    let obj = value.as_object()?;
    let content = obj.get("content").and_then(Value::as_object)?;

    let mut content_types = Vec::with_capacity(content.len());
    let mut schemas = IndexMap::with_capacity(content.len());
    for (content_type, media) in content {
        content_types.push(content_type.clone());
        let schema = media.get("schema").cloned().unwrap_or(Value::Null);
        schemas.insert(content_type.clone(), schema);
    }

    Some(NormalizedRequestBody {
        required: obj
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        content_types,
        schemas,
    })
}

fn parse_security(value: &Value) -> Vec<SecurityAlternative> {
    value
        .as_array()
        .map(|alts| {
            alts.iter()
                .filter_map(|alt| {
                    let obj = alt.as_object()?;
                    Some(SecurityAlternative {
                        requirements: obj
                            .iter()
                            .map(|(key, scopes)| SecurityRequirementRef {
                                key: key.clone(),
                                scopes: scopes
                                    .as_array()
                                    .map(|s| {
                                        s.iter()
                                            .filter_map(Value::as_str)
                                            .map(String::from)
                                            .collect()
                                    })
                                    .unwrap_or_default(),
                            })
                            .collect(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
