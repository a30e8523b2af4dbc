//! `__schema` introspection payloads
//!
//! Produces a deterministic record describing the spec and the derived
//! command tree. Serialization is canonical (sorted keys, cycle-free)
//! so repeated runs emit identical bytes.

use serde_json::{json, Map, Value};

use spec_core::canonical_json;

use crate::SpecArtifacts;

/// Schema payload version
const SCHEMA_VERSION: u64 = 1;

/// Builds the `__schema` data payload
pub struct SchemaReport;

impl SchemaReport {
    /// Full report: everything, including raw operations and planning
    pub fn full(artifacts: &SpecArtifacts) -> Value {
        let mut report = Self::base(artifacts);
        report.insert(
            "operations".to_string(),
            serde_json::to_value(&artifacts.operations).unwrap_or(Value::Null),
        );
        report.insert(
            "planned".to_string(),
            Value::Array(
                artifacts
                    .planned
                    .iter()
                    .map(|plan| {
                        json!({
                            "resource": plan.resource,
                            "action": plan.action,
                            "canonicalAction": plan.canonical_action,
                            "aliasOf": plan.alias_of,
                            "style": plan.style,
                            "key": plan.operation.key(),
                        })
                    })
                    .collect(),
            ),
        );
        report.insert(
            "commandsIndex".to_string(),
            Value::Object(Self::commands_index(artifacts)),
        );
        Value::Object(report)
    }

    /// Minimal report: omits operations, planning, and the index
    pub fn minimal(artifacts: &SpecArtifacts) -> Value {
        Value::Object(Self::base(artifacts))
    }

    /// Canonical bytes of a report, byte-stable across runs
    pub fn to_canonical_json(report: &Value) -> String {
        canonical_json(report)
    }

    fn base(artifacts: &SpecArtifacts) -> Map<String, Value> {
        let spec = &artifacts.spec;
        let model = &artifacts.model;

        let mut report = Map::new();
        report.insert("schemaVersion".to_string(), json!(SCHEMA_VERSION));
        report.insert(
            "openapi".to_string(),
            json!({
                "version": spec.openapi_version(),
                "title": spec.title(),
                "infoVersion": spec.info_version(),
            }),
        );
        report.insert(
            "spec".to_string(),
            json!({
                "id": spec.spec_id,
                "fingerprint": spec.fingerprint,
                "source": spec.source.to_string(),
            }),
        );
        report.insert(
            "capabilities".to_string(),
            json!({
                "servers": artifacts.servers.len(),
                "auth": artifacts.auth_schemes.len(),
                "operations": artifacts.operations.len(),
                "commands": model.action_count(),
            }),
        );
        report.insert(
            "servers".to_string(),
            serde_json::to_value(&artifacts.servers).unwrap_or(Value::Null),
        );
        report.insert(
            "authSchemes".to_string(),
            serde_json::to_value(&artifacts.auth_schemes).unwrap_or(Value::Null),
        );
        report.insert(
            "commands".to_string(),
            serde_json::to_value(&model.resources).unwrap_or(Value::Null),
        );
        report
    }

    fn commands_index(artifacts: &SpecArtifacts) -> Map<String, Value> {
        let mut index = Map::new();
        for resource in &artifacts.model.resources {
            for action in &resource.actions {
                index.insert(
                    format!("{}:{}", resource.resource, action.action),
                    Value::String(action.id.clone()),
                );
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spec_core::{SpecLoader, SpecSource};

    const SPEC: &str = r#"
openapi: "3.0.0"
info: {title: Demo, version: "2.0"}
servers:
  - url: https://api.example.com
paths:
  /items:
    get: {operationId: listItems}
components:
  securitySchemes:
    bearerAuth: {type: http, scheme: bearer}
"#;

    fn artifacts() -> SpecArtifacts {
        let spec = SpecLoader::from_text(SPEC, SpecSource::Embedded).unwrap();
        SpecArtifacts::build(spec)
    }

    #[test]
    fn test_full_report_shape() {
        let artifacts = artifacts();
        let report = SchemaReport::full(&artifacts);

        assert_eq!(report["schemaVersion"], 1);
        assert_eq!(report["openapi"]["version"], "3.0.0");
        assert_eq!(report["openapi"]["title"], "Demo");
        assert_eq!(report["spec"]["id"], "demo");
        assert_eq!(report["capabilities"]["operations"], 1);
        assert_eq!(report["capabilities"]["commands"], 1);
        assert!(report["operations"].is_array());
        assert!(report["planned"].is_array());
        assert_eq!(
            report["commandsIndex"]["items:list"],
            artifacts.model.action("items", "list").unwrap().id
        );
    }

    #[test]
    fn test_minimal_omits_details() {
        let report = SchemaReport::minimal(&artifacts());
        assert!(report.get("operations").is_none());
        assert!(report.get("planned").is_none());
        assert!(report.get("commandsIndex").is_none());
        assert!(report.get("servers").is_some());
        assert!(report.get("authSchemes").is_some());
    }

    #[test]
    fn test_byte_stable_output() {
        let a = SchemaReport::to_canonical_json(&SchemaReport::full(&artifacts()));
        let b = SchemaReport::to_canonical_json(&SchemaReport::full(&artifacts()));
        assert_eq!(a, b);
    }
}
