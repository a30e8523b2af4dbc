//! Parameter and body-flag derivation
//!
//! Path parameters become positionals, everything else becomes kebab
//! flags, and JSON request bodies with scalar leaves become
//! dot-notation body flags. Also builds the per-location JSON Schemas
//! used to validate an invocation before any I/O happens.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use spec_core::{
    kebab_case, NormalizedOperation, NormalizedRequestBody, ParameterLocation,
};

/// Built-in flag every action reserves
pub const CURL_FLAG: &str = "--curl";

/// Maximum nesting depth walked for body flags
const MAX_BODY_DEPTH: usize = 10;

/// How a parameter surfaces on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Positional,
    Flag,
}

/// Coarse value type extracted from a parameter schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Unknown,
}

impl ParamType {
    /// Extract a type from a schema, tolerating OpenAPI 3.1 type arrays
    /// (the first non-`"null"` entry wins).
    pub fn from_schema(schema: Option<&Value>) -> ParamType {
        let Some(type_field) = schema.and_then(|s| s.get("type")) else {
            return ParamType::Unknown;
        };
        match type_field {
            Value::String(name) => Self::from_name(name),
            Value::Array(names) => names
                .iter()
                .filter_map(Value::as_str)
                .find(|name| *name != "null")
                .map(Self::from_name)
                .unwrap_or(ParamType::Unknown),
            _ => ParamType::Unknown,
        }
    }

    fn from_name(name: &str) -> ParamType {
        match name {
            "string" => ParamType::String,
            "number" => ParamType::Number,
            "integer" => ParamType::Integer,
            "boolean" => ParamType::Boolean,
            "array" => ParamType::Array,
            "object" => ParamType::Object,
            _ => ParamType::Unknown,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Number | ParamType::Integer | ParamType::Boolean
        )
    }
}

/// A derived positional or flag parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub kind: ParamKind,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Original parameter name from the spec
    pub name: String,
    /// Long flag form, `--` + kebab-case name
    pub flag: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ParamType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_format: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub item_enum: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ParamSpec {
    /// camelCase key the CLI parser stores this flag's value under
    pub fn lookup_key(&self) -> String {
        spec_core::camel_case(self.flag.trim_start_matches('-'))
    }
}

/// A flag generated from a scalar leaf of the request body schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyFlagDef {
    /// `--` + dot-joined path
    pub flag: String,
    /// Path segments into the body object
    pub path: Vec<String>,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

impl BodyFlagDef {
    /// Dotted key the CLI parser stores this flag's value under
    pub fn lookup_key(&self) -> String {
        self.path.join(".")
    }
}

/// Per-location validation schemas; `None` when a location has no
/// declared parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSchemas {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
}

/// Derive positionals and flags for an operation.
///
/// Positionals follow the path template order; flags are sorted by
/// `(location, name)`.
pub fn derive_params(op: &NormalizedOperation) -> (Vec<ParamSpec>, Vec<ParamSpec>) {
    let template_vars = op.path_template_vars();

    let positionals: Vec<ParamSpec> = template_vars
        .iter()
        .map(|var| {
            let declared = op
                .parameters
                .iter()
                .find(|p| p.location == ParameterLocation::Path && p.name == *var);
            match declared {
                Some(param) => build_spec(ParamKind::Positional, param.name.clone(), param.location, true, param.description.clone(), param.schema.as_ref()),
                // Undeclared template variables still need a positional
                None => build_spec(ParamKind::Positional, var.clone(), ParameterLocation::Path, true, None, None),
            }
        })
        .collect();

    let mut flags: Vec<ParamSpec> = op
        .parameters
        .iter()
        .filter(|p| p.location != ParameterLocation::Path)
        .map(|param| {
            build_spec(
                ParamKind::Flag,
                param.name.clone(),
                param.location,
                param.required,
                param.description.clone(),
                param.schema.as_ref(),
            )
        })
        .collect();
    flags.sort_by(|a, b| a.location.cmp(&b.location).then_with(|| a.name.cmp(&b.name)));

    (positionals, flags)
}

fn build_spec(
    kind: ParamKind,
    name: String,
    location: ParameterLocation,
    required: bool,
    description: Option<String>,
    schema: Option<&Value>,
) -> ParamSpec {
    let param_type = ParamType::from_schema(schema);
    let items = schema.and_then(|s| s.get("items"));

    ParamSpec {
        kind,
        location,
        flag: format!("--{}", kebab_case(&name)),
        required,
        param_type,
        format: schema
            .and_then(|s| s.get("format"))
            .and_then(Value::as_str)
            .map(String::from),
        enum_values: string_enum(schema),
        item_type: (param_type == ParamType::Array).then(|| ParamType::from_schema(items)),
        item_format: items
            .and_then(|i| i.get("format"))
            .and_then(Value::as_str)
            .map(String::from),
        item_enum: string_enum(items),
        description,
        schema: schema.cloned(),
        name,
    }
}

/// Only string-valued enum members surface
fn string_enum(schema: Option<&Value>) -> Vec<String> {
    schema
        .and_then(|s| s.get("enum"))
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Generate dot-notation body flags from the preferred JSON body schema.
///
/// Only scalar leaves produce flags; arrays and non-object leaves are
/// not expanded. Names colliding with operation flags or `--curl` are
/// skipped.
pub fn derive_body_flags(
    body: Option<&NormalizedRequestBody>,
    operation_flags: &[ParamSpec],
) -> Vec<BodyFlagDef> {
    let Some(schema) = body.and_then(NormalizedRequestBody::preferred_schema) else {
        return Vec::new();
    };

    // Only JSON-family bodies can be assembled from flags
    let json_family = body
        .and_then(NormalizedRequestBody::preferred_content_type)
        .is_some_and(|ct| ct.contains("json"));
    if !json_family {
        return Vec::new();
    }

    let shape = ParamType::from_schema(Some(schema));
    if shape != ParamType::Object && schema.get("properties").is_none() {
        return Vec::new();
    }

    let mut taken: HashSet<String> = operation_flags.iter().map(|f| f.flag.clone()).collect();
    taken.insert(CURL_FLAG.to_string());

    let mut flags = Vec::new();
    let mut prefix = Vec::new();
    walk_body_schema(schema, &mut prefix, true, &taken, &mut flags, 0);
    flags
}

fn walk_body_schema(
    schema: &Value,
    prefix: &mut Vec<String>,
    ancestors_required: bool,
    taken: &HashSet<String>,
    out: &mut Vec<BodyFlagDef>,
    depth: usize,
) {
    if depth > MAX_BODY_DEPTH {
        return;
    }
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let required: HashSet<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for (name, prop) in properties {
        let leaf_required = ancestors_required && required.contains(name.as_str());
        let param_type = ParamType::from_schema(Some(prop));
        prefix.push(name.clone());

        if param_type == ParamType::Object {
            walk_body_schema(prop, prefix, leaf_required, taken, out, depth + 1);
        } else if param_type.is_scalar() {
            let flag = format!("--{}", prefix.join("."));
            if !taken.contains(&flag) {
                out.push(BodyFlagDef {
                    flag,
                    path: prefix.clone(),
                    param_type,
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    required: leaf_required,
                });
            }
        }

        prefix.pop();
    }
}

/// Build the query/header/cookie validation schemas for an action
pub fn derive_validation_schemas(flags: &[ParamSpec]) -> ValidationSchemas {
    ValidationSchemas {
        query: location_schema(flags, ParameterLocation::Query),
        header: location_schema(flags, ParameterLocation::Header),
        cookie: location_schema(flags, ParameterLocation::Cookie),
    }
}

fn location_schema(flags: &[ParamSpec], location: ParameterLocation) -> Option<Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for spec in flags.iter().filter(|f| f.location == location) {
        properties.insert(
            spec.name.clone(),
            spec.schema.clone().unwrap_or_else(|| json!({})),
        );
        if spec.required {
            required.push(Value::String(spec.name.clone()));
        }
    }

    if properties.is_empty() {
        return None;
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Some(Value::Object(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use spec_core::{HttpMethod, NormalizedParameter};

    fn op_with_params(params: Vec<NormalizedParameter>, path: &str) -> NormalizedOperation {
        NormalizedOperation {
            method: HttpMethod::Get,
            path: path.to_string(),
            operation_id: None,
            tags: vec![],
            summary: None,
            description: None,
            deprecated: false,
            security: None,
            parameters: params,
            request_body: None,
        }
    }

    fn param(name: &str, location: ParameterLocation, required: bool, schema: Value) -> NormalizedParameter {
        NormalizedParameter {
            name: name.to_string(),
            location,
            required,
            description: None,
            schema: Some(schema),
        }
    }

    fn json_body(schema: Value) -> NormalizedRequestBody {
        let mut schemas = IndexMap::new();
        schemas.insert("application/json".to_string(), schema);
        NormalizedRequestBody {
            required: true,
            content_types: vec!["application/json".to_string()],
            schemas,
        }
    }

    #[test]
    fn test_positionals_follow_template_order() {
        let op = op_with_params(
            vec![
                param("y", ParameterLocation::Path, true, json!({"type": "string"})),
                param("x", ParameterLocation::Path, true, json!({"type": "string"})),
            ],
            "/a/{x}/b/{y}",
        );
        let (positionals, _) = derive_params(&op);
        let names: Vec<&str> = positionals.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(positionals.iter().all(|p| p.required));
    }

    #[test]
    fn test_undeclared_template_var_synthesized() {
        let op = op_with_params(vec![], "/users/{id}");
        let (positionals, _) = derive_params(&op);
        assert_eq!(positionals.len(), 1);
        assert_eq!(positionals[0].name, "id");
        assert_eq!(positionals[0].param_type, ParamType::Unknown);
    }

    #[test]
    fn test_flags_kebab_cased_and_sorted() {
        let op = op_with_params(
            vec![
                param("xRequestId", ParameterLocation::Header, false, json!({"type": "string"})),
                param("limit", ParameterLocation::Query, false, json!({"type": "integer"})),
                param("after", ParameterLocation::Query, false, json!({"type": "string"})),
            ],
            "/items",
        );
        let (_, flags) = derive_params(&op);
        let flag_names: Vec<&str> = flags.iter().map(|f| f.flag.as_str()).collect();
        // Query before header, names alphabetical within a location
        assert_eq!(flag_names, vec!["--after", "--limit", "--x-request-id"]);
        assert_eq!(flags[2].lookup_key(), "xRequestId");
    }

    #[test]
    fn test_openapi_31_type_array() {
        let spec = ParamType::from_schema(Some(&json!({"type": ["string", "null"]})));
        assert_eq!(spec, ParamType::String);
        let none = ParamType::from_schema(Some(&json!({"type": ["null"]})));
        assert_eq!(none, ParamType::Unknown);
    }

    #[test]
    fn test_array_item_metadata() {
        let op = op_with_params(
            vec![param(
                "tag",
                ParameterLocation::Query,
                false,
                json!({"type": "array", "items": {"type": "string", "enum": ["a", "b", 3]}}),
            )],
            "/items",
        );
        let (_, flags) = derive_params(&op);
        assert_eq!(flags[0].param_type, ParamType::Array);
        assert_eq!(flags[0].item_type, Some(ParamType::String));
        // Only string-valued members surface
        assert_eq!(flags[0].item_enum, vec!["a", "b"]);
    }

    #[test]
    fn test_body_flags_nested() {
        let body = json_body(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "description": "Full name"},
                "address": {
                    "type": "object",
                    "properties": {
                        "street": {"type": "string"},
                        "city": {"type": "string"}
                    }
                },
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        }));

        let flags = derive_body_flags(Some(&body), &[]);
        let names: Vec<&str> = flags.iter().map(|f| f.flag.as_str()).collect();
        assert!(names.contains(&"--name"));
        assert!(names.contains(&"--address.street"));
        assert!(names.contains(&"--address.city"));
        // Arrays are not expanded
        assert!(!names.iter().any(|n| n.starts_with("--tags")));

        let name = flags.iter().find(|f| f.flag == "--name").unwrap();
        assert!(name.required);
        assert_eq!(name.description, "Full name");

        let city = flags.iter().find(|f| f.flag == "--address.city").unwrap();
        assert!(!city.required);
        assert_eq!(city.path, vec!["address", "city"]);
    }

    #[test]
    fn test_body_flag_collision_skipped() {
        let body = json_body(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "curl": {"type": "string"},
                "other": {"type": "string"}
            }
        }));
        let op = op_with_params(
            vec![param("name", ParameterLocation::Query, false, json!({"type": "string"}))],
            "/contacts",
        );
        let (_, op_flags) = derive_params(&op);

        let flags = derive_body_flags(Some(&body), &op_flags);
        let names: Vec<&str> = flags.iter().map(|f| f.flag.as_str()).collect();
        assert_eq!(names, vec!["--other"]);
    }

    #[test]
    fn test_body_flags_require_json_family() {
        let mut schemas = IndexMap::new();
        schemas.insert(
            "text/plain".to_string(),
            json!({"type": "object", "properties": {"a": {"type": "string"}}}),
        );
        let body = NormalizedRequestBody {
            required: false,
            content_types: vec!["text/plain".to_string()],
            schemas,
        };
        assert!(derive_body_flags(Some(&body), &[]).is_empty());
    }

    #[test]
    fn test_validation_schemas_per_location() {
        let op = op_with_params(
            vec![
                param("limit", ParameterLocation::Query, true, json!({"type": "integer"})),
                param("name", ParameterLocation::Query, false, json!({"type": "string"})),
                param("x-trace", ParameterLocation::Header, false, json!({"type": "string"})),
            ],
            "/contacts",
        );
        let (_, flags) = derive_params(&op);
        let schemas = derive_validation_schemas(&flags);

        let query = schemas.query.unwrap();
        assert_eq!(query["type"], "object");
        assert!(query["properties"]["limit"].is_object());
        assert_eq!(query["required"][0], "limit");

        let header = schemas.header.unwrap();
        assert!(header.get("required").is_none());

        assert!(schemas.cookie.is_none());
    }
}
