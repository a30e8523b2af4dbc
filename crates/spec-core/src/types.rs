//! Normalized types extracted from dereferenced OpenAPI documents

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods supported by OpenAPI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    /// All methods, in path-item scanning order
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Lowercase form, as used for path-item keys
    pub fn lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Trace => "trace",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter location in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

/// A parameter of a normalized operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedParameter {
    /// Parameter name
    pub name: String,
    /// Where the parameter is placed
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter is required (always true for path params)
    pub required: bool,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the parameter value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// Request body with per-content-type schemas, in document order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRequestBody {
    /// Whether the body is required
    pub required: bool,
    /// Declared content types, in document order
    pub content_types: Vec<String>,
    /// Schema per content type
    pub schemas: IndexMap<String, Value>,
}

impl NormalizedRequestBody {
    /// Preferred content type: exact `application/json`, else the first
    /// type containing `json`, else the first declared type.
    pub fn preferred_content_type(&self) -> Option<&str> {
        self.content_types
            .iter()
            .find(|ct| *ct == "application/json")
            .or_else(|| self.content_types.iter().find(|ct| ct.contains("json")))
            .or_else(|| self.content_types.first())
            .map(String::as_str)
    }

    /// Schema for the preferred content type
    pub fn preferred_schema(&self) -> Option<&Value> {
        self.preferred_content_type()
            .and_then(|ct| self.schemas.get(ct))
    }
}

/// One scheme reference inside a security alternative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRequirementRef {
    /// Security scheme key
    pub key: String,
    /// Required scopes (OAuth2)
    pub scopes: Vec<String>,
}

/// One alternative: every listed scheme must be satisfied together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAlternative {
    pub requirements: Vec<SecurityRequirementRef>,
}

/// A single HTTP operation flattened out of the spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOperation {
    /// HTTP method
    pub method: HttpMethod,
    /// URL path template (e.g. `/users/{id}`)
    pub path: String,
    /// Operation id from the spec, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Tags for grouping
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
    /// Effective security: operation-level wins, `Some(vec![])`
    /// explicitly disables auth, `None` means never declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityAlternative>>,
    /// Merged path-item and operation parameters
    pub parameters: Vec<NormalizedParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<NormalizedRequestBody>,
}

impl NormalizedOperation {
    /// Stable identity: `"METHOD path"`
    pub fn key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }

    /// Ordered `{name}` template variables in the path
    pub fn path_template_vars(&self) -> Vec<String> {
        template_vars(&self.path)
    }
}

/// A server variable declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVariable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
}

/// Server entry collected from any level of the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// URL template, possibly containing `{var}` placeholders
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared variable metadata
    pub variables: Vec<ServerVariable>,
    /// Ordered placeholder names scanned from the URL
    pub variable_names: Vec<String>,
}

/// Scan `{name}` placeholders out of a template, in order
pub fn template_vars(template: &str) -> Vec<String> {
    let mut vars = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start + 1..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + 1 + end];
        if !name.is_empty() {
            vars.push(name.to_string());
        }
        rest = &rest[start + end + 2..];
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_vars() {
        assert_eq!(template_vars("/a/{x}/b/{y}"), vec!["x", "y"]);
        assert_eq!(template_vars("/plain"), Vec::<String>::new());
        assert_eq!(template_vars("https://{region}.api.example.com"), vec!["region"]);
    }

    #[test]
    fn test_preferred_content_type() {
        let mut schemas = IndexMap::new();
        schemas.insert("text/plain".to_string(), json!({}));
        schemas.insert("application/vnd.api+json".to_string(), json!({}));
        let body = NormalizedRequestBody {
            required: false,
            content_types: vec![
                "text/plain".to_string(),
                "application/vnd.api+json".to_string(),
            ],
            schemas,
        };
        assert_eq!(body.preferred_content_type(), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_operation_key() {
        let op = NormalizedOperation {
            method: HttpMethod::Get,
            path: "/users/{id}".to_string(),
            operation_id: None,
            tags: vec![],
            summary: None,
            description: None,
            deprecated: false,
            security: None,
            parameters: vec![],
            request_body: None,
        };
        assert_eq!(op.key(), "GET /users/{id}");
    }
}
