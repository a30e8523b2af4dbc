//! Security scheme registry
//!
//! Parses `components.securitySchemes` into a classified list used by
//! auth selection and `__schema` output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inflect::kebab_case;
use crate::types::ParameterLocation;

/// Classified kind of a security scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthKind {
    HttpBearer,
    HttpBasic,
    ApiKey,
    Oauth2,
    OpenIdConnect,
    Unknown,
}

impl AuthKind {
    /// Whether a plain bearer token satisfies this scheme
    pub fn is_bearer_compatible(&self) -> bool {
        matches!(
            self,
            AuthKind::HttpBearer | AuthKind::Oauth2 | AuthKind::OpenIdConnect
        )
    }
}

/// One OAuth2 flow with its endpoints and sorted scope names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthFlowInfo {
    /// Flow kind as named in the document (e.g. `authorizationCode`)
    pub flow: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    pub scopes: Vec<String>,
}

/// A parsed security scheme, keyed by its component name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthScheme {
    /// Scheme key from `components.securitySchemes`
    pub key: String,
    pub kind: AuthKind,
    /// API key parameter name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// API key location (header, query, or cookie)
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,
    /// Raw `scheme` field for HTTP auth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<Vec<OAuthFlowInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openid_connect_url: Option<String>,
}

/// Parses the document's security schemes
pub struct AuthRegistry;

impl AuthRegistry {
    /// Parse all schemes, sorted by kebab-cased key
    pub fn parse(doc: &Value) -> Vec<AuthScheme> {
        let mut schemes: Vec<AuthScheme> = doc
            .pointer("/components/securitySchemes")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, scheme)| parse_scheme(key, scheme))
                    .collect()
            })
            .unwrap_or_default();

        schemes.sort_by_key(|scheme| kebab_case(&scheme.key));
        schemes
    }
}

fn parse_scheme(key: &str, value: &Value) -> AuthScheme {
    let scheme_type = value.get("type").and_then(Value::as_str).unwrap_or("");
    let http_scheme = value.get("scheme").and_then(Value::as_str);
    let api_key_location = value
        .get("in")
        .and_then(Value::as_str)
        .and_then(ParameterLocation::parse)
        .filter(|location| *location != ParameterLocation::Path);

    let kind = match scheme_type {
        "http" => match http_scheme.map(str::to_ascii_lowercase).as_deref() {
            Some("bearer") => AuthKind::HttpBearer,
            Some("basic") => AuthKind::HttpBasic,
            _ => AuthKind::Unknown,
        },
        "apiKey" => {
            if api_key_location.is_some() {
                AuthKind::ApiKey
            } else {
                AuthKind::Unknown
            }
        }
        "oauth2" => AuthKind::Oauth2,
        "openIdConnect" => AuthKind::OpenIdConnect,
        _ => AuthKind::Unknown,
    };

    AuthScheme {
        key: key.to_string(),
        kind,
        name: value.get("name").and_then(Value::as_str).map(String::from),
        location: api_key_location,
        scheme: http_scheme.map(String::from),
        bearer_format: value
            .get("bearerFormat")
            .and_then(Value::as_str)
            .map(String::from),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        flows: value.get("flows").and_then(Value::as_object).map(|flows| {
            flows
                .iter()
                .filter_map(|(flow, decl)| parse_flow(flow, decl))
                .collect()
        }),
        openid_connect_url: value
            .get("openIdConnectUrl")
            .and_then(Value::as_str)
            .map(String::from),
    }
}

fn parse_flow(flow: &str, value: &Value) -> Option<OAuthFlowInfo> {
    let obj = value.as_object()?;

    let mut scopes: Vec<String> = obj
        .get("scopes")
        .and_then(Value::as_object)
        .map(|scopes| scopes.keys().cloned().collect())
        .unwrap_or_default();
    scopes.sort();

    Some(OAuthFlowInfo {
        flow: flow.to_string(),
        authorization_url: obj
            .get("authorizationUrl")
            .and_then(Value::as_str)
            .map(String::from),
        token_url: obj
            .get("tokenUrl")
            .and_then(Value::as_str)
            .map(String::from),
        refresh_url: obj
            .get("refreshUrl")
            .and_then(Value::as_str)
            .map(String::from),
        scopes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with_schemes(schemes: Value) -> Value {
        json!({"components": {"securitySchemes": schemes}})
    }

    #[test]
    fn test_classify_http_bearer() {
        let doc = doc_with_schemes(json!({
            "bearerAuth": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}
        }));
        let schemes = AuthRegistry::parse(&doc);
        assert_eq!(schemes.len(), 1);
        assert_eq!(schemes[0].kind, AuthKind::HttpBearer);
        assert_eq!(schemes[0].bearer_format.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_classify_api_key_and_bad_location() {
        let doc = doc_with_schemes(json!({
            "goodKey": {"type": "apiKey", "name": "X-API-Key", "in": "header"},
            "badKey": {"type": "apiKey", "name": "k", "in": "path"}
        }));
        let schemes = AuthRegistry::parse(&doc);

        let bad = schemes.iter().find(|s| s.key == "badKey").unwrap();
        assert_eq!(bad.kind, AuthKind::Unknown);

        let good = schemes.iter().find(|s| s.key == "goodKey").unwrap();
        assert_eq!(good.kind, AuthKind::ApiKey);
        assert_eq!(good.location, Some(ParameterLocation::Header));
    }

    #[test]
    fn test_oauth_flows_scopes_sorted() {
        let doc = doc_with_schemes(json!({
            "oauth": {
                "type": "oauth2",
                "flows": {
                    "authorizationCode": {
                        "authorizationUrl": "https://auth.example.com/authorize",
                        "tokenUrl": "https://auth.example.com/token",
                        "scopes": {"write": "w", "read": "r"}
                    }
                }
            }
        }));
        let schemes = AuthRegistry::parse(&doc);
        let flows = schemes[0].flows.as_ref().unwrap();
        assert_eq!(flows[0].flow, "authorizationCode");
        assert_eq!(flows[0].scopes, vec!["read", "write"]);
    }

    #[test]
    fn test_sorted_by_kebab_key() {
        let doc = doc_with_schemes(json!({
            "zScheme": {"type": "http", "scheme": "bearer"},
            "ApiKey": {"type": "apiKey", "name": "k", "in": "query"}
        }));
        let schemes = AuthRegistry::parse(&doc);
        let keys: Vec<&str> = schemes.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["ApiKey", "zScheme"]);
    }

    #[test]
    fn test_bearer_compatibility() {
        assert!(AuthKind::HttpBearer.is_bearer_compatible());
        assert!(AuthKind::Oauth2.is_bearer_compatible());
        assert!(!AuthKind::HttpBasic.is_bearer_compatible());
        assert!(!AuthKind::ApiKey.is_bearer_compatible());
    }
}
