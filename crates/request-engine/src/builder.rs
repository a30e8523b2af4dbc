//! Request building: server resolution, parameter placement,
//! validation, body assembly, and auth injection

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use command_model::{AuthSummary, CommandAction, ParamSpec, SpecArtifacts};
use spec_core::{template_vars, AuthKind, AuthScheme, HttpMethod, ParameterLocation};

use crate::body::{build_body_object, coerce_value, stringify};
use crate::error::{EngineError, EngineResult};
use crate::headers::HeaderMap;
use crate::profile::{Profile, ProfileStore, DEFAULT_PROFILE};
use crate::result::ValidationIssue;

/// Everything except alphanumerics and the RFC 3986 unreserved marks
/// gets percent-encoded in substituted path segments
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters kept visible at each end of a masked credential
const MASK_KEEP: usize = 3;

/// One parsed command invocation
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub resource: String,
    pub action: String,
    /// Positional values, in path template order
    pub positionals: Vec<String>,
    /// Flag values: camelCase keys for operation flags, dotted keys for
    /// body flags
    pub flags: Map<String, Value>,
    /// Render a curl command instead of executing
    pub curl: bool,
}

/// Root-level options shared by every action
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub server: Option<String>,
    pub server_vars: IndexMap<String, String>,
    /// Extra headers parsed from `Name: Value` arguments
    pub headers: Vec<(String, String)>,
    pub auth_scheme: Option<String>,
    pub bearer_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub profile: Option<String>,
    /// Opt-in: fall back to the first bearer-compatible alternative
    /// when a stored token exists and nothing else selected a scheme
    pub auto_bearer: bool,
}

/// Defaults baked into the binary at build time
#[derive(Debug, Clone, Default)]
pub struct EmbeddedDefaults {
    pub cli_name: Option<String>,
    pub server: Option<String>,
    pub server_vars: IndexMap<String, String>,
    pub auth_scheme: Option<String>,
    pub version: Option<String>,
}

/// A fully materialized request that has not been issued
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// curl equivalent with the Authorization value masked
    pub curl: String,
}

/// Outcome of a build: a request, or validation failures
#[derive(Debug)]
pub enum BuildOutcome {
    Prepared(PreparedRequest),
    Invalid(Vec<ValidationIssue>),
}

/// Builds [`PreparedRequest`]s for command actions
pub struct RequestBuilder<'a> {
    artifacts: &'a SpecArtifacts,
    embedded: &'a EmbeddedDefaults,
    globals: &'a GlobalOptions,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        artifacts: &'a SpecArtifacts,
        embedded: &'a EmbeddedDefaults,
        globals: &'a GlobalOptions,
    ) -> Self {
        Self {
            artifacts,
            embedded,
            globals,
        }
    }

    /// Build the request for one invocation.
    ///
    /// Input and schema violations come back as
    /// [`BuildOutcome::Invalid`]; server and auth problems are errors.
    pub async fn build(
        &self,
        action: &CommandAction,
        invocation: &Invocation,
        profiles: &dyn ProfileStore,
    ) -> EngineResult<BuildOutcome> {
        // Positionals map one-to-one onto path template variables
        if invocation.positionals.len() < action.raw_path_args.len() {
            let issues = action.raw_path_args[invocation.positionals.len()..]
                .iter()
                .map(|arg| ValidationIssue::new(arg.clone(), "missing required positional"))
                .collect();
            return Ok(BuildOutcome::Invalid(issues));
        }

        let profile = profiles.get_profile(self.globals.profile.as_deref()).await?;
        let profile_name = profile
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        let base_url = self.resolve_server(profile.as_ref())?;
        let path = self.substitute_path(action, &invocation.positionals);

        // Distribute declared flags into per-location buckets
        let mut query_pairs: Vec<(String, String)> = Vec::new();
        let mut header_values: Vec<(String, String)> = Vec::new();
        let mut cookie_values: Vec<(String, String)> = Vec::new();
        let mut instances = LocationInstances::default();
        let mut issues: Vec<ValidationIssue> = Vec::new();

        for spec in &action.flags {
            let Some(raw) = invocation.flags.get(&spec.lookup_key()) else {
                continue;
            };
            match coerce_flag_value(spec, raw) {
                Err(issue) => issues.push(issue),
                Ok(value) => {
                    instances.record(spec, &value);
                    place_value(spec, &value, &mut query_pairs, &mut header_values, &mut cookie_values);
                }
            }
        }

        // Schema validation per location
        issues.extend(validate_against(action.validation.query.as_ref(), &instances.query));
        issues.extend(validate_against(action.validation.header.as_ref(), &instances.header));
        issues.extend(validate_against(action.validation.cookie.as_ref(), &instances.cookie));

        // Body assembly
        let mut body: Option<String> = None;
        let mut content_type: Option<String> = None;
        match self.assemble_body(action, invocation) {
            Err(body_issues) => issues.extend(body_issues),
            Ok(Some((serialized, ct))) => {
                body = Some(serialized);
                content_type = ct;
            }
            Ok(None) => {}
        }

        if !issues.is_empty() {
            return Ok(BuildOutcome::Invalid(issues));
        }

        // Auth selection and application may add headers, query pairs,
        // or cookies, so it runs before final URL assembly
        let mut headers = HeaderMap::new();
        for (name, value) in &header_values {
            headers.set(name, value.clone());
        }
        for (name, value) in &self.globals.headers {
            headers.set(name, value.clone());
        }
        if let Some(ct) = &content_type {
            headers.set("Content-Type", ct.clone());
        }

        self.apply_auth(
            action,
            profile.as_ref(),
            &profile_name,
            profiles,
            &mut headers,
            &mut query_pairs,
            &mut cookie_values,
        )
        .await?;

        if !cookie_values.is_empty() {
            let cookie = cookie_values
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            headers.set("Cookie", cookie);
        }

        let url = assemble_url(&base_url, &path, &query_pairs)?;
        let curl = render_curl(action.method, &url, &headers, body.as_deref());

        debug!(method = %action.method, url = %url, "prepared request");

        Ok(BuildOutcome::Prepared(PreparedRequest {
            method: action.method,
            url,
            headers,
            body,
            curl,
        }))
    }

    /// First non-empty of CLI server, profile server, embedded default,
    /// and the spec's first server; then resolve `{var}` placeholders.
    fn resolve_server(&self, profile: Option<&Profile>) -> EngineResult<String> {
        let chosen = self
            .globals
            .server
            .clone()
            .or_else(|| profile.and_then(|p| p.server.clone()))
            .or_else(|| self.embedded.server.clone())
            .or_else(|| self.artifacts.servers.first().map(|s| s.url.clone()))
            .ok_or_else(|| {
                EngineError::Server("no server URL available; pass --server".to_string())
            })?;

        let vars = template_vars(&chosen);
        if vars.is_empty() {
            return Ok(chosen);
        }

        // Spec-declared defaults for this URL, if it is one of the
        // spec's servers
        let declared = self.artifacts.servers.iter().find(|s| s.url == chosen);

        let mut resolved = chosen.clone();
        let mut unresolved = Vec::new();
        for var in &vars {
            let value = self
                .globals
                .server_vars
                .get(var)
                .or_else(|| self.embedded.server_vars.get(var))
                .cloned()
                .or_else(|| {
                    declared.and_then(|server| {
                        server
                            .variables
                            .iter()
                            .find(|v| v.name == *var)
                            .and_then(|v| v.default.clone())
                    })
                });
            match value {
                Some(value) => resolved = resolved.replace(&format!("{{{}}}", var), &value),
                None => unresolved.push(var.clone()),
            }
        }

        if !unresolved.is_empty() {
            return Err(EngineError::Server(format!(
                "unresolved server variables: {}; pass --server-var name=value",
                unresolved.join(", ")
            )));
        }
        Ok(resolved)
    }

    /// Substitute positionals into the path template, URL-encoding each
    /// value at its site
    fn substitute_path(&self, action: &CommandAction, positionals: &[String]) -> String {
        let mut path = action.path.clone();
        for (raw_arg, value) in action.raw_path_args.iter().zip(positionals) {
            let encoded = utf8_percent_encode(value, PATH_SEGMENT).to_string();
            path = path.replace(&format!("{{{}}}", raw_arg), &encoded);
        }
        path
    }

    /// Assemble the body per the body-flag rules.
    ///
    /// Returns `Ok(Some((body, content_type)))` when a body should be
    /// sent, `Ok(None)` when not, and the issue list when required
    /// fields are missing or coercion fails.
    fn assemble_body(
        &self,
        action: &CommandAction,
        invocation: &Invocation,
    ) -> Result<Option<(String, Option<String>)>, Vec<ValidationIssue>> {
        let Some(request_body) = &action.request_body else {
            return Ok(None);
        };
        let content_type = request_body.preferred_content_type().map(String::from);

        let provided: Vec<_> = action
            .body_flags
            .iter()
            .filter_map(|def| invocation.flags.get(&def.lookup_key()).map(|v| (def, v)))
            .collect();

        let missing: Vec<ValidationIssue> = action
            .body_flags
            .iter()
            .filter(|def| def.required && !invocation.flags.contains_key(&def.lookup_key()))
            .map(|def| {
                let leaf = def.path.last().map(String::as_str).unwrap_or_default();
                ValidationIssue::missing_required(&def.path.join("."), leaf)
            })
            .collect();

        if provided.is_empty() {
            if !missing.is_empty() {
                return Err(missing);
            }
            if request_body.required {
                // An empty object satisfies a required body with no
                // required fields
                return Ok(Some(("{}".to_string(), content_type)));
            }
            return Ok(None);
        }

        // Body flags only exist for JSON-family content
        let json_family = content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"));
        if !json_family {
            return Err(vec![ValidationIssue::new(
                "body",
                "request body content type is not JSON",
            )]);
        }

        if !missing.is_empty() {
            return Err(missing);
        }

        let body = build_body_object(&provided)?;
        let body_value = Value::Object(body);

        if let Some(schema) = &action.request_body_schema {
            let schema_issues = validate_instance(schema, &body_value);
            if !schema_issues.is_empty() {
                return Err(schema_issues);
            }
        }

        let serialized = serde_json::to_string(&body_value)
            .map_err(|e| vec![ValidationIssue::new("body", e.to_string())])?;
        Ok(Some((serialized, content_type)))
    }

    /// Scheme priority: CLI `--auth` > profile scheme (when present in
    /// this spec) > embedded default > operation's single scheme >
    /// spec's single scheme > opt-in bearer fallback for stored tokens.
    #[allow(clippy::too_many_arguments)]
    async fn apply_auth(
        &self,
        action: &CommandAction,
        profile: Option<&Profile>,
        profile_name: &str,
        profiles: &dyn ProfileStore,
        headers: &mut HeaderMap,
        query_pairs: &mut Vec<(String, String)>,
        cookie_values: &mut Vec<(String, String)>,
    ) -> EngineResult<()> {
        let Some(scheme) = self
            .select_scheme(action, profile, profile_name, profiles)
            .await?
        else {
            return Ok(());
        };

        match scheme.kind {
            AuthKind::HttpBearer | AuthKind::Oauth2 | AuthKind::OpenIdConnect => {
                let token = match &self.globals.bearer_token {
                    Some(token) => token.clone(),
                    None => profiles
                        .get_token(&self.artifacts.spec.spec_id, profile_name)
                        .await?
                        .map(|t| t.expose().to_string())
                        .ok_or_else(|| {
                            EngineError::Auth(format!(
                                "no token for scheme '{}'; pass --bearer-token or run login",
                                scheme.key
                            ))
                        })?,
                };
                headers.set("Authorization", format!("Bearer {}", token));
            }
            AuthKind::HttpBasic => {
                let (Some(username), Some(password)) =
                    (&self.globals.username, &self.globals.password)
                else {
                    return Err(EngineError::Auth(format!(
                        "scheme '{}' needs --username and --password",
                        scheme.key
                    )));
                };
                let encoded = BASE64.encode(format!("{}:{}", username, password));
                headers.set("Authorization", format!("Basic {}", encoded));
            }
            AuthKind::ApiKey => {
                let key = match &self.globals.api_key {
                    Some(key) => key.clone(),
                    None => profiles
                        .get_token(&self.artifacts.spec.spec_id, profile_name)
                        .await?
                        .map(|t| t.expose().to_string())
                        .ok_or_else(|| {
                            EngineError::Auth(format!(
                                "no API key for scheme '{}'; pass --api-key or run login",
                                scheme.key
                            ))
                        })?,
                };
                let name = scheme.name.clone().unwrap_or_else(|| "api_key".to_string());
                match scheme.location {
                    Some(ParameterLocation::Query) => query_pairs.push((name, key)),
                    Some(ParameterLocation::Cookie) => cookie_values.push((name, key)),
                    _ => headers.set(&name, key),
                }
            }
            AuthKind::Unknown => {
                return Err(EngineError::Auth(format!(
                    "auth scheme '{}' is not supported",
                    scheme.key
                )));
            }
        }

        Ok(())
    }

    async fn select_scheme(
        &self,
        action: &CommandAction,
        profile: Option<&Profile>,
        profile_name: &str,
        profiles: &dyn ProfileStore,
    ) -> EngineResult<Option<&'a AuthScheme>> {
        let registry: &'a [AuthScheme] = &self.artifacts.auth_schemes;
        let find = |key: &str| registry.iter().find(|s| s.key == key);

        // Explicit CLI selection always wins, and an unknown key is an
        // error rather than a silent fallthrough
        if let Some(key) = &self.globals.auth_scheme {
            return find(key)
                .map(Some)
                .ok_or_else(|| EngineError::Auth(format!("unknown auth scheme: {}", key)));
        }

        // security: [] on the operation disables auth
        if !action.auth.required() {
            return Ok(None);
        }

        if let Some(scheme) = profile
            .and_then(|p| p.auth_scheme.as_deref())
            .and_then(find)
        {
            return Ok(Some(scheme));
        }

        if let Some(scheme) = self.embedded.auth_scheme.as_deref().and_then(find) {
            return Ok(Some(scheme));
        }

        if let Some(scheme) = action.auth.single_scheme().and_then(find) {
            return Ok(Some(scheme));
        }

        if let [only] = registry {
            return Ok(Some(only));
        }

        // Stored-token bearer fallback is surprising enough to be
        // opt-in
        if self.globals.auto_bearer {
            let stored = profiles
                .get_token(&self.artifacts.spec.spec_id, profile_name)
                .await?;
            if stored.is_some() {
                let bearer = first_bearer_compatible(&action.auth, registry);
                if bearer.is_some() {
                    return Ok(bearer);
                }
            }
        }

        Ok(None)
    }
}

/// Typed per-location instance objects for schema validation
#[derive(Default)]
struct LocationInstances {
    query: Map<String, Value>,
    header: Map<String, Value>,
    cookie: Map<String, Value>,
}

impl LocationInstances {
    fn record(&mut self, spec: &ParamSpec, value: &Value) {
        let bucket = match spec.location {
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
            ParameterLocation::Path => return,
        };
        bucket.insert(spec.name.clone(), value.clone());
    }
}

/// Coerce one flag value by its declared type; arrays coerce per item
fn coerce_flag_value(spec: &ParamSpec, raw: &Value) -> Result<Value, ValidationIssue> {
    let result = match spec.param_type {
        command_model::ParamType::Array => {
            let items = match raw {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            let item_type = spec.item_type.unwrap_or(command_model::ParamType::String);
            items
                .iter()
                .map(|item| coerce_value(item_type, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        other => coerce_value(other, raw),
    };

    result.map_err(|message| {
        let mut issue = ValidationIssue::new(spec.name.clone(), message);
        issue.value = Some(raw.clone());
        issue
    })
}

/// Distribute one coerced value into its location bucket
fn place_value(
    spec: &ParamSpec,
    value: &Value,
    query_pairs: &mut Vec<(String, String)>,
    header_values: &mut Vec<(String, String)>,
    cookie_values: &mut Vec<(String, String)>,
) {
    match spec.location {
        ParameterLocation::Query => match value {
            // Arrays become repeated keys, in order of appearance
            Value::Array(items) => {
                for item in items {
                    query_pairs.push((spec.name.clone(), stringify(item)));
                }
            }
            other => query_pairs.push((spec.name.clone(), stringify(other))),
        },
        ParameterLocation::Header => {
            let rendered = match value {
                Value::Array(items) => items
                    .iter()
                    .map(stringify)
                    .collect::<Vec<_>>()
                    .join(","),
                other => stringify(other),
            };
            header_values.push((spec.name.clone(), rendered));
        }
        ParameterLocation::Cookie => {
            cookie_values.push((spec.name.clone(), stringify(value)));
        }
        ParameterLocation::Path => {}
    }
}

fn validate_against(schema: Option<&Value>, instance: &Map<String, Value>) -> Vec<ValidationIssue> {
    let Some(schema) = schema else {
        return Vec::new();
    };
    validate_instance(schema, &Value::Object(instance.clone()))
}

fn validate_instance(schema: &Value, instance: &Value) -> Vec<ValidationIssue> {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => {
            // A derived schema that does not compile cannot reject input
            debug!("skipping uncompilable validation schema: {}", e);
            return Vec::new();
        }
    };

    validator
        .iter_errors(instance)
        .map(|error| {
            let instance_path = pointer_to_dotted(&error.instance_path.to_string());
            if let jsonschema::error::ValidationErrorKind::Required { property } = &error.kind {
                let name = property.as_str().map(String::from).unwrap_or_else(|| {
                    property.to_string().trim_matches('"').to_string()
                });
                let path = if instance_path.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", instance_path, name)
                };
                ValidationIssue::new(path, format!("missing required property '{}'", name))
            } else {
                let mut issue = ValidationIssue::new(instance_path, error.to_string());
                issue.value = Some(error.instance.clone().into_owned());
                issue
            }
        })
        .collect()
}

/// `/a/b` JSON pointer to dotted `a.b`
fn pointer_to_dotted(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}

fn first_bearer_compatible<'r>(
    auth: &AuthSummary,
    registry: &'r [AuthScheme],
) -> Option<&'r AuthScheme> {
    for alternative in &auth.alternatives {
        for requirement in &alternative.requirements {
            if let Some(scheme) = registry.iter().find(|s| s.key == requirement.key) {
                if scheme.kind.is_bearer_compatible() {
                    return Some(scheme);
                }
            }
        }
    }
    None
}

/// Join base, path, and query pairs into an absolute URL.
///
/// The base keeps its own path; the template's leading slash joins the
/// two, and arrays appear as repeated query keys.
fn assemble_url(base: &str, path: &str, query_pairs: &[(String, String)]) -> EngineResult<String> {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    let mut url =
        Url::parse(&joined).map_err(|e| EngineError::Server(format!("invalid URL '{}': {}", joined, e)))?;

    if !query_pairs.is_empty() {
        let mut serializer = url.query_pairs_mut();
        for (key, value) in query_pairs {
            serializer.append_pair(key, value);
        }
        drop(serializer);
    }

    Ok(url.to_string())
}

/// Render the curl equivalent, masking the Authorization value
fn render_curl(method: HttpMethod, url: &str, headers: &HeaderMap, body: Option<&str>) -> String {
    let mut parts = vec![format!("curl -X {} '{}'", method, url)];

    for (name, value) in headers.iter() {
        let shown = if name.eq_ignore_ascii_case("authorization") {
            mask_authorization(value)
        } else {
            value.to_string()
        };
        parts.push(format!("-H '{}: {}'", name, shown));
    }

    if let Some(body) = body {
        parts.push(format!("--data '{}'", body.replace('\'', r#"'\''"#)));
    }

    parts.join(" ")
}

/// Keep the scheme prefix and the first/last characters of the token
fn mask_authorization(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, token)) => format!("{} {}", scheme, mask_token(token)),
        None => mask_token(value),
    }
}

fn mask_token(token: &str) -> String {
    if token.len() > MASK_KEEP * 2 + 2 {
        format!("{}...{}", &token[..MASK_KEEP], &token[token.len() - MASK_KEEP..])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assemble_url_preserves_base_path() {
        let url = assemble_url("https://api.example.com/v1/", "/users", &[]).unwrap();
        assert_eq!(url, "https://api.example.com/v1/users");
    }

    #[test]
    fn test_assemble_url_repeated_query_keys() {
        let pairs = vec![
            ("tag".to_string(), "a".to_string()),
            ("tag".to_string(), "b".to_string()),
        ];
        let url = assemble_url("https://api.example.com", "/items", &pairs).unwrap();
        assert_eq!(url, "https://api.example.com/items?tag=a&tag=b");
    }

    #[test]
    fn test_mask_authorization() {
        assert_eq!(mask_authorization("Bearer abc123xyz"), "Bearer abc...xyz");
        assert_eq!(mask_authorization("Bearer short"), "Bearer ***");
        assert_eq!(mask_authorization("raw-token-value"), "raw...lue");
    }

    #[test]
    fn test_pointer_to_dotted() {
        assert_eq!(pointer_to_dotted("/a/b"), "a.b");
        assert_eq!(pointer_to_dotted(""), "");
    }

    #[test]
    fn test_validate_instance_required_format() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        });
        let issues = validate_instance(&schema, &json!({}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "name");
        assert_eq!(issues[0].message, "missing required property 'name'");
    }

    #[test]
    fn test_validate_instance_type_mismatch() {
        let schema = json!({
            "type": "object",
            "properties": {"limit": {"type": "integer"}}
        });
        let issues = validate_instance(&schema, &json!({"limit": "ten"}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "limit");
        assert!(issues[0].value.is_some());
    }

    #[test]
    fn test_curl_rendering() {
        let mut headers = HeaderMap::new();
        headers.set("Authorization", "Bearer abc123xyz");
        headers.set("Content-Type", "application/json");
        let curl = render_curl(
            HttpMethod::Post,
            "https://api.example.com/users",
            &headers,
            Some(r#"{"name":"Ada"}"#),
        );
        assert!(curl.starts_with("curl -X POST 'https://api.example.com/users'"));
        assert!(curl.contains("Authorization: Bearer abc...xyz"));
        assert!(!curl.contains("abc123xyz"));
        assert!(curl.contains(r#"--data '{"name":"Ada"}'"#));
    }
}
