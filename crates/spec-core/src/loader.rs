//! Spec loading: fetch/read, parse, dereference, fingerprint

use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::canonical::fingerprint;
use crate::deref::Dereferencer;
use crate::error::{SpecError, SpecResult};
use crate::inflect::kebab_case;
use crate::source::{FsReader, SpecReader, SpecSource};

/// Characters of the fingerprint used as a fallback spec id
const SPEC_ID_FINGERPRINT_LEN: usize = 12;

/// A loaded, dereferenced OpenAPI document
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    /// The fully dereferenced document
    pub document: Value,
    /// Where it came from
    pub source: SpecSource,
    /// Hex SHA-256 of the canonical serialization
    pub fingerprint: String,
    /// Stable identifier: kebab-cased title, or a fingerprint prefix
    pub spec_id: String,
}

impl LoadedSpec {
    pub fn openapi_version(&self) -> Option<&str> {
        self.document.get("openapi").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.document.pointer("/info/title").and_then(Value::as_str)
    }

    pub fn info_version(&self) -> Option<&str> {
        self.document
            .pointer("/info/version")
            .and_then(Value::as_str)
    }
}

/// Loads OpenAPI 3.x documents from embedded text, files, or URLs
pub struct SpecLoader {
    reader: Box<dyn SpecReader>,
}

impl Default for SpecLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecLoader {
    pub fn new() -> Self {
        Self {
            reader: Box::new(FsReader),
        }
    }

    /// Use a custom reader (tests supply spec text without disk access)
    pub fn with_reader(reader: Box<dyn SpecReader>) -> Self {
        Self { reader }
    }

    /// Load a spec. Exactly one source is chosen, embedded text winning
    /// over `--spec`.
    pub async fn load(&self, spec: Option<&str>, embedded: Option<&str>) -> SpecResult<LoadedSpec> {
        if let Some(text) = embedded {
            return Self::from_text(text, SpecSource::Embedded);
        }

        let Some(spec) = spec else {
            return Err(SpecError::NoSpecProvided);
        };

        if spec.starts_with("http://") || spec.starts_with("https://") {
            let text = Self::fetch(spec).await?;
            return Self::from_text(&text, SpecSource::Url { url: spec.to_string() });
        }

        let path = std::path::PathBuf::from(spec);
        let text = self.reader.read_to_string(&path)?;
        Self::from_text(&text, SpecSource::File { path })
    }

    /// Parse, validate, and dereference spec text
    pub fn from_text(text: &str, source: SpecSource) -> SpecResult<LoadedSpec> {
        let text = Self::sanitize_large_numbers(text);

        // JSON documents start with an object or array; everything else
        // goes through the YAML parser
        let raw: Value = match text.trim_start().chars().next() {
            Some('{') | Some('[') => serde_json::from_str(&text)
                .map_err(|e| SpecError::ParseFailed(e.to_string()))?,
            _ => {
                let yaml: serde_yaml::Value = serde_yaml::from_str(&text)
                    .map_err(|e| SpecError::ParseFailed(e.to_string()))?;
                yaml_to_json(yaml)
            }
        };

        Self::validate(&raw)?;

        let document = Dereferencer::dereference(&raw);
        let fingerprint = fingerprint(&document);
        let spec_id = derive_spec_id(&document, &fingerprint);

        debug!(
            spec_id = %spec_id,
            fingerprint = %fingerprint,
            "loaded OpenAPI {} document",
            document.get("openapi").and_then(serde_json::Value::as_str).unwrap_or("3.x"),
        );

        Ok(LoadedSpec {
            document,
            source,
            fingerprint,
            spec_id,
        })
    }

    fn validate(doc: &Value) -> SpecResult<()> {
        if !doc.is_object() {
            return Err(SpecError::InvalidDocument(
                "document root is not an object".to_string(),
            ));
        }
        match doc.get("openapi").and_then(Value::as_str) {
            None => Err(SpecError::InvalidDocument(
                "missing or non-string 'openapi' field".to_string(),
            )),
            Some(version) if !version.starts_with("3.") => Err(SpecError::InvalidDocument(
                format!("unsupported OpenAPI version: {}", version),
            )),
            Some(_) => Ok(()),
        }
    }

    async fn fetch(url: &str) -> SpecResult<String> {
        info!("fetching OpenAPI spec from {}", url);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SpecError::FetchFailed(e.to_string()))?;

        let response = client
            .get(url)
            .header("Accept", "application/json, application/yaml, text/yaml")
            .send()
            .await
            .map_err(|e| SpecError::FetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpecError::FetchFailed(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SpecError::FetchFailed(e.to_string()))
    }

    /// Clamp integers too large for safe JSON parsing.
    ///
    /// Some published specs use 2^63-scale numbers for min/max
    /// constraints, which serde_yaml rejects. The exact value does not
    /// matter for command derivation.
    fn sanitize_large_numbers(content: &str) -> String {
        let clamp = |caps: &regex::Captures| {
            let prefix = &caps[1];
            if caps[2].starts_with('-') {
                format!("{}-2147483648", prefix)
            } else {
                format!("{}2147483647", prefix)
            }
        };

        let yaml_form =
            Regex::new(r"(?m)^(\s*(?:minimum|maximum|exclusiveMinimum|exclusiveMaximum):\s*)(-?\d{16,})")
                .expect("static regex");
        let content = yaml_form.replace_all(content, clamp);

        let json_form = Regex::new(
            r#"("(?:minimum|maximum|exclusiveMinimum|exclusiveMaximum)"\s*:\s*)(-?\d{16,})"#,
        )
        .expect("static regex");
        json_form.replace_all(&content, clamp).into_owned()
    }
}

/// Convert a YAML value to JSON, stringifying non-string keys.
///
/// OpenAPI YAML routinely uses bare integers as mapping keys
/// (`responses: {200: ...}`), which `serde_json::Value` cannot
/// deserialize directly.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut out = serde_json::Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => serde_yaml::to_string(&other)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                };
                out.insert(key, yaml_to_json(value));
            }
            Value::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn derive_spec_id(document: &Value, fingerprint: &str) -> String {
    let title = document
        .pointer("/info/title")
        .and_then(Value::as_str)
        .map(kebab_case)
        .unwrap_or_default();

    if title.is_empty() {
        fingerprint[..SPEC_ID_FINGERPRINT_LEN].to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SAMPLE_SPEC: &str = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
servers:
  - url: https://api.example.com/v1
paths:
  /users:
    get:
      operationId: listUsers
      responses:
        '200':
          description: A list of users
"#;

    struct StaticReader(&'static str);

    impl SpecReader for StaticReader {
        fn read_to_string(&self, _path: &Path) -> std::io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_load_embedded_wins() {
        let loader = SpecLoader::new();
        let spec = loader
            .load(Some("/does/not/exist.yaml"), Some(SAMPLE_SPEC))
            .await
            .unwrap();
        assert_eq!(spec.source, SpecSource::Embedded);
        assert_eq!(spec.spec_id, "test-api");
    }

    #[tokio::test]
    async fn test_load_from_reader() {
        let loader = SpecLoader::with_reader(Box::new(StaticReader(SAMPLE_SPEC)));
        let spec = loader.load(Some("api.yaml"), None).await.unwrap();
        assert!(matches!(spec.source, SpecSource::File { .. }));
        assert_eq!(spec.title(), Some("Test API"));
        assert_eq!(spec.info_version(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openapi.yaml");
        std::fs::write(&path, SAMPLE_SPEC).unwrap();

        let loader = SpecLoader::new();
        let spec = loader
            .load(Some(path.to_str().unwrap()), None)
            .await
            .unwrap();
        assert!(matches!(spec.source, SpecSource::File { .. }));
        assert_eq!(spec.spec_id, "test-api");
    }

    #[tokio::test]
    async fn test_no_spec_provided() {
        let loader = SpecLoader::new();
        let err = loader.load(None, None).await.unwrap_err();
        assert!(matches!(err, SpecError::NoSpecProvided));
    }

    #[test]
    fn test_json_detection() {
        let json_spec = r#"{"openapi": "3.1.0", "info": {"title": "J", "version": "1"}, "paths": {}}"#;
        let spec = SpecLoader::from_text(json_spec, SpecSource::Embedded).unwrap();
        assert_eq!(spec.openapi_version(), Some("3.1.0"));
        assert_eq!(spec.spec_id, "j");
    }

    #[test]
    fn test_rejects_non_openapi3() {
        let swagger = r#"{"swagger": "2.0", "info": {"title": "Old", "version": "1"}}"#;
        let err = SpecLoader::from_text(swagger, SpecSource::Embedded).unwrap_err();
        assert!(matches!(err, SpecError::InvalidDocument(_)));

        let v2 = r#"{"openapi": "2.0", "info": {}}"#;
        let err = SpecLoader::from_text(v2, SpecSource::Embedded).unwrap_err();
        assert!(matches!(err, SpecError::InvalidDocument(_)));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = SpecLoader::from_text("[1, 2]", SpecSource::Embedded).unwrap_err();
        assert!(matches!(err, SpecError::InvalidDocument(_)));
    }

    #[test]
    fn test_fingerprint_is_pure() {
        let a = SpecLoader::from_text(SAMPLE_SPEC, SpecSource::Embedded).unwrap();
        let b = SpecLoader::from_text(SAMPLE_SPEC, SpecSource::Embedded).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.spec_id, b.spec_id);
    }

    #[test]
    fn test_spec_id_falls_back_to_fingerprint() {
        let spec_text = r#"{"openapi": "3.0.0", "info": {"title": "", "version": "1"}, "paths": {}}"#;
        let spec = SpecLoader::from_text(spec_text, SpecSource::Embedded).unwrap();
        assert_eq!(spec.spec_id.len(), 12);
        assert!(spec.fingerprint.starts_with(&spec.spec_id));
    }

    #[test]
    fn test_sanitize_large_numbers() {
        let spec_text = r#"
openapi: "3.0.0"
info:
  title: Big
  version: "1"
paths: {}
components:
  schemas:
    Seed:
      type: integer
      minimum: -9223372036854776000
      maximum: 9223372036854776000
"#;
        let spec = SpecLoader::from_text(spec_text, SpecSource::Embedded).unwrap();
        let seed = spec.document.pointer("/components/schemas/Seed").unwrap();
        assert_eq!(seed["maximum"], 2147483647);
        assert_eq!(seed["minimum"], -2147483648);
    }

    #[test]
    fn test_yaml_integer_keys() {
        let spec_text = r#"
openapi: "3.0.0"
info: {title: Codes, version: "1"}
paths:
  /health:
    get:
      responses:
        200:
          description: ok
"#;
        let spec = SpecLoader::from_text(spec_text, SpecSource::Embedded).unwrap();
        assert!(spec
            .document
            .pointer("/paths/~1health/get/responses/200")
            .is_some());
    }

    #[test]
    fn test_circular_refs_fingerprint() {
        let spec_text = r##"{
            "openapi": "3.0.0",
            "info": {"title": "Cyclic", "version": "1"},
            "paths": {},
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {"next": {"$ref": "#/components/schemas/Node"}}
            }}}
        }"##;
        let spec = SpecLoader::from_text(spec_text, SpecSource::Embedded).unwrap();
        // The outer reference materialized once; the inner one collapsed
        let next = spec
            .document
            .pointer("/components/schemas/Node/properties/next")
            .unwrap();
        assert_eq!(next["properties"]["next"]["__circular"], true);
        assert_eq!(spec.fingerprint.len(), 64);
    }
}
