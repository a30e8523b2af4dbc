//! Result rendering: text and JSON projections, streams, exit codes

use serde_json::Value;

use spec_core::canonical_json;

use crate::result::CommandResult;

/// Which stream a rendering belongs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Exit code: 0 for a 2xx success and for prepared/curl/data payloads,
/// 1 for everything else
pub fn exit_code(result: &CommandResult) -> i32 {
    match result {
        CommandResult::Success { response, .. } if response.ok => 0,
        CommandResult::Prepared { .. } | CommandResult::Curl { .. } | CommandResult::Data { .. } => 0,
        _ => 1,
    }
}

/// Errors, validation failures, and HTTP failures go to stderr
pub fn output_stream(result: &CommandResult) -> OutputStream {
    match result {
        CommandResult::Success { response, .. } if !response.ok => OutputStream::Stderr,
        CommandResult::Error { .. } | CommandResult::Validation { .. } => OutputStream::Stderr,
        _ => OutputStream::Stdout,
    }
}

/// Compact, canonical JSON envelope (byte-stable for identical inputs)
pub fn render_json(result: &CommandResult) -> String {
    match serde_json::to_value(result) {
        Ok(value) => canonical_json(&value),
        Err(e) => canonical_json(&serde_json::json!({
            "type": "error",
            "message": format!("failed to serialize result: {}", e),
        })),
    }
}

/// Human-readable projection of a result
pub fn render_text(result: &CommandResult) -> String {
    let mut out = match result {
        CommandResult::Success { response, .. } => {
            if response.ok {
                render_body(&response.body, &response.raw_body)
            } else {
                format!("HTTP {}\n{}", response.status, response.raw_body)
            }
        }
        CommandResult::Error { message, .. } => format!("error: {}", message),
        CommandResult::Validation { errors, .. } => {
            let mut lines = vec!["validation failed:".to_string()];
            for issue in errors {
                lines.push(format!("  - {}: {}", issue.path, issue.message));
            }
            lines.join("\n")
        }
        CommandResult::Prepared { request, .. } => {
            let mut lines = vec![format!("{} {}", request.method, request.url)];
            for (name, value) in request.headers.iter() {
                lines.push(format!("{}: {}", name, value));
            }
            if let Some(body) = &request.body {
                lines.push(String::new());
                lines.push(body.clone());
            }
            lines.join("\n")
        }
        CommandResult::Curl { curl, .. } => curl.clone(),
        CommandResult::Data { kind, data } => render_data(kind, data),
    };

    // Point the user at the action's help when we know which one failed
    if matches!(
        result,
        CommandResult::Error { .. } | CommandResult::Validation { .. }
    ) {
        if let Some((resource, action)) = result.context() {
            out.push_str(&format!("\nRun '{} {} --help' for usage", resource, action));
        }
    }

    out
}

/// Pretty JSON when the body parsed, the raw text otherwise
fn render_body(body: &Value, raw_body: &str) -> String {
    match body {
        Value::String(s) => s.clone(),
        parsed => serde_json::to_string_pretty(parsed).unwrap_or_else(|_| raw_body.to_string()),
    }
}

/// Variant-specific formatting for data payloads, keyed by kind
fn render_data(kind: &str, data: &Value) -> String {
    match kind {
        "schema" => canonical_json(data),
        "whoami" => {
            let profile = data
                .get("profile")
                .and_then(Value::as_str)
                .unwrap_or("default");
            let has_token = data
                .get("hasToken")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let mut lines = vec![format!("profile: {}", profile)];
            if let Some(server) = data.get("server").and_then(Value::as_str) {
                lines.push(format!("server: {}", server));
            }
            lines.push(format!(
                "token: {}",
                if has_token { "stored" } else { "none" }
            ));
            lines.join("\n")
        }
        "login" => "token stored".to_string(),
        "logout" => "token removed".to_string(),
        _ => serde_json::to_string_pretty(data).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use crate::result::{ResponseInfo, Timing, ValidationIssue};
    use crate::PreparedRequest;
    use chrono::Utc;
    use serde_json::json;
    use spec_core::HttpMethod;

    fn prepared() -> PreparedRequest {
        let mut headers = HeaderMap::new();
        headers.set("Accept", "application/json");
        PreparedRequest {
            method: HttpMethod::Get,
            url: "https://api.example.com/users/123".to_string(),
            headers,
            body: None,
            curl: "curl -X GET 'https://api.example.com/users/123'".to_string(),
        }
    }

    fn success(status: u16, body: Value) -> CommandResult {
        CommandResult::Success {
            resource: Some("users".to_string()),
            action: Some("get".to_string()),
            request: prepared(),
            response: ResponseInfo {
                status,
                ok: (200..300).contains(&status),
                headers: vec![],
                raw_body: body.to_string(),
                body,
            },
            timing: Timing {
                started_at: Utc::now(),
                duration_ms: 12,
            },
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&success(200, json!({"id": 1}))), 0);
        assert_eq!(exit_code(&success(404, json!("missing"))), 1);
        assert_eq!(exit_code(&CommandResult::error("boom")), 1);
        assert_eq!(exit_code(&CommandResult::data("whoami", json!({}))), 0);
        assert_eq!(
            exit_code(&CommandResult::Prepared {
                resource: None,
                action: None,
                request: prepared()
            }),
            0
        );
    }

    #[test]
    fn test_streams() {
        assert_eq!(output_stream(&success(200, json!({}))), OutputStream::Stdout);
        assert_eq!(output_stream(&success(500, json!({}))), OutputStream::Stderr);
        assert_eq!(
            output_stream(&CommandResult::error("x")),
            OutputStream::Stderr
        );
        assert_eq!(
            output_stream(&CommandResult::data("schema", json!({}))),
            OutputStream::Stdout
        );
    }

    #[test]
    fn test_text_success_pretty_json() {
        let text = render_text(&success(200, json!({"id": "123"})));
        assert!(text.contains("\"id\": \"123\""));
    }

    #[test]
    fn test_text_http_error_prefix() {
        let text = render_text(&success(500, json!("oops")));
        assert!(text.starts_with("HTTP 500"));
    }

    #[test]
    fn test_text_validation_with_hint() {
        let result = CommandResult::Validation {
            resource: Some("contacts".to_string()),
            action: Some("create".to_string()),
            errors: vec![ValidationIssue::missing_required("name", "name")],
            request: None,
        };
        let text = render_text(&result);
        assert!(text.contains("- name: missing required property 'name'"));
        assert!(text.contains("Run 'contacts create --help'"));
    }

    #[test]
    fn test_json_stable_and_tagged() {
        let result = CommandResult::data("schema", json!({"b": 1, "a": 2}));
        let first = render_json(&result);
        let second = render_json(&result);
        assert_eq!(first, second);
        assert!(first.contains(r#""type":"data""#));
        // Canonical ordering inside the payload
        assert!(first.contains(r#"{"a":2,"b":1}"#));
    }

    #[test]
    fn test_data_schema_canonical_text() {
        let result = CommandResult::data("schema", json!({"z": 1, "a": 2}));
        assert_eq!(render_text(&result), r#"{"a":2,"z":1}"#);
    }
}
