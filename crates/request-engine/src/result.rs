//! Tagged result IR for a single invocation

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::builder::PreparedRequest;
use crate::error::EngineError;

/// One validation failure
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending input (parameter or body field)
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn missing_required(path: &str, name: &str) -> Self {
        Self::new(path, format!("missing required property '{}'", name))
    }
}

/// Captured response data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub status: u16,
    /// `200 <= status < 300`
    pub ok: bool,
    pub headers: Vec<(String, String)>,
    /// Parsed JSON when the content type says so, else the raw string
    pub body: Value,
    pub raw_body: String,
}

/// Wall-clock timing of one request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// The outcome of one invocation.
///
/// Every failure along the pipeline surfaces as one of these variants;
/// nothing in the core prints or unwinds.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommandResult {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        request: PreparedRequest,
        response: ResponseInfo,
        timing: Timing,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request: Option<PreparedRequest>,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timing: Option<Timing>,
    },
    Validation {
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        errors: Vec<ValidationIssue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        request: Option<PreparedRequest>,
    },
    Prepared {
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        request: PreparedRequest,
    },
    Curl {
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        curl: String,
        request: PreparedRequest,
    },
    Data {
        kind: String,
        data: Value,
    },
}

impl CommandResult {
    /// Plain error with no request context
    pub fn error(message: impl Into<String>) -> Self {
        CommandResult::Error {
            resource: None,
            action: None,
            message: message.into(),
            request: None,
            response: None,
            timing: None,
        }
    }

    pub fn from_engine_error(err: &EngineError) -> Self {
        Self::error(err.to_string())
    }

    pub fn data(kind: impl Into<String>, data: Value) -> Self {
        CommandResult::Data {
            kind: kind.into(),
            data,
        }
    }

    /// Attach resource/action context where the variant carries it
    pub fn with_context(mut self, res: &str, act: &str) -> Self {
        match &mut self {
            CommandResult::Success { resource, action, .. }
            | CommandResult::Error { resource, action, .. }
            | CommandResult::Validation { resource, action, .. }
            | CommandResult::Prepared { resource, action, .. }
            | CommandResult::Curl { resource, action, .. } => {
                *resource = Some(res.to_string());
                *action = Some(act.to_string());
            }
            CommandResult::Data { .. } => {}
        }
        self
    }

    /// `(resource, action)` context, when known
    pub fn context(&self) -> Option<(&str, &str)> {
        match self {
            CommandResult::Success { resource, action, .. }
            | CommandResult::Error { resource, action, .. }
            | CommandResult::Validation { resource, action, .. }
            | CommandResult::Prepared { resource, action, .. }
            | CommandResult::Curl { resource, action, .. } => {
                Some((resource.as_deref()?, action.as_deref()?))
            }
            CommandResult::Data { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_attachment() {
        let result = CommandResult::error("boom").with_context("users", "get");
        assert_eq!(result.context(), Some(("users", "get")));

        let data = CommandResult::data("whoami", Value::Null).with_context("users", "get");
        assert_eq!(data.context(), None);
    }

    #[test]
    fn test_tagged_serialization() {
        let result = CommandResult::error("boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
        assert!(json.get("request").is_none());
    }
}
