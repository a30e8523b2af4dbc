//! Request body assembly from dot-notation flags

use command_model::{BodyFlagDef, ParamType};
use serde_json::{Map, Value};

use crate::result::ValidationIssue;

/// Insert `value` at a dotted path, creating intermediate objects
pub fn insert_at_path(root: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut cursor = root;
    for segment in parents {
        let entry = cursor
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => cursor = map,
            _ => return,
        }
    }

    cursor.insert(leaf.clone(), value);
}

/// Coerce a raw flag value to its declared scalar type.
///
/// Strings pass through; integers parse base-10; numbers must be
/// finite; booleans are true-on-presence but also accept an explicit
/// true/false.
pub fn coerce_value(param_type: ParamType, raw: &Value) -> Result<Value, String> {
    match param_type {
        ParamType::Boolean => match raw {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            // Presence of the flag means true
            Value::Null => Ok(Value::Bool(true)),
            Value::String(s) => match s.as_str() {
                "true" | "" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                other => Err(format!("expected true or false, got '{}'", other)),
            },
            other => Err(format!("expected a boolean, got {}", other)),
        },
        ParamType::Integer => match raw {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| format!("expected an integer, got '{}'", s)),
            other => Err(format!("expected an integer, got {}", other)),
        },
        ParamType::Number => match raw {
            Value::Number(_) => Ok(raw.clone()),
            Value::String(s) => {
                let parsed = s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("expected a number, got '{}'", s))?;
                // NaN and infinities have no JSON representation
                serde_json::Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| format!("expected a finite number, got '{}'", s))
            }
            other => Err(format!("expected a number, got {}", other)),
        },
        _ => match raw {
            Value::String(_) => Ok(raw.clone()),
            Value::Null => Ok(Value::String(String::new())),
            other => Ok(Value::String(stringify(other))),
        },
    }
}

/// Render a scalar JSON value the way it appears in a query string
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Build the nested body object from provided body-flag values.
///
/// Returns the assembled object, or the list of coercion failures.
pub fn build_body_object(
    provided: &[(&BodyFlagDef, &Value)],
) -> Result<Map<String, Value>, Vec<ValidationIssue>> {
    let mut body = Map::new();
    let mut issues = Vec::new();

    for (def, raw) in provided {
        match coerce_value(def.param_type, raw) {
            Ok(value) => insert_at_path(&mut body, &def.path, value),
            Err(message) => {
                let mut issue = ValidationIssue::new(def.path.join("."), message);
                issue.value = Some((*raw).clone());
                issues.push(issue);
            }
        }
    }

    if issues.is_empty() {
        Ok(body)
    } else {
        Err(issues)
    }
}
