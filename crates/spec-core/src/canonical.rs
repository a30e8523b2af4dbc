//! Canonical JSON serialization and content fingerprinting
//!
//! Object keys are written in ascending order and array order is
//! preserved, so the same document always produces the same bytes.
//! Cycles never reach this layer: the dereferencer replaces them with
//! the `{"__circular": true}` sentinel before serialization.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a value to canonical JSON (sorted keys, compact)
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Compute the hex-encoded SHA-256 of the canonical serialization
pub fn fingerprint(value: &Value) -> String {
    let canon = canonical_json(value);
    let mut hasher = Sha256::new();
    hasher.update(canon.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_escaped(s: &str, out: &mut String) {
    // serde_json string serialization cannot fail
    out.push_str(&serde_json::to_string(s).unwrap_or_default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted() {
        let value = json!({"b": 1, "a": {"z": true, "m": null}});
        assert_eq!(canonical_json(&value), r#"{"a":{"m":null,"z":true},"b":1}"#);
    }

    #[test]
    fn test_array_order_preserved() {
        let value = json!({"list": [3, 1, 2]});
        assert_eq!(canonical_json(&value), r#"{"list":[3,1,2]}"#);
    }

    #[test]
    fn test_string_escaping() {
        let value = json!({"k": "a\"b\n"});
        assert_eq!(canonical_json(&value), r#"{"k":"a\"b\n"}"#);
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = json!({"x": 1, "y": [true, "two"]});
        let b = json!({"y": [true, "two"], "x": 1});
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_on_content() {
        let a = json!({"x": 1});
        let b = json!({"x": 2});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
