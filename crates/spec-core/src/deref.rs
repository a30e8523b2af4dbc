//! Whole-document `$ref` dereferencer
//!
//! Resolves every internal (`#/...`) reference against the document
//! root. Re-entering a reference that is already being resolved marks
//! a cycle; the inner occurrence is replaced with the sentinel
//! `{"__circular": true}` so the first materialization stays intact
//! and the result is always a finite tree.

use serde_json::{json, Map, Value};

/// Resolves `$ref` references anywhere in an OpenAPI document
pub struct Dereferencer<'a> {
    root: &'a Value,
}

impl<'a> Dereferencer<'a> {
    /// Dereference a full document, returning a ref-free copy
    pub fn dereference(doc: &'a Value) -> Value {
        let deref = Dereferencer { root: doc };
        let mut stack = Vec::new();
        deref.resolve(doc, &mut stack)
    }

    fn resolve(&self, node: &Value, stack: &mut Vec<String>) -> Value {
        match node {
            Value::Object(map) => {
                if let Some(target) = map.get("$ref").and_then(Value::as_str) {
                    if target.starts_with("#/") {
                        return self.resolve_ref(map, target, stack);
                    }
                    // External refs are out of scope; keep the node untouched
                }

                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), self.resolve(value, stack));
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.resolve(item, stack)).collect())
            }
            other => other.clone(),
        }
    }

    fn resolve_ref(&self, map: &Map<String, Value>, target: &str, stack: &mut Vec<String>) -> Value {
        if stack.iter().any(|active| active == target) {
            return json!({ "__circular": true });
        }

        let Some(resolved) = self.lookup_pointer(target) else {
            // Dangling reference: keep the original object
            return Value::Object(map.clone());
        };

        stack.push(target.to_string());
        let mut value = self.resolve(resolved, stack);
        stack.pop();

        // OpenAPI 3.1 allows sibling keys next to $ref; overlay them
        if map.len() > 1 {
            if let Value::Object(obj) = &mut value {
                for (key, sibling) in map {
                    if key != "$ref" {
                        obj.insert(key.clone(), self.resolve(sibling, stack));
                    }
                }
            }
        }

        value
    }

    fn lookup_pointer(&self, reference: &str) -> Option<&Value> {
        // "#/components/schemas/User" -> JSON pointer "/components/schemas/User"
        self.root.pointer(&reference[1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple_ref() {
        let doc = json!({
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"}
                        },
                        "required": ["name"]
                    }
                }
            },
            "paths": {
                "/users": {
                    "post": {
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/User"}
                                }
                            }
                        }
                    }
                }
            }
        });

        let resolved = Dereferencer::dereference(&doc);
        let schema = &resolved["paths"]["/users"]["post"]["requestBody"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"][0], "name");
    }

    #[test]
    fn test_resolve_nested_ref() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Address": {
                        "type": "object",
                        "properties": {"street": {"type": "string"}}
                    },
                    "User": {
                        "type": "object",
                        "properties": {
                            "address": {"$ref": "#/components/schemas/Address"}
                        }
                    }
                }
            },
            "schema": {"$ref": "#/components/schemas/User"}
        });

        let resolved = Dereferencer::dereference(&doc);
        assert_eq!(
            resolved["schema"]["properties"]["address"]["properties"]["street"]["type"],
            "string"
        );
    }

    #[test]
    fn test_cycle_becomes_sentinel() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "string"},
                            "next": {"$ref": "#/components/schemas/Node"}
                        }
                    }
                }
            },
            "schema": {"$ref": "#/components/schemas/Node"}
        });

        let resolved = Dereferencer::dereference(&doc);
        let schema = &resolved["schema"];
        // First materialization is intact
        assert_eq!(schema["properties"]["value"]["type"], "string");
        // The self-reference collapsed to the cycle sentinel
        assert_eq!(schema["properties"]["next"]["__circular"], true);
    }

    #[test]
    fn test_sibling_keys_overlay() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Pet": {"type": "object", "description": "a pet"}
                }
            },
            "schema": {"$ref": "#/components/schemas/Pet", "description": "overridden"}
        });

        let resolved = Dereferencer::dereference(&doc);
        assert_eq!(resolved["schema"]["type"], "object");
        assert_eq!(resolved["schema"]["description"], "overridden");
    }

    #[test]
    fn test_dangling_ref_kept() {
        let doc = json!({"schema": {"$ref": "#/components/schemas/Missing"}});
        let resolved = Dereferencer::dereference(&doc);
        assert_eq!(resolved["schema"]["$ref"], "#/components/schemas/Missing");
    }

    #[test]
    fn test_pointer_escapes() {
        let doc = json!({
            "components": {
                "schemas": {
                    "a/b": {"type": "string"}
                }
            },
            "schema": {"$ref": "#/components/schemas/a~1b"}
        });

        let resolved = Dereferencer::dereference(&doc);
        assert_eq!(resolved["schema"]["type"], "string");
    }
}
