//! Server enumeration across document, path-item, and operation levels

use indexmap::IndexMap;
use serde_json::Value;

use crate::types::{template_vars, HttpMethod, ServerInfo, ServerVariable};

/// Collects and de-duplicates server entries from every level
pub struct ServerResolver;

impl ServerResolver {
    /// Enumerate servers: document root first, then path items, then
    /// operations. Duplicate URLs keep their first occurrence; variable
    /// metadata is merged with first-occurrence defaults winning.
    pub fn collect(doc: &Value) -> Vec<ServerInfo> {
        let mut seen: IndexMap<String, ServerInfo> = IndexMap::new();

        add_servers(doc.get("servers"), &mut seen);

        if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
            for item in paths.values() {
                add_servers(item.get("servers"), &mut seen);
                if let Some(item) = item.as_object() {
                    for method in HttpMethod::ALL {
                        if let Some(op) = item.get(method.lower()) {
                            add_servers(op.get("servers"), &mut seen);
                        }
                    }
                }
            }
        }

        seen.into_values().collect()
    }
}

fn add_servers(servers: Option<&Value>, seen: &mut IndexMap<String, ServerInfo>) {
    let Some(servers) = servers.and_then(Value::as_array) else {
        return;
    };

    for server in servers {
        let Some(info) = parse_server(server) else {
            continue;
        };
        match seen.get_mut(&info.url) {
            None => {
                seen.insert(info.url.clone(), info);
            }
            Some(existing) => {
                // Merge variables the first occurrence did not declare
                for var in info.variables {
                    if !existing.variables.iter().any(|v| v.name == var.name) {
                        existing.variables.push(var);
                    }
                }
                if existing.description.is_none() {
                    existing.description = info.description;
                }
            }
        }
    }
}

fn parse_server(value: &Value) -> Option<ServerInfo> {
    let obj = value.as_object()?;
    let url = obj.get("url").and_then(Value::as_str)?.to_string();

    let variables = obj
        .get("variables")
        .and_then(Value::as_object)
        .map(|vars| {
            vars.iter()
                .map(|(name, decl)| ServerVariable {
                    name: name.clone(),
                    default: decl
                        .get("default")
                        .and_then(Value::as_str)
                        .map(String::from),
                    description: decl
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                    enum_values: decl
                        .get("enum")
                        .and_then(Value::as_array)
                        .map(|e| {
                            e.iter()
                                .filter_map(Value::as_str)
                                .map(String::from)
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    let variable_names = template_vars(&url);

    Some(ServerInfo {
        url,
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        variables,
        variable_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_all_levels() {
        let doc = json!({
            "servers": [{"url": "https://api.example.com"}],
            "paths": {
                "/a": {
                    "servers": [{"url": "https://path.example.com"}],
                    "get": {
                        "servers": [{"url": "https://op.example.com"}]
                    }
                }
            }
        });

        let servers = ServerResolver::collect(&doc);
        let urls: Vec<&str> = servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com",
                "https://path.example.com",
                "https://op.example.com"
            ]
        );
    }

    #[test]
    fn test_dedupe_keeps_first_and_merges_variables() {
        let doc = json!({
            "servers": [
                {"url": "https://{region}.example.com", "description": "primary",
                 "variables": {"region": {"default": "us"}}},
                {"url": "https://{region}.example.com",
                 "variables": {
                     "region": {"default": "eu"},
                     "port": {"default": "443"}
                 }}
            ]
        });

        let servers = ServerResolver::collect(&doc);
        assert_eq!(servers.len(), 1);
        let server = &servers[0];
        assert_eq!(server.description.as_deref(), Some("primary"));

        let region = server.variables.iter().find(|v| v.name == "region").unwrap();
        assert_eq!(region.default.as_deref(), Some("us"));
        assert!(server.variables.iter().any(|v| v.name == "port"));
    }

    #[test]
    fn test_variable_names_in_order() {
        let doc = json!({
            "servers": [{"url": "https://{region}.example.com/{stage}"}]
        });
        let servers = ServerResolver::collect(&doc);
        assert_eq!(servers[0].variable_names, vec!["region", "stage"]);
    }
}
