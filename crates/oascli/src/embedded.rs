//! Build-time embedded defaults

use indexmap::IndexMap;
use request_engine::EmbeddedDefaults;

include!(concat!(env!("OUT_DIR"), "/embedded.rs"));

/// Spec text compiled into the binary, if any
pub fn embedded_spec_text() -> Option<&'static str> {
    EMBEDDED_SPEC
}

/// Defaults captured at build time
pub fn defaults() -> EmbeddedDefaults {
    EmbeddedDefaults {
        cli_name: CLI_NAME.map(str::to_string),
        server: DEFAULT_SERVER.map(str::to_string),
        server_vars: parse_server_vars(DEFAULT_SERVER_VARS.unwrap_or("")),
        auth_scheme: DEFAULT_AUTH.map(str::to_string),
        version: BUILD_VERSION.map(str::to_string),
    }
}

/// Parse comma-separated `k=v` pairs; malformed entries are dropped
pub fn parse_server_vars(raw: &str) -> IndexMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_vars() {
        let vars = parse_server_vars("region=eu, stage=prod");
        assert_eq!(vars.get("region").map(String::as_str), Some("eu"));
        assert_eq!(vars.get("stage").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_parse_server_vars_skips_malformed() {
        let vars = parse_server_vars("region=eu,broken,=nope,");
        assert_eq!(vars.len(), 1);
    }
}
