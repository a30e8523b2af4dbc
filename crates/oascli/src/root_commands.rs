//! Root built-ins: login, logout, whoami, __schema

use serde_json::json;

use command_model::{SchemaReport, SpecArtifacts};
use request_engine::{CommandResult, GlobalOptions, ProfileStore, DEFAULT_PROFILE};

/// Store a token for `(spec_id, profile)` in the secret store.
///
/// The token comes from the positional argument or `--bearer-token`;
/// there is no interactive prompt.
pub async fn login(
    artifacts: &SpecArtifacts,
    profiles: &dyn ProfileStore,
    globals: &GlobalOptions,
    token: Option<String>,
) -> CommandResult {
    let profile_name = resolve_profile_name(profiles, globals).await;
    let Some(token) = token.or_else(|| globals.bearer_token.clone()) else {
        return CommandResult::error("no token given; usage: login <token>");
    };

    match profiles
        .store_token(&artifacts.spec.spec_id, &profile_name, &token)
        .await
    {
        Ok(()) => CommandResult::data(
            "login",
            json!({
                "specId": artifacts.spec.spec_id,
                "profile": profile_name,
            }),
        ),
        Err(err) => CommandResult::from_engine_error(&err),
    }
}

/// Remove the stored token for `(spec_id, profile)`
pub async fn logout(
    artifacts: &SpecArtifacts,
    profiles: &dyn ProfileStore,
    globals: &GlobalOptions,
) -> CommandResult {
    let profile_name = resolve_profile_name(profiles, globals).await;

    match profiles
        .delete_token(&artifacts.spec.spec_id, &profile_name)
        .await
    {
        Ok(()) => CommandResult::data(
            "logout",
            json!({
                "specId": artifacts.spec.spec_id,
                "profile": profile_name,
            }),
        ),
        Err(err) => CommandResult::from_engine_error(&err),
    }
}

/// Show the active profile, its server, and whether a token is stored
pub async fn whoami(
    artifacts: &SpecArtifacts,
    profiles: &dyn ProfileStore,
    globals: &GlobalOptions,
) -> CommandResult {
    let profile = match profiles.get_profile(globals.profile.as_deref()).await {
        Ok(profile) => profile,
        Err(err) => return CommandResult::from_engine_error(&err),
    };
    let profile_name = profile
        .as_ref()
        .map(|p| p.name.clone())
        .or_else(|| globals.profile.clone())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    let has_token = match profiles
        .get_token(&artifacts.spec.spec_id, &profile_name)
        .await
    {
        Ok(token) => token.is_some(),
        Err(err) => return CommandResult::from_engine_error(&err),
    };

    CommandResult::data(
        "whoami",
        json!({
            "specId": artifacts.spec.spec_id,
            "profile": profile_name,
            "server": profile.and_then(|p| p.server),
            "hasToken": has_token,
        }),
    )
}

/// Emit the deterministic schema payload
pub fn schema(artifacts: &SpecArtifacts, full: bool) -> CommandResult {
    let report = if full {
        SchemaReport::full(artifacts)
    } else {
        SchemaReport::minimal(artifacts)
    };
    CommandResult::data("schema", report)
}

async fn resolve_profile_name(profiles: &dyn ProfileStore, globals: &GlobalOptions) -> String {
    match profiles.get_profile(globals.profile.as_deref()).await {
        Ok(Some(profile)) => profile.name,
        _ => globals
            .profile
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_engine::MemoryProfileStore;
    use spec_core::{SpecLoader, SpecSource};

    const SPEC: &str = r#"
openapi: "3.0.0"
info: {title: Root Test, version: "1"}
paths:
  /things:
    get: {operationId: listThings, tags: [Things]}
"#;

    fn artifacts() -> SpecArtifacts {
        let spec = SpecLoader::from_text(SPEC, SpecSource::Embedded).unwrap();
        SpecArtifacts::build(spec)
    }

    #[tokio::test]
    async fn test_login_whoami_logout_cycle() {
        let artifacts = artifacts();
        let store = MemoryProfileStore::new();
        let globals = GlobalOptions::default();

        let result = login(&artifacts, &store, &globals, Some("tok".to_string())).await;
        match &result {
            CommandResult::Data { kind, data } => {
                assert_eq!(kind, "login");
                assert_eq!(data["profile"], "default");
            }
            other => panic!("expected data, got {:?}", other),
        }

        let result = whoami(&artifacts, &store, &globals).await;
        match &result {
            CommandResult::Data { data, .. } => assert_eq!(data["hasToken"], true),
            other => panic!("expected data, got {:?}", other),
        }

        logout(&artifacts, &store, &globals).await;
        let result = whoami(&artifacts, &store, &globals).await;
        match &result {
            CommandResult::Data { data, .. } => assert_eq!(data["hasToken"], false),
            other => panic!("expected data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_without_token_errors() {
        let artifacts = artifacts();
        let store = MemoryProfileStore::new();
        let result = login(&artifacts, &store, &GlobalOptions::default(), None).await;
        assert!(matches!(result, CommandResult::Error { .. }));
    }

    #[test]
    fn test_schema_kind() {
        let artifacts = artifacts();
        let result = schema(&artifacts, true);
        match result {
            CommandResult::Data { kind, data } => {
                assert_eq!(kind, "schema");
                assert_eq!(data["schemaVersion"], 1);
                assert!(data.get("commandsIndex").is_some());
            }
            other => panic!("expected data, got {:?}", other),
        }
    }
}
