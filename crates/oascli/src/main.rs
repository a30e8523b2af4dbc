//! oascli - turn any OpenAPI 3.x spec into a non-interactive CLI
//!
//! Loads a spec (embedded at build time, or via `--spec`), derives the
//! command tree, and dispatches `<resource> <action>` invocations to
//! the corresponding HTTP operations. All logging goes to stderr so
//! stdout stays machine-readable.

mod cli;
mod embedded;
mod root_commands;

use std::sync::Arc;

use anyhow::Context as _;
use tracing::debug;

use command_model::SpecArtifacts;
use request_engine::{
    exit_code, output_stream, render_json, render_text, CommandResult, FileProfileStore,
    MemoryProfileStore, OutputStream, ProfileStore, ReqwestFetcher,
};
use spec_core::SpecLoader;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    std::process::exit(run().await);
}

async fn run() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    let spec_arg = cli::prescan_spec(&args);

    // The command tree is derived from the spec, so loading happens
    // before argument parsing
    let artifacts = match load_artifacts(spec_arg.as_deref()).await {
        Ok(artifacts) => artifacts,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return 1;
        }
    };
    debug!(
        spec_id = %artifacts.spec.spec_id,
        commands = artifacts.model.action_count(),
        "command tree ready"
    );

    let defaults = embedded::defaults();
    let matches = match cli::build_cli(&artifacts.model, &defaults).try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            return code;
        }
    };
    let json = cli::json_output(&matches);

    let globals = match cli::globals_from_matches(&matches) {
        Ok(globals) => globals,
        Err(message) => return emit(&CommandResult::error(message), json),
    };

    // Headless environments without a keychain still get a working CLI;
    // they just cannot persist tokens
    let profiles: Arc<dyn ProfileStore> = match FileProfileStore::new() {
        Ok(store) => Arc::new(store),
        Err(_) => Arc::new(MemoryProfileStore::new()),
    };

    let Some((subcommand, sub_matches)) = matches.subcommand() else {
        return 1;
    };

    let result = match subcommand {
        "login" => {
            let token = sub_matches.get_one::<String>("token").cloned();
            root_commands::login(&artifacts, profiles.as_ref(), &globals, token).await
        }
        "logout" => root_commands::logout(&artifacts, profiles.as_ref(), &globals).await,
        "whoami" => root_commands::whoami(&artifacts, profiles.as_ref(), &globals).await,
        "__schema" => root_commands::schema(&artifacts, sub_matches.get_flag("full")),
        resource => {
            let Some((action_name, action_matches)) = sub_matches.subcommand() else {
                return emit(
                    &CommandResult::error(format!("missing action for '{}'", resource)),
                    json,
                );
            };

            let Some(action) = artifacts.model.action(resource, action_name) else {
                return emit(
                    &CommandResult::error(format!(
                        "unknown action: {} {}",
                        resource, action_name
                    )),
                    json,
                );
            };

            let invocation =
                cli::invocation_from_matches(resource, action_name, action, action_matches);

            let fetcher = match ReqwestFetcher::new() {
                Ok(fetcher) => Arc::new(fetcher),
                Err(err) => return emit(&CommandResult::from_engine_error(&err), json),
            };

            let executor = request_engine::Executor::new(
                &artifacts,
                defaults.clone(),
                globals,
                profiles,
                fetcher,
            );
            executor.execute(&invocation, None).await
        }
    };

    emit(&result, json)
}

async fn load_artifacts(spec_arg: Option<&str>) -> anyhow::Result<SpecArtifacts> {
    let loaded = SpecLoader::new()
        .load(spec_arg, embedded::embedded_spec_text())
        .await
        .context("failed to load OpenAPI spec")?;
    Ok(SpecArtifacts::build(loaded))
}

/// Write the rendering to its stream and return the exit code
fn emit(result: &CommandResult, json: bool) -> i32 {
    let rendered = if json {
        render_json(result)
    } else {
        render_text(result)
    };
    match output_stream(result) {
        OutputStream::Stdout => println!("{}", rendered),
        OutputStream::Stderr => eprintln!("{}", rendered),
    }
    exit_code(result)
}
