//! Dynamic clap command tree
//!
//! The tree is data-driven: one subcommand per resource, one nested
//! subcommand per action, with positionals in path-template order and
//! typed flags. Help is grouped Required / Options / Global.

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Value};

use command_model::{BodyFlagDef, CommandAction, CommandModel, ParamSpec, ParamType, CURL_FLAG};
use request_engine::{EmbeddedDefaults, GlobalOptions, Invocation};

const HEADING_REQUIRED: &str = "Required";
const HEADING_OPTIONS: &str = "Options";
const HEADING_GLOBAL: &str = "Global";

/// Root names claimed by built-in commands
const RESERVED_COMMANDS: [&str; 4] = ["login", "logout", "whoami", "__schema"];

/// Build the root command for a derived model
pub fn build_cli(model: &CommandModel, embedded: &EmbeddedDefaults) -> Command {
    let name = embedded
        .cli_name
        .clone()
        .unwrap_or_else(|| "oascli".to_string());
    let version = embedded
        .version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    let mut root = Command::new(name)
        .about("Command-line interface derived from an OpenAPI spec")
        .version(version)
        .disable_version_flag(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version")
                .help_heading(HEADING_GLOBAL),
        );

    for arg in global_args() {
        root = root.arg(arg);
    }

    root = root
        .subcommand(
            Command::new("login")
                .about("Store a token for this spec in the OS keychain")
                .arg(Arg::new("token").value_name("TOKEN").help("Token to store")),
        )
        .subcommand(Command::new("logout").about("Remove the stored token for this spec"))
        .subcommand(Command::new("whoami").about("Show the active profile and token state"))
        .subcommand(
            Command::new("__schema")
                .about("Emit the machine-readable command schema")
                .arg(
                    Arg::new("full")
                        .long("full")
                        .action(ArgAction::SetTrue)
                        .help("Include raw operations, planning, and the command index"),
                ),
        );

    for resource in &model.resources {
        if RESERVED_COMMANDS.contains(&resource.resource.as_str()) {
            tracing::warn!(
                "resource '{}' shadows a built-in command and is not registered",
                resource.resource
            );
            continue;
        }
        let mut sub = Command::new(resource.resource.clone())
            .about(format!("Operations on {}", resource.resource))
            .subcommand_required(true)
            .arg_required_else_help(true);
        for action in &resource.actions {
            sub = sub.subcommand(action_command(action));
        }
        root = root.subcommand(sub);
    }

    root
}

fn global_args() -> Vec<Arg> {
    vec![
        Arg::new("spec")
            .long("spec")
            .value_name("URL|PATH")
            .global(true)
            .help("OpenAPI spec to load (ignored when one is embedded)")
            .help_heading(HEADING_GLOBAL),
        Arg::new("server")
            .long("server")
            .value_name("URL")
            .global(true)
            .help("Server URL override")
            .help_heading(HEADING_GLOBAL),
        Arg::new("serverVar")
            .long("server-var")
            .value_name("NAME=VALUE")
            .action(ArgAction::Append)
            .global(true)
            .help("Server variable (repeatable)")
            .help_heading(HEADING_GLOBAL),
        Arg::new("header")
            .long("header")
            .value_name("NAME: VALUE")
            .action(ArgAction::Append)
            .global(true)
            .help("Extra request header (repeatable)")
            .help_heading(HEADING_GLOBAL),
        Arg::new("auth")
            .long("auth")
            .value_name("SCHEME")
            .global(true)
            .help("Auth scheme key from the spec")
            .help_heading(HEADING_GLOBAL),
        Arg::new("bearerToken")
            .long("bearer-token")
            .alias("oauth-token")
            .value_name("TOKEN")
            .global(true)
            .help("Bearer token (alias: --oauth-token)")
            .help_heading(HEADING_GLOBAL),
        Arg::new("username")
            .long("username")
            .value_name("USER")
            .global(true)
            .help("Username for HTTP basic auth")
            .help_heading(HEADING_GLOBAL),
        Arg::new("password")
            .long("password")
            .value_name("PASS")
            .global(true)
            .help("Password for HTTP basic auth")
            .help_heading(HEADING_GLOBAL),
        Arg::new("apiKey")
            .long("api-key")
            .value_name("KEY")
            .global(true)
            .help("API key credential")
            .help_heading(HEADING_GLOBAL),
        Arg::new("profile")
            .long("profile")
            .value_name("NAME")
            .global(true)
            .help("Connection profile to use")
            .help_heading(HEADING_GLOBAL),
        Arg::new("autoAuth")
            .long("auto-auth")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Allow falling back to a stored bearer token")
            .help_heading(HEADING_GLOBAL),
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Machine-readable JSON output")
            .help_heading(HEADING_GLOBAL),
    ]
}

fn positional_id(index: usize) -> String {
    format!("positional-{}", index)
}

fn action_command(action: &CommandAction) -> Command {
    let mut cmd = Command::new(action.action.clone());
    if let Some(summary) = &action.summary {
        cmd = cmd.about(summary.clone());
    }

    for (index, spec) in action.positionals.iter().enumerate() {
        let mut arg = Arg::new(positional_id(index))
            .value_name(spec.name.to_uppercase())
            .required(true);
        if let Some(description) = &spec.description {
            arg = arg.help(description.clone());
        }
        cmd = cmd.arg(arg);
    }

    // Identical lookup keys (two params kebabbing to the same flag)
    // would make the parser reject the whole tree
    let mut seen = std::collections::HashSet::new();
    for spec in &action.flags {
        if !seen.insert(spec.lookup_key()) {
            continue;
        }
        cmd = cmd.arg(flag_arg(spec));
    }
    for def in &action.body_flags {
        if !seen.insert(def.lookup_key()) {
            continue;
        }
        cmd = cmd.arg(body_flag_arg(def));
    }

    // The built-in --curl, unless a parameter already claimed it
    if !action.flags.iter().any(|f| f.flag == CURL_FLAG) {
        cmd = cmd.arg(
            Arg::new("curl")
                .long("curl")
                .action(ArgAction::SetTrue)
                .help("Print a curl command instead of executing")
                .help_heading(HEADING_OPTIONS),
        );
    }

    cmd
}

fn flag_arg(spec: &ParamSpec) -> Arg {
    let long = spec.flag.trim_start_matches('-').to_string();
    let mut arg = Arg::new(spec.lookup_key()).long(long);

    arg = match spec.param_type {
        ParamType::Boolean => arg.action(ArgAction::SetTrue),
        ParamType::Array => arg
            .action(ArgAction::Append)
            .value_name(type_value_name(spec.item_type.unwrap_or(ParamType::String))),
        other => arg.action(ArgAction::Set).value_name(type_value_name(other)),
    };

    let mut help = spec.description.clone().unwrap_or_default();
    if !spec.enum_values.is_empty() {
        if !help.is_empty() {
            help.push(' ');
        }
        help.push_str(&format!("[one of: {}]", spec.enum_values.join(", ")));
    }
    if !help.is_empty() {
        arg = arg.help(help);
    }

    if spec.required {
        arg.required(true).help_heading(HEADING_REQUIRED)
    } else {
        arg.help_heading(HEADING_OPTIONS)
    }
}

fn body_flag_arg(def: &BodyFlagDef) -> Arg {
    let long = def.flag.trim_start_matches('-').to_string();
    let mut arg = Arg::new(def.lookup_key()).long(long);

    arg = match def.param_type {
        ParamType::Boolean => arg.action(ArgAction::SetTrue),
        other => arg.action(ArgAction::Set).value_name(type_value_name(other)),
    };

    if !def.description.is_empty() {
        arg = arg.help(def.description.clone());
    }

    if def.required {
        arg.required(true).help_heading(HEADING_REQUIRED)
    } else {
        arg.help_heading(HEADING_OPTIONS)
    }
}

fn type_value_name(param_type: ParamType) -> &'static str {
    match param_type {
        ParamType::String => "STRING",
        ParamType::Number => "NUMBER",
        ParamType::Integer => "INTEGER",
        ParamType::Boolean => "BOOLEAN",
        _ => "VALUE",
    }
}

/// Convert matched arguments into an engine invocation
pub fn invocation_from_matches(
    resource: &str,
    action_name: &str,
    action: &CommandAction,
    matches: &ArgMatches,
) -> Invocation {
    let mut positionals = Vec::new();
    for index in 0..action.positionals.len() {
        if let Some(value) = matches.get_one::<String>(&positional_id(index)) {
            positionals.push(value.clone());
        }
    }

    let mut flags = Map::new();
    for spec in &action.flags {
        let key = spec.lookup_key();
        match spec.param_type {
            ParamType::Boolean => {
                if matches.get_flag(&key) {
                    flags.insert(key, Value::Bool(true));
                }
            }
            ParamType::Array => {
                if let Some(values) = matches.get_many::<String>(&key) {
                    let mut items = Vec::new();
                    for value in values {
                        expand_array_value(value, &mut items);
                    }
                    flags.insert(key, Value::Array(items));
                }
            }
            _ => {
                if let Some(value) = matches.get_one::<String>(&key) {
                    flags.insert(key, Value::String(value.clone()));
                }
            }
        }
    }

    for def in &action.body_flags {
        let key = def.lookup_key();
        match def.param_type {
            ParamType::Boolean => {
                if matches.get_flag(&key) {
                    flags.insert(key, Value::Bool(true));
                }
            }
            _ => {
                if let Some(value) = matches.get_one::<String>(&key) {
                    flags.insert(key, Value::String(value.clone()));
                }
            }
        }
    }

    let curl = !action.flags.iter().any(|f| f.flag == CURL_FLAG) && matches.get_flag("curl");

    Invocation {
        resource: resource.to_string(),
        action: action_name.to_string(),
        positionals,
        flags,
        curl,
    }
}

/// One array flag occurrence: a JSON array, a comma list, or one value
fn expand_array_value(raw: &str, items: &mut Vec<Value>) {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(parsed)) = serde_json::from_str::<Value>(trimmed) {
            items.extend(parsed);
            return;
        }
    }
    for part in raw.split(',') {
        if !part.is_empty() {
            items.push(Value::String(part.to_string()));
        }
    }
}

/// Read the root-level options out of the matches
pub fn globals_from_matches(matches: &ArgMatches) -> Result<GlobalOptions, String> {
    let mut globals = GlobalOptions {
        server: matches.get_one::<String>("server").cloned(),
        auth_scheme: matches.get_one::<String>("auth").cloned(),
        bearer_token: matches.get_one::<String>("bearerToken").cloned(),
        username: matches.get_one::<String>("username").cloned(),
        password: matches.get_one::<String>("password").cloned(),
        api_key: matches.get_one::<String>("apiKey").cloned(),
        profile: matches.get_one::<String>("profile").cloned(),
        auto_bearer: matches.get_flag("autoAuth"),
        ..GlobalOptions::default()
    };

    if let Some(pairs) = matches.get_many::<String>("serverVar") {
        for pair in pairs {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                format!("malformed --server-var '{}', expected name=value", pair)
            })?;
            globals
                .server_vars
                .insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    if let Some(headers) = matches.get_many::<String>("header") {
        for header in headers {
            let (name, value) = header.split_once(':').ok_or_else(|| {
                format!("malformed --header '{}', expected 'Name: Value'", header)
            })?;
            globals
                .headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok(globals)
}

pub fn json_output(matches: &ArgMatches) -> bool {
    matches.get_flag("json")
}

/// Scan raw argv for `--spec` before the real parse; the clap tree
/// itself depends on the loaded spec
pub fn prescan_spec(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--spec" {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix("--spec=") {
            return Some(value.to_string());
        }
    }
    None
}
