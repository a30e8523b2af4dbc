//! Build script for embedded mode.
//!
//! Reads the OASCLI_* environment variables at build time and
//! materializes the spec text plus default settings as constants in
//! `$OUT_DIR/embedded.rs`. The produced binary never consults these
//! variables at runtime; absence of a variable means "no default".

use std::env;
use std::fs;
use std::path::Path;

const ENV_SPEC: &str = "OASCLI_SPEC";
const ENV_NAME: &str = "OASCLI_NAME";
const ENV_SERVER: &str = "OASCLI_SERVER";
const ENV_SERVER_VARS: &str = "OASCLI_SERVER_VARS";
const ENV_AUTH: &str = "OASCLI_AUTH";
const ENV_VERSION: &str = "OASCLI_VERSION";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for var in [
        ENV_SPEC,
        ENV_NAME,
        ENV_SERVER,
        ENV_SERVER_VARS,
        ENV_AUTH,
        ENV_VERSION,
    ] {
        println!("cargo:rerun-if-env-changed={}", var);
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let mut code = String::new();

    // The spec text is copied into OUT_DIR and included from there so
    // the binary does not depend on the original path at runtime
    match env::var(ENV_SPEC).ok().filter(|path| !path.is_empty()) {
        Some(spec_path) => {
            println!("cargo:rerun-if-changed={}", spec_path);
            let text = fs::read_to_string(&spec_path)
                .unwrap_or_else(|e| panic!("failed to read {} ({}): {}", ENV_SPEC, spec_path, e));
            let copied = Path::new(&out_dir).join("embedded_spec.txt");
            fs::write(&copied, text).expect("failed to write embedded spec copy");
            code.push_str(&format!(
                "pub const EMBEDDED_SPEC: Option<&str> = Some(include_str!({:?}));\n",
                copied
            ));
        }
        None => code.push_str("pub const EMBEDDED_SPEC: Option<&str> = None;\n"),
    }

    push_option_const(&mut code, "CLI_NAME", ENV_NAME);
    push_option_const(&mut code, "DEFAULT_SERVER", ENV_SERVER);
    push_option_const(&mut code, "DEFAULT_SERVER_VARS", ENV_SERVER_VARS);
    push_option_const(&mut code, "DEFAULT_AUTH", ENV_AUTH);
    push_option_const(&mut code, "BUILD_VERSION", ENV_VERSION);

    let dest = Path::new(&out_dir).join("embedded.rs");
    fs::write(&dest, code).expect("failed to write embedded.rs");
}

fn push_option_const(code: &mut String, name: &str, env_var: &str) {
    match env::var(env_var).ok().filter(|value| !value.is_empty()) {
        Some(value) => code.push_str(&format!(
            "pub const {}: Option<&str> = Some({:?});\n",
            name, value
        )),
        None => code.push_str(&format!("pub const {}: Option<&str> = None;\n", name)),
    }
}
