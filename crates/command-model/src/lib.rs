//! # command-model
//!
//! Derives the CLI command tree from a loaded OpenAPI spec: assigns
//! `(resource, action)` names, converts parameters into positionals and
//! flags, generates dot-notation body flags, and aggregates everything
//! into a deterministic, content-addressed catalog.

mod catalog;
mod introspect;
mod naming;
mod params;

pub use catalog::{AuthSummary, CommandAction, CommandModel, CommandResource};
pub use introspect::SchemaReport;
pub use naming::{NamingPlanner, OperationStyle, PlannedOperation};
pub use params::{
    derive_body_flags, derive_params, derive_validation_schemas, BodyFlagDef, ParamKind, ParamSpec,
    ParamType, ValidationSchemas, CURL_FLAG,
};

use spec_core::{
    AuthRegistry, AuthScheme, LoadedSpec, NormalizedOperation, OperationIndex, ServerInfo,
    ServerResolver,
};

/// Everything derived from one spec, built once per process
#[derive(Debug, Clone)]
pub struct SpecArtifacts {
    pub spec: LoadedSpec,
    pub operations: Vec<NormalizedOperation>,
    pub servers: Vec<ServerInfo>,
    pub auth_schemes: Vec<AuthScheme>,
    pub planned: Vec<PlannedOperation>,
    pub model: CommandModel,
}

impl SpecArtifacts {
    /// Run the full derivation pipeline over a loaded spec
    pub fn build(spec: LoadedSpec) -> Self {
        let operations = OperationIndex::build(&spec.document);
        let servers = ServerResolver::collect(&spec.document);
        let auth_schemes = AuthRegistry::parse(&spec.document);
        let planned = NamingPlanner::plan(&operations);
        let model = CommandModel::from_planned(&spec.spec_id, &planned);

        SpecArtifacts {
            spec,
            operations,
            servers,
            auth_schemes,
            planned,
            model,
        }
    }
}
