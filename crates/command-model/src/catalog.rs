//! Command catalog: resource-grouped, deterministic, content-addressed

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use spec_core::{
    kebab_case, HttpMethod, NormalizedRequestBody, SecurityAlternative,
};

use crate::naming::{OperationStyle, PlannedOperation};
use crate::params::{
    derive_body_flags, derive_params, derive_validation_schemas, BodyFlagDef, ParamSpec,
    ValidationSchemas,
};

/// Auth requirements of one action: an ordered list of alternatives,
/// any one of which authorizes the call. Empty means no auth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSummary {
    pub alternatives: Vec<SecurityAlternative>,
}

impl AuthSummary {
    pub fn required(&self) -> bool {
        !self.alternatives.is_empty()
    }

    /// The only scheme key, when exactly one alternative with exactly
    /// one requirement exists
    pub fn single_scheme(&self) -> Option<&str> {
        match self.alternatives.as_slice() {
            [alt] => match alt.requirements.as_slice() {
                [req] => Some(&req.key),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One executable action of the CLI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAction {
    /// Content-addressed id: `{spec_id}:{resource}:{action}:{operation key}`
    pub id: String,
    /// Operation key, `"METHOD path"`
    pub key: String,
    pub action: String,
    pub canonical_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub raw_path_args: Vec<String>,
    pub positionals: Vec<ParamSpec>,
    pub flags: Vec<ParamSpec>,
    pub body_flags: Vec<BodyFlagDef>,
    #[serde(skip_serializing)]
    pub validation: ValidationSchemas,
    pub auth: AuthSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<NormalizedRequestBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body_schema: Option<Value>,
    pub style: OperationStyle,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
}

impl CommandAction {
    /// All parameters, positionals first
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.positionals.iter().chain(self.flags.iter())
    }
}

/// A resource with its sorted actions
#[derive(Debug, Clone, Serialize)]
pub struct CommandResource {
    pub resource: String,
    pub actions: Vec<CommandAction>,
}

/// The full derived command tree
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandModel {
    pub spec_id: String,
    pub resources: Vec<CommandResource>,
}

impl CommandModel {
    /// Aggregate planned operations into the final catalog.
    ///
    /// Resources sort alphabetically; actions within a resource sort by
    /// `(action, path, method)`.
    pub fn from_planned(spec_id: &str, planned: &[PlannedOperation]) -> CommandModel {
        let mut grouped: BTreeMap<String, Vec<CommandAction>> = BTreeMap::new();

        for plan in planned {
            grouped
                .entry(plan.resource.clone())
                .or_default()
                .push(build_action(spec_id, plan));
        }

        let resources = grouped
            .into_iter()
            .map(|(resource, mut actions)| {
                actions.sort_by(|a, b| {
                    a.action
                        .cmp(&b.action)
                        .then_with(|| a.path.cmp(&b.path))
                        .then_with(|| a.method.as_str().cmp(b.method.as_str()))
                });
                CommandResource { resource, actions }
            })
            .collect();

        CommandModel {
            spec_id: spec_id.to_string(),
            resources,
        }
    }

    pub fn resource(&self, name: &str) -> Option<&CommandResource> {
        self.resources.iter().find(|r| r.resource == name)
    }

    pub fn action(&self, resource: &str, action: &str) -> Option<&CommandAction> {
        self.resource(resource)?
            .actions
            .iter()
            .find(|a| a.action == action)
    }

    pub fn action_count(&self) -> usize {
        self.resources.iter().map(|r| r.actions.len()).sum()
    }
}

fn build_action(spec_id: &str, plan: &PlannedOperation) -> CommandAction {
    let op = &plan.operation;
    let (positionals, flags) = derive_params(op);
    let body_flags = derive_body_flags(op.request_body.as_ref(), &flags);
    let validation = derive_validation_schemas(&flags);
    let request_body_schema = op
        .request_body
        .as_ref()
        .and_then(NormalizedRequestBody::preferred_schema)
        .cloned();

    let key = op.key();
    let id = format!(
        "{}:{}:{}:{}",
        spec_id,
        kebab_case(&plan.resource),
        kebab_case(&plan.action),
        kebab_case(&key)
    );

    CommandAction {
        id,
        key,
        action: plan.action.clone(),
        canonical_action: plan.canonical_action.clone(),
        alias_of: plan.alias_of.clone(),
        method: op.method,
        path: op.path.clone(),
        raw_path_args: plan.raw_path_args.clone(),
        positionals,
        flags,
        body_flags,
        validation,
        auth: AuthSummary {
            alternatives: op.security.clone().unwrap_or_default(),
        },
        request_body: op.request_body.clone(),
        request_body_schema,
        style: plan.style,
        tags: op.tags.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        deprecated: op.deprecated,
    }
}
