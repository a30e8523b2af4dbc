//! Naming planner: assigns `(resource, action)` to every operation
//!
//! REST and RPC heuristics over tags, operation ids, and path segments,
//! with deterministic collision suffixing so the same spec always
//! yields the same command tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use spec_core::{kebab_case, pluralize, singularize, HttpMethod, NormalizedOperation};

/// Tags too generic to name a resource
const GENERIC_TAGS: [&str; 3] = ["default", "defaults", "api"];

/// Resource used when tags, operation id, and path all yield nothing
const FALLBACK_RESOURCE: &str = "api";

/// How an operation is shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStyle {
    Rest,
    Rpc,
}

/// An operation with its derived CLI identity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedOperation {
    pub operation: NormalizedOperation,
    pub resource: String,
    pub action: String,
    /// Action before collision suffixing
    pub canonical_action: String,
    /// Kebab-cased path template variables
    pub path_args: Vec<String>,
    /// Path template variables exactly as written
    pub raw_path_args: Vec<String>,
    pub style: OperationStyle,
    /// Set when collision resolution renamed the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
}

/// Derives deterministic command names for a list of operations
pub struct NamingPlanner;

impl NamingPlanner {
    /// Plan every operation, resolve collisions, and sort the result by
    /// `(resource, action, path, method)`.
    pub fn plan(operations: &[NormalizedOperation]) -> Vec<PlannedOperation> {
        let mut planned: Vec<PlannedOperation> = operations.iter().map(plan_one).collect();

        resolve_collisions(&mut planned);

        planned.sort_by(|a, b| {
            a.resource
                .cmp(&b.resource)
                .then_with(|| a.action.cmp(&b.action))
                .then_with(|| a.operation.path.cmp(&b.operation.path))
                .then_with(|| a.operation.method.as_str().cmp(b.operation.method.as_str()))
        });

        debug!("planned {} operations", planned.len());
        planned
    }
}

fn plan_one(op: &NormalizedOperation) -> PlannedOperation {
    let style = classify_style(op);
    let resource = derive_resource(op);
    let action = match style {
        OperationStyle::Rest => derive_rest_action(op),
        OperationStyle::Rpc => derive_rpc_action(op),
    };
    let raw_path_args = op.path_template_vars();
    let path_args = raw_path_args.iter().map(|arg| kebab_case(arg)).collect();

    PlannedOperation {
        operation: op.clone(),
        resource,
        canonical_action: action.clone(),
        action,
        path_args,
        raw_path_args,
        style,
        alias_of: None,
    }
}

fn classify_style(op: &NormalizedOperation) -> OperationStyle {
    if op.path.contains('.') {
        return OperationStyle::Rpc;
    }
    let dotted_id = op
        .operation_id
        .as_deref()
        .is_some_and(|id| id.contains('.'));
    if dotted_id && op.method == HttpMethod::Post {
        return OperationStyle::Rpc;
    }
    OperationStyle::Rest
}

fn derive_resource(op: &NormalizedOperation) -> String {
    // 1. First non-generic tag
    for tag in &op.tags {
        if GENERIC_TAGS.contains(&tag.to_ascii_lowercase().as_str()) {
            continue;
        }
        let kebab = kebab_case(tag);
        if !kebab.is_empty() {
            return pluralize(&kebab);
        }
    }

    // 2. operationId prefix before the first '.', '__', or '_'.
    // An id without a separator has no usable prefix (except `ping`,
    // which names itself) and falls through to the path.
    if let Some(id) = op.operation_id.as_deref() {
        if kebab_case(id) == "ping" {
            return "ping".to_string();
        }
        if id.contains('.') || id.contains('_') {
            let prefix = id_prefix(id);
            if !prefix.is_empty() {
                let kebab = kebab_case(prefix);
                if !kebab.is_empty() {
                    return pluralize(&kebab);
                }
            }
        }
    }

    // 3. First non-template path segment
    for segment in op.path.split('/') {
        if segment.is_empty() || segment.starts_with('{') {
            continue;
        }
        // RPC-ish dotted segments contribute their first component
        let head = segment.split('.').next().unwrap_or(segment);
        if head == "ping" {
            return head.to_string();
        }
        let kebab = kebab_case(head);
        if !kebab.is_empty() {
            return pluralize(&kebab);
        }
    }

    FALLBACK_RESOURCE.to_string()
}

fn derive_rest_action(op: &NormalizedOperation) -> String {
    if let Some(suffix) = op.operation_id.as_deref().and_then(id_suffix) {
        let canon = canonicalize_action(&kebab_case(suffix));
        if is_crud_action(&canon) {
            return canon;
        }
    }

    let has_path_args = !op.path_template_vars().is_empty();
    match (op.method, has_path_args) {
        (HttpMethod::Get, false) => "list".to_string(),
        (HttpMethod::Post, false) => "create".to_string(),
        (HttpMethod::Get, true) => "get".to_string(),
        (HttpMethod::Put, true) | (HttpMethod::Patch, true) => "update".to_string(),
        (HttpMethod::Delete, true) => "delete".to_string(),
        (method, _) => kebab_case(method.lower()),
    }
}

fn derive_rpc_action(op: &NormalizedOperation) -> String {
    if let Some(suffix) = op.operation_id.as_deref().and_then(id_suffix) {
        let canon = canonicalize_action(&kebab_case(suffix));
        if !canon.is_empty() {
            return canon;
        }
    }

    // Last dotted component of the last real path segment
    if let Some(segment) = op
        .path
        .split('/')
        .rev()
        .find(|s| !s.is_empty() && !s.starts_with('{'))
    {
        if segment.contains('.') {
            if let Some(tail) = segment.rsplit('.').next() {
                let canon = canonicalize_action(&kebab_case(tail));
                if !canon.is_empty() {
                    return canon;
                }
            }
        }
    }

    kebab_case(op.method.lower())
}

/// Prefix of an operation id before the first `.`, `__`, or `_`
fn id_prefix(id: &str) -> &str {
    let end = id
        .find('.')
        .into_iter()
        .chain(id.find('_'))
        .min()
        .unwrap_or(id.len());
    &id[..end]
}

/// Suffix of an operation id after the last `.` or `_`
fn id_suffix(id: &str) -> Option<&str> {
    let start = id.rfind(['.', '_'])?;
    let suffix = &id[start + 1..];
    (!suffix.is_empty()).then_some(suffix)
}

fn canonicalize_action(action: &str) -> String {
    match action {
        "retrieve" | "read" => "get".to_string(),
        "search" => "list".to_string(),
        "patch" => "update".to_string(),
        "remove" => "delete".to_string(),
        other => other.to_string(),
    }
}

fn is_crud_action(action: &str) -> bool {
    matches!(action, "get" | "list" | "create" | "update" | "delete")
}

/// Synonyms that canonicalize to the given action, the action first
fn action_synonyms(action: &str) -> Vec<&'static str> {
    match action {
        "get" => vec!["get", "retrieve", "read"],
        "list" => vec!["list", "search"],
        "update" => vec!["update", "patch"],
        "delete" => vec!["delete", "remove"],
        "create" => vec!["create"],
        _ => vec![],
    }
}

fn resolve_collisions(planned: &mut [PlannedOperation]) {
    let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (idx, plan) in planned.iter().enumerate() {
        groups
            .entry((plan.resource.clone(), plan.action.clone()))
            .or_default()
            .push(idx);
    }

    for indices in groups.values().filter(|g| g.len() > 1) {
        for &idx in indices {
            let canonical = planned[idx].action.clone();
            if let Some(action) = disambiguate(&planned[idx], &canonical) {
                planned[idx].action = action;
                planned[idx].alias_of = Some(canonical);
            }
        }
    }

    // Anything still colliding gets a positional numeric suffix in
    // original order
    let mut remaining: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (idx, plan) in planned.iter().enumerate() {
        remaining
            .entry((plan.resource.clone(), plan.action.clone()))
            .or_default()
            .push(idx);
    }
    for indices in remaining.values().filter(|g| g.len() > 1) {
        for (pos, &idx) in indices.iter().enumerate() {
            let base = planned[idx].action.clone();
            planned[idx].action = format!("{}-{}", base, pos + 1);
            if planned[idx].alias_of.is_none() {
                planned[idx].alias_of = Some(base);
            }
        }
    }
}

/// Derive a collision suffix for one operation, if anything meaningful
/// distinguishes it.
fn disambiguate(plan: &PlannedOperation, canonical: &str) -> Option<String> {
    // 1. Remaining material in the operation id once the action and
    //    resource words are stripped
    if let Some(id) = plan.operation.operation_id.as_deref() {
        let mut tail = kebab_case(id);
        let mut synonyms: Vec<&str> = action_synonyms(canonical);
        if synonyms.is_empty() {
            synonyms.push(canonical);
        }
        for synonym in synonyms {
            if tail == synonym {
                tail.clear();
                break;
            }
            if let Some(rest) = tail.strip_prefix(&format!("{}-", synonym)) {
                tail = rest.to_string();
                break;
            }
        }
        tail = remove_word(&tail, &plan.resource);
        tail = remove_word(&tail, &singularize(&plan.resource));
        if !tail.is_empty() {
            return Some(format!("{}-{}", canonical, tail));
        }
    }

    // 2. Last non-template path segment distinct from the resource
    if let Some(segment) = plan
        .operation
        .path
        .split('/')
        .rev()
        .find(|s| !s.is_empty() && !s.starts_with('{'))
    {
        let kebab = kebab_case(segment);
        if !kebab.is_empty()
            && kebab != plan.resource
            && kebab != singularize(&plan.resource)
        {
            return Some(format!("{}-{}", canonical, kebab));
        }
    }

    None
}

/// Remove every dash-aligned occurrence of `word` from `text`
fn remove_word(text: &str, word: &str) -> String {
    let segments: Vec<&str> = text.split('-').filter(|s| !s.is_empty()).collect();
    let word_segments: Vec<&str> = word.split('-').filter(|s| !s.is_empty()).collect();
    if word_segments.is_empty() {
        return segments.join("-");
    }

    let mut out: Vec<&str> = Vec::with_capacity(segments.len());
    let mut i = 0;
    while i < segments.len() {
        if segments[i..].starts_with(&word_segments[..]) {
            i += word_segments.len();
        } else {
            out.push(segments[i]);
            i += 1;
        }
    }
    out.join("-")
}
