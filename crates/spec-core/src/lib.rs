//! # spec-core
//!
//! OpenAPI 3.x loading and normalization for oascli.
//! Loads a spec from a URL, file, or embedded text, dereferences every
//! `$ref`, computes a canonical fingerprint, and flattens the document
//! into normalized operations, servers, and auth schemes.

mod auth;
mod canonical;
mod deref;
mod error;
mod inflect;
mod loader;
mod operations;
mod servers;
mod source;
mod types;

pub use auth::{AuthKind, AuthRegistry, AuthScheme, OAuthFlowInfo};
pub use canonical::{canonical_json, fingerprint};
pub use deref::Dereferencer;
pub use error::{SpecError, SpecResult};
pub use inflect::{camel_case, kebab_case, pluralize, singularize};
pub use loader::{LoadedSpec, SpecLoader};
pub use operations::OperationIndex;
pub use servers::ServerResolver;
pub use source::{FsReader, SpecReader, SpecSource};
pub use types::*;
