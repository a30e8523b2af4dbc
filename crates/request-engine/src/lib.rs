//! # request-engine
//!
//! Per-invocation pipeline for oascli: builds the HTTP request for a
//! command action (server resolution, parameter placement, validation,
//! auth injection), executes it through an injectable fetcher, and
//! renders the tagged result.

mod body;
mod builder;
mod cancel;
mod error;
mod executor;
mod headers;
mod profile;
mod render;
mod result;

pub use body::{build_body_object, coerce_value, insert_at_path};
pub use builder::{
    BuildOutcome, EmbeddedDefaults, GlobalOptions, Invocation, PreparedRequest, RequestBuilder,
};
pub use cancel::CancellationToken;
pub use error::{EngineError, EngineResult};
pub use executor::{Executor, FetchedResponse, HttpFetcher, ReqwestFetcher};
pub use headers::HeaderMap;
pub use profile::{
    FileProfileStore, MemoryProfileStore, Profile, ProfileStore, SecretToken, DEFAULT_PROFILE,
};
pub use render::{exit_code, output_stream, render_json, render_text, OutputStream};
pub use result::{CommandResult, ResponseInfo, Timing, ValidationIssue};
