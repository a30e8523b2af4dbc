//! Error types for spec loading

use thiserror::Error;

/// Result type alias for spec loading operations
pub type SpecResult<T> = std::result::Result<T, SpecError>;

/// Spec loading error types
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("no OpenAPI spec provided - pass --spec <url|path> or build with an embedded spec")]
    NoSpecProvided,

    #[error("failed to fetch OpenAPI spec: {0}")]
    FetchFailed(String),

    #[error("failed to parse OpenAPI spec: {0}")]
    ParseFailed(String),

    #[error("invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
