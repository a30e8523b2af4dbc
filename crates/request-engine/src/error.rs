//! Error types for request building and execution

use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine error types
///
/// Within an invocation these never unwind past the executor; they are
/// folded into the tagged [`crate::CommandResult`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("unknown action: {0} {1}")]
    UnknownAction(String, String),

    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Auth(String),

    #[error("http request failed: {0}")]
    Transport(String),

    #[error("cancelled")]
    Cancelled,

    #[error("profile store error: {0}")]
    Profile(String),
}
