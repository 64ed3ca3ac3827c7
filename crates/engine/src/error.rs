use std::time::Duration;

use thiserror::Error;

use offload_core::DecodeError;
use offload_kernels::KernelError;

/// Errors surfaced by the offload engine. Every failure inside a handler
/// is caught at the execution-context boundary and rendered into exactly
/// one wire `error` message via `Display`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("invalid regex: {0}")]
    Regex(String),

    #[error("codec failure: {0}")]
    Codec(String),

    #[error("delegation failed: {0}")]
    Delegation(String),

    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    /// Error string carried back from a task's terminal `error` event.
    #[error("{0}")]
    Task(String),
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        EngineError::Regex(err.to_string())
    }
}
