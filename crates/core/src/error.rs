use thiserror::Error;

/// Errors raised while decoding wire-format task traffic.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unknown task type: {0}")]
    UnknownKind(String),

    #[error("invalid payload for task type {kind}: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid matrix shape: {0}")]
    Shape(String),
}
