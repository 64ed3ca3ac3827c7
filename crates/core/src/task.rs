use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DecodeError;
use crate::matrix::Matrix;

/// Opaque task identifier. Allocated by the coordinator, echoed on every
/// message for that task, stable for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task families, used by the delegation router to decide which kinds it
/// handles itself and which it hands to a specialized execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFamily {
    Image,
    Matrix,
    Audio,
    Video,
    Text,
}

impl TaskFamily {
    /// Whether tasks of this family are forwarded to a specialized context.
    pub fn is_delegated(self) -> bool {
        matches!(self, TaskFamily::Matrix | TaskFamily::Audio | TaskFamily::Video)
    }
}

/// One unit of offloaded work. Closed union: adding a task kind means
/// adding a variant here and satisfying the exhaustive handler match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskRequest {
    CompressImage {
        image: Vec<u8>,
        quality: u8,
    },
    BatchCompress {
        images: Vec<Vec<u8>>,
        quality: u8,
    },
    MatrixMultiply {
        matrices: [Matrix; 2],
    },
    MatrixInverse {
        matrix: Matrix,
    },
    MatrixDeterminant {
        matrix: Matrix,
    },
    MatrixEigenvalues {
        matrix: Matrix,
    },
    AudioConvert {
        audio: Vec<u8>,
        format: String,
    },
    AudioAnalyze {
        audio: Vec<u8>,
    },
    VideoTrim {
        video: Vec<u8>,
        start_secs: f64,
        end_secs: f64,
    },
    VideoCompress {
        video: Vec<u8>,
        quality: u8,
    },
    RegexMatch {
        pattern: String,
        #[serde(default)]
        flags: String,
        text: String,
    },
    RegexReplace {
        pattern: String,
        #[serde(default)]
        flags: String,
        text: String,
        replacement: String,
    },
}

/// Every kind tag this engine understands, in wire form.
const KNOWN_KINDS: &[&str] = &[
    "compress-image",
    "batch-compress",
    "matrix-multiply",
    "matrix-inverse",
    "matrix-determinant",
    "matrix-eigenvalues",
    "audio-convert",
    "audio-analyze",
    "video-trim",
    "video-compress",
    "regex-match",
    "regex-replace",
];

impl TaskRequest {
    /// The kebab-case kind tag, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskRequest::CompressImage { .. } => "compress-image",
            TaskRequest::BatchCompress { .. } => "batch-compress",
            TaskRequest::MatrixMultiply { .. } => "matrix-multiply",
            TaskRequest::MatrixInverse { .. } => "matrix-inverse",
            TaskRequest::MatrixDeterminant { .. } => "matrix-determinant",
            TaskRequest::MatrixEigenvalues { .. } => "matrix-eigenvalues",
            TaskRequest::AudioConvert { .. } => "audio-convert",
            TaskRequest::AudioAnalyze { .. } => "audio-analyze",
            TaskRequest::VideoTrim { .. } => "video-trim",
            TaskRequest::VideoCompress { .. } => "video-compress",
            TaskRequest::RegexMatch { .. } => "regex-match",
            TaskRequest::RegexReplace { .. } => "regex-replace",
        }
    }

    pub fn family(&self) -> TaskFamily {
        match self {
            TaskRequest::CompressImage { .. } | TaskRequest::BatchCompress { .. } => {
                TaskFamily::Image
            }
            TaskRequest::MatrixMultiply { .. }
            | TaskRequest::MatrixInverse { .. }
            | TaskRequest::MatrixDeterminant { .. }
            | TaskRequest::MatrixEigenvalues { .. } => TaskFamily::Matrix,
            TaskRequest::AudioConvert { .. } | TaskRequest::AudioAnalyze { .. } => {
                TaskFamily::Audio
            }
            TaskRequest::VideoTrim { .. } | TaskRequest::VideoCompress { .. } => TaskFamily::Video,
            TaskRequest::RegexMatch { .. } | TaskRequest::RegexReplace { .. } => TaskFamily::Text,
        }
    }

    /// Decode a wire-format task, distinguishing an unknown `type` tag from
    /// a malformed payload for a known one. Accepts both flattened fields
    /// and the enveloped `{ taskId, type, data }` form.
    pub fn from_wire(mut value: serde_json::Value) -> Result<Self, DecodeError> {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("taskId");
            if let Some(serde_json::Value::Object(data)) = obj.remove("data") {
                for (k, v) in data {
                    obj.entry(k).or_insert(v);
                }
            }
        }

        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        match serde_json::from_value::<TaskRequest>(value) {
            Ok(req) => Ok(req),
            Err(source) if KNOWN_KINDS.contains(&kind.as_str()) => {
                Err(DecodeError::Payload { kind, source })
            }
            Err(_) => Err(DecodeError::UnknownKind(kind)),
        }
    }
}
