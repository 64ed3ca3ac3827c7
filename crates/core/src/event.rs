use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;
use crate::task::TaskId;

/// Dominant eigenvalue estimate produced by power iteration.
///
/// `converged` distinguishes a tolerance-met result from one returned
/// after exhausting the iteration cap; callers needing strict convergence
/// must check it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// One regex match: the matched text, its byte offset, and capture groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexHit {
    pub text: String,
    pub start: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Option<String>>,
}

/// One item of a batch-compress result, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    pub image: Vec<u8>,
}

/// Kind-specific result payload carried by a `complete` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskOutput {
    Image { image: Vec<u8> },
    Batch { items: Vec<BatchItem> },
    Matrix { matrix: Matrix },
    Scalar { value: f64 },
    Eigen { eigen: EigenPair },
    Media { media: Vec<u8> },
    Analysis { analysis: serde_json::Value },
    Matches { matches: Vec<RegexHit> },
    Replaced { text: String, replacements: usize },
}

/// The only traffic an execution context emits: zero or more `progress`
/// events followed by exactly one terminal `complete` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskEvent {
    Progress {
        #[serde(rename = "taskId")]
        task_id: TaskId,
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Complete {
        #[serde(rename = "taskId")]
        task_id: TaskId,
        data: TaskOutput,
    },
    Error {
        #[serde(rename = "taskId")]
        task_id: TaskId,
        error: String,
    },
}

impl TaskEvent {
    pub fn progress(task_id: TaskId, progress: u8, message: Option<String>) -> Self {
        TaskEvent::Progress {
            task_id,
            progress: progress.min(100),
            message,
        }
    }

    pub fn complete(task_id: TaskId, data: TaskOutput) -> Self {
        TaskEvent::Complete { task_id, data }
    }

    pub fn error(task_id: TaskId, error: impl ToString) -> Self {
        TaskEvent::Error {
            task_id,
            error: error.to_string(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::Progress { task_id, .. }
            | TaskEvent::Complete { task_id, .. }
            | TaskEvent::Error { task_id, .. } => *task_id,
        }
    }

    /// Whether this event ends its task's message sequence.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Progress { .. })
    }
}
