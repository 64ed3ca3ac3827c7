pub mod config;
pub mod error;
pub mod event;
pub mod matrix;
pub mod task;

pub use config::EngineConfig;
pub use error::DecodeError;
pub use event::{BatchItem, EigenPair, RegexHit, TaskEvent, TaskOutput};
pub use matrix::Matrix;
pub use task::{TaskFamily, TaskId, TaskRequest};
