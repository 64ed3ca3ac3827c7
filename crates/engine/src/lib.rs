//! Background compute-offload engine.
//!
//! Moves CPU-heavy work off the caller's thread into isolated execution
//! contexts, coordinates delegation among specialized contexts, reports
//! progress, and bounds execution with timeouts. All cross-boundary
//! traffic is message passing over bounded channels; per task the caller
//! observes zero or more `progress` events and exactly one terminal
//! `complete` or `error`.

pub mod codec;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod router;

pub use codec::{ImageCodec, MediaCodec};
pub use context::{ContextHandle, ExecutionContext, TaskMessage};
pub use coordinator::{Coordinator, TaskTicket};
pub use error::EngineError;
pub use handlers::HandlerSet;
pub use router::DelegationRouter;
