use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use offload_core::{TaskEvent, TaskId, TaskRequest};

use crate::error::EngineError;
use crate::handlers::HandlerSet;

/// In-process envelope for one unit of offloaded work. The bounded
/// `reply` channel is the task's private event stream: progress events
/// followed by exactly one terminal event.
pub struct TaskMessage {
    pub id: TaskId,
    pub request: TaskRequest,
    pub reply: mpsc::Sender<TaskEvent>,
}

/// Owning handle to a spawned execution context.
///
/// Dropping the handle closes the inbox, letting the context drain and
/// exit; [`ContextHandle::terminate`] is the forcible stop used for
/// cancellation and delegated-task cleanup.
pub struct ContextHandle {
    tx: mpsc::Sender<TaskMessage>,
    join: JoinHandle<()>,
}

impl ContextHandle {
    /// Enqueue a task. Fails only if the context is gone.
    pub async fn send(&self, msg: TaskMessage) -> Result<(), EngineError> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| EngineError::Transport("execution context inbox closed".into()))
    }

    /// Enqueue a task without waiting for inbox room.
    pub fn try_send(&self, msg: TaskMessage) -> Result<(), EngineError> {
        self.tx.try_send(msg).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                EngineError::Transport("execution context inbox full".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                EngineError::Transport("execution context inbox closed".into())
            }
        })
    }

    /// Forcibly stop the context. The only cancellation primitive: there
    /// is no cooperative signal into a running handler. A kernel call
    /// already in flight finishes on its blocking thread, but its events
    /// land in a dropped channel and are discarded.
    pub fn terminate(self) {
        self.join.abort();
    }
}

/// An isolated unit of background execution. Receives task messages,
/// runs the handler matching each task's kind, and emits that task's
/// events on its reply channel. Tasks are processed strictly
/// sequentially; parallelism comes from running multiple contexts.
pub struct ExecutionContext;

impl ExecutionContext {
    /// Spawn a context with the given handlers and inbox capacity.
    pub fn spawn(handlers: HandlerSet, inbox_capacity: usize) -> ContextHandle {
        let (tx, mut rx) = mpsc::channel::<TaskMessage>(inbox_capacity.max(1));

        let join = tokio::spawn(async move {
            while let Some(TaskMessage { id, request, reply }) = rx.recv().await {
                let kind = request.kind();
                debug!(task = %id, kind, "task started");

                let worker = handlers.clone();
                let worker_reply = reply.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || worker.execute(id, request, &worker_reply))
                        .await;

                match outcome {
                    Ok(()) => debug!(task = %id, kind, "task finished"),
                    Err(fault) => {
                        // Handler panicked before reaching its terminal
                        // event; convert the fault into that one event.
                        warn!(task = %id, kind, error = %fault, "task handler fault");
                        let _ = reply
                            .send(TaskEvent::error(
                                id,
                                EngineError::Transport(format!("handler fault: {fault}")),
                            ))
                            .await;
                    }
                }
            }
        });

        ContextHandle { tx, join }
    }
}
