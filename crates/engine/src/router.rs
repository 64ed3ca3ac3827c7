use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use offload_core::{EngineConfig, TaskEvent, TaskId, TaskRequest};

use crate::context::{ContextHandle, ExecutionContext, TaskMessage};
use crate::error::EngineError;
use crate::handlers::HandlerSet;

type Registry = Mutex<HashMap<TaskId, ContextHandle>>;

/// Coordinator-facing execution context that owns a pool-by-need of
/// specialized contexts. Matrix, audio, and video tasks are forwarded to
/// a specialized context spawned for that task; every event it emits is
/// relayed verbatim, and the context is terminated the moment its task's
/// terminal event is observed. Image and regex kinds are handled on the
/// router's own local context.
pub struct DelegationRouter {
    handlers: HandlerSet,
    capacity: usize,
    local: ContextHandle,
    registry: Arc<Registry>,
}

impl DelegationRouter {
    pub fn new(handlers: HandlerSet, config: &EngineConfig) -> Self {
        let local = ExecutionContext::spawn(handlers.clone(), config.channel_capacity);
        Self {
            handlers,
            capacity: config.channel_capacity,
            local,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Dispatch one task, returning its private event stream.
    pub async fn dispatch(&self, id: TaskId, request: TaskRequest) -> mpsc::Receiver<TaskEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);

        if request.family().is_delegated() {
            self.delegate(id, request, tx).await;
        } else if let Err(err) = self
            .local
            .send(TaskMessage {
                id,
                request,
                reply: tx.clone(),
            })
            .await
        {
            warn!(task = %id, error = %err, "local dispatch failed");
            let _ = tx.send(TaskEvent::error(id, err)).await;
        }

        rx
    }

    async fn delegate(&self, id: TaskId, request: TaskRequest, caller: mpsc::Sender<TaskEvent>) {
        let kind = request.kind();
        let (reply, mut events) = mpsc::channel(self.capacity);
        let msg = TaskMessage { id, request, reply };

        // Acquire-on-delegate: one specialized context per task id,
        // reused only for that exact id.
        let send_result = {
            let mut registry = self.registry.lock().expect("registry poisoned");
            let handle = registry.entry(id).or_insert_with(|| {
                debug!(task = %id, kind, "spawning specialized context");
                ExecutionContext::spawn(self.handlers.clone(), self.capacity)
            });
            handle.try_send(msg)
        };

        if let Err(err) = send_result {
            warn!(task = %id, kind, error = %err, "delegation failed");
            self.release(id);
            let _ = caller
                .send(TaskEvent::error(id, EngineError::Delegation(err.to_string())))
                .await;
            return;
        }

        // Relay every specialized-context event verbatim; on the terminal
        // event, release the context. A specialized context must never
        // outlive its task's terminal message.
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let terminal = event.is_terminal();
                let forwarded = caller.send(event).await.is_ok();
                if terminal {
                    release_from(&registry, id);
                    break;
                }
                if !forwarded {
                    // Caller went away (timeout or dropped ticket); that
                    // path owns the release.
                    break;
                }
            }
        });
    }

    /// Release the specialized context for `id`, if any. Idempotent: the
    /// handle is removed from the registry before it is terminated, so a
    /// task is released at most once no matter which exit path gets here
    /// first.
    pub fn release(&self, id: TaskId) -> bool {
        release_from(&self.registry, id)
    }

    /// Number of live specialized contexts (delegated tasks in flight).
    pub fn delegated_count(&self) -> usize {
        self.registry.lock().expect("registry poisoned").len()
    }
}

fn release_from(registry: &Registry, id: TaskId) -> bool {
    let handle = registry.lock().expect("registry poisoned").remove(&id);
    match handle {
        Some(handle) => {
            handle.terminate();
            debug!(task = %id, "specialized context released");
            true
        }
        None => false,
    }
}
