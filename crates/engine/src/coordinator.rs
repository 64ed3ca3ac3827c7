use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use offload_core::{EngineConfig, TaskEvent, TaskFamily, TaskId, TaskOutput, TaskRequest};

use crate::error::EngineError;
use crate::handlers::HandlerSet;
use crate::router::DelegationRouter;

/// Caller-facing entry point. Allocates task identifiers, dispatches via
/// the delegation router, demultiplexes events per task, and bounds every
/// task with a deadline.
pub struct Coordinator {
    config: EngineConfig,
    router: Arc<DelegationRouter>,
}

/// One submitted task's handle: its id and private event stream, ending
/// with exactly one terminal event.
pub struct TaskTicket {
    id: TaskId,
    submitted_at: DateTime<Utc>,
    events: mpsc::Receiver<TaskEvent>,
}

impl TaskTicket {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Next event for this task; `None` once the stream is finished.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.events.recv().await
    }

    /// Drain progress events and return the terminal outcome.
    pub async fn await_result(mut self) -> Result<TaskOutput, EngineError> {
        while let Some(event) = self.events.recv().await {
            match event {
                TaskEvent::Progress { .. } => continue,
                TaskEvent::Complete { data, .. } => return Ok(data),
                TaskEvent::Error { error, .. } => return Err(EngineError::Task(error)),
            }
        }
        Err(EngineError::Transport(
            "event stream closed without a terminal message".into(),
        ))
    }
}

impl Coordinator {
    pub fn new(config: EngineConfig, handlers: HandlerSet) -> Self {
        let router = Arc::new(DelegationRouter::new(handlers, &config));
        Self { config, router }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Delegated tasks currently in flight (specialized contexts alive).
    pub fn delegated_count(&self) -> usize {
        self.router.delegated_count()
    }

    /// Submit with the family-appropriate timeout: short for numeric and
    /// regex probes, long for media and image work.
    pub async fn submit(&self, request: TaskRequest) -> TaskTicket {
        let timeout = self.timeout_for(&request);
        self.submit_with_timeout(request, timeout).await
    }

    pub async fn submit_with_timeout(&self, request: TaskRequest, timeout: Duration) -> TaskTicket {
        self.track(TaskId::new(), request, timeout).await
    }

    /// Wire ingress: decode a JSON task message and submit it. An unknown
    /// `type` tag resolves the ticket immediately with the decode error
    /// and emits no progress.
    pub async fn submit_raw(&self, wire: serde_json::Value) -> TaskTicket {
        let id = wire
            .get("taskId")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        match TaskRequest::from_wire(wire) {
            Ok(request) => {
                let timeout = self.timeout_for(&request);
                self.track(id, request, timeout).await
            }
            Err(err) => {
                debug!(task = %id, error = %err, "rejected wire task");
                Self::failed_ticket(id, err)
            }
        }
    }

    async fn track(&self, id: TaskId, request: TaskRequest, timeout: Duration) -> TaskTicket {
        let kind = request.kind();
        info!(task = %id, kind, ?timeout, "task submitted");

        let mut source = self.router.dispatch(id, request).await;
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let router = Arc::clone(&self.router);

        // Per-task watchdog: forwards events under a deadline. Whichever
        // of terminal event and deadline comes first wins; the loser's
        // traffic lands in dropped channels and is never surfaced, and
        // release goes through the router's single-release registry.
        tokio::spawn(async move {
            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    event = source.recv() => match event {
                        Some(event) => {
                            let terminal = event.is_terminal();
                            if tx.send(event).await.is_err() {
                                // Ticket dropped; stop tracking and free
                                // any specialized context.
                                router.release(id);
                                break;
                            }
                            if terminal {
                                debug!(task = %id, kind, "task resolved");
                                break;
                            }
                        }
                        None => {
                            warn!(task = %id, kind, "event stream broke before terminal message");
                            let _ = tx
                                .send(TaskEvent::error(
                                    id,
                                    EngineError::Transport(
                                        "event channel closed before terminal message".into(),
                                    ),
                                ))
                                .await;
                            router.release(id);
                            break;
                        }
                    },
                    _ = &mut deadline => {
                        warn!(task = %id, kind, ?timeout, "task timed out");
                        let _ = tx.send(TaskEvent::error(id, EngineError::Timeout(timeout))).await;
                        router.release(id);
                        break;
                    }
                }
            }
        });

        TaskTicket {
            id,
            submitted_at: Utc::now(),
            events: rx,
        }
    }

    fn timeout_for(&self, request: &TaskRequest) -> Duration {
        match request.family() {
            TaskFamily::Matrix | TaskFamily::Text => self.config.default_timeout(),
            TaskFamily::Image | TaskFamily::Audio | TaskFamily::Video => {
                self.config.long_timeout()
            }
        }
    }

    fn failed_ticket(id: TaskId, err: impl ToString) -> TaskTicket {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(TaskEvent::error(id, err));
        TaskTicket {
            id,
            submitted_at: Utc::now(),
            events: rx,
        }
    }
}
