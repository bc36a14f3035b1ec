//! Listener that turns task outcomes into actor output.

use super::actor::TaskActorShared;
use super::processor::TaskProcessor;
use crate::director::DirectorHandle;
use gangway_core::error::ErrorCode;
use gangway_core::message::Message;
use gangway_core::process::{ContextCallback, ContextEvent, ContextEventKind, ProcessManager, Task};
use gangway_core::types::{CallbackId, RequestId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Observes one task started by a [`TaskBasedActor`](super::TaskBasedActor).
///
/// The first terminal outcome consumes the listener; any later one is
/// ignored. Whatever the outcome, the listener is removed exactly once,
/// which releases the director busy-task entry.
pub(crate) struct TaskCallback<P> {
    id: CallbackId,
    actor: Weak<TaskActorShared<P>>,
    manager: Weak<dyn ProcessManager>,
    director: DirectorHandle,
    request: RequestId,
    task: Task,
    message: Message,
    consumed: Mutex<bool>,
    released: AtomicBool,
}

impl<P: TaskProcessor> TaskCallback<P> {
    pub(crate) fn new(
        actor: &Arc<TaskActorShared<P>>,
        manager: &Arc<dyn ProcessManager>,
        director: DirectorHandle,
        task: Task,
        message: Message,
    ) -> Self {
        Self {
            id: CallbackId::next(),
            actor: Arc::downgrade(actor),
            manager: Arc::downgrade(manager),
            director,
            request: manager.request_id(),
            task,
            message,
            consumed: Mutex::new(false),
            released: AtomicBool::new(false),
        }
    }

    fn started(&self, actor: &TaskActorShared<P>) {
        let consumed = self.consumed.lock();
        if !*consumed {
            actor.processor.on_task_started(&self.task);
        }
    }

    fn finished(&self, actor: &TaskActorShared<P>) {
        {
            let mut consumed = self.consumed.lock();
            if *consumed {
                return;
            }
            *consumed = true;
            if let Err(e) = actor.emit_finished(&self.director, &self.task, &self.message) {
                tracing::error!(
                    actor = %actor.id,
                    task = %self.task.id,
                    request = %self.request,
                    error = %e,
                    "Failed to send result message"
                );
                self.route(actor, ErrorCode::TaskError, &e.to_string());
            }
        }
        self.release(actor);
    }

    fn failed(&self, actor: &TaskActorShared<P>, code: ErrorCode, cause: Option<&str>) {
        {
            let mut consumed = self.consumed.lock();
            if *consumed {
                return;
            }
            *consumed = true;
            let text = match cause {
                Some(cause) => {
                    actor.processor.on_task_error(&self.task, cause);
                    format!(
                        "Error executing task {} with task ID {} for request {}: {cause}",
                        self.task.task_type, self.task.id, self.request
                    )
                }
                None => format!(
                    "Timeout invoking task {} with task ID {} for request {}",
                    self.task.task_type, self.task.id, self.request
                ),
            };
            self.route(actor, code, &text);
        }
        self.release(actor);
    }

    fn route(&self, actor: &TaskActorShared<P>, code: ErrorCode, text: &str) {
        if let Err(e) =
            actor
                .config
                .error_strategy
                .route(&self.director, &actor.id, &self.message, code, text)
        {
            tracing::error!(actor = %actor.id, task = %self.task.id, error = %e, "Failed to route task failure");
        }
    }

    /// Stop listening. Only the first call has an effect.
    fn release(&self, actor: &TaskActorShared<P>) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self
            .director
            .notify_actor_finished_task(&actor.id, self.task.id)
        {
            tracing::error!(actor = %actor.id, task = %self.task.id, error = %e, "Busy task bookkeeping out of sync");
        }
        if let Some(manager) = self.manager.upgrade() {
            manager.unsubscribe(self.id);
        }
        actor.pending.remove(self.id);
    }
}

impl<P: TaskProcessor> ContextCallback for TaskCallback<P> {
    fn id(&self) -> CallbackId {
        self.id
    }

    fn on_event(&self, event: &ContextEvent) {
        if event.task != Some(self.task.id) {
            return;
        }
        let Some(actor) = self.actor.upgrade() else {
            return;
        };
        match &event.kind {
            ContextEventKind::Started => self.started(&actor),
            ContextEventKind::Finished | ContextEventKind::PendingCompletion => self.finished(&actor),
            ContextEventKind::Error { message } => {
                self.failed(&actor, ErrorCode::TaskError, Some(message))
            }
            ContextEventKind::TimedOut => self.failed(&actor, ErrorCode::TaskTimeout, None),
            ContextEventKind::Cancelled | ContextEventKind::Interrupted => self.release(&actor),
            ContextEventKind::Restarted | ContextEventKind::Reported { .. } => {}
        }
    }
}
