//! Actor that turns each received message into an asynchronous task.

use super::callback::TaskCallback;
use super::config::TaskActorConfig;
use super::pending::PendingListeners;
use super::processor::TaskProcessor;
use crate::actor::{Actor, FireContext, OUTPUT};
use crate::director::DirectorHandle;
use crate::observability::EXECUTION_TRACE_TARGET;
use gangway_core::error::{ErrorCode, GangwayError, Result};
use gangway_core::message::{Message, headers};
use gangway_core::process::{
    Attributes, ContextCallback, ProcessManager, ProcessManagerService, Status, Task, attributes,
    persist_scoped,
};
use gangway_core::types::{ActorId, ContextId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// State shared between the actor and the callbacks of its tasks.
pub(crate) struct TaskActorShared<P> {
    pub(crate) id: ActorId,
    pub(crate) config: TaskActorConfig,
    pub(crate) processor: P,
    pub(crate) pending: PendingListeners,
    service: Arc<ProcessManagerService>,
    initiator: String,
    finish_requested: AtomicBool,
}

impl<P: TaskProcessor> TaskActorShared<P> {
    /// Send the result of a finished task on the output port.
    pub(crate) fn emit_finished(
        &self,
        director: &DirectorHandle,
        task: &Task,
        message: &Message,
    ) -> Result<usize> {
        let output = self.processor.finished_output(task, message);
        director.send(&self.id.port(OUTPUT), output)
    }
}

/// Actor that creates a task per received message and forwards the message
/// once the task finishes.
///
/// `fire` only starts the work. The outcome arrives later through a
/// callback subscribed to the task, which:
///
/// - on finished or pending completion, sends the processor's output on `output`
/// - on error or timeout, routes the failure through the [`ErrorControlStrategy`](super::ErrorControlStrategy)
/// - on cancel or interrupt, only stops listening
///
/// Each task keeps the director alive, as a busy task, until one of those
/// outcomes arrives.
pub struct TaskBasedActor<P: TaskProcessor> {
    shared: Arc<TaskActorShared<P>>,
}

impl<P: TaskProcessor> TaskBasedActor<P> {
    /// Create an actor.
    pub fn new(
        id: ActorId,
        config: TaskActorConfig,
        processor: P,
        service: Arc<ProcessManagerService>,
    ) -> Self {
        let initiator = format!("actor:/{}", id.full_name());
        Self {
            shared: Arc::new(TaskActorShared {
                id,
                config,
                processor,
                pending: PendingListeners::new(),
                service,
                initiator,
                finish_requested: AtomicBool::new(false),
            }),
        }
    }

    /// The actor-specific processing.
    pub fn processor(&self) -> &P {
        &self.shared.processor
    }

    /// Configuration.
    pub fn config(&self) -> &TaskActorConfig {
        &self.shared.config
    }

    /// Listeners waiting for their task to end.
    pub fn pending(&self) -> &PendingListeners {
        &self.shared.pending
    }

    /// Task type recorded on created tasks.
    pub fn task_type(&self) -> &str {
        self.shared
            .config
            .task_type
            .as_deref()
            .unwrap_or_else(|| self.shared.id.name())
    }

    /// Initiator recorded on created tasks, `actor:/<full name>`.
    pub fn initiator(&self) -> &str {
        &self.shared.initiator
    }

    /// Ask the actor to stop after its next iteration, once its tasks ended.
    pub fn request_finish(&self) {
        self.shared.finish_requested.store(true, Ordering::Release);
    }

    fn must_process(&self, message: &Message) -> bool {
        let tags = &self.shared.config.condition_tags;
        tags.is_empty() || tags.iter().any(|tag| message.has_header(tag))
    }

    /// Resume a restarted request.
    ///
    /// Scans the request's tasks from the most recent one. A finished task of
    /// this actor is replayed and no new work starts. A restarted task of
    /// this actor is cancelled and new work starts for it.
    fn resume_restarted(
        &self,
        manager: &Arc<dyn ProcessManager>,
        message: &Message,
        director: &DirectorHandle,
    ) -> Result<bool> {
        if !manager.is_restarting()? {
            return Ok(false);
        }
        let store = manager.store();
        let root = store.context(manager.request().root)?;

        for task in store.tasks_of(root.id)?.iter().rev() {
            let status = store.task_status(task.id)?;
            if status == Status::Cancelled || task.initiator != self.shared.initiator {
                continue;
            }
            if status.is_finished() {
                tracing::info!(actor = %self.shared.id, task = %task.id, "Replaying finished task");
                self.shared.processor.before_restart(task, &root);
                self.shared.emit_finished(director, task, message)?;
                return Ok(true);
            }
            if status == Status::Restarted {
                tracing::info!(actor = %self.shared.id, task = %task.id, "Resuming at restarted task");
                manager.notify_started(None)?;
                manager.notify_cancelled(Some(task.id))?;
                self.shared.processor.on_restart(task, &root);
                break;
            }
        }
        Ok(false)
    }

    /// Report a task that could not be created, at request level.
    fn creation_failed(
        &self,
        manager: &Arc<dyn ProcessManager>,
        message: &Message,
        director: &DirectorHandle,
        error: &GangwayError,
    ) {
        let shared = &self.shared;
        let text = format!("{}: {error}", ErrorCode::ActorExecutionFatal);
        if let Err(e) = manager.notify_error(None, text.clone()) {
            tracing::error!(actor = %shared.id, error = %e, "Failed to record task creation failure");
        }
        if let Err(e) = shared.config.error_strategy.route(
            director,
            &shared.id,
            message,
            ErrorCode::ActorExecutionFatal,
            &text,
        ) {
            tracing::error!(actor = %shared.id, error = %e, "Failed to route task creation failure");
        }
    }

    fn prepare(
        &self,
        manager: &dyn ProcessManager,
        context: ContextId,
        message: &Message,
        task_attributes: &mut Attributes,
        entries: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        let shared = &self.shared;
        let request = manager.request();
        task_attributes.insert(attributes::CREATOR.into(), shared.id.full_name().into());
        task_attributes.insert(attributes::REFERENCE_ID.into(), request.reference_id.clone());
        task_attributes.insert(attributes::REQUEST_ID.into(), request.id.as_u64().to_string());

        let context = manager.store().context(context)?;
        shared
            .processor
            .add_task_attributes(message, &context, task_attributes)?;
        if let Some(result_type) = &shared.config.result_type {
            task_attributes.insert(attributes::RESULT_TYPE.into(), result_type.clone());
        }
        if let Some(tag) = &shared.config.result_tag {
            entries.insert(attributes::RESULT_TAG.into(), tag.clone());
        }
        shared.processor.add_context_entries(&context, entries)
    }
}

impl<P: TaskProcessor> Actor for TaskBasedActor<P> {
    fn id(&self) -> &ActorId {
        &self.shared.id
    }

    fn initialize(&self, _director: &DirectorHandle) -> Result<()> {
        self.shared.pending.clear();
        self.shared.finish_requested.store(false, Ordering::Release);
        Ok(())
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        let shared = &self.shared;
        let Some(message) = ctx.token() else {
            tracing::warn!(actor = %shared.id, "Fired without a message");
            return Ok(());
        };

        let manager: Arc<dyn ProcessManager> = shared.service.manager_for(message)?;
        let scope_group = message.header(headers::CONTEXT_SCOPE_GROUP);
        let scope = message.header(headers::CONTEXT_SCOPE);
        let context = manager.scoped_context(scope_group, scope)?;

        if self.resume_restarted(&manager, message, ctx.director)? {
            return Ok(());
        }
        if !self.must_process(message) {
            tracing::debug!(actor = %shared.id, message = %message.id(), "No condition tag present, forwarding");
            ctx.send(OUTPUT, message.clone())?;
            return Ok(());
        }

        let mut task_attributes = Attributes::new();
        if let Some(group) = scope_group {
            task_attributes.insert(attributes::SCOPE_GROUP.into(), group.into());
        }
        if let Some(scope) = scope {
            task_attributes.insert(attributes::SCOPE.into(), scope.into());
        }
        let mut entries = BTreeMap::new();
        let prepared = self.prepare(
            manager.as_ref(),
            context,
            message,
            &mut task_attributes,
            &mut entries,
        );

        // The task is created even when preparing failed, so the failure is attached to it.
        let task = match manager.create_task(
            context,
            &shared.initiator,
            self.task_type(),
            task_attributes,
        ) {
            Ok(task) => task,
            Err(e) => {
                let error = GangwayError::TaskCreation {
                    actor: shared.id.clone(),
                    cause: e.to_string(),
                };
                self.creation_failed(&manager, message, ctx.director, &error);
                return Ok(());
            }
        };

        ctx.director.notify_actor_started_task(&shared.id, task.id)?;
        let callback = Arc::new(TaskCallback::new(
            shared,
            &manager,
            ctx.director.clone(),
            task.clone(),
            message.clone(),
        ));
        shared.pending.add(callback.id());
        manager.subscribe(task.id, callback);

        let stored = entries
            .into_iter()
            .try_for_each(|(name, value)| manager.store().put_entry(task.context, name, value));
        let prepared = prepared
            .and(stored)
            .and_then(|()| persist_scoped(manager.persister(), &task));

        let outcome = match prepared {
            Err(e) => Err(format!("{}: {e}", ErrorCode::ActorExecutionFatal)),
            Ok(()) => shared
                .processor
                .process(&task, &manager)
                .map_err(|e| e.to_string()),
        };
        if let Err(cause) = outcome {
            tracing::error!(
                target: EXECUTION_TRACE_TARGET,
                actor = %shared.id,
                task = %task.id,
                "{cause}"
            );
            manager.notify_error(Some(task.id), cause)?;
        }
        Ok(())
    }

    fn postfire(&self, ctx: &FireContext<'_>) -> Result<bool> {
        let finishing = self.shared.finish_requested.load(Ordering::Acquire)
            || ctx.director.is_stop_requested();
        if finishing {
            let drained = self
                .shared
                .pending
                .wait_until_drained(self.shared.config.quiesce_poll());
            tracing::debug!(actor = %self.shared.id, drained, "Actor finishing");
        }
        Ok(!finishing)
    }

    fn wrapup(&self) -> Result<()> {
        if !self.shared.pending.is_empty() {
            tracing::warn!(
                actor = %self.shared.id,
                pending = self.shared.pending.len(),
                "Wrapping up with unfinished tasks"
            );
        }
        self.shared.pending.interrupt();
        Ok(())
    }
}
