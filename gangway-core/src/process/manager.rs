//! Per-request process management.
//!
//! A [`ProcessManager`] owns the lifecycle of one request: it creates tasks,
//! records status transitions in the [`ContextStore`] and fans lifecycle
//! events out to subscribed [`ContextCallback`]s.

use super::callback::{ContextCallback, ContextEvent, ContextEventKind};
use super::persister::ProcessPersister;
use super::status::Status;
use super::store::{Attributes, ContextStore, Request, Task};
use crate::error::{GangwayError, Result};
use crate::types::{CallbackId, ContextId, RequestId, TaskId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Process management for a single request.
pub trait ProcessManager: Send + Sync {
    /// The managed request.
    fn request(&self) -> &Request;

    /// The arena holding the request's contexts and tasks.
    fn store(&self) -> &ContextStore;

    /// The persistence collaborator.
    fn persister(&self) -> &dyn ProcessPersister;

    /// Resolve the context a message is scoped to.
    ///
    /// Without a scope this is the request's root context.
    fn scoped_context(&self, scope_group: Option<&str>, scope: Option<&str>) -> Result<ContextId>;

    /// Create a task in the given context.
    fn create_task(
        &self,
        parent: ContextId,
        initiator: &str,
        task_type: &str,
        attributes: Attributes,
    ) -> Result<Task>;

    /// Record a lifecycle event, at request level when `task` is `None`.
    fn notify(&self, task: Option<TaskId>, kind: ContextEventKind) -> Result<()>;

    /// Subscribe a callback to events of one task.
    fn subscribe(&self, task: TaskId, callback: Arc<dyn ContextCallback>);

    /// Subscribe a callback to all events of the request.
    fn subscribe_all(&self, callback: Arc<dyn ContextCallback>);

    /// Remove a callback from every subscription.
    fn unsubscribe(&self, callback: CallbackId);

    /// Restart the request at the given task.
    fn restart(&self, task: TaskId) -> Result<()>;

    /// Pause the request. Returns whether the status changed.
    fn pause(&self) -> Result<bool>;

    /// Resume a paused request. Returns whether the status changed.
    fn resume(&self) -> Result<bool>;

    /// Stop the request, interrupting all unfinished tasks.
    fn stop(&self) -> Result<()>;

    /// Id of the managed request.
    fn request_id(&self) -> RequestId {
        self.request().id
    }

    /// Whether the request is being restarted.
    fn is_restarting(&self) -> Result<bool> {
        let root = self.store().context(self.request().root)?;
        Ok(root.status == Status::Restarted)
    }

    /// Notify that work started.
    fn notify_started(&self, task: Option<TaskId>) -> Result<()> {
        self.notify(task, ContextEventKind::Started)
    }

    /// Notify that work finished.
    fn notify_finished(&self, task: Option<TaskId>) -> Result<()> {
        self.notify(task, ContextEventKind::Finished)
    }

    /// Notify that work waits for external completion.
    fn notify_pending_completion(&self, task: Option<TaskId>) -> Result<()> {
        self.notify(task, ContextEventKind::PendingCompletion)
    }

    /// Notify that work failed.
    fn notify_error(&self, task: Option<TaskId>, message: String) -> Result<()> {
        self.notify(task, ContextEventKind::Error { message })
    }

    /// Notify that work timed out.
    fn notify_timed_out(&self, task: Option<TaskId>) -> Result<()> {
        self.notify(task, ContextEventKind::TimedOut)
    }

    /// Notify that work was cancelled.
    fn notify_cancelled(&self, task: Option<TaskId>) -> Result<()> {
        self.notify(task, ContextEventKind::Cancelled)
    }

    /// Notify that a task is being restarted.
    fn notify_restarted(&self, task: TaskId) -> Result<()> {
        self.notify(Some(task), ContextEventKind::Restarted)
    }

    /// Record a free-form report.
    fn notify_event(&self, task: Option<TaskId>, topic: &str, message: &str) -> Result<()> {
        self.notify(
            task,
            ContextEventKind::Reported {
                topic: topic.to_string(),
                message: message.to_string(),
            },
        )
    }
}

#[derive(Default)]
struct Subscriptions {
    all: Vec<Arc<dyn ContextCallback>>,
    by_task: HashMap<TaskId, Vec<Arc<dyn ContextCallback>>>,
}

/// In-memory process manager.
///
/// Callbacks run on the notifying thread after all internal locks have
/// been released, so a callback may unsubscribe itself.
pub struct MemoryProcessManager {
    request: Request,
    store: Arc<ContextStore>,
    persister: Arc<dyn ProcessPersister>,
    subscriptions: RwLock<Subscriptions>,
    events: Mutex<Vec<ContextEvent>>,
}

impl MemoryProcessManager {
    /// Create a manager for a new request in `store`.
    pub fn new(
        store: Arc<ContextStore>,
        persister: Arc<dyn ProcessPersister>,
        reference_id: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        let request = store.create_request(reference_id, attributes);
        tracing::debug!(request = %request.id, reference = %request.reference_id, "Created request");
        Self {
            request,
            store,
            persister,
            subscriptions: RwLock::new(Subscriptions::default()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// All events recorded so far, oldest first.
    pub fn events(&self) -> Vec<ContextEvent> {
        self.events.lock().clone()
    }

    /// Events recorded for one task, oldest first.
    pub fn task_events(&self, task: TaskId) -> Vec<ContextEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task == Some(task))
            .cloned()
            .collect()
    }

    /// Number of callbacks subscribed to a task.
    pub fn subscriber_count(&self, task: TaskId) -> usize {
        self.subscriptions
            .read()
            .by_task
            .get(&task)
            .map_or(0, Vec::len)
    }

    fn listeners(&self, task: Option<TaskId>) -> Vec<Arc<dyn ContextCallback>> {
        let subscriptions = self.subscriptions.read();
        let mut listeners = subscriptions.all.clone();
        if let Some(task) = task {
            if let Some(for_task) = subscriptions.by_task.get(&task) {
                listeners.extend(for_task.iter().cloned());
            }
        }
        listeners
    }

    fn parse_context(&self, raw: &str) -> Result<ContextId> {
        let id = ContextId::parse(raw).ok_or_else(|| GangwayError::ScopeResolution {
            cause: format!("invalid context id '{raw}'"),
        })?;
        let ctx = self.store.context(id)?;
        if ctx.request != self.request.id {
            return Err(GangwayError::ScopeResolution {
                cause: format!("context {id} belongs to {}, not {}", ctx.request, self.request.id),
            });
        }
        Ok(id)
    }
}

impl ProcessManager for MemoryProcessManager {
    fn request(&self) -> &Request {
        &self.request
    }

    fn store(&self) -> &ContextStore {
        &self.store
    }

    fn persister(&self) -> &dyn ProcessPersister {
        self.persister.as_ref()
    }

    fn scoped_context(&self, scope_group: Option<&str>, scope: Option<&str>) -> Result<ContextId> {
        let Some(scope) = scope else {
            return Ok(self.request.root);
        };
        let context = self.parse_context(scope)?;
        if let Some(group) = scope_group {
            let group = self.parse_context(group)?;
            let parent = self.store.context(context)?.parent;
            if parent != Some(group) {
                return Err(GangwayError::ScopeResolution {
                    cause: format!("context {context} is not forked from {group}"),
                });
            }
        }
        Ok(context)
    }

    fn create_task(
        &self,
        parent: ContextId,
        initiator: &str,
        task_type: &str,
        attributes: Attributes,
    ) -> Result<Task> {
        let task = self
            .store
            .create_task(parent, initiator, task_type, attributes)?;
        tracing::debug!(
            request = %self.request.id,
            task = %task.id,
            initiator = %initiator,
            "Created task"
        );
        Ok(task)
    }

    fn notify(&self, task: Option<TaskId>, kind: ContextEventKind) -> Result<()> {
        let context = match task {
            Some(task) => self.store.task(task)?.context,
            None => self.request.root,
        };
        if let Some(status) = kind.status() {
            self.store.set_status(context, status)?;
        }

        let event = ContextEvent::new(self.request.id, context, task, kind);
        self.events.lock().push(event.clone());
        tracing::trace!(request = %self.request.id, context = %context, event = %event.kind, "Context event");

        for listener in self.listeners(task) {
            listener.on_event(&event);
        }
        Ok(())
    }

    fn subscribe(&self, task: TaskId, callback: Arc<dyn ContextCallback>) {
        self.subscriptions
            .write()
            .by_task
            .entry(task)
            .or_default()
            .push(callback);
    }

    fn subscribe_all(&self, callback: Arc<dyn ContextCallback>) {
        self.subscriptions.write().all.push(callback);
    }

    fn unsubscribe(&self, callback: CallbackId) {
        let mut subscriptions = self.subscriptions.write();
        subscriptions.all.retain(|cb| cb.id() != callback);
        subscriptions.by_task.retain(|_, callbacks| {
            callbacks.retain(|cb| cb.id() != callback);
            !callbacks.is_empty()
        });
    }

    fn restart(&self, task: TaskId) -> Result<()> {
        self.store.set_status(self.request.root, Status::Restarted)?;
        self.notify_restarted(task)?;
        tracing::info!(request = %self.request.id, task = %task, "Restarting request");
        Ok(())
    }

    fn pause(&self) -> Result<bool> {
        let root = self.store.context(self.request.root)?;
        if root.status.is_terminal() || root.status == Status::Paused {
            return Ok(false);
        }
        self.store.set_status(self.request.root, Status::Paused)?;
        Ok(true)
    }

    fn resume(&self) -> Result<bool> {
        let root = self.store.context(self.request.root)?;
        if root.status != Status::Paused {
            return Ok(false);
        }
        self.store.set_status(self.request.root, Status::Started)?;
        Ok(true)
    }

    fn stop(&self) -> Result<()> {
        for task in self.store.tasks_of_request(self.request.id) {
            if !self.store.task_status(task)?.is_terminal() {
                self.notify(Some(task), ContextEventKind::Interrupted)?;
            }
        }
        let root = self.store.context(self.request.root)?;
        if !root.status.is_terminal() {
            self.notify(None, ContextEventKind::Interrupted)?;
        }
        tracing::info!(request = %self.request.id, "Stopped request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::persister::MemoryPersister;

    struct Recorder {
        id: CallbackId,
        seen: Mutex<Vec<ContextEventKind>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: CallbackId::next(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl ContextCallback for Recorder {
        fn id(&self) -> CallbackId {
            self.id
        }

        fn on_event(&self, event: &ContextEvent) {
            self.seen.lock().push(event.kind.clone());
        }
    }

    fn manager() -> MemoryProcessManager {
        MemoryProcessManager::new(
            Arc::new(ContextStore::new()),
            Arc::new(MemoryPersister::new()),
            "ref-1",
            Attributes::new(),
        )
    }

    #[test]
    fn task_notifications_update_status_and_reach_subscribers() {
        let pm = manager();
        let task = pm
            .create_task(pm.request().root, "actor:/a", "t", Attributes::new())
            .unwrap();
        let recorder = Recorder::new();
        pm.subscribe(task.id, recorder.clone());

        pm.notify_started(Some(task.id)).unwrap();
        pm.notify_finished(Some(task.id)).unwrap();

        assert_eq!(pm.store().task_status(task.id).unwrap(), Status::Finished);
        assert_eq!(
            *recorder.seen.lock(),
            vec![ContextEventKind::Started, ContextEventKind::Finished]
        );
        assert_eq!(pm.task_events(task.id).len(), 2);
    }

    #[test]
    fn task_subscribers_ignore_other_tasks() {
        let pm = manager();
        let a = pm
            .create_task(pm.request().root, "actor:/a", "t", Attributes::new())
            .unwrap();
        let b = pm
            .create_task(pm.request().root, "actor:/b", "t", Attributes::new())
            .unwrap();
        let recorder = Recorder::new();
        pm.subscribe(a.id, recorder.clone());

        pm.notify_finished(Some(b.id)).unwrap();
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn unsubscribe_removes_everywhere() {
        let pm = manager();
        let task = pm
            .create_task(pm.request().root, "actor:/a", "t", Attributes::new())
            .unwrap();
        let recorder = Recorder::new();
        pm.subscribe(task.id, recorder.clone());
        pm.subscribe_all(recorder.clone());
        pm.unsubscribe(recorder.id());

        pm.notify_finished(Some(task.id)).unwrap();
        assert!(recorder.seen.lock().is_empty());
        assert_eq!(pm.subscriber_count(task.id), 0);
    }

    #[test]
    fn stop_interrupts_unfinished_tasks() {
        let pm = manager();
        let done = pm
            .create_task(pm.request().root, "actor:/a", "t", Attributes::new())
            .unwrap();
        let running = pm
            .create_task(pm.request().root, "actor:/b", "t", Attributes::new())
            .unwrap();
        pm.notify_finished(Some(done.id)).unwrap();
        pm.notify_started(Some(running.id)).unwrap();

        pm.stop().unwrap();

        assert_eq!(pm.store().task_status(done.id).unwrap(), Status::Finished);
        assert_eq!(pm.store().task_status(running.id).unwrap(), Status::Interrupted);
    }

    #[test]
    fn restart_marks_request_and_task() {
        let pm = manager();
        let task = pm
            .create_task(pm.request().root, "actor:/a", "t", Attributes::new())
            .unwrap();
        pm.restart(task.id).unwrap();

        assert!(pm.is_restarting().unwrap());
        assert_eq!(pm.store().task_status(task.id).unwrap(), Status::Restarted);
    }

    #[test]
    fn pause_and_resume() {
        let pm = manager();
        pm.notify_started(None).unwrap();
        assert!(pm.pause().unwrap());
        assert!(!pm.pause().unwrap());
        assert!(pm.resume().unwrap());
        assert!(!pm.resume().unwrap());
    }

    #[test]
    fn scoped_context_resolution() {
        let pm = manager();
        let root = pm.request().root;
        assert_eq!(pm.scoped_context(None, None).unwrap(), root);

        let child = pm.store().fork(root).unwrap();
        let scope = child.as_u64().to_string();
        let group = root.as_u64().to_string();
        assert_eq!(pm.scoped_context(Some(&group), Some(&scope)).unwrap(), child);

        let err = pm.scoped_context(None, Some("not-a-number")).unwrap_err();
        assert_eq!(err.code(), "E404");
        let err = pm.scoped_context(Some(&scope), Some(&scope)).unwrap_err();
        assert_eq!(err.code(), "E404");
    }
}
