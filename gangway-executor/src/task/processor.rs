//! The work a task-based actor performs.

use gangway_core::error::Result;
use gangway_core::message::Message;
use gangway_core::process::{Attributes, Context, ProcessManager, Task};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Actor-specific part of a [`TaskBasedActor`](super::TaskBasedActor).
///
/// `process` starts the work for a task and returns. Completion is
/// reported later, from any thread, through the process manager:
///
/// ```text
/// manager.notify_finished(Some(task.id))
/// manager.notify_error(Some(task.id), cause)
/// manager.notify_timed_out(Some(task.id))
/// ```
///
/// Every hook other than `process` has a default.
pub trait TaskProcessor: Send + Sync + 'static {
    /// Start the work for `task`.
    ///
    /// An error returned here is reported as an error of the task.
    fn process(&self, task: &Task, manager: &Arc<dyn ProcessManager>) -> Result<()>;

    /// Add attributes to a task about to be created.
    fn add_task_attributes(
        &self,
        _message: &Message,
        _context: &Context,
        _attributes: &mut Attributes,
    ) -> Result<()> {
        Ok(())
    }

    /// Add entries to the context of a task about to be created.
    fn add_context_entries(
        &self,
        _context: &Context,
        _entries: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called when the task reports it started.
    fn on_task_started(&self, _task: &Task) {}

    /// The message sent on the output port when the task finished.
    fn finished_output(&self, _task: &Task, message: &Message) -> Message {
        message.clone()
    }

    /// Called before a task failure is routed.
    fn on_task_error(&self, _task: &Task, _error: &str) {}

    /// Called when a restarted request replays an already finished task.
    fn before_restart(&self, _task: &Task, _context: &Context) {}

    /// Called when a restarted request resumes at this actor's task.
    fn on_restart(&self, _task: &Task, _context: &Context) {}
}
