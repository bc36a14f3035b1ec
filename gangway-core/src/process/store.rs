//! Arena of requests, contexts and tasks.
//!
//! Records refer to each other by id only. The store hands out snapshots
//! (clones) of records; all mutation goes through store operations so that
//! multi-record updates such as a fork happen under one lock.

use super::status::Status;
use crate::error::{GangwayError, Result};
use crate::types::{ContextId, RequestId, TaskId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// String attributes attached to requests and tasks.
pub type Attributes = BTreeMap<String, String>;

/// Root of a context tree: one end-to-end unit of processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request id.
    pub id: RequestId,
    /// External correlation id supplied by the initiator.
    pub reference_id: String,
    /// Root context of the request.
    pub root: ContextId,
    /// Request-level attributes.
    pub attributes: Attributes,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Link from a forked context back to the parent it was split from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkLink {
    /// The forked parent.
    pub parent: ContextId,
    /// Sequence the fork belongs to.
    pub sequence_id: u64,
    /// Position within the sequence.
    pub position: u64,
    /// Whether this is the last child of the fork.
    pub end_of_sequence: bool,
}

/// Scoped execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Context id.
    pub id: ContextId,
    /// Owning request.
    pub request: RequestId,
    /// Parent context (fork parent, or the context a task was created in).
    pub parent: Option<ContextId>,
    /// Set when the context was created by a fork.
    pub fork: Option<ForkLink>,
    /// Processing status.
    pub status: Status,
    /// Named values.
    pub entries: BTreeMap<String, String>,
    /// Tasks executed in this context, oldest first.
    pub tasks: Vec<TaskId>,
    /// Forked children, in fork order.
    pub children: Vec<ContextId>,
    /// The task this context tracks, for task contexts.
    pub task: Option<TaskId>,
}

/// Execution record for one actor's unit of asynchronous work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id.
    pub id: TaskId,
    /// Context the task was created in.
    pub parent_context: ContextId,
    /// The task's own context, carrying its status.
    pub context: ContextId,
    /// Identity of the creating actor (`actor:/<full name>`).
    pub initiator: String,
    /// Task type.
    pub task_type: String,
    /// Task attributes.
    pub attributes: Attributes,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Arena {
    requests: HashMap<RequestId, Request>,
    contexts: HashMap<ContextId, Context>,
    tasks: HashMap<TaskId, Task>,
    next_id: u64,
}

impl Arena {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn context_mut(&mut self, id: ContextId) -> Result<&mut Context> {
        self.contexts
            .get_mut(&id)
            .ok_or(GangwayError::ContextNotFound { context: id })
    }

    fn new_context(&mut self, request: RequestId, parent: Option<ContextId>) -> ContextId {
        let id = ContextId::new(self.allocate());
        self.contexts.insert(
            id,
            Context {
                id,
                request,
                parent,
                fork: None,
                status: Status::Created,
                entries: BTreeMap::new(),
                tasks: Vec::new(),
                children: Vec::new(),
                task: None,
            },
        );
        id
    }
}

/// Thread-safe arena of process records.
#[derive(Default)]
pub struct ContextStore {
    inner: RwLock<Arena>,
}

impl ContextStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request and its root context.
    pub fn create_request(&self, reference_id: impl Into<String>, attributes: Attributes) -> Request {
        let mut arena = self.inner.write();
        let id = RequestId::new(arena.allocate());
        let root = arena.new_context(id, None);
        let request = Request {
            id,
            reference_id: reference_id.into(),
            root,
            attributes,
            created_at: Utc::now(),
        };
        arena.requests.insert(id, request.clone());
        request
    }

    /// Snapshot of a request.
    pub fn request(&self, id: RequestId) -> Result<Request> {
        self.inner
            .read()
            .requests
            .get(&id)
            .cloned()
            .ok_or(GangwayError::RequestNotFound { request: id })
    }

    /// Snapshot of a context.
    pub fn context(&self, id: ContextId) -> Result<Context> {
        self.inner
            .read()
            .contexts
            .get(&id)
            .cloned()
            .ok_or(GangwayError::ContextNotFound { context: id })
    }

    /// Snapshot of a task.
    pub fn task(&self, id: TaskId) -> Result<Task> {
        self.inner
            .read()
            .tasks
            .get(&id)
            .cloned()
            .ok_or(GangwayError::TaskNotFound { task: id })
    }

    /// Status of a task, i.e. the status of its own context.
    pub fn task_status(&self, id: TaskId) -> Result<Status> {
        let arena = self.inner.read();
        let task = arena
            .tasks
            .get(&id)
            .ok_or(GangwayError::TaskNotFound { task: id })?;
        arena
            .contexts
            .get(&task.context)
            .map(|ctx| ctx.status)
            .ok_or(GangwayError::ContextNotFound {
                context: task.context,
            })
    }

    /// Tasks executed in a context, oldest first.
    pub fn tasks_of(&self, context: ContextId) -> Result<Vec<Task>> {
        let arena = self.inner.read();
        let ctx = arena
            .contexts
            .get(&context)
            .ok_or(GangwayError::ContextNotFound { context })?;
        Ok(ctx
            .tasks
            .iter()
            .filter_map(|id| arena.tasks.get(id).cloned())
            .collect())
    }

    /// Create a task in `parent_context`.
    ///
    /// The task gets its own context and is appended to the parent's task list.
    pub fn create_task(
        &self,
        parent_context: ContextId,
        initiator: impl Into<String>,
        task_type: impl Into<String>,
        attributes: Attributes,
    ) -> Result<Task> {
        let mut arena = self.inner.write();
        let request = arena
            .contexts
            .get(&parent_context)
            .map(|ctx| ctx.request)
            .ok_or(GangwayError::ContextNotFound {
                context: parent_context,
            })?;

        let id = TaskId::new(arena.allocate());
        let context = arena.new_context(request, Some(parent_context));
        arena.context_mut(context)?.task = Some(id);
        arena.context_mut(parent_context)?.tasks.push(id);

        let task = Task {
            id,
            parent_context,
            context,
            initiator: initiator.into(),
            task_type: task_type.into(),
            attributes,
            created_at: Utc::now(),
        };
        arena.tasks.insert(id, task.clone());
        Ok(task)
    }

    /// Fork a single child context, outside any sequence.
    ///
    /// The child copies the parent's task history.
    pub fn fork(&self, parent: ContextId) -> Result<ContextId> {
        let mut arena = self.inner.write();
        let (request, tasks) = {
            let ctx = arena
                .contexts
                .get(&parent)
                .ok_or(GangwayError::ContextNotFound { context: parent })?;
            (ctx.request, ctx.tasks.clone())
        };
        let child = arena.new_context(request, Some(parent));
        arena.context_mut(child)?.tasks = tasks;
        arena.context_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// Fork `count` children as one sequence.
    ///
    /// The sequence id is the parent's context id. Children get positions
    /// `0..count` and only the last one is flagged end of sequence. All
    /// children are created under a single lock.
    pub fn fork_sequence(&self, parent: ContextId, count: usize) -> Result<Vec<ContextId>> {
        let mut arena = self.inner.write();
        let (request, tasks) = {
            let ctx = arena
                .contexts
                .get(&parent)
                .ok_or(GangwayError::ContextNotFound { context: parent })?;
            (ctx.request, ctx.tasks.clone())
        };

        let mut children = Vec::with_capacity(count);
        for position in 0..count {
            let child = arena.new_context(request, Some(parent));
            let ctx = arena.context_mut(child)?;
            ctx.tasks = tasks.clone();
            ctx.fork = Some(ForkLink {
                parent,
                sequence_id: parent.as_u64(),
                position: position as u64,
                end_of_sequence: position + 1 == count,
            });
            children.push(child);
        }
        arena.context_mut(parent)?.children.extend(&children);
        Ok(children)
    }

    /// Merge forked children back into their parent.
    ///
    /// Tasks the children ran after the fork are appended to the parent in
    /// sequence order; the children are marked finished.
    pub fn join(&self, parent: ContextId, children: &[ContextId]) -> Result<()> {
        let mut arena = self.inner.write();
        let inherited = arena
            .contexts
            .get(&parent)
            .map(|ctx| ctx.tasks.len())
            .ok_or(GangwayError::ContextNotFound { context: parent })?;

        let mut ordered = Vec::with_capacity(children.len());
        for child in children {
            let ctx = arena
                .contexts
                .get(child)
                .ok_or(GangwayError::ContextNotFound { context: *child })?;
            let position = ctx.fork.map(|f| f.position).unwrap_or(u64::MAX);
            ordered.push((position, *child));
        }
        ordered.sort_by_key(|(position, _)| *position);

        let mut joined = Vec::new();
        for (_, child) in &ordered {
            let ctx = arena.context_mut(*child)?;
            joined.extend(ctx.tasks.iter().skip(inherited).copied());
            ctx.status = Status::Finished;
        }
        arena.context_mut(parent)?.tasks.extend(joined);
        Ok(())
    }

    /// Set a named value in a context.
    pub fn put_entry(
        &self,
        context: ContextId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut arena = self.inner.write();
        arena
            .context_mut(context)?
            .entries
            .insert(name.into(), value.into());
        Ok(())
    }

    /// Look up a named value.
    ///
    /// Searches the context's entries, then its ancestors', then the
    /// request attributes.
    pub fn lookup_value(&self, context: ContextId, name: &str) -> Result<Option<String>> {
        let arena = self.inner.read();
        let start = arena
            .contexts
            .get(&context)
            .ok_or(GangwayError::ContextNotFound { context })?;
        let request = start.request;

        let mut current = Some(start);
        while let Some(ctx) = current {
            if let Some(value) = ctx.entries.get(name) {
                return Ok(Some(value.clone()));
            }
            current = ctx.parent.and_then(|p| arena.contexts.get(&p));
        }

        Ok(arena
            .requests
            .get(&request)
            .and_then(|r| r.attributes.get(name).cloned()))
    }

    /// Set the status of a context.
    pub fn set_status(&self, context: ContextId, status: Status) -> Result<()> {
        self.inner.write().context_mut(context)?.status = status;
        Ok(())
    }

    /// Set the status of a task's context, returning the previous status.
    pub fn set_task_status(&self, task: TaskId, status: Status) -> Result<Status> {
        let mut arena = self.inner.write();
        let context = arena
            .tasks
            .get(&task)
            .map(|t| t.context)
            .ok_or(GangwayError::TaskNotFound { task })?;
        let ctx = arena.context_mut(context)?;
        Ok(std::mem::replace(&mut ctx.status, status))
    }

    /// Ids of all tasks belonging to a request.
    pub fn tasks_of_request(&self, request: RequestId) -> Vec<TaskId> {
        let arena = self.inner.read();
        let mut ids: Vec<TaskId> = arena
            .tasks
            .values()
            .filter(|t| {
                arena
                    .contexts
                    .get(&t.context)
                    .is_some_and(|ctx| ctx.request == request)
            })
            .map(|t| t.id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of contexts in the arena.
    pub fn context_count(&self) -> usize {
        self.inner.read().contexts.len()
    }
}
