//! Persistence collaborator for task records.

use super::store::Task;
use crate::error::Result;
use crate::types::TaskId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Persists task records.
///
/// Persisting happens inside a session: `open` starts one (or joins an
/// already open one), `close` ends it.
pub trait ProcessPersister: Send + Sync {
    /// Open a session.
    ///
    /// Returns whether this call opened a new session that the caller must
    /// close. `false` means a session was already open.
    fn open(&self, transactional: bool) -> Result<bool>;

    /// Persist a task and its attributes.
    fn persist_task(&self, task: &Task) -> Result<()>;

    /// Close the current session.
    fn close(&self) -> Result<()>;
}

/// Persist a task within a scoped session.
///
/// The session is closed if this call opened it, also when persisting fails.
pub fn persist_scoped(persister: &dyn ProcessPersister, task: &Task) -> Result<()> {
    let should_close = persister.open(true)?;
    let result = persister.persist_task(task);
    if should_close {
        let closed = persister.close();
        result?;
        return closed;
    }
    result
}

/// In-memory persister that records persisted tasks and session counts.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    open: Mutex<bool>,
    persisted: Mutex<Vec<TaskId>>,
    sessions: AtomicUsize,
}

impl MemoryPersister {
    /// Create an empty persister.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of persisted tasks, in persist order.
    pub fn persisted(&self) -> Vec<TaskId> {
        self.persisted.lock().clone()
    }

    /// Number of sessions opened so far.
    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }
}

impl ProcessPersister for MemoryPersister {
    fn open(&self, _transactional: bool) -> Result<bool> {
        let mut open = self.open.lock();
        if *open {
            return Ok(false);
        }
        *open = true;
        self.sessions.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn persist_task(&self, task: &Task) -> Result<()> {
        self.persisted.lock().push(task.id);
        tracing::trace!(task = %task.id, "Persisted task");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        *self.open.lock() = false;
        Ok(())
    }
}
