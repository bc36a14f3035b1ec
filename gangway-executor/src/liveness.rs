//! Actor liveness bookkeeping.
//!
//! Three collections are shared between the director, dispatcher workers
//! and task completion callbacks:
//!
//! - inactive actors: returned `false` from `postfire`, never iterated again
//! - iterating actors: actor -> the one event currently driving it
//! - busy tasks: in-flight work handle -> owning actor
//!
//! Every check-and-mutate is a single map operation holding the shard lock,
//! so concurrent registrations cannot interleave between check and write.

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use gangway_core::error::{GangwayError, Result};
use gangway_core::types::{ActorId, EventId, TaskHandle};

/// Liveness state of the actors of one director.
#[derive(Debug, Default)]
pub struct Liveness {
    inactive: DashSet<ActorId>,
    iterating: DashMap<ActorId, EventId>,
    busy_tasks: DashMap<TaskHandle, ActorId>,
}

impl Liveness {
    /// Create empty liveness state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an actor as never to be iterated again. Returns whether it was newly marked.
    pub fn mark_inactive(&self, actor: &ActorId) -> bool {
        let inserted = self.inactive.insert(actor.clone());
        if inserted {
            tracing::debug!(actor = %actor, "Actor marked inactive");
        }
        inserted
    }

    /// Whether an actor is inactive.
    pub fn is_inactive(&self, actor: &ActorId) -> bool {
        self.inactive.contains(actor)
    }

    /// Register `actor` as iterating for `event`.
    ///
    /// Repeating the registration for the same event is a no-op.
    ///
    /// # Errors
    ///
    /// `ConflictingIteration` when the actor is iterating for another event.
    pub fn register_iterating(&self, actor: &ActorId, event: EventId) -> Result<()> {
        match self.iterating.entry(actor.clone()) {
            Entry::Occupied(current) if *current.get() == event => Ok(()),
            Entry::Occupied(current) => Err(GangwayError::ConflictingIteration {
                actor: actor.clone(),
                current: *current.get(),
                given: event,
            }),
            Entry::Vacant(slot) => {
                slot.insert(event);
                Ok(())
            }
        }
    }

    /// Release the iteration registration of `actor` for `event`.
    ///
    /// # Errors
    ///
    /// `IterationNotRegistered` when the actor is not iterating for that event.
    pub fn release_iterating(&self, actor: &ActorId, event: EventId) -> Result<()> {
        if self
            .iterating
            .remove_if(actor, |_, current| *current == event)
            .is_some()
        {
            return Ok(());
        }
        Err(GangwayError::IterationNotRegistered {
            actor: actor.clone(),
            given: event,
            current: self.iterating_event(actor),
        })
    }

    /// The event an actor is currently iterating for.
    pub fn iterating_event(&self, actor: &ActorId) -> Option<EventId> {
        self.iterating.get(actor).map(|entry| *entry.value())
    }

    /// Register in-flight work owned by `actor`.
    ///
    /// Registering the same handle again for the same actor is a no-op.
    ///
    /// # Errors
    ///
    /// `TaskOwnerMismatch` when the handle is owned by another actor.
    pub fn start_task(&self, actor: &ActorId, task: TaskHandle) -> Result<()> {
        match self.busy_tasks.entry(task) {
            Entry::Occupied(owner) if owner.get() == actor => Ok(()),
            Entry::Occupied(owner) => Err(GangwayError::TaskOwnerMismatch {
                task,
                actor: actor.clone(),
                owner: Some(owner.get().clone()),
            }),
            Entry::Vacant(slot) => {
                slot.insert(actor.clone());
                Ok(())
            }
        }
    }

    /// Release in-flight work owned by `actor`.
    ///
    /// # Errors
    ///
    /// `TaskOwnerMismatch` when the handle is unknown or owned by another actor.
    pub fn finish_task(&self, actor: &ActorId, task: TaskHandle) -> Result<()> {
        if self
            .busy_tasks
            .remove_if(&task, |_, owner| owner == actor)
            .is_some()
        {
            return Ok(());
        }
        Err(GangwayError::TaskOwnerMismatch {
            task,
            actor: actor.clone(),
            owner: self.task_owner(task),
        })
    }

    /// The actor owning a task handle.
    pub fn task_owner(&self, task: TaskHandle) -> Option<ActorId> {
        self.busy_tasks.get(&task).map(|entry| entry.value().clone())
    }

    /// Number of in-flight tasks.
    pub fn busy_task_count(&self) -> usize {
        self.busy_tasks.len()
    }

    /// Whether any work is in flight.
    pub fn has_busy_tasks(&self) -> bool {
        !self.busy_tasks.is_empty()
    }

    /// Number of actors currently iterating.
    pub fn iterating_count(&self) -> usize {
        self.iterating.len()
    }

    /// Reset all state for a new run.
    pub fn clear(&self) {
        self.inactive.clear();
        self.iterating.clear();
        self.busy_tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gangway_core::types::{MessageId, TaskId};

    #[test]
    fn repeated_iteration_for_same_event_is_noop() {
        let liveness = Liveness::new();
        let actor = ActorId::new("flow.a");
        let event = EventId::next();

        liveness.register_iterating(&actor, event).unwrap();
        liveness.register_iterating(&actor, event).unwrap();
        assert_eq!(liveness.iterating_event(&actor), Some(event));

        liveness.release_iterating(&actor, event).unwrap();
        assert_eq!(liveness.iterating_count(), 0);
    }

    #[test]
    fn conflicting_iteration_is_rejected() {
        let liveness = Liveness::new();
        let actor = ActorId::new("flow.a");
        let first = EventId::next();
        let second = EventId::next();

        liveness.register_iterating(&actor, first).unwrap();
        let err = liveness.register_iterating(&actor, second).unwrap_err();
        assert!(matches!(
            err,
            GangwayError::ConflictingIteration { current, given, .. } if current == first && given == second
        ));
        assert_eq!(liveness.iterating_event(&actor), Some(first));
    }

    #[test]
    fn release_requires_matching_event() {
        let liveness = Liveness::new();
        let actor = ActorId::new("flow.a");
        let event = EventId::next();

        let err = liveness.release_iterating(&actor, event).unwrap_err();
        assert!(matches!(err, GangwayError::IterationNotRegistered { current: None, .. }));

        liveness.register_iterating(&actor, event).unwrap();
        let err = liveness.release_iterating(&actor, EventId::next()).unwrap_err();
        assert!(matches!(
            err,
            GangwayError::IterationNotRegistered { current: Some(c), .. } if c == event
        ));
    }

    #[test]
    fn task_ownership() {
        let liveness = Liveness::new();
        let a = ActorId::new("flow.a");
        let b = ActorId::new("flow.b");
        let task = TaskHandle::Task(TaskId::new(1));

        liveness.start_task(&a, task).unwrap();
        liveness.start_task(&a, task).unwrap();
        assert!(liveness.start_task(&b, task).is_err());
        assert!(liveness.finish_task(&b, task).is_err());
        assert!(liveness.has_busy_tasks());

        liveness.finish_task(&a, task).unwrap();
        assert!(!liveness.has_busy_tasks());
        assert!(liveness.finish_task(&a, task).is_err());
    }

    #[test]
    fn clear_resets_everything() {
        let liveness = Liveness::new();
        let actor = ActorId::new("flow.a");
        liveness.mark_inactive(&actor);
        liveness.register_iterating(&actor, EventId::next()).unwrap();
        liveness
            .start_task(&actor, TaskHandle::Message(MessageId::next()))
            .unwrap();

        liveness.clear();
        assert!(!liveness.is_inactive(&actor));
        assert_eq!(liveness.iterating_count(), 0);
        assert_eq!(liveness.busy_task_count(), 0);
    }
}
