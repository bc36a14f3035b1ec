//! Joiner actor (sequence barrier).

use gangway_core::error::{GangwayError, Result};
use gangway_core::message::{Message, MessageBody, headers};
use gangway_core::process::ProcessManagerService;
use gangway_core::types::{ActorId, ContextId};
use gangway_executor::actor::{Actor, FireContext, OUTPUT};
use gangway_executor::director::DirectorHandle;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct PendingSequence {
    parts: BTreeMap<u64, Message>,
    last: Option<u64>,
}

impl PendingSequence {
    fn is_complete(&self) -> bool {
        self.last
            .is_some_and(|last| self.parts.keys().copied().eq(0..=last))
    }
}

/// Joiner actor - merges a forked sequence back into its parent.
///
/// Sequenced messages are buffered per sequence id. Once every position up
/// to the one flagged end of sequence has arrived, the child contexts are
/// joined into the parent and a single message for the parent is sent.
/// Messages outside any sequence pass through unchanged.
///
/// # Ports
/// - Input: "input" - Sequenced messages carrying forked contexts
/// - Output: "output" - One message per completed sequence
pub struct Joiner {
    id: ActorId,
    service: Arc<ProcessManagerService>,
    pending: Mutex<HashMap<u64, PendingSequence>>,
}

impl Joiner {
    /// Create a joiner merging contexts in `service`'s store.
    pub fn new(id: impl Into<ActorId>, service: Arc<ProcessManagerService>) -> Self {
        Self {
            id: id.into(),
            service,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sequences still waiting for parts.
    pub fn pending_sequences(&self) -> usize {
        self.pending.lock().len()
    }

    /// Buffer a part; returns the parts in position order once complete.
    fn collect(&self, message: &Message, sequence_id: u64, position: u64, end: bool) -> Option<Vec<Message>> {
        let mut pending = self.pending.lock();
        let sequence = pending.entry(sequence_id).or_default();
        if sequence.parts.insert(position, message.clone()).is_some() {
            tracing::warn!(actor = %self.id, sequence_id, position, "Duplicate sequence position replaced");
        }
        if end {
            sequence.last = Some(position);
        }
        if !sequence.is_complete() {
            return None;
        }
        pending
            .remove(&sequence_id)
            .map(|done| done.parts.into_values().collect())
    }

    fn join(&self, sequence_id: u64, parts: &[Message]) -> Result<Message> {
        let store = self.service.store();
        let parent = ContextId::new(sequence_id);
        let children = parts
            .iter()
            .map(|part| {
                part.context().ok_or_else(|| GangwayError::InvalidMessage {
                    actor: self.id.clone(),
                    cause: format!("sequence part {} carries no context", part.id()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        store.join(parent, &children)?;

        let mut joined = parts[0].caused_copy_unsequenced();
        joined.remove_header(headers::SEQUENCE_SOURCE);
        joined.set_body(MessageBody::Context(parent));
        match store.context(parent)?.parent {
            Some(group) => {
                joined.set_header(headers::CONTEXT_SCOPE_GROUP, group.as_u64().to_string());
                joined.set_header(headers::CONTEXT_SCOPE, parent.as_u64().to_string());
            }
            None => {
                joined.remove_header(headers::CONTEXT_SCOPE_GROUP);
                joined.remove_header(headers::CONTEXT_SCOPE);
            }
        }
        Ok(joined)
    }
}

impl Actor for Joiner {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn initialize(&self, _director: &DirectorHandle) -> Result<()> {
        self.pending.lock().clear();
        Ok(())
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        let Some(message) = ctx.token() else {
            return Ok(());
        };
        let Some(sequence) = message.sequence() else {
            ctx.send(OUTPUT, message.clone())?;
            return Ok(());
        };

        let Some(parts) = self.collect(
            message,
            sequence.sequence_id,
            sequence.position,
            sequence.end_of_sequence,
        ) else {
            return Ok(());
        };

        let joined = self.join(sequence.sequence_id, &parts)?;
        tracing::debug!(
            actor = %self.id,
            sequence_id = sequence.sequence_id,
            parts = parts.len(),
            "Joined sequence"
        );
        ctx.send(OUTPUT, joined)?;
        Ok(())
    }

    fn wrapup(&self) -> Result<()> {
        let mut pending = self.pending.lock();
        if !pending.is_empty() {
            tracing::warn!(
                actor = %self.id,
                sequences = pending.len(),
                "Wrapping up with incomplete sequences"
            );
        }
        pending.clear();
        Ok(())
    }
}
