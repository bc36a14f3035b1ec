//! Splitter actor (context fan-out).
//!
//! Looks up a delimited value in the context of each received message and
//! forks that context once per value part.

use gangway_core::error::{GangwayError, Result};
use gangway_core::message::{Message, MessageBody, headers};
use gangway_core::process::{ProcessManager, ProcessManagerService};
use gangway_core::types::{ActorId, ContextId};
use gangway_executor::actor::{Actor, FireContext, OUTPUT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Port receiving messages with nothing to split.
pub const NO_SPLIT: &str = "no_split";

fn default_delimiter() -> String {
    ",".to_string()
}

/// Splitter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Context item holding the value to split.
    pub source_item: String,

    /// Item each forked context receives its part under.
    /// Defaults to the source item.
    #[serde(default)]
    pub output_item: Option<String>,

    /// Separator between value parts.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl SplitterConfig {
    /// Split `source_item` on `,` and store the parts under the same name.
    pub fn new(source_item: impl Into<String>) -> Self {
        Self {
            source_item: source_item.into(),
            output_item: None,
            delimiter: default_delimiter(),
        }
    }

    /// Store the parts under another item name.
    pub fn with_output_item(mut self, item: impl Into<String>) -> Self {
        let item = item.into();
        self.output_item = if item.is_empty() { None } else { Some(item) };
        self
    }

    /// Split on another separator.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// The item name parts are stored under.
    pub fn output_item(&self) -> &str {
        self.output_item.as_deref().unwrap_or(&self.source_item)
    }

    /// Split a value into its non-empty, trimmed parts.
    pub fn parts<'v>(&self, value: &'v str) -> Vec<&'v str> {
        if self.delimiter.is_empty() {
            let whole = value.trim();
            return if whole.is_empty() { Vec::new() } else { vec![whole] };
        }
        value
            .split(self.delimiter.as_str())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect()
    }
}

/// Splitter actor - forks a context per value part.
///
/// For a value `"a,b,c"` three messages are sent, in part order. Each is a
/// caused copy of the received message carrying:
/// - sequence id = the split context's id, positions `0..n`, the end flag on the last
/// - the forked child context as body, with the part stored under the output item
/// - the sequence-source header set to this actor
/// - scope headers pointing at the child (group = split context)
///
/// A missing or empty value sends the received message unchanged on
/// `no_split`.
///
/// # Ports
/// - Input: "input" - Message whose context holds the source item
/// - Output: "output" - One message per forked context
/// - Output: "no_split" - Messages with nothing to split
pub struct Splitter {
    id: ActorId,
    config: SplitterConfig,
    service: Arc<ProcessManagerService>,
}

impl Splitter {
    /// Create a splitter resolving contexts through `service`.
    pub fn new(
        id: impl Into<ActorId>,
        config: SplitterConfig,
        service: Arc<ProcessManagerService>,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            service,
        }
    }

    /// The splitter configuration.
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// The context a message is processed in.
    ///
    /// A context body wins; otherwise the scope headers are resolved
    /// against the message's request.
    fn source_context(&self, message: &Message) -> Result<ContextId> {
        if let Some(context) = message.context() {
            return Ok(context);
        }
        let manager = self.service.manager_for(message)?;
        manager.scoped_context(
            message.header(headers::CONTEXT_SCOPE_GROUP),
            message.header(headers::CONTEXT_SCOPE),
        )
    }

    fn fork(&self, message: &Message, context: ContextId, parts: &[&str]) -> Result<Vec<Message>> {
        let store = self.service.store();
        let children = store.fork_sequence(context, parts.len())?;
        let last = parts.len() - 1;

        let mut forked = Vec::with_capacity(parts.len());
        for (position, (part, child)) in parts.iter().zip(children).enumerate() {
            store.put_entry(child, self.config.output_item(), *part)?;

            let mut out = message.clone_in_sequence(context.as_u64(), position as u64, position == last);
            out.set_header(headers::SEQUENCE_SOURCE, self.id.full_name());
            out.set_body(MessageBody::Context(child));
            out.set_header(headers::CONTEXT_SCOPE_GROUP, context.as_u64().to_string());
            out.set_header(headers::CONTEXT_SCOPE, child.as_u64().to_string());
            forked.push(out);
        }
        Ok(forked)
    }
}

impl Actor for Splitter {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        let Some(message) = ctx.token() else {
            return Ok(());
        };

        let context = self.source_context(message)?;
        let value = self
            .service
            .store()
            .lookup_value(context, &self.config.source_item)?
            .unwrap_or_default();
        let parts = self.config.parts(&value);

        if parts.is_empty() {
            tracing::info!(
                actor = %self.id,
                message = %message.id(),
                item = %self.config.source_item,
                "Nothing to split, forwarding via no_split"
            );
            ctx.send(NO_SPLIT, message.clone())?;
            return Ok(());
        }

        tracing::info!(
            actor = %self.id,
            message = %message.id(),
            item = %self.config.source_item,
            delimiter = %self.config.delimiter,
            parts = parts.len(),
            "Splitting message"
        );
        let forked = self
            .fork(message, context, &parts)
            .map_err(|e| GangwayError::actor(&self.id, format!("error generating forked messages: {e}")))?;
        for out in forked {
            ctx.send(OUTPUT, out)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Splitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Splitter")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
