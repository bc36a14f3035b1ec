//! Messages carried between actor ports.
//!
//! A message is the payload token of a [`SendEvent`](crate::event::SendEvent).
//! Process correlation (request, scope, sequence source) travels in string
//! headers so that any actor can forward a message without understanding it.

use crate::types::{ContextId, MessageId, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known message header names.
pub mod headers {
    /// Id of the request the message belongs to.
    pub const REQUEST_ID: &str = "gangway.request.id";
    /// Id of the context the scope was forked from.
    pub const CONTEXT_SCOPE_GROUP: &str = "gangway.ctxt.scope.group";
    /// Id of the context the message is scoped to.
    pub const CONTEXT_SCOPE: &str = "gangway.ctxt.scope";
    /// Actor that produced a message sequence.
    pub const SEQUENCE_SOURCE: &str = "gangway.seq.src";
    /// Error code of an error message.
    pub const ERROR_CODE: &str = "gangway.error.code";
    /// Error text of an error message.
    pub const ERROR_MESSAGE: &str = "gangway.error.message";
}

/// The body of a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageBody {
    /// No body.
    #[default]
    Empty,
    /// Plain text.
    Text(String),
    /// Reference to a context in the process arena.
    Context(ContextId),
}

/// Position of a message within a correlated sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceInfo {
    /// Identifies the sequence (the forked parent context).
    pub sequence_id: u64,
    /// Zero-based position.
    pub position: u64,
    /// Whether this is the last message of the sequence.
    pub end_of_sequence: bool,
}

/// A message flowing through a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    caused_by: Option<MessageId>,
    headers: BTreeMap<String, String>,
    body: MessageBody,
    sequence: Option<SequenceInfo>,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with the given body.
    pub fn new(body: MessageBody) -> Self {
        Self {
            id: MessageId::next(),
            caused_by: None,
            headers: BTreeMap::new(),
            body,
            sequence: None,
            created_at: Utc::now(),
        }
    }

    /// Create a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageBody::Text(text.into()))
    }

    /// Create a message referring to a context.
    pub fn for_context(context: ContextId) -> Self {
        Self::new(MessageBody::Context(context))
    }

    /// Builder-style header setter.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Message id.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Id of the message this one was derived from.
    pub fn caused_by(&self) -> Option<MessageId> {
        self.caused_by
    }

    /// Message body.
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: MessageBody) {
        self.body = body;
    }

    /// The context referenced by the body, if any.
    pub fn context(&self) -> Option<ContextId> {
        match self.body {
            MessageBody::Context(id) => Some(id),
            _ => None,
        }
    }

    /// Sequence metadata, if the message is part of a sequence.
    pub fn sequence(&self) -> Option<SequenceInfo> {
        self.sequence
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// All headers.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Check whether a header is present.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Set a header value, replacing any previous one.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Remove a header, returning its value.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    /// The request id header, parsed.
    pub fn request_id(&self) -> Option<RequestId> {
        self.header(headers::REQUEST_ID).and_then(RequestId::parse)
    }

    /// Copy of this message with a fresh id, caused by this one.
    ///
    /// Headers, body and sequence metadata are preserved.
    pub fn caused_copy(&self) -> Self {
        Self {
            id: MessageId::next(),
            caused_by: Some(self.id),
            headers: self.headers.clone(),
            body: self.body.clone(),
            sequence: self.sequence,
            created_at: Utc::now(),
        }
    }

    /// Caused copy tagged with sequence metadata.
    pub fn clone_in_sequence(&self, sequence_id: u64, position: u64, end_of_sequence: bool) -> Self {
        let mut copy = self.caused_copy();
        copy.sequence = Some(SequenceInfo {
            sequence_id,
            position,
            end_of_sequence,
        });
        copy
    }

    /// Caused copy with the sequence metadata stripped.
    pub fn caused_copy_unsequenced(&self) -> Self {
        let mut copy = self.caused_copy();
        copy.sequence = None;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caused_copy_keeps_headers() {
        let msg = Message::text("hello").with_header(headers::REQUEST_ID, "7");
        let copy = msg.caused_copy();

        assert_ne!(copy.id(), msg.id());
        assert_eq!(copy.caused_by(), Some(msg.id()));
        assert_eq!(copy.header(headers::REQUEST_ID), Some("7"));
        assert_eq!(copy.request_id(), Some(RequestId::new(7)));
        assert_eq!(copy.body(), &MessageBody::Text("hello".into()));
    }

    #[test]
    fn clone_in_sequence() {
        let msg = Message::for_context(ContextId::new(3));
        let last = msg.clone_in_sequence(3, 2, true);

        let seq = last.sequence().unwrap();
        assert_eq!(seq.sequence_id, 3);
        assert_eq!(seq.position, 2);
        assert!(seq.end_of_sequence);
        assert!(msg.sequence().is_none());
        assert!(last.caused_copy_unsequenced().sequence().is_none());
    }

    #[test]
    fn header_manipulation() {
        let mut msg = Message::new(MessageBody::Empty);
        assert!(!msg.has_header("x"));
        msg.set_header("x", "1");
        assert!(msg.has_header("x"));
        assert_eq!(msg.remove_header("x"), Some("1".to_string()));
        assert!(msg.header("x").is_none());
        assert!(msg.context().is_none());
    }
}
