//! Common test utilities for integration tests.

#![allow(dead_code)]

use gangway_core::error::Result;
use gangway_core::message::Message;
use gangway_core::types::ActorId;
use gangway_executor::actor::{Actor, FireContext, OUTPUT};
use gangway_executor::director::{DirectorConfig, DirectorHandle};
use parking_lot::Mutex;
use std::sync::Arc;

/// A sink that records every message it receives.
pub struct Recorder {
    id: ActorId,
    received: Mutex<Vec<Message>>,
}

impl Recorder {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ActorId::new(name),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }
}

impl Actor for Recorder {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        if let Some(message) = ctx.token() {
            self.received.lock().push(message.clone());
        }
        Ok(())
    }
}

/// A source that fires once and sends fixed messages on `output`.
pub struct Emitter {
    id: ActorId,
    messages: Vec<Message>,
}

impl Emitter {
    pub fn new(name: &str, messages: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            id: ActorId::new(name),
            messages,
        })
    }
}

impl Actor for Emitter {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn initialize(&self, director: &DirectorHandle) -> Result<()> {
        director.fire_at_current_time(&self.id)
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        for message in &self.messages {
            ctx.send(OUTPUT, message.clone())?;
        }
        Ok(())
    }

    fn postfire(&self, _ctx: &FireContext<'_>) -> Result<bool> {
        Ok(false)
    }
}

/// Director configurations for both dispatchers.
pub fn configs() -> Vec<DirectorConfig> {
    vec![
        DirectorConfig::default().with_dispatch_timeout_ms(20),
        DirectorConfig::default()
            .with_dispatch_timeout_ms(20)
            .with_dispatch_threads(4),
    ]
}
