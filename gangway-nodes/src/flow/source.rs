//! Request source actor.

use gangway_core::error::Result;
use gangway_core::message::{Message, headers};
use gangway_core::process::{Attributes, ProcessManager, ProcessManagerService};
use gangway_core::types::{ActorId, RequestId};
use gangway_executor::actor::{Actor, FireContext, OUTPUT};
use gangway_executor::director::DirectorHandle;
use parking_lot::Mutex;
use std::sync::Arc;

/// Request source - starts requests and emits their root contexts.
///
/// Schedules itself when the run initializes. Its single iteration starts
/// one request per configured entry and sends a message referring to the
/// request's root context, tagged with the request id header. It is never
/// iterated again afterwards.
///
/// # Ports
/// - Output: "output" - One message per started request
pub struct RequestSource {
    id: ActorId,
    service: Arc<ProcessManagerService>,
    requests: Vec<(String, Attributes)>,
    started: Mutex<Vec<RequestId>>,
}

impl RequestSource {
    /// Create a source without requests.
    pub fn new(id: impl Into<ActorId>, service: Arc<ProcessManagerService>) -> Self {
        Self {
            id: id.into(),
            service,
            requests: Vec::new(),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Add a request to start.
    pub fn with_request(mut self, reference_id: impl Into<String>, attributes: Attributes) -> Self {
        self.requests.push((reference_id.into(), attributes));
        self
    }

    /// Requests started in the current run, in start order.
    pub fn started(&self) -> Vec<RequestId> {
        self.started.lock().clone()
    }
}

impl Actor for RequestSource {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn initialize(&self, director: &DirectorHandle) -> Result<()> {
        self.started.lock().clear();
        director.fire_at_current_time(&self.id)
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        for (reference_id, attributes) in &self.requests {
            let manager = self.service.start_request(reference_id.as_str(), attributes.clone())?;
            let request = manager.request_id();
            self.started.lock().push(request);

            let message = Message::for_context(manager.request().root)
                .with_header(headers::REQUEST_ID, request.as_u64().to_string());
            tracing::debug!(actor = %self.id, request = %request, reference = %reference_id, "Emitting request");
            ctx.send(OUTPUT, message)?;
        }
        Ok(())
    }

    fn postfire(&self, _ctx: &FireContext<'_>) -> Result<bool> {
        Ok(false)
    }
}
