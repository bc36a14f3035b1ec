//! Registry of live process managers.

use super::manager::{MemoryProcessManager, ProcessManager};
use super::persister::{MemoryPersister, ProcessPersister};
use super::store::{Attributes, ContextStore};
use crate::error::{GangwayError, Result};
use crate::message::{Message, headers};
use crate::types::RequestId;
use dashmap::DashMap;
use std::sync::Arc;

/// Hands out the process manager responsible for a request.
///
/// All managers share one [`ContextStore`] and one persister.
pub struct ProcessManagerService {
    store: Arc<ContextStore>,
    persister: Arc<dyn ProcessPersister>,
    managers: DashMap<RequestId, Arc<MemoryProcessManager>>,
}

impl ProcessManagerService {
    /// Create a service backed by the given persister.
    pub fn new(persister: Arc<dyn ProcessPersister>) -> Self {
        Self {
            store: Arc::new(ContextStore::new()),
            persister,
            managers: DashMap::new(),
        }
    }

    /// Create a service with an in-memory persister.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersister::new()))
    }

    /// The shared context arena.
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Start a new request and register its manager.
    pub fn start_request(
        &self,
        reference_id: impl Into<String>,
        attributes: Attributes,
    ) -> Result<Arc<MemoryProcessManager>> {
        let manager = Arc::new(MemoryProcessManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.persister),
            reference_id,
            attributes,
        ));
        manager.notify_started(None)?;
        self.managers.insert(manager.request_id(), Arc::clone(&manager));
        tracing::info!(request = %manager.request_id(), "Started request");
        Ok(manager)
    }

    /// The manager for a request.
    pub fn manager(&self, request: RequestId) -> Result<Arc<MemoryProcessManager>> {
        self.managers
            .get(&request)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(GangwayError::RequestNotFound { request })
    }

    /// The manager for the request a message belongs to.
    pub fn manager_for(&self, message: &Message) -> Result<Arc<MemoryProcessManager>> {
        let request = message
            .request_id()
            .ok_or_else(|| GangwayError::ScopeResolution {
                cause: format!("message {} has no {} header", message.id(), headers::REQUEST_ID),
            })?;
        self.manager(request)
    }

    /// Unregister a finished request.
    pub fn remove(&self, request: RequestId) -> Option<Arc<MemoryProcessManager>> {
        self.managers.remove(&request).map(|(_, manager)| manager)
    }

    /// Number of registered requests.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no request is registered.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl Default for ProcessManagerService {
    fn default() -> Self {
        Self::in_memory()
    }
}
