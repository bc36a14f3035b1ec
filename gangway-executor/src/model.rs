//! Model topology: actors and the connections between their ports.

use crate::actor::Actor;
use gangway_core::error::{GangwayError, Result};
use gangway_core::types::{ActorId, PortId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// An immutable, validated set of actors and port connections.
pub struct Model {
    name: String,
    actors: BTreeMap<ActorId, Arc<dyn Actor>>,
    connections: HashMap<PortId, Vec<PortId>>,
}

impl Model {
    /// Start building a model.
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            actors: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an actor.
    pub fn actor(&self, id: &ActorId) -> Option<&Arc<dyn Actor>> {
        self.actors.get(id)
    }

    /// Look up an actor, failing when absent.
    pub fn require_actor(&self, id: &ActorId) -> Result<&Arc<dyn Actor>> {
        self.actor(id)
            .ok_or_else(|| GangwayError::ActorNotFound { actor: id.clone() })
    }

    /// All actors, ordered by id.
    pub fn actors(&self) -> impl Iterator<Item = &Arc<dyn Actor>> {
        self.actors.values()
    }

    /// Ports connected to an output port.
    pub fn destinations(&self, from: &PortId) -> &[PortId] {
        self.connections.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of actors.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether the model has no actors.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("actors", &self.actors.keys().collect::<Vec<_>>())
            .field("connections", &self.connections)
            .finish()
    }
}

/// Builder for [`Model`].
pub struct ModelBuilder {
    name: String,
    actors: Vec<Arc<dyn Actor>>,
    connections: Vec<(PortId, PortId)>,
}

impl ModelBuilder {
    /// Add an actor.
    pub fn actor(mut self, actor: Arc<dyn Actor>) -> Self {
        self.actors.push(actor);
        self
    }

    /// Connect an output port to an input port.
    pub fn connect(mut self, from: PortId, to: PortId) -> Self {
        self.connections.push((from, to));
        self
    }

    /// Validate and build the model.
    ///
    /// # Errors
    ///
    /// - `DuplicateActor` when two actors share an id
    /// - `InvalidConnection` when a connection names an unknown actor or
    ///   is declared twice
    pub fn build(self) -> Result<Model> {
        let mut actors = BTreeMap::new();
        for actor in self.actors {
            let id = actor.id().clone();
            if actors.insert(id.clone(), actor).is_some() {
                return Err(GangwayError::DuplicateActor { actor: id });
            }
        }

        let mut connections: HashMap<PortId, Vec<PortId>> = HashMap::new();
        for (from, to) in self.connections {
            let invalid = |cause: String| GangwayError::InvalidConnection {
                from: from.to_string(),
                to: to.to_string(),
                cause,
            };
            if !actors.contains_key(&from.actor) {
                return Err(invalid(format!("unknown source actor '{}'", from.actor)));
            }
            if !actors.contains_key(&to.actor) {
                return Err(invalid(format!("unknown target actor '{}'", to.actor)));
            }
            let targets = connections.entry(from.clone()).or_default();
            if targets.contains(&to) {
                return Err(invalid("duplicate connection".to_string()));
            }
            targets.push(to);
        }

        Ok(Model {
            name: self.name,
            actors,
            connections,
        })
    }
}
