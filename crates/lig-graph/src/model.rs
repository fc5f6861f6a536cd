//! `Model`: handle to one instance in a graph.

use std::fmt;
use std::hash::{Hash, Hasher};

use lig_core::Attributes;
use serde_json::Value;

use crate::class::ClassId;
use crate::collection::Collection;
use crate::error::GraphError;
use crate::events::{Emitter, Event, ListenerId};
use crate::graph::Graph;
use crate::state::EntityKey;

/// Handle to a model instance.
///
/// Handles are cheap to clone. Two handles are equal when they refer to the
/// same instance of the same graph, which is what the identity map
/// guarantees for equal ids.
#[derive(Clone)]
pub struct Model {
    graph: Graph,
    key: EntityKey,
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.graph.same(&other.graph)
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("instance", &self.key.0)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub(crate) fn new(graph: Graph, key: EntityKey) -> Self {
        Self { graph, key }
    }

    pub(crate) const fn key(&self) -> EntityKey {
        self.key
    }

    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    // -----------------------------------------------------------------------
    // Identity and attributes
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn class(&self) -> ClassId {
        self.graph.with_state(|s| s.entities[&self.key].class)
    }

    #[must_use]
    pub fn class_name(&self) -> String {
        self.graph
            .with_state(|s| s.classes.name(s.entities[&self.key].class).to_string())
    }

    /// Client id, assigned at construction and never changed.
    #[must_use]
    pub fn cid(&self) -> String {
        self.graph
            .with_state(|s| s.entities[&self.key].cid.as_str().to_string())
    }

    /// Value of the id attribute, if set.
    #[must_use]
    pub fn id(&self) -> Option<Value> {
        self.get(&self.graph.config().id_attribute)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.graph
            .with_state(|s| s.entities[&self.key].attrs.get(name).cloned())
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.graph
            .with_state(|s| s.entities[&self.key].attrs.contains_key(name))
    }

    /// Every attribute, including the client-id attribute.
    ///
    /// Passing the result back to `create` yields this same instance.
    #[must_use]
    pub fn attributes(&self) -> Value {
        Value::Object(self.graph.with_state(|s| s.entities[&self.key].attrs.clone()))
    }

    /// Serializable attributes: everything but the client-id attribute.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let cid_attribute = self.graph.cid_attribute(self.class());
        let mut attrs = self.graph.with_state(|s| s.entities[&self.key].attrs.clone());
        attrs.remove(&cid_attribute);
        Value::Object(attrs)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.graph
            .write_attrs(self.key, vec![(name.to_string(), Some(value.into()))]);
    }

    /// Set every key of an object payload in one batch. Nested association
    /// values are kept as literal attributes; use [`Model::parse`] to
    /// materialize them.
    pub fn set_attrs(&self, attrs: Value) {
        let Value::Object(attrs) = attrs else {
            return;
        };
        self.graph
            .write_attrs(self.key, attrs.into_iter().map(|(k, v)| (k, Some(v))).collect());
    }

    pub fn unset(&self, name: &str) {
        self.graph.write_attrs(self.key, vec![(name.to_string(), None)]);
    }

    /// Merge a nested payload into this instance through the graph parser.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::MalformedNested` under strict parsing. Nothing
    /// is applied in that case.
    pub fn parse(&self, payload: Value) -> Result<(), GraphError> {
        let class = self.class();
        let mut attrs = match payload {
            Value::Object(map) => map,
            _ => Attributes::new(),
        };
        self.graph.validate_payload(class, &attrs)?;
        attrs.remove(&self.graph.cid_attribute(class));
        self.graph.merge_parsed(self.key, attrs);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Associations
    // -----------------------------------------------------------------------

    /// Current peer of a one-association.
    #[must_use]
    pub fn one(&self, relation: &str) -> Option<Model> {
        let key = self
            .graph
            .with_state(|s| s.entities[&self.key].ones.get(relation).copied())?;
        Some(self.graph.model(key))
    }

    /// Collection of a many-association. Materialized on first access and
    /// identical on every later access.
    #[must_use]
    pub fn many(&self, relation: &str) -> Option<Collection> {
        let relation = self
            .graph
            .relation_of(self.key, relation)
            .filter(|r| r.is_many())?;
        let collection = self.graph.ensure_many(self.key, &relation)?;
        Some(self.graph.collection_handle(collection))
    }

    // -----------------------------------------------------------------------
    // Lifecycle and events
    // -----------------------------------------------------------------------

    /// Remove this instance from its registry and cut its associations.
    pub fn destroy(&self) {
        self.graph.destroy_entity(self.key);
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.graph.with_state(|s| s.entities[&self.key].destroyed)
    }

    pub fn on(&self, topic: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.graph.listen(Emitter::Entity(self.key), topic, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.graph.unlisten(id)
    }
}
