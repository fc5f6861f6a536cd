//! `Collection`: ordered set of instances of one class.
//!
//! A collection either backs a many-association (it has an owner and its
//! membership mirrors the members' inverse foreign keys) or stands alone.

use std::fmt;

use lig_core::ids::IdKey;
use serde_json::Value;

use crate::class::ClassId;
use crate::events::{Emitter, Event, ListenerId};
use crate::graph::Graph;
use crate::model::Model;
use crate::state::{CollectionKey, EntityKey};

#[derive(Clone)]
pub struct Collection {
    graph: Graph,
    key: CollectionKey,
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.graph.same(&other.graph)
    }
}

impl Eq for Collection {}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("collection", &self.key.0)
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub(crate) fn new(graph: Graph, key: CollectionKey) -> Self {
        Self { graph, key }
    }

    fn members(&self) -> Vec<EntityKey> {
        self.graph.with_state(|s| {
            s.collections
                .get(&self.key)
                .map(|c| c.members.clone())
                .unwrap_or_default()
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph
            .with_state(|s| s.collections.get(&self.key).map_or(0, |c| c.members.len()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<Model> {
        let key = self
            .graph
            .with_state(|s| s.collections.get(&self.key)?.members.get(index).copied())?;
        Some(self.graph.model(key))
    }

    /// Member whose id equals `id`. Numeric and string ids are equivalent.
    #[must_use]
    pub fn get(&self, id: &Value) -> Option<Model> {
        let id = IdKey::from_value(id)?;
        let id_attribute = &self.graph.config().id_attribute;
        let key = self.graph.with_state(|s| {
            s.collections.get(&self.key)?.members.iter().copied().find(|m| {
                s.entities
                    .get(m)
                    .and_then(|e| e.attrs.get(id_attribute))
                    .and_then(IdKey::from_value)
                    .as_ref()
                    == Some(&id)
            })
        })?;
        Some(self.graph.model(key))
    }

    #[must_use]
    pub fn contains(&self, model: &Model) -> bool {
        self.graph.same(model.graph()) && self.members().contains(&model.key())
    }

    /// Members in order.
    #[must_use]
    pub fn models(&self) -> Vec<Model> {
        self.members()
            .into_iter()
            .map(|k| self.graph.model(k))
            .collect()
    }

    /// Iterate over a snapshot of the current members.
    pub fn iter(&self) -> impl Iterator<Item = Model> + '_ {
        self.members().into_iter().map(|k| self.graph.model(k))
    }

    /// Append `model`. Returns `false` if it is already a member.
    ///
    /// For a many-association this also points the model's inverse foreign
    /// key at the owner.
    pub fn add(&self, model: &Model) -> bool {
        self.graph.same(model.graph()) && self.graph.collection_insert(self.key, model.key())
    }

    /// Remove `model`. Returns `false` if it was not a member.
    pub fn remove(&self, model: &Model) -> bool {
        self.graph.same(model.graph()) && self.graph.collection_discard(self.key, model.key())
    }

    /// Replace the contents with `models`, in order. Fires `reset`.
    pub fn reset(&self, models: &[Model]) {
        let members = models
            .iter()
            .filter(|m| self.graph.same(m.graph()))
            .map(Model::key)
            .collect();
        self.graph.collection_reset(self.key, members);
    }

    /// Instance whose many-association this collection backs.
    #[must_use]
    pub fn owner(&self) -> Option<Model> {
        let owner = self
            .graph
            .with_state(|s| s.collections.get(&self.key)?.owner.as_ref().map(|l| l.owner))?;
        Some(self.graph.model(owner))
    }

    #[must_use]
    pub fn class(&self) -> Option<ClassId> {
        self.graph
            .with_state(|s| s.collections.get(&self.key).map(|c| c.class))
    }

    pub fn on(&self, topic: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.graph
            .listen(Emitter::Collection(self.key), topic, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.graph.unlisten(id)
    }
}
