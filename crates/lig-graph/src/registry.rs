//! Identity map per class hierarchy.
//!
//! `IdentityMap` is the raw index: id -> instance and cid -> instance, plus
//! registration order. `Registry` is the public handle scoped to a class;
//! every class sharing a registry root sees the same map.

use std::collections::HashMap;

use lig_core::ids::{Cid, IdKey};
use serde_json::Value;
use tracing::trace;

use crate::class::ClassId;
use crate::error::GraphError;
use crate::events::{Emitter, Event, ListenerId};
use crate::graph::Graph;
use crate::model::Model;
use crate::state::EntityKey;

#[derive(Debug, Default)]
pub(crate) struct IdentityMap {
    by_id: HashMap<IdKey, EntityKey>,
    by_cid: HashMap<Cid, EntityKey>,
    order: Vec<EntityKey>,
}

impl IdentityMap {
    pub(crate) fn get_by_id(&self, id: &IdKey) -> Option<EntityKey> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn get_by_cid(&self, cid: &Cid) -> Option<EntityKey> {
        self.by_cid.get(cid).copied()
    }

    pub(crate) fn contains(&self, key: EntityKey) -> bool {
        self.order.contains(&key)
    }

    /// Register `key` under its client id. Returns `false` if already present.
    pub(crate) fn insert(&mut self, key: EntityKey, cid: &Cid) -> bool {
        if self.by_cid.contains_key(cid) {
            return false;
        }
        self.by_cid.insert(cid.clone(), key);
        self.order.push(key);
        true
    }

    /// Index `key` under `id`.
    ///
    /// Fails with the current holder when another instance owns the id.
    pub(crate) fn index_id(&mut self, key: EntityKey, id: IdKey) -> Result<(), EntityKey> {
        match self.by_id.get(&id) {
            Some(holder) if *holder != key => Err(*holder),
            _ => {
                self.by_id.insert(id, key);
                Ok(())
            }
        }
    }

    pub(crate) fn unindex_id(&mut self, key: EntityKey, id: &IdKey) {
        if self.by_id.get(id) == Some(&key) {
            self.by_id.remove(id);
        }
    }

    pub(crate) fn remove(&mut self, key: EntityKey, cid: &Cid, id: Option<&IdKey>) {
        if self.by_cid.get(cid) == Some(&key) {
            self.by_cid.remove(cid);
        }
        if let Some(id) = id {
            self.unindex_id(key, id);
        }
        self.order.retain(|k| *k != key);
    }

    pub(crate) fn reset(&mut self) {
        self.by_id.clear();
        self.by_cid.clear();
        self.order.clear();
    }

    pub(crate) fn keys(&self) -> &[EntityKey] {
        &self.order
    }
}

/// Identity map handle for one class.
///
/// Lookups go through the class's registry root, so `Admin` and `User`
/// registries answer the same way when `Admin` extends `User`.
#[derive(Clone)]
pub struct Registry {
    graph: Graph,
    class: ClassId,
}

impl Registry {
    pub(crate) fn new(graph: Graph, class: ClassId) -> Self {
        Self { graph, class }
    }

    #[must_use]
    pub const fn class(&self) -> ClassId {
        self.class
    }

    fn root(&self) -> ClassId {
        self.graph.with_state(|s| s.classes.root(self.class))
    }

    /// Return the canonical instance for `attrs`, merging them into it, or
    /// construct one.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ClassMismatch`] when the payload's identity
    /// belongs to an instance outside this class.
    pub fn lookup_or_create(&self, attrs: Value) -> Result<Model, GraphError> {
        self.graph.create(self.class, attrs)
    }

    /// Instance of this class registered under `id`. Numeric and string ids
    /// are equivalent.
    #[must_use]
    pub fn get(&self, id: &Value) -> Option<Model> {
        let id = IdKey::from_value(id)?;
        let key = self.graph.with_state(|s| s.lookup_id(self.class, &id))?;
        Some(self.graph.model(key))
    }

    #[must_use]
    pub fn get_by_cid(&self, cid: &str) -> Option<Model> {
        let cid = Cid::from_value(&Value::String(cid.to_string()))?;
        let key = self.graph.with_state(|s| s.lookup_cid(self.class, &cid))?;
        Some(self.graph.model(key))
    }

    /// Index `model` under its current id.
    ///
    /// Id changes made through `set` are indexed automatically; this is for
    /// instances whose id was assigned while they were outside the registry.
    pub fn register_id_assignment(&self, model: &Model) {
        self.graph.reindex(model.key());
    }

    /// Register `model` (idempotent) and announce it with an `add` event.
    pub fn add(&self, model: &Model) {
        if !self.graph.same(model.graph()) || model.is_destroyed() {
            return;
        }
        let root = self.root();
        self.graph.with_state_mut(|s| {
            if let Some(cid) = s.entities.get(&model.key()).map(|e| e.cid.clone()) {
                s.registry_mut(root).insert(model.key(), &cid);
            }
        });
        self.graph.reindex(model.key());
        self.graph.emit(
            Emitter::Registry(root),
            Event::Add {
                member: model.clone(),
            },
        );
    }

    /// Forget every registered instance. Instances stay usable but are no
    /// longer discoverable by id or cid.
    pub fn reset(&self) {
        let root = self.root();
        self.graph.with_state_mut(|s| {
            s.registry_mut(root).reset();
            s.pending.retain(|(r, _), _| *r != root);
        });
        trace!(class = self.class.0, "registry reset");
    }

    /// Registered instances of this class and its subclasses, in
    /// registration order.
    fn keys(&self) -> Vec<EntityKey> {
        let root = self.root();
        self.graph.with_state(|s| {
            s.registries
                .get(&root)
                .map(|m| {
                    m.keys()
                        .iter()
                        .copied()
                        .filter(|k| s.is_instance_of(*k, self.class))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered instances of this class and its subclasses, in
    /// registration order.
    #[must_use]
    pub fn models(&self) -> Vec<Model> {
        self.keys().into_iter().map(|k| self.graph.model(k)).collect()
    }

    /// Subscribe to registry events (`add`).
    pub fn on(&self, topic: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.graph.listen(Emitter::Registry(self.root()), topic, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.graph.unlisten(id)
    }
}
