//! The `Graph` handle: class declarations, construction, attribute writes.
//!
//! A graph owns every registry, instance, and collection it creates.
//! Handles (`Model`, `Collection`, `Registry`) are cheap clones pointing
//! back into it. All work is synchronous on the calling thread.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lig_config::EngineConfig;
use lig_core::Attributes;
use lig_core::ids::{Cid, IdKey};
use lig_core::relation::RelationDescriptor;
use lig_core::schema::SchemaDoc;
use serde_json::Value;
use tracing::{trace, warn};

use crate::builder::Has;
use crate::class::{BoundRelation, ClassId, ClassSpec};
use crate::collection::Collection;
use crate::error::GraphError;
use crate::events::{Emitter, Event, ListenerId, Listeners};
use crate::model::Model;
use crate::registry::Registry;
use crate::state::{CollectionKey, EntityKey, GraphState};

/// Options for [`Graph::create_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Run the payload through the graph parser before applying it.
    pub parse: bool,
}

impl CreateOptions {
    #[must_use]
    pub const fn parsed() -> Self {
        Self { parse: true }
    }
}

struct GraphInner {
    state: RefCell<GraphState>,
    listeners: RefCell<Listeners>,
    config: EngineConfig,
}

/// A live object graph.
#[derive(Clone)]
pub struct Graph {
    inner: Rc<GraphInner>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Graph");
        if let Ok(state) = self.inner.state.try_borrow() {
            out.field("classes", &state.classes.ids().count());
            out.field("instances", &state.entities.len());
        }
        out.finish_non_exhaustive()
    }
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(GraphInner {
                state: RefCell::new(GraphState::default()),
                listeners: RefCell::new(Listeners::default()),
                config,
            }),
        }
    }

    /// Build a graph from a schema document with the default engine config.
    ///
    /// # Errors
    ///
    /// See [`Graph::from_schema_with_config`].
    pub fn from_schema(doc: &SchemaDoc) -> Result<Self, GraphError> {
        Self::from_schema_with_config(doc, EngineConfig::default())
    }

    /// Build a graph from a schema document.
    ///
    /// Classes may appear in any order; a parent is declared before its
    /// subclasses. Relations are added once every class exists.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownClass` for a missing parent or relation
    /// target, `GraphError::DuplicateClass` for a repeated class name, and
    /// `GraphError::Core` for invalid relation declarations.
    pub fn from_schema_with_config(doc: &SchemaDoc, config: EngineConfig) -> Result<Self, GraphError> {
        let graph = Self::with_config(config);
        let mut remaining: Vec<_> = doc.classes.iter().collect();

        while !remaining.is_empty() {
            let before = remaining.len();
            let mut deferred = Vec::new();
            for class in remaining {
                let parent = match &class.extends {
                    Some(parent) => match graph.class_id(parent) {
                        Some(id) => Some(id),
                        None => {
                            deferred.push(class);
                            continue;
                        }
                    },
                    None => None,
                };
                let mut spec = ClassSpec::new(class.name.clone());
                if let Some(parent) = parent {
                    spec = spec.extends(parent);
                }
                if class.own_registry {
                    spec = spec.own_registry();
                }
                if let Some(attribute) = &class.cid_attribute {
                    spec = spec.cid_attribute(attribute.clone());
                }
                graph.declare(spec)?;
            }
            if deferred.len() == before {
                let missing = deferred
                    .first()
                    .and_then(|c| c.extends.clone())
                    .unwrap_or_default();
                return Err(GraphError::UnknownClass(missing));
            }
            remaining = deferred;
        }

        for class in &doc.classes {
            let id = graph
                .class_id(&class.name)
                .ok_or_else(|| GraphError::UnknownClass(class.name.clone()))?;
            for descriptor in &class.relations {
                graph.add_relation(id, descriptor.clone())?;
            }
        }
        Ok(graph)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Declare a class.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateClass` if the name is taken and
    /// `GraphError::UnknownClass` if the parent is not part of this graph.
    pub fn declare(&self, spec: ClassSpec) -> Result<ClassId, GraphError> {
        self.with_state_mut(|s| s.classes.declare(spec))
    }

    /// Declare a root class with its own registry.
    ///
    /// # Errors
    ///
    /// See [`Graph::declare`].
    pub fn define(&self, name: &str) -> Result<ClassId, GraphError> {
        self.declare(ClassSpec::new(name))
    }

    /// Declare `name` as a subclass of `parent`, sharing its registry.
    ///
    /// # Errors
    ///
    /// See [`Graph::declare`].
    pub fn extend(&self, parent: ClassId, name: &str) -> Result<ClassId, GraphError> {
        self.declare(ClassSpec::new(name).extends(parent))
    }

    /// Start declaring relations on `class`.
    #[must_use]
    pub const fn has(&self, class: ClassId) -> Has<'_> {
        Has::new(self, class)
    }

    pub(crate) fn add_relation(
        &self,
        class: ClassId,
        descriptor: RelationDescriptor,
    ) -> Result<(), GraphError> {
        self.with_state_mut(|s| s.classes.add_relation(class, descriptor))
            .map(|_| ())
    }

    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.with_state(|s| s.classes.id_of(name))
    }

    #[must_use]
    pub fn class_name(&self, class: ClassId) -> Option<String> {
        self.with_state(|s| {
            s.classes
                .check(class)
                .ok()
                .map(|()| s.classes.name(class).to_string())
        })
    }

    #[must_use]
    pub fn classes(&self) -> Vec<ClassId> {
        self.with_state(|s| s.classes.ids().collect())
    }

    /// Effective relations of `class`, inherited ones first.
    #[must_use]
    pub fn relations(&self, class: ClassId) -> Vec<RelationDescriptor> {
        self.with_state(|s| {
            if s.classes.check(class).is_err() {
                return Vec::new();
            }
            s.classes
                .relations(class)
                .iter()
                .map(|r| r.descriptor.clone())
                .collect()
        })
    }

    /// `true` if `class` is `ancestor` or one of its subclasses.
    #[must_use]
    pub fn is_a(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.with_state(|s| {
            s.classes.check(class).is_ok()
                && s.classes.check(ancestor).is_ok()
                && s.classes.is_a(class, ancestor)
        })
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Return the canonical instance for `attrs`, merging them in, or create
    /// one. Nested association values are kept as literal attributes.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownClass` if `class` is not part of this graph
    /// and `GraphError::ClassMismatch` if the payload's id or cid belongs to
    /// an instance that is not a `class`.
    pub fn create(&self, class: ClassId, attrs: Value) -> Result<Model, GraphError> {
        self.create_with(class, attrs, CreateOptions::default())
    }

    /// Like [`Graph::create`], running the payload through the graph parser.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::MalformedNested` under strict parsing when an
    /// association key holds a value that cannot be materialized. Nothing
    /// from the payload is applied in that case.
    pub fn create_parsed(&self, class: ClassId, attrs: Value) -> Result<Model, GraphError> {
        self.create_with(class, attrs, CreateOptions::parsed())
    }

    /// Look up or construct an instance of `class` and apply `attrs` to it.
    ///
    /// Identity is taken from the id attribute first, then from the class's
    /// client-id attribute. Keys absent from `attrs` are left untouched on
    /// an existing instance. An identity held by an instance of an ancestor
    /// or unrelated class is refused before anything is applied.
    ///
    /// # Errors
    ///
    /// See [`Graph::create`] and [`Graph::create_parsed`].
    pub fn create_with(
        &self,
        class: ClassId,
        attrs: Value,
        options: CreateOptions,
    ) -> Result<Model, GraphError> {
        self.with_state(|s| s.classes.check(class))?;
        let attrs = into_attributes(attrs);
        if options.parse {
            self.validate_payload(class, &attrs)?;
        }
        let key = self.create_entity(class, attrs, options.parse)?;
        Ok(self.model(key))
    }

    /// Construction without payload validation. `class` must be checked
    /// already.
    pub(crate) fn create_entity(
        &self,
        class: ClassId,
        mut attrs: Attributes,
        parse: bool,
    ) -> Result<EntityKey, GraphError> {
        let (key, created) = match self.identify(class, &attrs)? {
            Some(key) => (key, false),
            None => (self.construct(class), true),
        };
        attrs.remove(&self.cid_attribute(class));

        if parse {
            self.merge_parsed(key, attrs);
        } else {
            self.write_attrs(key, attrs.into_iter().map(|(k, v)| (k, Some(v))).collect());
        }

        if created {
            let root = self.with_state(|s| s.classes.root(class));
            self.emit(
                Emitter::Registry(root),
                Event::Add {
                    member: self.model(key),
                },
            );
        }
        Ok(key)
    }

    /// Registered instance `attrs` refer to, by id, then by cid.
    pub(crate) fn identify(
        &self,
        class: ClassId,
        attrs: &Attributes,
    ) -> Result<Option<EntityKey>, GraphError> {
        let cid_attribute = self.cid_attribute(class);
        self.with_state(|s| {
            let by_id = attrs
                .get(&self.inner.config.id_attribute)
                .and_then(IdKey::from_value)
                .and_then(|id| Some((s.id_holder(class, &id)?, format!("id {id}"))));
            let found = by_id.or_else(|| {
                let cid = attrs.get(&cid_attribute).and_then(Cid::from_value)?;
                Some((s.cid_holder(class, &cid)?, format!("cid {cid}")))
            });
            let Some((key, identity)) = found else {
                return Ok(None);
            };
            if s.is_instance_of(key, class) {
                return Ok(Some(key));
            }
            let found = s
                .entities
                .get(&key)
                .map(|e| s.classes.name(e.class).to_string())
                .unwrap_or_default();
            Err(GraphError::ClassMismatch {
                requested: s.classes.name(class).to_string(),
                found,
                identity,
            })
        })
    }

    fn construct(&self, class: ClassId) -> EntityKey {
        let cid = Cid::generate(&self.inner.config.cid_prefix);
        let cid_attribute = self.cid_attribute(class);
        self.with_state_mut(|s| {
            let mut attrs = Attributes::new();
            attrs.insert(cid_attribute, cid.to_value());
            let key = s.alloc_entity(class, cid.clone(), attrs);
            let root = s.classes.root(class);
            s.registry_mut(root).insert(key, &cid);
            trace!(%cid, class = s.classes.name(class), "registered new instance");
            key
        })
    }

    // -----------------------------------------------------------------------
    // Handles
    // -----------------------------------------------------------------------

    /// Identity map serving `class`.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownClass` if `class` is not part of this graph.
    pub fn registry(&self, class: ClassId) -> Result<Registry, GraphError> {
        self.with_state(|s| s.classes.check(class))?;
        Ok(Registry::new(self.clone(), class))
    }

    /// A free-standing collection of `class` instances.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownClass` if `class` is not part of this graph.
    pub fn collection(&self, class: ClassId) -> Result<Collection, GraphError> {
        self.with_state(|s| s.classes.check(class))?;
        let key = self.with_state_mut(|s| s.alloc_collection(class, None));
        Ok(self.collection_handle(key))
    }

    /// Clear every registry. Instances stay usable but are no longer
    /// discoverable by id or cid.
    pub fn reset(&self) {
        self.with_state_mut(|s| {
            for map in s.registries.values_mut() {
                map.reset();
            }
            s.pending.clear();
        });
    }

    // -----------------------------------------------------------------------
    // Attribute writes
    // -----------------------------------------------------------------------

    /// Apply attribute changes (`None` unsets) and propagate their effects.
    ///
    /// Only real changes are applied. Change events fire first, then
    /// one-associations whose foreign key changed are re-resolved in
    /// declaration order.
    pub(crate) fn write_attrs(&self, key: EntityKey, changes: Vec<(String, Option<Value>)>) {
        let id_attribute = self.inner.config.id_attribute.clone();
        let applied = self.with_state_mut(|s| {
            let Some(entity) = s.entities.get_mut(&key) else {
                return Vec::new();
            };
            let mut applied = Vec::new();
            for (name, value) in changes {
                let previous = entity.attrs.get(&name).cloned();
                if previous == value {
                    continue;
                }
                match &value {
                    Some(v) => {
                        entity.attrs.insert(name.clone(), v.clone());
                    }
                    None => {
                        entity.attrs.remove(&name);
                    }
                }
                applied.push((name, previous, value));
            }
            applied
        });
        if applied.is_empty() {
            return;
        }

        let id_change = applied
            .iter()
            .find(|(name, ..)| *name == id_attribute)
            .map(|(_, previous, current)| {
                (
                    previous.as_ref().and_then(IdKey::from_value),
                    current.as_ref().and_then(IdKey::from_value),
                )
            })
            .filter(|(previous, current)| previous != current);
        if let Some((previous, _)) = &id_change {
            self.index_current_id(key, previous.as_ref());
        }

        for (name, previous, current) in &applied {
            self.emit(
                Emitter::Entity(key),
                Event::Change {
                    key: name.clone(),
                    previous: previous.clone(),
                    current: current.clone(),
                },
            );
        }
        self.emit(Emitter::Entity(key), Event::Changed);

        let relations: Vec<Rc<BoundRelation>> = self.with_state(|s| {
            let Some(entity) = s.entities.get(&key) else {
                return Vec::new();
            };
            s.classes
                .relations(entity.class)
                .into_iter()
                .filter(|r| r.is_one() && applied.iter().any(|(name, ..)| *name == r.foreign_key))
                .collect()
        });
        for relation in &relations {
            self.resolve_one(key, relation);
        }

        if id_change.is_some() {
            self.id_assigned(key);
        }
    }

    /// Index the entity's current id, dropping `previous` from the index.
    fn index_current_id(&self, key: EntityKey, previous: Option<&IdKey>) {
        let id_attribute = &self.inner.config.id_attribute;
        let outcome = self.with_state_mut(|s| {
            let entity = s.entities.get(&key)?;
            if entity.destroyed {
                return None;
            }
            let current = entity.attrs.get(id_attribute).and_then(IdKey::from_value);
            let root = s.classes.root(entity.class);
            let map = s.registry_mut(root);
            if !map.contains(key) {
                return None;
            }
            if let Some(previous) = previous {
                map.unindex_id(key, previous);
            }
            let current = current?;
            let result = map.index_id(key, current.clone());
            Some((current, result))
        });
        match outcome {
            Some((id, Ok(()))) => trace!(%id, "indexed id"),
            Some((id, Err(holder))) => warn!(
                %id,
                holder = holder.0,
                instance = key.0,
                "id already registered to another instance, keeping the existing one"
            ),
            None => {}
        }
    }

    /// Re-index `key` and run the id-assignment follow-ups.
    pub(crate) fn reindex(&self, key: EntityKey) {
        self.index_current_id(key, None);
        self.id_assigned(key);
    }

    /// Follow-ups once `key` holds a (new) id: rewrite referrers' foreign
    /// keys and resolve foreign keys that were waiting for this id.
    fn id_assigned(&self, key: EntityKey) {
        let id_attribute = &self.inner.config.id_attribute;
        let Some((value, id, root, referrers, registered)) = self.with_state(|s| {
            let entity = s.entities.get(&key)?;
            let value = entity.attrs.get(id_attribute).cloned()?;
            let id = IdKey::from_value(&value)?;
            let registered = s.lookup_id(entity.class, &id) == Some(key);
            Some((
                value,
                id,
                s.classes.root(entity.class),
                s.referrers.get(&key).cloned().unwrap_or_default(),
                registered,
            ))
        }) else {
            return;
        };
        if !registered {
            return;
        }

        for link in referrers {
            let Some(relation) = self.relation_of(link.owner, &link.relation) else {
                continue;
            };
            let stale = self.with_state(|s| {
                s.entities.get(&link.owner).is_some_and(|e| {
                    e.ones.get(&link.relation) == Some(&key)
                        && e.attrs.get(&relation.foreign_key).and_then(IdKey::from_value).as_ref()
                            != Some(&id)
                })
            });
            if stale {
                self.write_attrs(link.owner, vec![(relation.foreign_key.clone(), Some(value.clone()))]);
            }
        }

        if self.inner.config.resolve_late_arrivals {
            let waiting = self
                .with_state_mut(|s| s.pending.remove(&(root, id)))
                .unwrap_or_default();
            for link in waiting {
                if let Some(relation) = self.relation_of(link.owner, &link.relation) {
                    self.resolve_one(link.owner, &relation);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals shared by handles
    // -----------------------------------------------------------------------

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&GraphState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut GraphState) -> R) -> R {
        f(&mut self.inner.state.borrow_mut())
    }

    pub(crate) fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn model(&self, key: EntityKey) -> Model {
        Model::new(self.clone(), key)
    }

    pub(crate) fn collection_handle(&self, key: CollectionKey) -> Collection {
        Collection::new(self.clone(), key)
    }

    pub(crate) fn cid_attribute(&self, class: ClassId) -> String {
        self.with_state(|s| {
            s.classes
                .cid_attribute(class, &self.inner.config.cid_attribute)
                .to_string()
        })
    }

    pub(crate) fn relation_of(&self, key: EntityKey, name: &str) -> Option<Rc<BoundRelation>> {
        self.with_state(|s| {
            let entity = s.entities.get(&key)?;
            s.classes.relation(entity.class, name)
        })
    }

    /// Call every listener of `emitter` subscribed to the event's topic.
    ///
    /// Callbacks run with no state borrowed, so they may read or mutate the
    /// graph.
    pub(crate) fn emit(&self, emitter: Emitter, event: Event) {
        let callbacks = self.inner.listeners.borrow().matching(emitter, &event.topic());
        for callback in callbacks {
            callback(&event);
        }
    }

    pub(crate) fn listen(
        &self,
        emitter: Emitter,
        topic: &str,
        callback: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .borrow_mut()
            .add(emitter, topic, Rc::new(callback))
    }

    pub(crate) fn unlisten(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id)
    }

    pub(crate) fn drop_listeners(&self, emitter: Emitter) {
        self.inner.listeners.borrow_mut().remove_emitter(emitter);
    }
}

/// Payloads are JSON objects; `null` means "no attributes".
fn into_attributes(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        Value::Null => Attributes::new(),
        other => {
            warn!(kind = crate::parser::kind_of(&other), "ignoring non-object payload");
            Attributes::new()
        }
    }
}
