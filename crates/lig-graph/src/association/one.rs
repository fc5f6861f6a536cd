use std::rc::Rc;

use lig_core::ids::IdKey;
use serde_json::Value;
use tracing::debug;

use crate::class::BoundRelation;
use crate::events::{Emitter, Event};
use crate::graph::Graph;
use crate::state::{EntityKey, Link};

impl Graph {
    /// Re-derive `owner.relation` from its foreign key.
    ///
    /// A key that matches no registered instance resolves to absent and is
    /// parked in the pending index until that id shows up. Any entry parked
    /// under an earlier key is dropped.
    pub(crate) fn resolve_one(&self, owner: EntityKey, relation: &Rc<BoundRelation>) {
        let Some((current, next)) = self.with_state_mut(|s| {
            s.remove_pending(&Link::new(owner, relation.name()));
            let entity = s.entities.get(&owner)?;
            let current = entity.ones.get(relation.name()).copied();
            if entity.destroyed {
                return Some((current, None));
            }
            let Some(id) = entity
                .attrs
                .get(&relation.foreign_key)
                .and_then(IdKey::from_value)
            else {
                return Some((current, None));
            };
            let next = s.lookup_id(relation.target, &id);
            if next.is_none() {
                let root = s.classes.root(relation.target);
                s.add_pending(root, id, Link::new(owner, relation.name()));
            }
            Some((current, next))
        }) else {
            return;
        };
        self.relink(owner, relation, current, next);
    }

    pub(crate) fn relink(
        &self,
        owner: EntityKey,
        relation: &Rc<BoundRelation>,
        current: Option<EntityKey>,
        next: Option<EntityKey>,
    ) {
        if current == next {
            return;
        }
        if let Some(previous) = current {
            self.unlink_one(owner, relation, previous);
        }
        if let Some(target) = next {
            self.link_one(owner, relation, target);
        }
    }

    fn link_one(&self, owner: EntityKey, relation: &Rc<BoundRelation>, target: EntityKey) {
        let inverse = self.with_state_mut(|s| {
            if let Some(entity) = s.entities.get_mut(&owner) {
                entity.ones.insert(relation.name().to_string(), target);
            }
            s.add_referrer(target, Link::new(owner, relation.name()));
            let inverse = relation.inverse()?;
            s.classes.relation(s.entities.get(&target)?.class, inverse)
        });
        debug!(
            owner = owner.0,
            target = target.0,
            relation = relation.name(),
            "linked"
        );

        match &inverse {
            Some(inverse) if inverse.is_many() => {
                if let Some(collection) = self.ensure_many(target, inverse) {
                    self.collection_insert(collection, owner);
                }
            }
            Some(inverse) => self.bind_one(target, inverse, owner),
            None => {}
        }

        self.emit(
            Emitter::Entity(owner),
            Event::Associate {
                relation: relation.name().to_string(),
                peer: self.model(target),
            },
        );
        // A one-to-one inverse announces itself when it links.
        if let Some(name) = relation.inverse()
            && !inverse.as_ref().is_some_and(|r| r.is_one())
        {
            self.emit(
                Emitter::Entity(target),
                Event::Associate {
                    relation: name.to_string(),
                    peer: self.model(owner),
                },
            );
        }
    }

    fn unlink_one(&self, owner: EntityKey, relation: &Rc<BoundRelation>, target: EntityKey) {
        let inverse = self.with_state_mut(|s| {
            if let Some(entity) = s.entities.get_mut(&owner)
                && entity.ones.get(relation.name()) == Some(&target)
            {
                entity.ones.remove(relation.name());
            }
            s.remove_referrer(target, &Link::new(owner, relation.name()));
            let inverse = relation.inverse()?;
            s.classes.relation(s.entities.get(&target)?.class, inverse)
        });
        debug!(
            owner = owner.0,
            target = target.0,
            relation = relation.name(),
            "unlinked"
        );

        match &inverse {
            Some(inverse) if inverse.is_many() => {
                let existing = self.with_state(|s| {
                    s.entities
                        .get(&target)
                        .and_then(|e| e.manys.get(inverse.name()).copied())
                });
                if let Some(collection) = existing {
                    self.collection_discard(collection, owner);
                }
            }
            Some(inverse) => self.release_one(target, inverse, owner),
            None => {}
        }

        self.emit(
            Emitter::Entity(owner),
            Event::Dissociate {
                relation: relation.name().to_string(),
                peer: self.model(target),
            },
        );
        if let Some(name) = relation.inverse()
            && !inverse.as_ref().is_some_and(|r| r.is_one())
        {
            self.emit(
                Emitter::Entity(target),
                Event::Dissociate {
                    relation: name.to_string(),
                    peer: self.model(owner),
                },
            );
        }
    }

    /// Point `entity.relation` at `peer`.
    ///
    /// Writes the foreign key when `peer` has an id it is registered under.
    /// Otherwise the link is held by reference and the key is written once
    /// `peer` is registered under an id.
    pub(crate) fn bind_one(&self, entity: EntityKey, relation: &Rc<BoundRelation>, peer: EntityKey) {
        let id_attribute = &self.config().id_attribute;
        let Some((linked, foreign_key, peer_id, current)) = self.with_state(|s| {
            let state = s.entities.get(&entity)?;
            let current = state.ones.get(relation.name()).copied();
            let foreign_key = state.attrs.get(&relation.foreign_key).cloned();
            let peer_state = s.entities.get(&peer)?;
            let peer_id = peer_state
                .attrs
                .get(id_attribute)
                .filter(|v| {
                    IdKey::from_value(v)
                        .is_some_and(|id| s.lookup_id(peer_state.class, &id) == Some(peer))
                })
                .cloned();
            Some((current == Some(peer), foreign_key, peer_id, current))
        }) else {
            return;
        };
        if linked {
            return;
        }

        match peer_id {
            Some(id) => {
                let matches = foreign_key
                    .as_ref()
                    .and_then(IdKey::from_value)
                    .is_some_and(|fk| IdKey::from_value(&id) == Some(fk));
                if matches {
                    self.resolve_one(entity, relation);
                } else {
                    self.write_attrs(entity, vec![(relation.foreign_key.clone(), Some(id))]);
                }
            }
            None => {
                let current = if foreign_key.is_some() {
                    self.write_attrs(entity, vec![(relation.foreign_key.clone(), None)]);
                    self.with_state(|s| {
                        s.entities
                            .get(&entity)
                            .and_then(|e| e.ones.get(relation.name()).copied())
                    })
                } else {
                    current
                };
                self.relink(entity, relation, current, Some(peer));
            }
        }
    }

    /// Drop `entity.relation` if it currently points at `peer`.
    pub(crate) fn release_one(&self, entity: EntityKey, relation: &Rc<BoundRelation>, peer: EntityKey) {
        let Some((linked, has_key)) = self.with_state(|s| {
            let state = s.entities.get(&entity)?;
            Some((
                state.ones.get(relation.name()) == Some(&peer),
                state.attrs.contains_key(&relation.foreign_key),
            ))
        }) else {
            return;
        };
        if !linked {
            return;
        }
        if has_key {
            self.write_attrs(entity, vec![(relation.foreign_key.clone(), None)]);
        } else {
            self.relink(entity, relation, Some(peer), None);
        }
    }

    /// The entity's id attribute, if it holds a usable id.
    pub(crate) fn id_value(&self, key: EntityKey) -> Option<Value> {
        let id_attribute = &self.config().id_attribute;
        self.with_state(|s| {
            s.entities
                .get(&key)?
                .attrs
                .get(id_attribute)
                .filter(|v| IdKey::from_value(v).is_some())
                .cloned()
        })
    }
}
