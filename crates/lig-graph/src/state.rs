//! Engine state owned by a [`Graph`](crate::Graph).
//!
//! Everything here is plain data. Mutation that has observable effects
//! (events, derived association updates) goes through the `Graph` methods
//! in `graph.rs` and `association/`, which only hold a borrow of this state
//! for the duration of one bookkeeping step.

use std::collections::HashMap;

use lig_core::Attributes;
use lig_core::ids::{Cid, IdKey};

use crate::class::{ClassId, ClassTable};
use crate::registry::IdentityMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct EntityKey(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CollectionKey(pub(crate) u64);

/// `owner.relation`, addressed from the other end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) owner: EntityKey,
    pub(crate) relation: String,
}

impl Link {
    pub(crate) fn new(owner: EntityKey, relation: &str) -> Self {
        Self {
            owner,
            relation: relation.to_string(),
        }
    }
}

pub(crate) struct EntityState {
    pub(crate) class: ClassId,
    pub(crate) cid: Cid,
    pub(crate) attrs: Attributes,
    /// Resolved one-associations by relation name.
    pub(crate) ones: HashMap<String, EntityKey>,
    /// Materialized many-associations by relation name.
    pub(crate) manys: HashMap<String, CollectionKey>,
    /// Collections currently holding this entity.
    pub(crate) member_of: Vec<CollectionKey>,
    pub(crate) destroyed: bool,
}

pub(crate) struct CollectionState {
    pub(crate) class: ClassId,
    /// Set for collections backing a many-association.
    pub(crate) owner: Option<Link>,
    pub(crate) members: Vec<EntityKey>,
}

#[derive(Default)]
pub(crate) struct GraphState {
    pub(crate) classes: ClassTable,
    /// Identity maps keyed by registry root class.
    pub(crate) registries: HashMap<ClassId, IdentityMap>,
    /// Every instance ever created. Destroyed ones stay, flagged.
    pub(crate) entities: HashMap<EntityKey, EntityState>,
    pub(crate) collections: HashMap<CollectionKey, CollectionState>,
    /// Reverse index of one-associations: target -> owners pointing at it.
    pub(crate) referrers: HashMap<EntityKey, Vec<Link>>,
    /// Foreign keys waiting for their target id to be registered.
    pub(crate) pending: HashMap<(ClassId, IdKey), Vec<Link>>,
    next_entity: u64,
    next_collection: u64,
}

impl GraphState {
    pub(crate) fn alloc_entity(&mut self, class: ClassId, cid: Cid, attrs: Attributes) -> EntityKey {
        self.next_entity += 1;
        let key = EntityKey(self.next_entity);
        self.entities.insert(
            key,
            EntityState {
                class,
                cid,
                attrs,
                ones: HashMap::new(),
                manys: HashMap::new(),
                member_of: Vec::new(),
                destroyed: false,
            },
        );
        key
    }

    pub(crate) fn alloc_collection(&mut self, class: ClassId, owner: Option<Link>) -> CollectionKey {
        self.next_collection += 1;
        let key = CollectionKey(self.next_collection);
        self.collections.insert(
            key,
            CollectionState {
                class,
                owner,
                members: Vec::new(),
            },
        );
        key
    }

    pub(crate) fn registry_mut(&mut self, root: ClassId) -> &mut IdentityMap {
        self.registries.entry(root).or_default()
    }

    /// Live instance of `class` (or a subclass) registered under `id`.
    pub(crate) fn lookup_id(&self, class: ClassId, id: &IdKey) -> Option<EntityKey> {
        self.id_holder(class, id).filter(|key| self.is_instance_of(*key, class))
    }

    pub(crate) fn lookup_cid(&self, class: ClassId, cid: &Cid) -> Option<EntityKey> {
        self.cid_holder(class, cid).filter(|key| self.is_instance_of(*key, class))
    }

    /// Whatever holds `id` in the registry serving `class`, of any class.
    pub(crate) fn id_holder(&self, class: ClassId, id: &IdKey) -> Option<EntityKey> {
        let root = self.classes.root(class);
        self.registries.get(&root)?.get_by_id(id)
    }

    pub(crate) fn cid_holder(&self, class: ClassId, cid: &Cid) -> Option<EntityKey> {
        let root = self.classes.root(class);
        self.registries.get(&root)?.get_by_cid(cid)
    }

    pub(crate) fn is_instance_of(&self, key: EntityKey, class: ClassId) -> bool {
        self.entities
            .get(&key)
            .is_some_and(|e| self.classes.is_a(e.class, class))
    }

    /// `member` may join `collection`: it is live and of the collection's class.
    pub(crate) fn accepts(&self, collection: CollectionKey, member: EntityKey) -> bool {
        let Some(state) = self.collections.get(&collection) else {
            return false;
        };
        self.entities
            .get(&member)
            .is_some_and(|e| !e.destroyed && self.classes.is_a(e.class, state.class))
    }

    pub(crate) fn add_referrer(&mut self, target: EntityKey, link: Link) {
        let links = self.referrers.entry(target).or_default();
        if !links.contains(&link) {
            links.push(link);
        }
    }

    pub(crate) fn remove_referrer(&mut self, target: EntityKey, link: &Link) {
        if let Some(links) = self.referrers.get_mut(&target) {
            links.retain(|l| l != link);
            if links.is_empty() {
                self.referrers.remove(&target);
            }
        }
    }

    pub(crate) fn add_pending(&mut self, root: ClassId, id: IdKey, link: Link) {
        let links = self.pending.entry((root, id)).or_default();
        if !links.contains(&link) {
            links.push(link);
        }
    }

    /// Forget every pending entry held for `link`.
    pub(crate) fn remove_pending(&mut self, link: &Link) {
        self.pending.retain(|_, links| {
            links.retain(|l| l != link);
            !links.is_empty()
        });
    }

    /// Forget every pending entry owned by `owner`.
    pub(crate) fn remove_pending_owner(&mut self, owner: EntityKey) {
        self.pending.retain(|_, links| {
            links.retain(|l| l.owner != owner);
            !links.is_empty()
        });
    }

    pub(crate) fn insert_member(&mut self, collection: CollectionKey, member: EntityKey) -> bool {
        if !self.accepts(collection, member) {
            return false;
        }
        let Some(state) = self.collections.get_mut(&collection) else {
            return false;
        };
        if state.members.contains(&member) {
            return false;
        }
        state.members.push(member);
        if let Some(entity) = self.entities.get_mut(&member) {
            entity.member_of.push(collection);
        }
        true
    }

    pub(crate) fn remove_member(&mut self, collection: CollectionKey, member: EntityKey) -> bool {
        let Some(state) = self.collections.get_mut(&collection) else {
            return false;
        };
        let Some(index) = state.members.iter().position(|m| *m == member) else {
            return false;
        };
        state.members.remove(index);
        if let Some(entity) = self.entities.get_mut(&member) {
            entity.member_of.retain(|c| *c != collection);
        }
        true
    }

    /// Install `members` as the exact contents of `collection`. Members it
    /// does not accept are left out.
    ///
    /// Returns `(removed, added)` relative to the previous contents.
    pub(crate) fn replace_members(
        &mut self,
        collection: CollectionKey,
        members: Vec<EntityKey>,
    ) -> (Vec<EntityKey>, Vec<EntityKey>) {
        let mut next: Vec<EntityKey> = Vec::with_capacity(members.len());
        for member in members {
            if self.accepts(collection, member) && !next.contains(&member) {
                next.push(member);
            }
        }
        let Some(state) = self.collections.get_mut(&collection) else {
            return (Vec::new(), Vec::new());
        };
        let previous = std::mem::replace(&mut state.members, next.clone());

        let removed: Vec<EntityKey> = previous
            .iter()
            .copied()
            .filter(|m| !next.contains(m))
            .collect();
        let added: Vec<EntityKey> = next
            .iter()
            .copied()
            .filter(|m| !previous.contains(m))
            .collect();

        for member in &removed {
            if let Some(entity) = self.entities.get_mut(member) {
                entity.member_of.retain(|c| *c != collection);
            }
        }
        for member in &added {
            if let Some(entity) = self.entities.get_mut(member) {
                entity.member_of.push(collection);
            }
        }
        (removed, added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassSpec;

    fn state() -> (GraphState, ClassId) {
        let mut state = GraphState::default();
        let class = state.classes.declare(ClassSpec::new("User")).unwrap();
        (state, class)
    }

    #[test]
    fn replace_members_reports_the_difference() {
        let (mut state, class) = state();
        let a = state.alloc_entity(class, Cid::generate("t"), Attributes::new());
        let b = state.alloc_entity(class, Cid::generate("t"), Attributes::new());
        let c = state.alloc_entity(class, Cid::generate("t"), Attributes::new());
        let coll = state.alloc_collection(class, None);

        assert!(state.insert_member(coll, a));
        assert!(state.insert_member(coll, b));
        assert!(!state.insert_member(coll, b));

        let (removed, added) = state.replace_members(coll, vec![c, b, c]);
        assert_eq!(removed, vec![a]);
        assert_eq!(added, vec![c]);
        assert_eq!(state.collections[&coll].members, vec![c, b]);
        assert!(state.entities[&a].member_of.is_empty());
        assert_eq!(state.entities[&c].member_of, vec![coll]);
    }

    #[test]
    fn referrers_are_deduplicated_and_pruned() {
        let (mut state, class) = state();
        let owner = state.alloc_entity(class, Cid::generate("t"), Attributes::new());
        let target = state.alloc_entity(class, Cid::generate("t"), Attributes::new());
        let link = Link::new(owner, "friend");

        state.add_referrer(target, link.clone());
        state.add_referrer(target, link.clone());
        assert_eq!(state.referrers[&target].len(), 1);

        state.remove_referrer(target, &link);
        assert!(!state.referrers.contains_key(&target));
    }

    #[test]
    fn collections_only_accept_live_instances_of_their_class() {
        let (mut state, user) = state();
        let group = state.classes.declare(ClassSpec::new("Group")).unwrap();
        let admin = state
            .classes
            .declare(ClassSpec::new("Admin").extends(user))
            .unwrap();
        let coll = state.alloc_collection(user, None);
        let plain = state.alloc_entity(user, Cid::generate("t"), Attributes::new());
        let sub = state.alloc_entity(admin, Cid::generate("t"), Attributes::new());
        let other = state.alloc_entity(group, Cid::generate("t"), Attributes::new());
        let gone = state.alloc_entity(user, Cid::generate("t"), Attributes::new());
        state.entities.get_mut(&gone).unwrap().destroyed = true;

        assert!(state.insert_member(coll, plain));
        assert!(state.insert_member(coll, sub));
        assert!(!state.insert_member(coll, other));
        assert!(!state.insert_member(coll, gone));

        let (_, added) = state.replace_members(coll, vec![other, gone, plain]);
        assert!(added.is_empty());
        assert_eq!(state.collections[&coll].members, vec![plain]);
    }

    #[test]
    fn pending_entries_are_pruned_per_link_and_owner() {
        let (mut state, class) = state();
        let owner = state.alloc_entity(class, Cid::generate("t"), Attributes::new());
        let id = |v: u64| IdKey::from_value(&serde_json::json!(v)).unwrap();
        state.add_pending(class, id(1), Link::new(owner, "friend"));
        state.add_pending(class, id(2), Link::new(owner, "rival"));

        state.remove_pending(&Link::new(owner, "friend"));
        assert!(!state.pending.contains_key(&(class, id(1))));
        assert!(state.pending.contains_key(&(class, id(2))));

        state.remove_pending_owner(owner);
        assert!(state.pending.is_empty());
    }
}
