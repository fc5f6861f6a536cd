use std::rc::Rc;

use crate::class::BoundRelation;
use crate::events::{Emitter, Event};
use crate::graph::Graph;
use crate::state::{CollectionKey, EntityKey, Link};

impl Graph {
    /// Collection backing `owner.relation`, created on first use.
    ///
    /// The same collection is returned for the lifetime of the owner.
    pub(crate) fn ensure_many(
        &self,
        owner: EntityKey,
        relation: &Rc<BoundRelation>,
    ) -> Option<CollectionKey> {
        self.with_state_mut(|s| {
            let existing = s.entities.get(&owner)?.manys.get(relation.name()).copied();
            if existing.is_some() {
                return existing;
            }
            let collection =
                s.alloc_collection(relation.target, Some(Link::new(owner, relation.name())));
            s.entities
                .get_mut(&owner)?
                .manys
                .insert(relation.name().to_string(), collection);
            Some(collection)
        })
    }

    /// Append `member` and point its inverse foreign key at the owner.
    pub(crate) fn collection_insert(&self, collection: CollectionKey, member: EntityKey) -> bool {
        if !self.with_state_mut(|s| s.insert_member(collection, member)) {
            return false;
        }
        self.emit(
            Emitter::Collection(collection),
            Event::Add {
                member: self.model(member),
            },
        );
        self.attach_member(collection, member);
        true
    }

    /// Remove `member` and clear its inverse foreign key.
    pub(crate) fn collection_discard(&self, collection: CollectionKey, member: EntityKey) -> bool {
        if !self.with_state_mut(|s| s.remove_member(collection, member)) {
            return false;
        }
        self.emit(
            Emitter::Collection(collection),
            Event::Remove {
                member: self.model(member),
            },
        );
        self.detach_member(collection, member);
        true
    }

    /// Replace the contents of `collection` with `members`, in order.
    ///
    /// Evicted members are released from the owner before new ones are
    /// bound to it. A single `reset` event follows.
    pub(crate) fn collection_reset(&self, collection: CollectionKey, members: Vec<EntityKey>) {
        let (removed, added) = self.with_state_mut(|s| s.replace_members(collection, members));
        for member in removed {
            self.detach_member(collection, member);
        }
        for member in added {
            self.attach_member(collection, member);
        }
        self.emit(Emitter::Collection(collection), Event::Reset);
    }

    fn attach_member(&self, collection: CollectionKey, member: EntityKey) {
        if let Some((owner, inverse)) = self.owner_inverse(collection, member) {
            self.bind_one(member, &inverse, owner);
        }
    }

    fn detach_member(&self, collection: CollectionKey, member: EntityKey) {
        if let Some((owner, inverse)) = self.owner_inverse(collection, member) {
            self.release_one(member, &inverse, owner);
        }
    }

    /// Owner of `collection` and the member-side one-association pointing
    /// back at it.
    fn owner_inverse(
        &self,
        collection: CollectionKey,
        member: EntityKey,
    ) -> Option<(EntityKey, Rc<BoundRelation>)> {
        let link = self.with_state(|s| s.collections.get(&collection)?.owner.clone())?;
        let relation = self.relation_of(link.owner, &link.relation)?;
        let inverse = self
            .relation_of(member, relation.inverse()?)
            .filter(|r| r.is_one())?;
        Some((link.owner, inverse))
    }
}
