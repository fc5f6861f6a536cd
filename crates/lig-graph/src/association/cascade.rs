use lig_core::ids::IdKey;
use tracing::debug;

use crate::events::{Emitter, Event};
use crate::graph::Graph;
use crate::state::EntityKey;

impl Graph {
    /// Destroy `key`: unregister it, announce it, and cut every association.
    ///
    /// Instances pointing at it get their foreign key unset first, which
    /// also clears the key of a one-to-one partner pointing back. Whatever
    /// one-associations it still holds afterwards are dropped without
    /// touching its foreign keys.
    pub(crate) fn destroy_entity(&self, key: EntityKey) {
        let id_attribute = &self.config().id_attribute;
        let Some(class) = self.with_state_mut(|s| {
            let entity = s.entities.get_mut(&key)?;
            if entity.destroyed {
                return None;
            }
            entity.destroyed = true;
            let class = entity.class;
            let cid = entity.cid.clone();
            let id = entity
                .attrs
                .get(id_attribute)
                .and_then(IdKey::from_value);
            let root = s.classes.root(class);
            s.registry_mut(root).remove(key, &cid, id.as_ref());
            s.remove_pending_owner(key);
            Some(class)
        }) else {
            return;
        };
        debug!(instance = key.0, class = class.0, "destroying");

        self.emit(Emitter::Entity(key), Event::Destroy);

        let referrers = self.with_state(|s| s.referrers.get(&key).cloned().unwrap_or_default());
        for link in referrers {
            if let Some(relation) = self.relation_of(link.owner, &link.relation) {
                self.release_one(link.owner, &relation, key);
            }
        }

        let owned = self.with_state(|s| {
            let Some(entity) = s.entities.get(&key) else {
                return Vec::new();
            };
            s.classes
                .relations(class)
                .into_iter()
                .filter_map(|r| entity.ones.get(r.name()).map(|t| (r.clone(), *t)))
                .collect::<Vec<_>>()
        });
        for (relation, target) in owned {
            self.relink(key, &relation, Some(target), None);
        }

        let memberships = self.with_state(|s| {
            s.entities
                .get(&key)
                .map(|e| e.member_of.clone())
                .unwrap_or_default()
        });
        for collection in memberships {
            self.collection_discard(collection, key);
        }

        self.drop_listeners(Emitter::Entity(key));
    }
}
