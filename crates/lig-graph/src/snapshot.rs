//! Serializable dump of a graph's live instances.

use std::collections::BTreeMap;

use lig_core::Attributes;
use serde::Serialize;

use crate::graph::Graph;
use crate::state::EntityKey;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub classes: Vec<ClassSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSnapshot {
    pub name: String,
    pub instances: Vec<InstanceSnapshot>,
}

/// One instance. Peers are referenced by client id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub cid: String,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub one: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub many: BTreeMap<String, Vec<String>>,
}

impl GraphSnapshot {
    /// Total number of instances across classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.iter().map(|c| c.instances.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassSnapshot> {
        self.classes.iter().find(|c| c.name == name)
    }
}

impl Graph {
    /// Registered, live instances grouped by class in declaration order,
    /// each class in registration order.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let cid_attribute = &self.config().cid_attribute;
        self.with_state(|s| {
            let cid_of = |key: &EntityKey| s.entities.get(key).map(|e| e.cid.as_str().to_string());
            let classes = s
                .classes
                .ids()
                .map(|class| {
                    let root = s.classes.root(class);
                    let own_cid_attribute = s.classes.cid_attribute(class, cid_attribute);
                    let keys = s.registries.get(&root).map(|m| m.keys()).unwrap_or_default();
                    let instances = keys
                        .iter()
                        .filter_map(|key| {
                            let entity = s.entities.get(key)?;
                            if entity.class != class || entity.destroyed {
                                return None;
                            }
                            let mut attributes = entity.attrs.clone();
                            attributes.remove(own_cid_attribute);
                            let one = entity
                                .ones
                                .iter()
                                .filter_map(|(name, peer)| Some((name.clone(), cid_of(peer)?)))
                                .collect();
                            let many = entity
                                .manys
                                .iter()
                                .filter_map(|(name, collection)| {
                                    let members = &s.collections.get(collection)?.members;
                                    Some((name.clone(), members.iter().filter_map(cid_of).collect()))
                                })
                                .collect();
                            Some(InstanceSnapshot {
                                cid: entity.cid.as_str().to_string(),
                                attributes,
                                one,
                                many,
                            })
                        })
                        .collect();
                    ClassSnapshot {
                        name: s.classes.name(class).to_string(),
                        instances,
                    }
                })
                .collect();
            GraphSnapshot { classes }
        })
    }
}
