//! Observable events and listener bookkeeping.
//!
//! Topics are strings: `change:<key>`, `change`, `associate:<relation>`,
//! `dissociate:<relation>`, `destroy` on models; `add`, `remove`, `reset`
//! on collections; `add` on registries. Subscribing to `all` receives
//! every event of the emitter.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::class::ClassId;
use crate::model::Model;
use crate::state::{CollectionKey, EntityKey};

/// Topic matching every event of an emitter.
pub const ALL: &str = "all";

#[derive(Debug, Clone)]
pub enum Event {
    /// One attribute changed. `None` means absent.
    Change {
        key: String,
        previous: Option<Value>,
        current: Option<Value>,
    },
    /// Emitted once after a batch of `Change` events.
    Changed,
    Associate {
        relation: String,
        peer: Model,
    },
    Dissociate {
        relation: String,
        peer: Model,
    },
    Destroy,
    Add {
        member: Model,
    },
    Remove {
        member: Model,
    },
    Reset,
}

impl Event {
    #[must_use]
    pub fn topic(&self) -> String {
        match self {
            Self::Change { key, .. } => format!("change:{key}"),
            Self::Changed => "change".to_string(),
            Self::Associate { relation, .. } => format!("associate:{relation}"),
            Self::Dissociate { relation, .. } => format!("dissociate:{relation}"),
            Self::Destroy => "destroy".to_string(),
            Self::Add { .. } => "add".to_string(),
            Self::Remove { .. } => "remove".to_string(),
            Self::Reset => "reset".to_string(),
        }
    }
}

/// Handle returned by `on`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Emitter {
    Entity(EntityKey),
    Collection(CollectionKey),
    Registry(ClassId),
}

pub(crate) type Callback = Rc<dyn Fn(&Event)>;

struct Listener {
    id: ListenerId,
    emitter: Emitter,
    topic: String,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<Listener>,
    next: u64,
}

impl Listeners {
    pub(crate) fn add(&mut self, emitter: Emitter, topic: &str, callback: Callback) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.entries.push(Listener {
            id,
            emitter,
            topic: topic.to_string(),
            callback,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|l| l.id != id);
        self.entries.len() != before
    }

    pub(crate) fn remove_emitter(&mut self, emitter: Emitter) {
        self.entries.retain(|l| l.emitter != emitter);
    }

    /// Callbacks subscribed to `topic` on `emitter`, in subscription order.
    pub(crate) fn matching(&self, emitter: Emitter, topic: &str) -> Vec<Callback> {
        self.entries
            .iter()
            .filter(|l| l.emitter == emitter && (l.topic == topic || l.topic == ALL))
            .map(|l| Rc::clone(&l.callback))
            .collect()
    }
}
