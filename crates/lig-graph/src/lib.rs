//! # lig-graph
//!
//! Live object graph for Ligature: identity maps, associations kept in
//! agreement on both sides, and a parser that turns nested payloads into
//! linked, deduplicated instances.
//!
//! - **Registry**: one canonical instance per id within a class hierarchy.
//!   Subclasses share their ancestor's registry unless declared otherwise.
//! - **Associations**: one-associations follow their `<name>_id` foreign
//!   key; many-associations are collections whose membership mirrors the
//!   children's inverse foreign keys. Destroying an instance cuts every
//!   association pointing at it.
//! - **Graph parser**: nested objects and arrays under association keys
//!   become instances, foreign keys, and collection contents.
//!
//! Everything runs synchronously on one thread. Events (`change:<key>`,
//! `associate:<name>`, `add`, ...) fire before the triggering call returns.
//!
//! ```
//! use lig_graph::{Graph, Many, One};
//! use serde_json::json;
//!
//! let graph = Graph::new();
//! let user = graph.define("User").unwrap();
//! let membership = graph.define("Membership").unwrap();
//! graph.has(membership).one("user", One::model("User").inverse("memberships")).unwrap();
//! graph.has(user).many("memberships", Many::collection("Membership").inverse("user")).unwrap();
//!
//! let alice = graph
//!     .create_parsed(user, json!({"id": 1, "memberships": [{"id": 10}]}))
//!     .unwrap();
//! let first = alice.many("memberships").unwrap().at(0).unwrap();
//! assert_eq!(first.get("user_id"), Some(json!(1)));
//! assert_eq!(first.one("user"), Some(alice));
//! ```

mod association;
pub mod builder;
pub mod class;
pub mod collection;
pub mod error;
pub mod events;
pub mod graph;
pub mod model;
mod parser;
pub mod registry;
pub mod snapshot;
mod state;

pub use builder::{Has, Many, One};
pub use class::{ClassId, ClassSpec};
pub use collection::Collection;
pub use error::GraphError;
pub use events::{Event, ListenerId};
pub use graph::{CreateOptions, Graph};
pub use model::Model;
pub use registry::Registry;
pub use snapshot::{ClassSnapshot, GraphSnapshot, InstanceSnapshot};
