//! Fluent relation declarations.
//!
//! ```
//! use lig_graph::{Graph, Many, One};
//!
//! let graph = Graph::new();
//! let user = graph.define("User").unwrap();
//! let membership = graph.define("Membership").unwrap();
//!
//! graph
//!     .has(membership)
//!     .one("user", One::model("User").inverse("memberships"))
//!     .unwrap();
//! graph
//!     .has(user)
//!     .many("memberships", Many::collection("Membership").inverse("user"))
//!     .unwrap();
//! ```

use lig_core::relation::RelationDescriptor;

use crate::class::ClassId;
use crate::error::GraphError;
use crate::graph::Graph;

/// Relation builder for one class, returned by [`Graph::has`].
#[derive(Debug, Clone, Copy)]
pub struct Has<'g> {
    graph: &'g Graph,
    class: ClassId,
}

impl<'g> Has<'g> {
    pub(crate) const fn new(graph: &'g Graph, class: ClassId) -> Self {
        Self { graph, class }
    }

    /// Declare a one-association backed by the `<name>_id` foreign key.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownClass` for an undeclared target and
    /// `GraphError::Core` for a duplicate name or raw key.
    pub fn one(self, name: &str, options: One) -> Result<Self, GraphError> {
        self.relation(options.into_descriptor(name))
    }

    /// Declare a many-association.
    ///
    /// # Errors
    ///
    /// See [`Has::one`].
    pub fn many(self, name: &str, options: Many) -> Result<Self, GraphError> {
        self.relation(options.into_descriptor(name))
    }

    /// Declare a prebuilt descriptor.
    ///
    /// # Errors
    ///
    /// See [`Has::one`].
    pub fn relation(self, descriptor: RelationDescriptor) -> Result<Self, GraphError> {
        self.graph.add_relation(self.class, descriptor)?;
        Ok(self)
    }
}

/// Options of a one-association.
#[derive(Debug, Clone)]
pub struct One {
    target: String,
    inverse: Option<String>,
    foreign_key: Option<String>,
    source: Option<String>,
}

impl One {
    #[must_use]
    pub fn model(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            inverse: None,
            foreign_key: None,
            source: None,
        }
    }

    #[must_use]
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, attribute: impl Into<String>) -> Self {
        self.foreign_key = Some(attribute.into());
        self
    }

    #[must_use]
    pub fn source(mut self, key: impl Into<String>) -> Self {
        self.source = Some(key.into());
        self
    }

    fn into_descriptor(self, name: &str) -> RelationDescriptor {
        let mut descriptor = RelationDescriptor::one(name, self.target);
        descriptor.inverse = self.inverse;
        descriptor.foreign_key = self.foreign_key;
        descriptor.source = self.source;
        descriptor
    }
}

/// Options of a many-association.
#[derive(Debug, Clone)]
pub struct Many {
    target: String,
    inverse: Option<String>,
    source: Option<String>,
}

impl Many {
    #[must_use]
    pub fn collection(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            inverse: None,
            source: None,
        }
    }

    /// One-association on the target pointing back at the owner.
    #[must_use]
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse = Some(name.into());
        self
    }

    /// Payload key the parser reads instead of the association name.
    #[must_use]
    pub fn source(mut self, key: impl Into<String>) -> Self {
        self.source = Some(key.into());
        self
    }

    fn into_descriptor(self, name: &str) -> RelationDescriptor {
        let mut descriptor = RelationDescriptor::many(name, self.target);
        descriptor.inverse = self.inverse;
        descriptor.source = self.source;
        descriptor
    }
}
