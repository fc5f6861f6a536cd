//! Relation descriptors.
//!
//! A descriptor is declarative metadata for one association of a class:
//! its cardinality, the target class, an optional inverse on the target,
//! and an optional raw payload key (`source`) that differs from the name.
//!
//! ```text
//! Membership.user        one  → User   inverse memberships   key user_id
//! User.memberships       many → Membership  inverse user
//! User.contacts          many → User   source users
//! ```

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Cardinality
// ---------------------------------------------------------------------------

/// How many instances an association holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RelationDescriptor
// ---------------------------------------------------------------------------

/// Declarative metadata for one association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelationDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
    /// Name of the target class.
    pub target: String,
    /// Name of the reciprocal association on the target class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
    /// Raw payload key read by the parser instead of `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Foreign key attribute of a one-association. Defaults to `<name>_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl RelationDescriptor {
    #[must_use]
    pub fn one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Cardinality::One, target)
    }

    #[must_use]
    pub fn many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Many, target)
    }

    fn new(name: impl Into<String>, cardinality: Cardinality, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cardinality,
            target: target.into(),
            inverse: None,
            source: None,
            foreign_key: None,
        }
    }

    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    #[must_use]
    pub const fn is_one(&self) -> bool {
        matches!(self.cardinality, Cardinality::One)
    }

    #[must_use]
    pub const fn is_many(&self) -> bool {
        matches!(self.cardinality, Cardinality::Many)
    }

    /// Foreign key attribute name (`<name>_id` unless overridden).
    #[must_use]
    pub fn foreign_key(&self) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", self.name))
    }

    /// Payload key the parser reads for this relation.
    #[must_use]
    pub fn raw_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

// ---------------------------------------------------------------------------
// RelationSet
// ---------------------------------------------------------------------------

/// Ordered, validated list of the relations one class declares.
///
/// Order is declaration order; derived notifications follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationSet {
    class: String,
    relations: Vec<RelationDescriptor>,
}

impl RelationSet {
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            relations: Vec::new(),
        }
    }

    /// Append a descriptor.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyName` for an empty name,
    /// `CoreError::DuplicateRelation` if the name is taken, and
    /// `CoreError::RawKeyConflict` if another relation already reads the
    /// same payload key.
    pub fn push(&mut self, descriptor: RelationDescriptor) -> Result<(), CoreError> {
        if descriptor.name.is_empty() {
            return Err(CoreError::EmptyName { what: "relation" });
        }
        if self.get(&descriptor.name).is_some() {
            return Err(CoreError::DuplicateRelation {
                class: self.class.clone(),
                name: descriptor.name,
            });
        }
        if self
            .relations
            .iter()
            .any(|r| r.raw_key() == descriptor.raw_key())
        {
            return Err(CoreError::RawKeyConflict {
                class: self.class.clone(),
                key: descriptor.raw_key().to_string(),
                name: descriptor.name,
            });
        }
        self.relations.push(descriptor);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationDescriptor> {
        self.relations.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
