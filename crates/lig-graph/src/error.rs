//! Engine error types for lig-graph.

use lig_core::errors::CoreError;
use thiserror::Error;

/// Errors from class declaration and payload parsing.
///
/// Association state never errors at runtime: a foreign key that matches
/// nothing resolves to an absent association.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A class name or id does not belong to this graph.
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// A class name was declared twice.
    #[error("Duplicate class: {0}")]
    DuplicateClass(String),

    /// An association key held a value the parser cannot materialize.
    #[error("Malformed nested value for {class}.{key}: expected {expected}, found {found}")]
    MalformedNested {
        class: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An id or cid in a payload belongs to an instance outside the
    /// requested class.
    #[error("{identity} is held by a {found}, which is not a {requested}")]
    ClassMismatch {
        requested: String,
        found: String,
        identity: String,
    },

    /// Relation declaration or schema document error.
    #[error(transparent)]
    Core(#[from] CoreError),
}
