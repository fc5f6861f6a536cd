//! Cross-cutting error types for Ligature.
//!
//! Engine errors (`GraphError`) live in `lig-graph` and wrap these via `#[from]`.

use thiserror::Error;

/// Errors raised while declaring relations or loading schema documents.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A relation name was declared twice on the same class.
    #[error("Duplicate relation: {class}.{name}")]
    DuplicateRelation { class: String, name: String },

    /// Two relations of one class read the same raw payload key.
    #[error("Raw key '{key}' of {class}.{name} is already used by another relation")]
    RawKeyConflict {
        class: String,
        name: String,
        key: String,
    },

    /// A relation or class name was empty.
    #[error("Empty {what} name")]
    EmptyName { what: &'static str },

    /// A schema document did not pass JSON Schema validation.
    #[error("Invalid schema document: {errors:?}")]
    InvalidSchema { errors: Vec<String> },

    /// A schema document could not be decoded.
    #[error("Schema decode error: {0}")]
    Decode(String),
}
