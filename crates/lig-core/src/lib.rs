//! # lig-core
//!
//! Core types, id normalization, and error types for Ligature.
//!
//! This crate provides the vocabulary shared across all Ligature crates:
//! - Identity keys that make numeric and string ids compare equal
//! - Client ids assigned to instances before they are persisted
//! - Relation descriptors (one/many, target, inverse, source)
//! - Schema documents declaring classes and their relations
//! - Cross-cutting error types
//!
//! It holds no engine state. The live object graph lives in `lig-graph`.

pub mod errors;
pub mod ids;
pub mod relation;
pub mod schema;

/// Attribute map of a single model instance.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
