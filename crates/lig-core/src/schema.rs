//! Schema documents: classes, hierarchy, and relations declared as data.
//!
//! A document is usually written in TOML:
//!
//! ```toml
//! [[class]]
//! name = "User"
//!
//! [[class.relation]]
//! name = "memberships"
//! cardinality = "many"
//! target = "Membership"
//! inverse = "user"
//! ```
//!
//! Documents are checked against their schemars-generated JSON Schema
//! before they are decoded, so shape errors come back as readable messages
//! instead of serde's first-failure report.

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;
use crate::relation::RelationDescriptor;

/// A set of class declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaDoc {
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassSchema>,
}

/// One class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassSchema {
    pub name: String,
    /// Parent class. Subclasses share the parent's registry unless
    /// `own_registry` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub own_registry: bool,
    /// Attribute echoing the client id. Inherited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid_attribute: Option<String>,
    #[serde(default, rename = "relation")]
    pub relations: Vec<RelationDescriptor>,
}

impl SchemaDoc {
    /// JSON Schema describing schema documents.
    ///
    /// # Panics
    ///
    /// Panics if the schemars output cannot be converted to a JSON value,
    /// which does not happen for derived schemas.
    #[must_use]
    pub fn json_schema() -> Value {
        serde_json::to_value(schema_for!(Self)).expect("derived schema serializes")
    }

    /// Validate a raw JSON value against [`SchemaDoc::json_schema`].
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidSchema` listing every validation failure.
    pub fn validate_value(instance: &Value) -> Result<(), CoreError> {
        let schema = Self::json_schema();
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| CoreError::Decode(format!("schema compile: {e}")))?;
        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidSchema { errors })
        }
    }

    /// Validate and decode a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidSchema` or `CoreError::Decode`.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        Self::validate_value(&value)?;
        serde_json::from_value(value).map_err(|e| CoreError::Decode(e.to_string()))
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Decode` for TOML syntax errors and
    /// `CoreError::InvalidSchema` for shape errors.
    pub fn from_toml_str(source: &str) -> Result<Self, CoreError> {
        let value: Value = toml::from_str(source).map_err(|e| CoreError::Decode(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Decode` for JSON syntax errors and
    /// `CoreError::InvalidSchema` for shape errors.
    pub fn from_json_str(source: &str) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_str(source).map_err(|e| CoreError::Decode(e.to_string()))?;
        Self::from_value(value)
    }

    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassSchema> {
        self.classes.iter().find(|c| c.name == name)
    }
}
