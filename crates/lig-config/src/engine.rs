//! Engine configuration: identity attributes and resolution policies.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_id_attribute() -> String {
    "id".to_string()
}

fn default_cid_attribute() -> String {
    "cid".to_string()
}

fn default_cid_prefix() -> String {
    "c".to_string()
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Attribute holding the persistent id.
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,

    /// Attribute echoing the client id. Classes may override it.
    #[serde(default = "default_cid_attribute")]
    pub cid_attribute: String,

    /// Prefix of generated client ids.
    #[serde(default = "default_cid_prefix")]
    pub cid_prefix: String,

    /// Re-resolve dangling foreign keys when their target id shows up later.
    #[serde(default = "default_true")]
    pub resolve_late_arrivals: bool,

    /// Fail parsing on malformed nested association values instead of
    /// keeping them as literal attributes.
    #[serde(default = "default_true")]
    pub strict_nested: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_attribute: default_id_attribute(),
            cid_attribute: default_cid_attribute(),
            cid_prefix: default_cid_prefix(),
            resolve_late_arrivals: true,
            strict_nested: true,
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for empty attribute names, or when
    /// the id and cid attributes collide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("engine.id_attribute", &self.id_attribute),
            ("engine.cid_attribute", &self.cid_attribute),
            ("engine.cid_prefix", &self.cid_prefix),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if self.id_attribute == self.cid_attribute {
            return Err(ConfigError::InvalidValue {
                field: "engine.cid_attribute".to_string(),
                reason: format!("collides with id attribute '{}'", self.id_attribute),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = EngineConfig::default();
        assert_eq!(config.id_attribute, "id");
        assert_eq!(config.cid_attribute, "cid");
        assert_eq!(config.cid_prefix, "c");
        assert!(config.resolve_late_arrivals);
        assert!(config.strict_nested);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn colliding_attributes_are_invalid() {
        let config = EngineConfig {
            cid_attribute: "id".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn empty_prefix_is_invalid() {
        let config = EngineConfig {
            cid_prefix: String::new(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
