//! Graph parser: nested payloads into linked instances.
//!
//! Under a one-association key an object becomes (or updates) an instance
//! of the target class and is replaced by its foreign key. Under a
//! many-association key an array replaces the owner's collection; object
//! elements are nested instances, scalar elements are ids. Scalars and
//! `null` under a one key, and `null` under a many key, stay literal
//! attributes. Anything else is malformed.
//!
//! Payloads are validated before anything is applied, so a strict parse
//! that fails leaves the graph untouched.

use std::rc::Rc;

use lig_core::Attributes;
use serde_json::Value;
use tracing::warn;

use crate::class::{BoundRelation, ClassId};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::state::EntityKey;

const ONE_EXPECTED: &str = "object, id, or null";
const MANY_EXPECTED: &str = "array or null";
const ELEMENT_EXPECTED: &str = "object or id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Nested,
    Literal,
    Malformed,
}

/// JSON kind name used in diagnostics.
pub(crate) const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn classify(relation: &BoundRelation, value: &Value) -> Shape {
    match (relation.is_one(), value) {
        (true, Value::Object(_)) | (false, Value::Array(_)) => Shape::Nested,
        (true, Value::String(_) | Value::Number(_) | Value::Null) | (false, Value::Null) => {
            Shape::Literal
        }
        _ => Shape::Malformed,
    }
}

const fn is_element(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::String(_) | Value::Number(_))
}

const fn expected(relation: &BoundRelation) -> &'static str {
    if relation.is_one() {
        ONE_EXPECTED
    } else {
        MANY_EXPECTED
    }
}

impl Graph {
    /// Reject payloads the parser cannot materialize, recursively.
    ///
    /// Nested objects and id elements must not name an instance outside the
    /// target class. A no-op unless strict nested parsing is configured.
    pub(crate) fn validate_payload(&self, class: ClassId, attrs: &Attributes) -> Result<(), GraphError> {
        if !self.config().strict_nested {
            return Ok(());
        }
        let (class_name, relations) = self.with_state(|s| {
            (s.classes.name(class).to_string(), s.classes.relations(class))
        });

        for relation in &relations {
            let Some(value) = attrs.get(relation.raw_key()) else {
                continue;
            };
            let malformed = |found: &Value| GraphError::MalformedNested {
                class: class_name.clone(),
                key: relation.raw_key().to_string(),
                expected: expected(relation),
                found: kind_of(found),
            };
            match (classify(relation, value), value) {
                (Shape::Literal, _) => {}
                (Shape::Malformed, _) => return Err(malformed(value)),
                (Shape::Nested, Value::Object(nested)) => {
                    self.identify(relation.target, nested)?;
                    self.validate_payload(relation.target, nested)?;
                }
                (Shape::Nested, Value::Array(items)) => {
                    for item in items {
                        match item {
                            Value::Object(nested) => {
                                self.identify(relation.target, nested)?;
                                self.validate_payload(relation.target, nested)?;
                            }
                            other if is_element(other) => {
                                self.identify(relation.target, &self.id_stub(other.clone()))?;
                            }
                            other => {
                                return Err(GraphError::MalformedNested {
                                    class: class_name.clone(),
                                    key: relation.raw_key().to_string(),
                                    expected: ELEMENT_EXPECTED,
                                    found: kind_of(other),
                                });
                            }
                        }
                    }
                }
                (Shape::Nested, _) => {}
            }
        }
        Ok(())
    }

    /// `{id_attribute: id}`, the payload an id element stands for.
    fn id_stub(&self, id: Value) -> Attributes {
        let mut stub = Attributes::new();
        stub.insert(self.config().id_attribute.clone(), id);
        stub
    }

    /// Apply a parsed payload to `key`.
    ///
    /// Nested one values are materialized first and folded into foreign
    /// keys, then the remaining attributes are written in one batch, then
    /// many-associations are replaced. Association keys absent from the
    /// payload are left alone.
    pub(crate) fn merge_parsed(&self, key: EntityKey, mut attrs: Attributes) {
        let Some((class_name, relations)) = self.with_state(|s| {
            let class = s.entities.get(&key)?.class;
            Some((s.classes.name(class).to_string(), s.classes.relations(class)))
        }) else {
            return;
        };

        let mut unsets: Vec<String> = Vec::new();
        let mut by_reference: Vec<(Rc<BoundRelation>, EntityKey)> = Vec::new();
        let mut replacements: Vec<(Rc<BoundRelation>, Vec<EntityKey>)> = Vec::new();

        for relation in relations {
            let raw_key = relation.raw_key().to_string();
            let Some(value) = attrs.get(&raw_key) else {
                continue;
            };
            match classify(&relation, value) {
                Shape::Nested => {}
                Shape::Literal => continue,
                Shape::Malformed => {
                    warn!(
                        class = %class_name,
                        key = %raw_key,
                        found = kind_of(value),
                        "keeping malformed association value as a literal attribute"
                    );
                    continue;
                }
            }

            match attrs.remove(&raw_key) {
                Some(Value::Object(nested)) => {
                    let child = match self.create_entity(relation.target, nested, true) {
                        Ok(child) => child,
                        Err(err) => {
                            warn!(class = %class_name, key = %raw_key, %err, "skipping nested value");
                            continue;
                        }
                    };
                    if let Some(id) = self.id_value(child) {
                        attrs.insert(relation.foreign_key.clone(), id);
                    } else {
                        attrs.remove(&relation.foreign_key);
                        unsets.push(relation.foreign_key.clone());
                        by_reference.push((relation, child));
                    }
                }
                Some(Value::Array(items)) => {
                    let mut members = Vec::with_capacity(items.len());
                    for item in items {
                        let nested = match item {
                            Value::Object(nested) => nested,
                            scalar @ (Value::String(_) | Value::Number(_)) => self.id_stub(scalar),
                            other => {
                                warn!(
                                    class = %class_name,
                                    key = %raw_key,
                                    found = kind_of(&other),
                                    "skipping malformed collection element"
                                );
                                continue;
                            }
                        };
                        match self.create_entity(relation.target, nested, true) {
                            Ok(member) => members.push(member),
                            Err(err) => {
                                warn!(class = %class_name, key = %raw_key, %err, "skipping collection element");
                            }
                        }
                    }
                    replacements.push((relation, members));
                }
                _ => {}
            }
        }

        let mut changes: Vec<(String, Option<Value>)> =
            attrs.into_iter().map(|(k, v)| (k, Some(v))).collect();
        changes.extend(unsets.into_iter().map(|k| (k, None)));
        self.write_attrs(key, changes);

        for (relation, child) in by_reference {
            self.bind_one(key, &relation, child);
        }
        for (relation, members) in replacements {
            if let Some(collection) = self.ensure_many(key, &relation) {
                self.collection_reset(collection, members);
            }
        }
    }
}
