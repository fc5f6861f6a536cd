//! Identity keys and client ids.
//!
//! Ids arrive from payloads as JSON numbers or strings. `IdKey` folds both
//! into one comparison domain so `3`, `3.0` and `"3"` address the same
//! instance. `Cid` is the fallback identity handed out at construction.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Normalized identity of an instance within one registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct IdKey(String);

impl IdKey {
    /// Normalize an attribute value into an id key.
    ///
    /// Returns `None` for values that cannot identify anything: null,
    /// booleans, arrays, objects, and the empty string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(normalize_number(n))),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Integral floats collapse onto their integer spelling.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn normalize_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

static NEXT_CID: AtomicU64 = AtomicU64::new(1);

/// Process-unique client id, e.g. `c42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    /// Allocate the next client id with the given prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let n = NEXT_CID.fetch_add(1, Ordering::Relaxed);
        Self(format!("{prefix}{n}"))
    }

    /// Read a client id out of an attribute value. Only strings qualify.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
