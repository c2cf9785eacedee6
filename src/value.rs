//! Value and TTL types
//!
//! Defines the closed set of value kinds a cache can hold, and the
//! three-state TTL passed to every write operation.

use std::time::Duration;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

// == Cache Value ==
/// A value stored in the cache.
///
/// The set of kinds is closed on purpose: every kind survives a round-trip
/// through the string-only hash-field representation (see [`crate::codec`]),
/// and both backends agree on the encoding of each kind. Structured data
/// goes through the `Json` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl CacheValue {
    /// Returns the boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CacheValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CacheValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CacheValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte payload, if this is `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CacheValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    // == JSON Bridging ==
    /// Converts the value into its JSON representation.
    ///
    /// Used by the networked backend for primary-store values. `Bytes`
    /// becomes a JSON array of numbers; there is no byte-string type in
    /// JSON, so bytes do not round-trip through this path (they do through
    /// the tagged hash-field codec).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CacheValue::Bool(b) => serde_json::Value::Bool(*b),
            CacheValue::Int(i) => serde_json::Value::from(*i),
            CacheValue::Float(f) => serde_json::Value::from(*f),
            CacheValue::Str(s) => serde_json::Value::String(s.clone()),
            CacheValue::Bytes(b) => serde_json::Value::from(b.clone()),
            CacheValue::Json(v) => v.clone(),
        }
    }

    /// Reconstructs a value from its JSON representation.
    ///
    /// Scalars map back onto their native kinds; arrays and objects stay
    /// `Json`.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => CacheValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CacheValue::Int(i)
                } else {
                    CacheValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => CacheValue::Str(s),
            other => CacheValue::Json(other),
        }
    }
}

impl Serialize for CacheValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CacheValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(CacheValue::from_json(serde_json::Value::deserialize(
            deserializer,
        )?))
    }
}

// == Conversions ==
impl From<bool> for CacheValue {
    fn from(b: bool) -> Self {
        CacheValue::Bool(b)
    }
}

impl From<i32> for CacheValue {
    fn from(i: i32) -> Self {
        CacheValue::Int(i64::from(i))
    }
}

impl From<i64> for CacheValue {
    fn from(i: i64) -> Self {
        CacheValue::Int(i)
    }
}

impl From<u32> for CacheValue {
    fn from(i: u32) -> Self {
        CacheValue::Int(i64::from(i))
    }
}

impl From<f64> for CacheValue {
    fn from(f: f64) -> Self {
        CacheValue::Float(f)
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        CacheValue::Str(s.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        CacheValue::Str(s)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(b: Vec<u8>) -> Self {
        CacheValue::Bytes(b)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(v: serde_json::Value) -> Self {
        CacheValue::Json(v)
    }
}

// == TTL ==
/// Time-to-live for a write operation.
///
/// Replaces the `-1 / 0 / +n` duration convention with the three cases
/// spelled out:
/// - `Never`: the entry does not expire.
/// - `Default`: use the store's configured default (per-entry default for
///   the primary store, hash default for hash operations).
/// - `After(d)`: expire `d` after the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Never,
    Default,
    After(Duration),
}

impl Ttl {
    /// Convenience constructor for whole-second TTLs.
    pub fn seconds(secs: u64) -> Self {
        Ttl::After(Duration::from_secs(secs))
    }

    /// Resolves to a concrete duration against a configured default.
    ///
    /// `None` means the entry never expires.
    pub fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Ttl::Never => None,
            Ttl::Default => default,
            Ttl::After(d) => Some(d),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::After(d)
    }
}
