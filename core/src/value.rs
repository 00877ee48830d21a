//! Key values for odsync entities.
//!
//! Key values are the scalar parts of an entity key. They render as OData
//! literals inside a key predicate (`(1)`, `('ALFKI')`,
//! `(OrderID=1,ProductID=7)`) and can be read back from a server payload.

use crate::JsonMap;
use serde_json::Value as JsonValue;
use std::fmt;

/// A value that can appear in an entity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    /// Boolean key.
    Bool(bool),
    /// 64-bit signed integer key.
    Int(i64),
    /// UTF-8 string key, rendered quoted.
    String(String),
    /// GUID key, rendered unquoted.
    Guid(String),
}

impl KeyValue {
    /// Returns true if this is an integer value.
    pub fn is_int(&self) -> bool {
        matches!(self, KeyValue::Int(_))
    }

    /// Returns true if this is a string value.
    pub fn is_string(&self) -> bool {
        matches!(self, KeyValue::String(_))
    }

    /// Get as integer if this is an Int value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as string reference if this is a String or Guid value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::String(s) | KeyValue::Guid(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            KeyValue::Bool(_) => "Bool",
            KeyValue::Int(_) => "Int",
            KeyValue::String(_) => "String",
            KeyValue::Guid(_) => "Guid",
        }
    }

    /// Read a key value out of a JSON property value.
    ///
    /// Floats, nulls and structured values never form keys.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Bool(b) => Some(KeyValue::Bool(*b)),
            JsonValue::Number(n) => n.as_i64().map(KeyValue::Int),
            JsonValue::String(s) => Some(KeyValue::String(s.clone())),
            _ => None,
        }
    }

    /// Render as an OData URL literal.
    pub fn to_literal(&self) -> String {
        match self {
            KeyValue::Bool(b) => b.to_string(),
            KeyValue::Int(i) => i.to_string(),
            KeyValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            KeyValue::Guid(g) => g.clone(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

impl From<bool> for KeyValue {
    fn from(b: bool) -> Self {
        KeyValue::Bool(b)
    }
}

impl From<i64> for KeyValue {
    fn from(i: i64) -> Self {
        KeyValue::Int(i)
    }
}

impl From<i32> for KeyValue {
    fn from(i: i32) -> Self {
        KeyValue::Int(i as i64)
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        KeyValue::String(s)
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::String(s.to_string())
    }
}

/// The key of one entity: a single value or named composite parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Single(KeyValue),
    Composite(Vec<(String, KeyValue)>),
}

impl EntityKey {
    /// Render the key predicate, parentheses included.
    pub fn to_predicate(&self) -> String {
        match self {
            EntityKey::Single(value) => format!("({})", value.to_literal()),
            EntityKey::Composite(parts) => {
                let body = parts
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value.to_literal()))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("({})", body)
            }
        }
    }

    /// Extract the key from a payload using the declared key property names.
    ///
    /// Returns `None` when any key property is missing or not key-typed.
    pub fn from_payload(key_properties: &[String], payload: &JsonMap) -> Option<Self> {
        match key_properties {
            [] => None,
            [single] => payload
                .get(single)
                .and_then(KeyValue::from_json)
                .map(EntityKey::Single),
            many => {
                let mut parts = Vec::with_capacity(many.len());
                for name in many {
                    let value = payload.get(name).and_then(KeyValue::from_json)?;
                    parts.push((name.clone(), value));
                }
                Some(EntityKey::Composite(parts))
            }
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_predicate())
    }
}

impl From<KeyValue> for EntityKey {
    fn from(value: KeyValue) -> Self {
        EntityKey::Single(value)
    }
}

impl From<i64> for EntityKey {
    fn from(i: i64) -> Self {
        EntityKey::Single(KeyValue::Int(i))
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        EntityKey::Single(KeyValue::from(s))
    }
}

/// Helper macro to create JSON object maps for payloads and property changes.
#[macro_export]
macro_rules! props {
    () => {
        $crate::JsonMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let mut map = $crate::JsonMap::new();
            $(
                map.insert($key.to_string(), $crate::serde_json::json!($value));
            )+
            map
        }
    };
}
