//! The decoded JSON value model used throughout the runner.
//!
//! Fixture files and API responses are decoded *preserving*: every number is
//! kept as an opaque [`Number::Token`] holding its original text, so payloads
//! forwarded back to the API carry exactly the literal the fixture author
//! wrote. Expected blocks that went through identifier translation are
//! re-decoded *natively* ([`Value::into_native`]), which turns tokens into
//! [`Number::Int`] or [`Number::Float`].
//!
//! # Examples
//!
//! ```rust
//! use querycheck::value::{Number, Value};
//! let v = Value::parse_preserving(r#"{"count": 3}"#).unwrap();
//! assert!(matches!(v.get("count"), Some(Value::Number(Number::Token(_)))));
//! let n = v.into_native();
//! assert_eq!(n.get("count"), Some(&Value::Number(Number::Int(3))));
//! ```

use im::OrdMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Object representation: ordered so reports and request bodies are stable.
pub type Map = OrdMap<String, Value>;

// ============================================================================
// NUMBERS
// ============================================================================

/// A JSON number in one of its decoded representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    /// Natively decoded integral literal.
    Int(i64),
    /// Natively decoded non-integral (or out of `i64` range) literal.
    Float(f64),
    /// Opaque token keeping the literal's original text.
    Token(serde_json::Number),
}

impl Number {
    /// Exact integer value, when one can be extracted without rounding.
    ///
    /// Floats never report an integer value; they are compared by closeness.
    pub fn integral(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Float(_) => None,
            Number::Token(n) => n.as_i64(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Number::Int(i) => Some(*i as f64),
            Number::Float(f) => Some(*f),
            Number::Token(n) => n.as_f64(),
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Number::Token(_))
    }

    /// Decodes a token the way a plain JSON decoder would.
    pub fn to_native(&self) -> Number {
        match self {
            Number::Token(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Number::Int(i),
                (None, Some(f)) => Number::Float(f),
                (None, None) => self.clone(),
            },
            other => other.clone(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Number::Int(i) => serde_json::Value::Number((*i).into()),
            Number::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Number::Token(n) => serde_json::Value::Number(n.clone()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
            Number::Token(n) => write!(f, "{}", n),
        }
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// A decoded JSON value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    /// Decodes JSON text keeping every number as an opaque token.
    pub fn parse_preserving(text: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(text).map(Value::from)
    }

    /// Decodes JSON text into native integers and floats.
    pub fn parse_native(text: &str) -> Result<Value, serde_json::Error> {
        Self::parse_preserving(text).map(Value::into_native)
    }

    /// Converts every numeric token in the tree to its native representation.
    pub fn into_native(self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n.to_native()),
            Value::Array(items) => Value::Array(items.into_iter().map(Value::into_native).collect()),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_native()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up `key` when this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Serializes back into a `serde_json` tree, tokens included verbatim.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => n.to_json(),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Multi-line JSON rendering used for failure diffs.
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| self.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(Number::Token(n)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.to_json()).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
