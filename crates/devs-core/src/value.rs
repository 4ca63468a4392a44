//! Dynamically typed values carried by events, facts and observations.
//!
//! Models exchange events whose attributes are not known to the kernel; the
//! decision extension stores agent knowledge and activity bookkeeping the
//! same way.  `Value` is the common currency.

use std::collections::BTreeMap;
use std::fmt;

use crate::{DevsError, DevsResult};

/// A dynamically typed value.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null       => "null",
            Value::Bool(_)    => "bool",
            Value::Integer(_) => "integer",
            Value::Double(_)  => "double",
            Value::String(_)  => "string",
            Value::Set(_)     => "set",
            Value::Map(_)     => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d)  => Some(*d),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    // ── Strict accessors ──────────────────────────────────────────────────

    pub fn to_integer(&self) -> DevsResult<i64> {
        self.as_integer().ok_or_else(|| self.mismatch("integer"))
    }

    pub fn to_double(&self) -> DevsResult<f64> {
        self.as_double().ok_or_else(|| self.mismatch("double"))
    }

    pub fn to_str(&self) -> DevsResult<&str> {
        self.as_str().ok_or_else(|| self.mismatch("string"))
    }

    pub fn to_set(&self) -> DevsResult<&[Value]> {
        self.as_set().ok_or_else(|| self.mismatch("set"))
    }

    pub fn to_map(&self) -> DevsResult<&BTreeMap<String, Value>> {
        self.as_map().ok_or_else(|| self.mismatch("map"))
    }

    /// Look up `key` in a map value.
    pub fn get(&self, key: &str) -> DevsResult<&Value> {
        self.to_map()?
            .get(key)
            .ok_or_else(|| DevsError::MissingKey(key.to_owned()))
    }

    fn mismatch(&self, expected: &'static str) -> DevsError {
        DevsError::TypeMismatch { expected, found: self.type_name() }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Set(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null       => Ok(()),
            Value::Bool(b)    => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d)  => write!(f, "{d}"),
            Value::String(s)  => f.write_str(s),
            Value::Set(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}
