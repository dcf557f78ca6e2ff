//! Typed annotation attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Attributes of one annotation, keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// The value of a single attribute.
///
/// Integer and floating point numbers share the `Num` kind; the JSON
/// number is kept as-is so `3` does not come back as `3.0`.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Num(Number),
    Bool(bool),
    /// An ordered list of JSON primitives (strings, numbers, booleans).
    Vec(Vec<Value>),
}

impl AttributeValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Text(_) => AttributeKind::Text,
            AttributeValue::Num(_) => AttributeKind::Num,
            AttributeValue::Bool(_) => AttributeKind::Boolean,
            AttributeValue::Vec(_) => AttributeKind::Vec,
        }
    }

    /// Creates a numeric value; `None` for NaN or infinite input.
    pub fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(AttributeValue::Num)
    }

    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Converts an arbitrary JSON value, if it has a supported kind.
    ///
    /// Arrays are accepted when every item is a primitive; objects, null
    /// and nested arrays yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(AttributeValue::Text(text.clone())),
            Value::Number(number) => Some(AttributeValue::Num(number.clone())),
            Value::Bool(flag) => Some(AttributeValue::Bool(*flag)),
            Value::Array(items) if items.iter().all(is_primitive) => {
                Some(AttributeValue::Vec(items.clone()))
            }
            _ => None,
        }
    }
}

/// Returns true for the JSON values allowed inside a `vec` attribute.
pub(crate) fn is_primitive(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Short description of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Num(Number::from(value))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Num(Number::from(value))
    }
}

/// The kind of an attribute as written in the JSON attribute groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Text,
    Num,
    Boolean,
    Vec,
}

impl AttributeKind {
    /// The JSON group key for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Text => "text",
            AttributeKind::Num => "num",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Vec => "vec",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
