//! Attribute codec.
//!
//! On disk, attributes are partitioned by type:
//!
//! ```json
//! { "boolean": [{"name": "occluded", "val": false}],
//!   "num":     [{"name": "track", "val": 3}],
//!   "text":    [{"name": "colour", "val": "red"}],
//!   "vec":     [{"name": "tags", "val": ["a", "b"]}] }
//! ```
//!
//! In memory they are a flat, name-ordered map of typed values.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::RaillabelError;
use crate::model::{is_primitive, json_type_name, AttributeValue, Attributes};
use crate::warnings::{WarningCode, WarningContext, Warnings};

/// Type-partitioned attribute groups.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonAttributes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boolean: Vec<JsonAttribute<bool>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub num: Vec<JsonAttribute<Number>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<JsonAttribute<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vec: Vec<JsonAttribute<Vec<Value>>>,
}

/// A single `{name, val}` entry.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonAttribute<T> {
    pub name: String,
    pub val: T,
}

impl<T> JsonAttribute<T> {
    fn new(name: &str, val: T) -> Self {
        Self {
            name: name.to_string(),
            val,
        }
    }
}

/// Flattens the groups into one map.
///
/// Groups are merged in `boolean`, `num`, `text`, `vec` order; a name that
/// appears twice keeps its last value. `vec` entries holding nested arrays
/// or objects are dropped with a warning.
pub(crate) fn decode_attributes(
    json: JsonAttributes,
    context: &WarningContext,
    warnings: &mut Warnings,
) -> Attributes {
    let mut attributes = Attributes::new();
    for entry in json.boolean {
        attributes.insert(entry.name, AttributeValue::Bool(entry.val));
    }
    for entry in json.num {
        attributes.insert(entry.name, AttributeValue::Num(entry.val));
    }
    for entry in json.text {
        attributes.insert(entry.name, AttributeValue::Text(entry.val));
    }
    for entry in json.vec {
        if let Some(item) = entry.val.iter().find(|item| !is_primitive(item)) {
            warnings.push(
                WarningCode::UnsupportedAttributeType,
                format!(
                    "vec attribute '{}' contains a {} item; attribute dropped",
                    entry.name,
                    json_type_name(item)
                ),
                context.clone(),
            );
            continue;
        }
        attributes.insert(entry.name, AttributeValue::Vec(entry.val));
    }
    attributes
}

/// Splits attributes into their type groups, or `None` when there are none.
///
/// # Errors
/// Returns [`RaillabelError::UnsupportedAttributeType`] if a `vec` value
/// holds anything but strings, numbers and booleans.
pub(crate) fn encode_attributes(
    attributes: &Attributes,
) -> Result<Option<JsonAttributes>, RaillabelError> {
    if attributes.is_empty() {
        return Ok(None);
    }

    let mut json = JsonAttributes::default();
    for (name, value) in attributes {
        match value {
            AttributeValue::Bool(flag) => json.boolean.push(JsonAttribute::new(name, *flag)),
            AttributeValue::Num(number) => json.num.push(JsonAttribute::new(name, number.clone())),
            AttributeValue::Text(text) => json.text.push(JsonAttribute::new(name, text.clone())),
            AttributeValue::Vec(items) => {
                if let Some(item) = items.iter().find(|item| !is_primitive(item)) {
                    return Err(RaillabelError::UnsupportedAttributeType {
                        attribute: name.clone(),
                        found: format!("vec of {}", json_type_name(item)),
                    });
                }
                json.vec.push(JsonAttribute::new(name, items.clone()));
            }
        }
    }
    Ok(Some(json))
}
