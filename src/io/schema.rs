//! Schema validation hook.
//!
//! Loading and saving can run the raw JSON document through a
//! [`SchemaValidator`] before conversion. A failing validator turns into
//! [`RaillabelError::Schema`](crate::error::RaillabelError::Schema) carrying
//! its `$.path: message` locators.

use serde_json::{Map, Value};

/// Validates a JSON document against a schema.
pub trait SchemaValidator {
    /// Returns `Ok(())` or one locator string per violation.
    fn validate(&self, document: &Value) -> Result<(), Vec<String>>;
}

impl<F> SchemaValidator for F
where
    F: Fn(&Value) -> Result<(), Vec<String>>,
{
    fn validate(&self, document: &Value) -> Result<(), Vec<String>> {
        self(document)
    }
}

/// Checks the mandatory skeleton of an OpenLABEL document.
///
/// This is a structural check only: the root and its containers are
/// objects, `metadata.schema_version` is a string, every stream and
/// coordinate system has a string `type`, every object has a string
/// `name` and `type`, and every frame key is a non-negative integer.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequiredFieldsValidator;

impl SchemaValidator for RequiredFieldsValidator {
    fn validate(&self, document: &Value) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        let Some(openlabel) = document.get("openlabel") else {
            return Err(vec!["$.openlabel: missing required field".to_string()]);
        };
        let Some(openlabel) = openlabel.as_object() else {
            return Err(vec!["$.openlabel: expected an object".to_string()]);
        };

        match openlabel.get("metadata").map(Value::as_object) {
            None => issues.push("$.openlabel.metadata: missing required field".to_string()),
            Some(None) => issues.push("$.openlabel.metadata: expected an object".to_string()),
            Some(Some(metadata)) => {
                require_string(metadata, "schema_version", "$.openlabel.metadata", &mut issues);
            }
        }

        for_each_entry(openlabel, "streams", &mut issues, |key, entry, issues| {
            require_string(entry, "type", &format!("$.openlabel.streams.{key}"), issues);
        });

        for_each_entry(openlabel, "coordinate_systems", &mut issues, |key, entry, issues| {
            let locator = format!("$.openlabel.coordinate_systems.{key}");
            require_string(entry, "type", &locator, issues);
            require_string(entry, "parent", &locator, issues);
        });

        for_each_entry(openlabel, "objects", &mut issues, |key, entry, issues| {
            let locator = format!("$.openlabel.objects.{key}");
            require_string(entry, "name", &locator, issues);
            require_string(entry, "type", &locator, issues);
        });

        for_each_entry(openlabel, "frames", &mut issues, |key, _, issues| {
            if key.parse::<u64>().is_err() {
                issues.push(format!(
                    "$.openlabel.frames.{key}: frame key is not a non-negative integer"
                ));
            }
        });

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// Calls `check` for every entry of the optional object `openlabel[field]`.
fn for_each_entry<F>(
    openlabel: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<String>,
    mut check: F,
) where
    F: FnMut(&str, &Map<String, Value>, &mut Vec<String>),
{
    let Some(container) = openlabel.get(field) else {
        return;
    };
    let Some(container) = container.as_object() else {
        issues.push(format!("$.openlabel.{field}: expected an object"));
        return;
    };
    for (key, entry) in container {
        match entry.as_object() {
            Some(entry) => check(key, entry, issues),
            None => issues.push(format!("$.openlabel.{field}.{key}: expected an object")),
        }
    }
}

fn require_string(
    object: &Map<String, Value>,
    field: &str,
    locator: &str,
    issues: &mut Vec<String>,
) {
    match object.get(field) {
        None => issues.push(format!("{locator}.{field}: missing required field")),
        Some(Value::String(_)) => {}
        Some(_) => issues.push(format!("{locator}.{field}: expected a string")),
    }
}
