//! Tracked real-world objects.

/// A real-world entity tracked across the whole scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    /// Human readable name, e.g. `person_0000`.
    pub name: String,
    /// Object class, e.g. `person` or `train`.
    pub object_type: String,
}

impl Object {
    pub fn new(name: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_type: object_type.into(),
        }
    }
}
