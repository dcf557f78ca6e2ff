//! Non-fatal issues collected while loading, saving or filtering a scene.
//!
//! The caller creates a [`Warnings`] collector, passes it by mutable
//! reference into an operation and inspects it afterwards. The collector
//! never performs I/O; printing or logging is up to the caller.

use serde::Serialize;
use std::fmt;

/// An ordered collection of warnings.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Warnings {
    /// Issues in order of occurrence.
    pub issues: Vec<Warning>,
}

impl Warnings {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Appends a warning.
    pub fn add(&mut self, issue: Warning) {
        self.issues.push(issue);
    }

    /// Shorthand for `add(Warning::new(code, message, context))`.
    pub fn push(&mut self, code: WarningCode, message: impl Into<String>, context: WarningContext) {
        self.add(Warning::new(code, message, context));
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of warnings with the given code.
    pub fn count(&self, code: WarningCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Returns true if a warning with the given code was collected.
    pub fn contains(&self, code: WarningCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// Iterates over warning messages.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|i| i.message.as_str())
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return Ok(());
        }
        writeln!(f, "Warnings ({}):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}

/// A single non-fatal issue.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    pub context: WarningContext,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>, context: WarningContext) -> Self {
        Self {
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] in {}: {}", self.code, self.context, self.message)
    }
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// Two frame keys parse to the same frame number; the first is kept.
    DuplicateFrameId,
    /// An object UUID is listed twice; the first is kept.
    DuplicateObjectId,
    /// An annotation UUID repeats within a frame; the later one is renamed.
    DuplicateAnnotationId,
    /// An annotation had no usable UUID and received a fresh one.
    MintedAnnotationId,
    /// A frame or annotation references a sensor that does not exist.
    UnknownSensorReference,
    /// A frame references an object that does not exist.
    UnknownObjectReference,
    /// A `uri` attribute was moved to the frame's sensor reference.
    DeprecatedUriAttribute,
    /// A frame stream uses the old `stream_sync` field.
    DeprecatedStreamSync,
    /// An `object_data` entry has a tag this crate does not model.
    UnsupportedAnnotationKind,
    /// Annotations sharing a pointer name disagree on an attribute's type.
    AttributeTypeConflict,
    /// An attribute value of unsupported type was dropped.
    UnsupportedAttributeType,
    /// An annotation UUID was taken from its legacy `name` field.
    LegacyAnnotationName,
    /// A filter value matched nothing in the scene.
    UnmatchedFilterValue,
    /// An additional metadata key is not an identifier and was dropped.
    InvalidMetadataKey,
}

/// Where a warning occurred.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningContext {
    Scene,
    Sensor { id: String },
    Object { id: String },
    Frame { id: String },
    Annotation { frame: u64, id: String },
    Filter { parameter: String },
}

impl fmt::Display for WarningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningContext::Scene => write!(f, "scene"),
            WarningContext::Sensor { id } => write!(f, "sensor {}", id),
            WarningContext::Object { id } => write!(f, "object {}", id),
            WarningContext::Frame { id } => write!(f, "frame {}", id),
            WarningContext::Annotation { frame, id } => {
                write!(f, "annotation {} of frame {}", id, frame)
            }
            WarningContext::Filter { parameter } => write!(f, "filter {}", parameter),
        }
    }
}
