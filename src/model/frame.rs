//! The contents of a scene at one instant.

use indexmap::IndexMap;
use std::collections::BTreeMap;

use super::annotation::{Annotation, Num};
use super::ids::{AnnotationId, ObjectId};
use super::sensor::SensorReference;
use super::timestamp::Timestamp;

/// Sensor references, samples and annotations of one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub timestamp: Option<Timestamp>,
    /// Sensors captured in this frame, in insertion order.
    pub sensors: IndexMap<String, SensorReference>,
    /// Frame-level numeric samples, ordered by name.
    pub frame_data: BTreeMap<String, Num>,
    /// Object annotations, in insertion order.
    pub annotations: IndexMap<AnnotationId, Annotation>,
}

impl Frame {
    pub fn new(timestamp: Option<Timestamp>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// Annotations regrouped by the object they refer to.
    ///
    /// Objects appear in the order of their first annotation.
    pub fn object_view(&self) -> IndexMap<ObjectId, Vec<(AnnotationId, &Annotation)>> {
        let mut view: IndexMap<ObjectId, Vec<(AnnotationId, &Annotation)>> = IndexMap::new();
        for (id, annotation) in &self.annotations {
            view.entry(annotation.object_id)
                .or_default()
                .push((*id, annotation));
        }
        view
    }

    /// Returns true if the frame holds nothing besides its timestamp.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty() && self.frame_data.is_empty() && self.annotations.is_empty()
    }
}
