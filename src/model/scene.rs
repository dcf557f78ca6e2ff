//! The scene: root aggregate of a recording.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;

use super::annotation::Annotation;
use super::frame::Frame;
use super::frame_interval::FrameInterval;
use super::ids::{AnnotationId, ObjectId};
use super::object::Object;
use super::sensor::Sensor;
use crate::error::RaillabelError;

/// The only OpenLABEL schema version this crate reads and writes.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Metadata keys with a dedicated field; they cannot be additional fields.
pub(crate) const METADATA_KEYS: [&str; 8] = [
    "schema_version",
    "name",
    "subschema_version",
    "exporter_version",
    "file_version",
    "tagged_file",
    "annotator",
    "comment",
];

/// A complete annotated recording.
///
/// The scene owns every sensor, object and frame. Annotations refer to
/// sensors and objects by id only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub metadata: Metadata,
    /// Sensors by id, in insertion order.
    pub sensors: IndexMap<String, Sensor>,
    /// Objects by UUID, in insertion order.
    pub objects: IndexMap<ObjectId, Object>,
    /// Frames by frame number, iterated in ascending order.
    pub frames: BTreeMap<u64, Frame>,
}

impl Scene {
    /// Iterates all annotations as `(frame_id, annotation_id, annotation)`,
    /// frames ascending and annotations in insertion order.
    pub fn annotations(&self) -> impl Iterator<Item = (u64, AnnotationId, &Annotation)> + '_ {
        self.frames.iter().flat_map(|(frame_id, frame)| {
            frame
                .annotations
                .iter()
                .map(move |(id, annotation)| (*frame_id, *id, annotation))
        })
    }

    /// Canonical interval list over all frame numbers.
    pub fn frame_intervals(&self) -> Vec<FrameInterval> {
        FrameInterval::from_frame_ids(self.frames.keys().copied())
    }

    /// Type of the object an annotation refers to, if the object exists.
    pub fn object_type(&self, object_id: &ObjectId) -> Option<&str> {
        self.objects.get(object_id).map(|o| o.object_type.as_str())
    }

    /// Lists every dangling sensor or object reference and every value
    /// JSON cannot represent (NaN or infinity).
    ///
    /// An empty list means the scene can be saved and read back unchanged.
    pub fn integrity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (sensor_id, sensor) in &self.sensors {
            if !sensor.is_finite() {
                issues.push(format!("sensor '{sensor_id}' has a non-finite pose or calibration"));
            }
        }
        for (frame_id, frame) in &self.frames {
            for sensor_id in frame.sensors.keys() {
                if !self.sensors.contains_key(sensor_id) {
                    issues.push(format!(
                        "frame {frame_id} references unknown sensor '{sensor_id}'"
                    ));
                }
            }
            for (name, num) in &frame.frame_data {
                if !num.val.is_finite() {
                    issues.push(format!(
                        "frame {frame_id} sample '{name}' has non-finite value {}",
                        num.val
                    ));
                }
                if let Some(sensor_id) = &num.sensor_id {
                    if !self.sensors.contains_key(sensor_id) {
                        issues.push(format!(
                            "frame {frame_id} sample '{name}' references unknown sensor '{sensor_id}'"
                        ));
                    }
                }
            }
            for (id, annotation) in &frame.annotations {
                if !annotation.geometry.is_finite() {
                    issues.push(format!(
                        "annotation {id} in frame {frame_id} has non-finite coordinates"
                    ));
                }
                if let Some(sensor_id) = &annotation.sensor_id {
                    if !self.sensors.contains_key(sensor_id) {
                        issues.push(format!(
                            "annotation {id} in frame {frame_id} references unknown sensor '{sensor_id}'"
                        ));
                    }
                }
                if !self.objects.contains_key(&annotation.object_id) {
                    issues.push(format!(
                        "annotation {id} in frame {frame_id} references unknown object {}",
                        annotation.object_id
                    ));
                }
            }
        }
        issues
    }
}

/// Descriptive metadata of a scene file.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    /// Always [`SCHEMA_VERSION`].
    pub schema_version: String,
    pub name: Option<String>,
    pub subschema_version: Option<String>,
    pub exporter_version: Option<String>,
    pub file_version: Option<String>,
    pub tagged_file: Option<String>,
    pub annotator: Option<String>,
    pub comment: Option<String>,
    /// Unrecognised fields, kept verbatim and written after the known ones.
    pub additional: IndexMap<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            name: None,
            subschema_version: None,
            exporter_version: None,
            file_version: None,
            tagged_file: None,
            annotator: None,
            comment: None,
            additional: IndexMap::new(),
        }
    }
}

impl Metadata {
    /// Adds an additional metadata field.
    ///
    /// # Errors
    /// Returns [`RaillabelError::Argument`] if `key` is not an identifier or
    /// collides with a recognised metadata field.
    pub fn insert_additional(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), RaillabelError> {
        let key = key.into();
        if !is_identifier(&key) {
            return Err(RaillabelError::Argument(format!(
                "metadata field '{key}' is not a valid identifier"
            )));
        }
        if METADATA_KEYS.contains(&key.as_str()) {
            return Err(RaillabelError::Argument(format!(
                "metadata field '{key}' has a dedicated field"
            )));
        }
        self.additional.insert(key, value.into());
        Ok(())
    }
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bbox, Sensor};
    use uuid::Uuid;

    #[test]
    fn test_metadata_defaults_to_schema_version() {
        assert_eq!(Metadata::default().schema_version, "1.0.0");
    }

    #[test]
    fn test_additional_fields_must_be_identifiers() {
        let mut metadata = Metadata::default();
        assert!(metadata.insert_additional("clip_id", "abc").is_ok());
        assert!(metadata.insert_additional("2fast", "x").is_err());
        assert!(metadata.insert_additional("has-dash", "x").is_err());
        assert!(metadata.insert_additional("comment", "x").is_err());
        assert_eq!(metadata.additional.len(), 1);
    }

    #[test]
    fn test_integrity_issues_report_dangling_refs() {
        let mut scene = Scene::default();
        scene.sensors.insert("rgb_center".into(), Sensor::camera());
        let mut frame = Frame::default();
        frame.annotations.insert(
            AnnotationId(Uuid::from_u128(1)),
            Annotation::new("lidar", ObjectId(Uuid::from_u128(2)), Bbox::default()),
        );
        scene.frames.insert(0, frame);

        let issues = scene.integrity_issues();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("lidar"));
    }

    #[test]
    fn test_annotations_iterates_frames_in_order() {
        let object = ObjectId(Uuid::from_u128(9));
        let mut scene = Scene::default();
        for frame_id in [3u64, 1] {
            let mut frame = Frame::default();
            frame.annotations.insert(
                AnnotationId(Uuid::from_u128(frame_id as u128)),
                Annotation::new("rgb_center", object, Bbox::default()),
            );
            scene.frames.insert(frame_id, frame);
        }
        let order: Vec<u64> = scene.annotations().map(|(frame_id, _, _)| frame_id).collect();
        assert_eq!(order, vec![1, 3]);
    }
}
