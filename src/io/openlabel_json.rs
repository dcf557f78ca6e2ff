//! OpenLABEL 1.0 JSON reader and writer.
//!
//! The schema types below mirror the file layout one to one. Conversion
//! to and from the [`Scene`] model happens in separate passes so the
//! predecessor dialect reader can build the same mirror records and reuse
//! the OpenLABEL conversion.
//!
//! # Layout notes
//!
//! - A sensor is split across `streams[id]` (type, intrinsics) and
//!   `coordinate_systems[id]` (pose relative to `base`). The `base`
//!   coordinate system is synthesised on write.
//! - Timestamps are captured as raw JSON text and parsed as decimals, so
//!   nanosecond digits survive. They are written as JSON strings.
//! - Object frame intervals, object-data pointers and the scene-level
//!   frame intervals are derived on write and ignored on read.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use uuid::Uuid;

use super::attributes::{decode_attributes, encode_attributes, JsonAttributes};
use super::entries::Entries;
use crate::error::RaillabelError;
use crate::model::{
    Annotation, AnnotationId, Attributes, AttributeValue, Bbox, Cuboid, Frame, FrameInterval,
    Geometry, IntrinsicsPinhole, IntrinsicsRadar, Metadata, Num, Object, ObjectId, Point2d,
    Point3d, Poly2d, Poly2dMode, Poly3d, Quaternion, Scene, Seg3d, Sensor, SensorKind,
    SensorReference, SensorType, Size2d, Size3d, Timestamp, Transform, UuidStream,
    is_identifier, SCHEMA_VERSION,
};
use crate::pointers::{derive_pointers, ObjectPointers};
use crate::warnings::{WarningCode, WarningContext, Warnings};

/// Id of the synthesised root coordinate system.
pub(crate) const BASE_COORDINATE_SYSTEM: &str = "base";

// ============================================================================
// OpenLABEL Schema Types (internal to the io module)
// ============================================================================

/// Document root: `{"openlabel": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonRoot {
    pub openlabel: JsonOpenLabel,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonOpenLabel {
    pub metadata: JsonMetadata,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub coordinate_systems: IndexMap<String, JsonCoordinateSystem>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub streams: IndexMap<String, JsonStream>,

    #[serde(default, skip_serializing_if = "Entries::is_empty")]
    pub objects: Entries<JsonObject>,

    #[serde(default, skip_serializing_if = "Entries::is_empty")]
    pub frames: Entries<JsonFrame>,

    /// Derived on write.
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub frame_intervals: Vec<JsonFrameInterval>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonMetadata {
    pub schema_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subschema_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exporter_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagged_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(flatten)]
    pub additional: IndexMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonCoordinateSystem {
    #[serde(rename = "type", default)]
    pub cs_type: String,

    #[serde(default)]
    pub parent: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_wrt_parent: Option<JsonTransform>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonTransform {
    pub translation: [f64; 3],
    pub quaternion: [f64; 4],
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonStream {
    #[serde(rename = "type")]
    pub stream_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_properties: Option<JsonStreamProperties>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonStreamProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsics_pinhole: Option<JsonIntrinsicsPinhole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsics_radar: Option<JsonIntrinsicsRadar>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonIntrinsicsPinhole {
    /// Row-major 3x4 matrix.
    pub camera_matrix: [f64; 12],
    pub distortion_coeffs: [f64; 5],
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonIntrinsicsRadar {
    pub resolution_px_per_m: f64,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonObject {
    pub name: String,

    #[serde(rename = "type")]
    pub object_type: String,

    /// Derived on write.
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub frame_intervals: Vec<JsonFrameInterval>,

    /// Derived on write.
    #[serde(default, skip_deserializing, skip_serializing_if = "BTreeMap::is_empty")]
    pub object_data_pointers: BTreeMap<String, JsonElementDataPointer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonElementDataPointer {
    #[serde(rename = "type")]
    pub kind: String,

    pub frame_intervals: Vec<JsonFrameInterval>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_pointers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JsonFrameInterval {
    pub frame_start: u64,
    pub frame_end: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_properties: Option<JsonFrameProperties>,

    #[serde(default, skip_serializing_if = "Entries::is_empty")]
    pub objects: Entries<JsonFrameObject>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonFrameProperties {
    /// Raw literal; a JSON string or number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Box<RawValue>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub streams: IndexMap<String, JsonFrameStream>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_data: Option<JsonFrameData>,
}

impl JsonFrameProperties {
    fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.streams.is_empty() && self.frame_data.is_none()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonFrameStream {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_properties: Option<JsonFrameStreamProperties>,

    /// Pre-1.0 spelling of `stream_properties.sync`; read only.
    #[serde(default, skip_serializing)]
    pub stream_sync: Option<JsonSync>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonFrameStreamProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<JsonSync>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonSync {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Box<RawValue>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonFrameData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub num: Vec<JsonNum>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonNum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    pub name: String,

    pub val: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_system: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonFrameObject {
    #[serde(default)]
    pub object_data: JsonObjectData,
}

/// Annotations of one object in one frame, grouped by kind tag.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JsonObjectData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bbox: Vec<JsonAnnotation<JsonBboxVal>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cuboid: Vec<JsonAnnotation<JsonCuboidVal>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poly2d: Vec<JsonAnnotation<JsonPoly2dVal>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poly3d: Vec<JsonAnnotation<JsonPoly3dVal>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vec: Vec<JsonAnnotation<JsonVecVal>>,

    /// Tags without a model counterpart; reported and skipped.
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// Annotation envelope shared by every kind; `G` carries `val` and the
/// kind-specific flags.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonAnnotation<G> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub geometry: G,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<JsonAttributes>,
}

impl JsonAnnotation<()> {
    fn with_geometry<G>(self, geometry: G) -> JsonAnnotation<G> {
        JsonAnnotation {
            uid: self.uid,
            name: self.name,
            geometry,
            coordinate_system: self.coordinate_system,
            attributes: self.attributes,
        }
    }
}

/// `[x_center, y_center, width, height]`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonBboxVal {
    pub val: [f64; 4],
}

/// `[x, y, z, qx, qy, qz, qw, sx, sy, sz]`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonCuboidVal {
    pub val: [f64; 10],
}

/// Flat `[x0, y0, x1, y1, ...]`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonPoly2dVal {
    pub val: Vec<f64>,

    #[serde(default)]
    pub closed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Flat `[x0, y0, z0, x1, y1, z1, ...]`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonPoly3dVal {
    pub val: Vec<f64>,

    #[serde(default)]
    pub closed: bool,
}

/// Point indices of a segmentation.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonVecVal {
    pub val: Vec<u64>,
}

// ============================================================================
// Public API
// ============================================================================

/// Parses OpenLABEL bytes that are already known to be valid JSON.
pub(crate) fn read_slice(
    bytes: &[u8],
    path: &Path,
    warnings: &mut Warnings,
) -> Result<Scene, RaillabelError> {
    let root: JsonRoot = serde_json::from_slice(bytes)
        .map_err(|e| RaillabelError::schema(path, format!("$.openlabel: {e}")))?;
    json_to_scene(root.openlabel, path, warnings)
}

/// Converts mirror records into a scene.
pub(crate) fn json_to_scene(
    document: JsonOpenLabel,
    path: &Path,
    warnings: &mut Warnings,
) -> Result<Scene, RaillabelError> {
    SceneReader {
        path,
        ids: UuidStream::default(),
        warnings,
    }
    .read(document)
}

/// Converts a scene into mirror records, deriving all pointers.
///
/// # Errors
/// Returns [`RaillabelError::Schema`] if the scene holds dangling sensor or
/// object references or NaN/infinite numbers, and [`RaillabelError::UnsupportedAttributeType`] for
/// `vec` attributes with non-primitive items.
pub(crate) fn scene_to_json(
    scene: &Scene,
    path: &Path,
    warnings: &mut Warnings,
) -> Result<JsonRoot, RaillabelError> {
    let issues = scene.integrity_issues();
    if !issues.is_empty() {
        return Err(RaillabelError::Schema {
            path: path.to_path_buf(),
            issues,
        });
    }

    let pointers = derive_pointers(scene, warnings);

    let mut coordinate_systems = IndexMap::new();
    let mut streams = IndexMap::new();
    if !scene.sensors.is_empty() {
        coordinate_systems.insert(
            BASE_COORDINATE_SYSTEM.to_string(),
            JsonCoordinateSystem {
                cs_type: "local".to_string(),
                parent: String::new(),
                children: scene.sensors.keys().cloned().collect(),
                pose_wrt_parent: None,
            },
        );
    }
    for (sensor_id, sensor) in &scene.sensors {
        coordinate_systems.insert(
            sensor_id.clone(),
            JsonCoordinateSystem {
                cs_type: "sensor".to_string(),
                parent: BASE_COORDINATE_SYSTEM.to_string(),
                children: Vec::new(),
                pose_wrt_parent: sensor.extrinsics.as_ref().map(transform_to_json),
            },
        );
        streams.insert(sensor_id.clone(), sensor_to_stream(sensor));
    }

    let mut objects = Entries::default();
    for (object_id, object) in &scene.objects {
        let derived = pointers.get(object_id).cloned().unwrap_or_default();
        objects.push(object_id.to_string(), object_to_json(object, derived));
    }

    let mut frames = Entries::default();
    for (frame_id, frame) in &scene.frames {
        frames.push(frame_id.to_string(), frame_to_json(scene, frame, path)?);
    }

    Ok(JsonRoot {
        openlabel: JsonOpenLabel {
            metadata: metadata_to_json(&scene.metadata),
            coordinate_systems,
            streams,
            objects,
            frames,
            frame_intervals: intervals_to_json(&scene.frame_intervals()),
        },
    })
}

// ============================================================================
// Conversion: OpenLABEL -> Scene
// ============================================================================

struct SceneReader<'a> {
    path: &'a Path,
    /// Source of fresh annotation ids.
    ids: UuidStream,
    warnings: &'a mut Warnings,
}

impl SceneReader<'_> {
    fn read(mut self, document: JsonOpenLabel) -> Result<Scene, RaillabelError> {
        let metadata = self.read_metadata(document.metadata)?;
        let sensors = self.read_sensors(document.streams, document.coordinate_systems)?;
        let objects = self.read_objects(document.objects)?;
        let mut scene = Scene {
            metadata,
            sensors,
            objects,
            frames: BTreeMap::new(),
        };

        for (key, json_frame) in document.frames {
            let frame_id: u64 = key.parse().map_err(|_| {
                self.schema(format!(
                    "$.openlabel.frames.{key}: frame key is not a non-negative integer"
                ))
            })?;
            if scene.frames.contains_key(&frame_id) {
                self.warnings.push(
                    WarningCode::DuplicateFrameId,
                    format!("frame key '{key}' duplicates frame {frame_id}; keeping the first"),
                    WarningContext::Frame { id: key.clone() },
                );
                continue;
            }
            let frame = self.read_frame(frame_id, &key, json_frame, &scene)?;
            scene.frames.insert(frame_id, frame);
        }

        Ok(scene)
    }

    fn schema(&self, issue: String) -> RaillabelError {
        RaillabelError::schema(self.path, issue)
    }

    fn read_metadata(&mut self, json: JsonMetadata) -> Result<Metadata, RaillabelError> {
        if json.schema_version != SCHEMA_VERSION {
            return Err(self.schema(format!(
                "$.openlabel.metadata.schema_version: unsupported version '{}' (expected {SCHEMA_VERSION})",
                json.schema_version
            )));
        }
        Ok(Metadata {
            schema_version: json.schema_version,
            name: json.name,
            subschema_version: json.subschema_version,
            exporter_version: json.exporter_version,
            file_version: json.file_version,
            tagged_file: json.tagged_file,
            annotator: json.annotator,
            comment: json.comment,
            additional: self.read_additional_metadata(json.additional),
        })
    }

    /// Keeps additional metadata fields whose keys are identifiers.
    fn read_additional_metadata(
        &mut self,
        fields: IndexMap<String, Value>,
    ) -> IndexMap<String, Value> {
        let mut additional = IndexMap::with_capacity(fields.len());
        for (key, value) in fields {
            if is_identifier(&key) {
                additional.insert(key, value);
            } else {
                self.warnings.push(
                    WarningCode::InvalidMetadataKey,
                    format!("metadata field '{key}' is not an identifier; dropped"),
                    WarningContext::Scene,
                );
            }
        }
        additional
    }

    /// Joins streams and coordinate systems. Every violation is collected
    /// before failing.
    fn read_sensors(
        &self,
        streams: IndexMap<String, JsonStream>,
        mut coordinate_systems: IndexMap<String, JsonCoordinateSystem>,
    ) -> Result<IndexMap<String, Sensor>, RaillabelError> {
        let mut issues = Vec::new();

        for (cs_id, cs) in &coordinate_systems {
            if cs_id == BASE_COORDINATE_SYSTEM {
                continue;
            }
            if !streams.contains_key(cs_id) {
                issues.push(format!(
                    "$.openlabel.coordinate_systems.{cs_id}: no matching stream"
                ));
            }
            if cs.parent != BASE_COORDINATE_SYSTEM {
                issues.push(format!(
                    "$.openlabel.coordinate_systems.{cs_id}.parent: expected '{BASE_COORDINATE_SYSTEM}', found '{}'",
                    cs.parent
                ));
            }
        }

        let mut sensors = IndexMap::new();
        for (sensor_id, stream) in streams {
            let Some(cs) = coordinate_systems.shift_remove(&sensor_id) else {
                issues.push(format!(
                    "$.openlabel.streams.{sensor_id}: no matching coordinate system"
                ));
                continue;
            };
            match stream_to_sensor(&sensor_id, stream, cs) {
                Ok(sensor) => {
                    sensors.insert(sensor_id, sensor);
                }
                Err(issue) => issues.push(issue),
            }
        }

        if issues.is_empty() {
            Ok(sensors)
        } else {
            Err(RaillabelError::Schema {
                path: self.path.to_path_buf(),
                issues,
            })
        }
    }

    fn read_objects(
        &mut self,
        entries: Entries<JsonObject>,
    ) -> Result<IndexMap<ObjectId, Object>, RaillabelError> {
        let mut objects = IndexMap::new();
        for (key, json) in entries {
            let object_id: ObjectId = key.parse().map_err(|e| {
                self.schema(format!("$.openlabel.objects.{key}: invalid object UUID: {e}"))
            })?;
            if objects.contains_key(&object_id) {
                self.warnings.push(
                    WarningCode::DuplicateObjectId,
                    format!("object {object_id} is listed twice; keeping the first"),
                    WarningContext::Object { id: key },
                );
                continue;
            }
            objects.insert(object_id, Object::new(json.name, json.object_type));
        }
        Ok(objects)
    }

    fn read_frame(
        &mut self,
        frame_id: u64,
        key: &str,
        json: JsonFrame,
        scene: &Scene,
    ) -> Result<Frame, RaillabelError> {
        let locator = format!("$.openlabel.frames.{key}");
        let properties = json.frame_properties.unwrap_or_default();
        let frame_context = || WarningContext::Frame {
            id: frame_id.to_string(),
        };

        let timestamp = match &properties.timestamp {
            Some(raw) => Some(parse_timestamp(raw).map_err(|e| {
                self.schema(format!("{locator}.frame_properties.timestamp: {e}"))
            })?),
            None => None,
        };
        let mut frame = Frame::new(timestamp);

        for (sensor_id, stream) in properties.streams {
            if !scene.sensors.contains_key(&sensor_id) {
                self.warnings.push(
                    WarningCode::UnknownSensorReference,
                    format!("frame stream references unknown sensor '{sensor_id}'; dropped"),
                    frame_context(),
                );
                continue;
            }
            if stream.stream_sync.is_some() {
                self.warnings.push(
                    WarningCode::DeprecatedStreamSync,
                    format!("stream '{sensor_id}' uses 'stream_sync'; use 'stream_properties.sync'"),
                    frame_context(),
                );
            }
            let raw = stream
                .stream_properties
                .and_then(|p| p.sync)
                .and_then(|s| s.timestamp)
                .or_else(|| stream.stream_sync.and_then(|s| s.timestamp));
            let stream_locator = format!("{locator}.frame_properties.streams.{sensor_id}");
            let sync_timestamp = match raw {
                Some(raw) => parse_timestamp(&raw)
                    .map_err(|e| {
                        self.schema(format!(
                            "{stream_locator}.stream_properties.sync.timestamp: {e}"
                        ))
                    })?,
                None => frame.timestamp.ok_or_else(|| {
                    self.schema(format!(
                        "{stream_locator}: no sync timestamp and the frame has none to inherit"
                    ))
                })?,
            };
            frame.sensors.insert(
                sensor_id,
                SensorReference {
                    timestamp: sync_timestamp,
                    uri: stream.uri,
                },
            );
        }

        if let Some(frame_data) = properties.frame_data {
            for json_num in frame_data.num {
                self.read_num(frame_id, &locator, json_num, &mut frame, scene)?;
            }
        }

        for (object_key, json_object) in json.objects {
            let object_id = match object_key.parse::<ObjectId>() {
                Ok(id) if scene.objects.contains_key(&id) => id,
                _ => {
                    self.warnings.push(
                        WarningCode::UnknownObjectReference,
                        format!("frame references unknown object '{object_key}'; dropped"),
                        frame_context(),
                    );
                    continue;
                }
            };
            self.read_object_data(frame_id, &mut frame, object_id, json_object.object_data, scene)?;
        }

        Ok(frame)
    }

    fn read_num(
        &mut self,
        frame_id: u64,
        locator: &str,
        json: JsonNum,
        frame: &mut Frame,
        scene: &Scene,
    ) -> Result<(), RaillabelError> {
        let uid = match &json.uid {
            Some(uid) => Some(uid.parse::<Uuid>().map_err(|e| {
                self.schema(format!(
                    "{locator}.frame_properties.frame_data.num.{}.uid: {e}",
                    json.name
                ))
            })?),
            None => None,
        };
        let context = WarningContext::Frame {
            id: frame_id.to_string(),
        };
        let sensor_id = self.known_sensor(json.coordinate_system, scene, &context);
        if frame.frame_data.contains_key(&json.name) {
            self.warnings.push(
                WarningCode::DuplicateAnnotationId,
                format!("frame data sample '{}' repeats; keeping the first", json.name),
                context,
            );
            return Ok(());
        }
        frame.frame_data.insert(
            json.name,
            Num {
                uid,
                sensor_id,
                val: json.val,
            },
        );
        Ok(())
    }

    fn read_object_data(
        &mut self,
        frame_id: u64,
        frame: &mut Frame,
        object_id: ObjectId,
        data: JsonObjectData,
        scene: &Scene,
    ) -> Result<(), RaillabelError> {
        for tag in data.other.keys() {
            self.warnings.push(
                WarningCode::UnsupportedAnnotationKind,
                format!("object {object_id} has unsupported annotation kind '{tag}'; skipped"),
                WarningContext::Frame {
                    id: frame_id.to_string(),
                },
            );
        }

        for json in data.bbox {
            self.read_annotation(frame_id, frame, object_id, json, scene, |g| {
                Ok(bbox_from_val(g.val))
            })?;
        }
        for json in data.cuboid {
            self.read_annotation(frame_id, frame, object_id, json, scene, |g| {
                Ok(cuboid_from_val(g.val))
            })?;
        }
        for json in data.poly2d {
            self.read_annotation(frame_id, frame, object_id, json, scene, poly2d_from_val)?;
        }
        for json in data.poly3d {
            self.read_annotation(frame_id, frame, object_id, json, scene, poly3d_from_val)?;
        }
        for json in data.vec {
            self.read_annotation(frame_id, frame, object_id, json, scene, |g| {
                Ok(Geometry::Seg3d(Seg3d::new(g.val)))
            })?;
        }
        Ok(())
    }

    fn read_annotation<G, F>(
        &mut self,
        frame_id: u64,
        frame: &mut Frame,
        object_id: ObjectId,
        json: JsonAnnotation<G>,
        scene: &Scene,
        geometry: F,
    ) -> Result<(), RaillabelError>
    where
        F: FnOnce(G) -> Result<Geometry, String>,
    {
        let annotation_id =
            self.resolve_annotation_id(frame_id, frame, json.uid.as_deref(), json.name.as_deref());
        let context = WarningContext::Annotation {
            frame: frame_id,
            id: annotation_id.to_string(),
        };

        let geometry = geometry(json.geometry).map_err(|e| {
            self.schema(format!(
                "$.openlabel.frames.{frame_id}.objects.{object_id}.object_data: annotation {annotation_id}: {e}"
            ))
        })?;
        let sensor_id = self.known_sensor(json.coordinate_system, scene, &context);
        let mut attributes = match json.attributes {
            Some(attributes) => decode_attributes(attributes, &context, self.warnings),
            None => Attributes::new(),
        };
        if let Some(sensor_id) = &sensor_id {
            self.migrate_uri_attribute(frame, sensor_id, &mut attributes, &context);
        }

        frame.annotations.insert(
            annotation_id,
            Annotation {
                sensor_id,
                object_id,
                attributes,
                geometry,
            },
        );
        Ok(())
    }

    /// Picks the annotation's id: its `uid`, else a UUID-shaped legacy
    /// `name`, else a fresh one. Ids already used in the frame are replaced.
    fn resolve_annotation_id(
        &mut self,
        frame_id: u64,
        frame: &Frame,
        uid: Option<&str>,
        name: Option<&str>,
    ) -> AnnotationId {
        let mut candidate = uid.and_then(|uid| uid.parse::<AnnotationId>().ok());
        if candidate.is_none() {
            if let Some(id) = name.and_then(|name| name.parse::<AnnotationId>().ok()) {
                self.warnings.push(
                    WarningCode::LegacyAnnotationName,
                    "annotation has no valid uid; adopted the UUID in its name",
                    WarningContext::Annotation {
                        frame: frame_id,
                        id: id.to_string(),
                    },
                );
                candidate = Some(id);
            }
        }

        match candidate {
            Some(id) if !frame.annotations.contains_key(&id) => id,
            Some(id) => {
                let fresh = self.mint_annotation_id(frame);
                self.warnings.push(
                    WarningCode::DuplicateAnnotationId,
                    format!("annotation {id} repeats within the frame; renamed to {fresh}"),
                    WarningContext::Annotation {
                        frame: frame_id,
                        id: id.to_string(),
                    },
                );
                fresh
            }
            None => {
                let fresh = self.mint_annotation_id(frame);
                let previous = uid.unwrap_or("<missing>");
                self.warnings.push(
                    WarningCode::MintedAnnotationId,
                    format!("annotation uid '{previous}' is not a UUID; assigned {fresh}"),
                    WarningContext::Annotation {
                        frame: frame_id,
                        id: fresh.to_string(),
                    },
                );
                fresh
            }
        }
    }

    fn mint_annotation_id(&mut self, frame: &Frame) -> AnnotationId {
        loop {
            let id = AnnotationId::new(self.ids.next_uuid());
            if !frame.annotations.contains_key(&id) {
                return id;
            }
        }
    }

    /// Keeps a sensor reference only if the sensor exists.
    fn known_sensor(
        &mut self,
        sensor_id: Option<String>,
        scene: &Scene,
        context: &WarningContext,
    ) -> Option<String> {
        let sensor_id = sensor_id?;
        if scene.sensors.contains_key(&sensor_id) {
            return Some(sensor_id);
        }
        self.warnings.push(
            WarningCode::UnknownSensorReference,
            format!("coordinate system '{sensor_id}' is not a known sensor; reference dropped"),
            context.clone(),
        );
        None
    }

    /// Moves a legacy text `uri` attribute onto the frame's sensor reference.
    fn migrate_uri_attribute(
        &mut self,
        frame: &mut Frame,
        sensor_id: &str,
        attributes: &mut Attributes,
        context: &WarningContext,
    ) {
        let Some(AttributeValue::Text(uri)) = attributes.get("uri").cloned() else {
            return;
        };
        attributes.remove("uri");

        if let Some(reference) = frame.sensors.get_mut(sensor_id) {
            reference.uri = Some(uri);
        } else if let Some(timestamp) = frame.timestamp {
            frame.sensors.insert(
                sensor_id.to_string(),
                SensorReference {
                    timestamp,
                    uri: Some(uri),
                },
            );
        } else {
            self.warnings.push(
                WarningCode::DeprecatedUriAttribute,
                format!(
                    "'uri' attribute dropped: frame has no '{sensor_id}' reference and no timestamp"
                ),
                context.clone(),
            );
            return;
        }

        self.warnings.push(
            WarningCode::DeprecatedUriAttribute,
            format!("'uri' attribute moved to the frame's '{sensor_id}' sensor reference"),
            context.clone(),
        );
    }
}

fn stream_to_sensor(
    sensor_id: &str,
    stream: JsonStream,
    cs: JsonCoordinateSystem,
) -> Result<Sensor, String> {
    let locator = format!("$.openlabel.streams.{sensor_id}");
    let sensor_type: SensorType = stream
        .stream_type
        .parse()
        .map_err(|e| format!("{locator}.type: {e}"))?;
    let properties = stream.stream_properties.unwrap_or_default();

    let kind = match sensor_type {
        SensorType::Camera => {
            let intrinsics = properties.intrinsics_pinhole.ok_or_else(|| {
                format!("{locator}.stream_properties.intrinsics_pinhole: required for camera streams")
            })?;
            SensorKind::Camera {
                intrinsics: IntrinsicsPinhole {
                    camera_matrix: intrinsics.camera_matrix,
                    distortion: intrinsics.distortion_coeffs,
                    width_px: intrinsics.width_px,
                    height_px: intrinsics.height_px,
                },
            }
        }
        SensorType::Radar => {
            let intrinsics = properties.intrinsics_radar.ok_or_else(|| {
                format!("{locator}.stream_properties.intrinsics_radar: required for radar streams")
            })?;
            SensorKind::Radar {
                intrinsics: IntrinsicsRadar {
                    resolution_px_per_m: intrinsics.resolution_px_per_m,
                    width_px: intrinsics.width_px,
                    height_px: intrinsics.height_px,
                },
            }
        }
        SensorType::Lidar => SensorKind::Lidar,
        SensorType::GpsImu => SensorKind::GpsImu,
        SensorType::Other => SensorKind::Other,
    };

    Ok(Sensor {
        extrinsics: cs.pose_wrt_parent.map(|pose| {
            Transform::new(pose.translation.into(), pose.quaternion.into())
        }),
        uri: stream.uri,
        description: stream.description,
        kind,
    })
}

/// Parses a raw timestamp literal, quoted or not.
pub(crate) fn parse_timestamp(raw: &RawValue) -> Result<Timestamp, String> {
    let text = raw.get().trim();
    let literal = if text.starts_with('"') {
        serde_json::from_str::<String>(text).map_err(|e| e.to_string())?
    } else {
        text.to_string()
    };
    Timestamp::parse(&literal).map_err(|e| format!("invalid timestamp '{literal}': {e}"))
}

fn bbox_from_val(val: [f64; 4]) -> Geometry {
    let [x, y, width, height] = val;
    Geometry::Bbox(Bbox::new(Point2d::new(x, y), Size2d::new(width, height)))
}

fn cuboid_from_val(val: [f64; 10]) -> Geometry {
    let [x, y, z, qx, qy, qz, qw, sx, sy, sz] = val;
    Geometry::Cuboid(Cuboid::new(
        Point3d::new(x, y, z),
        Quaternion::new(qx, qy, qz, qw),
        Size3d::new(sx, sy, sz),
    ))
}

fn poly2d_from_val(json: JsonPoly2dVal) -> Result<Geometry, String> {
    if let Some(mode) = &json.mode {
        if mode != Poly2dMode::Absolute.as_str() {
            return Err(format!(
                "unsupported poly2d mode '{mode}' (expected {})",
                Poly2dMode::Absolute.as_str()
            ));
        }
    }
    if json.val.len() % 2 != 0 {
        return Err(format!(
            "poly2d val has {} numbers, expected a multiple of 2",
            json.val.len()
        ));
    }
    let points = json
        .val
        .chunks_exact(2)
        .map(|c| Point2d::new(c[0], c[1]))
        .collect();
    Ok(Geometry::Poly2d(Poly2d::new(points, json.closed)))
}

fn poly3d_from_val(json: JsonPoly3dVal) -> Result<Geometry, String> {
    if json.val.len() % 3 != 0 {
        return Err(format!(
            "poly3d val has {} numbers, expected a multiple of 3",
            json.val.len()
        ));
    }
    let points = json
        .val
        .chunks_exact(3)
        .map(|c| Point3d::new(c[0], c[1], c[2]))
        .collect();
    Ok(Geometry::Poly3d(Poly3d::new(points, json.closed)))
}

// ============================================================================
// Conversion: Scene -> OpenLABEL
// ============================================================================

fn metadata_to_json(metadata: &Metadata) -> JsonMetadata {
    JsonMetadata {
        schema_version: metadata.schema_version.clone(),
        name: metadata.name.clone(),
        subschema_version: metadata.subschema_version.clone(),
        exporter_version: metadata.exporter_version.clone(),
        file_version: metadata.file_version.clone(),
        tagged_file: metadata.tagged_file.clone(),
        annotator: metadata.annotator.clone(),
        comment: metadata.comment.clone(),
        additional: metadata.additional.clone(),
    }
}

fn transform_to_json(transform: &Transform) -> JsonTransform {
    JsonTransform {
        translation: transform.position.to_array(),
        quaternion: transform.quaternion.to_array(),
    }
}

fn sensor_to_stream(sensor: &Sensor) -> JsonStream {
    let stream_properties = match &sensor.kind {
        SensorKind::Camera { intrinsics } => Some(JsonStreamProperties {
            intrinsics_pinhole: Some(JsonIntrinsicsPinhole {
                camera_matrix: intrinsics.camera_matrix,
                distortion_coeffs: intrinsics.distortion,
                width_px: intrinsics.width_px,
                height_px: intrinsics.height_px,
            }),
            intrinsics_radar: None,
        }),
        SensorKind::Radar { intrinsics } => Some(JsonStreamProperties {
            intrinsics_pinhole: None,
            intrinsics_radar: Some(JsonIntrinsicsRadar {
                resolution_px_per_m: intrinsics.resolution_px_per_m,
                width_px: intrinsics.width_px,
                height_px: intrinsics.height_px,
            }),
        }),
        SensorKind::Lidar | SensorKind::GpsImu | SensorKind::Other => None,
    };
    JsonStream {
        stream_type: sensor.sensor_type().as_str().to_string(),
        uri: sensor.uri.clone(),
        description: sensor.description.clone(),
        stream_properties,
    }
}

fn intervals_to_json(intervals: &[FrameInterval]) -> Vec<JsonFrameInterval> {
    intervals
        .iter()
        .map(|interval| JsonFrameInterval {
            frame_start: interval.start,
            frame_end: interval.end,
        })
        .collect()
}

fn object_to_json(object: &Object, derived: ObjectPointers) -> JsonObject {
    JsonObject {
        name: object.name.clone(),
        object_type: object.object_type.clone(),
        frame_intervals: intervals_to_json(&derived.frame_intervals),
        object_data_pointers: derived
            .object_data_pointers
            .into_iter()
            .map(|(name, pointer)| {
                let json = JsonElementDataPointer {
                    kind: pointer.kind.json_tag().to_string(),
                    frame_intervals: intervals_to_json(&pointer.frame_intervals),
                    attribute_pointers: pointer
                        .attribute_pointers
                        .into_iter()
                        .map(|(attribute, kind)| (attribute, kind.as_str().to_string()))
                        .collect(),
                };
                (name, json)
            })
            .collect(),
    }
}

/// Renders a timestamp as a JSON string literal.
fn timestamp_to_raw(timestamp: &Timestamp, path: &Path) -> Result<Box<RawValue>, RaillabelError> {
    serde_json::to_string(&timestamp.to_string())
        .and_then(RawValue::from_string)
        .map_err(|source| RaillabelError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn frame_to_json(scene: &Scene, frame: &Frame, path: &Path) -> Result<JsonFrame, RaillabelError> {
    let mut properties = JsonFrameProperties {
        timestamp: frame
            .timestamp
            .as_ref()
            .map(|ts| timestamp_to_raw(ts, path))
            .transpose()?,
        ..Default::default()
    };

    for (sensor_id, reference) in &frame.sensors {
        let sync = JsonSync {
            timestamp: Some(timestamp_to_raw(&reference.timestamp, path)?),
        };
        properties.streams.insert(
            sensor_id.clone(),
            JsonFrameStream {
                stream_properties: Some(JsonFrameStreamProperties { sync: Some(sync) }),
                stream_sync: None,
                uri: reference.uri.clone(),
            },
        );
    }

    if !frame.frame_data.is_empty() {
        let num = frame
            .frame_data
            .iter()
            .map(|(name, num)| JsonNum {
                uid: num.uid.map(|uid| uid.to_string()),
                name: name.clone(),
                val: num.val,
                coordinate_system: num.sensor_id.clone(),
            })
            .collect();
        properties.frame_data = Some(JsonFrameData { num });
    }

    let mut objects = Entries::default();
    for (object_id, annotations) in frame.object_view() {
        let object_type = scene.object_type(&object_id).unwrap_or_default();
        let mut data = JsonObjectData::default();
        for (annotation_id, annotation) in annotations {
            push_annotation(&mut data, annotation_id, annotation, object_type)?;
        }
        objects.push(object_id.to_string(), JsonFrameObject { object_data: data });
    }

    Ok(JsonFrame {
        frame_properties: (!properties.is_empty()).then_some(properties),
        objects,
    })
}

fn push_annotation(
    data: &mut JsonObjectData,
    annotation_id: AnnotationId,
    annotation: &Annotation,
    object_type: &str,
) -> Result<(), RaillabelError> {
    let envelope = JsonAnnotation {
        uid: Some(annotation_id.to_string()),
        name: Some(annotation.name(object_type)),
        geometry: (),
        coordinate_system: annotation.sensor_id.clone(),
        attributes: encode_attributes(&annotation.attributes)?,
    };

    match &annotation.geometry {
        Geometry::Bbox(bbox) => data.bbox.push(envelope.with_geometry(JsonBboxVal {
            val: [bbox.pos.x, bbox.pos.y, bbox.size.x, bbox.size.y],
        })),
        Geometry::Cuboid(cuboid) => {
            let (p, q, s) = (cuboid.pos, cuboid.quat, cuboid.size);
            data.cuboid.push(envelope.with_geometry(JsonCuboidVal {
                val: [p.x, p.y, p.z, q.x, q.y, q.z, q.w, s.x, s.y, s.z],
            }))
        }
        Geometry::Poly2d(poly) => data.poly2d.push(envelope.with_geometry(JsonPoly2dVal {
            val: poly.points.iter().flat_map(|p| [p.x, p.y]).collect(),
            closed: poly.closed,
            mode: Some(poly.mode.as_str().to_string()),
        })),
        Geometry::Poly3d(poly) => data.poly3d.push(envelope.with_geometry(JsonPoly3dVal {
            val: poly.points.iter().flat_map(|p| p.to_array()).collect(),
            closed: poly.closed,
        })),
        Geometry::Seg3d(seg) => data.vec.push(envelope.with_geometry(JsonVecVal {
            val: seg.point_ids.clone(),
        })),
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
