//! Reader for the understand.ai `trains_4` export format.
//!
//! This is the predecessor of the OpenLABEL files. A document looks like:
//!
//! ```json
//! {
//!   "metadata": {"project_id": "trains_4", "clip_id": "...", ...},
//!   "coordinateSystems": [
//!     {"coordinate_system_id": "rgb_middle", "topic": "/rgb/image",
//!      "position": [x, y, z], "rotation_quaternion": [x, y, z, w],
//!      "camera_matrix": [9 numbers], "dist_coeffs": [5 numbers]}
//!   ],
//!   "frames": [
//!     {"frameId": "000", "timestamp": "1632321743.100000072",
//!      "annotations": {"2D_BOUNDING_BOX": [...], "3D_BOUNDING_BOX": [...], ...}}
//!   ]
//! }
//! ```
//!
//! Documents are converted into OpenLABEL mirror records and then read by
//! the OpenLABEL reader, so both dialects share one set of rules. Sensor
//! ids are renamed and typed through the bundled translation table
//! `resources/understand_ai_sensors.json`.
//!
//! # Conversions
//!
//! - 2D boxes are given as `xMin/yMin/xMax/yMax` and become centre + size.
//! - 2D polylines and polygons become open and closed `poly2d`.
//! - 3D boxes keep centre, quaternion and `width/length/height` as size.
//! - 3D segmentations become `vec` point lists.
//! - Objects are named `{class}_{first four characters of the UUID}`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;

use super::attributes::encode_attributes;
use super::entries::Entries;
use super::openlabel_json::{
    JsonAnnotation, JsonBboxVal, JsonCoordinateSystem, JsonCuboidVal, JsonFrame,
    JsonFrameObject, JsonFrameProperties, JsonFrameStream, JsonFrameStreamProperties,
    JsonIntrinsicsPinhole, JsonIntrinsicsRadar, JsonMetadata, JsonObject, JsonObjectData,
    JsonOpenLabel, JsonPoly2dVal, JsonStream, JsonStreamProperties, JsonSync, JsonTransform,
    JsonVecVal, BASE_COORDINATE_SYSTEM,
};
use crate::error::RaillabelError;
use crate::model::{
    is_identifier, AttributeValue, Attributes, IntrinsicsPinhole, Poly2dMode, SensorType,
    METADATA_KEYS, SCHEMA_VERSION,
};
use crate::warnings::{WarningCode, WarningContext, Warnings};

/// `metadata.project_id` of documents this reader accepts.
pub const PROJECT_ID: &str = "trains_4";

static SENSOR_TABLE: LazyLock<SensorTable> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../../resources/understand_ai_sensors.json"))
        .expect("bundled sensor table is valid")
});

/// Translation of understand.ai coordinate system ids.
#[derive(Debug, Deserialize)]
struct SensorTable {
    sensors: HashMap<String, SensorTranslation>,
}

#[derive(Debug, Deserialize)]
struct SensorTranslation {
    id: String,
    #[serde(rename = "type")]
    sensor_type: SensorType,
    #[serde(default)]
    width_px: u32,
    #[serde(default)]
    height_px: u32,
    #[serde(default)]
    resolution_px_per_m: f64,
}

/// Returns true if the document carries the markers of a `trains_4` export.
pub(crate) fn is_understand_ai(document: &Value) -> bool {
    document.pointer("/metadata/project_id").and_then(Value::as_str) == Some(PROJECT_ID)
        && document.get("coordinateSystems").is_some()
        && document.get("frames").is_some()
}

/// Maps an understand.ai sensor id to its OpenLABEL id.
pub fn translate_sensor_id(sensor_id: &str) -> String {
    SENSOR_TABLE
        .sensors
        .get(sensor_id)
        .map(|t| t.id.clone())
        .unwrap_or_else(|| sensor_id.to_string())
}

// ============================================================================
// understand.ai Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Deserialize)]
struct UaiDocument {
    metadata: IndexMap<String, Value>,

    #[serde(rename = "coordinateSystems")]
    coordinate_systems: Vec<UaiCoordinateSystem>,

    frames: Vec<UaiFrame>,
}

#[derive(Debug, Deserialize)]
struct UaiCoordinateSystem {
    coordinate_system_id: String,

    #[serde(default)]
    topic: Option<String>,

    #[serde(default)]
    position: [f64; 3],

    #[serde(default = "identity_quaternion")]
    rotation_quaternion: [f64; 4],

    /// Row-major 3x3 matrix.
    #[serde(default)]
    camera_matrix: Option<[f64; 9]>,

    #[serde(default)]
    dist_coeffs: Option<[f64; 5]>,
}

fn identity_quaternion() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

#[derive(Debug, Deserialize)]
struct UaiFrame {
    #[serde(rename = "frameId")]
    frame_id: UaiFrameId,

    #[serde(default)]
    timestamp: Option<Box<RawValue>>,

    /// Annotation lists by kind; decoded per kind so raw timestamps survive.
    #[serde(default)]
    annotations: IndexMap<String, Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UaiFrameId {
    Text(String),
    Number(u64),
}

impl UaiFrameId {
    fn into_key(self) -> String {
        match self {
            UaiFrameId::Text(text) => text,
            UaiFrameId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UaiAnnotation<G> {
    id: String,

    #[serde(rename = "objectId")]
    object_id: String,

    #[serde(rename = "className")]
    class_name: String,

    geometry: G,

    #[serde(default)]
    attributes: IndexMap<String, Value>,

    sensor: UaiSensorReference,
}

#[derive(Debug, Deserialize)]
struct UaiSensorReference {
    #[serde(rename = "type")]
    sensor_id: String,

    #[serde(default)]
    uri: Option<String>,

    #[serde(default)]
    timestamp: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
struct UaiBox2d {
    #[serde(rename = "xMin")]
    x_min: f64,
    #[serde(rename = "yMin")]
    y_min: f64,
    #[serde(rename = "xMax")]
    x_max: f64,
    #[serde(rename = "yMax")]
    y_max: f64,
}

#[derive(Debug, Deserialize)]
struct UaiPoints2d {
    points: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct UaiBox3d {
    center: UaiXyz,
    size: UaiSize3d,
    quaternion: UaiQuaternion,
}

#[derive(Debug, Deserialize)]
struct UaiXyz {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Deserialize)]
struct UaiSize3d {
    width: f64,
    length: f64,
    height: f64,
}

#[derive(Debug, Deserialize)]
struct UaiQuaternion {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

#[derive(Debug, Deserialize)]
struct UaiSegmentation {
    #[serde(rename = "associatedPoints")]
    associated_points: Vec<u64>,
}

// ============================================================================
// Conversion: understand.ai -> OpenLABEL records
// ============================================================================

/// Parses a `trains_4` document into OpenLABEL mirror records.
pub(crate) fn read_slice(
    bytes: &[u8],
    path: &Path,
    warnings: &mut Warnings,
) -> Result<JsonOpenLabel, RaillabelError> {
    let document: UaiDocument =
        serde_json::from_slice(bytes).map_err(|e| RaillabelError::schema(path, format!("$: {e}")))?;

    let (coordinate_systems, streams) = convert_sensors(document.coordinate_systems);
    let mut converter = FrameConverter {
        path,
        warnings,
        objects: Entries::default(),
    };
    let mut frames = Entries::default();
    for (index, frame) in document.frames.into_iter().enumerate() {
        let key = frame.frame_id.into_key();
        let json = converter.convert_frame(index, &key, frame.timestamp, frame.annotations)?;
        frames.push(key, json);
    }

    Ok(JsonOpenLabel {
        metadata: convert_metadata(document.metadata),
        coordinate_systems,
        streams,
        objects: converter.objects,
        frames,
        frame_intervals: Vec::new(),
    })
}

/// Keeps the export's identifying fields as additional metadata.
fn convert_metadata(fields: IndexMap<String, Value>) -> JsonMetadata {
    let mut metadata = JsonMetadata {
        schema_version: SCHEMA_VERSION.to_string(),
        ..Default::default()
    };
    for (key, value) in fields {
        match value {
            Value::String(version) if key == "exporter_version" => {
                metadata.exporter_version = Some(version);
            }
            value if is_identifier(&key) && !METADATA_KEYS.contains(&key.as_str()) => {
                metadata.additional.insert(key, value);
            }
            _ => {}
        }
    }
    metadata
}

fn convert_sensors(
    coordinate_systems: Vec<UaiCoordinateSystem>,
) -> (
    IndexMap<String, JsonCoordinateSystem>,
    IndexMap<String, JsonStream>,
) {
    let mut json_systems = IndexMap::new();
    let mut streams = IndexMap::new();
    if coordinate_systems.is_empty() {
        return (json_systems, streams);
    }

    json_systems.insert(
        BASE_COORDINATE_SYSTEM.to_string(),
        JsonCoordinateSystem {
            cs_type: "local".to_string(),
            parent: String::new(),
            children: Vec::new(),
            pose_wrt_parent: None,
        },
    );

    for cs in coordinate_systems {
        let translation = SENSOR_TABLE.sensors.get(&cs.coordinate_system_id);
        let sensor_id = translate_sensor_id(&cs.coordinate_system_id);
        let sensor_type = translation
            .map(|t| t.sensor_type)
            .unwrap_or_else(|| SensorType::from_id_prefix(&cs.coordinate_system_id));
        let (width_px, height_px) = translation.map_or((0, 0), |t| (t.width_px, t.height_px));

        let stream_properties = match sensor_type {
            SensorType::Camera => {
                let intrinsics = IntrinsicsPinhole::from_3x3(
                    cs.camera_matrix.unwrap_or([0.0; 9]),
                    cs.dist_coeffs.unwrap_or([0.0; 5]),
                    width_px,
                    height_px,
                );
                Some(JsonStreamProperties {
                    intrinsics_pinhole: Some(JsonIntrinsicsPinhole {
                        camera_matrix: intrinsics.camera_matrix,
                        distortion_coeffs: intrinsics.distortion,
                        width_px,
                        height_px,
                    }),
                    intrinsics_radar: None,
                })
            }
            SensorType::Radar => Some(JsonStreamProperties {
                intrinsics_pinhole: None,
                intrinsics_radar: Some(JsonIntrinsicsRadar {
                    resolution_px_per_m: translation.map_or(0.0, |t| t.resolution_px_per_m),
                    width_px,
                    height_px,
                }),
            }),
            SensorType::Lidar | SensorType::GpsImu | SensorType::Other => None,
        };

        if let Some(base) = json_systems.get_mut(BASE_COORDINATE_SYSTEM) {
            base.children.push(sensor_id.clone());
        }
        json_systems.insert(
            sensor_id.clone(),
            JsonCoordinateSystem {
                cs_type: "sensor".to_string(),
                parent: BASE_COORDINATE_SYSTEM.to_string(),
                children: Vec::new(),
                pose_wrt_parent: Some(JsonTransform {
                    translation: cs.position,
                    quaternion: cs.rotation_quaternion,
                }),
            },
        );
        streams.insert(
            sensor_id,
            JsonStream {
                stream_type: sensor_type.as_str().to_string(),
                uri: cs.topic,
                description: None,
                stream_properties,
            },
        );
    }

    (json_systems, streams)
}

struct FrameConverter<'a> {
    path: &'a Path,
    warnings: &'a mut Warnings,
    /// Objects in order of first appearance.
    objects: Entries<JsonObject>,
}

/// Annotations of one frame being assembled, by object UUID.
#[derive(Default)]
struct FrameParts {
    streams: IndexMap<String, JsonFrameStream>,
    objects: IndexMap<String, JsonObjectData>,
}

impl FrameConverter<'_> {
    fn convert_frame(
        &mut self,
        index: usize,
        key: &str,
        timestamp: Option<Box<RawValue>>,
        annotations: IndexMap<String, Box<RawValue>>,
    ) -> Result<JsonFrame, RaillabelError> {
        let mut parts = FrameParts::default();

        for (tag, raw) in annotations {
            let locator = format!("$.frames[{index}].annotations.{tag}");
            match tag.as_str() {
                "2D_BOUNDING_BOX" => {
                    for a in self.decode::<UaiBox2d>(&raw, &locator)? {
                        let g = &a.geometry;
                        let val = JsonBboxVal {
                            val: [
                                (g.x_min + g.x_max) / 2.0,
                                (g.y_min + g.y_max) / 2.0,
                                g.x_max - g.x_min,
                                g.y_max - g.y_min,
                            ],
                        };
                        let (object_id, annotation) = self.envelope(key, a, val)?;
                        parts.objects.entry(object_id).or_default().bbox.push(annotation);
                    }
                }
                "2D_POLYLINE" | "2D_POLYGON" => {
                    let closed = tag == "2D_POLYGON";
                    for a in self.decode::<UaiPoints2d>(&raw, &locator)? {
                        let val = JsonPoly2dVal {
                            val: a.geometry.points.iter().flatten().copied().collect(),
                            closed,
                            mode: Some(Poly2dMode::Absolute.as_str().to_string()),
                        };
                        let (object_id, annotation) = self.envelope(key, a, val)?;
                        parts.objects.entry(object_id).or_default().poly2d.push(annotation);
                    }
                }
                "3D_BOUNDING_BOX" => {
                    for a in self.decode::<UaiBox3d>(&raw, &locator)? {
                        let g = &a.geometry;
                        let val = JsonCuboidVal {
                            val: [
                                g.center.x,
                                g.center.y,
                                g.center.z,
                                g.quaternion.x,
                                g.quaternion.y,
                                g.quaternion.z,
                                g.quaternion.w,
                                g.size.width,
                                g.size.length,
                                g.size.height,
                            ],
                        };
                        let (object_id, annotation) = self.envelope(key, a, val)?;
                        parts.objects.entry(object_id).or_default().cuboid.push(annotation);
                    }
                }
                "3D_SEGMENTATION" => {
                    for a in self.decode::<UaiSegmentation>(&raw, &locator)? {
                        let val = JsonVecVal {
                            val: a.geometry.associated_points.clone(),
                        };
                        let (object_id, annotation) = self.envelope(key, a, val)?;
                        parts.objects.entry(object_id).or_default().vec.push(annotation);
                    }
                }
                _ => {
                    self.warnings.push(
                        WarningCode::UnsupportedAnnotationKind,
                        format!("annotation kind '{tag}' is not supported; skipped"),
                        WarningContext::Frame { id: key.to_string() },
                    );
                    continue;
                }
            }
            self.collect_sensor_references(&raw, &locator, &mut parts)?;
        }

        let properties = JsonFrameProperties {
            timestamp,
            streams: parts.streams,
            frame_data: None,
        };
        let mut objects = Entries::default();
        for (object_id, object_data) in parts.objects {
            objects.push(object_id, JsonFrameObject { object_data });
        }
        Ok(JsonFrame {
            frame_properties: Some(properties),
            objects,
        })
    }

    fn decode<G: DeserializeOwned>(
        &self,
        raw: &RawValue,
        locator: &str,
    ) -> Result<Vec<UaiAnnotation<G>>, RaillabelError> {
        serde_json::from_str(raw.get())
            .map_err(|e| RaillabelError::schema(self.path, format!("{locator}: {e}")))
    }

    /// Records the first sensor reference per sensor in the frame.
    ///
    /// Runs on the raw list again so sync timestamps never pass through a
    /// float.
    fn collect_sensor_references(
        &self,
        raw: &RawValue,
        locator: &str,
        parts: &mut FrameParts,
    ) -> Result<(), RaillabelError> {
        #[derive(Deserialize)]
        struct SensorOnly {
            sensor: UaiSensorReference,
        }

        let entries: Vec<SensorOnly> = serde_json::from_str(raw.get())
            .map_err(|e| RaillabelError::schema(self.path, format!("{locator}: {e}")))?;
        for entry in entries {
            let sensor_id = translate_sensor_id(&entry.sensor.sensor_id);
            if parts.streams.contains_key(&sensor_id) {
                continue;
            }
            let stream = JsonFrameStream {
                stream_properties: Some(JsonFrameStreamProperties {
                    sync: Some(JsonSync {
                        timestamp: entry.sensor.timestamp,
                    }),
                }),
                stream_sync: None,
                uri: entry.sensor.uri,
            };
            parts.streams.insert(sensor_id, stream);
        }
        Ok(())
    }

    /// Builds the OpenLABEL envelope and registers the object.
    fn envelope<G, V>(
        &mut self,
        frame_key: &str,
        annotation: UaiAnnotation<G>,
        val: V,
    ) -> Result<(String, JsonAnnotation<V>), RaillabelError> {
        if !self.objects.0.iter().any(|(id, _)| *id == annotation.object_id) {
            let prefix: String = annotation.object_id.chars().take(4).collect();
            self.objects.push(
                annotation.object_id.clone(),
                JsonObject {
                    name: format!("{}_{prefix}", annotation.class_name),
                    object_type: annotation.class_name.clone(),
                    frame_intervals: Vec::new(),
                    object_data_pointers: Default::default(),
                },
            );
        }

        let mut attributes = Attributes::new();
        for (name, value) in annotation.attributes {
            match AttributeValue::from_json(&value) {
                Some(value) => {
                    attributes.insert(name, value);
                }
                None => self.warnings.push(
                    WarningCode::UnsupportedAttributeType,
                    format!("attribute '{name}' of annotation {} has an unsupported type; dropped", annotation.id),
                    WarningContext::Frame {
                        id: frame_key.to_string(),
                    },
                ),
            }
        }

        let json = JsonAnnotation {
            uid: Some(annotation.id),
            name: None,
            geometry: val,
            coordinate_system: Some(translate_sensor_id(&annotation.sensor.sensor_id)),
            attributes: encode_attributes(&attributes)?,
        };
        Ok((annotation.object_id, json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensor_table_translates_ids() {
        assert_eq!(translate_sensor_id("rgb_middle"), "rgb_center");
        assert_eq!(translate_sensor_id("LIDAR"), "lidar");
        assert_eq!(translate_sensor_id("thermal_9"), "thermal_9");
    }

    #[test]
    fn test_detects_trains_4_documents() {
        assert!(is_understand_ai(&json!({
            "metadata": {"project_id": "trains_4"},
            "coordinateSystems": [],
            "frames": []
        })));
        assert!(!is_understand_ai(&json!({
            "metadata": {"project_id": "trains_3"},
            "coordinateSystems": [],
            "frames": []
        })));
        assert!(!is_understand_ai(&json!({"metadata": {"project_id": "trains_4"}})));
    }

    #[test]
    fn test_metadata_fields_become_additional() {
        let metadata = convert_metadata(
            serde_json::from_value(json!({
                "project_id": "trains_4",
                "clip_id": "abc",
                "exporter_version": "1.2",
                "not-an-identifier": 1,
                "name": "shadows a dedicated field"
            }))
            .unwrap(),
        );
        assert_eq!(metadata.schema_version, "1.0.0");
        assert_eq!(metadata.exporter_version.as_deref(), Some("1.2"));
        assert_eq!(
            metadata.additional.keys().collect::<Vec<_>>(),
            vec!["project_id", "clip_id"]
        );
    }

    #[test]
    fn test_sensor_reference_errors_are_reported() {
        let mut warnings = Warnings::new();
        let converter = FrameConverter {
            path: Path::new("<test>"),
            warnings: &mut warnings,
            objects: Entries::default(),
        };
        let raw = RawValue::from_string(r#"[{"id": "a", "geometry": {}}]"#.to_string()).unwrap();
        let mut parts = FrameParts::default();

        let err = converter
            .collect_sensor_references(&raw, "$.frames[0].annotations.2D_BOUNDING_BOX", &mut parts)
            .unwrap_err();
        assert!(matches!(err, RaillabelError::Schema { .. }));
        assert!(err.to_string().contains("missing field `sensor`"));
        assert!(parts.streams.is_empty());
    }

    #[test]
    fn test_unknown_sensor_gets_zeroed_intrinsics() {
        let (systems, streams) = convert_sensors(vec![UaiCoordinateSystem {
            coordinate_system_id: "rgb_unknown".into(),
            topic: None,
            position: [1.0, 2.0, 3.0],
            rotation_quaternion: identity_quaternion(),
            camera_matrix: None,
            dist_coeffs: None,
        }]);
        assert_eq!(systems["base"].children, vec!["rgb_unknown".to_string()]);
        let intrinsics = streams["rgb_unknown"]
            .stream_properties
            .as_ref()
            .and_then(|p| p.intrinsics_pinhole.as_ref())
            .unwrap();
        assert_eq!(intrinsics.camera_matrix, [0.0; 12]);
        assert_eq!(intrinsics.width_px, 0);
    }
}
