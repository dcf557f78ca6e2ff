//! Import of understand.ai `trains_4` exports.

use std::path::Path;

use raillabel::model::{AnnotationId, AttributeValue, Geometry, SensorKind, Timestamp};
use raillabel::{SaveOptions, WarningCode, Warnings};
use uuid::Uuid;

const SAMPLE: &str = "tests/fixtures/understand_ai_scene.json";

fn annotation_id(text: &str) -> AnnotationId {
    AnnotationId::new(Uuid::parse_str(text).unwrap())
}

fn ts(literal: &str) -> Timestamp {
    literal.parse().unwrap()
}

#[test]
fn sensors_are_renamed_and_typed() {
    let scene = raillabel::load(Path::new(SAMPLE), &mut Warnings::new()).unwrap();

    assert_eq!(scene.sensors.keys().collect::<Vec<_>>(), vec!["rgb_center", "lidar"]);
    let SensorKind::Camera { intrinsics } = &scene.sensors["rgb_center"].kind else {
        panic!("rgb_center should be a camera");
    };
    assert_eq!((intrinsics.width_px, intrinsics.height_px), (2464, 1600));
    assert_eq!(intrinsics.camera_matrix[0], 4609.5);
    assert_eq!(intrinsics.camera_matrix[3], 0.0);
    assert_eq!(intrinsics.camera_matrix[6], 820.5);
    assert!(matches!(scene.sensors["lidar"].kind, SensorKind::Lidar));

    let extrinsics = scene.sensors["lidar"].extrinsics.as_ref().unwrap();
    assert_eq!(extrinsics.position.z, 3.5);
}

#[test]
fn metadata_keeps_identifying_fields() {
    let scene = raillabel::load(Path::new(SAMPLE), &mut Warnings::new()).unwrap();

    assert_eq!(scene.metadata.schema_version, "1.0.0");
    assert_eq!(scene.metadata.exporter_version.as_deref(), Some("1.0.0"));
    assert_eq!(scene.metadata.additional["project_id"], "trains_4");
    assert_eq!(
        scene.metadata.additional["clip_id"],
        "db_3_2021-09-22-14-28-01_2021-09-22-14-44-03"
    );
}

#[test]
fn frames_and_objects_are_converted() {
    let mut warnings = Warnings::new();
    let scene = raillabel::load(Path::new(SAMPLE), &mut warnings).unwrap();

    assert_eq!(scene.frames.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    let names: Vec<_> = scene.objects.values().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["person_b40b", "train_6fe5"]);

    let frame = &scene.frames[&0];
    assert_eq!(frame.timestamp, Some(ts("1632321743.100000072")));
    assert_eq!(frame.sensors["lidar"].timestamp, ts("1632321743.134149219"));
    assert_eq!(
        frame.sensors["rgb_center"].uri.as_deref(),
        Some("/S1206063/000_1632321743.100000072.png")
    );

    let bbox = &frame.annotations[&annotation_id("78f0ad89-2750-4a30-9d66-44c9da73a714")];
    let Geometry::Bbox(geometry) = &bbox.geometry else {
        panic!("expected a bbox");
    };
    assert_eq!((geometry.pos.x, geometry.pos.y), (1350.5, 820.0));
    assert_eq!((geometry.size.x, geometry.size.y), (42.0, 118.5));
    assert_eq!(bbox.attributes["occlusion"], AttributeValue::from("0-25 %"));
    assert_eq!(bbox.attributes["isDummy"], AttributeValue::from(false));
    assert!(!bbox.attributes.contains_key("connectedTo"));
    assert_eq!(bbox.sensor_id.as_deref(), Some("rgb_center"));
}

#[test]
fn polygons_and_segmentations() {
    let scene = raillabel::load(Path::new(SAMPLE), &mut Warnings::new()).unwrap();
    let frame = &scene.frames[&1];

    let polygon = &frame.annotations[&annotation_id("3e8f1a2b-7c4d-4e5f-a6b7-c8d9e0f1a2b3")];
    let Geometry::Poly2d(poly) = &polygon.geometry else {
        panic!("expected a poly2d");
    };
    assert!(poly.closed);
    assert_eq!(poly.points.len(), 3);

    let segmentation = &frame.annotations[&annotation_id("0c9e7b51-8a34-4f2d-9e61-7d5b3a2c1f08")];
    let Geometry::Seg3d(seg) = &segmentation.geometry else {
        panic!("expected a seg3d");
    };
    assert_eq!(seg.point_ids, vec![1021, 1022, 1023]);
}

#[test]
fn sensor_reference_without_timestamp_inherits_frame_timestamp() {
    let scene = raillabel::load(Path::new(SAMPLE), &mut Warnings::new()).unwrap();
    let frame = &scene.frames[&1];
    assert_eq!(frame.sensors["rgb_center"].timestamp, ts("1632321743.200000072"));
    assert_eq!(frame.sensors["lidar"].timestamp, ts("1632321743.234149219"));
}

#[test]
fn unsupported_content_is_reported() {
    let mut warnings = Warnings::new();
    raillabel::load(Path::new(SAMPLE), &mut warnings).unwrap();

    assert_eq!(warnings.count(WarningCode::UnsupportedAttributeType), 1);
    assert_eq!(warnings.count(WarningCode::UnsupportedAnnotationKind), 1);
    assert_eq!(warnings.len(), 2);
}

#[test]
fn converted_scene_saves_as_openlabel() {
    let scene = raillabel::load(Path::new(SAMPLE), &mut Warnings::new()).unwrap();

    let json = raillabel::to_string(&scene, &SaveOptions::default(), &mut Warnings::new()).unwrap();
    assert!(json.starts_with(r#"{"openlabel":"#));

    let mut warnings = Warnings::new();
    let reloaded = raillabel::from_str(&json, &mut warnings).unwrap();
    assert_eq!(reloaded, scene);
    assert!(warnings.is_empty());
}

#[test]
fn unknown_documents_are_rejected() {
    let err = raillabel::from_str(
        r#"{"metadata": {"project_id": "trains_3"}, "coordinateSystems": [], "frames": []}"#,
        &mut Warnings::new(),
    )
    .unwrap_err();
    assert!(matches!(err, raillabel::RaillabelError::UnsupportedFormat { .. }));
}
