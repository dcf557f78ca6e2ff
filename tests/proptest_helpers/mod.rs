#![allow(dead_code)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use raillabel::model::{
    Annotation, AnnotationId, AnnotationKind, AttributeValue, Attributes, Bbox, Cuboid, Frame,
    Geometry, Num, Object, ObjectId, Point2d, Point3d, Poly2d, Poly3d, Quaternion, Scene, Seg3d,
    Sensor, SensorReference, SensorType, Size2d, Size3d, Timestamp,
};
use serde_json::Value;
use uuid::Uuid;

pub const SENSOR_POOL: [&str; 5] = ["rgb_center", "ir_left", "lidar", "radar_front", "gps_imu"];
pub const OBJECT_TYPES: [&str; 4] = ["person", "train", "signal", "track"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn assert_valid_references(scene: &Scene) -> Result<(), String> {
    let issues = scene.integrity_issues();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues.join("\n"))
    }
}

/// Frame ids and annotation ids of a scene, for subset checks.
pub fn contents(scene: &Scene) -> (BTreeSet<u64>, BTreeSet<(u64, AnnotationId)>) {
    let frames = scene.frames.keys().copied().collect();
    let annotations = scene.annotations().map(|(frame, id, _)| (frame, id)).collect();
    (frames, annotations)
}

/// A scene with 1-5 sensors, 1-`max_objects` objects and up to
/// `max_frames` frames of up to `max_anns` annotations each.
///
/// Every reference is valid and every float is a multiple of 1/8, so the
/// scene survives a JSON round trip exactly.
pub fn arb_scene(max_objects: usize, max_frames: usize, max_anns: usize) -> BoxedStrategy<Scene> {
    assert!(max_objects > 0, "max_objects must be > 0");

    (
        proptest::sample::subsequence(SENSOR_POOL.to_vec(), 1..=SENSOR_POOL.len()),
        proptest::collection::vec(0..OBJECT_TYPES.len(), 1..=max_objects),
        proptest::collection::btree_map(0u64..40, frame_seed_strategy(max_anns), 0..=max_frames),
    )
        .prop_map(|(sensors, object_types, frames)| build_scene(sensors, object_types, frames))
        .boxed()
}

pub fn arb_attribute_value() -> BoxedStrategy<AttributeValue> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(AttributeValue::Text),
        any::<bool>().prop_map(AttributeValue::Bool),
        any::<i32>().prop_map(|n| AttributeValue::from(i64::from(n))),
        (-1000i32..1000).prop_filter_map("finite", |n| AttributeValue::from_f64(eighths(n))),
        proptest::collection::vec(primitive_strategy(), 0..4).prop_map(AttributeValue::Vec),
    ]
    .boxed()
}

pub fn arb_attributes() -> BoxedStrategy<Attributes> {
    // 'u' is left out so the deprecated `uri` attribute never appears.
    proptest::collection::btree_map("[a-t]{1,6}", arb_attribute_value(), 0..3).boxed()
}

pub fn arb_annotation_kinds() -> BoxedStrategy<Vec<AnnotationKind>> {
    proptest::sample::subsequence(
        vec![
            AnnotationKind::Bbox,
            AnnotationKind::Cuboid,
            AnnotationKind::Poly2d,
            AnnotationKind::Poly3d,
            AnnotationKind::Seg3d,
        ],
        0..=5,
    )
    .boxed()
}

#[derive(Clone, Debug)]
struct FrameSeed {
    timestamp: Option<(u32, u32)>,
    /// Per sensor slot: referenced, own sync timestamp, uri.
    references: Vec<(bool, Option<u32>, bool)>,
    nums: Vec<(String, i32, Option<usize>, bool)>,
    annotations: Vec<AnnSeed>,
}

#[derive(Clone, Debug)]
struct AnnSeed {
    sensor: usize,
    object: usize,
    kind: u8,
    coords: Vec<i32>,
    closed: bool,
    attributes: Attributes,
}

fn frame_seed_strategy(max_anns: usize) -> impl Strategy<Value = FrameSeed> {
    (
        proptest::option::of((1_600_000_000u32..1_700_000_000, 0u32..1_000_000_000)),
        proptest::collection::vec(
            (any::<bool>(), proptest::option::of(0u32..1_000_000_000), any::<bool>()),
            SENSOR_POOL.len(),
        ),
        proptest::collection::vec(
            (
                "[a-z]{1,6}",
                -8000i32..8000,
                proptest::option::of(0usize..SENSOR_POOL.len()),
                any::<bool>(),
            ),
            0..3,
        ),
        proptest::collection::vec(ann_seed_strategy(), 0..=max_anns),
    )
        .prop_map(|(timestamp, references, nums, annotations)| FrameSeed {
            timestamp,
            references,
            nums,
            annotations,
        })
}

fn ann_seed_strategy() -> impl Strategy<Value = AnnSeed> {
    (
        any::<u16>(),
        any::<u16>(),
        0u8..5,
        proptest::collection::vec(-8000i32..8000, 10..=16),
        any::<bool>(),
        arb_attributes(),
    )
        .prop_map(|(sensor, object, kind, coords, closed, attributes)| AnnSeed {
            sensor: usize::from(sensor),
            object: usize::from(object),
            kind,
            coords,
            closed,
            attributes,
        })
}

fn primitive_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i16>().prop_map(Value::from),
        "[a-z]{0,5}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

fn eighths(n: i32) -> f64 {
    f64::from(n) / 8.0
}

fn timestamp(seconds: u32, nanos: u32) -> Timestamp {
    Timestamp::parse(&format!("{seconds}.{nanos:09}")).expect("valid timestamp literal")
}

fn build_scene(
    sensor_ids: Vec<&str>,
    object_types: Vec<usize>,
    frame_seeds: std::collections::BTreeMap<u64, FrameSeed>,
) -> Scene {
    let mut scene = Scene::default();
    for sensor_id in &sensor_ids {
        scene.sensors.insert(
            sensor_id.to_string(),
            Sensor::of_type(SensorType::from_id_prefix(sensor_id)),
        );
    }

    let mut object_ids = Vec::with_capacity(object_types.len());
    for (idx, type_idx) in object_types.into_iter().enumerate() {
        let object_type = OBJECT_TYPES[type_idx];
        let id = ObjectId::new(Uuid::from_u128(0x0b1e_c700_0000 + idx as u128));
        scene
            .objects
            .insert(id, Object::new(format!("{object_type}_{idx:04}"), object_type));
        object_ids.push(id);
    }

    let mut next_annotation = 0u128;
    for (frame_id, seed) in frame_seeds {
        let frame_timestamp = seed.timestamp.map(|(s, ns)| timestamp(s, ns));
        let mut frame = Frame::new(frame_timestamp);

        for (slot, (referenced, own_nanos, with_uri)) in seed.references.into_iter().enumerate() {
            let Some(sensor_id) = sensor_ids.get(slot) else {
                break;
            };
            if !referenced {
                continue;
            }
            let sync = match (own_nanos, frame_timestamp) {
                (Some(nanos), _) => timestamp(1_650_000_000, nanos),
                (None, Some(ts)) => ts,
                (None, None) => timestamp(1_650_000_000, 0),
            };
            frame.sensors.insert(
                sensor_id.to_string(),
                SensorReference {
                    timestamp: sync,
                    uri: with_uri.then(|| format!("/{sensor_id}/{frame_id:06}.bin")),
                },
            );
        }

        for (name, val, sensor_slot, with_uid) in seed.nums {
            let mut num = Num::new(eighths(val));
            num.sensor_id = sensor_slot
                .and_then(|slot| sensor_ids.get(slot))
                .map(|id| id.to_string());
            if with_uid {
                num.uid = Some(Uuid::from_u128(0x5a_0000 + u128::from(frame_id)));
            }
            frame.frame_data.entry(name).or_insert(num);
        }

        for ann in seed.annotations {
            let sensor_id = sensor_ids[ann.sensor % sensor_ids.len()];
            let object_id = object_ids[ann.object % object_ids.len()];
            let geometry = geometry_from_seed(ann.kind, &ann.coords, ann.closed);

            let mut annotation = Annotation::new(sensor_id, object_id, geometry);
            annotation.attributes = ann.attributes;

            next_annotation += 1;
            let id = AnnotationId::new(Uuid::from_u128(0xa000_0000 + next_annotation));
            frame.annotations.insert(id, annotation);
        }

        scene.frames.insert(frame_id, frame);
    }

    scene
}

fn geometry_from_seed(kind: u8, coords: &[i32], closed: bool) -> Geometry {
    let c = |i: usize| eighths(coords[i % coords.len()]);
    let point_count = coords.len() % 4;
    match kind {
        0 => Bbox::new(Point2d::new(c(0), c(1)), Size2d::new(c(2).abs(), c(3).abs())).into(),
        1 => Cuboid::new(
            Point3d::new(c(0), c(1), c(2)),
            Quaternion::new(c(3), c(4), c(5), c(6)),
            Size3d::new(c(7).abs(), c(8).abs(), c(9).abs()),
        )
        .into(),
        2 => Poly2d::new(
            (0..point_count).map(|i| Point2d::new(c(2 * i), c(2 * i + 1))).collect(),
            closed,
        )
        .into(),
        3 => Poly3d::new(
            (0..point_count)
                .map(|i| Point3d::new(c(3 * i), c(3 * i + 1), c(3 * i + 2)))
                .collect(),
            closed,
        )
        .into(),
        _ => Seg3d::new(coords.iter().map(|n| n.unsigned_abs() as u64).collect()).into(),
    }
}
