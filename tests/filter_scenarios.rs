//! End-to-end filtering scenarios.

use std::collections::BTreeMap;
use std::path::Path;

use raillabel::builder::SceneBuilder;
use raillabel::filter::{parse_filter_spec, AttributeMatch, FilterPredicate};
use raillabel::model::{
    AnnotationId, AnnotationKind, AttributeValue, Attributes, Bbox, Cuboid, Object, ObjectId, Scene,
    Timestamp,
};
use raillabel::{RaillabelError, WarningCode, Warnings};
use uuid::Uuid;

fn aid(n: u128) -> AnnotationId {
    AnnotationId::new(Uuid::from_u128(n))
}

fn oid(n: u128) -> ObjectId {
    ObjectId::new(Uuid::from_u128(n))
}

fn colour(value: &str) -> Attributes {
    [("colour".to_string(), AttributeValue::from(value))].into()
}

fn three_frames(frames: &[u64]) -> SceneBuilder {
    let mut builder = SceneBuilder::empty()
        .add_object_with(oid(1), Object::new("person_0000", "person"))
        .add_object_with(oid(2), Object::new("train_0000", "train"));
    for &frame in frames {
        builder = builder.add_frame(frame, Timestamp::parse(&format!("{frame}.5")).ok());
        match frame {
            2 => {
                builder = builder.add_annotation_with_id(
                    aid(20),
                    frame,
                    "lidar",
                    "train_0000",
                    Cuboid::default(),
                    Attributes::new(),
                )
            }
            _ => {
                builder = builder.add_annotation_with_id(
                    aid(u128::from(frame) * 10),
                    frame,
                    "rgb_center",
                    "person_0000",
                    Bbox::default(),
                    Attributes::new(),
                )
            }
        }
    }
    builder
}

fn filtered(scene: &Scene, predicates: &[FilterPredicate]) -> Scene {
    raillabel::filter(scene, predicates, &mut Warnings::new()).expect("filter")
}

#[test]
fn include_frame_ids_matches_scene_built_without_other_frames() {
    let scene = three_frames(&[1, 2, 3]).build();
    let result = filtered(&scene, &[FilterPredicate::IncludeFrameIds(vec![1, 3])]);

    // The unreferenced train object stays in the reference build, so drop it.
    let mut expected = three_frames(&[1, 3]).build();
    expected.objects.shift_remove(&oid(2));

    assert_eq!(result.frames.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(result, expected);
    assert!(!result.sensors.contains_key("lidar"));
}

#[test]
fn include_attribute_keeps_red_and_prunes_blue_object() {
    let scene = SceneBuilder::empty()
        .add_annotation_with_id(
            aid(1),
            0,
            "rgb_center",
            "person_0000",
            Bbox::default(),
            colour("red"),
        )
        .add_annotation_with_id(
            aid(2),
            0,
            "rgb_center",
            "car_0000",
            Bbox::default(),
            colour("blue"),
        )
        .build();

    let mut matches = BTreeMap::new();
    matches.insert("colour".to_string(), AttributeMatch::value("red"));
    let result = filtered(&scene, &[FilterPredicate::IncludeAttributes(matches)]);

    let kept: Vec<_> = result.annotations().map(|(_, id, _)| id).collect();
    assert_eq!(kept, vec![aid(1)]);
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].name, "person_0000");
}

#[test]
fn include_and_exclude_annotation_ids_is_argument_error() {
    let scene = three_frames(&[1, 2, 3]).build();
    let err = raillabel::filter(
        &scene,
        &[
            FilterPredicate::IncludeAnnotationIds(vec![aid(10)]),
            FilterPredicate::ExcludeAnnotationIds(vec![aid(20)]),
        ],
        &mut Warnings::new(),
    )
    .unwrap_err();

    assert!(matches!(err, RaillabelError::Argument(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn filter_document_applies_to_sample() {
    let mut warnings = Warnings::new();
    let scene = raillabel::load(Path::new("tests/fixtures/openlabel_scene.json"), &mut warnings)
        .unwrap();
    let spec = std::fs::read("tests/fixtures/filter_spec.json").unwrap();
    let predicates = parse_filter_spec(&spec).unwrap();
    let result = raillabel::filter(&scene, &predicates, &mut warnings).unwrap();

    assert!(warnings.is_empty(), "unexpected warnings:\n{warnings}");
    assert_eq!(result.frames.keys().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(result.sensors.keys().collect::<Vec<_>>(), vec!["rgb_center"]);
    assert_eq!(result.objects.len(), 1);

    let kept: Vec<_> = result.annotations().map(|(frame, id, _)| (frame, id)).collect();
    assert_eq!(
        kept,
        vec![(
            0,
            AnnotationId::new(Uuid::parse_str("78f0ad89-2750-4a30-9d66-44c9da73a714").unwrap())
        )]
    );
    assert_eq!(result.frames[&0].frame_data["speed"].val, 12.5);
}

#[test]
fn start_time_after_every_frame_keeps_nothing() {
    let scene = three_frames(&[1, 2, 3]).build();
    let result = filtered(&scene, &[FilterPredicate::StartTime("100".parse().unwrap())]);
    assert!(result.frames.is_empty());
    assert!(result.sensors.is_empty());
    assert!(result.objects.is_empty());
}

#[test]
fn adding_predicates_only_shrinks_the_result() {
    let scene = raillabel::load(
        Path::new("tests/fixtures/openlabel_scene.json"),
        &mut Warnings::new(),
    )
    .unwrap();

    let steps = [
        FilterPredicate::ExcludeFrameIds(vec![1]),
        FilterPredicate::IncludeAnnotationTypes(vec![AnnotationKind::Bbox, AnnotationKind::Cuboid]),
        FilterPredicate::ExcludeSensorIds(vec!["lidar".into()]),
        FilterPredicate::EndTime("1632321743.3".parse().unwrap()),
    ];

    let mut previous = scene.clone();
    for n in 1..=steps.len() {
        let current = filtered(&scene, &steps[..n]);
        for frame in current.frames.keys() {
            assert!(previous.frames.contains_key(frame));
        }
        for (frame, id, _) in current.annotations() {
            assert!(previous.frames[&frame].annotations.contains_key(&id));
        }
        assert!(current.integrity_issues().is_empty());
        previous = current;
    }

    assert_eq!(previous.frames.keys().copied().collect::<Vec<_>>(), vec![0]);
    assert_eq!(previous.annotations().count(), 1);
}

#[test]
fn filtered_scene_saves_without_dangling_references() {
    let scene = raillabel::load(
        Path::new("tests/fixtures/openlabel_scene.json"),
        &mut Warnings::new(),
    )
    .unwrap();
    let result = filtered(
        &scene,
        &[FilterPredicate::IncludeObjectTypes(vec!["train".into()])],
    );

    assert!(result.integrity_issues().is_empty());
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].object_type, "train");
    assert_eq!(result.annotations().count(), 3);

    let mut warnings = Warnings::new();
    let json = raillabel::to_string(&result, &Default::default(), &mut warnings).unwrap();
    let reloaded = raillabel::from_str(&json, &mut warnings).unwrap();
    assert_eq!(reloaded, result);
    assert!(!warnings.contains(WarningCode::UnknownSensorReference));
}
