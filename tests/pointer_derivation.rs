//! Object pointers derived from scene contents.

use raillabel::builder::SceneBuilder;
use raillabel::model::{
    AnnotationKind, AttributeKind, AttributeValue, Attributes, Bbox, Cuboid, FrameInterval,
    Object, ObjectId, Point2d, Scene, Sensor, Size2d, Timestamp,
};
use raillabel::{derive_pointers, SaveOptions, WarningCode, Warnings};
use serde_json::{json, Value};
use uuid::Uuid;

fn person() -> ObjectId {
    ObjectId::new(Uuid::from_u128(0x7))
}

fn single_frame_box() -> Scene {
    SceneBuilder::empty()
        .add_sensor_with("rgb_center", Sensor::camera())
        .add_object_with(person(), Object::new("person_0000", "person"))
        .add_frame(1, Timestamp::parse("1631337747.123123123").ok())
        .add_annotation(
            1,
            "rgb_center",
            "person_0000",
            Bbox::new(Point2d::new(100.0, 200.0), Size2d::new(30.0, 40.0)),
            Attributes::new(),
        )
        .build()
}

fn saved(scene: &Scene) -> Value {
    let text = raillabel::to_string(scene, &SaveOptions::default(), &mut Warnings::new()).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn single_frame_box_has_one_pointer() {
    let scene = single_frame_box();
    let json = saved(&scene);

    let pointers = &json["openlabel"]["objects"][person().to_string()]["object_data_pointers"];
    assert_eq!(pointers.as_object().unwrap().len(), 1);
    assert_eq!(
        pointers["rgb_center__bbox__person"],
        json!({
            "type": "bbox",
            "frame_intervals": [{"frame_start": 1, "frame_end": 1}]
        })
    );

    let reloaded = raillabel::from_str(&json.to_string(), &mut Warnings::new()).unwrap();
    assert_eq!(reloaded, scene);
}

#[test]
fn non_contiguous_frames_give_four_intervals() {
    let mut builder = SceneBuilder::empty();
    for frame in [0, 1, 2, 3, 6, 7, 9, 12, 13, 14] {
        builder = builder.add_bbox(frame, "rgb_center", "person_0000");
    }
    let scene = builder.build();

    let pointers = derive_pointers(&scene, &mut Warnings::new());
    let (_, object) = pointers.first().unwrap();
    let spans: Vec<(u64, u64)> = object
        .frame_intervals
        .iter()
        .map(|interval| (interval.start, interval.end))
        .collect();
    assert_eq!(spans, vec![(0, 3), (6, 7), (9, 9), (12, 14)]);

    let total: u64 = object.frame_intervals.iter().map(FrameInterval::len).sum();
    assert_eq!(total, 10);
}

#[test]
fn attribute_pointers_record_value_kinds() {
    let attributes: Attributes = [
        ("occluded".to_string(), AttributeValue::from(false)),
        ("track".to_string(), AttributeValue::from(3_u64)),
        ("label".to_string(), AttributeValue::from("freight")),
    ]
    .into();
    let scene = SceneBuilder::empty()
        .add_annotation(4, "lidar", "train_0000", Cuboid::default(), attributes)
        .build();

    let pointers = derive_pointers(&scene, &mut Warnings::new());
    let (_, object) = pointers.first().unwrap();
    let pointer = &object.object_data_pointers["lidar__cuboid__train"];
    assert_eq!(pointer.kind, AnnotationKind::Cuboid);
    assert_eq!(pointer.attribute_pointers["occluded"], AttributeKind::Boolean);
    assert_eq!(pointer.attribute_pointers["track"], AttributeKind::Num);
    assert_eq!(pointer.attribute_pointers["label"], AttributeKind::Text);
}

#[test]
fn conflicting_attribute_types_warn() {
    let scene = SceneBuilder::empty()
        .add_annotation(
            1,
            "rgb_center",
            "person_0000",
            Bbox::default(),
            [("occluded".to_string(), AttributeValue::from(true))].into(),
        )
        .add_annotation(
            2,
            "rgb_center",
            "person_0000",
            Bbox::default(),
            [("occluded".to_string(), AttributeValue::from(1_i64))].into(),
        )
        .build();

    let mut warnings = Warnings::new();
    let json = raillabel::to_string(&scene, &SaveOptions::default(), &mut warnings).unwrap();
    assert_eq!(warnings.count(WarningCode::AttributeTypeConflict), 1);

    let value: Value = serde_json::from_str(&json).unwrap();
    let object = value["openlabel"]["objects"].as_object().unwrap().values().next().unwrap();
    assert_eq!(
        object["object_data_pointers"]["rgb_center__bbox__person"]["attribute_pointers"]["occluded"],
        "num"
    );
}

#[test]
fn derivation_is_stable_across_save_and_load() {
    let scene = SceneBuilder::seeded(11)
        .add_bbox(0, "rgb_center", "person_0000")
        .add_bbox(1, "rgb_center", "person_0000")
        .add_cuboid(1, "lidar", "person_0000")
        .add_seg3d(4, "lidar", "train_0000")
        .add_poly2d(5, "ir_left", "signal_0000")
        .build();

    let first = derive_pointers(&scene, &mut Warnings::new());
    let json = raillabel::to_string(&scene, &SaveOptions::default(), &mut Warnings::new()).unwrap();
    let reloaded = raillabel::from_str(&json, &mut Warnings::new()).unwrap();
    let second = derive_pointers(&reloaded, &mut Warnings::new());

    assert_eq!(first, second);
}

#[test]
fn stored_pointers_are_ignored_on_load() {
    let json = format!(
        r#"{{"openlabel": {{
            "metadata": {{"schema_version": "1.0.0"}},
            "objects": {{
                "{id}": {{
                    "name": "person_0000",
                    "type": "person",
                    "frame_intervals": [{{"frame_start": 40, "frame_end": 90}}],
                    "object_data_pointers": {{
                        "stale__bbox__person": {{"type": "bbox", "frame_intervals": []}}
                    }}
                }}
            }}
        }}}}"#,
        id = person()
    );
    let scene = raillabel::from_str(&json, &mut Warnings::new()).unwrap();

    let written = saved(&scene);
    let object = &written["openlabel"]["objects"][person().to_string()];
    assert_eq!(object, &json!({"name": "person_0000", "type": "person"}));
}
