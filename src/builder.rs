//! Fluent construction of small, valid scenes.
//!
//! The builder is mainly a testing aid. Every method keeps the scene's
//! referential invariants intact: adding an annotation for a sensor or
//! object that does not exist yet synthesises a default one. All generated
//! UUIDs come from a seeded [`UuidStream`], so two builders fed the same
//! calls produce equal scenes.
//!
//! ```
//! use raillabel::builder::SceneBuilder;
//!
//! let scene = SceneBuilder::empty()
//!     .add_bbox(1, "rgb_center", "person_0000")
//!     .add_cuboid(1, "lidar", "person_0000")
//!     .build();
//!
//! assert_eq!(scene.sensors.len(), 2);
//! assert_eq!(scene.objects.len(), 1);
//! assert_eq!(scene.frames[&1].annotations.len(), 2);
//! ```

use crate::model::{
    AnnotationId, Annotation, Attributes, Bbox, Cuboid, Frame, Geometry, Metadata, Num, Object,
    ObjectId, Poly2d, Poly3d, Scene, Seg3d, Sensor, SensorReference, SensorType, Timestamp,
    UuidStream,
};

/// Fluent factory for [`Scene`] values.
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    scene: Scene,
    ids: UuidStream,
}

impl SceneBuilder {
    /// Starts from an empty scene with the default id seed.
    pub fn empty() -> Self {
        Self::seeded(0)
    }

    /// Starts from an empty scene, drawing ids from a stream seeded with `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            scene: Scene::default(),
            ids: UuidStream::seeded(seed),
        }
    }

    /// Replaces the scene metadata.
    pub fn add_metadata(mut self, metadata: Metadata) -> Self {
        self.scene.metadata = metadata;
        self
    }

    /// Adds a default sensor whose type is inferred from the id prefix
    /// (`rgb`/`ir` camera, `lidar`, `radar`, `gps` GPS/IMU; anything else
    /// becomes a camera). Existing sensors are left untouched.
    pub fn add_sensor(mut self, sensor_id: &str) -> Self {
        self.ensure_sensor(sensor_id);
        self
    }

    /// Adds or replaces a sensor.
    pub fn add_sensor_with(mut self, sensor_id: &str, sensor: Sensor) -> Self {
        self.scene.sensors.insert(sensor_id.to_string(), sensor);
        self
    }

    /// Adds an object of the given type named `{type}_{index:04}`.
    pub fn add_object(mut self, object_type: &str) -> Self {
        let index = self
            .scene
            .objects
            .values()
            .filter(|o| o.object_type == object_type)
            .count();
        let name = format!("{object_type}_{index:04}");
        let id = ObjectId::new(self.ids.next_uuid());
        self.scene
            .objects
            .insert(id, Object::new(name, object_type));
        self
    }

    /// Adds or replaces an object under an explicit id.
    pub fn add_object_with(mut self, object_id: ObjectId, object: Object) -> Self {
        self.scene.objects.insert(object_id, object);
        self
    }

    /// Adds a frame, or sets the timestamp of an existing one.
    pub fn add_frame(mut self, frame_id: u64, timestamp: impl Into<Option<Timestamp>>) -> Self {
        let timestamp = timestamp.into();
        self.scene
            .frames
            .entry(frame_id)
            .and_modify(|frame| frame.timestamp = timestamp)
            .or_insert_with(|| Frame::new(timestamp));
        self
    }

    /// Pins a sensor to a frame, creating either if needed.
    pub fn add_sensor_reference(
        mut self,
        frame_id: u64,
        sensor_id: &str,
        reference: SensorReference,
    ) -> Self {
        self.ensure_sensor(sensor_id);
        self.frame_mut(frame_id)
            .sensors
            .insert(sensor_id.to_string(), reference);
        self
    }

    /// Adds a frame-level numeric sample, creating the frame and the
    /// sample's sensor if needed.
    pub fn add_num(mut self, frame_id: u64, name: &str, num: Num) -> Self {
        if let Some(sensor_id) = &num.sensor_id {
            self.ensure_sensor(sensor_id);
        }
        self.frame_mut(frame_id)
            .frame_data
            .insert(name.to_string(), num);
        self
    }

    /// Adds a default 2D box.
    pub fn add_bbox(self, frame_id: u64, sensor_id: &str, object_name: &str) -> Self {
        self.add_annotation(frame_id, sensor_id, object_name, Bbox::default(), Attributes::new())
    }

    /// Adds a default cuboid.
    pub fn add_cuboid(self, frame_id: u64, sensor_id: &str, object_name: &str) -> Self {
        self.add_annotation(frame_id, sensor_id, object_name, Cuboid::default(), Attributes::new())
    }

    /// Adds an empty open 2D polyline.
    pub fn add_poly2d(self, frame_id: u64, sensor_id: &str, object_name: &str) -> Self {
        self.add_annotation(frame_id, sensor_id, object_name, Poly2d::default(), Attributes::new())
    }

    /// Adds an empty open 3D polyline.
    pub fn add_poly3d(self, frame_id: u64, sensor_id: &str, object_name: &str) -> Self {
        self.add_annotation(frame_id, sensor_id, object_name, Poly3d::default(), Attributes::new())
    }

    /// Adds an empty point-cloud segmentation.
    pub fn add_seg3d(self, frame_id: u64, sensor_id: &str, object_name: &str) -> Self {
        self.add_annotation(frame_id, sensor_id, object_name, Seg3d::default(), Attributes::new())
    }

    /// Adds an annotation under a freshly generated id.
    ///
    /// The object is looked up by name; a missing object is created with
    /// the type encoded in its name (`person_0000` is a `person`).
    pub fn add_annotation(
        mut self,
        frame_id: u64,
        sensor_id: &str,
        object_name: &str,
        geometry: impl Into<Geometry>,
        attributes: Attributes,
    ) -> Self {
        let annotation_id = AnnotationId::new(self.ids.next_uuid());
        self.insert_annotation(
            annotation_id,
            frame_id,
            sensor_id,
            object_name,
            geometry.into(),
            attributes,
        );
        self
    }

    /// Adds an annotation under an explicit id.
    pub fn add_annotation_with_id(
        mut self,
        annotation_id: AnnotationId,
        frame_id: u64,
        sensor_id: &str,
        object_name: &str,
        geometry: impl Into<Geometry>,
        attributes: Attributes,
    ) -> Self {
        self.insert_annotation(
            annotation_id,
            frame_id,
            sensor_id,
            object_name,
            geometry.into(),
            attributes,
        );
        self
    }

    /// Finishes construction.
    pub fn build(self) -> Scene {
        self.scene
    }

    fn insert_annotation(
        &mut self,
        annotation_id: AnnotationId,
        frame_id: u64,
        sensor_id: &str,
        object_name: &str,
        geometry: Geometry,
        attributes: Attributes,
    ) {
        self.ensure_sensor(sensor_id);
        let object_id = self.ensure_object(object_name);
        let annotation = Annotation {
            sensor_id: Some(sensor_id.to_string()),
            object_id,
            attributes,
            geometry,
        };
        self.frame_mut(frame_id)
            .annotations
            .insert(annotation_id, annotation);
    }

    fn ensure_sensor(&mut self, sensor_id: &str) {
        if !self.scene.sensors.contains_key(sensor_id) {
            let sensor = Sensor::of_type(SensorType::from_id_prefix(sensor_id));
            self.scene.sensors.insert(sensor_id.to_string(), sensor);
        }
    }

    fn ensure_object(&mut self, object_name: &str) -> ObjectId {
        if let Some((id, _)) = self
            .scene
            .objects
            .iter()
            .find(|(_, object)| object.name == object_name)
        {
            return *id;
        }
        let id = ObjectId::new(self.ids.next_uuid());
        let object = Object::new(object_name, object_type_from_name(object_name));
        self.scene.objects.insert(id, object);
        id
    }

    fn frame_mut(&mut self, frame_id: u64) -> &mut Frame {
        self.scene.frames.entry(frame_id).or_default()
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::empty()
    }
}

/// `person_0000` -> `person`; names without a numeric suffix are their own type.
fn object_type_from_name(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((prefix, suffix))
            if !prefix.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            prefix
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SensorKind;

    #[test]
    fn test_builder_is_deterministic() {
        let a = SceneBuilder::empty()
            .add_bbox(1, "rgb_center", "person_0000")
            .add_object("train")
            .build();
        let b = SceneBuilder::empty()
            .add_bbox(1, "rgb_center", "person_0000")
            .add_object("train")
            .build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_ids() {
        let a = SceneBuilder::seeded(1).add_object("person").build();
        let b = SceneBuilder::seeded(2).add_object("person").build();
        assert_ne!(a.objects.keys().next(), b.objects.keys().next());
    }

    #[test]
    fn test_sensor_type_inferred_from_prefix() {
        let scene = SceneBuilder::empty()
            .add_sensor("rgb_center")
            .add_sensor("ir_left")
            .add_sensor("lidar")
            .add_sensor("radar")
            .add_sensor("gps_imu")
            .add_sensor("mystery")
            .build();
        let types: Vec<SensorType> = scene.sensors.values().map(Sensor::sensor_type).collect();
        assert_eq!(
            types,
            vec![
                SensorType::Camera,
                SensorType::Camera,
                SensorType::Lidar,
                SensorType::Radar,
                SensorType::GpsImu,
                SensorType::Camera,
            ]
        );
    }

    #[test]
    fn test_annotation_synthesises_sensor_and_object() {
        let scene = SceneBuilder::empty()
            .add_bbox(4, "rgb_center", "person_0000")
            .build();
        assert!(matches!(
            scene.sensors["rgb_center"].kind,
            SensorKind::Camera { .. }
        ));
        let object = scene.objects.values().next().unwrap();
        assert_eq!(object.name, "person_0000");
        assert_eq!(object.object_type, "person");
        assert!(scene.integrity_issues().is_empty());
    }

    #[test]
    fn test_objects_are_reused_by_name() {
        let scene = SceneBuilder::empty()
            .add_bbox(1, "rgb_center", "person_0000")
            .add_bbox(2, "rgb_center", "person_0000")
            .add_bbox(2, "rgb_center", "person_0001")
            .build();
        assert_eq!(scene.objects.len(), 2);
    }

    #[test]
    fn test_add_object_numbers_per_type() {
        let scene = SceneBuilder::empty()
            .add_object("person")
            .add_object("train")
            .add_object("person")
            .build();
        let names: Vec<&str> = scene.objects.values().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["person_0000", "train_0000", "person_0001"]);
    }

    #[test]
    fn test_object_type_from_name() {
        assert_eq!(object_type_from_name("person_0000"), "person");
        assert_eq!(object_type_from_name("road_vehicle_0012"), "road_vehicle");
        assert_eq!(object_type_from_name("train"), "train");
        assert_eq!(object_type_from_name("signal_pole"), "signal_pole");
    }
}
