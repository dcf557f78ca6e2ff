//! In-memory data model of an annotated scene.
//!
//! # Design Principles
//!
//! 1. **Ids, not pointers**: annotations refer to sensors and objects by id;
//!    the [`Scene`] owns every sensor, object and frame.
//!
//! 2. **Closed variants**: sensors and annotation geometries are enums with
//!    one arm per kind, and the JSON tag of each kind is an explicit
//!    constant.
//!
//! 3. **Exact timestamps**: timestamps are decimals parsed from their
//!    literal text, never binary floats.
//!
//! # Example
//!
//! ```
//! use raillabel::model::{Annotation, Bbox, Object, ObjectId, Point2d, Scene, Sensor, Size2d};
//! use uuid::Uuid;
//!
//! let person = ObjectId::new(Uuid::from_u128(1));
//! let mut scene = Scene::default();
//! scene.sensors.insert("rgb_center".into(), Sensor::camera());
//! scene.objects.insert(person, Object::new("person_0000", "person"));
//! let bbox = Bbox::new(Point2d::new(100.0, 200.0), Size2d::new(30.0, 40.0));
//! let annotation = Annotation::new("rgb_center", person, bbox);
//! assert_eq!(annotation.name("person"), "rgb_center__bbox__person");
//! ```

mod annotation;
mod attributes;
mod frame;
mod frame_interval;
mod geometry;
mod ids;
mod intrinsics;
mod object;
mod scene;
mod sensor;
mod timestamp;

// Re-export core types for convenient access
pub use annotation::{
    Annotation, AnnotationKind, Bbox, Cuboid, Geometry, Num, Poly2d, Poly2dMode, Poly3d, Seg3d,
};
pub use attributes::{AttributeKind, AttributeValue, Attributes};
pub(crate) use attributes::{is_primitive, json_type_name};
pub use frame::Frame;
pub use frame_interval::FrameInterval;
pub use geometry::{Point2d, Point3d, Quaternion, Size2d, Size3d, Transform};
pub use ids::{AnnotationId, ObjectId, UuidStream};
pub use intrinsics::{IntrinsicsPinhole, IntrinsicsRadar};
pub use object::Object;
pub use scene::{Metadata, Scene, SCHEMA_VERSION};
pub(crate) use scene::{is_identifier, METADATA_KEYS};
pub use sensor::{Sensor, SensorKind, SensorReference, SensorType};
pub use timestamp::Timestamp;
