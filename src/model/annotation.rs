//! Annotation variants.
//!
//! Object-scoped annotations share a common envelope ([`Annotation`]) and
//! differ only in their [`Geometry`]. Numeric samples ([`Num`]) are
//! frame-level data and live in `Frame::frame_data` instead.

use std::fmt;
use std::str::FromStr;

use super::attributes::{AttributeValue, Attributes};
use super::geometry::{Point2d, Point3d, Quaternion, Size2d, Size3d};
use super::ids::ObjectId;

/// A geometric observation of one object by one sensor in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// The observing sensor; unset when the file referenced an unknown one.
    pub sensor_id: Option<String>,
    pub object_id: ObjectId,
    pub attributes: Attributes,
    pub geometry: Geometry,
}

impl Annotation {
    /// Creates an annotation without attributes.
    pub fn new(
        sensor_id: impl Into<String>,
        object_id: ObjectId,
        geometry: impl Into<Geometry>,
    ) -> Self {
        Self {
            sensor_id: Some(sensor_id.into()),
            object_id,
            attributes: Attributes::new(),
            geometry: geometry.into(),
        }
    }

    /// Adds an attribute to the annotation.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The kind of geometry carried.
    pub fn kind(&self) -> AnnotationKind {
        self.geometry.kind()
    }

    /// The derived display name `"{sensor_id}__{kind_tag}__{object_type}"`.
    ///
    /// Without a sensor the leading segment is omitted.
    pub fn name(&self, object_type: &str) -> String {
        let tag = self.kind().json_tag();
        match &self.sensor_id {
            Some(sensor_id) => format!("{sensor_id}__{tag}__{object_type}"),
            None => format!("{tag}__{object_type}"),
        }
    }
}

/// Kind-specific annotation geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Bbox(Bbox),
    Cuboid(Cuboid),
    Poly2d(Poly2d),
    Poly3d(Poly3d),
    Seg3d(Seg3d),
}

impl Geometry {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Geometry::Bbox(_) => AnnotationKind::Bbox,
            Geometry::Cuboid(_) => AnnotationKind::Cuboid,
            Geometry::Poly2d(_) => AnnotationKind::Poly2d,
            Geometry::Poly3d(_) => AnnotationKind::Poly3d,
            Geometry::Seg3d(_) => AnnotationKind::Seg3d,
        }
    }

    /// True when every coordinate is a finite number.
    ///
    /// JSON has no NaN or infinity, so only finite geometry can be saved.
    pub fn is_finite(&self) -> bool {
        match self {
            Geometry::Bbox(b) => [b.pos.x, b.pos.y, b.size.x, b.size.y]
                .iter()
                .all(|v| v.is_finite()),
            Geometry::Cuboid(c) => c
                .pos
                .to_array()
                .iter()
                .chain(&c.quat.to_array())
                .chain(&[c.size.x, c.size.y, c.size.z])
                .all(|v| v.is_finite()),
            Geometry::Poly2d(p) => p.points.iter().all(|pt| pt.x.is_finite() && pt.y.is_finite()),
            Geometry::Poly3d(p) => p
                .points
                .iter()
                .all(|pt| pt.to_array().iter().all(|v| v.is_finite())),
            Geometry::Seg3d(_) => true,
        }
    }
}

/// An axis-aligned 2D box given by its centre and size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bbox {
    pub pos: Point2d,
    pub size: Size2d,
}

impl Bbox {
    pub fn new(pos: Point2d, size: Size2d) -> Self {
        Self { pos, size }
    }
}

/// An oriented 3D box given by its centre, rotation and size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cuboid {
    pub pos: Point3d,
    pub quat: Quaternion,
    pub size: Size3d,
}

impl Cuboid {
    pub fn new(pos: Point3d, quat: Quaternion, size: Size3d) -> Self {
        Self { pos, quat, size }
    }
}

/// Interpretation of 2D polyline coordinates. Only absolute pixel
/// coordinates are supported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Poly2dMode {
    #[default]
    Absolute,
}

impl Poly2dMode {
    /// The wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Poly2dMode::Absolute => "MODE_POLY2D_ABSOLUTE",
        }
    }
}

/// A 2D polyline or polygon.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Poly2d {
    pub points: Vec<Point2d>,
    pub closed: bool,
    pub mode: Poly2dMode,
}

impl Poly2d {
    pub fn new(points: Vec<Point2d>, closed: bool) -> Self {
        Self {
            points,
            closed,
            mode: Poly2dMode::Absolute,
        }
    }
}

/// A 3D polyline or polygon.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Poly3d {
    pub points: Vec<Point3d>,
    pub closed: bool,
}

impl Poly3d {
    pub fn new(points: Vec<Point3d>, closed: bool) -> Self {
        Self { points, closed }
    }
}

/// A segmentation of a point cloud, as indices into the cloud.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Seg3d {
    pub point_ids: Vec<u64>,
}

impl Seg3d {
    pub fn new(point_ids: Vec<u64>) -> Self {
        Self { point_ids }
    }
}

impl From<Bbox> for Geometry {
    fn from(value: Bbox) -> Self {
        Geometry::Bbox(value)
    }
}

impl From<Cuboid> for Geometry {
    fn from(value: Cuboid) -> Self {
        Geometry::Cuboid(value)
    }
}

impl From<Poly2d> for Geometry {
    fn from(value: Poly2d) -> Self {
        Geometry::Poly2d(value)
    }
}

impl From<Poly3d> for Geometry {
    fn from(value: Poly3d) -> Self {
        Geometry::Poly3d(value)
    }
}

impl From<Seg3d> for Geometry {
    fn from(value: Seg3d) -> Self {
        Geometry::Seg3d(value)
    }
}

/// A frame-level numeric sample, keyed by name in `Frame::frame_data`.
#[derive(Clone, Debug, PartialEq)]
pub struct Num {
    pub uid: Option<uuid::Uuid>,
    pub sensor_id: Option<String>,
    pub val: f64,
}

impl Num {
    pub fn new(val: f64) -> Self {
        Self {
            uid: None,
            sensor_id: None,
            val,
        }
    }

    pub fn with_sensor(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }
}

/// Discriminator of the object-scoped annotation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnnotationKind {
    Bbox,
    Cuboid,
    Poly2d,
    Poly3d,
    Seg3d,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 5] = [
        AnnotationKind::Bbox,
        AnnotationKind::Cuboid,
        AnnotationKind::Poly2d,
        AnnotationKind::Poly3d,
        AnnotationKind::Seg3d,
    ];

    /// The key under which this kind is stored in `object_data`.
    ///
    /// Segmentations are stored under `vec`.
    pub fn json_tag(&self) -> &'static str {
        match self {
            AnnotationKind::Bbox => "bbox",
            AnnotationKind::Cuboid => "cuboid",
            AnnotationKind::Poly2d => "poly2d",
            AnnotationKind::Poly3d => "poly3d",
            AnnotationKind::Seg3d => "vec",
        }
    }

    /// Looks up a kind by its `object_data` key.
    pub fn from_json_tag(tag: &str) -> Option<Self> {
        AnnotationKind::ALL.into_iter().find(|k| k.json_tag() == tag)
    }

    /// The user-facing name, as used by filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Bbox => "bbox",
            AnnotationKind::Cuboid => "cuboid",
            AnnotationKind::Poly2d => "poly2d",
            AnnotationKind::Poly3d => "poly3d",
            AnnotationKind::Seg3d => "seg3d",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                format!("unknown annotation type '{s}' (expected bbox, cuboid, poly2d, poly3d or seg3d)")
            })
    }
}
