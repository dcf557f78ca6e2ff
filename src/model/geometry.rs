//! Plain geometric value types shared by annotations and calibrations.
//!
//! No geometric computation happens on them beyond packing to and
//! unpacking from the flat number lists used on the wire.

/// A point in 2D image space (pixels).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in 3D sensor space (metres).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3d {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Packs the point as `[x, y, z]`.
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point3d {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Width and height of a 2D shape.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size2d {
    pub x: f64,
    pub y: f64,
}

impl Size2d {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Extent of a 3D shape along each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Size3d {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion in `(x, y, z, w)` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Packs the quaternion as `[x, y, z, w]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl Default for Quaternion {
    /// The identity rotation.
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from([x, y, z, w]: [f64; 4]) -> Self {
        Self { x, y, z, w }
    }
}

/// Pose of a sensor relative to the `base` coordinate system.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub position: Point3d,
    pub quaternion: Quaternion,
}

impl Transform {
    pub fn new(position: Point3d, quaternion: Quaternion) -> Self {
        Self {
            position,
            quaternion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quaternion_default_is_identity() {
        assert_eq!(Quaternion::default().to_array(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_point3d_from_array() {
        let point = Point3d::from([1.0, 2.0, 3.0]);
        assert_eq!(point, Point3d::new(1.0, 2.0, 3.0));
        assert_eq!(point.to_array(), [1.0, 2.0, 3.0]);
    }
}
