//! Sensors and per-frame sensor references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::geometry::Transform;
use super::intrinsics::{IntrinsicsPinhole, IntrinsicsRadar};
use super::timestamp::Timestamp;

/// A calibrated data source of the recording.
#[derive(Clone, Debug, PartialEq)]
pub struct Sensor {
    /// Pose relative to the `base` coordinate system.
    pub extrinsics: Option<Transform>,
    pub uri: Option<String>,
    pub description: Option<String>,
    /// Variant-specific calibration.
    pub kind: SensorKind,
}

impl Sensor {
    /// Creates a sensor of the given kind without pose or metadata.
    pub fn new(kind: SensorKind) -> Self {
        Self {
            extrinsics: None,
            uri: None,
            description: None,
            kind,
        }
    }

    /// A camera with zeroed intrinsics.
    pub fn camera() -> Self {
        Self::new(SensorKind::Camera {
            intrinsics: IntrinsicsPinhole::zeroed(),
        })
    }

    /// Creates a default sensor of the given type. Cameras and radars get
    /// zeroed intrinsics.
    pub fn of_type(sensor_type: SensorType) -> Self {
        Self::new(match sensor_type {
            SensorType::Camera => SensorKind::Camera {
                intrinsics: IntrinsicsPinhole::zeroed(),
            },
            SensorType::Lidar => SensorKind::Lidar,
            SensorType::Radar => SensorKind::Radar {
                intrinsics: IntrinsicsRadar::default(),
            },
            SensorType::GpsImu => SensorKind::GpsImu,
            SensorType::Other => SensorKind::Other,
        })
    }

    /// Sets the extrinsic pose.
    pub fn with_extrinsics(mut self, extrinsics: Transform) -> Self {
        self.extrinsics = Some(extrinsics);
        self
    }

    /// Sets the data URI.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The discriminating type of this sensor.
    pub fn sensor_type(&self) -> SensorType {
        self.kind.sensor_type()
    }

    /// True when the pose and intrinsics hold only finite numbers.
    pub fn is_finite(&self) -> bool {
        let pose = self.extrinsics.iter().all(|t| {
            t.position
                .to_array()
                .iter()
                .chain(&t.quaternion.to_array())
                .all(|v| v.is_finite())
        });
        let calibration = match &self.kind {
            SensorKind::Camera { intrinsics } => intrinsics
                .camera_matrix
                .iter()
                .chain(&intrinsics.distortion)
                .all(|v| v.is_finite()),
            SensorKind::Radar { intrinsics } => intrinsics.resolution_px_per_m.is_finite(),
            SensorKind::Lidar | SensorKind::GpsImu | SensorKind::Other => true,
        };
        pose && calibration
    }
}

/// Variant-specific sensor data.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorKind {
    Camera { intrinsics: IntrinsicsPinhole },
    Lidar,
    Radar { intrinsics: IntrinsicsRadar },
    GpsImu,
    Other,
}

impl SensorKind {
    pub fn sensor_type(&self) -> SensorType {
        match self {
            SensorKind::Camera { .. } => SensorType::Camera,
            SensorKind::Lidar => SensorType::Lidar,
            SensorKind::Radar { .. } => SensorType::Radar,
            SensorKind::GpsImu => SensorType::GpsImu,
            SensorKind::Other => SensorType::Other,
        }
    }
}

/// The `type` discriminator of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Camera,
    Lidar,
    Radar,
    GpsImu,
    Other,
}

impl SensorType {
    /// All sensor types, in declaration order.
    pub const ALL: [SensorType; 5] = [
        SensorType::Camera,
        SensorType::Lidar,
        SensorType::Radar,
        SensorType::GpsImu,
        SensorType::Other,
    ];

    /// Guesses a type from a sensor id prefix: `lidar`, `radar` and `gps`
    /// map to their types, anything else (`rgb_*`, `ir_*`) is a camera.
    pub fn from_id_prefix(sensor_id: &str) -> Self {
        let id = sensor_id.to_ascii_lowercase();
        if id.starts_with("lidar") {
            SensorType::Lidar
        } else if id.starts_with("radar") {
            SensorType::Radar
        } else if id.starts_with("gps") {
            SensorType::GpsImu
        } else {
            SensorType::Camera
        }
    }

    /// The wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Camera => "camera",
            SensorType::Lidar => "lidar",
            SensorType::Radar => "radar",
            SensorType::GpsImu => "gps_imu",
            SensorType::Other => "other",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!("unknown sensor type '{s}' (expected camera, lidar, radar, gps_imu or other)")
            })
    }
}

/// Pins a sensor to a specific instant within one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReference {
    pub timestamp: Timestamp,
    pub uri: Option<String>,
}

impl SensorReference {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            uri: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_calibration() {
        assert!(Sensor::camera().is_finite());
        let mut intrinsics = IntrinsicsPinhole::zeroed();
        intrinsics.distortion[4] = f64::NEG_INFINITY;
        assert!(!Sensor::new(SensorKind::Camera { intrinsics }).is_finite());
    }

    #[test]
    fn test_sensor_type_parse() {
        assert_eq!("gps_imu".parse::<SensorType>(), Ok(SensorType::GpsImu));
        assert!("sonar".parse::<SensorType>().is_err());
    }

    #[test]
    fn test_of_type_camera_has_zeroed_intrinsics() {
        let sensor = Sensor::of_type(SensorType::Camera);
        assert_eq!(
            sensor.kind,
            SensorKind::Camera {
                intrinsics: IntrinsicsPinhole::zeroed()
            }
        );
        assert_eq!(sensor.sensor_type(), SensorType::Camera);
    }
}
