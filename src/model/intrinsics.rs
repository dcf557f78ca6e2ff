//! Sensor calibration intrinsics.

/// Intrinsic calibration of a pinhole camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntrinsicsPinhole {
    /// Row-major 3x4 projection matrix.
    pub camera_matrix: [f64; 12],
    /// Distortion coefficients `(k1, k2, p1, p2, k3)`.
    pub distortion: [f64; 5],
    pub width_px: u32,
    pub height_px: u32,
}

impl IntrinsicsPinhole {
    /// Zeroed intrinsics, used when a calibration is unknown.
    pub fn zeroed() -> Self {
        Self {
            camera_matrix: [0.0; 12],
            distortion: [0.0; 5],
            width_px: 0,
            height_px: 0,
        }
    }

    /// Builds intrinsics from a row-major 3x3 matrix, appending a zero
    /// translation column.
    pub fn from_3x3(matrix: [f64; 9], distortion: [f64; 5], width_px: u32, height_px: u32) -> Self {
        let mut camera_matrix = [0.0; 12];
        for row in 0..3 {
            camera_matrix[row * 4..row * 4 + 3].copy_from_slice(&matrix[row * 3..row * 3 + 3]);
        }
        Self {
            camera_matrix,
            distortion,
            width_px,
            height_px,
        }
    }
}

impl Default for IntrinsicsPinhole {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Intrinsic calibration of a radar rendered as a bird's-eye image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntrinsicsRadar {
    pub resolution_px_per_m: f64,
    pub width_px: u32,
    pub height_px: u32,
}
