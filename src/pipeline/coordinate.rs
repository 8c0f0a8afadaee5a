use crate::types::{CameraSpacePoint, ColorSpacePoint};

// Inferred joints can report a depth behind the sensor; project them just in front instead.
const INFERRED_Z_CLAMP: f32 = 0.1;

// Color camera field of view of the depth sensor, in degrees.
const COLOR_HFOV_DEG: f32 = 84.1;
const COLOR_VFOV_DEG: f32 = 53.8;

/// Maps sensor-space joint positions onto the color image plane.
pub trait CoordinateMapper: Send + Sync {
    /// May return off-image or non-finite coordinates; callers clip.
    fn camera_to_color(&self, point: CameraSpacePoint) -> ColorSpacePoint;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinholeMapper {
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
}

impl PinholeMapper {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Intrinsics derived from the color camera's field of view at the given geometry.
    pub fn for_color_geometry(width: u32, height: u32) -> Self {
        let half_h = (COLOR_HFOV_DEG.to_radians() / 2.0).tan();
        let half_v = (COLOR_VFOV_DEG.to_radians() / 2.0).tan();
        Self {
            fx: width as f32 / (2.0 * half_h),
            fy: height as f32 / (2.0 * half_v),
            cx: (width as f32 - 1.0) / 2.0,
            cy: (height as f32 - 1.0) / 2.0,
        }
    }
}

impl CoordinateMapper for PinholeMapper {
    fn camera_to_color(&self, point: CameraSpacePoint) -> ColorSpacePoint {
        let z = if point.z > 0.0 { point.z } else { INFERRED_Z_CLAMP };
        ColorSpacePoint {
            x: self.cx + self.fx * point.x / z,
            // Sensor space is y-up, image space is y-down.
            y: self.cy - self.fy * point.y / z,
        }
    }
}
