use std::{env, time::Duration};

use crate::types::PixelEncoding;

// Native color geometry of the depth sensor.
const DEFAULT_FRAME_SIZE: (u32, u32) = (1920, 1080);
const DEFAULT_COLOR_FPS: u32 = 30;
// Skeleton data arrives slower than color on real hardware.
const DEFAULT_BODY_FPS: u32 = 15;
const FRAME_RATE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorBackend {
    Synthetic,
    #[cfg(feature = "camera-nokhwa")]
    Camera,
}

impl Default for SensorBackend {
    fn default() -> Self {
        #[cfg(feature = "camera-nokhwa")]
        {
            return SensorBackend::Camera;
        }

        #[allow(unreachable_code)]
        SensorBackend::Synthetic
    }
}

impl SensorBackend {
    pub fn label(&self) -> &'static str {
        match self {
            SensorBackend::Synthetic => "synthetic",
            #[cfg(feature = "camera-nokhwa")]
            SensorBackend::Camera => "camera",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "synthetic" | "mock" => Some(SensorBackend::Synthetic),
            #[cfg(feature = "camera-nokhwa")]
            "camera" | "webcam" => Some(SensorBackend::Camera),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RigConfig {
    pub sensor: SensorBackend,
    pub frame_width: u32,
    pub frame_height: u32,
    pub synthetic_encoding: PixelEncoding,
    pub color_fps: u32,
    pub body_fps: u32,
    pub frame_rate_window: Duration,
    pub sensor_queue_depth: usize,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            sensor: SensorBackend::default(),
            frame_width: DEFAULT_FRAME_SIZE.0,
            frame_height: DEFAULT_FRAME_SIZE.1,
            synthetic_encoding: PixelEncoding::Yuyv,
            color_fps: DEFAULT_COLOR_FPS,
            body_fps: DEFAULT_BODY_FPS,
            frame_rate_window: FRAME_RATE_WINDOW,
            sensor_queue_depth: 4,
        }
    }
}

impl RigConfig {
    /// Defaults overlaid with `TURRET_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("TURRET_SENSOR") {
            match SensorBackend::parse(&value) {
                Some(sensor) => self.sensor = sensor,
                None => log::warn!("ignoring unknown TURRET_SENSOR value {value:?}"),
            }
        }

        if let Some(value) = lookup("TURRET_FRAME_SIZE") {
            match parse_frame_size(&value) {
                Some((width, height)) => {
                    self.frame_width = width;
                    self.frame_height = height;
                }
                None => log::warn!("ignoring malformed TURRET_FRAME_SIZE {value:?}, expected WxH"),
            }
        }

        if let Some(value) = lookup("TURRET_COLOR_FPS") {
            match parse_rate(&value) {
                Some(fps) => self.color_fps = fps,
                None => log::warn!("ignoring malformed TURRET_COLOR_FPS {value:?}"),
            }
        }

        if let Some(value) = lookup("TURRET_BODY_FPS") {
            match parse_rate(&value) {
                Some(fps) => self.body_fps = fps,
                None => log::warn!("ignoring malformed TURRET_BODY_FPS {value:?}"),
            }
        }

        self
    }
}

fn parse_frame_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.trim().split_once(['x', 'X'])?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    // YUYV and NV12 need even dimensions.
    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return None;
    }
    Some((width, height))
}

fn parse_rate(value: &str) -> Option<u32> {
    value.trim().parse().ok().filter(|fps| (1..=240).contains(fps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> RigConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RigConfig::default().with_overrides(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_sensor_geometry() {
        let config = RigConfig::default();
        assert_eq!((config.frame_width, config.frame_height), (1920, 1080));
        assert_eq!(config.frame_rate_window, Duration::from_secs(1));
        assert!(config.body_fps < config.color_fps);
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = overrides(&[
            ("TURRET_SENSOR", "synthetic"),
            ("TURRET_FRAME_SIZE", "640x480"),
            ("TURRET_COLOR_FPS", "60"),
            ("TURRET_BODY_FPS", "10"),
        ]);
        assert_eq!(config.sensor, SensorBackend::Synthetic);
        assert_eq!((config.frame_width, config.frame_height), (640, 480));
        assert_eq!(config.color_fps, 60);
        assert_eq!(config.body_fps, 10);
    }

    #[test]
    fn malformed_overrides_keep_defaults() {
        let config = overrides(&[
            ("TURRET_SENSOR", "kinect-9000"),
            ("TURRET_FRAME_SIZE", "641x480"),
            ("TURRET_COLOR_FPS", "0"),
        ]);
        let defaults = RigConfig::default();
        assert_eq!(config.sensor, defaults.sensor);
        assert_eq!(config.frame_width, defaults.frame_width);
        assert_eq!(config.color_fps, defaults.color_fps);
    }
}
