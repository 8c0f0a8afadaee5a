pub mod aim;
#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod compositor;
pub mod coordinate;
pub mod frame_rate;
pub mod hud;
pub mod rgba_converter;
pub mod sensor;
pub mod skeleton;
pub mod synthetic;

// Re-exports for convenience
pub use aim::ControlEvent;
pub use compositor::{CompositedFrame, Compositor, FrameCompositor, VideoImage, start_frame_compositor};
pub use frame_rate::FrameRateMonitor;
pub use hud::HudModel;
pub use sensor::{SensorEvent, SensorEventSink, SensorSession, sensor_from_config};
