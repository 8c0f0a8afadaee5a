use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
};

use super::{
    coordinate::{CoordinateMapper, PinholeMapper},
    sensor::{SensorEventSink, SensorSession, SensorSource},
};
use crate::types::{PixelEncoding, VideoFrame};

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

// Consecutive read failures before the sensor is reported unavailable.
const FAILURES_BEFORE_UNAVAILABLE: u32 = 10;
const RETRY_DELAY: Duration = Duration::from_millis(100);

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        // Any format Nokhwa can decode, still favoring frame rate.
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

fn build_camera(index: &CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

fn encoding_for(format: FrameFormat) -> PixelEncoding {
    match format {
        FrameFormat::MJPEG => PixelEncoding::Mjpeg,
        FrameFormat::YUYV => PixelEncoding::Yuyv,
        FrameFormat::NV12 => PixelEncoding::Nv12,
        FrameFormat::GRAY => PixelEncoding::Gray,
        FrameFormat::RAWRGB => PixelEncoding::Rgb,
        FrameFormat::RAWBGR => PixelEncoding::Bgr,
    }
}

pub struct CameraSensor {
    index: CameraIndex,
    label: String,
    width: u32,
    height: u32,
}

impl CameraSensor {
    pub fn first_available() -> Result<Self> {
        let cameras = query(ApiBackend::Auto)?;
        let mut last_err = None;

        for info in cameras {
            let index = info.index().clone();
            match build_camera(&index) {
                Ok(camera) => {
                    let resolution = camera.resolution();
                    return Ok(Self {
                        index,
                        label: info.human_name(),
                        width: resolution.width_x,
                        height: resolution.height_y,
                    });
                }
                Err(err) => {
                    log::warn!("camera {} unusable: {err:?}", info.human_name());
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("no camera found")))
    }
}

impl SensorSource for CameraSensor {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn frame_geometry(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        Arc::new(PinholeMapper::for_color_geometry(self.width, self.height))
    }

    fn open(self: Box<Self>, sink: SensorEventSink) -> Result<SensorSession> {
        let name = self.name();
        let geometry = self.frame_geometry();
        let mapper = self.coordinate_mapper();
        let index = self.index;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut camera = match build_camera(&index) {
                Ok(cam) => cam,
                Err(err) => {
                    log::error!("failed to open camera: {err:?}");
                    sink.availability(false);
                    return;
                }
            };

            let mut available = true;
            if !sink.availability(true) {
                return;
            }

            let mut failures = 0u32;
            while !stop_flag.load(Ordering::Relaxed) {
                let frame_start = Instant::now();
                let buffer = match camera.frame() {
                    Ok(buffer) => buffer,
                    Err(err) => {
                        failures += 1;
                        log::warn!(
                            "camera frame read failed (after {:?}): {err:?}",
                            frame_start.elapsed()
                        );
                        if available && failures >= FAILURES_BEFORE_UNAVAILABLE {
                            available = false;
                            if !sink.availability(false) {
                                break;
                            }
                        }
                        thread::sleep(RETRY_DELAY);
                        continue;
                    }
                };

                failures = 0;
                if !available {
                    available = true;
                    if !sink.availability(true) {
                        break;
                    }
                }

                let resolution = buffer.resolution();
                let frame = VideoFrame::new(
                    resolution.width_x,
                    resolution.height_y,
                    encoding_for(buffer.source_frame_format()),
                    buffer.buffer().to_vec(),
                );

                if !sink.color_frame(Some(frame)) {
                    break;
                }
            }

            log::debug!("camera thread exiting");
        });

        Ok(SensorSession::new(name, geometry, mapper, stop, handle))
    }
}
