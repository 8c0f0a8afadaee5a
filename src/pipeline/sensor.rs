use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::Result;
use crossbeam_channel::{SendTimeoutError, Sender, TrySendError};

use super::coordinate::CoordinateMapper;
use crate::{
    config::{RigConfig, SensorBackend},
    types::{BodySnapshot, VideoFrame},
};

// Body and availability events are never dropped, but a wedged consumer must not hang close().
const RELIABLE_SEND_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Clone, Debug)]
pub enum SensorEvent {
    ColorFrame(Option<VideoFrame>),
    BodyFrame(Option<BodySnapshot>),
    AvailabilityChanged(bool),
}

#[derive(Clone, Debug)]
pub struct SensorEventSink {
    tx: Sender<SensorEvent>,
}

impl SensorEventSink {
    pub fn new(tx: Sender<SensorEvent>) -> Self {
        Self { tx }
    }

    pub fn color_frame(&self, frame: Option<VideoFrame>) -> bool {
        match self.tx.try_send(SensorEvent::ColorFrame(frame)) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn body_frame(&self, snapshot: Option<BodySnapshot>) -> bool {
        self.send_reliable(SensorEvent::BodyFrame(snapshot))
    }

    pub fn availability(&self, available: bool) -> bool {
        self.send_reliable(SensorEvent::AvailabilityChanged(available))
    }

    fn send_reliable(&self, event: SensorEvent) -> bool {
        match self.tx.send_timeout(event, RELIABLE_SEND_TIMEOUT) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(event)) => {
                log::warn!("sensor consumer stalled, dropping {}", event_kind(&event));
                true
            }
            Err(SendTimeoutError::Disconnected(_)) => false,
        }
    }
}

fn event_kind(event: &SensorEvent) -> &'static str {
    match event {
        SensorEvent::ColorFrame(_) => "color frame",
        SensorEvent::BodyFrame(_) => "body frame",
        SensorEvent::AvailabilityChanged(_) => "availability change",
    }
}

pub trait SensorSource: Send {
    fn name(&self) -> String;

    fn frame_geometry(&self) -> (u32, u32);

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper>;

    fn open(self: Box<Self>, sink: SensorEventSink) -> Result<SensorSession>;
}

/// Closing (or dropping) joins the delivery thread; no event is sent after `close` returns.
pub struct SensorSession {
    name: String,
    geometry: (u32, u32),
    mapper: Arc<dyn CoordinateMapper>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SensorSession {
    pub fn new(
        name: String,
        geometry: (u32, u32),
        mapper: Arc<dyn CoordinateMapper>,
        stop: Arc<AtomicBool>,
        handle: thread::JoinHandle<()>,
    ) -> Self {
        log::info!("sensor {name} open at {}x{}", geometry.0, geometry.1);
        Self {
            name,
            geometry,
            mapper,
            stop,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> (u32, u32) {
        self.geometry
    }

    pub fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        self.mapper.clone()
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            log::info!("sensor {} closed", self.name);
        }
    }
}

impl Drop for SensorSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn sensor_from_config(config: &RigConfig) -> Result<Box<dyn SensorSource>> {
    match config.sensor {
        SensorBackend::Synthetic => Ok(Box::new(super::synthetic::SyntheticSensor::new(
            super::synthetic::SyntheticConfig::from_rig(config),
        ))),
        #[cfg(feature = "camera-nokhwa")]
        SensorBackend::Camera => Ok(Box::new(super::camera::CameraSensor::first_available()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn color_frames_are_dropped_when_full_but_body_frames_wait() {
        let (tx, rx) = bounded(1);
        let sink = SensorEventSink::new(tx);

        assert!(sink.color_frame(None));
        assert!(sink.color_frame(None), "full queue drops, it does not fail");
        assert_eq!(rx.len(), 1);

        let reader = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            rx.iter().take(2).count()
        });
        assert!(sink.body_frame(Some(BodySnapshot::default())));
        drop(sink);
        assert_eq!(reader.join().unwrap(), 2);
    }

    #[test]
    fn sink_reports_disconnect() {
        let (tx, rx) = bounded(1);
        let sink = SensorEventSink::new(tx);
        drop(rx);
        assert!(!sink.color_frame(None));
        assert!(!sink.availability(true));
    }
}
