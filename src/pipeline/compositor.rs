use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, never, select, tick};

use super::{
    aim::{AimState, ControlEvent, Effect},
    coordinate::CoordinateMapper,
    frame_rate::{FrameRateMonitor, FrameRateTicker},
    hud::{HudModel, SensorStatus},
    rgba_converter::{self, ConvertError},
    sensor::SensorEvent,
    skeleton,
};
use crate::types::{BodySnapshot, PixelBuffer, VideoFrame};

const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct VideoImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
}

/// `video` is `None` when only the HUD changed.
#[derive(Clone, Debug)]
pub struct CompositedFrame {
    pub video: Option<VideoImage>,
    pub hud: HudModel,
}

pub struct Compositor {
    buffer: PixelBuffer,
    mapper: Arc<dyn CoordinateMapper>,
    bodies: Arc<BodySnapshot>,
    aim: AimState,
    status: SensorStatus,
    available: bool,
    sensor_open: bool,
    frame_rate: FrameRateMonitor,
    shown_rate: u32,
    sequence: u64,
}

impl Compositor {
    pub fn new(
        geometry: (u32, u32),
        mapper: Arc<dyn CoordinateMapper>,
        sensor_open: bool,
        frame_rate: FrameRateMonitor,
    ) -> Self {
        Self {
            buffer: PixelBuffer::new(geometry.0, geometry.1),
            mapper,
            bodies: Arc::new(BodySnapshot::default()),
            aim: AimState::new(),
            // Stays here until the sensor reports availability.
            status: SensorStatus::NoSensor,
            available: false,
            sensor_open,
            frame_rate,
            shown_rate: 0,
            sequence: 0,
        }
    }

    pub fn hud_model(&self) -> HudModel {
        HudModel::new(
            &self.aim,
            self.status,
            self.available && self.sensor_open,
            self.frame_rate.frames_per_second(),
            &self.bodies,
        )
    }

    #[cfg(test)]
    fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn handle_color_frame(&mut self, frame: Option<VideoFrame>) -> CompositedFrame {
        let video = match frame {
            Some(frame) => match self.composite(&frame) {
                Ok(()) => {
                    log::trace!("frame composited {:?} after capture", frame.timestamp.elapsed());
                    Some(self.publish())
                }
                Err(err) => {
                    log::warn!("skipping {} frame: {err}", frame.encoding.label());
                    None
                }
            },
            None => {
                log::trace!("color frame event without a frame");
                None
            }
        };

        CompositedFrame {
            video,
            hud: self.hud_model(),
        }
    }

    pub fn handle_body_frame(&mut self, snapshot: Option<BodySnapshot>) {
        match snapshot {
            Some(snapshot) => {
                log::trace!(
                    "body frame with {:?}",
                    snapshot
                        .tracked()
                        .map(|(letter, body)| (letter.label(), body.tracking_id))
                        .collect::<Vec<_>>()
                );
                self.bodies = Arc::new(snapshot);
            }
            None => log::trace!("body frame event without a snapshot"),
        }
    }

    pub fn handle_availability(&mut self, available: bool) -> CompositedFrame {
        if available != self.available || self.status == SensorStatus::NoSensor {
            log::info!("sensor availability changed: {available}");
        }
        self.available = available;
        self.status = SensorStatus::from_availability(available);
        CompositedFrame {
            video: None,
            hud: self.hud_model(),
        }
    }

    pub fn handle_control(&mut self, event: ControlEvent) -> Option<CompositedFrame> {
        match self.aim.apply(event) {
            Effect::Ignored => None,
            Effect::Nudge { .. } | Effect::SetMode(_) => Some(CompositedFrame {
                video: None,
                hud: self.hud_model(),
            }),
        }
    }

    pub fn handle_rate_tick(&mut self) -> Option<CompositedFrame> {
        let published = self.frame_rate.published();
        if published == self.shown_rate {
            return None;
        }
        self.shown_rate = published;
        Some(CompositedFrame {
            video: None,
            hud: self.hud_model(),
        })
    }

    pub fn handle_sensor_event(&mut self, event: SensorEvent) -> Option<CompositedFrame> {
        match event {
            SensorEvent::ColorFrame(frame) => Some(self.handle_color_frame(frame)),
            SensorEvent::BodyFrame(snapshot) => {
                self.handle_body_frame(snapshot);
                None
            }
            SensorEvent::AvailabilityChanged(available) => Some(self.handle_availability(available)),
        }
    }

    fn composite(&mut self, frame: &VideoFrame) -> Result<(), ConvertError> {
        rgba_converter::convert_into(frame, &mut self.buffer)?;
        skeleton::draw_bodies(&mut self.buffer, &self.bodies, self.mapper.as_ref());
        self.frame_rate.record_frame();
        Ok(())
    }

    fn publish(&mut self) -> VideoImage {
        self.sequence += 1;
        VideoImage {
            rgba: self.buffer.as_bytes().to_vec(),
            width: self.buffer.width(),
            height: self.buffer.height(),
            sequence: self.sequence,
        }
    }
}

pub struct FrameCompositor {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    ticker: Option<FrameRateTicker>,
}

impl FrameCompositor {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            log::info!("frame compositor stopped");
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

impl Drop for FrameCompositor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn start_frame_compositor(
    mut compositor: Compositor,
    sensor_rx: Receiver<SensorEvent>,
    control_rx: Receiver<ControlEvent>,
    output_tx: Sender<CompositedFrame>,
) -> FrameCompositor {
    let ticker = compositor.frame_rate.start_ticker();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        log::info!("frame compositor started");
        let mut sensor_rx = sensor_rx;
        let mut control_rx = control_rx;
        let rate_ticks = tick(compositor.frame_rate.window());

        // The display shows a HUD before the first frame arrives.
        if output_tx
            .send(CompositedFrame {
                video: None,
                hud: compositor.hud_model(),
            })
            .is_err()
        {
            return;
        }

        while !stop_flag.load(Ordering::Relaxed) {
            let mut sensor_closed = false;
            let mut control_closed = false;
            let output = select! {
                recv(sensor_rx) -> event => match event {
                    Ok(event) => compositor.handle_sensor_event(event),
                    Err(_) => {
                        sensor_closed = true;
                        None
                    }
                },
                recv(control_rx) -> event => match event {
                    Ok(event) => compositor.handle_control(event),
                    Err(_) => {
                        control_closed = true;
                        None
                    }
                },
                recv(rate_ticks) -> _ => compositor.handle_rate_tick(),
                default(IDLE_POLL) => None,
            };

            // Closed channels would otherwise win every select.
            if sensor_closed {
                log::debug!("sensor channel closed");
                sensor_rx = never();
            }
            if control_closed {
                log::debug!("control channel closed");
                control_rx = never();
            }

            if let Some(frame) = output {
                match output_tx.send_timeout(frame, IDLE_POLL) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => log::trace!("display busy, frame dropped"),
                    Err(SendTimeoutError::Disconnected(_)) => {
                        log::debug!("display closed, stopping compositor");
                        break;
                    }
                }
            }
        }
    });

    FrameCompositor {
        stop,
        handle: Some(handle),
        ticker: Some(ticker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::coordinate::PinholeMapper,
        types::{CameraSpacePoint, JointType, PixelEncoding, TrackingMode, TrackingState},
    };
    use crossbeam_channel::{bounded, unbounded};
    use std::time::Instant;

    const W: u32 = 64;
    const H: u32 = 48;

    fn compositor() -> Compositor {
        Compositor::new(
            (W, H),
            Arc::new(PinholeMapper::for_color_geometry(W, H)),
            true,
            FrameRateMonitor::new(Duration::from_secs(1)),
        )
    }

    fn solid_frame(value: u8) -> VideoFrame {
        VideoFrame::new(W, H, PixelEncoding::Gray, vec![value; (W * H) as usize])
    }

    fn body_at_center() -> BodySnapshot {
        let mut snapshot = BodySnapshot::default();
        let body = &mut snapshot.bodies[2];
        body.tracked = true;
        body.set_joint(
            JointType::Head,
            CameraSpacePoint::new(0.0, 0.0, 2.0),
            TrackingState::Tracked,
        );
        snapshot
    }

    #[test]
    fn control_sequence_updates_hud_readout() {
        let mut compositor = compositor();
        compositor.handle_availability(true);

        compositor.handle_control(ControlEvent::Up);
        compositor.handle_control(ControlEvent::Up);
        let hud = compositor
            .handle_control(ControlEvent::Right)
            .unwrap()
            .hud;
        assert_eq!(hud.aim_x, "0.10");
        assert_eq!(hud.aim_y, "0.20");
        assert_eq!(hud.tracking_mode, TrackingMode::Manual);

        let hud = compositor
            .handle_control(ControlEvent::SelectMode(TrackingMode::Skeletal))
            .unwrap()
            .hud;
        assert_eq!(hud.tracking_mode, TrackingMode::Skeletal);

        assert!(compositor.handle_control(ControlEvent::Up).is_none());
        let hud = compositor.hud_model();
        assert_eq!(hud.aim_x, "0.10");
        assert_eq!(hud.aim_y, "0.20");
    }

    #[test]
    fn every_composited_frame_is_counted() {
        let mut compositor = compositor();
        for i in 0..37 {
            let out = compositor.handle_color_frame(Some(solid_frame(i as u8)));
            assert_eq!(out.video.unwrap().sequence, i + 1);
        }
        assert_eq!(compositor.frame_rate.tick(), 37);
        assert_eq!(compositor.hud_model().frame_rate, "37.00");
    }

    #[test]
    fn absent_or_bad_frames_keep_previous_buffer() {
        let mut compositor = compositor();
        compositor.handle_color_frame(Some(solid_frame(90)));
        let before = compositor.buffer().clone();

        let out = compositor.handle_color_frame(None);
        assert!(out.video.is_none());

        let short = VideoFrame::new(W, H, PixelEncoding::Gray, vec![7; 10]);
        let out = compositor.handle_color_frame(Some(short));
        assert!(out.video.is_none());

        let wrong_size = VideoFrame::new(W / 2, H, PixelEncoding::Gray, vec![7; (W / 2 * H) as usize]);
        assert!(compositor.handle_color_frame(Some(wrong_size)).video.is_none());

        assert_eq!(compositor.buffer(), &before);
        assert_eq!(compositor.frame_rate.tick(), 1);
    }

    #[test]
    fn body_frame_is_drawn_with_next_color_frame() {
        let mut compositor = compositor();
        assert!(
            compositor
                .handle_sensor_event(SensorEvent::BodyFrame(Some(body_at_center())))
                .is_none()
        );
        assert_eq!(compositor.hud_model().tracked_label(), "C");

        let out = compositor.handle_color_frame(Some(solid_frame(0)));
        let video = out.video.unwrap();
        let idx = ((H / 2 * W + W / 2) * 4) as usize;
        assert_ne!(&video.rgba[idx..idx + 3], &[0, 0, 0]);

        // An empty body event keeps the previous snapshot.
        compositor.handle_body_frame(None);
        assert_eq!(compositor.hud_model().tracked_label(), "C");
    }

    #[test]
    fn availability_drives_status_and_readiness() {
        let mut compositor = compositor();
        let hud = compositor.hud_model();
        assert_eq!(hud.status_text, "No ready sensor found!");
        assert!(!hud.system_ready);

        let hud = compositor.handle_availability(true).hud;
        assert_eq!(hud.status_text, "Running");
        assert!(hud.system_ready);

        let hud = compositor.handle_availability(false).hud;
        assert_eq!(hud.status_text, "Sensor not available!");
        assert!(!hud.system_ready);

        // Frames keep flowing while unavailable.
        assert!(compositor.handle_color_frame(Some(solid_frame(3))).video.is_some());
    }

    #[test]
    fn rate_tick_refreshes_hud_only_when_rate_changes() {
        let mut compositor = compositor();
        assert!(compositor.handle_rate_tick().is_none());

        for i in 0..30 {
            compositor.handle_color_frame(Some(solid_frame(i)));
        }
        compositor.frame_rate.tick();
        let frame = compositor.handle_rate_tick().unwrap();
        assert!(frame.video.is_none());
        assert_eq!(frame.hud.frame_rate, "30.00");
        assert!(compositor.handle_rate_tick().is_none());

        // Video stopped: the next window is empty and the readout drops.
        compositor.frame_rate.tick();
        assert_eq!(compositor.handle_rate_tick().unwrap().hud.frame_rate, "0.00");
    }

    #[test]
    fn worker_drops_rate_readout_after_video_stops() {
        let (sensor_tx, sensor_rx) = bounded(4);
        let (_control_tx, control_rx) = unbounded();
        let (output_tx, output_rx) = unbounded();
        let compositor = Compositor::new(
            (W, H),
            Arc::new(PinholeMapper::for_color_geometry(W, H)),
            true,
            FrameRateMonitor::new(Duration::from_millis(20)),
        );
        let handle = start_frame_compositor(compositor, sensor_rx, control_rx, output_tx);

        sensor_tx
            .send(SensorEvent::ColorFrame(Some(solid_frame(1))))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut saw_rate = false;
        let mut saw_zero = false;
        while !saw_zero && Instant::now() < deadline {
            if let Ok(frame) = output_rx.recv_timeout(Duration::from_millis(50)) {
                if frame.video.is_some() {
                    continue;
                }
                if frame.hud.frame_rate != "0.00" {
                    saw_rate = true;
                } else if saw_rate {
                    saw_zero = true;
                }
            }
        }
        assert!(saw_rate && saw_zero);

        handle.stop();
    }

    #[test]
    fn closed_sensor_is_never_ready() {
        let mut compositor = Compositor::new(
            (W, H),
            Arc::new(PinholeMapper::for_color_geometry(W, H)),
            false,
            FrameRateMonitor::new(Duration::from_secs(1)),
        );
        assert!(!compositor.handle_availability(true).hud.system_ready);
    }

    #[test]
    fn worker_sends_initial_hud_then_dispatches_events() {
        let (sensor_tx, sensor_rx) = bounded(4);
        let (control_tx, control_rx) = unbounded();
        let (output_tx, output_rx) = unbounded();

        let handle = start_frame_compositor(compositor(), sensor_rx, control_rx, output_tx);

        let initial = output_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(initial.video.is_none());
        assert_eq!(initial.hud.aim_x, "0.00");

        sensor_tx
            .send(SensorEvent::ColorFrame(Some(solid_frame(40))))
            .unwrap();
        let frame = output_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let video = frame.video.unwrap();
        assert_eq!((video.width, video.height), (W, H));
        assert_eq!(&video.rgba[..4], &[40, 40, 40, 255]);

        // A closed sensor channel must not stop control handling.
        drop(sensor_tx);
        control_tx.send(ControlEvent::Left).unwrap();
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut moved = false;
        while !moved && Instant::now() < deadline {
            if let Ok(frame) = output_rx.recv_timeout(Duration::from_millis(100)) {
                moved = frame.hud.aim_x == "-0.10";
            }
        }
        assert!(moved);

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
