use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::{select, tick};
use rayon::prelude::*;

use super::{
    coordinate::{CoordinateMapper, PinholeMapper},
    sensor::{SensorEventSink, SensorSession, SensorSource},
};
use crate::{
    config::RigConfig,
    types::{
        BODY_COUNT, Body, BodySnapshot, CameraSpacePoint, HandState, JointType, PixelEncoding,
        TrackingState, VideoFrame,
    },
};

// Standing pose in meters, relative to the body root.
const POSE: [(JointType, f32, f32); 25] = [
    (JointType::SpineBase, 0.0, -0.10),
    (JointType::SpineMid, 0.0, 0.20),
    (JointType::Neck, 0.0, 0.50),
    (JointType::Head, 0.0, 0.65),
    (JointType::ShoulderLeft, -0.20, 0.42),
    (JointType::ElbowLeft, -0.30, 0.15),
    (JointType::WristLeft, -0.35, -0.10),
    (JointType::HandLeft, -0.36, -0.18),
    (JointType::ShoulderRight, 0.20, 0.42),
    (JointType::ElbowRight, 0.30, 0.15),
    (JointType::WristRight, 0.35, -0.10),
    (JointType::HandRight, 0.36, -0.18),
    (JointType::HipLeft, -0.10, -0.15),
    (JointType::KneeLeft, -0.12, -0.55),
    (JointType::AnkleLeft, -0.13, -0.90),
    (JointType::FootLeft, -0.15, -0.95),
    (JointType::HipRight, 0.10, -0.15),
    (JointType::KneeRight, 0.12, -0.55),
    (JointType::AnkleRight, 0.13, -0.90),
    (JointType::FootRight, 0.15, -0.95),
    (JointType::SpineShoulder, 0.0, 0.42),
    (JointType::HandTipLeft, -0.37, -0.26),
    (JointType::ThumbLeft, -0.32, -0.20),
    (JointType::HandTipRight, 0.37, -0.26),
    (JointType::ThumbRight, 0.32, -0.20),
];

// Occupied slots, so the HUD shows non-contiguous letters the way real tracking does.
const ACTOR_SLOTS: [usize; 2] = [1, 4];
const ACTOR_DEPTH: f32 = 2.5;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub encoding: PixelEncoding,
    pub color_fps: u32,
    pub body_fps: u32,
    pub actors: usize,
}

impl SyntheticConfig {
    pub fn from_rig(config: &RigConfig) -> Self {
        Self {
            width: config.frame_width,
            height: config.frame_height,
            encoding: config.synthetic_encoding,
            color_fps: config.color_fps,
            body_fps: config.body_fps,
            actors: ACTOR_SLOTS.len(),
        }
    }
}

pub struct SyntheticSensor {
    config: SyntheticConfig,
}

impl SyntheticSensor {
    pub fn new(mut config: SyntheticConfig) -> Self {
        if !matches!(
            config.encoding,
            PixelEncoding::Yuyv | PixelEncoding::Bgra | PixelEncoding::Rgba | PixelEncoding::Gray
        ) {
            log::warn!(
                "synthetic sensor cannot produce {}, using YUYV",
                config.encoding.label()
            );
            config.encoding = PixelEncoding::Yuyv;
        }
        config.actors = config.actors.min(ACTOR_SLOTS.len());
        Self { config }
    }
}

impl SensorSource for SyntheticSensor {
    fn name(&self) -> String {
        format!("synthetic-{}", self.config.encoding.label().to_ascii_lowercase())
    }

    fn frame_geometry(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        Arc::new(PinholeMapper::for_color_geometry(
            self.config.width,
            self.config.height,
        ))
    }

    fn open(self: Box<Self>, sink: SensorEventSink) -> Result<SensorSession> {
        let name = self.name();
        let geometry = self.frame_geometry();
        let mapper = self.coordinate_mapper();
        let config = self.config;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let color_ticks = tick(interval_for(config.color_fps));
            let body_ticks = tick(interval_for(config.body_fps));
            let started = Instant::now();

            if !sink.availability(true) {
                return;
            }

            let mut delivering = true;
            while delivering && !stop_flag.load(Ordering::Relaxed) {
                select! {
                    recv(color_ticks) -> _ => {
                        let phase = started.elapsed().as_secs_f32();
                        let data = test_pattern(config.width, config.height, config.encoding, phase);
                        let frame = VideoFrame::new(config.width, config.height, config.encoding, data);
                        delivering = sink.color_frame(Some(frame));
                    }
                    recv(body_ticks) -> _ => {
                        let phase = started.elapsed().as_secs_f32();
                        delivering = sink.body_frame(Some(animated_bodies(config.actors, phase)));
                    }
                    default(Duration::from_millis(50)) => {}
                }
            }

            log::debug!("synthetic sensor thread exiting");
        });

        Ok(SensorSession::new(name, geometry, mapper, stop, handle))
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

/// Diagonal gradient bars scrolling with `phase`.
fn test_pattern(width: u32, height: u32, encoding: PixelEncoding, phase: f32) -> Vec<u8> {
    let width = width as usize;
    let shift = (phase * 120.0) as usize;
    let luma = move |x: usize, y: usize| (((x + y / 2 + shift) / 4) % 224 + 16) as u8;

    match encoding {
        PixelEncoding::Yuyv => {
            let mut data = vec![0u8; width * height as usize * 2];
            data.par_chunks_mut(width * 2)
                .enumerate()
                .for_each(|(y, row)| {
                    for (pair, px) in row.chunks_exact_mut(4).enumerate() {
                        let x = pair * 2;
                        px[0] = luma(x, y);
                        px[1] = 128u8.wrapping_add((y % 64) as u8);
                        px[2] = luma(x + 1, y);
                        px[3] = 128u8.wrapping_sub((x % 64) as u8);
                    }
                });
            data
        }
        PixelEncoding::Gray => {
            let mut data = vec![0u8; width * height as usize];
            data.par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.iter_mut().enumerate() {
                        *px = luma(x, y);
                    }
                });
            data
        }
        // Bgra and Rgba share a layout; only the red/blue roles differ.
        _ => {
            let mut data = vec![0u8; width * height as usize * 4];
            data.par_chunks_mut(width * 4)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.chunks_exact_mut(4).enumerate() {
                        px[0] = luma(x, y);
                        px[1] = (y % 256) as u8;
                        px[2] = (x % 256) as u8;
                        px[3] = 255;
                    }
                });
            data
        }
    }
}

fn animated_bodies(actors: usize, phase: f32) -> BodySnapshot {
    let mut snapshot = BodySnapshot::default();

    for (actor, &slot) in ACTOR_SLOTS.iter().enumerate().take(actors.min(BODY_COUNT)) {
        let offset = actor as f32 * 1.7;
        let root_x = (actor as f32 - 0.5) * 0.9 + 0.25 * (phase * 0.6 + offset).sin();
        let wave = (phase * 2.4 + offset).sin();

        let mut body = Body {
            tracked: true,
            tracking_id: 72_057_594_037_927_936 + slot as u64,
            ..Default::default()
        };

        for &(joint, dx, dy) in &POSE {
            let mut x = root_x + dx;
            let mut y = dy;
            // Right forearm waves over the head.
            match joint {
                JointType::WristRight | JointType::HandRight | JointType::HandTipRight | JointType::ThumbRight => {
                    x += 0.05 * wave;
                    y += 0.55 + 0.15 * wave;
                }
                JointType::ElbowRight => y += 0.25,
                _ => {}
            }

            // Feet drop to inferred every few seconds, as they do near the floor.
            let state = match joint {
                JointType::FootLeft | JointType::FootRight if (phase + offset) % 4.0 > 3.0 => {
                    TrackingState::Inferred
                }
                _ => TrackingState::Tracked,
            };
            body.set_joint(joint, CameraSpacePoint::new(x, y, ACTOR_DEPTH), state);
        }

        body.hand_right = match ((phase + offset) as u32) % 3 {
            0 => HandState::Open,
            1 => HandState::Closed,
            _ => HandState::Lasso,
        };
        body.hand_left = HandState::NotTracked;

        snapshot.bodies[slot] = body;
    }

    snapshot
}
