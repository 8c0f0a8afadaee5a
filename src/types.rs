use std::time::Instant;

/// Maximum number of bodies the sensor tracks at once.
pub const BODY_COUNT: usize = 6;

pub const JOINT_COUNT: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelEncoding {
    Bgra,
    Rgba,
    Rgb,
    Bgr,
    Gray,
    Yuyv,
    Nv12,
    Mjpeg,
}

impl PixelEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            PixelEncoding::Bgra => "BGRA",
            PixelEncoding::Rgba => "RGBA",
            PixelEncoding::Rgb => "RGB",
            PixelEncoding::Bgr => "BGR",
            PixelEncoding::Gray => "GRAY",
            PixelEncoding::Yuyv => "YUYV",
            PixelEncoding::Nv12 => "NV12",
            PixelEncoding::Mjpeg => "MJPEG",
        }
    }

    /// Payload size for a raw frame, `None` for compressed encodings.
    pub fn raw_len(&self, width: u32, height: u32) -> Option<usize> {
        let pixels = width as usize * height as usize;
        match self {
            PixelEncoding::Bgra | PixelEncoding::Rgba => Some(pixels * 4),
            PixelEncoding::Rgb | PixelEncoding::Bgr => Some(pixels * 3),
            PixelEncoding::Gray => Some(pixels),
            PixelEncoding::Yuyv => Some(pixels * 2),
            PixelEncoding::Nv12 => Some(pixels + pixels / 2),
            PixelEncoding::Mjpeg => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub encoding: PixelEncoding,
    pub data: Vec<u8>,
    pub timestamp: Instant,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, encoding: PixelEncoding, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            encoding,
            data,
            timestamp: Instant::now(),
        }
    }
}

/// Fixed-geometry RGBA buffer that frames are converted into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut rgba = vec![0u8; width as usize * height as usize * 4];
        for px in rgba.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.rgba
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.rgba[idx..idx + 4]);
        Some(px)
    }
}

/// Sensor-space position in meters; x right, y up, z away from the sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraSpacePoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorSpacePoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum JointType {
    SpineBase = 0,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointType {
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Joint {
    pub position: CameraSpacePoint,
    pub state: TrackingState,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandState {
    #[default]
    Unknown,
    NotTracked,
    Open,
    Closed,
    Lasso,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
    pub tracked: bool,
    pub tracking_id: u64,
    pub joints: [Joint; JOINT_COUNT],
    pub hand_left: HandState,
    pub hand_right: HandState,
}

impl Body {
    pub fn joint(&self, joint: JointType) -> &Joint {
        &self.joints[joint.index()]
    }

    pub fn set_joint(&mut self, joint: JointType, position: CameraSpacePoint, state: TrackingState) {
        self.joints[joint.index()] = Joint { position, state };
    }
}

/// One body frame: a fixed arena of body slots, refreshed as a whole.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodySnapshot {
    pub bodies: [Body; BODY_COUNT],
}

impl BodySnapshot {
    pub fn tracked(&self) -> impl Iterator<Item = (SkeletalLetter, &Body)> {
        self.bodies
            .iter()
            .zip(SkeletalLetter::ALL)
            .filter(|(body, _)| body.tracked)
            .map(|(body, letter)| (letter, body))
    }
}

/// Body slot label, used to pick which skeleton drives SKELETAL mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkeletalLetter {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl SkeletalLetter {
    pub const ALL: [SkeletalLetter; BODY_COUNT] = [
        SkeletalLetter::A,
        SkeletalLetter::B,
        SkeletalLetter::C,
        SkeletalLetter::D,
        SkeletalLetter::E,
        SkeletalLetter::F,
    ];

    pub fn slot(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            SkeletalLetter::A => "A",
            SkeletalLetter::B => "B",
            SkeletalLetter::C => "C",
            SkeletalLetter::D => "D",
            SkeletalLetter::E => "E",
            SkeletalLetter::F => "F",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackingMode {
    #[default]
    Manual,
    Skeletal,
    Audible,
}

impl TrackingMode {
    pub fn label(&self) -> &'static str {
        match self {
            TrackingMode::Manual => "MANUAL",
            TrackingMode::Skeletal => "SKELETAL",
            TrackingMode::Audible => "AUDIBLE",
        }
    }
}
