use super::coordinate::CoordinateMapper;
use crate::types::{
    Body, BodySnapshot, HandState, JOINT_COUNT, JointType, PixelBuffer, SkeletalLetter,
    TrackingState,
};

use JointType::*;

/// Bone topology of the sensor skeleton.
pub const BONES: &[(JointType, JointType)] = &[
    // Torso
    (Head, Neck),
    (Neck, SpineShoulder),
    (SpineShoulder, SpineMid),
    (SpineMid, SpineBase),
    (SpineShoulder, ShoulderRight),
    (SpineShoulder, ShoulderLeft),
    (SpineBase, HipRight),
    (SpineBase, HipLeft),
    // Right arm
    (ShoulderRight, ElbowRight),
    (ElbowRight, WristRight),
    (WristRight, HandRight),
    (HandRight, HandTipRight),
    (WristRight, ThumbRight),
    // Left arm
    (ShoulderLeft, ElbowLeft),
    (ElbowLeft, WristLeft),
    (WristLeft, HandLeft),
    (HandLeft, HandTipLeft),
    (WristLeft, ThumbLeft),
    // Right leg
    (HipRight, KneeRight),
    (KneeRight, AnkleRight),
    (AnkleRight, FootRight),
    // Left leg
    (HipLeft, KneeLeft),
    (KneeLeft, AnkleLeft),
    (AnkleLeft, FootLeft),
];

const BODY_COLORS: [[u8; 4]; 6] = [
    [239, 68, 68, 255],
    [249, 115, 22, 255],
    [34, 197, 94, 255],
    [56, 189, 248, 255],
    [99, 102, 241, 255],
    [168, 85, 247, 255],
];
const INFERRED_BONE_COLOR: [u8; 4] = [156, 163, 175, 255];
const TRACKED_JOINT_COLOR: [u8; 4] = [68, 192, 68, 255];
const INFERRED_JOINT_COLOR: [u8; 4] = [250, 204, 21, 255];
const HAND_CLOSED_COLOR: [u8; 4] = [255, 0, 0, 128];
const HAND_OPEN_COLOR: [u8; 4] = [0, 255, 0, 128];
const HAND_LASSO_COLOR: [u8; 4] = [0, 0, 255, 128];

/// Stroke sizes derived from the buffer width so 1080p and 480p look alike.
#[derive(Clone, Copy, Debug)]
struct Strokes {
    tracked_bone: i32,
    inferred_bone: i32,
    joint_radius: i32,
    hand_radius: i32,
}

impl Strokes {
    fn for_width(width: u32) -> Self {
        let width = width as i32;
        Self {
            tracked_bone: (width / 240).max(2),
            inferred_bone: (width / 720).max(1),
            joint_radius: (width / 170).max(2),
            hand_radius: (width / 32).max(4),
        }
    }
}

/// Draws every tracked body in `snapshot` into `buffer`; untracked slots are skipped.
pub fn draw_bodies(buffer: &mut PixelBuffer, snapshot: &BodySnapshot, mapper: &dyn CoordinateMapper) {
    let strokes = Strokes::for_width(buffer.width());
    let (width, height) = (buffer.width(), buffer.height());
    let rgba = buffer.as_mut_bytes();

    for (letter, body) in snapshot.tracked() {
        draw_body(rgba, width, height, body, letter, mapper, strokes);
    }
}

fn draw_body(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    body: &Body,
    letter: SkeletalLetter,
    mapper: &dyn CoordinateMapper,
    strokes: Strokes,
) {
    let mut points: [Option<(f32, f32)>; JOINT_COUNT] = [None; JOINT_COUNT];
    for (slot, joint) in points.iter_mut().zip(body.joints.iter()) {
        if joint.state == TrackingState::NotTracked {
            continue;
        }
        let mapped = mapper.camera_to_color(joint.position);
        if mapped.x.is_finite() && mapped.y.is_finite() {
            *slot = Some((mapped.x, mapped.y));
        }
    }

    let body_color = BODY_COLORS[letter.slot() % BODY_COLORS.len()];
    for &(a, b) in BONES {
        let (state_a, state_b) = (body.joint(a).state, body.joint(b).state);
        if state_a == TrackingState::NotTracked || state_b == TrackingState::NotTracked {
            continue;
        }
        if state_a == TrackingState::Inferred && state_b == TrackingState::Inferred {
            continue;
        }

        let (Some(pa), Some(pb)) = (points[a.index()], points[b.index()]) else {
            continue;
        };

        let (color, thickness) = if state_a == TrackingState::Tracked && state_b == TrackingState::Tracked
        {
            (body_color, strokes.tracked_bone)
        } else {
            (INFERRED_BONE_COLOR, strokes.inferred_bone)
        };
        draw_line(buffer, width, height, &pa, &pb, color, thickness);
    }

    for (joint, point) in body.joints.iter().zip(points.iter()) {
        let Some((x, y)) = *point else {
            continue;
        };
        let color = match joint.state {
            TrackingState::Tracked => TRACKED_JOINT_COLOR,
            TrackingState::Inferred => INFERRED_JOINT_COLOR,
            TrackingState::NotTracked => continue,
        };
        draw_circle(buffer, width, height, (x, y), strokes.joint_radius, color, false);
    }

    for (hand, joint) in [(body.hand_left, HandLeft), (body.hand_right, HandRight)] {
        let color = match hand {
            HandState::Closed => HAND_CLOSED_COLOR,
            HandState::Open => HAND_OPEN_COLOR,
            HandState::Lasso => HAND_LASSO_COLOR,
            HandState::Unknown | HandState::NotTracked => continue,
        };
        if let Some(center) = points[joint.index()] {
            draw_circle(buffer, width, height, center, strokes.hand_radius, color, true);
        }
    }
}

/// Clips the segment to the padded image rectangle (Liang-Barsky).
fn clip_segment(
    p0: &(f32, f32),
    p1: &(f32, f32),
    width: u32,
    height: u32,
    pad: f32,
) -> Option<((f32, f32), (f32, f32))> {
    let (x_min, y_min) = (-pad, -pad);
    let (x_max, y_max) = (width as f32 - 1.0 + pad, height as f32 - 1.0 + pad);
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);

    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    for (p, q) in [
        (-dx, p0.0 - x_min),
        (dx, x_max - p0.0),
        (-dy, p0.1 - y_min),
        (dy, y_max - p0.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (p0.0 + t0 * dx, p0.1 + t0 * dy),
        (p0.0 + t1 * dx, p0.1 + t1 * dy),
    ))
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let radius = (thickness.max(1) - 1) / 2;
    let Some((c0, c1)) = clip_segment(p0, p1, width, height, radius as f32 + 1.0) else {
        return;
    };

    let (mut x0, mut y0) = (c0.0 as i32, c0.1 as i32);
    let (x1, y1) = (c1.0 as i32, c1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox == 0 && oy == 0 {
                        continue;
                    }
                    if ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (f32, f32),
    radius: i32,
    color: [u8; 4],
    blend: bool,
) {
    let limit = radius as f32;
    if center.0 < -limit
        || center.1 < -limit
        || center.0 > width as f32 + limit
        || center.1 > height as f32 + limit
    {
        return;
    }

    let (cx, cy) = (center.0 as i32, center.1 as i32);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                if blend {
                    blend_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
                } else {
                    put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
                }
            }
        }
    }
}

fn pixel_index(buffer: &[u8], width: u32, height: u32, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 {
        return None;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return None;
    }
    let idx = (uy as usize * width as usize + ux as usize) * 4;
    (idx + 3 < buffer.len()).then_some(idx)
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if let Some(idx) = pixel_index(buffer, width, height, x, y) {
        buffer[idx..idx + 3].copy_from_slice(&color[..3]);
        buffer[idx + 3] = 255;
    }
}

fn blend_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if let Some(idx) = pixel_index(buffer, width, height, x, y) {
        let alpha = color[3] as u16;
        for c in 0..3 {
            let dst = buffer[idx + c] as u16;
            buffer[idx + c] = ((color[c] as u16 * alpha + dst * (255 - alpha)) / 255) as u8;
        }
        buffer[idx + 3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CameraSpacePoint, ColorSpacePoint};

    /// Treats sensor x/y as pixel coordinates.
    struct PixelMapper;

    impl CoordinateMapper for PixelMapper {
        fn camera_to_color(&self, point: CameraSpacePoint) -> ColorSpacePoint {
            ColorSpacePoint {
                x: point.x,
                y: point.y,
            }
        }
    }

    fn posed_body(tracked: bool, at: (f32, f32)) -> Body {
        let mut body = Body {
            tracked,
            ..Default::default()
        };
        for (i, joint) in body.joints.iter_mut().enumerate() {
            joint.position = CameraSpacePoint::new(at.0 + i as f32, at.1 + i as f32, 2.0);
            joint.state = TrackingState::Tracked;
        }
        body
    }

    fn snapshot_with(bodies: Vec<(usize, Body)>) -> BodySnapshot {
        let mut snapshot = BodySnapshot::default();
        for (slot, body) in bodies {
            snapshot.bodies[slot] = body;
        }
        snapshot
    }

    #[test]
    fn untracked_bodies_leave_buffer_untouched() {
        let mut buffer = PixelBuffer::new(120, 80);
        let before = buffer.clone();
        let snapshot = snapshot_with(
            (0..6).map(|slot| (slot, posed_body(false, (20.0, 20.0)))).collect(),
        );

        draw_bodies(&mut buffer, &snapshot, &PixelMapper);

        assert_eq!(buffer, before);
    }

    #[test]
    fn tracked_body_marks_its_joints() {
        let mut buffer = PixelBuffer::new(120, 80);
        let snapshot = snapshot_with(vec![(2, posed_body(true, (30.0, 20.0)))]);

        draw_bodies(&mut buffer, &snapshot, &PixelMapper);

        let head = JointType::Head.index() as u32;
        assert_eq!(buffer.pixel(30 + head, 20 + head), Some(TRACKED_JOINT_COLOR));
    }

    #[test]
    fn bones_use_slot_color_and_skip_untracked_joints() {
        let mut body = Body {
            tracked: true,
            ..Default::default()
        };
        body.set_joint(Head, CameraSpacePoint::new(10.0, 40.0, 2.0), TrackingState::Tracked);
        body.set_joint(Neck, CameraSpacePoint::new(110.0, 40.0, 2.0), TrackingState::Tracked);
        body.set_joint(SpineShoulder, CameraSpacePoint::new(110.0, 70.0, 2.0), TrackingState::NotTracked);

        let mut buffer = PixelBuffer::new(120, 80);
        draw_bodies(&mut buffer, &snapshot_with(vec![(3, body)]), &PixelMapper);

        assert_eq!(buffer.pixel(60, 40), Some(BODY_COLORS[3]));
        assert_eq!(buffer.pixel(110, 60), Some([0, 0, 0, 255]));
    }

    #[test]
    fn inferred_bones_are_gray() {
        let mut body = Body {
            tracked: true,
            ..Default::default()
        };
        body.set_joint(Head, CameraSpacePoint::new(10.0, 40.0, 2.0), TrackingState::Tracked);
        body.set_joint(Neck, CameraSpacePoint::new(110.0, 40.0, 2.0), TrackingState::Inferred);

        let mut buffer = PixelBuffer::new(120, 80);
        draw_bodies(&mut buffer, &snapshot_with(vec![(0, body)]), &PixelMapper);

        assert_eq!(buffer.pixel(60, 40), Some(INFERRED_BONE_COLOR));
        assert_eq!(buffer.pixel(110, 40), Some(INFERRED_JOINT_COLOR));
    }

    #[test]
    fn doubly_inferred_bones_are_skipped_but_markers_drawn() {
        let mut body = Body {
            tracked: true,
            ..Default::default()
        };
        body.set_joint(Head, CameraSpacePoint::new(10.0, 40.0, 2.0), TrackingState::Inferred);
        body.set_joint(Neck, CameraSpacePoint::new(110.0, 40.0, 2.0), TrackingState::Inferred);
        body.set_joint(SpineShoulder, CameraSpacePoint::new(60.0, 70.0, 2.0), TrackingState::NotTracked);

        let mut buffer = PixelBuffer::new(120, 80);
        draw_bodies(&mut buffer, &snapshot_with(vec![(1, body)]), &PixelMapper);

        assert_eq!(buffer.pixel(60, 40), Some([0, 0, 0, 255]));
        assert_eq!(buffer.pixel(10, 40), Some(INFERRED_JOINT_COLOR));
        assert_eq!(buffer.pixel(110, 40), Some(INFERRED_JOINT_COLOR));
        assert_eq!(buffer.pixel(60, 70), Some([0, 0, 0, 255]));
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn off_image_and_non_finite_joints_are_dropped() {
        let mut body = Body {
            tracked: true,
            ..Default::default()
        };
        for (i, joint) in body.joints.iter_mut().enumerate() {
            let position = match i % 3 {
                0 => CameraSpacePoint::new(f32::INFINITY, 10.0, 2.0),
                1 => CameraSpacePoint::new(f32::NAN, f32::NAN, 2.0),
                _ => CameraSpacePoint::new(-5.0e9, 4.0e9, 2.0),
            };
            *joint = crate::types::Joint {
                position,
                state: TrackingState::Tracked,
            };
        }
        body.hand_left = HandState::Open;

        let mut buffer = PixelBuffer::new(64, 48);
        let before = buffer.clone();
        draw_bodies(&mut buffer, &snapshot_with(vec![(0, body)]), &PixelMapper);

        assert_eq!(buffer, before);
    }

    #[test]
    fn lines_to_far_points_are_clipped_to_the_image() {
        let (width, height) = (32u32, 16u32);
        let image_len = (width * height * 4) as usize;
        let guard = 64;
        let mut memory = vec![0u8; image_len + guard];

        draw_line(
            &mut memory,
            width,
            height,
            &(16.0, 8.0),
            &(1.0e9, -3.0e9),
            [255, 255, 255, 255],
            5,
        );
        draw_circle(&mut memory, width, height, (31.0, 15.0), 6, [9, 9, 9, 255], false);

        assert!(memory[image_len..].iter().all(|&b| b == 0));
        assert!(memory[..image_len].iter().any(|&b| b == 255));
    }

    #[test]
    fn clip_rejects_segments_outside_and_trims_crossing_ones() {
        assert!(clip_segment(&(-50.0, -50.0), &(-10.0, -60.0), 20, 20, 0.0).is_none());

        let (a, b) = clip_segment(&(-10.0, 5.0), &(30.0, 5.0), 20, 20, 0.0).unwrap();
        assert!((a.0 - 0.0).abs() < 1e-3 && (a.1 - 5.0).abs() < 1e-3);
        assert!((b.0 - 19.0).abs() < 1e-3 && (b.1 - 5.0).abs() < 1e-3);
    }

    #[test]
    fn hand_state_blends_over_video() {
        let mut body = Body {
            tracked: true,
            ..Default::default()
        };
        body.set_joint(HandRight, CameraSpacePoint::new(300.0, 200.0, 2.0), TrackingState::Inferred);
        body.hand_right = HandState::Closed;

        let mut buffer = PixelBuffer::new(640, 480);
        draw_bodies(&mut buffer, &snapshot_with(vec![(1, body)]), &PixelMapper);

        // Inside the hand disc but outside the joint marker.
        let px = buffer.pixel(300, 180).unwrap();
        assert_eq!(px, [128, 0, 0, 255]);
    }
}
