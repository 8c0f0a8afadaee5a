use super::aim::AimState;
use crate::types::{BodySnapshot, SkeletalLetter, TrackingMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorStatus {
    Running,
    NoSensor,
    NotAvailable,
}

impl SensorStatus {
    pub fn from_availability(available: bool) -> Self {
        if available {
            SensorStatus::Running
        } else {
            SensorStatus::NotAvailable
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            SensorStatus::Running => "Running",
            SensorStatus::NoSensor => "No ready sensor found!",
            SensorStatus::NotAvailable => "Sensor not available!",
        }
    }
}

/// Everything the HUD layer shows, built fresh for each render.
#[derive(Clone, Debug, PartialEq)]
pub struct HudModel {
    pub aim_x: String,
    pub aim_y: String,
    pub status_text: String,
    pub system_ready: bool,
    pub frame_rate: String,
    pub tracking_mode: TrackingMode,
    pub tracked_bodies: Vec<SkeletalLetter>,
}

impl HudModel {
    pub fn new(
        aim: &AimState,
        status: SensorStatus,
        system_ready: bool,
        frames_per_second: f64,
        bodies: &BodySnapshot,
    ) -> Self {
        Self {
            aim_x: format!("{:.2}", aim.horizontal()),
            aim_y: format!("{:.2}", aim.vertical()),
            status_text: status.text().to_string(),
            system_ready,
            frame_rate: format!("{frames_per_second:.2}"),
            tracking_mode: aim.mode(),
            tracked_bodies: bodies.tracked().map(|(letter, _)| letter).collect(),
        }
    }

    pub fn ready_label(&self) -> &'static str {
        if self.system_ready { "READY" } else { "NOT READY" }
    }

    pub fn tracked_label(&self) -> String {
        if self.tracked_bodies.is_empty() {
            return "none".to_string();
        }
        self.tracked_bodies
            .iter()
            .map(|letter| letter.label())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn readouts(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PAN", self.aim_x.clone()),
            ("TILT", self.aim_y.clone()),
            ("MODE", self.tracking_mode.label().to_string()),
            ("FPS", self.frame_rate.clone()),
            ("BODIES", self.tracked_label()),
            ("STATUS", self.status_text.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aim::ControlEvent;

    #[test]
    fn formats_two_decimals() {
        let mut aim = AimState::new();
        aim.apply(ControlEvent::Left);
        let hud = HudModel::new(&aim, SensorStatus::Running, true, 29.5, &BodySnapshot::default());

        assert_eq!(hud.aim_x, "-0.10");
        assert_eq!(hud.aim_y, "0.00");
        assert_eq!(hud.frame_rate, "29.50");
        assert_eq!(hud.tracking_mode, TrackingMode::Manual);
        assert_eq!(hud.ready_label(), "READY");
    }

    #[test]
    fn status_texts() {
        assert_eq!(SensorStatus::from_availability(true).text(), "Running");
        assert_eq!(
            SensorStatus::from_availability(false).text(),
            "Sensor not available!"
        );
        assert_eq!(SensorStatus::NoSensor.text(), "No ready sensor found!");
    }

    #[test]
    fn lists_tracked_body_letters() {
        let mut bodies = BodySnapshot::default();
        bodies.bodies[0].tracked = true;
        bodies.bodies[4].tracked = true;
        let hud = HudModel::new(&AimState::new(), SensorStatus::Running, true, 0.0, &bodies);

        assert_eq!(hud.tracked_bodies, vec![SkeletalLetter::A, SkeletalLetter::E]);
        assert_eq!(hud.tracked_label(), "A E");

        let empty = HudModel::new(&AimState::new(), SensorStatus::Running, true, 0.0, &BodySnapshot::default());
        assert_eq!(empty.tracked_label(), "none");
    }

    #[test]
    fn readouts_cover_every_field() {
        let hud = HudModel::new(&AimState::new(), SensorStatus::NotAvailable, false, 0.0, &BodySnapshot::default());
        let rows = hud.readouts();
        let labels: Vec<_> = rows.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, ["PAN", "TILT", "MODE", "FPS", "BODIES", "STATUS"]);
        assert_eq!(rows[5].1, "Sensor not available!");
        assert_eq!(hud.ready_label(), "NOT READY");
    }
}
