use crate::types::TrackingMode;

pub const AIM_STEP: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    Up,
    Down,
    Left,
    Right,
    SelectMode(TrackingMode),
}

impl ControlEvent {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "up" => Some(ControlEvent::Up),
            "down" => Some(ControlEvent::Down),
            "left" => Some(ControlEvent::Left),
            "right" => Some(ControlEvent::Right),
            "1" | "numpad1" => Some(ControlEvent::SelectMode(TrackingMode::Manual)),
            "2" | "numpad2" => Some(ControlEvent::SelectMode(TrackingMode::Skeletal)),
            "3" | "numpad3" => Some(ControlEvent::SelectMode(TrackingMode::Audible)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Nudge { dx: i32, dy: i32 },
    SetMode(TrackingMode),
    Ignored,
}

pub fn transition(mode: TrackingMode, event: ControlEvent) -> Effect {
    match (mode, event) {
        (_, ControlEvent::SelectMode(next)) => Effect::SetMode(next),
        (TrackingMode::Manual, ControlEvent::Up) => Effect::Nudge { dx: 0, dy: 1 },
        (TrackingMode::Manual, ControlEvent::Down) => Effect::Nudge { dx: 0, dy: -1 },
        (TrackingMode::Manual, ControlEvent::Left) => Effect::Nudge { dx: -1, dy: 0 },
        (TrackingMode::Manual, ControlEvent::Right) => Effect::Nudge { dx: 1, dy: 0 },
        // SKELETAL and AUDIBLE will steer the aim themselves; until then they hold it.
        (TrackingMode::Skeletal | TrackingMode::Audible, _) => Effect::Ignored,
    }
}

// Whole steps, so the axes never drift and the origin reads 0.00.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AimState {
    steps_x: i32,
    steps_y: i32,
    mode: TrackingMode,
}

impl AimState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn horizontal(&self) -> f64 {
        self.steps_x as f64 * AIM_STEP
    }

    pub fn vertical(&self) -> f64 {
        self.steps_y as f64 * AIM_STEP
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn apply(&mut self, event: ControlEvent) -> Effect {
        let effect = transition(self.mode, event);
        match effect {
            Effect::Nudge { dx, dy } => {
                self.steps_x = self.steps_x.saturating_add(dx);
                self.steps_y = self.steps_y.saturating_add(dy);
                log::debug!(
                    "aim moved to ({:.2}, {:.2})",
                    self.horizontal(),
                    self.vertical()
                );
            }
            Effect::SetMode(mode) => {
                if mode != self.mode {
                    log::debug!("tracking mode {} -> {}", self.mode.label(), mode.label());
                }
                self.mode = mode;
            }
            Effect::Ignored => {
                log::trace!("{event:?} ignored in {} mode", self.mode.label());
            }
        }
        effect
    }
}
