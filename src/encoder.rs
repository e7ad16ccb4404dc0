/// Rotary encoder: turning changes the tempo, pushing rotates the layer.
use crate::grid::Layer;

pub const MIN_INTERVAL_MS: u64 = 100;
pub const MAX_INTERVAL_MS: u64 = 1000;
pub const INTERVAL_STEP_MS: u64 = 10;
/// Power-on step interval, about 141 BPM.
pub const DEFAULT_INTERVAL_MS: u64 = 425;

pub trait RotaryEncoder {
    /// Absolute position, updated by the encoder's own interrupt. May wrap.
    fn position(&self) -> i32;
    /// Push-button line level. The button pulls it low when pressed.
    fn button_level(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoState {
    step_interval_ms: u64,
}

impl TempoState {
    pub fn new(step_interval_ms: u64) -> Self {
        Self {
            step_interval_ms: step_interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS),
        }
    }

    pub fn step_interval_ms(&self) -> u64 {
        self.step_interval_ms
    }

    /// Milliseconds per step expressed as steps per minute.
    pub fn bpm(&self) -> u64 {
        60_000 / self.step_interval_ms
    }

    pub fn bpm_label(&self) -> String {
        format!("{} BPM", self.bpm())
    }

    pub fn slow_down(&mut self) {
        self.step_interval_ms = (self.step_interval_ms + INTERVAL_STEP_MS).min(MAX_INTERVAL_MS);
    }

    pub fn speed_up(&mut self) {
        self.step_interval_ms = self
            .step_interval_ms
            .saturating_sub(INTERVAL_STEP_MS)
            .max(MIN_INTERVAL_MS);
    }
}

impl Default for TempoState {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Default)]
pub struct EncoderController {
    last_position: Option<i32>,
    button_held: bool,
    invert: bool,
}

impl EncoderController {
    pub fn new(invert: bool) -> Self {
        Self {
            invert,
            ..Self::default()
        }
    }

    /// Direction of travel since the last poll, if the encoder moved.
    /// The first poll only records the starting position.
    pub fn poll_direction<E: RotaryEncoder>(&mut self, encoder: &E) -> Option<Direction> {
        let position = encoder.position();
        let last = self.last_position.replace(position)?;
        let delta = position.wrapping_sub(last);
        if delta == 0 {
            return None;
        }

        let clockwise = (delta > 0) != self.invert;
        Some(if clockwise {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        })
    }

    /// One tempo step per observed move, whatever the distance travelled.
    pub fn update_tempo<E: RotaryEncoder>(&mut self, encoder: &E, tempo: &mut TempoState) -> bool {
        let Some(direction) = self.poll_direction(encoder) else {
            return false;
        };
        match direction {
            Direction::Clockwise => tempo.slow_down(),
            Direction::CounterClockwise => tempo.speed_up(),
        }
        log::debug!(
            "tempo {:?}: {} ms/step ({})",
            direction,
            tempo.step_interval_ms(),
            tempo.bpm_label()
        );
        true
    }

    /// True once per push of the encoder button.
    pub fn layer_button_pressed<E: RotaryEncoder>(&mut self, encoder: &E) -> bool {
        let pressed = !encoder.button_level();
        let edge = pressed && !self.button_held;
        self.button_held = pressed;
        edge
    }

    /// Rotate `layer` on a button press edge. Returns the new layer if it changed.
    pub fn update_layer<E: RotaryEncoder>(&mut self, encoder: &E, layer: &mut Layer) -> Option<Layer> {
        if !self.layer_button_pressed(encoder) {
            return None;
        }
        *layer = layer.next();
        log::debug!("layer -> {}", layer.name());
        Some(*layer)
    }
}
