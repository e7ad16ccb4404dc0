/// MIDIKEEB - control core for a 4x3 pad MIDI step sequencer
///
/// This library provides the pieces of the controller's main loop:
/// - Matrix scanning and one-shot press detection
/// - Per-layer step patterns and the tempo-driven drum sequencer
/// - Live melody pads with retrigger
/// - LED colors, status screen and encoder tempo control
/// - MIDI output for production use, audio preview for testing

pub mod audio;
pub mod color;
pub mod config;
pub mod control;
pub mod display;
pub mod encoder;
pub mod grid;
pub mod matrix;
pub mod melody;
pub mod midi;
pub mod sequencer;
pub mod time;

// Re-export commonly used types
pub use audio::AudioOutput;
pub use color::{Color, ColorBuffer, LedSink};
pub use config::{Config, ConfigError};
pub use control::{ControlLoop, ControllerState, Devices, LoopSettings, TickReport};
pub use display::{Align, DisplaySink, Font, Rect};
pub use encoder::{RotaryEncoder, TempoState};
pub use grid::{Cell, Column, Layer, Row};
pub use matrix::MatrixIo;
pub use midi::{midi_note_name, Channel, MidiError, MidiOutputDevice, MidiSink, NoteEvent};
pub use sequencer::{LayerStore, Sequencer};
pub use time::{Clock, ManualClock, SystemClock};
