/// The controller's main loop.
///
/// One tick: layer button, matrix scan, encoder, pad presses and colors,
/// drum step, melody retrigger, LED and display output, sleep. The loop owns
/// all controller state and is its only mutator.
use crate::color::{ColorBuffer, ColorEngine, LedSink};
use crate::config::Config;
use crate::display::{render_status, DisplaySink};
use crate::encoder::{EncoderController, RotaryEncoder, TempoState};
use crate::grid::{Cell, Column, Layer};
use crate::matrix::{EdgeLatch, MatrixIo, MatrixScanner, RawButtonState};
use crate::melody::MelodyEngine;
use crate::midi::{Channel, MidiSink};
use crate::sequencer::{LayerStore, Sequencer};
use crate::time::Clock;

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub tick_ms: u64,
    pub settle_ms: u64,
    pub tempo: TempoState,
    pub drum_channel: Channel,
    pub melody_channel: Channel,
    pub velocity: u8,
    pub invert_encoder: bool,
    /// Seed for the melody layer's spark colors.
    pub seed: u64,
}

impl LoopSettings {
    pub fn from_config(config: &Config, seed: u64) -> Self {
        Self {
            tick_ms: config.tick_ms(),
            settle_ms: config.settle_ms(),
            tempo: config.tempo(),
            drum_channel: config.drum_channel(),
            melody_channel: config.melody_channel(),
            velocity: config.velocity(),
            invert_encoder: config.invert_encoder(),
            seed,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default(), 0)
    }
}

/// Everything the loop carries from one tick to the next.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub layer: Layer,
    pub store: LayerStore,
    pub raw: RawButtonState,
    pub latch: EdgeLatch,
    pub colors: ColorBuffer,
    pub tempo: TempoState,
}

/// The peripherals the loop reads from and writes to.
pub struct Devices<M, E, L, D, N, C> {
    pub matrix: M,
    pub encoder: E,
    pub leds: L,
    pub display: D,
    pub midi: N,
    pub clock: C,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub layer_changed: Option<Layer>,
    pub tempo_changed: bool,
    pub step: Option<Column>,
    pub retriggered: usize,
}

pub struct ControlLoop<M, E, L, D, N, C> {
    state: ControllerState,
    devices: Devices<M, E, L, D, N, C>,
    scanner: MatrixScanner,
    encoder: EncoderController,
    colors: ColorEngine,
    sequencer: Sequencer,
    melody: MelodyEngine,
    tick_ms: u64,
}

impl<M, E, L, D, N, C> ControlLoop<M, E, L, D, N, C>
where
    M: MatrixIo,
    E: RotaryEncoder,
    L: LedSink,
    D: DisplaySink,
    N: MidiSink,
    C: Clock,
{
    pub fn new(devices: Devices<M, E, L, D, N, C>, settings: LoopSettings) -> Self {
        let state = ControllerState {
            tempo: settings.tempo,
            ..ControllerState::default()
        };

        Self {
            state,
            devices,
            scanner: MatrixScanner::new(settings.settle_ms),
            encoder: EncoderController::new(settings.invert_encoder),
            colors: ColorEngine::new(settings.seed),
            sequencer: Sequencer::new(settings.drum_channel, settings.velocity),
            melody: MelodyEngine::new(settings.melody_channel, settings.velocity),
            tick_ms: settings.tick_ms,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn devices(&self) -> &Devices<M, E, L, D, N, C> {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut Devices<M, E, L, D, N, C> {
        &mut self.devices
    }

    pub fn frame(&self) -> Column {
        self.sequencer.frame()
    }

    /// Run forever.
    pub fn run(&mut self) -> ! {
        log::info!(
            "control loop running: {} ms tick, {}",
            self.tick_ms,
            self.state.tempo.bpm_label()
        );
        loop {
            self.tick();
        }
    }

    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        report.layer_changed = self
            .encoder
            .update_layer(&self.devices.encoder, &mut self.state.layer);
        if let Some(layer) = report.layer_changed {
            self.colors
                .reset_for_layer(&mut self.state.colors, &self.state.store, layer);
        }

        self.state.raw = self
            .scanner
            .scan(&mut self.devices.matrix, &mut self.devices.clock);

        report.tempo_changed = self
            .encoder
            .update_tempo(&self.devices.encoder, &mut self.state.tempo);

        self.apply_presses();

        report.step = self.sequencer.tick(
            self.devices.clock.now_ms(),
            self.state.tempo.step_interval_ms(),
            &self.state.store,
            &mut self.devices.midi,
        );

        report.retriggered = self.melody.tick(&self.state.store, &mut self.devices.midi);

        self.devices.leds.write(&self.state.colors);
        render_status(
            &mut self.devices.display,
            self.state.layer,
            &self.state.tempo,
            self.sequencer.frame(),
        );

        self.devices.clock.sleep_ms(self.tick_ms);
        report
    }

    /// Turn this tick's presses into toggles, held pads and colors.
    fn apply_presses(&mut self) {
        let state = &mut self.state;
        let layer = state.layer;
        state.store.reset_melody();

        for cell in Cell::all() {
            if layer.is_sequencer() {
                if state.latch.is_new_press(cell, &state.raw) {
                    let enabled = state.store.toggle(layer, cell);
                    self.colors.show_step(&mut state.colors, layer, cell, enabled);
                }
                continue;
            }

            self.colors.fade(&mut state.colors, cell);
            if state.latch.is_new_press(cell, &state.raw) {
                self.colors.spark(&mut state.colors, cell);
            }
            if state.raw.get(cell) {
                state.store.set_held(cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::display::{Align, Font, Rect};
    use crate::grid::{CellGrid, Row};
    use crate::midi::{NoteEvent, NoteLog};
    use crate::time::ManualClock;

    #[derive(Default)]
    struct Pads {
        pressed: CellGrid<bool>,
        driven: Option<Column>,
    }

    impl MatrixIo for Pads {
        fn set_column(&mut self, column: Column, active: bool) {
            if active {
                self.driven = Some(column);
            } else if self.driven == Some(column) {
                self.driven = None;
            }
        }

        fn read_row(&mut self, row: Row) -> bool {
            self.driven
                .map(|column| self.pressed.get(Cell::new(column, row)))
                .unwrap_or(false)
        }
    }

    struct Knob {
        position: i32,
        level: bool,
    }

    impl RotaryEncoder for Knob {
        fn position(&self) -> i32 {
            self.position
        }

        fn button_level(&self) -> bool {
            self.level
        }
    }

    #[derive(Default)]
    struct Strip {
        last: Option<ColorBuffer>,
        writes: usize,
    }

    impl LedSink for Strip {
        fn write(&mut self, colors: &ColorBuffer) {
            self.last = Some(*colors);
            self.writes += 1;
        }
    }

    #[derive(Default)]
    struct Screen {
        texts: Vec<String>,
        marker: Option<Rect>,
        frames: usize,
    }

    impl DisplaySink for Screen {
        fn clear(&mut self) {
            self.texts.clear();
            self.marker = None;
        }
        fn fill_rect(&mut self, rect: Rect) {
            self.marker = Some(rect);
        }
        fn draw_text(&mut self, _font: Font, _x: i16, _y: i16, _align: Align, text: &str) {
            self.texts.push(text.to_string());
        }
        fn present(&mut self) {
            self.frames += 1;
        }
    }

    type TestLoop = ControlLoop<Pads, Knob, Strip, Screen, NoteLog, ManualClock>;

    const SEED: u64 = 42;

    fn controller() -> TestLoop {
        let devices = Devices {
            matrix: Pads::default(),
            encoder: Knob { position: 0, level: true },
            leds: Strip::default(),
            display: Screen::default(),
            midi: NoteLog::new(),
            clock: ManualClock::new(),
        };
        let settings = LoopSettings {
            seed: SEED,
            ..LoopSettings::default()
        };
        ControlLoop::new(devices, settings)
    }

    fn press(ctl: &mut TestLoop, cell: Cell, down: bool) {
        ctl.devices_mut().matrix.pressed.set(cell, down);
    }

    fn tap(ctl: &mut TestLoop, cell: Cell) {
        press(ctl, cell, true);
        ctl.tick();
        press(ctl, cell, false);
        ctl.tick();
    }

    fn push_layer_button(ctl: &mut TestLoop) -> Option<Layer> {
        ctl.devices_mut().encoder.level = false;
        let changed = ctl.tick().layer_changed;
        ctl.devices_mut().encoder.level = true;
        ctl.tick();
        changed
    }

    #[test]
    fn test_tap_toggles_step_and_lights_pad() {
        let mut ctl = controller();
        let cell = Cell::new(Column::C1, Row::R2);

        tap(&mut ctl, cell);
        assert!(ctl.state().store.get(Layer::Conga, cell));
        assert_eq!(ctl.state().colors.get(cell), Color::BLUE);

        tap(&mut ctl, cell);
        assert!(!ctl.state().store.get(Layer::Conga, cell));
        assert_eq!(ctl.state().colors.get(cell), Color::BLACK);
    }

    #[test]
    fn test_holding_a_pad_toggles_once() {
        let mut ctl = controller();
        let cell = Cell::new(Column::C3, Row::R0);
        press(&mut ctl, cell, true);
        for _ in 0..10 {
            ctl.tick();
        }
        assert!(ctl.state().store.get(Layer::Conga, cell));
    }

    #[test]
    fn test_layer_round_trip_keeps_patterns() {
        let mut ctl = controller();
        tap(&mut ctl, Cell::new(Column::C0, Row::R0));
        tap(&mut ctl, Cell::new(Column::C2, Row::R1));
        let conga = *ctl.state().store.grid(Layer::Conga);

        assert_eq!(push_layer_button(&mut ctl), Some(Layer::DrumKit));
        tap(&mut ctl, Cell::new(Column::C3, Row::R2));
        let drums = *ctl.state().store.grid(Layer::DrumKit);
        assert_eq!(*ctl.state().store.grid(Layer::Conga), conga);

        assert_eq!(push_layer_button(&mut ctl), Some(Layer::Melody));
        tap(&mut ctl, Cell::new(Column::C0, Row::R0));
        press(&mut ctl, Cell::new(Column::C2, Row::R1), true);
        ctl.tick();
        press(&mut ctl, Cell::new(Column::C2, Row::R1), false);

        assert_eq!(push_layer_button(&mut ctl), Some(Layer::Conga));
        assert_eq!(*ctl.state().store.grid(Layer::Conga), conga);
        assert_eq!(*ctl.state().store.grid(Layer::DrumKit), drums);
    }

    #[test]
    fn test_layer_switch_repaints_before_leds_are_written() {
        let mut ctl = controller();
        let cell = Cell::new(Column::C2, Row::R0);
        tap(&mut ctl, cell);
        push_layer_button(&mut ctl);
        push_layer_button(&mut ctl);
        assert_eq!(ctl.state().layer, Layer::Melody);

        ctl.devices_mut().encoder.level = false;
        assert_eq!(ctl.tick().layer_changed, Some(Layer::Conga));
        let shown = ctl.devices().leds.last.unwrap();
        for other in Cell::all() {
            let expected = if other == cell { Color::RED } else { Color::BLACK };
            assert_eq!(shown.get(other), expected);
        }
    }

    #[test]
    fn test_conga_step_fires_on_frame_one() {
        let mut ctl = controller();
        tap(&mut ctl, Cell::new(Column::C1, Row::R2));
        ctl.devices_mut().midi.take();

        let fired = loop {
            if let Some(step) = ctl.tick().step {
                break step;
            }
        };
        assert_eq!(fired, Column::C1);
        assert_eq!(ctl.frame(), Column::C1);
        assert_eq!(
            ctl.devices_mut().midi.take(),
            vec![NoteEvent::NoteOn { channel: Channel::DRUMS, note: 64, velocity: 64 }]
        );
    }

    #[test]
    fn test_held_melody_pad_retriggers_every_tick() {
        let mut ctl = controller();
        push_layer_button(&mut ctl);
        push_layer_button(&mut ctl);
        assert_eq!(ctl.state().layer, Layer::Melody);
        ctl.devices_mut().midi.take();

        let cell = Cell::new(Column::C0, Row::R0);
        let flash = ColorEngine::new(SEED).spark(&mut ColorBuffer::new(), cell);
        press(&mut ctl, cell, true);

        let mut seen = Vec::new();
        for _ in 0..3 {
            assert_eq!(ctl.tick().retriggered, 1);
            seen.push(ctl.state().colors.get(cell));
        }
        assert_eq!(seen, vec![flash, flash.decayed(), flash.decayed().decayed()]);

        let off = NoteEvent::NoteOff { channel: Channel::MELODY, note: 53, velocity: 64 };
        let on = NoteEvent::NoteOn { channel: Channel::MELODY, note: 53, velocity: 64 };
        assert_eq!(ctl.devices_mut().midi.take(), vec![off, on, off, on, off, on]);

        press(&mut ctl, cell, false);
        assert_eq!(ctl.tick().retriggered, 0);
        assert!(ctl.devices_mut().midi.take().is_empty());
    }

    #[test]
    fn test_melody_pads_stay_silent_on_other_layers() {
        let mut ctl = controller();
        push_layer_button(&mut ctl);
        push_layer_button(&mut ctl);
        let cell = Cell::new(Column::C3, Row::R1);
        press(&mut ctl, cell, true);
        ctl.tick();
        assert!(ctl.state().store.get(Layer::Melody, cell));

        ctl.devices_mut().encoder.level = false;
        assert_eq!(ctl.tick().retriggered, 0);
        assert!(!ctl.state().store.get(Layer::Melody, cell));
    }

    #[test]
    fn test_encoder_turns_change_tempo_and_display() {
        let mut ctl = controller();
        ctl.tick();

        ctl.devices_mut().encoder.position = -1;
        assert!(ctl.tick().tempo_changed);
        ctl.devices_mut().encoder.position = -2;
        assert!(ctl.tick().tempo_changed);
        assert!(!ctl.tick().tempo_changed);

        assert_eq!(ctl.state().tempo.step_interval_ms(), 405);
        assert_eq!(ctl.state().tempo.bpm(), 148);
        assert_eq!(ctl.devices().display.texts, vec!["CONGA", "148 BPM"]);
    }

    #[test]
    fn test_every_tick_pushes_leds_and_display() {
        let mut ctl = controller();
        for _ in 0..5 {
            ctl.tick();
        }
        assert_eq!(ctl.devices().leds.writes, 5);
        assert_eq!(ctl.devices().display.frames, 5);
        assert_eq!(ctl.devices().display.marker.map(|r| r.y), Some(0));
        // Four 1 ms column settles plus the 10 ms tick.
        assert_eq!(ctl.devices().clock.now_ms(), 5 * 14);
    }
}
