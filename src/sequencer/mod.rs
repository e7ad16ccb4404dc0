/// Core sequencer logic - per-layer toggle state and the drum step sequencer
use crate::grid::{Cell, CellGrid, Column, Layer, Row, LAYERS, ROWS};
use crate::midi::{midi_note_name, Channel, MidiSink};

pub mod clock;

pub use clock::StepClock;

/// Drum pitch per sequencer layer and row, indexed `3 * layer + row`.
pub const DRUM_NOTES: [u8; 9] = [60, 62, 64, 36, 50, 55, 36, 50, 55];

pub fn drum_note(layer: Layer, row: Row) -> u8 {
    DRUM_NOTES[layer.index() * ROWS + row.index()]
}

/// Toggle state for every layer.
///
/// The sequencer layers keep their patterns across layer switches. The melody
/// plane only says which pads are held this tick and is rebuilt every tick.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: [CellGrid<bool>; LAYERS],
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, layer: Layer, cell: Cell) -> bool {
        self.layers[layer.index()].get(cell)
    }

    pub fn grid(&self, layer: Layer) -> &CellGrid<bool> {
        &self.layers[layer.index()]
    }

    /// Flip a step. Returns the new value; the melody layer is left alone.
    pub fn toggle(&mut self, layer: Layer, cell: Cell) -> bool {
        if !layer.is_sequencer() {
            return false;
        }
        let grid = &mut self.layers[layer.index()];
        grid.toggle(cell);
        grid.get(cell)
    }

    pub fn set_held(&mut self, cell: Cell) {
        self.layers[Layer::Melody.index()].set(cell, true);
    }

    pub fn reset_melody(&mut self) {
        self.layers[Layer::Melody.index()].clear();
    }
}

pub struct Sequencer {
    clock: StepClock,
    channel: Channel,
    velocity: u8,
}

impl Sequencer {
    pub fn new(channel: Channel, velocity: u8) -> Self {
        Self {
            clock: StepClock::new(),
            channel,
            velocity: velocity.min(127),
        }
    }

    pub fn frame(&self) -> Column {
        self.clock.frame()
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Advance the step if it is due and fire every voice enabled on the
    /// new step in both sequencer layers. Returns the step that fired.
    pub fn tick<S: MidiSink>(
        &mut self,
        now_ms: u64,
        interval_ms: u64,
        store: &LayerStore,
        sink: &mut S,
    ) -> Option<Column> {
        let step = self.clock.poll(now_ms, interval_ms)?;

        for layer in Layer::SEQUENCER {
            for row in Row::ALL {
                if store.get(layer, Cell::new(step, row)) {
                    let note = drum_note(layer, row);
                    log::trace!("step {} {} -> {}", step.index(), layer.name(), midi_note_name(note));
                    sink.note_on(self.channel, note, self.velocity);
                }
            }
        }

        Some(step)
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(Channel::DRUMS, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{NoteEvent, NoteLog};

    #[test]
    fn test_double_toggle_restores_cell() {
        let mut store = LayerStore::new();
        let cell = Cell::new(Column::C2, Row::R1);
        assert!(store.toggle(Layer::DrumKit, cell));
        assert!(!store.toggle(Layer::DrumKit, cell));
        assert!(!store.get(Layer::DrumKit, cell));
    }

    #[test]
    fn test_toggle_ignores_melody_layer() {
        let mut store = LayerStore::new();
        let cell = Cell::new(Column::C0, Row::R0);
        assert!(!store.toggle(Layer::Melody, cell));
        assert!(!store.get(Layer::Melody, cell));
    }

    #[test]
    fn test_melody_flags_do_not_touch_sequencer_layers() {
        let mut store = LayerStore::new();
        let cell = Cell::new(Column::C1, Row::R2);
        store.toggle(Layer::Conga, cell);
        let conga = *store.grid(Layer::Conga);
        let drums = *store.grid(Layer::DrumKit);

        store.set_held(cell);
        assert!(store.get(Layer::Melody, cell));
        store.reset_melody();
        assert!(!store.get(Layer::Melody, cell));

        assert_eq!(*store.grid(Layer::Conga), conga);
        assert_eq!(*store.grid(Layer::DrumKit), drums);
    }

    #[test]
    fn test_step_one_fires_conga_row_two() {
        let mut store = LayerStore::new();
        store.toggle(Layer::Conga, Cell::new(Column::C1, Row::R2));
        let mut seq = Sequencer::default();
        let mut sink = NoteLog::new();

        assert_eq!(seq.tick(425, 425, &store, &mut sink), Some(Column::C1));
        assert_eq!(
            sink.events,
            vec![NoteEvent::NoteOn { channel: Channel::DRUMS, note: 64, velocity: 64 }]
        );
    }

    #[test]
    fn test_emits_only_on_advance() {
        let mut store = LayerStore::new();
        for column in Column::ALL {
            store.toggle(Layer::DrumKit, Cell::new(column, Row::R0));
        }
        let mut seq = Sequencer::default();
        let mut sink = NoteLog::new();

        let mut now = 0;
        let mut advances = 0;
        for _ in 0..100 {
            now += 10;
            if seq.tick(now, 100, &store, &mut sink).is_some() {
                advances += 1;
            }
        }
        assert_eq!(advances, 10);
        assert_eq!(sink.events.len(), 10);
        assert!(sink.events.iter().all(|e| matches!(
            e,
            NoteEvent::NoteOn { note: 36, .. }
        )));
    }

    #[test]
    fn test_both_sequencer_layers_fire_on_same_step() {
        let mut store = LayerStore::new();
        store.toggle(Layer::Conga, Cell::new(Column::C1, Row::R0));
        store.toggle(Layer::DrumKit, Cell::new(Column::C1, Row::R1));
        let mut seq = Sequencer::default();
        let mut sink = NoteLog::new();

        seq.tick(500, 425, &store, &mut sink);
        let notes: Vec<u8> = sink
            .events
            .iter()
            .map(|e| match e {
                NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => *note,
            })
            .collect();
        assert_eq!(notes, vec![60, 50]);
    }
}
