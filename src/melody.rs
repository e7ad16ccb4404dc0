/// Live-play pads on the melody layer.
use crate::grid::{Cell, Layer};
use crate::midi::{midi_note_name, Channel, MidiSink};
use crate::sequencer::LayerStore;

/// Pitch per pad, indexed `3 * column + row`.
pub const MELODY_NOTES: [u8; 12] = [53, 60, 67, 55, 62, 69, 57, 64, 71, 59, 65, 72];

pub fn melody_note(cell: Cell) -> u8 {
    MELODY_NOTES[cell.index()]
}

pub struct MelodyEngine {
    channel: Channel,
    velocity: u8,
}

impl MelodyEngine {
    pub fn new(channel: Channel, velocity: u8) -> Self {
        Self {
            channel,
            velocity: velocity.min(127),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Retrigger every held pad: note off, then note on, once per tick.
    /// Returns how many pads were retriggered.
    pub fn tick<S: MidiSink>(&self, store: &LayerStore, sink: &mut S) -> usize {
        let mut count = 0;
        for cell in Cell::all() {
            if !store.get(Layer::Melody, cell) {
                continue;
            }
            let note = melody_note(cell);
            log::trace!("retrigger {}", midi_note_name(note));
            sink.note_off(self.channel, note, self.velocity);
            sink.note_on(self.channel, note, self.velocity);
            count += 1;
        }
        count
    }
}

impl Default for MelodyEngine {
    fn default() -> Self {
        Self::new(Channel::MELODY, 64)
    }
}
