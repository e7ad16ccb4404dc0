/// LED colors for the 12 pads.
///
/// Colors are packed in the strip's wire order, `0xGGRRBBAA`, so the buffer
/// can go to the LED driver untouched.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::{Cell, Layer, CELLS, ROWS};
use crate::sequencer::LayerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0);
    pub const RED: Color = Color(0x00FF_00FF);
    pub const GREEN: Color = Color(0xFF00_00FF);
    pub const BLUE: Color = Color(0x0000_FFFF);
    pub const YELLOW: Color = Color(0x88FF_00FF);
    pub const PURPLE: Color = Color(0x8000_80FF);
    pub const PINK: Color = Color(0x6622_80FF);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color((g as u32) << 24 | (r as u32) << 16 | (b as u32) << 8 | 0xFF)
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn alpha(self) -> u8 {
        self.0 as u8
    }

    /// Halve every channel and force alpha opaque. The bit shifted out of
    /// one channel never lands in the next, so channels saturate at zero.
    pub fn decayed(self) -> Self {
        Color(((self.0 >> 1) & 0x7F7F_7F00) | 0xFF)
    }
}

/// Two rows of three: each sequencer layer gets its own colors per voice.
pub const PALETTE: [Color; 6] = [
    Color::RED,
    Color::GREEN,
    Color::BLUE,
    Color::YELLOW,
    Color::PURPLE,
    Color::PINK,
];

pub fn palette_color(layer: Layer, cell: Cell) -> Color {
    PALETTE
        .get(layer.index() * ROWS + cell.row.index())
        .copied()
        .unwrap_or(Color::BLACK)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBuffer {
    colors: [Color; CELLS],
}

impl ColorBuffer {
    pub fn new() -> Self {
        Self {
            colors: [Color::BLACK; CELLS],
        }
    }

    pub fn get(&self, cell: Cell) -> Color {
        self.colors[cell.index()]
    }

    pub fn set(&mut self, cell: Cell, color: Color) {
        self.colors[cell.index()] = color;
    }

    pub fn fill(&mut self, color: Color) {
        self.colors = [color; CELLS];
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.colors
    }

    /// Packed values in strip order.
    pub fn raw(&self) -> [u32; CELLS] {
        self.colors.map(|c| c.0)
    }
}

impl Default for ColorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// LED strip. Updates are fire-and-forget.
pub trait LedSink {
    fn write(&mut self, colors: &ColorBuffer);
}

/// Turns layer state and pad strikes into LED colors.
pub struct ColorEngine {
    rng: StdRng,
}

impl ColorEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Blank the strip, then paint the new layer's pattern.
    pub fn reset_for_layer(&self, buffer: &mut ColorBuffer, store: &LayerStore, layer: Layer) {
        buffer.fill(Color::BLACK);
        if !layer.is_sequencer() {
            return;
        }
        for cell in Cell::all() {
            if store.get(layer, cell) {
                buffer.set(cell, palette_color(layer, cell));
            }
        }
    }

    pub fn show_step(&self, buffer: &mut ColorBuffer, layer: Layer, cell: Cell, enabled: bool) {
        let color = if enabled {
            palette_color(layer, cell)
        } else {
            Color::BLACK
        };
        buffer.set(cell, color);
    }

    pub fn fade(&self, buffer: &mut ColorBuffer, cell: Cell) {
        buffer.set(cell, buffer.get(cell).decayed());
    }

    /// Flash a pad with a random color.
    pub fn spark(&mut self, buffer: &mut ColorBuffer, cell: Cell) -> Color {
        let color = Color(self.rng.random::<u32>());
        buffer.set(cell, color);
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Column, Row};

    #[test]
    fn test_channel_accessors_follow_wire_order() {
        let c = Color::from_rgb(0x12, 0x34, 0x56);
        assert_eq!(c.0, 0x3412_56FF);
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (0x12, 0x34, 0x56, 0xFF));
        assert_eq!(Color::RED, Color::from_rgb(0xFF, 0, 0));
        assert_eq!(Color::GREEN, Color::from_rgb(0, 0xFF, 0));
    }

    #[test]
    fn test_decay_halves_each_channel() {
        let c = Color::from_rgb(0xFF, 0x80, 0x01).decayed();
        assert_eq!((c.red(), c.green(), c.blue()), (0x7F, 0x40, 0x00));
        assert_eq!(c.alpha(), 0xFF);
    }

    #[test]
    fn test_decay_saturates_to_zero_without_wrapping() {
        let mut c = Color(0xFFFF_FF00);
        for _ in 0..8 {
            c = c.decayed();
        }
        assert_eq!(c, Color(0x0000_00FF));
        assert_eq!(Color::BLACK.decayed(), Color(0x0000_00FF));
        // Low bits of higher channels must not bleed into lower ones.
        let c = Color(0x0101_0100).decayed();
        assert_eq!(c, Color(0x0000_00FF));
    }

    #[test]
    fn test_palette_is_distinct_per_layer_row() {
        let mut seen = Vec::new();
        for layer in Layer::SEQUENCER {
            for row in Row::ALL {
                let color = palette_color(layer, Cell::new(Column::C0, row));
                assert!(!seen.contains(&color));
                seen.push(color);
            }
        }
        assert_eq!(palette_color(Layer::Melody, Cell::new(Column::C0, Row::R0)), Color::BLACK);
    }

    #[test]
    fn test_reset_for_layer_paints_pattern() {
        let mut store = LayerStore::new();
        let on = Cell::new(Column::C2, Row::R1);
        store.toggle(Layer::DrumKit, on);

        let engine = ColorEngine::new(1);
        let mut buffer = ColorBuffer::new();
        buffer.fill(Color::PINK);

        engine.reset_for_layer(&mut buffer, &store, Layer::DrumKit);
        for cell in Cell::all() {
            let expected = if cell == on { Color::PURPLE } else { Color::BLACK };
            assert_eq!(buffer.get(cell), expected);
        }

        engine.reset_for_layer(&mut buffer, &store, Layer::Melody);
        assert!(buffer.as_slice().iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn test_spark_is_reproducible_for_seed() {
        let cell = Cell::new(Column::C0, Row::R0);
        let mut a = ColorEngine::new(7);
        let mut b = ColorEngine::new(7);
        let mut buffer = ColorBuffer::new();
        let flashed = a.spark(&mut buffer, cell);
        assert_eq!(flashed, b.spark(&mut ColorBuffer::new(), cell));
        assert_eq!(buffer.get(cell), flashed);
    }
}
