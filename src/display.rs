/// Status screen: current layer, tempo and a marker over the playing step.
///
/// Glyph rendering belongs to the display driver; this only decides what is
/// drawn where on the 128x64 panel.
use crate::encoder::TempoState;
use crate::grid::{Column, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Large label for the layer name.
    Label,
    /// Small readout for the tempo.
    Readout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    /// `x` is the right edge of the text.
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
}

pub trait DisplaySink {
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect);
    /// `(x, y)` is the text baseline origin.
    fn draw_text(&mut self, font: Font, x: i16, y: i16, align: Align, text: &str);
    fn present(&mut self);
}

const STEP_MARKER_WIDTH: i16 = 32;
const STEP_MARKER_HEIGHT: i16 = 8;

/// Region over the step being played.
pub fn step_marker(frame: Column) -> Rect {
    Rect {
        x: STEP_MARKER_WIDTH * frame.index() as i16,
        y: 0,
        width: STEP_MARKER_WIDTH,
        height: STEP_MARKER_HEIGHT,
    }
}

pub fn render_status<D: DisplaySink>(display: &mut D, layer: Layer, tempo: &TempoState, frame: Column) {
    display.clear();
    display.fill_rect(step_marker(frame));
    display.draw_text(Font::Label, 4, 32, Align::Left, layer.name());
    display.draw_text(Font::Readout, 124, 60, Align::Right, &tempo.bpm_label());
    display.present();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Clear,
        Fill(Rect),
        Text(Font, i16, i16, Align, String),
        Present,
    }

    #[derive(Default)]
    struct Recorder(Vec<Call>);

    impl DisplaySink for Recorder {
        fn clear(&mut self) {
            self.0.push(Call::Clear);
        }
        fn fill_rect(&mut self, rect: Rect) {
            self.0.push(Call::Fill(rect));
        }
        fn draw_text(&mut self, font: Font, x: i16, y: i16, align: Align, text: &str) {
            self.0.push(Call::Text(font, x, y, align, text.to_string()));
        }
        fn present(&mut self) {
            self.0.push(Call::Present);
        }
    }

    #[test]
    fn test_render_status_draw_order() {
        let mut display = Recorder::default();
        render_status(&mut display, Layer::DrumKit, &TempoState::default(), Column::C2);

        assert_eq!(
            display.0,
            vec![
                Call::Clear,
                Call::Fill(Rect { x: 64, y: 0, width: 32, height: 8 }),
                Call::Text(Font::Label, 4, 32, Align::Left, "DRUMKIT".to_string()),
                Call::Text(Font::Readout, 124, 60, Align::Right, "141 BPM".to_string()),
                Call::Present,
            ]
        );
    }

    #[test]
    fn test_step_marker_spans_panel() {
        assert_eq!(step_marker(Column::C0).x, 0);
        let last = step_marker(Column::C3);
        assert_eq!(last.x + last.width, 128);
    }
}
