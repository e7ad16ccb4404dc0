#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use midikeeb::{
    AudioOutput, Cell, Color, ColorBuffer, Column, Config, ControlLoop, Devices, DisplaySink,
    LedSink, LoopSettings, MatrixIo, MidiOutputDevice, Rect, RotaryEncoder, Row, SystemClock,
};
#[cfg(feature = "gui")]
use midikeeb::{Align, Font};
#[cfg(feature = "gui")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "gui")]
use std::thread;

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    log::info!("Starting MIDIKEEB panel");

    let config = Config::load();
    let panel = Arc::new(Mutex::new(PanelState::default()));
    spawn_control_loop(&config, Arc::clone(&panel));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([420.0, 560.0])
            .with_title("MIDIKEEB"),
        ..Default::default()
    };

    eframe::run_native(
        "MIDIKEEB",
        options,
        Box::new(|_cc| Ok(Box::new(PanelApp { panel }))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

/// What the virtual hardware shows and what the user is pressing.
#[cfg(feature = "gui")]
#[derive(Default)]
struct PanelState {
    pressed: [[bool; 3]; 4],
    encoder_position: i32,
    encoder_button_down: bool,
    leds: ColorBuffer,
    screen: Screen,
    midi_port: Option<String>,
}

#[cfg(feature = "gui")]
#[derive(Default, Clone)]
struct Screen {
    marker: Option<Rect>,
    texts: Vec<(Font, i16, i16, Align, String)>,
}

/// One peripheral's view of the shared panel.
#[cfg(feature = "gui")]
struct PanelHandle {
    shared: Arc<Mutex<PanelState>>,
    driven: Option<Column>,
    pending: Screen,
}

#[cfg(feature = "gui")]
impl PanelHandle {
    fn new(shared: &Arc<Mutex<PanelState>>) -> Self {
        Self {
            shared: Arc::clone(shared),
            driven: None,
            pending: Screen::default(),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut PanelState) -> R) -> Option<R> {
        self.shared.lock().ok().map(|mut state| f(&mut state))
    }
}

#[cfg(feature = "gui")]
impl MatrixIo for PanelHandle {
    fn set_column(&mut self, column: Column, active: bool) {
        if active {
            self.driven = Some(column);
        } else if self.driven == Some(column) {
            self.driven = None;
        }
    }

    fn read_row(&mut self, row: Row) -> bool {
        let Some(column) = self.driven else {
            return false;
        };
        self.with(|state| state.pressed[column.index()][row.index()])
            .unwrap_or(false)
    }
}

#[cfg(feature = "gui")]
impl RotaryEncoder for PanelHandle {
    fn position(&self) -> i32 {
        self.with(|state| state.encoder_position).unwrap_or(0)
    }

    fn button_level(&self) -> bool {
        self.with(|state| !state.encoder_button_down).unwrap_or(true)
    }
}

#[cfg(feature = "gui")]
impl LedSink for PanelHandle {
    fn write(&mut self, colors: &ColorBuffer) {
        self.with(|state| state.leds = *colors);
    }
}

#[cfg(feature = "gui")]
impl DisplaySink for PanelHandle {
    fn clear(&mut self) {
        self.pending = Screen::default();
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.pending.marker = Some(rect);
    }

    fn draw_text(&mut self, font: Font, x: i16, y: i16, align: Align, text: &str) {
        self.pending.texts.push((font, x, y, align, text.to_string()));
    }

    fn present(&mut self) {
        let screen = self.pending.clone();
        self.with(|state| state.screen = screen);
    }
}

/// The loop owns its MIDI and audio outputs, so they are opened on its thread.
#[cfg(feature = "gui")]
fn spawn_control_loop(config: &Config, panel: Arc<Mutex<PanelState>>) {
    let settings = LoopSettings::from_config(config, rand::random::<u64>());
    let client_name = config.client_name().to_string();
    let port = config.midi_port().to_string();
    let preview = config.audio_preview();

    thread::spawn(move || {
        let mut midi_out = MidiOutputDevice::new(&client_name);
        match midi_out.connect_matching(&port) {
            Ok(()) => {
                let name = midi_out.port_name().map(str::to_string);
                if let Ok(mut state) = panel.lock() {
                    state.midi_port = name;
                }
            }
            Err(e) => log::warn!("MIDI output unavailable: {}", e),
        }

        let audio = if preview {
            AudioOutput::default()
        } else {
            AudioOutput::silent()
        };

        let devices = Devices {
            matrix: PanelHandle::new(&panel),
            encoder: PanelHandle::new(&panel),
            leds: PanelHandle::new(&panel),
            display: PanelHandle::new(&panel),
            midi: (midi_out, audio),
            clock: SystemClock::new(),
        };
        let mut control = ControlLoop::new(devices, settings);
        control.run();
    });
}

#[cfg(feature = "gui")]
struct PanelApp {
    panel: Arc<Mutex<PanelState>>,
}

#[cfg(feature = "gui")]
fn led_color(color: Color) -> egui::Color32 {
    egui::Color32::from_rgb(color.red(), color.green(), color.blue())
}

#[cfg(feature = "gui")]
impl PanelApp {
    fn screen_ui(ui: &mut egui::Ui, screen: &Screen) {
        const SCALE: f32 = 2.5;
        let (response, painter) =
            ui.allocate_painter(egui::vec2(128.0 * SCALE, 64.0 * SCALE), egui::Sense::hover());
        let origin = response.rect.min;
        painter.rect_filled(response.rect, 0.0, egui::Color32::BLACK);

        if let Some(marker) = screen.marker {
            let min = origin + egui::vec2(marker.x as f32, marker.y as f32) * SCALE;
            let size = egui::vec2(marker.width as f32, marker.height as f32) * SCALE;
            painter.rect_filled(egui::Rect::from_min_size(min, size), 0.0, egui::Color32::WHITE);
        }

        for (font, x, y, align, text) in &screen.texts {
            let size = match font {
                Font::Label => 18.0,
                Font::Readout => 8.0,
            };
            let anchor = match align {
                Align::Left => egui::Align2::LEFT_BOTTOM,
                Align::Right => egui::Align2::RIGHT_BOTTOM,
            };
            painter.text(
                origin + egui::vec2(*x as f32, *y as f32) * SCALE,
                anchor,
                text,
                egui::FontId::monospace(size * SCALE),
                egui::Color32::WHITE,
            );
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for PanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        let Ok(mut state) = self.panel.lock() else {
            return;
        };

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("MIDIKEEB");
            ui.add_space(10.0);

            Self::screen_ui(ui, &state.screen);
            ui.add_space(10.0);

            // Pads: rows top to bottom, columns left to right
            for row in Row::ALL {
                ui.horizontal(|ui| {
                    for column in Column::ALL {
                        let color = state.leds.get(Cell::new(column, row));
                        let button = egui::Button::new("")
                            .min_size(egui::vec2(80.0, 60.0))
                            .fill(led_color(color));
                        let response = ui.add(button);
                        state.pressed[column.index()][row.index()] =
                            response.is_pointer_button_down_on();
                    }
                });
            }

            ui.add_space(20.0);

            // Encoder
            ui.horizontal(|ui| {
                if ui.button("⟲ Faster").clicked() {
                    state.encoder_position = state.encoder_position.wrapping_sub(1);
                }
                let push = ui.add(egui::Button::new("Layer").min_size(egui::vec2(80.0, 30.0)));
                state.encoder_button_down = push.is_pointer_button_down_on();
                if ui.button("Slower ⟳").clicked() {
                    state.encoder_position = state.encoder_position.wrapping_add(1);
                }
            });

            ui.separator();
            ui.label("Hold pads to press them, hold Layer to switch layers");
            match &state.midi_port {
                Some(port) => {
                    ui.label(format!("MIDI out: {}", port));
                }
                None => {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        "⚠ No MIDI output connected - audio preview only",
                    );
                }
            }
        });
    }
}
