/// MIDI note output: the sink trait the control loop talks to, and a midir
/// backed output port.
use midir::{MidiOutput, MidiOutputConnection};

/// Error type for MIDI port operations
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("Failed to create MIDI output: {0}")]
    InitError(String),

    #[error("No MIDI output ports available")]
    NoPorts,

    #[error("Invalid port index: {0}")]
    InvalidPort(usize),

    #[error("No MIDI port found matching pattern: {0}")]
    PortNotFound(String),

    #[error("Failed to connect: {0}")]
    ConnectionError(String),
}

/// 1-based MIDI channel as printed on gear (drums usually sit on 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const DRUMS: Channel = Channel(10);
    pub const MELODY: Channel = Channel(1);

    /// Clamps into 1..=16.
    pub fn new(channel: u8) -> Self {
        Self(channel.clamp(1, 16))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Low nibble of the status byte.
    pub fn wire(self) -> u8 {
        self.0 - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { channel: Channel, note: u8, velocity: u8 },
    NoteOff { channel: Channel, note: u8, velocity: u8 },
}

impl NoteEvent {
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            NoteEvent::NoteOn { channel, note, velocity } => {
                [0x90 | channel.wire(), note & 0x7F, velocity & 0x7F]
            }
            NoteEvent::NoteOff { channel, note, velocity } => {
                [0x80 | channel.wire(), note & 0x7F, velocity & 0x7F]
            }
        }
    }
}

/// Where notes go. Writes are fire-and-forget: a sink that fails to deliver
/// drops the note.
pub trait MidiSink {
    fn note_on(&mut self, channel: Channel, note: u8, velocity: u8);
    fn note_off(&mut self, channel: Channel, note: u8, velocity: u8);

    fn send(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { channel, note, velocity } => self.note_on(channel, note, velocity),
            NoteEvent::NoteOff { channel, note, velocity } => self.note_off(channel, note, velocity),
        }
    }
}

/// Fan out to both sinks.
impl<A: MidiSink, B: MidiSink> MidiSink for (A, B) {
    fn note_on(&mut self, channel: Channel, note: u8, velocity: u8) {
        self.0.note_on(channel, note, velocity);
        self.1.note_on(channel, note, velocity);
    }

    fn note_off(&mut self, channel: Channel, note: u8, velocity: u8) {
        self.0.note_off(channel, note, velocity);
        self.1.note_off(channel, note, velocity);
    }
}

/// Keeps every note it receives, in order.
#[derive(Debug, Default, Clone)]
pub struct NoteLog {
    pub events: Vec<NoteEvent>,
}

impl NoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<NoteEvent> {
        std::mem::take(&mut self.events)
    }
}

impl MidiSink for NoteLog {
    fn note_on(&mut self, channel: Channel, note: u8, velocity: u8) {
        self.events.push(NoteEvent::NoteOn { channel, note, velocity });
    }

    fn note_off(&mut self, channel: Channel, note: u8, velocity: u8) {
        self.events.push(NoteEvent::NoteOff { channel, note, velocity });
    }
}

pub struct MidiOutputDevice {
    client_name: String,
    connection: Option<MidiOutputConnection>,
    port_name: Option<String>,
}

impl MidiOutputDevice {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            connection: None,
            port_name: None,
        }
    }

    pub fn available_ports(client_name: &str) -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(client_name) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), MidiError> {
        let midi_out = MidiOutput::new(&self.client_name)
            .map_err(|e| MidiError::InitError(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports.get(port_index).ok_or(MidiError::InvalidPort(port_index))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "midikeeb")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        log::info!("Connected MIDI output to '{}'", name);
        self.connection = Some(connection);
        self.port_name = Some(name);
        Ok(())
    }

    /// Connect to the first port whose name contains `pattern`
    /// (case-insensitive). An empty pattern picks the first port.
    pub fn connect_matching(&mut self, pattern: &str) -> Result<(), MidiError> {
        let ports = Self::available_ports(&self.client_name);
        if ports.is_empty() {
            return Err(MidiError::NoPorts);
        }

        let index = find_port(&ports, pattern)
            .ok_or_else(|| MidiError::PortNotFound(pattern.to_string()))?;
        self.connect(index)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
        self.port_name = None;
    }

    fn write(&mut self, event: NoteEvent) {
        if let Some(ref mut conn) = self.connection {
            if let Err(e) = conn.send(&event.to_bytes()) {
                log::warn!("Dropped MIDI message {:?}: {}", event, e);
            }
        }
    }
}

impl MidiSink for MidiOutputDevice {
    fn note_on(&mut self, channel: Channel, note: u8, velocity: u8) {
        self.write(NoteEvent::NoteOn { channel, note, velocity });
    }

    fn note_off(&mut self, channel: Channel, note: u8, velocity: u8) {
        self.write(NoteEvent::NoteOff { channel, note, velocity });
    }
}

fn find_port(ports: &[String], pattern: &str) -> Option<usize> {
    let pattern = pattern.to_lowercase();
    ports
        .iter()
        .position(|name| name.to_lowercase().contains(&pattern))
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
