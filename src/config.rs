use std::path::PathBuf;

use serde::Deserialize;

use crate::encoder::{TempoState, DEFAULT_INTERVAL_MS};
use crate::midi::Channel;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    timing: TimingConfig,
    #[serde(default)]
    midi: MidiConfig,
    #[serde(default)]
    encoder: EncoderConfig,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default)]
struct TimingConfig {
    tick_ms: Option<u64>,
    settle_ms: Option<u64>,
    step_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct MidiConfig {
    client_name: Option<String>,
    port: Option<String>,
    drum_channel: Option<u8>,
    melody_channel: Option<u8>,
    velocity: Option<u8>,
}

#[derive(Deserialize, Default)]
struct EncoderConfig {
    invert: Option<bool>,
}

#[derive(Deserialize, Default)]
struct AudioConfig {
    preview: Option<bool>,
}

pub struct Config {
    timing: TimingConfig,
    midi: MidiConfig,
    encoder: EncoderConfig,
    audio: AudioConfig,
}

impl Config {
    /// Embedded defaults, overlaid with the user's config file when it exists
    /// and parses. A bad user file is reported and skipped.
    pub fn load() -> Self {
        let mut base = embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => merge(&mut base, user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Self::from_file(base)
    }

    /// Embedded defaults overlaid with `contents`.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut base = embedded();
        let user: ConfigFile = toml::from_str(contents)?;
        merge(&mut base, user);
        Ok(Self::from_file(base))
    }

    fn from_file(file: ConfigFile) -> Self {
        Config {
            timing: file.timing,
            midi: file.midi,
            encoder: file.encoder,
            audio: file.audio,
        }
    }

    pub fn tick_ms(&self) -> u64 {
        self.timing.tick_ms.unwrap_or(10)
    }

    pub fn settle_ms(&self) -> u64 {
        self.timing.settle_ms.unwrap_or(1)
    }

    /// Starting tempo, clamped to the encoder's range.
    pub fn tempo(&self) -> TempoState {
        TempoState::new(self.timing.step_interval_ms.unwrap_or(DEFAULT_INTERVAL_MS))
    }

    pub fn client_name(&self) -> &str {
        self.midi.client_name.as_deref().unwrap_or("MIDI KEEB")
    }

    pub fn midi_port(&self) -> &str {
        self.midi.port.as_deref().unwrap_or("")
    }

    pub fn drum_channel(&self) -> Channel {
        self.midi.drum_channel.map(Channel::new).unwrap_or(Channel::DRUMS)
    }

    pub fn melody_channel(&self) -> Channel {
        self.midi.melody_channel.map(Channel::new).unwrap_or(Channel::MELODY)
    }

    pub fn velocity(&self) -> u8 {
        self.midi.velocity.unwrap_or(64).min(127)
    }

    pub fn invert_encoder(&self) -> bool {
        self.encoder.invert.unwrap_or(false)
    }

    pub fn audio_preview(&self) -> bool {
        self.audio.preview.unwrap_or(true)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(embedded())
    }
}

fn embedded() -> ConfigFile {
    toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
        log::error!(target: "config", "embedded config.toml is invalid: {}", e);
        ConfigFile::default()
    })
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("midikeeb").join("config.toml"))
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_timing(&mut base.timing, user.timing);
    merge_midi(&mut base.midi, user.midi);
    if user.encoder.invert.is_some() {
        base.encoder.invert = user.encoder.invert;
    }
    if user.audio.preview.is_some() {
        base.audio.preview = user.audio.preview;
    }
}

fn merge_timing(base: &mut TimingConfig, user: TimingConfig) {
    if user.tick_ms.is_some() {
        base.tick_ms = user.tick_ms;
    }
    if user.settle_ms.is_some() {
        base.settle_ms = user.settle_ms;
    }
    if user.step_interval_ms.is_some() {
        base.step_interval_ms = user.step_interval_ms;
    }
}

fn merge_midi(base: &mut MidiConfig, user: MidiConfig) {
    if user.client_name.is_some() {
        base.client_name = user.client_name;
    }
    if user.port.is_some() {
        base.port = user.port;
    }
    if user.drum_channel.is_some() {
        base.drum_channel = user.drum_channel;
    }
    if user.melody_channel.is_some() {
        base.melody_channel = user.melody_channel;
    }
    if user.velocity.is_some() {
        base.velocity = user.velocity;
    }
}
