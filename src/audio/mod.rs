/// Audio preview using cpal - sounds every note the controller emits as a
/// short decaying sine, so the panel can be played without a synth attached
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

use crate::midi::{Channel, MidiSink};

/// Time for a struck note to fall by 60 dB.
const RING_SECONDS: f32 = 0.25;
const PEAK_LEVEL: f32 = 0.2;

#[derive(Debug, Default)]
struct Voice {
    frequency: Option<f32>,
    note: u8,
    level: f32,
}

pub struct AudioOutput {
    _stream: Option<cpal::Stream>,
    voice: Arc<Mutex<Voice>>,
}

impl AudioOutput {
    pub fn new() -> Option<Self> {
        let voice = Arc::new(Mutex::new(Voice::default()));
        let stream = Self::setup_audio_stream(Arc::clone(&voice))?;

        Some(Self {
            _stream: Some(stream),
            voice,
        })
    }

    /// Preview that accepts notes and makes no sound.
    pub fn silent() -> Self {
        Self {
            _stream: None,
            voice: Arc::new(Mutex::new(Voice::default())),
        }
    }

    pub fn is_active(&self) -> bool {
        self._stream.is_some()
    }

    fn setup_audio_stream(voice: Arc<Mutex<Voice>>) -> Option<cpal::Stream> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let decay = decay_per_sample(sample_rate);
        let mut phase = 0.0f32;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut voice) = voice.lock() else {
                        data.fill(0.0);
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = match voice.frequency {
                            Some(frequency) => {
                                let value = (phase * 2.0 * std::f32::consts::PI).sin() * voice.level;
                                phase = (phase + frequency / sample_rate) % 1.0;
                                voice.level *= decay;
                                if voice.level < 1e-4 {
                                    voice.frequency = None;
                                }
                                value
                            }
                            None => {
                                phase = 0.0;
                                0.0
                            }
                        };
                        frame.fill(sample);
                    }
                },
                |err| log::warn!("Audio stream error: {}", err),
                None,
            ),
            other => {
                log::warn!("Audio preview unsupported for sample format {:?}", other);
                return None;
            }
        };

        match stream {
            Ok(stream) => {
                if let Err(e) = stream.play() {
                    log::warn!("Could not start audio preview: {}", e);
                }
                Some(stream)
            }
            Err(e) => {
                log::warn!("Could not open audio preview: {}", e);
                None
            }
        }
    }

    pub fn trigger_note(&mut self, note: u8) {
        if let Ok(mut voice) = self.voice.lock() {
            voice.frequency = Some(midi_note_to_frequency(note));
            voice.note = note;
            voice.level = PEAK_LEVEL;
        }
    }

    /// Silence `note` if it is the one sounding.
    pub fn stop_note(&mut self, note: u8) {
        if let Ok(mut voice) = self.voice.lock() {
            if voice.note == note {
                voice.frequency = None;
            }
        }
    }
}

impl MidiSink for AudioOutput {
    fn note_on(&mut self, _channel: Channel, note: u8, velocity: u8) {
        if velocity == 0 {
            self.stop_note(note);
        } else {
            self.trigger_note(note);
        }
    }

    fn note_off(&mut self, _channel: Channel, note: u8, _velocity: u8) {
        self.stop_note(note);
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new().unwrap_or_else(Self::silent)
    }
}

fn midi_note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

fn decay_per_sample(sample_rate: f32) -> f32 {
    0.001_f32.powf(1.0 / (RING_SECONDS * sample_rate))
}
