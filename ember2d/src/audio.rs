use std::{
    collections::HashMap,
    f32::consts::TAU,
    fs,
    io::Cursor,
    path::Path,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Oscillator shape for procedural tones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    #[default]
    Square,
    Sawtooth,
    Triangle,
}

/// Fire-and-forget sound playback used by entity code.
///
/// The frame loop itself never plays audio.
pub trait AudioProvider {
    /// Play a loaded sound once at `volume` (0.0 to 1.0).
    fn play(&mut self, key: &str, volume: f32) -> Result<(), LookupError>;

    /// Synthesize a short tone that fades out over `duration` seconds.
    fn tone(&mut self, frequency: f32, duration: f32, volume: f32, waveform: Waveform);

    /// Loop a loaded sound as background music, replacing any current track.
    fn play_music(&mut self, key: &str, volume: f32) -> Result<(), LookupError>;

    fn stop_music(&mut self);

    fn set_music_volume(&mut self, volume: f32);

    fn master_volume(&self) -> f32;

    /// Set the master gain, clamped to `0.0..=1.0`.
    fn set_master_volume(&mut self, volume: f32);
}

/// An audio provider that accepts every request and plays nothing.
#[derive(Debug, Clone)]
pub struct SilentAudio {
    master_volume: f32,
}

impl Default for SilentAudio {
    fn default() -> Self {
        Self { master_volume: 1.0 }
    }
}

impl AudioProvider for SilentAudio {
    fn play(&mut self, _key: &str, _volume: f32) -> Result<(), LookupError> {
        Ok(())
    }

    fn tone(&mut self, _frequency: f32, _duration: f32, _volume: f32, _waveform: Waveform) {}

    fn play_music(&mut self, _key: &str, _volume: f32) -> Result<(), LookupError> {
        Ok(())
    }

    fn stop_music(&mut self) {}

    fn set_music_volume(&mut self, _volume: f32) {}

    fn master_volume(&self) -> f32 {
        self.master_volume
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }
}

/// Plays sound effects, looping music and tones on the default output device.
///
/// If no device can be opened the manager still loads and validates keys but
/// produces no sound.
pub struct AudioManager {
    _stream: Option<OutputStream>,
    stream_handle: Option<OutputStreamHandle>,
    sounds: HashMap<String, Arc<[u8]>>,
    music: Option<(Sink, f32)>,
    master_volume: f32,
}

impl AudioManager {
    /// Open the default output device.
    pub fn new() -> Self {
        match OutputStream::try_default() {
            Ok((stream, stream_handle)) => Self {
                _stream: Some(stream),
                stream_handle: Some(stream_handle),
                sounds: HashMap::new(),
                music: None,
                master_volume: 1.0,
            },
            Err(e) => {
                log::warn!("Failed to initialize audio: {}. Audio will be unavailable.", e);
                Self::silent()
            }
        }
    }

    /// A manager without an output device.
    pub fn silent() -> Self {
        Self {
            _stream: None,
            stream_handle: None,
            sounds: HashMap::new(),
            music: None,
            master_volume: 1.0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.stream_handle.is_some()
    }

    /// Read an encoded sound file (wav/ogg/mp3/flac) and store it under `key`.
    pub fn load<P: AsRef<Path>>(&mut self, key: impl Into<String>, path: P) -> Result<()> {
        let bytes = fs::read(path.as_ref())
            .with_context(|| format!("Failed to open sound file {:?}", path.as_ref()))?;
        self.load_bytes(key, bytes);
        Ok(())
    }

    /// Store already-encoded sound bytes under `key`.
    pub fn load_bytes(&mut self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.sounds.insert(key.into(), bytes.into());
    }

    pub fn has_sound(&self, key: &str) -> bool {
        self.sounds.contains_key(key)
    }

    pub fn is_music_playing(&self) -> bool {
        self.music.is_some()
    }

    fn sound(&self, key: &str) -> Result<Arc<[u8]>, LookupError> {
        self.sounds
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::AudioNotFound(key.to_string()))
    }

    fn new_sink(&self, volume: f32) -> Option<Sink> {
        let handle = self.stream_handle.as_ref()?;
        match Sink::try_new(handle) {
            Ok(sink) => {
                sink.set_volume(volume * self.master_volume);
                Some(sink)
            }
            Err(e) => {
                log::warn!("Failed to create audio sink: {}", e);
                None
            }
        }
    }
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioProvider for AudioManager {
    fn play(&mut self, key: &str, volume: f32) -> Result<(), LookupError> {
        let bytes = self.sound(key)?;
        let Some(sink) = self.new_sink(volume) else {
            return Ok(());
        };
        match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => {
                sink.append(source);
                sink.detach();
            }
            Err(e) => log::warn!("Failed to decode sound \"{}\": {}", key, e),
        }
        Ok(())
    }

    fn tone(&mut self, frequency: f32, duration: f32, volume: f32, waveform: Waveform) {
        // The envelope carries the volume; the sink only applies master gain.
        if let Some(sink) = self.new_sink(1.0) {
            sink.append(Tone::new(frequency, duration, volume, waveform));
            sink.detach();
        }
    }

    fn play_music(&mut self, key: &str, volume: f32) -> Result<(), LookupError> {
        let bytes = self.sound(key)?;
        self.stop_music();
        let Some(sink) = self.new_sink(volume) else {
            return Ok(());
        };
        match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => {
                sink.append(source.repeat_infinite());
                self.music = Some((sink, volume));
            }
            Err(e) => log::warn!("Failed to decode music \"{}\": {}", key, e),
        }
        Ok(())
    }

    fn stop_music(&mut self) {
        if let Some((sink, _)) = self.music.take() {
            sink.stop();
        }
    }

    fn set_music_volume(&mut self, volume: f32) {
        if let Some((sink, current)) = self.music.as_mut() {
            *current = volume;
            sink.set_volume(volume * self.master_volume);
        }
    }

    fn master_volume(&self) -> f32 {
        self.master_volume
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        if let Some((sink, music_volume)) = self.music.as_ref() {
            sink.set_volume(music_volume * self.master_volume);
        }
    }
}

const TONE_SAMPLE_RATE: u32 = 44_100;
/// Gain the tone envelope decays to by the end of its duration.
const TONE_FLOOR: f32 = 0.001;

/// Mono oscillator with an exponential fade-out, streamed sample by sample.
#[derive(Clone, Debug)]
pub struct Tone {
    frequency: f32,
    volume: f32,
    waveform: Waveform,
    total_samples: u64,
    index: u64,
}

impl Tone {
    pub fn new(frequency: f32, duration: f32, volume: f32, waveform: Waveform) -> Self {
        let total_samples = (duration.max(0.0) * TONE_SAMPLE_RATE as f32).round() as u64;
        Self {
            frequency,
            volume: volume.max(0.0),
            waveform,
            total_samples,
            index: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.total_samples
    }

    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    /// Envelope gain at sample `index`: `volume` ramping exponentially to 0.001.
    pub fn gain_at(&self, index: u64) -> f32 {
        if self.volume <= TONE_FLOOR || self.total_samples == 0 {
            return self.volume;
        }
        let progress = index as f32 / self.total_samples as f32;
        self.volume * (TONE_FLOOR / self.volume).powf(progress)
    }

    fn oscillator(&self, index: u64) -> f32 {
        let t = index as f32 / TONE_SAMPLE_RATE as f32;
        let phase = (t * self.frequency).fract();
        match self.waveform {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.total_samples {
            return None;
        }
        let sample = self.oscillator(self.index) * self.gain_at(self.index);
        self.index += 1;
        Some(sample)
    }
}

impl Source for Tone {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total_samples - self.index) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        TONE_SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_samples as f64 / TONE_SAMPLE_RATE as f64,
        ))
    }
}
