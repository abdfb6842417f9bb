//! Sample-based backend.
//!
//! Seven recorded anchors, the naturals of octave 4, cover the whole
//! keyboard: any other note plays the nearest anchor at playback rate
//! `2^(semitones / 12)`. Voices are addressed by note name.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::{Addressing, AudioBackend, Clock, Pitch, Render, Timestamp};
use crate::error::BackendError;
use crate::pitch::{NoteName, PitchClass};

const ANCHOR_OCTAVE: i32 = 4;

pub fn anchor_notes() -> impl Iterator<Item = NoteName> {
    PitchClass::ALL
        .into_iter()
        .filter(|pitch| pitch.is_natural())
        .filter_map(|pitch| NoteName::new(pitch, ANCHOR_OCTAVE))
}

/// Decoded mono audio.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub frames: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Reads a WAV file, mixing all channels down to mono.
    pub fn load_wav(path: &Path) -> Result<Self, BackendError> {
        let load_error = |source| BackendError::SampleLoad {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = hound::WavReader::open(path).map_err(load_error)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect()
            }
        };
        let samples = samples.map_err(load_error)?;

        let frames = samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self {
            frames,
            sample_rate: spec.sample_rate,
        })
    }

    /// Linearly interpolated read; `None` past the end.
    fn read(&self, position: f64) -> Option<f32> {
        let index = position as usize;
        let current = *self.frames.get(index)?;
        let next = self.frames.get(index + 1).copied().unwrap_or(0.0);
        let frac = (position - index as f64) as f32;
        Some(current + (next - current) * frac)
    }
}

struct Anchor {
    note: NoteName,
    path: PathBuf,
    buffer: Option<SampleBuffer>,
}

struct VoiceState {
    note: NoteName,
    anchor: usize,
    rate: f64,
    position: f64,
    start: Timestamp,
    release_at: Option<Timestamp>,
    finished: bool,
}

pub struct SamplerBackend {
    clock: Clock,
    anchors: Vec<Anchor>,
    /// Seconds
    release: f32,
    voices: Vec<VoiceState>,
    unlocked: bool,
}

impl SamplerBackend {
    pub fn new(
        sample_rate: f32,
        base_path: impl AsRef<Path>,
        extension: &str,
        release: f32,
    ) -> Self {
        let base_path = base_path.as_ref();
        let anchors = anchor_notes()
            .map(|note| Anchor {
                note,
                path: base_path.join(format!("{note}.{extension}")),
                buffer: None,
            })
            .collect();

        Self {
            clock: Clock::new(sample_rate),
            anchors,
            release,
            voices: Vec::new(),
            unlocked: false,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn sample_paths(&self) -> impl Iterator<Item = (NoteName, &Path)> {
        self.anchors.iter().map(|a| (a.note, a.path.as_path()))
    }

    /// Loads every anchor that has no audio yet. Anchors that fail to load
    /// stay silent; the errors are returned for reporting.
    pub fn load_anchors(&mut self) -> Vec<BackendError> {
        let mut errors = Vec::new();
        for anchor in self.anchors.iter_mut().filter(|a| a.buffer.is_none()) {
            match SampleBuffer::load_wav(&anchor.path) {
                Ok(buffer) => {
                    debug!(note = %anchor.note, frames = buffer.frames.len(), "loaded sample");
                    anchor.buffer = Some(buffer);
                }
                Err(err) => errors.push(err),
            }
        }
        errors
    }

    /// Supplies audio for an anchor directly. Returns false if `note` is not
    /// one of the anchors.
    pub fn install(&mut self, note: NoteName, buffer: SampleBuffer) -> bool {
        match self.anchors.iter_mut().find(|a| a.note == note) {
            Some(anchor) => {
                anchor.buffer = Some(buffer);
                true
            }
            None => false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.anchors.iter().all(|a| a.buffer.is_some())
    }

    /// Nearest anchor for `note` and the playback rate that shifts it there.
    pub fn resolve(&self, note: NoteName) -> (NoteName, f64) {
        let index = self.nearest_anchor(note);
        let anchor = self.anchors[index].note;
        (anchor, semitone_ratio(semitone_distance(anchor, note)))
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_releasing(&self, note: NoteName) -> bool {
        self.voices
            .iter()
            .any(|v| v.note == note && v.release_at.is_some())
    }

    fn nearest_anchor(&self, note: NoteName) -> usize {
        self.anchors
            .iter()
            .enumerate()
            .min_by_key(|(_, a)| semitone_distance(a.note, note).abs())
            .map_or(0, |(index, _)| index)
    }

    fn gain_at(&self, voice: &VoiceState, t: Timestamp) -> f32 {
        match voice.release_at {
            Some(at) if t >= at => {
                if self.release <= 0.0 {
                    0.0
                } else {
                    (1.0 - ((t - at) as f32 / self.release)).max(0.0)
                }
            }
            _ => 1.0,
        }
    }
}

fn semitone_distance(from: NoteName, to: NoteName) -> i64 {
    i64::from(to.midi()) - i64::from(from.midi())
}

fn semitone_ratio(semitones: i64) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

impl AudioBackend for SamplerBackend {
    type Voice = NoteName;

    fn addressing(&self) -> Addressing {
        Addressing::Note
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn trigger_attack(&mut self, pitch: Pitch, at: Timestamp) -> NoteName {
        let note = pitch.note();
        let anchor = self.nearest_anchor(note);
        let rate = semitone_ratio(semitone_distance(self.anchors[anchor].note, note));
        trace!(%note, anchor = %self.anchors[anchor].note, rate, "sampler attack");

        self.voices.push(VoiceState {
            note,
            anchor,
            rate,
            position: 0.0,
            start: at,
            release_at: None,
            finished: false,
        });
        note
    }

    fn trigger_release(&mut self, note: NoteName, at: Timestamp) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.note == note && v.release_at.is_none())
        {
            voice.release_at = Some(at);
        }
    }

    fn release_all(&mut self, at: Timestamp) {
        for voice in self.voices.iter_mut().filter(|v| v.release_at.is_none()) {
            voice.release_at = Some(at);
        }
    }
}

impl Render for SamplerBackend {
    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.clock.set_sample_rate(sample_rate);
    }

    fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let output_rate = self.clock.sample_rate() as f64;

        for index in 0..self.voices.len() {
            let voice = &self.voices[index];
            let Some(buffer) = self.anchors[voice.anchor].buffer.as_ref() else {
                continue;
            };
            let step = voice.rate * buffer.sample_rate as f64 / output_rate;
            let mut position = voice.position;
            let mut finished = false;

            for (i, sample) in out.iter_mut().enumerate() {
                let t = self.clock.time_at(i);
                if t < voice.start {
                    continue;
                }
                match buffer.read(position) {
                    Some(value) => *sample += value * self.gain_at(voice, t),
                    None => {
                        finished = true;
                        break;
                    }
                }
                position += step;
            }

            let voice = &mut self.voices[index];
            voice.position = position;
            voice.finished = finished;
        }

        self.clock.advance(out.len());

        let now = self.clock.now();
        let release = self.release as f64;
        self.voices.retain(|v| {
            !v.finished && v.release_at.is_none_or(|at| now < at + release)
        });
    }
}
