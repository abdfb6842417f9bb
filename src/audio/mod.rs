mod instrument;
mod oscillator;
mod param;
mod sampler;
mod synth;
mod voice;

pub use instrument::{Instrument, Wave};
pub use oscillator::{GainId, OscillatorBackend, OscillatorId, OscillatorVoice};
pub use param::GainParam;
pub use sampler::{SampleBuffer, SamplerBackend, anchor_notes};
pub use synth::{SynthBackend, SynthVoice};
pub use voice::{AdsrConfig, AdsrEnvelope, EnvelopeState, RampEnvelope};

use crate::pitch::{NoteName, frequency_to_midi};

/// Seconds on a backend's monotonic clock.
pub type Timestamp = f64;

/// What a backend wants to be told when a note starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    Frequency,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    Frequency(f64),
    Note(NoteName),
}

impl Pitch {
    pub fn for_backend(note: NoteName, addressing: Addressing) -> Self {
        match addressing {
            Addressing::Frequency => Pitch::Frequency(note.frequency()),
            Addressing::Note => Pitch::Note(note),
        }
    }

    pub fn frequency(&self) -> f64 {
        match self {
            Pitch::Frequency(hz) => *hz,
            Pitch::Note(note) => note.frequency(),
        }
    }

    /// The named note, or the nearest equal-tempered one for a raw frequency.
    pub fn note(&self) -> NoteName {
        match self {
            Pitch::Frequency(hz) => NoteName::from_midi(frequency_to_midi(*hz)),
            Pitch::Note(note) => *note,
        }
    }
}

/// An engine able to start and stop pitched voices against its own clock.
///
/// Backends must accept triggers that arrive before `unlock` has taken
/// effect, either by keeping the voice until output starts or by dropping
/// it. Callers never wait on `unlock`.
pub trait AudioBackend {
    type Voice;

    fn addressing(&self) -> Addressing;

    /// One-time, non-blocking initialization. Repeated calls are harmless.
    fn unlock(&mut self);

    fn now(&self) -> Timestamp;

    fn trigger_attack(&mut self, pitch: Pitch, at: Timestamp) -> Self::Voice;

    /// Starts the release of `voice`. The fade begins at whatever level the
    /// voice has reached at `at`, never from full scale.
    fn trigger_release(&mut self, voice: Self::Voice, at: Timestamp);

    fn release_all(&mut self, at: Timestamp);
}

/// Mono block rendering. Rendering `out.len()` frames advances the clock by
/// the same amount.
pub trait Render {
    fn render(&mut self, out: &mut [f32]);

    /// Re-times the backend for an output running at `sample_rate`. The
    /// current time is kept.
    fn set_sample_rate(&mut self, sample_rate: f32);
}

/// Steps an oscillator phase by `step` cycles, wrapped into `0.0..1.0`. A
/// non-finite result restarts the cycle.
pub(crate) fn advance_phase(phase: f64, step: f64) -> f64 {
    let next = (phase + step).rem_euclid(1.0);
    if next.is_finite() && next < 1.0 { next } else { 0.0 }
}

/// Sample-counting clock shared by the software backends.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    sample_rate: f32,
    frames: u64,
}

impl Clock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn now(&self) -> Timestamp {
        self.time_at(0)
    }

    /// Time of the frame `offset` frames past the current position.
    pub fn time_at(&self, offset: usize) -> Timestamp {
        (self.frames + offset as u64) as f64 / self.sample_rate as f64
    }

    pub fn advance(&mut self, frames: usize) {
        self.frames += frames as u64;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let now = self.now();
        self.sample_rate = sample_rate;
        self.frames = (now * sample_rate as f64).round() as u64;
    }
}
