//! Raw oscillator backend: one oscillator feeding one gain node per note,
//! with the envelope written as explicit gain automation.

use std::collections::HashMap;

use tracing::trace;

use super::{
    Addressing, AudioBackend, Clock, GainParam, Pitch, RampEnvelope, Render, Timestamp, Wave,
    advance_phase,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OscillatorId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GainId(u64);

/// The oscillator/gain pair playing one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OscillatorVoice {
    pub oscillator: OscillatorId,
    pub gain: GainId,
}

#[derive(Debug)]
struct Oscillator {
    wave: Wave,
    frequency: f64,
    phase: f64,
    output: Option<GainId>,
    start: Option<Timestamp>,
    stop: Option<Timestamp>,
}

impl Oscillator {
    fn is_sounding(&self, t: Timestamp) -> bool {
        self.start.is_some_and(|start| start <= t) && self.stop.is_none_or(|stop| t < stop)
    }
}

pub struct OscillatorBackend {
    clock: Clock,
    wave: Wave,
    envelope: RampEnvelope,
    oscillators: HashMap<OscillatorId, Oscillator>,
    gains: HashMap<GainId, GainParam>,
    next_id: u64,
    unlocked: bool,
}

impl OscillatorBackend {
    pub fn new(sample_rate: f32, wave: Wave, envelope: RampEnvelope) -> Self {
        Self {
            clock: Clock::new(sample_rate),
            wave,
            envelope,
            oscillators: HashMap::new(),
            gains: HashMap::new(),
            next_id: 0,
            unlocked: false,
        }
    }

    pub fn envelope(&self) -> &RampEnvelope {
        &self.envelope
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn create_oscillator(&mut self, wave: Wave, frequency: f64) -> OscillatorId {
        let id = OscillatorId(self.next_id());
        self.oscillators.insert(
            id,
            Oscillator {
                wave,
                frequency,
                phase: 0.0,
                output: None,
                start: None,
                stop: None,
            },
        );
        id
    }

    pub fn create_gain(&mut self) -> GainId {
        let id = GainId(self.next_id());
        self.gains.insert(id, GainParam::default());
        id
    }

    pub fn connect(&mut self, oscillator: OscillatorId, gain: GainId) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.output = Some(gain);
        }
    }

    pub fn start(&mut self, oscillator: OscillatorId, at: Timestamp) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.start.get_or_insert(at);
        }
    }

    /// Schedules the oscillator to fall silent at `at`. It is dropped, along
    /// with its gain node, by the first render that passes that time.
    pub fn stop(&mut self, oscillator: OscillatorId, at: Timestamp) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.stop = Some(at);
        }
    }

    pub fn gain(&self, id: GainId) -> Option<&GainParam> {
        self.gains.get(&id)
    }

    pub fn gain_mut(&mut self, id: GainId) -> Option<&mut GainParam> {
        self.gains.get_mut(&id)
    }

    pub fn oscillator_count(&self) -> usize {
        self.oscillators.len()
    }

    pub fn contains(&self, oscillator: OscillatorId) -> bool {
        self.oscillators.contains_key(&oscillator)
    }

    pub fn stop_time(&self, oscillator: OscillatorId) -> Option<Timestamp> {
        self.oscillators.get(&oscillator).and_then(|osc| osc.stop)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn collect_finished(&mut self) {
        let now = self.clock.now();
        self.oscillators.retain(|_, osc| osc.stop.is_none_or(|stop| stop > now));

        let oscillators = &self.oscillators;
        self.gains
            .retain(|id, _| oscillators.values().any(|osc| osc.output == Some(*id)));
    }
}

impl AudioBackend for OscillatorBackend {
    type Voice = OscillatorVoice;

    fn addressing(&self) -> Addressing {
        Addressing::Frequency
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn trigger_attack(&mut self, pitch: Pitch, at: Timestamp) -> OscillatorVoice {
        let envelope = self.envelope;
        let gain = self.create_gain();
        if let Some(param) = self.gains.get_mut(&gain) {
            param.set_value_at_time(0.0, at);
            param.linear_ramp_to_value_at_time(envelope.peak, at + envelope.attack);
        }

        let oscillator = self.create_oscillator(self.wave, pitch.frequency());
        self.connect(oscillator, gain);
        self.start(oscillator, at);

        OscillatorVoice { oscillator, gain }
    }

    fn trigger_release(&mut self, voice: OscillatorVoice, at: Timestamp) {
        let release = self.envelope.release;
        if let Some(param) = self.gains.get_mut(&voice.gain) {
            // Hold the level reached so far before cancelling, so the ramp
            // down starts where the attack actually is.
            let current = param.value_at(at);
            param.cancel_scheduled_values(at);
            param.set_value_at_time(current, at);
            param.linear_ramp_to_value_at_time(0.0, at + release);
        }
        self.stop(voice.oscillator, at + release);
    }

    fn release_all(&mut self, at: Timestamp) {
        let held: Vec<OscillatorVoice> = self
            .oscillators
            .iter()
            .filter(|(_, osc)| osc.stop.is_none())
            .filter_map(|(&oscillator, osc)| {
                osc.output.map(|gain| OscillatorVoice { oscillator, gain })
            })
            .collect();

        trace!(count = held.len(), "releasing held oscillators");
        for voice in held {
            self.trigger_release(voice, at);
        }
    }
}

impl Render for OscillatorBackend {
    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.clock.set_sample_rate(sample_rate);
    }

    fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let sample_rate = self.clock.sample_rate() as f64;

        for (i, sample) in out.iter_mut().enumerate() {
            let t = self.clock.time_at(i);
            for osc in self.oscillators.values_mut() {
                if !osc.is_sounding(t) {
                    continue;
                }
                let level = osc
                    .output
                    .and_then(|id| self.gains.get(&id))
                    .map_or(0.0, |gain| gain.value_at(t));

                *sample += osc.wave.sample(osc.phase) * level;

                osc.phase = advance_phase(osc.phase, osc.frequency / sample_rate);
            }
        }

        self.clock.advance(out.len());
        self.collect_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1000.0;

    fn backend() -> OscillatorBackend {
        OscillatorBackend::new(SAMPLE_RATE, Wave::Sine, RampEnvelope::default())
    }

    fn render_frames(backend: &mut OscillatorBackend, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        backend.render(&mut out);
        out
    }

    #[test]
    fn attack_ramps_to_peak() {
        let mut backend = backend();
        let voice = backend.trigger_attack(Pitch::Frequency(440.0), 0.0);
        let gain = backend.gain(voice.gain).unwrap();

        assert_eq!(gain.value_at(0.0), 0.0);
        assert!((gain.value_at(0.005) - 0.25).abs() < 1e-5);
        assert_eq!(gain.value_at(0.01), 0.5);
        assert_eq!(gain.value_at(1.0), 0.5);
    }

    #[test]
    fn release_mid_attack_starts_from_current_gain() {
        let mut backend = backend();
        let voice = backend.trigger_attack(Pitch::Frequency(440.0), 0.0);
        backend.trigger_release(voice, 0.005);

        let release_end = 0.005 + backend.envelope().release;
        let gain = backend.gain(voice.gain).unwrap();
        assert!((gain.value_at(0.005) - 0.25).abs() < 1e-5);
        assert!((gain.value_at(0.055) - 0.125).abs() < 1e-5);
        assert_eq!(gain.value_at(release_end), 0.0);
        assert_eq!(backend.stop_time(voice.oscillator), Some(release_end));
    }

    #[test]
    fn release_after_attack_starts_from_peak() {
        let mut backend = backend();
        let voice = backend.trigger_attack(Pitch::Frequency(440.0), 0.0);
        backend.trigger_release(voice, 0.5);

        let gain = backend.gain(voice.gain).unwrap();
        assert_eq!(gain.value_at(0.5), 0.5);
        assert!((gain.value_at(0.55) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn oscillator_is_collected_after_release() {
        let mut backend = backend();
        let voice = backend.trigger_attack(Pitch::Frequency(220.0), 0.0);
        render_frames(&mut backend, 50);
        backend.trigger_release(voice, backend.now());

        render_frames(&mut backend, 50);
        assert!(backend.contains(voice.oscillator));

        render_frames(&mut backend, 60);
        assert!(!backend.contains(voice.oscillator));
        assert!(backend.gain(voice.gain).is_none());
        assert_eq!(backend.oscillator_count(), 0);
    }

    #[test]
    fn render_is_silent_before_start_and_bounded_after() {
        let mut backend = backend();
        backend.trigger_attack(Pitch::Frequency(100.0), 0.02);

        let out = render_frames(&mut backend, 100);
        assert!(out[..20].iter().all(|&s| s == 0.0));
        assert!(out[20..].iter().any(|&s| s != 0.0));
        assert!(out.iter().all(|s| s.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn unconnected_oscillator_is_inaudible() {
        let mut backend = backend();
        let osc = backend.create_oscillator(Wave::Square, 100.0);
        backend.start(osc, 0.0);

        let out = render_frames(&mut backend, 10);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn release_all_releases_only_held_voices() {
        let mut backend = backend();
        let a = backend.trigger_attack(Pitch::Frequency(220.0), 0.0);
        let b = backend.trigger_attack(Pitch::Frequency(330.0), 0.0);
        backend.trigger_release(a, 0.0);

        backend.release_all(0.05);
        assert_eq!(backend.stop_time(a.oscillator), Some(0.1));
        let b_stop = backend.stop_time(b.oscillator).unwrap();
        assert!((b_stop - 0.15).abs() < 1e-9);
    }

    #[test]
    fn saw_above_sample_rate_stays_in_range() {
        let mut backend = OscillatorBackend::new(SAMPLE_RATE, Wave::Saw, RampEnvelope::default());
        backend.trigger_attack(Pitch::Frequency(2500.0 + 1.0 / 3.0), 0.0);

        let out = render_frames(&mut backend, 500);
        assert!(out.iter().all(|s| s.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn non_finite_frequency_renders_finite_samples() {
        let mut backend = backend();
        backend.trigger_attack(Pitch::Frequency(f64::INFINITY), 0.0);

        let out = render_frames(&mut backend, 50);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn device_rate_retimes_the_envelope() {
        let mut backend =
            OscillatorBackend::new(48_000.0, Wave::Square, RampEnvelope::default());
        backend.set_sample_rate(SAMPLE_RATE);
        backend.trigger_attack(Pitch::Frequency(100.0), backend.now());

        // 5 ms into the 10 ms attack at the device rate.
        let out = render_frames(&mut backend, 6);
        assert!((out[5].abs() - 0.25).abs() < 1e-4);
    }
}
