use std::collections::HashMap;

use super::{
    Addressing, AdsrConfig, AdsrEnvelope, AudioBackend, Clock, Pitch, Render, Timestamp, Wave,
    advance_phase,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SynthVoice(u64);

struct VoiceState {
    frequency: f64,
    phase: f64,
    start: Timestamp,
    release_at: Option<Timestamp>,
    envelope: AdsrEnvelope,
}

/// Polyphonic synth whose envelope is owned by the backend.
pub struct SynthBackend {
    clock: Clock,
    wave: Wave,
    adsr: AdsrConfig,
    voices: HashMap<SynthVoice, VoiceState>,
    next_voice: u64,
    unlocked: bool,
}

impl SynthBackend {
    pub fn new(sample_rate: f32, wave: Wave, adsr: AdsrConfig) -> Self {
        Self {
            clock: Clock::new(sample_rate),
            wave,
            adsr,
            voices: HashMap::new(),
            next_voice: 0,
            unlocked: false,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn level(&self, voice: SynthVoice) -> Option<f32> {
        self.voices.get(&voice).map(|v| v.envelope.level())
    }

    pub fn is_releasing(&self, voice: SynthVoice) -> bool {
        self.voices
            .get(&voice)
            .is_some_and(|v| v.envelope.is_releasing() || v.release_at.is_some())
    }
}

impl AudioBackend for SynthBackend {
    type Voice = SynthVoice;

    fn addressing(&self) -> Addressing {
        Addressing::Frequency
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn trigger_attack(&mut self, pitch: Pitch, at: Timestamp) -> SynthVoice {
        let id = SynthVoice(self.next_voice);
        self.next_voice += 1;
        self.voices.insert(
            id,
            VoiceState {
                frequency: pitch.frequency(),
                phase: 0.0,
                start: at,
                release_at: None,
                envelope: AdsrEnvelope::new(),
            },
        );
        id
    }

    fn trigger_release(&mut self, voice: SynthVoice, at: Timestamp) {
        if let Some(state) = self.voices.get_mut(&voice) {
            if !state.envelope.is_releasing() {
                state.release_at = Some(at);
            }
        }
    }

    fn release_all(&mut self, at: Timestamp) {
        for state in self.voices.values_mut() {
            if !state.envelope.is_releasing() && state.release_at.is_none() {
                state.release_at = Some(at);
            }
        }
    }
}

impl Render for SynthBackend {
    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.clock.set_sample_rate(sample_rate);
    }

    fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let sample_rate = self.clock.sample_rate();
        let dt = 1.0 / sample_rate;

        for (i, sample) in out.iter_mut().enumerate() {
            let t = self.clock.time_at(i);
            for state in self.voices.values_mut() {
                if t < state.start {
                    continue;
                }
                if state.release_at.is_some_and(|at| t >= at) {
                    state.release_at = None;
                    state.envelope.release();
                }

                *sample += self.wave.sample(state.phase) * state.envelope.level();

                state.envelope.advance(&self.adsr, dt);
                state.phase = advance_phase(state.phase, state.frequency / sample_rate as f64);
            }
        }

        self.clock.advance(out.len());

        let adsr = &self.adsr;
        self.voices.retain(|_, state| !state.envelope.is_finished(adsr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADSR: AdsrConfig = AdsrConfig {
        attack: 0.01,
        decay: 0.01,
        sustain: 0.5,
        release: 0.1,
    };

    fn render_frames(backend: &mut SynthBackend, frames: usize) {
        let mut out = vec![0.0; frames];
        backend.render(&mut out);
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn voice_reaches_sustain() {
        let mut synth = SynthBackend::new(1000.0, Wave::Saw, ADSR);
        let voice = synth.trigger_attack(Pitch::Frequency(110.0), 0.0);

        render_frames(&mut synth, 100);
        assert!((synth.level(voice).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn released_voice_fades_and_is_removed() {
        let mut synth = SynthBackend::new(1000.0, Wave::Sine, ADSR);
        let voice = synth.trigger_attack(Pitch::Frequency(110.0), 0.0);
        render_frames(&mut synth, 100);

        synth.trigger_release(voice, synth.now());
        assert!(synth.is_releasing(voice));

        render_frames(&mut synth, 50);
        let level = synth.level(voice).unwrap();
        assert!(level > 0.0 && level < 0.5);

        render_frames(&mut synth, 60);
        assert_eq!(synth.level(voice), None);
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn release_mid_attack_never_jumps_up() {
        let mut synth = SynthBackend::new(1000.0, Wave::Sine, ADSR);
        let voice = synth.trigger_attack(Pitch::Frequency(110.0), 0.0);
        render_frames(&mut synth, 5);
        let reached = synth.level(voice).unwrap();
        assert!(reached < 1.0);

        synth.trigger_release(voice, synth.now());
        render_frames(&mut synth, 1);
        assert!(synth.level(voice).unwrap() <= reached);
    }

    #[test]
    fn release_all_marks_every_voice() {
        let mut synth = SynthBackend::new(1000.0, Wave::Sine, ADSR);
        let a = synth.trigger_attack(Pitch::Frequency(220.0), 0.0);
        let b = synth.trigger_attack(Pitch::Frequency(330.0), 0.0);

        synth.release_all(0.0);
        assert!(synth.is_releasing(a));
        assert!(synth.is_releasing(b));

        render_frames(&mut synth, 200);
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn saw_above_sample_rate_stays_in_range() {
        let mut synth = SynthBackend::new(1000.0, Wave::Saw, ADSR);
        synth.trigger_attack(Pitch::Frequency(1750.0), 0.0);
        render_frames(&mut synth, 500);
    }
}
