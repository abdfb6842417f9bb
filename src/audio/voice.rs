use serde::{Deserialize, Serialize};

/// Linear attack/release ramps for the raw oscillator backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampEnvelope {
    /// Seconds
    pub attack: f64,
    /// 0.0 -> 1.0
    pub peak: f32,
    /// Seconds
    pub release: f64,
}

impl Default for RampEnvelope {
    fn default() -> Self {
        Self {
            attack: 0.01,
            peak: 0.5,
            release: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrConfig {
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
    /// 0.0 -> 1.0
    pub sustain: f32,
    /// Seconds
    pub release: f32,
}

impl Default for AdsrConfig {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.6,
            release: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeState {
    Attack { time: f32 },
    Decay { time: f32 },
    Sustain,
    /// `from` is the level the envelope had when the release began.
    Release { time: f32, from: f32 },
}

/// Per-voice ADSR state, advanced by the owning backend.
#[derive(Debug, Clone, Copy)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
}

impl AdsrEnvelope {
    pub fn new() -> Self {
        Self {
            state: EnvelopeState::Attack { time: 0.0 },
            level: 0.0,
        }
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_releasing(&self) -> bool {
        matches!(self.state, EnvelopeState::Release { .. })
    }

    /// Starts the release from the current level, so releasing mid-attack
    /// fades from wherever the attack had got to.
    pub fn release(&mut self) {
        if !self.is_releasing() {
            self.state = EnvelopeState::Release {
                time: 0.0,
                from: self.level,
            };
        }
    }

    pub fn is_finished(&self, adsr: &AdsrConfig) -> bool {
        matches!(self.state, EnvelopeState::Release { time, .. } if time >= adsr.release)
    }

    pub fn advance(&mut self, adsr: &AdsrConfig, dt: f32) {
        match &mut self.state {
            EnvelopeState::Attack { time } => {
                *time += dt;
                if *time >= adsr.attack {
                    self.state = EnvelopeState::Decay { time: 0.0 };
                    self.level = 1.0;
                    return;
                }
            }
            EnvelopeState::Decay { time } => {
                *time += dt;
                if *time >= adsr.decay {
                    self.state = EnvelopeState::Sustain;
                    self.level = adsr.sustain;
                    return;
                }
            }
            EnvelopeState::Sustain => {}
            EnvelopeState::Release { time, .. } => {
                *time += dt;
            }
        }
        self.level = calculate_envelope(self.state, adsr);
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

pub fn calculate_envelope(state: EnvelopeState, adsr: &AdsrConfig) -> f32 {
    match state {
        EnvelopeState::Attack { time } => {
            if adsr.attack == 0.0 {
                1.0
            } else {
                (time / adsr.attack).min(1.0)
            }
        }
        EnvelopeState::Decay { time } => {
            let decay_progress = if adsr.decay == 0.0 {
                1.0
            } else {
                (time / adsr.decay).min(1.0)
            };
            1.0 - (1.0 - adsr.sustain) * decay_progress
        }
        EnvelopeState::Sustain => adsr.sustain,
        EnvelopeState::Release { time, from } => {
            let release_progress = if adsr.release == 0.0 {
                1.0
            } else {
                (time / adsr.release).min(1.0)
            };
            from * (1.0 - release_progress)
        }
    }
}
