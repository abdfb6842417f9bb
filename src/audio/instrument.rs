use serde::{Deserialize, Serialize};

use super::{AdsrConfig, RampEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wave {
    Sine,
    Square,
    Saw,
}

impl Wave {
    /// One sample at `phase` in [0, 1).
    pub fn sample(self, phase: f64) -> f32 {
        match self {
            Wave::Sine => (phase * std::f64::consts::TAU).sin() as f32,
            Wave::Square => {
                if phase < 0.5 {
                    -1.0
                } else {
                    1.0
                }
            }
            Wave::Saw => (phase * 2.0 - 1.0) as f32,
        }
    }
}

/// Which backend plays the keyboard, with its envelope parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instrument {
    /// One raw oscillator and gain node per note, driven by explicit ramps.
    Oscillator { wave: Wave, envelope: RampEnvelope },
    /// Polyphonic synth with its own ADSR envelope.
    Synth { wave: Wave, adsr: AdsrConfig },
    /// Seven recorded anchors `C4`..`B4` at `<base_path>/<Note>.<extension>`.
    Sampler {
        base_path: String,
        extension: String,
        /// Seconds
        release: f32,
    },
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument::Oscillator {
            wave: Wave::Sine,
            envelope: RampEnvelope::default(),
        }
    }
}
