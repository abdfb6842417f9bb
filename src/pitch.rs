//! Note names, equal-tempered frequencies and chromatic transposition.
//!
//! Note names are written `<PitchLetter>[#]<Octave>`, e.g. `C4`, `F#3`,
//! `A-1`. Only sharps are spelled; the twelve pitch tokens are
//! `C C# D D# E F F# G G# A A# B`. Tuning is referenced to A4 = 440 Hz and
//! middle C is `C4` (MIDI 60).

use std::fmt;
use std::str::FromStr;

use crate::error::PitchError;

pub const A4_FREQUENCY: f64 = 440.0;
pub const A4_MIDI: i32 = 69;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Position within the octave, C=0 ... B=11.
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Inverse of [`PitchClass::index`]; any integer is folded into 0..12.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    pub fn token(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }

    pub fn is_natural(self) -> bool {
        !self.token().ends_with('#')
    }
}

/// A parsed note name: pitch class plus octave.
///
/// Every `NoteName` has a MIDI number that fits in an `i32`; octaves too far
/// out for that are refused at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteName {
    pitch: PitchClass,
    octave: i32,
}

impl NoteName {
    /// `None` when the octave is out of range.
    pub fn new(pitch: PitchClass, octave: i32) -> Option<Self> {
        checked_midi(pitch, octave).map(|_| Self { pitch, octave })
    }

    pub fn pitch(self) -> PitchClass {
        self.pitch
    }

    pub fn octave(self) -> i32 {
        self.octave
    }

    pub fn midi(self) -> i32 {
        midi_number(self.pitch, self.octave) as i32
    }

    pub fn from_midi(midi: i32) -> Self {
        Self {
            pitch: PitchClass::from_index(midi),
            octave: midi.div_euclid(12) - 1,
        }
    }

    /// Equal-tempered frequency in Hz.
    pub fn frequency(self) -> f64 {
        let semitones_from_a4 = self.midi() as f64 - A4_MIDI as f64;
        A4_FREQUENCY * 2.0_f64.powf(semitones_from_a4 / 12.0)
    }

    /// Moves the note by `semitones`, carrying into the octave with floored
    /// division so downward moves cross octave boundaries correctly. `None`
    /// if the result falls outside the representable range.
    pub fn transpose(self, semitones: i32) -> Option<Self> {
        self.midi().checked_add(semitones).map(Self::from_midi)
    }
}

fn midi_number(pitch: PitchClass, octave: i32) -> i64 {
    (i64::from(octave) + 1) * 12 + i64::from(pitch.index())
}

fn checked_midi(pitch: PitchClass, octave: i32) -> Option<i32> {
    i32::try_from(midi_number(pitch, octave)).ok()
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch.token(), self.octave)
    }
}

impl FromStr for NoteName {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The octave starts at the first digit or minus sign after the letter.
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (token, octave) = s.split_at(split);

        let pitch =
            PitchClass::from_token(token).ok_or_else(|| PitchError::UnknownPitch(s.to_string()))?;
        octave
            .parse::<i32>()
            .ok()
            .and_then(|octave| Self::new(pitch, octave))
            .ok_or_else(|| PitchError::MalformedOctave(s.to_string()))
    }
}

pub fn note_to_frequency(note: &str) -> Result<f64, PitchError> {
    Ok(note.parse::<NoteName>()?.frequency())
}

/// Transposes a note name by `semitones`.
///
/// Input that does not parse as a note name, or that would leave the
/// representable range, is returned unchanged, so a UI loop can pass
/// arbitrary labels through without special-casing them.
pub fn transpose_note(note: &str, semitones: i32) -> String {
    note.parse::<NoteName>()
        .ok()
        .and_then(|parsed| parsed.transpose(semitones))
        .map_or_else(|| note.to_string(), |moved| moved.to_string())
}

/// Nearest MIDI note for a frequency in Hz.
pub fn frequency_to_midi(frequency: f64) -> i32 {
    (A4_MIDI as f64 + 12.0 * (frequency / A4_FREQUENCY).log2()).round() as i32
}
