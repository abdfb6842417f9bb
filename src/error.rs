use std::path::PathBuf;

use thiserror::Error;

use crate::pitch::NoteName;

/// A note name that could not be resolved to a pitch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PitchError {
    #[error("unrecognized pitch in note `{0}`")]
    UnknownPitch(String),

    #[error("missing or malformed octave in note `{0}`")]
    MalformedOctave(String),
}

/// Bookkeeping refusals from the voice registry.
///
/// Neither is a real failure for a caller driving playback: playing a held
/// note and stopping a silent one are both defined no-ops.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("note {0} is already sounding")]
    AlreadyActive(NoteName),

    #[error("note {0} is not sounding")]
    NotFound(NoteName),
}

/// The audio backend could not be brought up or could not load its assets.
///
/// These are reported out-of-band (logs and engine updates) and never
/// returned from `play`/`stop`.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no output device available")]
    NoOutputDevice,

    #[error("failed to query output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to load sample {}: {source}", path.display())]
    SampleLoad {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}
