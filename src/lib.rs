pub mod audio;
pub mod engine;
pub mod error;
pub mod output;
pub mod pitch;
pub mod registry;
pub mod settings;
pub mod trigger;
pub mod ui;

pub use engine::{EngineCommand, EngineHandle, EngineUpdate, spawn_engine};
pub use error::{BackendError, PitchError, RegistryError, SettingsError};
pub use pitch::{NoteName, PitchClass, frequency_to_midi, note_to_frequency, transpose_note};
pub use registry::VoiceRegistry;
pub use settings::{DEFAULT_SETTINGS_FILE, Settings};
pub use trigger::NoteTrigger;
pub use ui::KeyboardApp;
