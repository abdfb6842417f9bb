use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::Instrument;
use crate::error::SettingsError;

pub const DEFAULT_SETTINGS_FILE: &str = "tonebridge.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Clock rate of the software backends until the output stream opens;
    /// from then on they run at the device rate.
    pub sample_rate: u32,
    /// 0.0 -> 1.0, applied to the rendered mix.
    pub volume: f32,
    pub instrument: Instrument,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            volume: 0.8,
            instrument: Instrument::default(),
        }
    }
}

impl Settings {
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let ron_string = fs::read_to_string(path)?;
        Self::parse(&ron_string)
    }

    /// Falls back to defaults when `path` does not exist; a file that exists
    /// but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(source: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(source)?)
    }
}
