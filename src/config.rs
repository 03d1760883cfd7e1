//! Configuration file handling
//!
//! ```toml
//! input_device = "USB Audio Interface"
//! output_device = "Built-in Speakers"
//!
//! [stream]
//! format = "i16"
//! sample_rate = 44100
//! buffer_frames = 256
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::StreamSettings;
use crate::error::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred capture device name
    pub input_device: Option<String>,
    /// Preferred playback device name
    pub output_device: Option<String>,
    pub stream: StreamSettings,
}

impl Config {
    /// Platform config file location, e.g. `~/.config/audio-devices/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "audio-devices").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the platform config file, falling back to defaults if absent.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if self.stream.buffer_frames == 0 {
            return Err(Error::Config("buffer_frames must be positive".to_string()));
        }
        Ok(())
    }
}
