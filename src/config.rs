use crate::controls::KEY_HOLD_MS;
use crate::error::ConfigError;
use crate::timing::{DEFAULT_CHANNEL, DEFAULT_SETTLE_MS, DEFAULT_VELOCITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Device settings, read from a RON file.
///
/// ```ron
/// (
///     default_channel: 2,
///     loop_enabled: true,
///     midi_in_port: Some("Clock"),
///     sequence_file: Some("phrase.json"),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_channel: u8,
    pub default_velocity: u8,
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub auto_scale_enabled: bool,
    pub loop_enabled: bool,
    pub secondary_trigger_enabled: bool,
    pub midi_in_port: Option<String>,
    pub midi_out_port: Option<String>,
    pub sequence_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_channel: DEFAULT_CHANNEL,
            default_velocity: DEFAULT_VELOCITY,
            debounce_ms: DEFAULT_SETTLE_MS,
            poll_interval_ms: 1,
            auto_scale_enabled: true,
            loop_enabled: false,
            secondary_trigger_enabled: false,
            midi_in_port: None,
            midi_out_port: None,
            sequence_file: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load `path`, or write the defaults there when it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        info!(path = %path.display(), "wrote default config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// How long a key press must hold a virtual control so that the
    /// debouncer sees it settle, whatever the poll interval.
    pub fn key_hold_ms(&self) -> u64 {
        self.debounce_ms
            .saturating_add(self.poll_interval_ms)
            .saturating_mul(2)
            .max(KEY_HOLD_MS)
    }
}
