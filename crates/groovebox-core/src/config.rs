//! Configuration file support for groovebox
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/groovebox/config.toml`
//! - macOS: `~/Library/Application Support/groovebox/config.toml`
//! - Windows: `%APPDATA%\groovebox\config.toml`

use crate::error::{Error, Result};
use crate::timing::{
    clamp_tempo, LookaheadSettings, DEFAULT_SCHEDULE_AHEAD_SECS, DEFAULT_TEMPO,
    DEFAULT_TICK_INTERVAL,
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transport defaults applied to a fresh session
    pub transport: TransportSettings,
    /// Lookahead scheduler tuning
    pub scheduler: SchedulerSettings,
}

impl EngineConfig {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "groovebox") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::write_default_config(&path)?;
        Ok(path)
    }

    /// Write the commented default configuration to `path`
    pub fn write_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# groovebox configuration file

[transport]
# Tempo of a fresh session in BPM (40-240)
tempo = 80.0

# Global gain multiplier applied to every trigger (0.0-2.0)
master_volume = 1.0

[scheduler]
# How far ahead of the audio clock steps are handed to the audio service
schedule_ahead_secs = 0.1

# Delay between two scheduler ticks in milliseconds
# Keep this well below schedule_ahead_secs
tick_interval_ms = 25
"#;

        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to the scheduler's lookahead settings
    pub fn lookahead(&self) -> LookaheadSettings {
        let settings = LookaheadSettings::new(
            self.scheduler.schedule_ahead_secs,
            Duration::from_millis(self.scheduler.tick_interval_ms),
        );
        if !settings.is_safe() {
            log::warn!(
                "Lookahead window {:.3}s is shorter than two ticks of {:?}; steps may be late",
                settings.schedule_ahead_secs,
                settings.tick_interval
            );
        }
        settings
    }

    /// Tempo clamped into the supported range
    pub fn tempo(&self) -> f64 {
        clamp_tempo(self.transport.tempo)
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Tempo in BPM
    pub tempo: f64,
    /// Global gain multiplier
    pub master_volume: f32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            master_volume: 1.0,
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Lookahead window in seconds
    pub schedule_ahead_secs: f64,
    /// Tick interval in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            schedule_ahead_secs: DEFAULT_SCHEDULE_AHEAD_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!((config.transport.tempo - 80.0).abs() < 0.001);
        assert!((config.transport.master_volume - 1.0).abs() < 0.001);
        assert_eq!(config.scheduler.tick_interval_ms, 25);
        assert_eq!(config.lookahead(), LookaheadSettings::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[transport]"));
        assert!(toml_str.contains("[scheduler]"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = toml::from_str("[transport]\ntempo = 120.0\n").unwrap();
        assert!((config.transport.tempo - 120.0).abs() < 0.001);
        assert!((config.transport.master_volume - 1.0).abs() < 0.001);
        assert_eq!(config.scheduler, SchedulerSettings::default());
    }

    #[test]
    fn test_tempo_is_clamped() {
        let mut config = EngineConfig::default();
        config.transport.tempo = 999.0;
        assert!((config.tempo() - 240.0).abs() < 0.001);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.transport.tempo = 132.0;
        config.scheduler.tick_interval_ms = 10;
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_config_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        EngineConfig::write_default_config(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transport\ntempo = ").unwrap();

        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }
}
