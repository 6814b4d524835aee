//! Persisted user settings.
//!
//! Stored as TOML in `~/.relay_control/settings.toml` unless `--config` points elsewhere.
//! Every key is optional; anything missing falls back to its default.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use log::debug;
use log::info;
use log::warn;
use serde::Deserialize;
use serde::Serialize;

const SETTINGS_DIR: &str = ".relay_control";
const SETTINGS_FILE: &str = "settings.toml";
const DEFAULT_DURATION_SECS: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cli: CliSettings,
    pub connection: ConnectionSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    pub quiet_mode: bool,
    pub verbose_mode: bool,
    /// Momentary pulse length in seconds when `--duration` is not given.
    pub default_duration: f64,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file_path: Option<PathBuf>,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            quiet_mode: false,
            verbose_mode: false,
            default_duration: DEFAULT_DURATION_SECS,
            log_level: String::from("INFO"),
            log_to_file: false,
            log_file_path: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub auto_connect_startup: bool,
    /// Serial number of the last device connected to.
    pub last_device: Option<String>,
}

pub fn settings_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(SETTINGS_DIR))
}

/// `custom` when given, the default location otherwise.
pub fn settings_path(custom: Option<&Path>) -> PathBuf {
    match custom {
        Some(path) => path.to_path_buf(),
        None => settings_dir()
            .unwrap_or_else(|| PathBuf::from(SETTINGS_DIR))
            .join(SETTINGS_FILE),
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn try_load(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = toml::from_str::<Settings>(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Saves and logs a failure instead of returning it.
    pub fn save_or_warn(&self, path: &Path) {
        if let Err(e) = self.save(path) {
            warn!("Failed to save settings: {:#}", e);
        }
    }

    pub fn default_duration(&self) -> Duration {
        match Duration::try_from_secs_f64(self.cli.default_duration) {
            Ok(duration) => duration,
            Err(_) => {
                warn!(
                    "Ignoring invalid default_duration {}, using {}s",
                    self.cli.default_duration, DEFAULT_DURATION_SECS
                );
                Duration::from_secs_f64(DEFAULT_DURATION_SECS)
            }
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        if !self.cli.log_to_file {
            return None;
        }
        self.cli
            .log_file_path
            .clone()
            .or_else(crate::logging::default_log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::try_load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_duration(), Duration::from_millis(500));
        assert_eq!(settings.cli.log_level, "INFO");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[cli]\ndefault_duration = 2.0\n\n[connection]\nlast_device = \"A1B2C3D4\"\n",
        )
        .unwrap();

        let settings = Settings::try_load(&path).unwrap();
        assert_eq!(settings.default_duration(), Duration::from_secs(2));
        assert_eq!(settings.connection.last_device.as_deref(), Some("A1B2C3D4"));
        assert!(!settings.cli.quiet_mode);
        assert!(!settings.connection.auto_connect_startup);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[cli\ndefault_duration = ").unwrap();
        assert!(Settings::try_load(&path).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.connection.last_device = Some(String::from("FT1234"));
        settings.cli.log_to_file = true;
        settings.cli.log_file_path = Some(PathBuf::from("/var/log/relay.log"));
        settings.save(&path).unwrap();

        let loaded = Settings::try_load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.log_file(), Some(PathBuf::from("/var/log/relay.log")));
    }

    #[test]
    fn negative_default_duration_falls_back() {
        let mut settings = Settings::default();
        settings.cli.default_duration = -3.0;
        assert_eq!(settings.default_duration(), Duration::from_millis(500));
    }

    #[test]
    fn custom_path_wins() {
        let custom = Path::new("/tmp/relay.toml");
        assert_eq!(settings_path(Some(custom)), PathBuf::from("/tmp/relay.toml"));
        assert!(settings_path(None).ends_with("settings.toml"));
    }
}
