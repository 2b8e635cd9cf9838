//! Persistent application settings.
//!
//! # Settings Management
//!
//! `AppSettings` is the key/value store every component persists into:
//! - precision of the number formatter
//! - value view configuration (TAU display mode and template, histogram icon size)
//! - font size driving icon sizes, value modus, logging and worker options
//!
//! The `SettingsManager` loads and saves it as JSON. Missing files yield the
//! defaults; unreadable files log a warning and also yield the defaults.

pub mod loader;

use crate::error::ConfigError;
use crate::globals::PrecisionSettings;
use crate::models::ValueModus;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of the default value view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueViewSettings {
    /// Index of the `TauDisplayMode`
    pub tau_display_mode: usize,
    /// Label template for TAU values
    pub tau_template: String,
    pub histogram_icon_width: usize,
    pub histogram_icon_height: usize,
}

impl Default for ValueViewSettings {
    fn default() -> Self {
        ValueViewSettings {
            tau_display_mode: 0,
            tau_template: "VALUE:TAU_DEV".to_string(),
            histogram_icon_width: 10,
            histogram_icon_height: 10,
        }
    }
}

/// Application settings persisted between sessions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub precision: PrecisionSettings,
    pub value_view: ValueViewSettings,
    pub value_modus: ValueModus,

    // UI
    pub font_size: f32,
    pub show_log_panel: bool,

    // Background calculation; 0 means one worker per CPU
    pub worker_threads: usize,

    // Debug Settings
    pub debug_logging: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            precision: PrecisionSettings::default(),
            value_view: ValueViewSettings::default(),
            value_modus: ValueModus::Absolute,
            font_size: 13.0,
            show_log_panel: false,
            worker_threads: 0,
            debug_logging: false,
        }
    }
}

impl AppSettings {
    /// Number of calculation workers to start.
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }
}

/// Loads and saves `AppSettings`
pub struct SettingsManager;

impl SettingsManager {
    /// Load settings from `path`, or return defaults if the file doesn't exist.
    ///
    /// ERROR HANDLING: If deserialization fails, logs a warning and returns
    /// defaults instead of failing, so a changed settings format never blocks startup.
    pub fn load_from(path: &Path) -> Result<AppSettings, ConfigError> {
        match loader::load_json::<AppSettings>(path) {
            Ok(settings) => {
                log::info!("[Config] Settings loaded from {}", path.display());
                Ok(settings)
            }
            Err(ConfigError::FileNotFound(_)) => {
                log::info!("[Config] No settings at {}, using defaults", path.display());
                Ok(AppSettings::default())
            }
            Err(ConfigError::InvalidJson(e)) => {
                log::warn!(
                    "[Config] Failed to parse {}, falling back to defaults: {}",
                    path.display(),
                    e
                );
                Ok(AppSettings::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load settings from the global settings path
    pub fn load() -> Result<AppSettings, ConfigError> {
        Self::load_from(&loader::get_global_settings_path())
    }

    pub fn save_to(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
        loader::save_json(settings, path)?;
        log::info!("[Config] Settings saved to {}", path.display());
        Ok(())
    }

    /// Save settings to the global settings path
    pub fn save(settings: &AppSettings) -> Result<(), ConfigError> {
        Self::save_to(settings, &loader::get_global_settings_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_value_view_defaults() {
        let settings = ValueViewSettings::default();
        assert_eq!(settings.tau_display_mode, 0);
        assert_eq!(settings.tau_template, "VALUE:TAU_DEV");
        assert_eq!(
            (settings.histogram_icon_width, settings.histogram_icon_height),
            (10, 10)
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = SettingsManager::load_from(&temp_dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "font_size": 20.0, "value_view": { "tau_display_mode": 2 } }"#)
            .unwrap();
        let settings = SettingsManager::load_from(&path).unwrap();
        assert_eq!(settings.font_size, 20.0);
        assert_eq!(settings.value_view.tau_display_mode, 2);
        assert_eq!(settings.value_view.tau_template, "VALUE:TAU_DEV");
    }

    #[test]
    fn test_effective_worker_threads() {
        let mut settings = AppSettings::default();
        assert!(settings.effective_worker_threads() >= 1);
        settings.worker_threads = 3;
        assert_eq!(settings.effective_worker_threads(), 3);
    }
}
