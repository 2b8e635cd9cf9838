//! Integration tests for settings persistence and how settings reach the
//! globals and value views of a session.

use cubegui::config::loader;
use cubegui::globals::PrecisionFormat;
use cubegui::{AppSettings, ConfigError, Globals, SettingsManager, TauDisplayMode, ValueModus};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("settings.json");

    let mut settings = AppSettings::default();
    settings.font_size = 18.0;
    settings.value_modus = ValueModus::Percent;
    settings.worker_threads = 2;
    settings.precision.trees.precision = 3;
    settings.value_view.tau_display_mode = TauDisplayMode::Average.to_index();

    SettingsManager::save_to(&settings, &path).unwrap();
    let loaded = SettingsManager::load_from(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();
    let loaded = SettingsManager::load_from(&path).unwrap();
    assert_eq!(loaded, AppSettings::default());
}

#[test]
fn test_wrong_extension_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.yaml");
    let result = SettingsManager::save_to(&AppSettings::default(), &path);
    assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    assert!(!path.exists());
}

#[test]
fn test_load_json_reports_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.json");
    let result = loader::load_json::<AppSettings>(&path);
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn test_globals_from_settings() {
    let mut settings = AppSettings::default();
    settings.font_size = 20.0;
    settings.precision.trees.precision = 4;
    settings.value_view.tau_template = "TAU_AVG".to_string();

    let globals = Globals::from_settings(&settings);
    assert_eq!(globals.font_metrics().ascent, 16);
    assert_eq!(
        globals.format_number(1.0, PrecisionFormat::Trees, false),
        "1.0000"
    );
    assert_eq!(globals.default_value_view().settings().tau_template, "TAU_AVG");
}
