//! Integration tests for ConfigManager and settings file handling
//!
//! These tests verify:
//! - Settings loading and saving
//! - Default settings generation
//! - Hand-written settings files using the documented keys
//! - Integration with CheckRunner

use camino::Utf8PathBuf;
use modelsanity::config::SETTINGS_FILE;
use modelsanity::models::ParamValue;
use modelsanity::models::config::{MAX_FACE_AREA, MIN_EDGE_LENGTH};
use modelsanity::{CheckRegistry, CheckRunner, ConfigManager, Settings};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join(SETTINGS_FILE));
}

#[test]
fn test_creates_missing_config_dir() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("Sanity Data");

    ConfigManager::new(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_load_default_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // Settings file doesn't exist, should return defaults
    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.max_fix_rounds, 3);
    assert!(!settings.debug_mode);
    assert!(settings.disabled_checks.is_empty());
    assert_eq!(settings.parameters.get(MAX_FACE_AREA), Some(&ParamValue::Number(0.000001)));
}

#[test]
fn test_hand_written_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        r#"Sanity_Settings:
  Parameters:
    minEdgeLength: 0.01
  Disabled Checks:
    - Crease Edges
  Max Fix Rounds: 5
"#,
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.parameters.get(MIN_EDGE_LENGTH), Some(&ParamValue::Number(0.01)));
    // a Parameters block replaces the defaults wholesale
    assert_eq!(settings.parameters.get(MAX_FACE_AREA), None);
    assert_eq!(settings.max_fix_rounds, 5);
    assert!(settings.is_disabled("crease edges"));
    assert_eq!(settings.log_directory, "logs");
}

#[test]
fn test_save_and_reload_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = Settings::default();
    settings.debug_mode = true;
    settings.max_fix_rounds = 1;
    settings.disabled_checks = vec!["Triangles".into()];
    manager.save_settings(&settings).unwrap();

    let contents = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(contents.contains("Sanity_Settings:"));
    assert!(contents.contains("Max Fix Rounds: 1"));

    let reloaded = manager.load_settings().unwrap();
    assert!(reloaded.debug_mode);
    assert_eq!(reloaded.max_fix_rounds, 1);
    assert_eq!(reloaded.disabled_checks, vec!["Triangles"]);
    assert_eq!(reloaded.parameters, settings.parameters);
}

#[test]
fn test_invalid_settings_file_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.settings_path(), "Sanity_Settings:\n  Max Fix Rounds: many\n").unwrap();

    let err = manager.load_settings().unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse settings"));
}

#[test]
fn test_settings_drive_runner() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = Settings::default();
    settings.disabled_checks = vec!["Triangles".into(), "Not A Check".into()];
    manager.save_settings(&settings).unwrap();

    let mut runner = CheckRunner::new(CheckRegistry::with_default_checks());
    runner.apply_settings(&manager.load_settings().unwrap());

    assert!(!runner.is_enabled("Triangles").unwrap());
    assert!(runner.is_enabled("N-gons").unwrap());
}
