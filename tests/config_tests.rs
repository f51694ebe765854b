//! Tests for the JSON config store against real files.

use std::fs;

use map_overlay::model::constants::*;
use map_overlay::storage::{AppConfig, ConfigStore};
use map_overlay::{CalibrationRatio, DisplayMode, OverlaySettings};
use tempfile::TempDir;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

    let store = ConfigStore::open(&path);

    assert!(path.exists());
    assert!(!store.is_dirty());
    assert_eq!(*store.config(), AppConfig::default());
    assert!(store.config().has_current_version());
    assert!(!store.config().calibration_ratio().is_calibrated());
}

#[test]
fn written_file_uses_section_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    ConfigStore::open(&path);

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["Settings"]["mode"], "QHD");
    assert_eq!(value["Settings"]["version"], CONFIG_VERSION);
    assert_eq!(value["Hotkeys"]["toggle_visibility"], DEFAULT_HOTKEY_TOGGLE);
    assert_eq!(value["Hotkeys"]["open_settings"], DEFAULT_HOTKEY_SETTINGS);
    assert_eq!(value["Hotkeys"]["measure_distance"], DEFAULT_HOTKEY_MEASURE);
    assert_eq!(value["Hotkeys"]["calibrate_mode"], DEFAULT_HOTKEY_CALIBRATE);
    assert_eq!(value["Calibration"]["pixels_per_km"], 0.0);
}

#[test]
fn calibration_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    let mut store = ConfigStore::open(&path);
    store.update(|c| c.set_calibration_ratio(CalibrationRatio::new(312.5)));
    assert!(store.is_dirty());
    store.flush().unwrap();
    assert!(!store.is_dirty());

    let reopened = ConfigStore::open(&path);
    assert!(approx_eq(
        reopened.config().calibration_ratio().pixels_per_km(),
        312.5
    ));
}

#[test]
fn overlay_settings_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let settings = OverlaySettings {
        display_mode: DisplayMode::Fhd,
        scale_factor: 1.2,
        offset_x: -15,
        offset_y: 30,
    };

    let mut store = ConfigStore::open(&path);
    store.update(|c| c.set_overlay_settings(&settings));
    store.flush().unwrap();

    let reopened = ConfigStore::open(&path);
    assert_eq!(reopened.config().overlay_settings(), settings);
}

#[test]
fn version_mismatch_resets_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        r#"{
            "Settings": { "mode": "FHD", "scale_factor": 2.0, "offset_x": 5, "offset_y": 5, "version": "0.9" },
            "Calibration": { "pixels_per_km": 400.0 }
        }"#,
    )
    .unwrap();

    let store = ConfigStore::open(&path);

    assert_eq!(*store.config(), AppConfig::default());
    // The reset is written back right away
    let on_disk = ConfigStore::load(&path).unwrap().unwrap();
    assert!(on_disk.has_current_version());
    assert!(!on_disk.calibration_ratio().is_calibrated());
}

#[test]
fn unversioned_file_is_reset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, r#"{ "Settings": { "mode": "FHD" } }"#).unwrap();

    let store = ConfigStore::open(&path);
    assert_eq!(store.config().settings.mode, DisplayMode::Qhd);
}

#[test]
fn corrupt_file_is_reset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "not json {").unwrap();

    assert!(ConfigStore::load(&path).is_err());
    let store = ConfigStore::open(&path);
    assert_eq!(*store.config(), AppConfig::default());
    assert!(ConfigStore::load(&path).unwrap().is_some());
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        format!(r#"{{ "Settings": {{ "mode": "FHD", "version": "{CONFIG_VERSION}" }} }}"#),
    )
    .unwrap();

    let store = ConfigStore::open(&path);
    let config = store.config();
    assert_eq!(config.settings.mode, DisplayMode::Fhd);
    assert!(approx_eq(config.settings.scale_factor, DEFAULT_SCALE_FACTOR));
    assert_eq!(config.hotkeys.measure_distance, DEFAULT_HOTKEY_MEASURE);
    assert!(!config.calibration_ratio().is_calibrated());
}

#[test]
fn out_of_range_values_are_clamped_on_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        format!(
            r#"{{ "Settings": {{ "scale_factor": 80.0, "offset_x": 9000000, "version": "{CONFIG_VERSION}" }},
                  "Calibration": {{ "pixels_per_km": -5.0 }} }}"#
        ),
    )
    .unwrap();

    let config = ConfigStore::open(&path).config().clone();
    let settings = config.overlay_settings();
    assert!(approx_eq(settings.scale_factor, MAX_SCALE_FACTOR));
    assert_eq!(settings.offset_x, MAX_OFFSET);
    assert!(!config.calibration_ratio().is_calibrated());
}

#[test]
fn flush_without_changes_does_not_touch_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let mut store = ConfigStore::open(&path);

    fs::write(&path, "sentinel").unwrap();
    store.flush().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "sentinel");
}

#[test]
fn missing_file_loads_as_none() {
    let dir = TempDir::new().unwrap();
    assert!(ConfigStore::load(&dir.path().join("absent.json"))
        .unwrap()
        .is_none());
}
