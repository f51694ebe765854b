//! JSON configuration file.
//!
//! Uses an in-memory copy to avoid disk I/O on every change.
//! Call [`ConfigStore::flush`] to persist changes to disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::config_file_path;
use crate::error::ConfigError;
use crate::geometry::DisplayMode;
use crate::model::constants::*;
use crate::model::{CalibrationRatio, OverlaySettings};

/// The whole config document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    #[serde(rename = "Settings")]
    pub settings: SettingsSection,
    #[serde(rename = "Hotkeys", default)]
    pub hotkeys: HotkeysSection,
    #[serde(rename = "Calibration", default)]
    pub calibration: CalibrationSection,
}

/// Overlay placement plus the format version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SettingsSection {
    #[serde(default)]
    pub mode: DisplayMode,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
    /// A file without a version predates versioning and is reset.
    #[serde(default = "missing_version")]
    pub version: String,
}

/// Accelerator strings per action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HotkeysSection {
    #[serde(default = "default_toggle_visibility")]
    pub toggle_visibility: String,
    #[serde(default = "default_open_settings")]
    pub open_settings: String,
    #[serde(default = "default_measure_distance")]
    pub measure_distance: String,
    #[serde(default = "default_calibrate_mode")]
    pub calibrate_mode: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSection {
    #[serde(default)]
    pub pixels_per_km: f64,
}

fn default_scale_factor() -> f64 {
    DEFAULT_SCALE_FACTOR
}

fn missing_version() -> String {
    "0.0".to_string()
}

fn default_toggle_visibility() -> String {
    DEFAULT_HOTKEY_TOGGLE.to_string()
}

fn default_open_settings() -> String {
    DEFAULT_HOTKEY_SETTINGS.to_string()
}

fn default_measure_distance() -> String {
    DEFAULT_HOTKEY_MEASURE.to_string()
}

fn default_calibrate_mode() -> String {
    DEFAULT_HOTKEY_CALIBRATE.to_string()
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            offset_x: DEFAULT_OFFSET,
            offset_y: DEFAULT_OFFSET,
            version: CONFIG_VERSION.to_string(),
        }
    }
}

impl Default for HotkeysSection {
    fn default() -> Self {
        Self {
            toggle_visibility: default_toggle_visibility(),
            open_settings: default_open_settings(),
            measure_distance: default_measure_distance(),
            calibrate_mode: default_calibrate_mode(),
        }
    }
}

impl Default for CalibrationSection {
    fn default() -> Self {
        Self {
            pixels_per_km: DEFAULT_PIXELS_PER_KM,
        }
    }
}

impl AppConfig {
    /// Overlay settings, validated.
    pub fn overlay_settings(&self) -> OverlaySettings {
        let mut settings = OverlaySettings {
            display_mode: self.settings.mode,
            scale_factor: self.settings.scale_factor,
            offset_x: self.settings.offset_x,
            offset_y: self.settings.offset_y,
        };
        settings.validate();
        settings
    }

    pub fn set_overlay_settings(&mut self, settings: &OverlaySettings) {
        self.settings.mode = settings.display_mode;
        self.settings.scale_factor = settings.scale_factor;
        self.settings.offset_x = settings.offset_x;
        self.settings.offset_y = settings.offset_y;
    }

    /// Stored ratio. Anything unusable reads as uncalibrated.
    pub fn calibration_ratio(&self) -> CalibrationRatio {
        CalibrationRatio::new(self.calibration.pixels_per_km)
    }

    pub fn set_calibration_ratio(&mut self, ratio: CalibrationRatio) {
        self.calibration.pixels_per_km = ratio.pixels_per_km();
    }

    pub fn has_current_version(&self) -> bool {
        self.settings.version == CONFIG_VERSION
    }
}

/// Cached config document, bound to a file unless detached.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: AppConfig,
    dirty: bool,
}

impl ConfigStore {
    /// Load the config at `path`.
    ///
    /// Never fails: a missing, unreadable or outdated file is replaced by the
    /// defaults, which are written out right away.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = match Self::load(&path) {
            Ok(Some(config)) if config.has_current_version() => Some(config),
            Ok(Some(config)) => {
                log::warn!(
                    "Config version mismatch ({} != {}), recreating config",
                    config.settings.version,
                    CONFIG_VERSION
                );
                None
            }
            Ok(None) => {
                log::info!("No config at {}, creating defaults", path.display());
                None
            }
            Err(err) => {
                log::warn!("{err}; recreating config");
                None
            }
        };

        let mut store = Self {
            path: Some(path),
            dirty: config.is_none(),
            config: config.unwrap_or_default(),
        };
        if let Err(err) = store.flush() {
            log::error!("Failed to write default config: {err}");
        }
        store
    }

    /// Load the config from the per-user location.
    ///
    /// Without a per-user folder the defaults are kept in memory only.
    pub fn open_default() -> Self {
        match config_file_path() {
            Some(path) => Self::open(path),
            None => {
                log::warn!("No per-user data folder; settings will not be saved");
                Self::detached()
            }
        }
    }

    /// Defaults that are never written anywhere.
    pub fn detached() -> Self {
        Self {
            path: None,
            config: AppConfig::default(),
            dirty: false,
        }
    }

    /// Read and parse `path`. `Ok(None)` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Backing file, `None` for a detached store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mutate the cached document and mark it dirty.
    pub fn update(&mut self, f: impl FnOnce(&mut AppConfig)) {
        f(&mut self.config);
        self.dirty = true;
    }

    /// Write the document to disk if it changed since the last flush.
    ///
    /// A detached store keeps its changes in memory and stays dirty.
    pub fn flush(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = self.path.as_deref() else {
            log::debug!("Detached config, nothing written");
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.config).map_err(ConfigError::Serialize)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("Config written to {}", path.display());
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.settings.mode, DisplayMode::Qhd);
        assert_eq!(config.settings.version, CONFIG_VERSION);
        assert_eq!(config.hotkeys.toggle_visibility, "F8");
        assert_eq!(config.hotkeys.open_settings, "F12");
        assert!(!config.calibration_ratio().is_calibrated());
    }

    #[test]
    fn config_uses_section_names() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(json["Settings"]["mode"], "QHD");
        assert_eq!(json["Settings"]["version"], CONFIG_VERSION);
        assert_eq!(json["Hotkeys"]["calibrate_mode"], "F10");
        assert_eq!(json["Calibration"]["pixels_per_km"], 0.0);
    }

    #[test]
    fn missing_version_reads_as_outdated() {
        let config: AppConfig = serde_json::from_str(r#"{"Settings": {"mode": "FHD"}}"#).unwrap();
        assert_eq!(config.settings.mode, DisplayMode::Fhd);
        assert!(!config.has_current_version());
        assert_eq!(config.hotkeys, HotkeysSection::default());
    }

    #[test]
    fn overlay_settings_are_validated() {
        let mut config = AppConfig::default();
        config.settings.scale_factor = 0.0;
        config.settings.offset_y = -9000;
        let settings = config.overlay_settings();
        assert!((settings.scale_factor - MIN_SCALE_FACTOR).abs() < f64::EPSILON);
        assert_eq!(settings.offset_y, -MAX_OFFSET);
    }

    #[test]
    fn detached_store_keeps_changes_in_memory() {
        let mut store = ConfigStore::detached();
        assert_eq!(store.path(), None);
        assert_eq!(*store.config(), AppConfig::default());

        store.update(|c| c.set_calibration_ratio(CalibrationRatio::new(250.0)));
        store.flush().unwrap();
        assert!(store.is_dirty());
        assert!(store.config().calibration_ratio().is_calibrated());
    }

    #[test]
    fn negative_stored_ratio_reads_as_uncalibrated() {
        let mut config = AppConfig::default();
        config.calibration.pixels_per_km = -3.0;
        assert!(!config.calibration_ratio().is_calibrated());
    }
}
