//! Configuration storage.
//!
//! Persists settings to a JSON file in the per-user application data folder
//! (see [`paths::config_file_path`]).

pub mod config;
pub mod paths;

pub use config::{AppConfig, CalibrationSection, ConfigStore, HotkeysSection, SettingsSection};
pub use paths::{config_dir, config_file_path};
