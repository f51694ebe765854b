//! Configuration constants and default values.
//!
//! This module contains all application constants including scaling
//! references, timings, config keys and validation limits.

// === Overlay Asset ===

/// Native height of the bundled overlay asset in pixels.
pub const SOURCE_IMAGE_HEIGHT: f64 = 2475.0;

/// Native width of the bundled overlay asset in pixels.
pub const SOURCE_IMAGE_WIDTH: f64 = 2475.0;

/// Relative path of the overlay asset (next to the executable or in the working directory).
pub const OVERLAY_ASSET_PATH: &str = "assets/overlay_circle.png";

/// Relative path of the tray icon, looked up like the overlay asset.
pub const TRAY_ICON_PATH: &str = "assets/icon.ico";

/// Guide circle center used when the asset has to be generated.
pub const GUIDE_CENTER: (f64, f64) = (1192.0, 1175.0);

/// Guide circle radius used when the asset has to be generated.
pub const GUIDE_RADIUS: f64 = 773.44;

/// Guide circle stroke width in native pixels.
pub const GUIDE_THICKNESS: f64 = 5.0;

/// Guide circle color (R, G, B, A).
pub const GUIDE_COLOR: [u8; 4] = [255, 50, 80, 255];

// === Display Modes ===

/// Target render height for QHD (1440p).
pub const QHD_TARGET_HEIGHT: f64 = 1440.0;

/// Target render height for FHD (1080p).
pub const FHD_TARGET_HEIGHT: f64 = 1080.0;

// === Calibration & Measurement ===

/// Meters in one kilometer (calibration points are 1 km apart).
pub const METERS_PER_KM: f64 = 1000.0;

/// How long a measurement result stays on screen.
pub const MEASUREMENT_DISPLAY_MS: u64 = 3000;

/// How long calibration markers stay on screen after completion.
pub const CALIBRATION_TEARDOWN_MS: u64 = 1500;

// === Settings Defaults ===

/// Default user scale factor.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;

/// Default overlay offset from screen center.
pub const DEFAULT_OFFSET: i32 = 0;

/// Default uncalibrated ratio.
pub const DEFAULT_PIXELS_PER_KM: f64 = 0.0;

// === Validation Limits ===

/// Minimum user scale factor.
pub const MIN_SCALE_FACTOR: f64 = 0.1;

/// Maximum user scale factor.
pub const MAX_SCALE_FACTOR: f64 = 5.0;

/// Largest accepted offset (either axis, either direction) in pixels.
pub const MAX_OFFSET: i32 = 5000;

// === Config File ===

/// Config format version. A mismatch resets the file to defaults.
pub const CONFIG_VERSION: &str = "1.0";

/// Directory name under the per-user application data folder.
pub const APP_DIR_NAME: &str = "PUBG_Map_Overlay";

/// Config file name inside [`APP_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";

// === Hotkeys ===

/// Config key for the visibility toggle.
pub const HOTKEY_TOGGLE_VISIBILITY: &str = "toggle_visibility";

/// Config key for the settings dialog.
pub const HOTKEY_OPEN_SETTINGS: &str = "open_settings";

/// Config key for the measurement toggle.
pub const HOTKEY_MEASURE_DISTANCE: &str = "measure_distance";

/// Config key for calibration.
pub const HOTKEY_CALIBRATE_MODE: &str = "calibrate_mode";

/// Default accelerator for the visibility toggle.
pub const DEFAULT_HOTKEY_TOGGLE: &str = "F8";

/// Default accelerator for the settings dialog.
pub const DEFAULT_HOTKEY_SETTINGS: &str = "F12";

/// Default accelerator for the measurement toggle.
pub const DEFAULT_HOTKEY_MEASURE: &str = "F9";

/// Default accelerator for calibration.
pub const DEFAULT_HOTKEY_CALIBRATE: &str = "F10";

// === Event Queue ===

/// Capacity of the bounded event queue feeding the control thread.
pub const EVENT_QUEUE_CAPACITY: usize = 64;
