//! Pure core of the map overlay. Keep platform calls out of everything but
//! `platform` so tests can run as normal integration tests.

pub mod controller;
pub mod error;
pub mod events;
pub mod geometry;
pub mod input;
pub mod model;
pub mod overlay_image;
pub mod platform;
pub mod scene;
pub mod storage;

// Re-export the core types for convenience
pub use controller::{MeasurementResult, OverlayController};
pub use error::{ConfigError, CoreError, HotkeyError, SettingsError};
pub use events::{AppEvent, CoreEvent, EventBus, EventPublisher};
pub use geometry::{DisplayMode, ImageSize, OverlayPlacement, ScreenPoint};
pub use model::{CalibrationRatio, InteractionMode, OverlaySettings};
pub use scene::{ClearToken, RenderCommand, Scene, VisualId};

/// Clamp a value to [lo, hi]
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}
