//! Application domain model.
//!
//! This module contains pure business logic (no FFI dependencies):
//! interaction modes, the point collector, the calibration store, overlay
//! settings and configuration constants.
//!
//! Persistence lives in `storage`, platform glue in `platform::windows`.

pub mod calibration;
pub mod constants;
pub mod mode;
pub mod settings;

pub use calibration::{CalibrationRatio, CalibrationStore};
pub use constants::*;
pub use mode::{InteractionMode, MarkOutcome, PointBuffer};
pub use settings::OverlaySettings;
