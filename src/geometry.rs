//! Screen geometry and overlay scaling.
//!
//! Everything here is a pure function of its inputs: no calibration state,
//! no platform calls. The controller feeds these with points it collected
//! and stores whatever comes back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::calibration::CalibrationRatio;
use crate::model::constants::*;

/// A point in primary-screen pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Integer midpoint of the segment `self`-`other`.
    pub fn midpoint(self, other: ScreenPoint) -> ScreenPoint {
        let x = (i64::from(self.x) + i64::from(other.x)) / 2;
        let y = (i64::from(self.y) + i64::from(other.y)) / 2;
        ScreenPoint::new(x as i32, y as i32)
    }
}

impl fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Target resolution class used to scale the static overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    /// 2560x1440.
    #[default]
    #[serde(rename = "QHD")]
    Qhd,
    /// 1920x1080.
    #[serde(rename = "FHD")]
    Fhd,
}

impl DisplayMode {
    /// Render height the overlay asset is scaled to.
    pub fn target_height(self) -> f64 {
        match self {
            DisplayMode::Qhd => QHD_TARGET_HEIGHT,
            DisplayMode::Fhd => FHD_TARGET_HEIGHT,
        }
    }

    /// Config spelling ("QHD" / "FHD").
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Qhd => "QHD",
            DisplayMode::Fhd => "FHD",
        }
    }

    /// Label shown in the settings dialog.
    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Qhd => "QHD (1440p)",
            DisplayMode::Fhd => "FHD (1080p)",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QHD" => Ok(DisplayMode::Qhd),
            "FHD" => Ok(DisplayMode::Fhd),
            other => Err(format!("unknown display mode {other:?}")),
        }
    }
}

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Where the static overlay lands on screen (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayPlacement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Euclidean distance between two screen points, in pixels.
pub fn pixel_distance(a: ScreenPoint, b: ScreenPoint) -> f64 {
    let dx = f64::from(b.x) - f64::from(a.x);
    let dy = f64::from(b.y) - f64::from(a.y);
    dx.hypot(dy)
}

/// Derive a pixels-per-km ratio from two points asserted to be 1 km apart.
///
/// Coinciding points would produce a zero ratio, which is indistinguishable
/// from "uncalibrated", so they are rejected.
pub fn calibrate(a: ScreenPoint, b: ScreenPoint) -> Result<CalibrationRatio, CoreError> {
    let pixels = pixel_distance(a, b);
    if pixels > 0.0 {
        Ok(CalibrationRatio::new(pixels))
    } else {
        Err(CoreError::DegenerateCalibration)
    }
}

/// Real-world distance in meters between two points under `ratio`.
pub fn measure(a: ScreenPoint, b: ScreenPoint, ratio: CalibrationRatio) -> Result<f64, CoreError> {
    if !ratio.is_calibrated() {
        return Err(CoreError::NotCalibrated);
    }
    Ok(pixel_distance(a, b) / ratio.pixels_per_km() * METERS_PER_KM)
}

/// Scale that maps the native asset height onto the mode's target height.
pub fn base_scale(mode: DisplayMode) -> f64 {
    mode.target_height() / SOURCE_IMAGE_HEIGHT
}

/// Base scale multiplied by the user's fine-tuning factor.
pub fn final_scale(mode: DisplayMode, user_scale_factor: f64) -> f64 {
    base_scale(mode) * user_scale_factor
}

/// On-screen size of an image of `native` size at `scale` (truncated).
pub fn scaled_size(native: ImageSize, scale: f64) -> ImageSize {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 0.0 };
    ImageSize::new(
        (f64::from(native.width) * scale) as u32,
        (f64::from(native.height) * scale) as u32,
    )
}

/// Center the scaled overlay on the screen, shifted by `offset`.
pub fn overlay_placement(
    native: ImageSize,
    screen: ImageSize,
    scale: f64,
    offset: (i32, i32),
) -> OverlayPlacement {
    let size = scaled_size(native, scale);
    let center_x = (screen.width / 2) as i32 + offset.0;
    let center_y = (screen.height / 2) as i32 + offset.1;
    OverlayPlacement {
        x: center_x - (size.width / 2) as i32,
        y: center_y - (size.height / 2) as i32,
        width: size.width,
        height: size.height,
    }
}

/// Label text for a measured distance.
pub fn format_distance(meters: f64) -> String {
    if meters < METERS_PER_KM {
        format!("{meters:.0} m")
    } else {
        format!("{:.2} km", meters / METERS_PER_KM)
    }
}

/// Label text for a freshly stored calibration.
pub fn format_calibration(ratio: CalibrationRatio) -> String {
    format!("1 km = {:.0} px", ratio.pixels_per_km())
}
