//! Overlay settings (pure Rust, no FFI).
//!
//! This module defines the settings record the core consumes. It is
//! produced from the config file and from the settings dialog.

use super::constants::*;
use crate::clamp;
use crate::error::SettingsError;
use crate::geometry::{self, DisplayMode};

/// Static overlay placement settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySettings {
    /// Resolution class the overlay is scaled for.
    pub display_mode: DisplayMode,
    /// User fine-tuning on top of the mode's base scale.
    pub scale_factor: f64,
    /// Horizontal shift from screen center in pixels.
    pub offset_x: i32,
    /// Vertical shift from screen center in pixels.
    pub offset_y: i32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::default(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            offset_x: DEFAULT_OFFSET,
            offset_y: DEFAULT_OFFSET,
        }
    }
}

impl OverlaySettings {
    /// Validates and clamps all values to valid ranges.
    pub fn validate(&mut self) {
        if !self.scale_factor.is_finite() {
            self.scale_factor = DEFAULT_SCALE_FACTOR;
        }
        self.scale_factor = clamp(self.scale_factor, MIN_SCALE_FACTOR, MAX_SCALE_FACTOR);
        self.offset_x = self.offset_x.clamp(-MAX_OFFSET, MAX_OFFSET);
        self.offset_y = self.offset_y.clamp(-MAX_OFFSET, MAX_OFFSET);
    }

    /// Scale applied to the native overlay asset.
    pub fn final_scale(&self) -> f64 {
        geometry::final_scale(self.display_mode, self.scale_factor)
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    /// Build settings from the raw text of the settings dialog fields.
    pub fn from_form(
        display_mode: DisplayMode,
        scale_factor: &str,
        offset_x: &str,
        offset_y: &str,
    ) -> Result<Self, SettingsError> {
        let mut settings = Self {
            display_mode,
            scale_factor: parse_field("scale_factor", scale_factor)?,
            offset_x: parse_field("offset_x", offset_x)?,
            offset_y: parse_field("offset_y", offset_y)?,
        };
        settings.validate();
        Ok(settings)
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, SettingsError> {
    raw.trim()
        .parse()
        .map_err(|_| SettingsError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
