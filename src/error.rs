//! Error types shared by the core and its collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the calibration / measurement core.
///
/// All of them are local and non-fatal: the controller is always left in a
/// consistent mode after returning one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Measurement was requested while no calibration ratio is stored.
    #[error("not calibrated: calibrate with two points 1 km apart first")]
    NotCalibrated,

    /// The event does not apply to the current mode (e.g. a point marked while idle).
    #[error("event ignored in the current mode")]
    InvalidModeTransition,

    /// Both calibration points landed on the same pixel.
    #[error("calibration failed: the two points coincide")]
    DegenerateCalibration,
}

impl CoreError {
    /// Returns true if the error should be shown to the user.
    ///
    /// Mode mismatches are expected while clicking around and stay silent.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CoreError::InvalidModeTransition)
    }

    /// Short title for user-facing notifications.
    pub fn title(&self) -> &'static str {
        match self {
            CoreError::NotCalibrated => "Not calibrated",
            CoreError::InvalidModeTransition => "Ignored",
            CoreError::DegenerateCalibration => "Calibration failed",
        }
    }
}

/// Errors from reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors from parsing or registering global hotkeys.
#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("invalid accelerator {accelerator:?} for {action}: {reason}")]
    Parse {
        action: &'static str,
        accelerator: String,
        reason: String,
    },

    #[error("failed to register {action} ({accelerator}): {reason}")]
    Register {
        action: &'static str,
        accelerator: String,
        reason: String,
    },

    #[error("hotkey manager unavailable: {0}")]
    Manager(String),
}

/// Errors from validating the settings dialog input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid calibration values: {field} = {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_mismatch_is_silent() {
        assert!(!CoreError::InvalidModeTransition.is_user_visible());
    }

    #[test]
    fn test_calibration_errors_are_user_visible() {
        assert!(CoreError::NotCalibrated.is_user_visible());
        assert!(CoreError::DegenerateCalibration.is_user_visible());
    }

    #[test]
    fn test_messages_are_not_empty() {
        for err in [
            CoreError::NotCalibrated,
            CoreError::InvalidModeTransition,
            CoreError::DegenerateCalibration,
        ] {
            assert!(!err.to_string().is_empty());
            assert!(!err.title().is_empty());
        }
    }
}
