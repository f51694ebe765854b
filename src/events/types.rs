//! Application events for inter-module communication.
//!
//! These events represent high-level actions that can be published by any
//! module (hotkeys, tray, mouse capture, settings dialog) and handled on the
//! control thread. This module is pure Rust with no FFI dependencies, making
//! it fully testable.

use crate::geometry::ScreenPoint;
use crate::model::OverlaySettings;
use crate::scene::ClearToken;

/// Events the overlay controller consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Start (or restart) a two-point calibration run.
    EnterCalibration,

    /// Enter measurement mode, or leave it if already measuring.
    ToggleMeasurement,

    /// A point was clicked on the capture surface.
    MarkPoint(ScreenPoint),

    /// The clear timer armed with this token has fired.
    ClearTimerFired(ClearToken),

    /// Show or hide the static overlay image.
    ToggleVisibility,

    /// New display mode / scale / offset from the config or the settings dialog.
    ApplySettings(OverlaySettings),
}

/// Application-level events for decoupled communication between modules.
///
/// Events flow from producers (hotkeys, tray, mouse capture, settings)
/// through the EventBus to the dispatcher, which executes the appropriate
/// actions.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Routed to the overlay controller.
    Core(CoreEvent),

    /// Open the settings dialog (or focus it if open).
    OpenSettings,

    /// The settings dialog wrote a new config.
    SettingsSaved,

    /// Exit the application.
    Quit,
}

impl AppEvent {
    /// Returns true if this event should trigger hotkey reinstallation.
    ///
    /// A saved config may carry new accelerators.
    pub fn requires_hotkey_reinstall(&self) -> bool {
        matches!(self, AppEvent::SettingsSaved)
    }

    /// Returns a human-readable description of the event for debugging.
    pub fn description(&self) -> &'static str {
        match self {
            AppEvent::Core(CoreEvent::EnterCalibration) => "Enter calibration",
            AppEvent::Core(CoreEvent::ToggleMeasurement) => "Toggle measurement",
            AppEvent::Core(CoreEvent::MarkPoint(_)) => "Mark point",
            AppEvent::Core(CoreEvent::ClearTimerFired(_)) => "Clear timer fired",
            AppEvent::Core(CoreEvent::ToggleVisibility) => "Toggle overlay visibility",
            AppEvent::Core(CoreEvent::ApplySettings(_)) => "Apply overlay settings",
            AppEvent::OpenSettings => "Open settings window",
            AppEvent::SettingsSaved => "Settings saved",
            AppEvent::Quit => "Quit",
        }
    }
}

impl From<CoreEvent> for AppEvent {
    fn from(event: CoreEvent) -> Self {
        AppEvent::Core(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotkey_reinstall_required_after_settings_save() {
        assert!(AppEvent::SettingsSaved.requires_hotkey_reinstall());
    }

    #[test]
    fn test_hotkey_reinstall_not_required_for_action_events() {
        assert!(!AppEvent::OpenSettings.requires_hotkey_reinstall());
        assert!(!AppEvent::Quit.requires_hotkey_reinstall());
        assert!(!AppEvent::Core(CoreEvent::ToggleMeasurement).requires_hotkey_reinstall());
    }

    #[test]
    fn test_core_event_converts_into_app_event() {
        let event: AppEvent = CoreEvent::EnterCalibration.into();
        assert_eq!(event, AppEvent::Core(CoreEvent::EnterCalibration));
    }

    #[test]
    fn test_all_events_have_descriptions() {
        let events = [
            AppEvent::Core(CoreEvent::EnterCalibration),
            AppEvent::Core(CoreEvent::ToggleMeasurement),
            AppEvent::Core(CoreEvent::MarkPoint(ScreenPoint::new(1, 2))),
            AppEvent::Core(CoreEvent::ClearTimerFired(ClearToken(3))),
            AppEvent::Core(CoreEvent::ToggleVisibility),
            AppEvent::Core(CoreEvent::ApplySettings(OverlaySettings::default())),
            AppEvent::OpenSettings,
            AppEvent::SettingsSaved,
            AppEvent::Quit,
        ];

        for event in events {
            assert!(!event.description().is_empty());
        }
    }
}
