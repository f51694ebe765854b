//! Global hotkey management.
//!
//! This module handles parsing, registration, unregistration and
//! reinstallation of global hotkeys using the `global-hotkey` crate.
//! Presses arrive on the crate's own channel and are forwarded into the
//! application [`EventBus`](crate::events::EventBus) by [`HotkeyRegistry::pump`].

use std::str::FromStr;

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use crate::error::HotkeyError;
use crate::events::{AppEvent, CoreEvent, EventPublisher};
use crate::model::constants::*;
use crate::storage::HotkeysSection;

/// Everything a hotkey can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    ToggleVisibility,
    OpenSettings,
    MeasureDistance,
    CalibrateMode,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 4] = [
        HotkeyAction::ToggleVisibility,
        HotkeyAction::OpenSettings,
        HotkeyAction::MeasureDistance,
        HotkeyAction::CalibrateMode,
    ];

    /// Key in the `Hotkeys` config section.
    pub fn config_key(self) -> &'static str {
        match self {
            HotkeyAction::ToggleVisibility => HOTKEY_TOGGLE_VISIBILITY,
            HotkeyAction::OpenSettings => HOTKEY_OPEN_SETTINGS,
            HotkeyAction::MeasureDistance => HOTKEY_MEASURE_DISTANCE,
            HotkeyAction::CalibrateMode => HOTKEY_CALIBRATE_MODE,
        }
    }

    /// Label for the settings dialog.
    pub fn label(self) -> &'static str {
        match self {
            HotkeyAction::ToggleVisibility => "Toggle Overlay",
            HotkeyAction::OpenSettings => "Open Settings",
            HotkeyAction::MeasureDistance => "Measure Distance",
            HotkeyAction::CalibrateMode => "Calibrate",
        }
    }

    /// The event published when the hotkey is pressed.
    pub fn event(self) -> AppEvent {
        match self {
            HotkeyAction::ToggleVisibility => CoreEvent::ToggleVisibility.into(),
            HotkeyAction::OpenSettings => AppEvent::OpenSettings,
            HotkeyAction::MeasureDistance => CoreEvent::ToggleMeasurement.into(),
            HotkeyAction::CalibrateMode => CoreEvent::EnterCalibration.into(),
        }
    }

    pub fn accelerator(self, section: &HotkeysSection) -> &str {
        match self {
            HotkeyAction::ToggleVisibility => &section.toggle_visibility,
            HotkeyAction::OpenSettings => &section.open_settings,
            HotkeyAction::MeasureDistance => &section.measure_distance,
            HotkeyAction::CalibrateMode => &section.calibrate_mode,
        }
    }

    pub fn accelerator_mut(self, section: &mut HotkeysSection) -> &mut String {
        match self {
            HotkeyAction::ToggleVisibility => &mut section.toggle_visibility,
            HotkeyAction::OpenSettings => &mut section.open_settings,
            HotkeyAction::MeasureDistance => &mut section.measure_distance,
            HotkeyAction::CalibrateMode => &mut section.calibrate_mode,
        }
    }
}

/// Modifier keys held while a key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// Accelerator string for a recorded key press.
///
/// `vk` is a Windows virtual-key code. Returns `None` for modifiers on their
/// own and for keys the hotkey parser has no name for.
pub fn format_accelerator(mods: KeyModifiers, vk: u32) -> Option<String> {
    let key = match vk {
        // A-Z and 0-9 share their ASCII codes
        0x41..=0x5A | 0x30..=0x39 => char::from_u32(vk)?.to_string(),
        0x70..=0x87 => format!("F{}", vk - 0x70 + 1),
        0x60..=0x69 => format!("Numpad{}", vk - 0x60),
        0x08 => "Backspace".to_string(),
        0x1B => "Escape".to_string(),
        0x20 => "Space".to_string(),
        0x21 => "PageUp".to_string(),
        0x22 => "PageDown".to_string(),
        0x23 => "End".to_string(),
        0x24 => "Home".to_string(),
        0x25 => "ArrowLeft".to_string(),
        0x26 => "ArrowUp".to_string(),
        0x27 => "ArrowRight".to_string(),
        0x28 => "ArrowDown".to_string(),
        0x2D => "Insert".to_string(),
        0x2E => "Delete".to_string(),
        _ => return None,
    };

    let mut parts = Vec::with_capacity(4);
    if mods.ctrl {
        parts.push("ctrl".to_string());
    }
    if mods.alt {
        parts.push("alt".to_string());
    }
    if mods.shift {
        parts.push("shift".to_string());
    }
    parts.push(key);
    Some(parts.join("+"))
}

/// Parsed hotkeys, each tied to its action.
#[derive(Debug, Clone, Default)]
pub struct HotkeyBindings {
    bindings: Vec<(HotkeyAction, HotKey)>,
}

impl HotkeyBindings {
    /// Parse every accelerator in `section`.
    ///
    /// Bad entries are returned as errors and left out; the rest still bind.
    /// An accelerator already taken by an earlier action is rejected too.
    pub fn parse(section: &HotkeysSection) -> (Self, Vec<HotkeyError>) {
        let mut bindings: Vec<(HotkeyAction, HotKey)> = Vec::new();
        let mut errors = Vec::new();

        for action in HotkeyAction::ALL {
            let accelerator = action.accelerator(section);
            match HotKey::from_str(accelerator) {
                Ok(hotkey) if bindings.iter().any(|(_, bound)| bound.id() == hotkey.id()) => {
                    errors.push(HotkeyError::Parse {
                        action: action.config_key(),
                        accelerator: accelerator.to_string(),
                        reason: "already bound to another action".to_string(),
                    });
                }
                Ok(hotkey) => bindings.push((action, hotkey)),
                Err(err) => errors.push(HotkeyError::Parse {
                    action: action.config_key(),
                    accelerator: accelerator.to_string(),
                    reason: err.to_string(),
                }),
            }
        }

        (Self { bindings }, errors)
    }

    /// Action for a hotkey id reported by the OS listener.
    pub fn action_for(&self, id: u32) -> Option<HotkeyAction> {
        self.bindings
            .iter()
            .find(|(_, hotkey)| hotkey.id() == id)
            .map(|(action, _)| *action)
    }

    pub fn hotkeys(&self) -> impl Iterator<Item = (HotkeyAction, HotKey)> + '_ {
        self.bindings.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Registered global hotkeys.
///
/// Must live on the thread that pumps the platform message loop.
pub struct HotkeyRegistry {
    manager: GlobalHotKeyManager,
    bindings: HotkeyBindings,
}

impl HotkeyRegistry {
    pub fn new() -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new().map_err(|e| HotkeyError::Manager(e.to_string()))?;
        Ok(Self {
            manager,
            bindings: HotkeyBindings::default(),
        })
    }

    /// Replace the registered set with the accelerators in `section`.
    ///
    /// Returns how many hotkeys are now active. Failures are logged and
    /// skipped.
    pub fn install(&mut self, section: &HotkeysSection) -> usize {
        self.uninstall();

        let (parsed, errors) = HotkeyBindings::parse(section);
        for err in &errors {
            log::warn!("{err}");
        }

        let mut active = Vec::with_capacity(parsed.len());
        for (action, hotkey) in parsed.hotkeys() {
            match self.manager.register(hotkey) {
                Ok(()) => {
                    log::info!(
                        "Hotkey {} bound to {}",
                        action.accelerator(section),
                        action.label()
                    );
                    active.push((action, hotkey));
                }
                Err(e) => log::warn!(
                    "{}",
                    HotkeyError::Register {
                        action: action.config_key(),
                        accelerator: action.accelerator(section).to_string(),
                        reason: e.to_string(),
                    }
                ),
            }
        }

        self.bindings = HotkeyBindings { bindings: active };
        self.bindings.len()
    }

    /// Unregister everything currently registered.
    pub fn uninstall(&mut self) {
        for (action, hotkey) in self.bindings.hotkeys() {
            if let Err(e) = self.manager.unregister(hotkey) {
                log::debug!("Unregistering {} failed: {e}", action.label());
            }
        }
        self.bindings = HotkeyBindings::default();
    }

    /// Forward pending presses into the event bus.
    pub fn pump(&self, publisher: &EventPublisher) {
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match self.bindings.action_for(event.id) {
                Some(action) => {
                    log::debug!("Hotkey: {}", action.label());
                    publisher.publish(action.event());
                }
                None => log::debug!("Unknown hotkey id {}", event.id),
            }
        }
    }
}

impl Drop for HotkeyRegistry {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_section_binds_all_actions() {
        let (bindings, errors) = HotkeyBindings::parse(&HotkeysSection::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(bindings.len(), HotkeyAction::ALL.len());
    }

    #[test]
    fn test_bad_accelerator_is_skipped() {
        let section = HotkeysSection {
            measure_distance: "NotAKey".to_string(),
            ..HotkeysSection::default()
        };
        let (bindings, errors) = HotkeyBindings::parse(&section);
        assert_eq!(bindings.len(), 3);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            HotkeyError::Parse { action, .. } if *action == HOTKEY_MEASURE_DISTANCE
        ));
    }

    #[test]
    fn test_duplicate_accelerator_is_rejected() {
        let section = HotkeysSection {
            calibrate_mode: "F8".to_string(),
            ..HotkeysSection::default()
        };
        let (bindings, errors) = HotkeyBindings::parse(&section);
        assert_eq!(bindings.len(), 3);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_action_lookup_by_id() {
        let (bindings, _) = HotkeyBindings::parse(&HotkeysSection::default());
        let f9 = HotKey::from_str("F9").unwrap();
        assert_eq!(
            bindings.action_for(f9.id()),
            Some(HotkeyAction::MeasureDistance)
        );
        assert_eq!(bindings.action_for(0), None);
    }

    #[test]
    fn test_actions_publish_expected_events() {
        assert_eq!(
            HotkeyAction::CalibrateMode.event(),
            AppEvent::Core(CoreEvent::EnterCalibration)
        );
        assert_eq!(HotkeyAction::OpenSettings.event(), AppEvent::OpenSettings);
    }

    const VK_SHIFT: u32 = 0x10;
    const VK_CONTROL: u32 = 0x11;
    const VK_MENU: u32 = 0x12;
    const VK_CAPITAL: u32 = 0x14;
    const VK_LWIN: u32 = 0x5B;
    const VK_LCONTROL: u32 = 0xA2;

    fn ctrl_shift() -> KeyModifiers {
        KeyModifiers {
            ctrl: true,
            shift: true,
            ..KeyModifiers::default()
        }
    }

    #[test]
    fn test_bare_modifiers_are_not_recorded() {
        for vk in [VK_SHIFT, VK_CONTROL, VK_MENU, VK_CAPITAL, VK_LWIN, VK_LCONTROL] {
            assert_eq!(format_accelerator(ctrl_shift(), vk), None, "vk {vk:#x}");
        }
    }

    #[test]
    fn test_recorded_keys_are_formatted() {
        let none = KeyModifiers::default();
        assert_eq!(format_accelerator(none, 0x78).as_deref(), Some("F9"));
        assert_eq!(format_accelerator(none, 0x87).as_deref(), Some("F24"));
        assert_eq!(format_accelerator(ctrl_shift(), 0x4D).as_deref(), Some("ctrl+shift+M"));
        let all = KeyModifiers {
            ctrl: true,
            alt: true,
            shift: true,
        };
        assert_eq!(format_accelerator(all, 0x31).as_deref(), Some("ctrl+alt+shift+1"));
    }

    #[test]
    fn test_recorded_accelerators_parse_back() {
        let alt = KeyModifiers {
            alt: true,
            ..KeyModifiers::default()
        };
        let keys = [0x41, 0x5A, 0x30, 0x39, 0x70, 0x7B, 0x60, 0x69, 0x08, 0x1B, 0x20]
            .into_iter()
            .chain(0x21..=0x28)
            .chain([0x2D, 0x2E]);
        for vk in keys {
            for mods in [KeyModifiers::default(), alt, ctrl_shift()] {
                let accelerator = format_accelerator(mods, vk).unwrap();
                assert!(
                    HotKey::from_str(&accelerator).is_ok(),
                    "{accelerator} does not parse"
                );
            }
        }
    }

    #[test]
    fn test_recorded_key_matches_typed_accelerator() {
        let recorded = format_accelerator(KeyModifiers::default(), 0x77).unwrap();
        assert_eq!(
            HotKey::from_str(&recorded).unwrap().id(),
            HotKey::from_str(DEFAULT_HOTKEY_TOGGLE).unwrap().id()
        );
    }

    #[test]
    fn test_accelerator_mut_edits_section() {
        let mut section = HotkeysSection::default();
        *HotkeyAction::OpenSettings.accelerator_mut(&mut section) = "shift+F1".to_string();
        assert_eq!(HotkeyAction::OpenSettings.accelerator(&section), "shift+F1");
    }
}
