//! Event dispatcher for Windows.
//!
//! Drains the event bus on the UI thread and routes each event: core events
//! go through the controller, the rest are handled here.

use windows::Win32::UI::WindowsAndMessaging::PostQuitMessage;

use crate::error::CoreError;
use crate::events::{AppEvent, CoreEvent};
use crate::geometry::format_calibration;
use crate::model::CalibrationRatio;
use crate::platform::windows::app::state::{
    overlay_hwnd, publisher, with_config, BUS, CONTROLLER, HOTKEYS,
};
use crate::platform::windows::ui::overlay::apply_commands;
use crate::platform::windows::ui::settings::window as settings_window;
use crate::platform::windows::ui::tray::{self, BalloonKind};

/// Dispatch pending events from the hotkey channel and the event bus.
///
/// Must be called from the UI thread.
pub fn dispatch_events() {
    HOTKEYS.with(|h| {
        if let Some(registry) = h.borrow().as_ref() {
            registry.pump(&publisher());
        }
    });

    // Events published while handling land in the next round
    let events = BUS.with(|bus| bus.drain());
    for event in events {
        handle_event(event);
    }
}

fn handle_event(event: AppEvent) {
    log::debug!("Dispatching: {}", event.description());
    let reinstall = event.requires_hotkey_reinstall();

    match event {
        AppEvent::Core(core) => handle_core_event(core),
        AppEvent::OpenSettings => settings_window::open_settings_window(overlay_hwnd()),
        AppEvent::SettingsSaved => {
            if let Some(settings) = with_config(|store| store.config().overlay_settings()) {
                handle_core_event(CoreEvent::ApplySettings(settings));
            }
        }
        AppEvent::Quit => {
            log::info!("Quit requested");
            unsafe { PostQuitMessage(0) };
        }
    }

    if reinstall {
        reinstall_hotkeys();
    }
}

/// Run one event through the controller and carry out what it asks for.
fn handle_core_event(event: CoreEvent) {
    let toggles_visibility = matches!(event, CoreEvent::ToggleVisibility);

    // Keep the controller borrow short: rendering may re-enter the message loop
    let (result, commands, write, visible) = CONTROLLER.with(|c| {
        let mut controller = c.borrow_mut();
        let result = controller.handle(event);
        (
            result,
            controller.take_commands(),
            controller.take_calibration_write(),
            controller.overlay_visible(),
        )
    });

    apply_commands(&commands);

    if let Some(ratio) = write {
        persist_calibration(ratio);
    }
    if toggles_visibility {
        tray::update_tray_tooltip(visible);
    }
    if let Err(err) = result {
        report_error(err);
    }
}

fn persist_calibration(ratio: CalibrationRatio) {
    let saved = with_config(|store| {
        store.update(|config| config.set_calibration_ratio(ratio));
        store.flush()
    });
    match saved {
        Some(Ok(())) => {
            log::info!("Calibration saved: {ratio}");
            tray::show_balloon(
                "Calibration saved",
                &format_calibration(ratio),
                BalloonKind::Info,
            );
        }
        Some(Err(err)) => {
            log::error!("Failed to save calibration: {err}");
            tray::show_balloon("Calibration not saved", &err.to_string(), BalloonKind::Error);
        }
        None => log::warn!("Config store not open, calibration kept in memory only"),
    }
}

fn report_error(err: CoreError) {
    if err.is_user_visible() {
        log::warn!("{err}");
        tray::show_balloon(err.title(), &err.to_string(), BalloonKind::Warning);
    }
}

/// Re-register hotkeys from the current config.
pub fn reinstall_hotkeys() {
    let Some(section) = with_config(|store| store.config().hotkeys.clone()) else {
        return;
    };
    HOTKEYS.with(|h| {
        if let Some(registry) = h.borrow_mut().as_mut() {
            let active = registry.install(&section);
            log::info!("{active} hotkeys active");
        }
    });
    tray::rebuild_tray_menu(&section);
}
