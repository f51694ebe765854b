//! Windows runtime state management.
//!
//! Everything here lives on the UI thread: the window, the retained scene,
//! the controller and its collaborators are thread-locals, and only the
//! event bus publisher crosses into callbacks.

use std::cell::RefCell;

use windows::Win32::Foundation::HWND;

use crate::controller::OverlayController;
use crate::events::{AppEvent, EventBus, EventPublisher};
use crate::input::HotkeyRegistry;
use crate::overlay_image::OverlayImage;
use crate::scene::{ClearToken, Scene};
use crate::storage::ConfigStore;

// Timer IDs
pub const TIMER_EVENTS: usize = 1;
pub const TIMER_CLEAR: usize = 2;
pub const TIMER_TOPMOST: usize = 3;

/// Event pump interval (~60 FPS).
pub const EVENTS_INTERVAL_MS: u32 = 16;

/// How often the overlay re-asserts its topmost position.
pub const TOPMOST_INTERVAL_MS: u32 = 1000;

/// Window-side state: what is on screen and where.
pub struct WindowsRuntimeState {
    pub hwnd: HWND,
    /// Primary screen size in physical pixels.
    pub width: i32,
    pub height: i32,
    pub scene: Scene,
    pub guide: Option<OverlayImage>,
    /// Token of the armed clear timer.
    pub pending_clear: Option<ClearToken>,
}

impl Default for WindowsRuntimeState {
    fn default() -> Self {
        Self {
            hwnd: HWND::default(),
            width: 0,
            height: 0,
            scene: Scene::new(),
            guide: None,
            pending_clear: None,
        }
    }
}

thread_local! {
    /// Global window state for the overlay.
    pub static STATE: RefCell<WindowsRuntimeState> = RefCell::new(WindowsRuntimeState::default());

    /// The single owner of mode, points and calibration.
    pub static CONTROLLER: RefCell<OverlayController> = RefCell::new(OverlayController::default());

    /// Cached config document.
    pub static CONFIG: RefCell<Option<ConfigStore>> = const { RefCell::new(None) };

    /// Registered global hotkeys.
    pub static HOTKEYS: RefCell<Option<HotkeyRegistry>> = const { RefCell::new(None) };

    /// Application event queue, drained by the event timer.
    pub static BUS: EventBus = EventBus::new();
}

/// A publisher handle for the UI thread's event bus.
pub fn publisher() -> EventPublisher {
    BUS.with(|bus| bus.publisher())
}

/// Queue an event for the next dispatch.
pub fn publish(event: impl Into<AppEvent>) {
    BUS.with(|bus| {
        bus.publisher().publish(event.into());
    });
}

pub fn overlay_hwnd() -> HWND {
    STATE.with(|s| s.borrow().hwnd)
}

/// Run `f` against the config store, if it was opened.
pub fn with_config<R>(f: impl FnOnce(&mut ConfigStore) -> R) -> Option<R> {
    CONFIG.with(|c| c.borrow_mut().as_mut().map(f))
}
