//! Windows-specific entry point and application logic.
//!
//! One full-screen layered window on the primary screen carries the static
//! guide and, while capturing, the veil that takes the clicks. Everything
//! runs on the UI thread; input is queued on the event bus and drained by a
//! 16 ms timer.

use windows::core::w;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Direct2D::{D2D1CreateFactory, D2D1_FACTORY_TYPE_SINGLE_THREADED};
use windows::Win32::Graphics::DirectWrite::{DWriteCreateFactory, DWRITE_FACTORY_TYPE_SHARED};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
    GetSystemMetrics, KillTimer, LoadCursorW, PostQuitMessage, RegisterClassW, SetCursor,
    SetTimer, ShowWindow, TranslateMessage, CS_HREDRAW, CS_VREDRAW, IDC_ARROW, IDC_CROSS, MSG,
    SM_CXSCREEN, SM_CYSCREEN, SW_SHOWNOACTIVATE, WM_COMMAND, WM_CREATE, WM_DESTROY,
    WM_LBUTTONDOWN, WM_SETCURSOR, WM_TIMER, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

use map_overlay::events::CoreEvent;
use map_overlay::geometry::ScreenPoint;
use map_overlay::input::HotkeyRegistry;
use map_overlay::overlay_image::OverlayImage;
use map_overlay::platform::windows::app::state::{
    publish, with_config, CONFIG, CONTROLLER, EVENTS_INTERVAL_MS, HOTKEYS, STATE, TIMER_CLEAR,
    TIMER_EVENTS, TIMER_TOPMOST, TOPMOST_INTERVAL_MS,
};
use map_overlay::platform::windows::handlers::{dispatch_events, dispatcher::reinstall_hotkeys};
use map_overlay::platform::windows::ui::overlay::{
    assert_topmost, clear_timer_elapsed, create_label_format, update_overlay, D2D_FACTORY,
    DWRITE_FACTORY, LABEL_FORMAT,
};
use map_overlay::platform::windows::ui::settings::window as settings_window;
use map_overlay::platform::windows::ui::tray::{self, menu_event, WM_TRAYICON};
use map_overlay::storage::ConfigStore;
use map_overlay::OverlayController;

// Tray notification codes carried in lparam
const TRAY_RBUTTONUP: u32 = 0x0205;
const TRAY_LBUTTONDBLCLK: u32 = 0x0203;

/// Main entry point for Windows.
pub fn run() {
    if let Err(e) = run_app() {
        log::error!("Map overlay error: {e}");
        std::process::exit(1);
    }
}

fn run_app() -> windows::core::Result<()> {
    unsafe {
        // Physical pixels, so screen coordinates match the game's
        if let Err(e) = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) {
            log::warn!("Could not enable per-monitor DPI awareness: {e}");
        }

        // Initialize COM
        CoInitializeEx(None, COINIT_APARTMENTTHREADED).ok()?;

        // Create Direct2D factory
        let factory = D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, None)?;
        D2D_FACTORY.with(|f| *f.borrow_mut() = Some(factory));

        // Create DirectWrite factory for label text
        let dwrite_factory = DWriteCreateFactory(DWRITE_FACTORY_TYPE_SHARED)?;
        match create_label_format(&dwrite_factory) {
            Some(format) => LABEL_FORMAT.with(|f| *f.borrow_mut() = Some(format)),
            None => log::warn!("Label font unavailable, distances will not be labelled"),
        }
        DWRITE_FACTORY.with(|f| *f.borrow_mut() = Some(dwrite_factory));

        // Config, calibration and overlay asset
        let store = ConfigStore::open_default();
        match store.path() {
            Some(path) => log::info!("Config: {}", path.display()),
            None => log::warn!("Config: in memory only"),
        }
        let settings = store.config().overlay_settings();
        let ratio = store.config().calibration_ratio();
        let hotkeys = store.config().hotkeys.clone();
        CONFIG.with(|c| *c.borrow_mut() = Some(store));
        CONTROLLER.with(|c| *c.borrow_mut() = OverlayController::new(ratio, settings));
        if ratio.is_calibrated() {
            log::info!("Loaded calibration: {ratio}");
        } else {
            log::info!("Not calibrated yet");
        }

        let instance = GetModuleHandleW(None)?;
        let class_name = w!("MapOverlayWindow");

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(wndproc),
            hInstance: instance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW)?,
            lpszClassName: class_name,
            ..Default::default()
        };
        RegisterClassW(&wc);

        // Primary screen only
        let width = GetSystemMetrics(SM_CXSCREEN);
        let height = GetSystemMetrics(SM_CYSCREEN);
        log::info!("Primary screen: {width}x{height}");

        // Create layered, click-through, topmost window
        let ex_style =
            WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOPMOST | WS_EX_NOACTIVATE | WS_EX_TOOLWINDOW;

        let hwnd = CreateWindowExW(
            ex_style,
            class_name,
            w!("PUBG Map Overlay"),
            WS_POPUP,
            0,
            0,
            width,
            height,
            None,
            None,
            Some(instance.into()),
            None,
        )?;

        STATE.with(|s| {
            let mut state = s.borrow_mut();
            state.hwnd = hwnd;
            state.width = width;
            state.height = height;
            state.guide = Some(OverlayImage::load());
        });

        // Global hotkeys
        match HotkeyRegistry::new() {
            Ok(registry) => {
                HOTKEYS.with(|h| *h.borrow_mut() = Some(registry));
            }
            Err(e) => log::error!("{e}; hotkeys disabled, use the tray menu"),
        }

        // Install system tray icon
        tray::install_tray_icon(hwnd, &hotkeys);
        reinstall_hotkeys();

        // Initial placement goes through the controller like any later change
        publish(CoreEvent::ApplySettings(settings));
        dispatch_events();

        SetTimer(Some(hwnd), TIMER_EVENTS, EVENTS_INTERVAL_MS, None);
        SetTimer(Some(hwnd), TIMER_TOPMOST, TOPMOST_INTERVAL_MS, None);

        // Initial draw and show
        update_overlay();
        let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);

        // Message loop
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            if settings_window::translate_dialog_message(&msg) {
                continue;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        // Cleanup
        let _ = KillTimer(Some(hwnd), TIMER_EVENTS);
        let _ = KillTimer(Some(hwnd), TIMER_TOPMOST);
        let _ = KillTimer(Some(hwnd), TIMER_CLEAR);
        settings_window::close_settings_window();
        HOTKEYS.with(|h| *h.borrow_mut() = None);
        tray::remove_tray_icon();
        let _ = DestroyWindow(hwnd);

        if let Some(Err(e)) = with_config(|store| store.flush()) {
            log::error!("Failed to write config on exit: {e}");
        }

        LABEL_FORMAT.with(|f| *f.borrow_mut() = None);
        DWRITE_FACTORY.with(|f| *f.borrow_mut() = None);
        D2D_FACTORY.with(|f| *f.borrow_mut() = None);

        CoUninitialize();
        log::info!("Shutdown complete");

        Ok(())
    }
}

extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe {
        match msg {
            WM_CREATE => LRESULT(0),

            WM_TIMER => {
                match wparam.0 {
                    TIMER_EVENTS => dispatch_events(),
                    TIMER_CLEAR => clear_timer_elapsed(hwnd),
                    TIMER_TOPMOST => assert_topmost(hwnd),
                    _ => {}
                }
                LRESULT(0)
            }

            // Only reaches us while click-through is off, i.e. while capturing
            WM_LBUTTONDOWN => {
                let point = point_from_lparam(lparam);
                log::debug!("Click at {point}");
                publish(CoreEvent::MarkPoint(point));
                LRESULT(0)
            }

            WM_SETCURSOR => {
                let capturing = CONTROLLER.with(|c| c.borrow().mode().is_capturing());
                if capturing {
                    if let Ok(cursor) = LoadCursorW(None, IDC_CROSS) {
                        SetCursor(Some(cursor));
                        return LRESULT(1);
                    }
                }
                DefWindowProcW(hwnd, msg, wparam, lparam)
            }

            WM_DESTROY => {
                PostQuitMessage(0);
                LRESULT(0)
            }

            // System tray icon messages
            msg if msg == WM_TRAYICON => {
                match lparam.0 as u32 {
                    TRAY_RBUTTONUP => tray::show_tray_menu(hwnd),
                    TRAY_LBUTTONDBLCLK => publish(CoreEvent::ToggleVisibility),
                    _ => {}
                }
                LRESULT(0)
            }

            // Context menu commands
            WM_COMMAND => {
                let cmd = (wparam.0 & 0xFFFF) as u32;
                if let Some(event) = menu_event(cmd) {
                    publish(event);
                }
                LRESULT(0)
            }

            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}

/// Client coordinates from a mouse message; signed, as on multi-monitor setups.
fn point_from_lparam(lparam: LPARAM) -> ScreenPoint {
    let x = (lparam.0 & 0xFFFF) as u16 as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xFFFF) as u16 as i16 as i32;
    // The window sits at the primary screen origin, so client == screen
    ScreenPoint::new(x, y)
}
