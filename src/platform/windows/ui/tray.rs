//! System tray (notification area) icon for Windows.
//!
//! Provides a tray icon with context menu for controlling the overlay, and
//! balloon notifications for calibration results and errors.

use std::cell::RefCell;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_ERROR, NIIF_INFO,
    NIIF_WARNING, NIM_ADD, NIM_DELETE, NIM_MODIFY, NOTIFYICONDATAW, NOTIFY_ICON_INFOTIP_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyIcon, DestroyMenu, GetCursorPos, LoadIconW, LoadImageW,
    SetForegroundWindow, TrackPopupMenu, HICON, HMENU, IDI_APPLICATION, IMAGE_ICON, LR_DEFAULTSIZE,
    LR_LOADFROMFILE, MF_SEPARATOR, MF_STRING, TPM_BOTTOMALIGN, TPM_LEFTALIGN, TPM_RIGHTBUTTON,
    WM_USER,
};

use crate::events::{AppEvent, CoreEvent};
use crate::input::HotkeyAction;
use crate::model::constants::TRAY_ICON_PATH;
use crate::overlay_image::asset_candidates;
use crate::storage::HotkeysSection;

// Custom message for tray icon events
pub const WM_TRAYICON: u32 = WM_USER + 1;

// Menu item IDs
pub const MENU_SETTINGS: u32 = 1001;
pub const MENU_TOGGLE: u32 = 1002;
pub const MENU_CALIBRATE: u32 = 1003;
pub const MENU_MEASURE: u32 = 1004;
pub const MENU_QUIT: u32 = 1005;

// Tray icon ID
const TRAY_ICON_ID: u32 = 1;

const TRAY_TIP: &str = "PUBG Map Overlay";

thread_local! {
    static TRAY_HWND: RefCell<Option<HWND>> = const { RefCell::new(None) };
    static TRAY_MENU: RefCell<Option<HMENU>> = const { RefCell::new(None) };
    // Only set for an icon loaded from file; stock icons are not destroyed
    static TRAY_ICON: RefCell<Option<HICON>> = const { RefCell::new(None) };
}

/// Severity of a balloon notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalloonKind {
    Info,
    Warning,
    Error,
}

impl BalloonKind {
    fn flags(self) -> NOTIFY_ICON_INFOTIP_FLAGS {
        match self {
            BalloonKind::Info => NIIF_INFO,
            BalloonKind::Warning => NIIF_WARNING,
            BalloonKind::Error => NIIF_ERROR,
        }
    }
}

/// The event a menu command stands for.
pub fn menu_event(cmd: u32) -> Option<AppEvent> {
    match cmd {
        MENU_SETTINGS => Some(AppEvent::OpenSettings),
        MENU_TOGGLE => Some(CoreEvent::ToggleVisibility.into()),
        MENU_CALIBRATE => Some(CoreEvent::EnterCalibration.into()),
        MENU_MEASURE => Some(CoreEvent::ToggleMeasurement.into()),
        MENU_QUIT => Some(AppEvent::Quit),
        _ => None,
    }
}

/// Copy `text` into a fixed UTF-16 buffer, truncating and NUL-terminating.
fn copy_wide(dst: &mut [u16], text: &str) {
    let max = dst.len().saturating_sub(1);
    let mut len = 0;
    for (slot, c) in dst.iter_mut().zip(text.encode_utf16().take(max)) {
        *slot = c;
        len += 1;
    }
    if let Some(end) = dst.get_mut(len) {
        *end = 0;
    }
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn base_notify_data(hwnd: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: TRAY_ICON_ID,
        ..Default::default()
    }
}

/// Install the system tray icon with context menu.
pub fn install_tray_icon(hwnd: HWND, hotkeys: &HotkeysSection) {
    unsafe {
        TRAY_HWND.with(|h| *h.borrow_mut() = Some(hwnd));

        let hicon = match load_icon_file() {
            Some(icon) => {
                TRAY_ICON.with(|i| *i.borrow_mut() = Some(icon));
                icon
            }
            None => LoadIconW(None, IDI_APPLICATION).unwrap_or_default(),
        };

        let mut nid = base_notify_data(hwnd);
        nid.uFlags = NIF_ICON | NIF_MESSAGE | NIF_TIP;
        nid.uCallbackMessage = WM_TRAYICON;
        nid.hIcon = hicon;
        copy_wide(&mut nid.szTip, TRAY_TIP);

        if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
            log::warn!("Failed to add tray icon");
        }
    }

    rebuild_tray_menu(hotkeys);
}

/// The first `assets/icon.ico` that loads.
fn load_icon_file() -> Option<HICON> {
    asset_candidates(TRAY_ICON_PATH)
        .into_iter()
        .filter(|path| path.is_file())
        .find_map(|path| {
            let name = wide(&path.to_string_lossy());
            let loaded = unsafe {
                LoadImageW(
                    None,
                    PCWSTR(name.as_ptr()),
                    IMAGE_ICON,
                    0,
                    0,
                    LR_LOADFROMFILE | LR_DEFAULTSIZE,
                )
            };
            match loaded {
                Ok(handle) => {
                    log::info!("Tray icon: {}", path.display());
                    Some(HICON(handle.0))
                }
                Err(e) => {
                    log::warn!("Failed to load tray icon {}: {e}", path.display());
                    None
                }
            }
        })
}

/// Recreate the context menu, labelling items with their accelerators.
pub fn rebuild_tray_menu(hotkeys: &HotkeysSection) {
    TRAY_MENU.with(|m| {
        if let Some(old_menu) = m.borrow_mut().take() {
            unsafe {
                let _ = DestroyMenu(old_menu);
            }
        }
    });

    let items = [
        (MENU_SETTINGS, HotkeyAction::OpenSettings),
        (MENU_TOGGLE, HotkeyAction::ToggleVisibility),
        (MENU_CALIBRATE, HotkeyAction::CalibrateMode),
        (MENU_MEASURE, HotkeyAction::MeasureDistance),
    ];

    unsafe {
        let menu = match CreatePopupMenu() {
            Ok(menu) => menu,
            Err(e) => {
                log::error!("Failed to create tray menu: {e}");
                return;
            }
        };

        for (id, action) in items {
            let label = wide(&format!(
                "{} ({})",
                action.label(),
                action.accelerator(hotkeys)
            ));
            let _ = AppendMenuW(menu, MF_STRING, id as usize, PCWSTR(label.as_ptr()));
        }
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
        let quit = wide("Quit");
        let _ = AppendMenuW(menu, MF_STRING, MENU_QUIT as usize, PCWSTR(quit.as_ptr()));

        TRAY_MENU.with(|m| *m.borrow_mut() = Some(menu));
    }
}

/// Remove the tray icon.
pub fn remove_tray_icon() {
    TRAY_HWND.with(|h| {
        if let Some(hwnd) = h.borrow_mut().take() {
            unsafe {
                let nid = base_notify_data(hwnd);
                let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
            }
        }
    });

    TRAY_MENU.with(|m| {
        if let Some(menu) = m.borrow_mut().take() {
            unsafe {
                let _ = DestroyMenu(menu);
            }
        }
    });

    TRAY_ICON.with(|i| {
        if let Some(icon) = i.borrow_mut().take() {
            unsafe {
                let _ = DestroyIcon(icon);
            }
        }
    });
}

/// Current menu handle, copied out so no borrow is held.
fn current_menu() -> Option<HMENU> {
    TRAY_MENU.with(|m| *m.borrow())
}

/// Show the context menu at the cursor position.
pub fn show_tray_menu(hwnd: HWND) {
    // TrackPopupMenu runs a modal loop; timers keep dispatching inside it
    let Some(menu) = current_menu() else {
        return;
    };
    unsafe {
        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for menu to close when clicking outside
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_BOTTOMALIGN | TPM_LEFTALIGN | TPM_RIGHTBUTTON,
            pt.x,
            pt.y,
            None, // nReserved - must be None/0
            hwnd,
            None,
        );
    }
}

/// Update tray tooltip to show current state.
pub fn update_tray_tooltip(visible: bool) {
    TRAY_HWND.with(|h| {
        if let Some(hwnd) = *h.borrow() {
            let mut nid = base_notify_data(hwnd);
            nid.uFlags = NIF_TIP;
            let tip = if visible {
                format!("{TRAY_TIP} - Visible")
            } else {
                format!("{TRAY_TIP} - Hidden")
            };
            copy_wide(&mut nid.szTip, &tip);
            unsafe {
                let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
            }
        }
    });
}

/// Pop a balloon notification from the tray icon.
pub fn show_balloon(title: &str, message: &str, kind: BalloonKind) {
    TRAY_HWND.with(|h| {
        if let Some(hwnd) = *h.borrow() {
            let mut nid = base_notify_data(hwnd);
            nid.uFlags = NIF_INFO;
            nid.dwInfoFlags = kind.flags();
            copy_wide(&mut nid.szInfoTitle, title);
            copy_wide(&mut nid.szInfo, message);
            unsafe {
                if !Shell_NotifyIconW(NIM_MODIFY, &nid).as_bool() {
                    log::debug!("Balloon not shown: {title}");
                }
            }
        }
    });
}
