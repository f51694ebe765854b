//! Overlay window style helpers.

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowLongW, SetWindowLongW, GWL_EXSTYLE, WS_EX_TRANSPARENT,
};

/// Toggle whether mouse input passes through the overlay window.
pub fn set_click_through(hwnd: HWND, enabled: bool) {
    unsafe {
        let style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
        let updated = if enabled {
            style | WS_EX_TRANSPARENT.0
        } else {
            style & !WS_EX_TRANSPARENT.0
        };
        if updated != style {
            SetWindowLongW(hwnd, GWL_EXSTYLE, updated as i32);
            log::debug!("Click-through {}", if enabled { "on" } else { "off" });
        }
    }
}
