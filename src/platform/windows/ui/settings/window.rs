//! Settings window for Windows.
//!
//! A modeless dialog for the display mode, overlay scale/offset and the
//! hotkey accelerators. Only one instance exists; opening it again brings
//! the existing window to the front.
//!
//! Hotkey fields record a key press instead of taking typed text.

use std::cell::RefCell;

use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{GetStockObject, DEFAULT_GUI_FONT, HBRUSH, WHITE_BRUSH};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, VIRTUAL_KEY, VK_CONTROL, VK_MENU, VK_SHIFT,
};
use windows::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetWindowTextLengthW, GetWindowTextW,
    IsDialogMessageW, LoadCursorW, MessageBoxW, RegisterClassW, SendMessageW, SetForegroundWindow,
    SetWindowTextW, ShowWindow, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, HMENU, IDC_ARROW,
    MB_ICONERROR, MB_ICONWARNING, MB_OK, MSG, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CHAR,
    WM_CLOSE, WM_COMMAND, WM_CREATE, WM_KEYDOWN, WM_NCDESTROY, WM_SETFONT, WM_SYSCHAR,
    WM_SYSKEYDOWN, WNDCLASSW, WS_CAPTION, WS_CHILD, WS_EX_CLIENTEDGE, WS_EX_TOPMOST, WS_GROUP,
    WS_OVERLAPPED, WS_SYSMENU, WS_TABSTOP, WS_VISIBLE,
};

use crate::events::AppEvent;
use crate::geometry::DisplayMode;
use crate::input::{format_accelerator, HotkeyAction, HotkeyBindings, KeyModifiers};
use crate::model::OverlaySettings;
use crate::platform::windows::app::state::{publish, with_config};
use crate::storage::HotkeysSection;

// Control IDs
const ID_MODE_QHD: i32 = 101;
const ID_MODE_FHD: i32 = 102;
const ID_SCALE_EDIT: i32 = 103;
const ID_OFFSET_X_EDIT: i32 = 104;
const ID_OFFSET_Y_EDIT: i32 = 105;
const ID_HOTKEY_EDIT_BASE: i32 = 110;
const ID_SAVE_BUTTON: i32 = 120;
const ID_CLOSE_BUTTON: i32 = 121;

// Button messages and styles
const BM_GETCHECK: u32 = 0x00F0;
const BM_SETCHECK: u32 = 0x00F1;
const BST_CHECKED: usize = 1;
const BS_GROUPBOX: u32 = 0x0007;
const BS_AUTORADIOBUTTON: u32 = 0x0009;
const ES_AUTOHSCROLL: u32 = 0x0080;
const EM_SETSEL: u32 = 0x00B1;

const HOTKEY_SUBCLASS_ID: usize = 1;

// Window dimensions
const WINDOW_WIDTH: i32 = 380;
const WINDOW_HEIGHT: i32 = 480;

// Layout constants
const MARGIN: i32 = 20;
const ROW_HEIGHT: i32 = 32;
const LABEL_WIDTH: i32 = 150;
const FIELD_WIDTH: i32 = 160;
const FIELD_HEIGHT: i32 = 24;

/// Handles of the input controls.
#[derive(Clone, Copy)]
struct Controls {
    qhd: HWND,
    fhd: HWND,
    scale: HWND,
    offset_x: HWND,
    offset_y: HWND,
    hotkeys: [HWND; 4],
}

thread_local! {
    static SETTINGS_HWND: RefCell<Option<HWND>> = const { RefCell::new(None) };
    static CONTROLS: RefCell<Option<Controls>> = const { RefCell::new(None) };
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Open the settings window, or focus it if it is already open.
pub fn open_settings_window(parent_hwnd: HWND) {
    if let Some(hwnd) = SETTINGS_HWND.with(|h| *h.borrow()) {
        unsafe {
            let _ = SetForegroundWindow(hwnd);
        }
        return;
    }

    unsafe {
        // Register window class
        let class_name = w!("MapOverlaySettings");
        let hinstance = GetModuleHandleW(None).unwrap_or_default();

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(settings_wnd_proc),
            hInstance: hinstance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
            hbrBackground: HBRUSH(GetStockObject(WHITE_BRUSH).0),
            lpszClassName: class_name,
            ..Default::default()
        };
        let _ = RegisterClassW(&wc);

        // The overlay is topmost too; the dialog has to stay above it
        let hwnd = CreateWindowExW(
            WS_EX_TOPMOST,
            class_name,
            w!("Overlay Settings"),
            WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            WINDOW_WIDTH,
            WINDOW_HEIGHT,
            Some(parent_hwnd),
            None,
            Some(hinstance.into()),
            None,
        );

        let hwnd = match hwnd {
            Ok(h) => h,
            Err(e) => {
                log::error!("Failed to create settings window: {e}");
                return;
            }
        };

        SETTINGS_HWND.with(|h| *h.borrow_mut() = Some(hwnd));
        log::info!("Settings window opened");

        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = SetForegroundWindow(hwnd);
    }
}

/// Close the settings window.
pub fn close_settings_window() {
    // Take the HWND first, releasing the borrow before calling DestroyWindow
    // (DestroyWindow sends WM_DESTROY synchronously)
    let hwnd_to_destroy = SETTINGS_HWND.with(|h| h.borrow_mut().take());
    CONTROLS.with(|c| *c.borrow_mut() = None);

    if let Some(hwnd) = hwnd_to_destroy {
        unsafe {
            let _ = DestroyWindow(hwnd);
        }
    }
}

/// Let the dialog handle keyboard navigation (Tab between fields).
///
/// Returns true if the message was consumed.
pub fn translate_dialog_message(msg: &MSG) -> bool {
    SETTINGS_HWND.with(|h| match *h.borrow() {
        Some(hwnd) => unsafe { IsDialogMessageW(hwnd, msg).as_bool() },
        None => false,
    })
}

unsafe extern "system" fn settings_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_CREATE => {
            create_controls(hwnd);
            LRESULT(0)
        }

        WM_COMMAND => {
            let control_id = (wparam.0 & 0xFFFF) as i32;
            handle_command(hwnd, control_id);
            LRESULT(0)
        }

        WM_CLOSE => {
            close_settings_window();
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe fn create_controls(hwnd: HWND) {
    let hinstance: HINSTANCE = GetModuleHandleW(None).unwrap_or_default().into();
    let (settings, hotkeys) = with_config(|store| {
        (
            store.config().overlay_settings(),
            store.config().hotkeys.clone(),
        )
    })
    .unwrap_or_default();

    let mut y = MARGIN;

    // Resolution mode
    create_control(
        hwnd,
        hinstance,
        w!("BUTTON"),
        "Resolution Mode",
        WINDOW_STYLE(BS_GROUPBOX),
        (MARGIN - 8, y - 4, WINDOW_WIDTH - 2 * MARGIN, 56),
        0,
    );
    y += 20;
    let qhd = create_control(
        hwnd,
        hinstance,
        w!("BUTTON"),
        DisplayMode::Qhd.label(),
        WS_TABSTOP | WS_GROUP | WINDOW_STYLE(BS_AUTORADIOBUTTON),
        (MARGIN, y, 140, FIELD_HEIGHT),
        ID_MODE_QHD,
    );
    let fhd = create_control(
        hwnd,
        hinstance,
        w!("BUTTON"),
        DisplayMode::Fhd.label(),
        WINDOW_STYLE(BS_AUTORADIOBUTTON),
        (MARGIN + 160, y, 140, FIELD_HEIGHT),
        ID_MODE_FHD,
    );
    let checked = match settings.display_mode {
        DisplayMode::Qhd => qhd,
        DisplayMode::Fhd => fhd,
    };
    SendMessageW(checked, BM_SETCHECK, Some(WPARAM(BST_CHECKED)), None);
    y += ROW_HEIGHT + 16;

    // Placement
    let scale = create_field(
        hwnd,
        hinstance,
        y,
        "Scale Factor",
        &format!("{}", settings.scale_factor),
        ID_SCALE_EDIT,
    );
    y += ROW_HEIGHT;
    let offset_x = create_field(
        hwnd,
        hinstance,
        y,
        "Offset X (px)",
        &settings.offset_x.to_string(),
        ID_OFFSET_X_EDIT,
    );
    y += ROW_HEIGHT;
    let offset_y = create_field(
        hwnd,
        hinstance,
        y,
        "Offset Y (px)",
        &settings.offset_y.to_string(),
        ID_OFFSET_Y_EDIT,
    );
    y += ROW_HEIGHT + 12;

    // Hotkeys
    let mut hotkey_fields = [HWND::default(); 4];
    for (i, action) in HotkeyAction::ALL.into_iter().enumerate() {
        hotkey_fields[i] = create_field(
            hwnd,
            hinstance,
            y,
            action.label(),
            action.accelerator(&hotkeys),
            ID_HOTKEY_EDIT_BASE + i as i32,
        );
        if !SetWindowSubclass(
            hotkey_fields[i],
            Some(hotkey_field_proc),
            HOTKEY_SUBCLASS_ID,
            0,
        )
        .as_bool()
        {
            log::warn!("Hotkey field for {} will not record key presses", action.label());
        }
        y += ROW_HEIGHT;
    }
    y += 16;

    // Buttons
    create_control(
        hwnd,
        hinstance,
        w!("BUTTON"),
        "Save",
        WS_TABSTOP,
        (MARGIN, y, 150, 30),
        ID_SAVE_BUTTON,
    );
    create_control(
        hwnd,
        hinstance,
        w!("BUTTON"),
        "Close",
        WS_TABSTOP,
        (WINDOW_WIDTH - MARGIN - 150 - 16, y, 150, 30),
        ID_CLOSE_BUTTON,
    );

    CONTROLS.with(|c| {
        *c.borrow_mut() = Some(Controls {
            qhd,
            fhd,
            scale,
            offset_x,
            offset_y,
            hotkeys: hotkey_fields,
        });
    });
}

/// A label plus a single-line edit on one row. Returns the edit.
unsafe fn create_field(
    hwnd: HWND,
    hinstance: HINSTANCE,
    y: i32,
    label: &str,
    value: &str,
    id: i32,
) -> HWND {
    create_control(
        hwnd,
        hinstance,
        w!("STATIC"),
        label,
        WINDOW_STYLE(0),
        (MARGIN, y + 4, LABEL_WIDTH, 20),
        0,
    );
    let edit = create_control_ex(
        hwnd,
        hinstance,
        WS_EX_CLIENTEDGE,
        w!("EDIT"),
        value,
        WS_TABSTOP | WINDOW_STYLE(ES_AUTOHSCROLL),
        (MARGIN + LABEL_WIDTH, y, FIELD_WIDTH, FIELD_HEIGHT),
        id,
    );
    edit
}

unsafe fn create_control(
    hwnd: HWND,
    hinstance: HINSTANCE,
    class: PCWSTR,
    text: &str,
    style: WINDOW_STYLE,
    rect: (i32, i32, i32, i32),
    id: i32,
) -> HWND {
    create_control_ex(
        hwnd,
        hinstance,
        WINDOW_EX_STYLE::default(),
        class,
        text,
        style,
        rect,
        id,
    )
}

#[allow(clippy::too_many_arguments)]
unsafe fn create_control_ex(
    hwnd: HWND,
    hinstance: HINSTANCE,
    ex_style: WINDOW_EX_STYLE,
    class: PCWSTR,
    text: &str,
    style: WINDOW_STYLE,
    (x, y, width, height): (i32, i32, i32, i32),
    id: i32,
) -> HWND {
    let text_wide = wide(text);
    let control = CreateWindowExW(
        ex_style,
        class,
        PCWSTR(text_wide.as_ptr()),
        WS_CHILD | WS_VISIBLE | style,
        x,
        y,
        width,
        height,
        Some(hwnd),
        Some(HMENU(id as isize as *mut _)),
        Some(hinstance),
        None,
    )
    .unwrap_or_default();

    let font = GetStockObject(DEFAULT_GUI_FONT);
    SendMessageW(
        control,
        WM_SETFONT,
        Some(WPARAM(font.0 as usize)),
        Some(LPARAM(1)),
    );
    control
}

fn key_down(vk: VIRTUAL_KEY) -> bool {
    unsafe { GetKeyState(i32::from(vk.0)) < 0 }
}

/// Edit subclass that replaces the field text with the pressed combination.
unsafe extern "system" fn hotkey_field_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _id: usize,
    _data: usize,
) -> LRESULT {
    match msg {
        // Alt combinations and F10 arrive as system keys
        WM_KEYDOWN | WM_SYSKEYDOWN => {
            let mods = KeyModifiers {
                ctrl: key_down(VK_CONTROL),
                alt: key_down(VK_MENU),
                shift: key_down(VK_SHIFT),
            };
            if let Some(accelerator) = format_accelerator(mods, wparam.0 as u32) {
                let text = wide(&accelerator);
                let _ = SetWindowTextW(hwnd, PCWSTR(text.as_ptr()));
                SendMessageW(hwnd, EM_SETSEL, Some(WPARAM(0)), Some(LPARAM(-1)));
            }
            LRESULT(0)
        }

        WM_CHAR | WM_SYSCHAR => LRESULT(0),

        WM_NCDESTROY => {
            let _ = RemoveWindowSubclass(hwnd, Some(hotkey_field_proc), HOTKEY_SUBCLASS_ID);
            DefSubclassProc(hwnd, msg, wparam, lparam)
        }

        _ => DefSubclassProc(hwnd, msg, wparam, lparam),
    }
}

unsafe fn window_text(hwnd: HWND) -> String {
    let len = GetWindowTextLengthW(hwnd).max(0) as usize;
    let mut buf = vec![0u16; len + 1];
    let copied = GetWindowTextW(hwnd, &mut buf).max(0) as usize;
    String::from_utf16_lossy(&buf[..copied.min(len)])
}

unsafe fn handle_command(hwnd: HWND, control_id: i32) {
    match control_id {
        ID_SAVE_BUTTON => save_settings(hwnd),
        ID_CLOSE_BUTTON => close_settings_window(),
        _ => {}
    }
}

/// Validate the form, write the config and tell the app to re-apply it.
unsafe fn save_settings(hwnd: HWND) {
    let Some(controls) = CONTROLS.with(|c| *c.borrow()) else {
        return;
    };

    let mode = if SendMessageW(controls.fhd, BM_GETCHECK, None, None).0 as usize == BST_CHECKED {
        DisplayMode::Fhd
    } else {
        DisplayMode::Qhd
    };
    let settings = match OverlaySettings::from_form(
        mode,
        &window_text(controls.scale),
        &window_text(controls.offset_x),
        &window_text(controls.offset_y),
    ) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("{err}");
            message_box(hwnd, "Invalid calibration values", &err.to_string(), true);
            return;
        }
    };

    let mut hotkeys = HotkeysSection::default();
    for (action, field) in HotkeyAction::ALL.into_iter().zip(controls.hotkeys) {
        let text = window_text(field);
        *action.accelerator_mut(&mut hotkeys) = text.trim().to_string();
    }
    let (_, hotkey_errors) = HotkeyBindings::parse(&hotkeys);

    let saved = with_config(|store| {
        store.update(|config| {
            config.set_overlay_settings(&settings);
            config.hotkeys = hotkeys.clone();
        });
        store.flush()
    });

    match saved {
        Some(Ok(())) => {
            log::info!(
                "Settings saved: {} x{} offset ({}, {})",
                settings.display_mode,
                settings.scale_factor,
                settings.offset_x,
                settings.offset_y
            );
            publish(AppEvent::SettingsSaved);
            if !hotkey_errors.is_empty() {
                let details = hotkey_errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                message_box(hwnd, "Some hotkeys were not set", &details, false);
            }
        }
        Some(Err(err)) => {
            log::error!("Failed to save settings: {err}");
            message_box(hwnd, "Settings not saved", &err.to_string(), true);
        }
        None => log::warn!("Config store not open, settings not saved"),
    }
}

unsafe fn message_box(hwnd: HWND, title: &str, text: &str, error: bool) {
    let title = wide(title);
    let text = wide(text);
    let icon = if error { MB_ICONERROR } else { MB_ICONWARNING };
    MessageBoxW(
        Some(hwnd),
        PCWSTR(text.as_ptr()),
        PCWSTR(title.as_ptr()),
        MB_OK | icon,
    );
}
