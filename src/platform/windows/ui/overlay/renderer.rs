//! Direct2D overlay rendering.
//!
//! The static guide is composited in software into a premultiplied BGRA
//! DIB; the capture veil, markers, lines and labels are drawn on top with
//! Direct2D. The frame is applied with UpdateLayeredWindow for per-pixel
//! alpha.

use std::cell::RefCell;

use windows::core::w;
use windows::Win32::Foundation::{COLORREF, HWND, POINT, RECT, SIZE};
use windows::Win32::Graphics::Direct2D::Common::{
    D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_COLOR_F, D2D1_PIXEL_FORMAT, D2D_RECT_F,
};
use windows::Win32::Graphics::Direct2D::{
    ID2D1DCRenderTarget, ID2D1Factory, ID2D1RenderTarget, ID2D1StrokeStyle,
    D2D1_ANTIALIAS_MODE_PER_PRIMITIVE, D2D1_CAP_STYLE_ROUND, D2D1_DASH_STYLE_SOLID,
    D2D1_DRAW_TEXT_OPTIONS_NONE, D2D1_ELLIPSE, D2D1_LINE_JOIN_ROUND,
    D2D1_RENDER_TARGET_PROPERTIES, D2D1_RENDER_TARGET_TYPE_DEFAULT,
    D2D1_RENDER_TARGET_USAGE_NONE, D2D1_ROUNDED_RECT, D2D1_STROKE_STYLE_PROPERTIES,
};
use windows::Win32::Graphics::DirectWrite::{
    IDWriteFactory, IDWriteTextFormat, DWRITE_FONT_STRETCH_NORMAL, DWRITE_FONT_STYLE_NORMAL,
    DWRITE_FONT_WEIGHT_BOLD, DWRITE_MEASURING_MODE_NATURAL, DWRITE_PARAGRAPH_ALIGNMENT_CENTER,
    DWRITE_TEXT_ALIGNMENT_CENTER,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC, SelectObject,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, BLENDFUNCTION, DIB_RGB_COLORS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    KillTimer, SetTimer, SetWindowPos, UpdateLayeredWindow, HWND_TOPMOST, SWP_NOACTIVATE,
    SWP_NOMOVE, SWP_NOSIZE, ULW_ALPHA,
};
use windows_numerics::Vector2;

use super::window::set_click_through;
use crate::events::CoreEvent;
use crate::geometry::{self, ImageSize, ScreenPoint};
use crate::overlay_image::blit_premultiplied_bgra;
use crate::platform::windows::app::state::{publish, WindowsRuntimeState, STATE, TIMER_CLEAR};
use crate::scene::{RenderCommand, Scene, Visual};

// Visual styling
const VEIL_COLOR: D2D1_COLOR_F = rgba(0.0, 0.0, 0.0, 0.25);
const MARKER_COLOR: D2D1_COLOR_F = rgba(1.0, 0.2, 0.3, 1.0);
const MARKER_RING_COLOR: D2D1_COLOR_F = rgba(1.0, 1.0, 1.0, 1.0);
const LINE_COLOR: D2D1_COLOR_F = rgba(1.0, 0.85, 0.2, 1.0);
const LABEL_BG_COLOR: D2D1_COLOR_F = rgba(0.0, 0.0, 0.0, 0.75);
const LABEL_TEXT_COLOR: D2D1_COLOR_F = rgba(1.0, 1.0, 1.0, 1.0);
const MARKER_RADIUS: f32 = 5.0;
const LINE_WIDTH: f32 = 2.0;
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_WIDTH: f32 = 170.0;
const LABEL_HEIGHT: f32 = 32.0;
/// Labels sit this far above their anchor so they do not cover the line.
const LABEL_LIFT: f32 = 24.0;

const fn rgba(r: f32, g: f32, b: f32, a: f32) -> D2D1_COLOR_F {
    D2D1_COLOR_F { r, g, b, a }
}

thread_local! {
    pub static D2D_FACTORY: RefCell<Option<ID2D1Factory>> = const { RefCell::new(None) };
    pub static DWRITE_FACTORY: RefCell<Option<IDWriteFactory>> = const { RefCell::new(None) };
    pub static LABEL_FORMAT: RefCell<Option<IDWriteTextFormat>> = const { RefCell::new(None) };
}

/// Create the centered bold text format used for labels.
pub unsafe fn create_label_format(dwrite_factory: &IDWriteFactory) -> Option<IDWriteTextFormat> {
    let format = dwrite_factory
        .CreateTextFormat(
            w!("Segoe UI"),
            None,
            DWRITE_FONT_WEIGHT_BOLD,
            DWRITE_FONT_STYLE_NORMAL,
            DWRITE_FONT_STRETCH_NORMAL,
            LABEL_FONT_SIZE,
            w!("en-us"),
        )
        .ok()?;
    format.SetTextAlignment(DWRITE_TEXT_ALIGNMENT_CENTER).ok()?;
    format
        .SetParagraphAlignment(DWRITE_PARAGRAPH_ALIGNMENT_CENTER)
        .ok()?;
    Some(format)
}

/// Carry out controller output: window style, timers, then one repaint.
pub fn apply_commands(commands: &[RenderCommand]) {
    if commands.is_empty() {
        return;
    }

    let hwnd = STATE.with(|s| s.borrow().hwnd);
    let mut repaint = false;

    for command in commands {
        match command {
            RenderCommand::ShowCaptureSurface => set_click_through(hwnd, false),
            RenderCommand::HideCaptureSurface => set_click_through(hwnd, true),
            RenderCommand::ScheduleClear { token, after } => {
                let ms = u32::try_from(after.as_millis()).unwrap_or(u32::MAX);
                STATE.with(|s| s.borrow_mut().pending_clear = Some(*token));
                // Re-arming an existing timer ID replaces it
                unsafe { SetTimer(Some(hwnd), TIMER_CLEAR, ms, None) };
            }
            RenderCommand::CancelClear => cancel_clear_timer(hwnd),
            _ => {}
        }
        repaint |= STATE.with(|s| s.borrow_mut().scene.apply(command));
    }

    if repaint {
        update_overlay();
    }
}

fn cancel_clear_timer(hwnd: HWND) {
    STATE.with(|s| s.borrow_mut().pending_clear = None);
    unsafe {
        let _ = KillTimer(Some(hwnd), TIMER_CLEAR);
    }
}

/// The clear timer fired: disarm it and report its token to the controller.
pub fn clear_timer_elapsed(hwnd: HWND) {
    unsafe {
        let _ = KillTimer(Some(hwnd), TIMER_CLEAR);
    }
    if let Some(token) = STATE.with(|s| s.borrow_mut().pending_clear.take()) {
        publish(CoreEvent::ClearTimerFired(token));
    }
}

/// Keep the overlay above the game and the taskbar.
pub fn assert_topmost(hwnd: HWND) {
    unsafe {
        let _ = SetWindowPos(
            hwnd,
            Some(HWND_TOPMOST),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
        );
    }
}

/// Repaint the overlay from the current scene.
pub fn update_overlay() {
    STATE.with(|s| {
        let mut state = s.borrow_mut();
        D2D_FACTORY.with(|d2d_f| {
            LABEL_FORMAT.with(|tf| {
                if let Some(d2d_factory) = d2d_f.borrow().as_ref() {
                    let text_format = tf.borrow();
                    unsafe {
                        update_layered_window_d2d(&mut state, d2d_factory, text_format.as_ref());
                    }
                }
            });
        });
    });
}

/// Compose the frame and apply it with UpdateLayeredWindow.
unsafe fn update_layered_window_d2d(
    state: &mut WindowsRuntimeState,
    factory: &ID2D1Factory,
    text_format: Option<&IDWriteTextFormat>,
) {
    let WindowsRuntimeState {
        hwnd,
        width,
        height,
        scene,
        guide,
        ..
    } = state;
    let (hwnd, width, height) = (*hwnd, *width, *height);
    if width <= 0 || height <= 0 {
        return;
    }

    // Create a compatible DC and ARGB bitmap
    let screen_dc = GetDC(None);
    let mem_dc = CreateCompatibleDC(Some(screen_dc));

    let bmi = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height, // Top-down
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut bits: *mut std::ffi::c_void = std::ptr::null_mut();
    let bitmap = match CreateDIBSection(Some(mem_dc), &bmi, DIB_RGB_COLORS, &mut bits, None, 0) {
        Ok(bitmap) if !bits.is_null() => bitmap,
        _ => {
            log::error!("CreateDIBSection failed for {width}x{height}");
            ReleaseDC(None, screen_dc);
            let _ = DeleteDC(mem_dc);
            return;
        }
    };
    let old_bitmap = SelectObject(mem_dc, bitmap.into());

    // Static guide, composited in software
    let frame_size = ImageSize::new(width as u32, height as u32);
    let frame = std::slice::from_raw_parts_mut(bits as *mut u8, (width * height * 4) as usize);
    frame.fill(0);
    if scene.static_overlay_visible() {
        if let Some(guide) = guide.as_mut() {
            let placement = geometry::overlay_placement(
                guide.native_size(),
                frame_size,
                scene.scale(),
                scene.offset(),
            );
            if let Some((img, x, y)) = guide.visible(placement, frame_size) {
                blit_premultiplied_bgra(frame, frame_size, img, x, y);
            }
        }
    }

    if scene.capture_surface_visible() || scene.visual_count() > 0 {
        draw_scene_d2d(factory, text_format, scene, mem_dc, width, height);
    }

    // Apply to window
    let pt_src = POINT { x: 0, y: 0 };
    let size = SIZE {
        cx: width,
        cy: height,
    };
    let pt_dst = POINT { x: 0, y: 0 };

    let blend = BLENDFUNCTION {
        BlendOp: 0,
        BlendFlags: 0,
        SourceConstantAlpha: 255,
        AlphaFormat: 1,
    };

    if let Err(e) = UpdateLayeredWindow(
        hwnd,
        Some(screen_dc),
        Some(&pt_dst),
        Some(&size),
        Some(mem_dc),
        Some(&pt_src),
        COLORREF(0),
        Some(&blend),
        ULW_ALPHA,
    ) {
        log::warn!("UpdateLayeredWindow failed: {e}");
    }

    assert_topmost(hwnd);

    // Cleanup
    SelectObject(mem_dc, old_bitmap);
    let _ = DeleteObject(bitmap.into());
    let _ = DeleteDC(mem_dc);
    ReleaseDC(None, screen_dc);
}

/// Draw the veil and the transient visuals over the bound DIB.
unsafe fn draw_scene_d2d(
    factory: &ID2D1Factory,
    text_format: Option<&IDWriteTextFormat>,
    scene: &Scene,
    mem_dc: windows::Win32::Graphics::Gdi::HDC,
    width: i32,
    height: i32,
) {
    let rt_props = D2D1_RENDER_TARGET_PROPERTIES {
        r#type: D2D1_RENDER_TARGET_TYPE_DEFAULT,
        pixelFormat: D2D1_PIXEL_FORMAT {
            format: DXGI_FORMAT_B8G8R8A8_UNORM,
            alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
        },
        dpiX: 96.0,
        dpiY: 96.0,
        usage: D2D1_RENDER_TARGET_USAGE_NONE,
        minLevel: Default::default(),
    };

    let dc_rt: ID2D1DCRenderTarget = match factory.CreateDCRenderTarget(&rt_props) {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("CreateDCRenderTarget failed: {e}");
            return;
        }
    };
    let rect = RECT {
        left: 0,
        top: 0,
        right: width,
        bottom: height,
    };
    if dc_rt.BindDC(mem_dc, &rect).is_err() {
        return;
    }

    // Round caps for the measurement line
    let stroke_props = D2D1_STROKE_STYLE_PROPERTIES {
        startCap: D2D1_CAP_STYLE_ROUND,
        endCap: D2D1_CAP_STYLE_ROUND,
        dashCap: D2D1_CAP_STYLE_ROUND,
        lineJoin: D2D1_LINE_JOIN_ROUND,
        miterLimit: 1.0,
        dashStyle: D2D1_DASH_STYLE_SOLID,
        dashOffset: 0.0,
    };
    let stroke_style: Option<ID2D1StrokeStyle> =
        factory.CreateStrokeStyle(&stroke_props, None).ok();

    let rt: ID2D1RenderTarget = dc_rt.into();
    rt.BeginDraw();
    rt.SetAntialiasMode(D2D1_ANTIALIAS_MODE_PER_PRIMITIVE);

    // The DIB already holds the guide, so no Clear here
    if scene.capture_surface_visible() {
        // A non-zero alpha is what makes the layered window take clicks
        if let Ok(brush) = rt.CreateSolidColorBrush(&VEIL_COLOR, None) {
            let full = D2D_RECT_F {
                left: 0.0,
                top: 0.0,
                right: width as f32,
                bottom: height as f32,
            };
            rt.FillRectangle(&full, &brush);
        }
    }

    for (_, visual) in scene.visuals() {
        match visual {
            Visual::Marker(at) => {
                let ellipse = D2D1_ELLIPSE {
                    point: to_vector(*at),
                    radiusX: MARKER_RADIUS,
                    radiusY: MARKER_RADIUS,
                };
                if let Ok(fill) = rt.CreateSolidColorBrush(&MARKER_COLOR, None) {
                    rt.FillEllipse(&ellipse, &fill);
                }
                if let Ok(ring) = rt.CreateSolidColorBrush(&MARKER_RING_COLOR, None) {
                    rt.DrawEllipse(&ellipse, &ring, 1.5, None);
                }
            }
            Visual::Line(from, to) => {
                if let Ok(brush) = rt.CreateSolidColorBrush(&LINE_COLOR, None) {
                    rt.DrawLine(
                        to_vector(*from),
                        to_vector(*to),
                        &brush,
                        LINE_WIDTH,
                        stroke_style.as_ref(),
                    );
                }
            }
            Visual::Label { text, at } => {
                let Some(format) = text_format else {
                    continue;
                };
                let center = to_vector(*at);
                let layout = D2D_RECT_F {
                    left: center.X - LABEL_WIDTH / 2.0,
                    top: center.Y - LABEL_LIFT - LABEL_HEIGHT / 2.0,
                    right: center.X + LABEL_WIDTH / 2.0,
                    bottom: center.Y - LABEL_LIFT + LABEL_HEIGHT / 2.0,
                };
                if let Ok(bg) = rt.CreateSolidColorBrush(&LABEL_BG_COLOR, None) {
                    let rounded = D2D1_ROUNDED_RECT {
                        rect: layout,
                        radiusX: 6.0,
                        radiusY: 6.0,
                    };
                    rt.FillRoundedRectangle(&rounded, &bg);
                }
                if let Ok(fg) = rt.CreateSolidColorBrush(&LABEL_TEXT_COLOR, None) {
                    let wide: Vec<u16> = text.encode_utf16().collect();
                    rt.DrawText(
                        &wide,
                        format,
                        &layout,
                        &fg,
                        D2D1_DRAW_TEXT_OPTIONS_NONE,
                        DWRITE_MEASURING_MODE_NATURAL,
                    );
                }
            }
        }
    }

    if let Err(e) = rt.EndDraw(None, None) {
        log::warn!("EndDraw failed: {e}");
    }
}

fn to_vector(point: ScreenPoint) -> Vector2 {
    Vector2::new(point.x as f32, point.y as f32)
}
