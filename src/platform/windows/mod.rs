//! Windows-specific implementation using Win32 API and Direct2D.
//!
//! This module contains all Windows-specific code:
//! - App state (thread-local window state, controller, config, hotkeys)
//! - Event dispatching from the bus into the controller
//! - UI components (layered overlay window, settings dialog, tray icon)

pub mod app;
pub mod handlers;
pub mod ui;
