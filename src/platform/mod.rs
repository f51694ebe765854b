//! Platform-specific implementations.
//!
//! Only Windows has a platform layer: it provides the layered overlay
//! window, the settings dialog and the tray icon, and drives the core from
//! its message loop.

#[cfg(target_os = "windows")]
pub mod windows;
