//! UI components for Windows.

pub mod overlay;
pub mod settings;
pub mod tray;
