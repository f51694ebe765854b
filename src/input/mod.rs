//! Input handling module.
//!
//! - hotkeys.rs: accelerator parsing, global registration and forwarding of
//!   presses into the event bus, and accelerator strings for recorded key
//!   presses

pub mod hotkeys;

pub use hotkeys::{format_accelerator, HotkeyAction, HotkeyBindings, HotkeyRegistry, KeyModifiers};
