//! Event system for decoupled inter-module communication.
//!
//! This module provides a bounded publish/subscribe queue using Rust's
//! standard library `mpsc` channels. Every user action (hotkey, tray menu,
//! click on the capture surface) is published here and consumed one at a
//! time by the control thread, which is the only place that mutates the
//! overlay controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Hotkeys   │     │    Tray     │     │   Capture   │
//! │  (listener) │     │    menu     │     │   clicks    │
//! └──────┬──────┘     └──────┬──────┘     └──────┬──────┘
//!        │ publish()         │ publish()         │ publish()
//!        ▼                   ▼                   ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                     EventBus                        │
//! │               (bounded mpsc channel)                │
//! └─────────────────────────┬───────────────────────────┘
//!                           │ drain()
//!                           ▼
//! ┌─────────────────────────────────────────────────────┐
//! │          Dispatcher → OverlayController             │
//! │               (control thread timer)                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Structure
//!
//! - [`types`]: Event definitions (`AppEvent`, `CoreEvent`)
//! - [`bus`]: `EventBus` and `EventPublisher` types

pub mod bus;
pub mod types;

// Re-export main types for convenient access
pub use bus::{EventBus, EventPublisher};
pub use types::{AppEvent, CoreEvent};
