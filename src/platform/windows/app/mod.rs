//! Application state for Windows.

pub mod state;

pub use state::*;
