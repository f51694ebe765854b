//! Overlay rendering module.

pub mod renderer;
pub mod window;

pub use renderer::{
    apply_commands, assert_topmost, clear_timer_elapsed, create_label_format, update_overlay,
    D2D_FACTORY, DWRITE_FACTORY, LABEL_FORMAT,
};
pub use window::set_click_through;
