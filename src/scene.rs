//! Render commands and the retained scene they build.
//!
//! The controller never draws. It emits [`RenderCommand`]s, the platform
//! renderer applies them to a [`Scene`] and paints whatever the scene holds.
//! Timer commands are not scene state; the renderer arms or kills its
//! platform timer for them and [`Scene::apply`] leaves them alone.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::geometry::{self, DisplayMode, ScreenPoint};
use crate::model::constants::DEFAULT_SCALE_FACTOR;

/// Handle for a drawn marker, line or label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisualId(pub u32);

/// Identifies one scheduled clear. A firing with an older token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearToken(pub u64);

/// Output of the controller, consumed by the rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Present the full-screen capture layer and stop passing clicks through.
    ShowCaptureSurface,
    /// Remove the capture layer and restore click-through.
    HideCaptureSurface,
    DrawMarker {
        id: VisualId,
        at: ScreenPoint,
    },
    DrawLine {
        id: VisualId,
        from: ScreenPoint,
        to: ScreenPoint,
    },
    DrawLabel {
        id: VisualId,
        text: String,
        at: ScreenPoint,
    },
    ClearVisual(VisualId),
    HideStaticOverlay,
    RestoreStaticOverlay,
    /// Resize / move the static overlay (scale applies to the native asset).
    RescaleStaticOverlay {
        scale: f64,
        offset: (i32, i32),
    },
    /// Arm the clear timer; replaces any armed one.
    ScheduleClear {
        token: ClearToken,
        after: Duration,
    },
    /// Disarm the clear timer.
    CancelClear,
}

/// A transient drawing on top of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Marker(ScreenPoint),
    Line(ScreenPoint, ScreenPoint),
    Label { text: String, at: ScreenPoint },
}

/// Everything the renderer needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    static_overlay: bool,
    capture_surface: bool,
    scale: f64,
    offset: (i32, i32),
    visuals: BTreeMap<VisualId, Visual>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            static_overlay: true,
            capture_surface: false,
            scale: geometry::final_scale(DisplayMode::default(), DEFAULT_SCALE_FACTOR),
            offset: (0, 0),
            visuals: BTreeMap::new(),
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command. Returns true if the frame has to be repainted.
    pub fn apply(&mut self, command: &RenderCommand) -> bool {
        match command {
            RenderCommand::ShowCaptureSurface => replace(&mut self.capture_surface, true),
            RenderCommand::HideCaptureSurface => replace(&mut self.capture_surface, false),
            RenderCommand::HideStaticOverlay => replace(&mut self.static_overlay, false),
            RenderCommand::RestoreStaticOverlay => replace(&mut self.static_overlay, true),
            RenderCommand::DrawMarker { id, at } => {
                self.visuals.insert(*id, Visual::Marker(*at));
                true
            }
            RenderCommand::DrawLine { id, from, to } => {
                self.visuals.insert(*id, Visual::Line(*from, *to));
                true
            }
            RenderCommand::DrawLabel { id, text, at } => {
                self.visuals.insert(
                    *id,
                    Visual::Label {
                        text: text.clone(),
                        at: *at,
                    },
                );
                true
            }
            RenderCommand::ClearVisual(id) => self.visuals.remove(id).is_some(),
            RenderCommand::RescaleStaticOverlay { scale, offset } => {
                let changed = self.scale != *scale || self.offset != *offset;
                self.scale = *scale;
                self.offset = *offset;
                changed
            }
            RenderCommand::ScheduleClear { .. } | RenderCommand::CancelClear => false,
        }
    }

    pub fn static_overlay_visible(&self) -> bool {
        self.static_overlay
    }

    pub fn capture_surface_visible(&self) -> bool {
        self.capture_surface
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    pub fn visuals(&self) -> impl Iterator<Item = (&VisualId, &Visual)> {
        self.visuals.iter()
    }

    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }
}

fn replace(flag: &mut bool, value: bool) -> bool {
    std::mem::replace(flag, value) != value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_shows_static_overlay_only() {
        let scene = Scene::new();
        assert!(scene.static_overlay_visible());
        assert!(!scene.capture_surface_visible());
        assert_eq!(scene.visual_count(), 0);
    }

    #[test]
    fn test_draw_then_clear_visual() {
        let mut scene = Scene::new();
        let id = VisualId(7);
        assert!(scene.apply(&RenderCommand::DrawMarker {
            id,
            at: ScreenPoint::new(1, 2),
        }));
        assert_eq!(scene.visual_count(), 1);
        assert!(scene.apply(&RenderCommand::ClearVisual(id)));
        assert_eq!(scene.visual_count(), 0);
    }

    #[test]
    fn test_clearing_unknown_visual_needs_no_repaint() {
        let mut scene = Scene::new();
        assert!(!scene.apply(&RenderCommand::ClearVisual(VisualId(99))));
    }

    #[test]
    fn test_repeated_flags_need_no_repaint() {
        let mut scene = Scene::new();
        assert!(scene.apply(&RenderCommand::ShowCaptureSurface));
        assert!(!scene.apply(&RenderCommand::ShowCaptureSurface));
        assert!(!scene.apply(&RenderCommand::RestoreStaticOverlay));
        assert!(scene.apply(&RenderCommand::HideStaticOverlay));
    }

    #[test]
    fn test_timer_commands_leave_scene_untouched() {
        let mut scene = Scene::new();
        let before = scene.clone();
        assert!(!scene.apply(&RenderCommand::ScheduleClear {
            token: ClearToken(1),
            after: Duration::from_millis(3000),
        }));
        assert!(!scene.apply(&RenderCommand::CancelClear));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_rescale_reports_change_once() {
        let mut scene = Scene::new();
        let command = RenderCommand::RescaleStaticOverlay {
            scale: 0.5,
            offset: (3, 4),
        };
        assert!(scene.apply(&command));
        assert!(!scene.apply(&command));
        assert_eq!(scene.offset(), (3, 4));
    }
}
