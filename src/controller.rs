//! The overlay controller: interaction mode state machine.
//!
//! One `OverlayController` owns the interaction mode, the point buffer, the
//! calibration store and the overlay settings. It is driven one event at a
//! time from the control thread and answers with render commands that the
//! caller drains with [`OverlayController::take_commands`].
//!
//! ```text
//!              enter_calibration                 mark (2nd)
//!   ┌──────┐ ─────────────────────▶ ┌─────────────┐ ──────────┐
//!   │ Idle │                        │ Calibrating │           │
//!   └──────┘ ◀─────────────────────  └─────────────┘ ◀─ mark ──┘ (1st)
//!     │  ▲            calibration complete / failed
//!     │  │ toggle / mark (2nd)
//!     ▼  │
//!   ┌───────────┐
//!   │ Measuring │  (enter only while calibrated)
//!   └───────────┘
//! ```

use std::time::Duration;

use crate::error::CoreError;
use crate::events::CoreEvent;
use crate::geometry::{self, ScreenPoint};
use crate::model::constants::*;
use crate::model::{
    CalibrationRatio, CalibrationStore, InteractionMode, MarkOutcome, OverlaySettings, PointBuffer,
};
use crate::scene::{ClearToken, RenderCommand, VisualId};

/// A finished measurement, kept until its visuals are cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementResult {
    pub from: ScreenPoint,
    pub to: ScreenPoint,
    pub meters: f64,
}

/// Owner of all calibration / measurement state.
#[derive(Debug)]
pub struct OverlayController {
    mode: InteractionMode,
    points: PointBuffer,
    calibration: CalibrationStore,
    settings: OverlaySettings,
    overlay_visible: bool,
    /// Markers, lines and labels of the current or last run.
    transient: Vec<VisualId>,
    last_measurement: Option<MeasurementResult>,
    pending_clear: Option<ClearToken>,
    next_token: u64,
    next_visual: u32,
    commands: Vec<RenderCommand>,
}

impl OverlayController {
    /// Controller seeded with the persisted ratio and settings, in `Idle`.
    pub fn new(ratio: CalibrationRatio, settings: OverlaySettings) -> Self {
        Self {
            mode: InteractionMode::Idle,
            points: PointBuffer::new(),
            calibration: CalibrationStore::new(ratio),
            settings,
            overlay_visible: true,
            transient: Vec::new(),
            last_measurement: None,
            pending_clear: None,
            next_token: 0,
            next_visual: 0,
            commands: Vec::new(),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    pub fn calibration(&self) -> CalibrationRatio {
        self.calibration.get()
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// The result still on screen, if any.
    pub fn last_measurement(&self) -> Option<MeasurementResult> {
        self.last_measurement
    }

    /// Render commands produced since the last call.
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// The ratio to persist, once after each successful calibration.
    pub fn take_calibration_write(&mut self) -> Option<CalibrationRatio> {
        self.calibration.take_pending_write()
    }

    /// Handle one event.
    ///
    /// Errors never leave the controller half-way: the mode, buffer and
    /// queued commands are consistent whatever is returned.
    pub fn handle(&mut self, event: CoreEvent) -> Result<(), CoreError> {
        match event {
            CoreEvent::EnterCalibration => {
                self.enter_capture(InteractionMode::AwaitingCalibration);
                Ok(())
            }
            CoreEvent::ToggleMeasurement => self.toggle_measurement(),
            CoreEvent::MarkPoint(point) => self.mark_point(point),
            CoreEvent::ClearTimerFired(token) => {
                self.clear_timer_fired(token);
                Ok(())
            }
            CoreEvent::ToggleVisibility => {
                self.toggle_visibility();
                Ok(())
            }
            CoreEvent::ApplySettings(settings) => {
                self.apply_settings(settings);
                Ok(())
            }
        }
    }

    fn toggle_measurement(&mut self) -> Result<(), CoreError> {
        match self.mode {
            InteractionMode::Idle => {
                if !self.calibration.get().is_calibrated() {
                    log::info!("Measurement rejected: not calibrated");
                    return Err(CoreError::NotCalibrated);
                }
                self.enter_capture(InteractionMode::AwaitingMeasurement);
                Ok(())
            }
            InteractionMode::AwaitingMeasurement => {
                self.clear_transient();
                self.exit_capture();
                Ok(())
            }
            InteractionMode::AwaitingCalibration => {
                log::debug!("Measurement toggle ignored while calibrating");
                Err(CoreError::InvalidModeTransition)
            }
        }
    }

    fn mark_point(&mut self, point: ScreenPoint) -> Result<(), CoreError> {
        let calibrating = match self.mode {
            InteractionMode::Idle => {
                log::debug!("Point {point} ignored while idle");
                return Err(CoreError::InvalidModeTransition);
            }
            InteractionMode::AwaitingCalibration => true,
            InteractionMode::AwaitingMeasurement => false,
        };

        match self.points.mark(point) {
            MarkOutcome::AwaitingSecondPoint(first) => {
                self.draw_marker(first);
                Ok(())
            }
            MarkOutcome::Complete(a, b) if calibrating => self.complete_calibration(a, b),
            MarkOutcome::Complete(a, b) => self.complete_measurement(a, b),
        }
    }

    fn complete_calibration(&mut self, a: ScreenPoint, b: ScreenPoint) -> Result<(), CoreError> {
        match geometry::calibrate(a, b) {
            Ok(ratio) => {
                self.calibration.set(ratio);
                log::info!("Calibrated: {ratio} ({a} -> {b})");
                self.draw_result(a, b, geometry::format_calibration(ratio));
                self.exit_capture();
                self.schedule_clear(Duration::from_millis(CALIBRATION_TEARDOWN_MS));
                Ok(())
            }
            Err(err) => {
                log::warn!("Calibration rejected: points {a} and {b} coincide");
                self.clear_transient();
                self.exit_capture();
                Err(err)
            }
        }
    }

    fn complete_measurement(&mut self, a: ScreenPoint, b: ScreenPoint) -> Result<(), CoreError> {
        match geometry::measure(a, b, self.calibration.get()) {
            Ok(meters) => {
                log::info!("Measured {meters:.1} m ({a} -> {b})");
                self.draw_result(a, b, geometry::format_distance(meters));
                self.last_measurement = Some(MeasurementResult {
                    from: a,
                    to: b,
                    meters,
                });
                self.exit_capture();
                self.schedule_clear(Duration::from_millis(MEASUREMENT_DISPLAY_MS));
                Ok(())
            }
            Err(err) => {
                self.clear_transient();
                self.exit_capture();
                Err(err)
            }
        }
    }

    fn clear_timer_fired(&mut self, token: ClearToken) {
        if self.pending_clear != Some(token) {
            log::debug!("Stale clear timer {token:?} ignored");
            return;
        }
        self.pending_clear = None;
        self.clear_transient();
        self.last_measurement = None;
    }

    fn toggle_visibility(&mut self) {
        self.overlay_visible = !self.overlay_visible;
        log::info!(
            "Toggle: overlay {}",
            if self.overlay_visible { "visible" } else { "hidden" }
        );
        // While capturing the static overlay is hidden anyway; exit restores it.
        if !self.mode.is_capturing() {
            self.commands.push(if self.overlay_visible {
                RenderCommand::RestoreStaticOverlay
            } else {
                RenderCommand::HideStaticOverlay
            });
        }
    }

    fn apply_settings(&mut self, mut settings: OverlaySettings) {
        settings.validate();
        if settings.display_mode != self.settings.display_mode && self.calibration.get().is_calibrated()
        {
            log::warn!(
                "Display mode changed {} -> {}; the stored calibration was taken under {}, recalibrate",
                self.settings.display_mode,
                settings.display_mode,
                self.settings.display_mode
            );
        }
        self.settings = settings;
        self.commands.push(RenderCommand::RescaleStaticOverlay {
            scale: settings.final_scale(),
            offset: settings.offset(),
        });
    }

    /// Enter a capture mode from any mode. Re-entry restarts the run.
    fn enter_capture(&mut self, mode: InteractionMode) {
        self.cancel_pending_clear();
        self.clear_transient();
        self.last_measurement = None;
        self.points.clear();
        if !self.mode.is_capturing() {
            self.commands.push(RenderCommand::HideStaticOverlay);
            self.commands.push(RenderCommand::ShowCaptureSurface);
        }
        log::info!("Mode: {} -> {}", self.mode, mode);
        self.mode = mode;
    }

    fn exit_capture(&mut self) {
        self.points.clear();
        self.commands.push(RenderCommand::HideCaptureSurface);
        if self.overlay_visible {
            self.commands.push(RenderCommand::RestoreStaticOverlay);
        }
        log::info!("Mode: {} -> {}", self.mode, InteractionMode::Idle);
        self.mode = InteractionMode::Idle;
    }

    fn draw_marker(&mut self, at: ScreenPoint) {
        let id = self.alloc_visual();
        self.commands.push(RenderCommand::DrawMarker { id, at });
    }

    fn draw_result(&mut self, a: ScreenPoint, b: ScreenPoint, text: String) {
        self.draw_marker(b);
        let line = self.alloc_visual();
        self.commands.push(RenderCommand::DrawLine {
            id: line,
            from: a,
            to: b,
        });
        let label = self.alloc_visual();
        self.commands.push(RenderCommand::DrawLabel {
            id: label,
            text,
            at: a.midpoint(b),
        });
    }

    fn alloc_visual(&mut self) -> VisualId {
        let id = VisualId(self.next_visual);
        self.next_visual = self.next_visual.wrapping_add(1);
        self.transient.push(id);
        id
    }

    fn clear_transient(&mut self) {
        for id in self.transient.drain(..) {
            self.commands.push(RenderCommand::ClearVisual(id));
        }
    }

    fn schedule_clear(&mut self, after: Duration) {
        self.next_token += 1;
        let token = ClearToken(self.next_token);
        self.pending_clear = Some(token);
        self.commands.push(RenderCommand::ScheduleClear { token, after });
    }

    fn cancel_pending_clear(&mut self) {
        if self.pending_clear.take().is_some() {
            self.commands.push(RenderCommand::CancelClear);
        }
    }
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new(CalibrationRatio::UNCALIBRATED, OverlaySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated() -> OverlayController {
        OverlayController::new(CalibrationRatio::new(500.0), OverlaySettings::default())
    }

    fn mark(controller: &mut OverlayController, x: i32, y: i32) -> Result<(), CoreError> {
        controller.handle(CoreEvent::MarkPoint(ScreenPoint::new(x, y)))
    }

    #[test]
    fn test_starts_idle_and_uncalibrated() {
        let controller = OverlayController::default();
        assert_eq!(controller.mode(), InteractionMode::Idle);
        assert!(!controller.calibration().is_calibrated());
        assert!(controller.overlay_visible());
    }

    #[test]
    fn test_enter_calibration_hides_overlay_and_shows_capture() {
        let mut controller = OverlayController::default();
        controller.handle(CoreEvent::EnterCalibration).unwrap();
        assert_eq!(controller.mode(), InteractionMode::AwaitingCalibration);
        assert_eq!(
            controller.take_commands(),
            vec![
                RenderCommand::HideStaticOverlay,
                RenderCommand::ShowCaptureSurface
            ]
        );
    }

    #[test]
    fn test_first_point_draws_marker_only() {
        let mut controller = OverlayController::default();
        controller.handle(CoreEvent::EnterCalibration).unwrap();
        controller.take_commands();

        mark(&mut controller, 10, 20).unwrap();
        assert_eq!(controller.points().len(), 1);
        assert_eq!(
            controller.take_commands(),
            vec![RenderCommand::DrawMarker {
                id: VisualId(0),
                at: ScreenPoint::new(10, 20),
            }]
        );
    }

    #[test]
    fn test_calibration_stores_ratio_and_requests_write() {
        let mut controller = OverlayController::default();
        controller.handle(CoreEvent::EnterCalibration).unwrap();
        mark(&mut controller, 0, 0).unwrap();
        mark(&mut controller, 0, 500).unwrap();

        assert_eq!(controller.mode(), InteractionMode::Idle);
        assert!(controller.points().is_empty());
        assert_eq!(controller.calibration(), CalibrationRatio::new(500.0));
        assert_eq!(
            controller.take_calibration_write(),
            Some(CalibrationRatio::new(500.0))
        );

        let commands = controller.take_commands();
        assert!(commands.contains(&RenderCommand::HideCaptureSurface));
        assert!(commands.contains(&RenderCommand::RestoreStaticOverlay));
        assert!(commands.iter().any(|c| matches!(
            c,
            RenderCommand::ScheduleClear { after, .. }
                if *after == Duration::from_millis(CALIBRATION_TEARDOWN_MS)
        )));
    }

    #[test]
    fn test_degenerate_calibration_is_rejected_and_keeps_old_ratio() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::EnterCalibration).unwrap();
        mark(&mut controller, 5, 5).unwrap();
        assert_eq!(mark(&mut controller, 5, 5), Err(CoreError::DegenerateCalibration));

        assert_eq!(controller.mode(), InteractionMode::Idle);
        assert_eq!(controller.calibration(), CalibrationRatio::new(500.0));
        assert_eq!(controller.take_calibration_write(), None);

        let commands = controller.take_commands();
        assert!(commands.contains(&RenderCommand::ClearVisual(VisualId(0))));
        assert!(commands.contains(&RenderCommand::HideCaptureSurface));
    }

    #[test]
    fn test_measurement_rejected_while_uncalibrated() {
        let mut controller = OverlayController::default();
        assert_eq!(
            controller.handle(CoreEvent::ToggleMeasurement),
            Err(CoreError::NotCalibrated)
        );
        assert_eq!(controller.mode(), InteractionMode::Idle);
        assert!(controller.take_commands().is_empty());
    }

    #[test]
    fn test_measurement_result_and_timeout() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        mark(&mut controller, 0, 0).unwrap();
        mark(&mut controller, 0, 100).unwrap();

        let result = controller.last_measurement().expect("measurement kept");
        assert!((result.meters - 200.0).abs() < 1e-6);
        assert_eq!(controller.mode(), InteractionMode::Idle);

        let commands = controller.take_commands();
        assert!(commands.contains(&RenderCommand::DrawLabel {
            id: VisualId(3),
            text: "200 m".to_string(),
            at: ScreenPoint::new(0, 50),
        }));
        let token = commands
            .iter()
            .find_map(|c| match c {
                RenderCommand::ScheduleClear { token, after } => {
                    assert_eq!(*after, Duration::from_millis(MEASUREMENT_DISPLAY_MS));
                    Some(*token)
                }
                _ => None,
            })
            .expect("clear scheduled");

        controller.handle(CoreEvent::ClearTimerFired(token)).unwrap();
        assert_eq!(controller.last_measurement(), None);
        let cleared = controller.take_commands();
        assert_eq!(cleared.len(), 4);
        assert!(cleared
            .iter()
            .all(|c| matches!(c, RenderCommand::ClearVisual(_))));
    }

    #[test]
    fn test_new_run_cancels_pending_clear_and_stale_timer_is_ignored() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        mark(&mut controller, 0, 0).unwrap();
        mark(&mut controller, 0, 100).unwrap();
        controller.take_commands();

        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        let commands = controller.take_commands();
        assert_eq!(commands.first(), Some(&RenderCommand::CancelClear));
        assert_eq!(controller.last_measurement(), None);

        mark(&mut controller, 1, 1).unwrap();
        controller.take_commands();
        controller
            .handle(CoreEvent::ClearTimerFired(ClearToken(1)))
            .unwrap();
        assert!(controller.take_commands().is_empty());
        assert_eq!(controller.points().len(), 1);
    }

    #[test]
    fn test_toggle_measurement_twice_leaves_nothing_behind() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        assert_eq!(controller.mode(), InteractionMode::Idle);
        assert!(controller.points().is_empty());
        assert_eq!(
            controller.take_commands(),
            vec![
                RenderCommand::HideStaticOverlay,
                RenderCommand::ShowCaptureSurface,
                RenderCommand::HideCaptureSurface,
                RenderCommand::RestoreStaticOverlay,
            ]
        );
    }

    #[test]
    fn test_mark_while_idle_is_ignored() {
        let mut controller = calibrated();
        assert_eq!(mark(&mut controller, 1, 2), Err(CoreError::InvalidModeTransition));
        assert!(controller.points().is_empty());
        assert!(controller.take_commands().is_empty());
    }

    #[test]
    fn test_toggle_measurement_ignored_while_calibrating() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::EnterCalibration).unwrap();
        assert_eq!(
            controller.handle(CoreEvent::ToggleMeasurement),
            Err(CoreError::InvalidModeTransition)
        );
        assert_eq!(controller.mode(), InteractionMode::AwaitingCalibration);
    }

    #[test]
    fn test_enter_calibration_while_measuring_switches_mode() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        mark(&mut controller, 3, 3).unwrap();
        controller.take_commands();

        controller.handle(CoreEvent::EnterCalibration).unwrap();
        assert_eq!(controller.mode(), InteractionMode::AwaitingCalibration);
        assert!(controller.points().is_empty());
        // The capture surface is already up; only the stale marker goes.
        assert_eq!(
            controller.take_commands(),
            vec![RenderCommand::ClearVisual(VisualId(0))]
        );
    }

    #[test]
    fn test_hidden_overlay_is_not_restored_after_capture() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::ToggleVisibility).unwrap();
        assert_eq!(
            controller.take_commands(),
            vec![RenderCommand::HideStaticOverlay]
        );

        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        controller.handle(CoreEvent::ToggleMeasurement).unwrap();
        let commands = controller.take_commands();
        assert!(!commands.contains(&RenderCommand::RestoreStaticOverlay));
    }

    #[test]
    fn test_visibility_toggle_during_capture_is_deferred() {
        let mut controller = calibrated();
        controller.handle(CoreEvent::ToggleVisibility).unwrap();
        controller.handle(CoreEvent::EnterCalibration).unwrap();
        controller.take_commands();

        controller.handle(CoreEvent::ToggleVisibility).unwrap();
        assert!(controller.take_commands().is_empty());

        mark(&mut controller, 0, 0).unwrap();
        mark(&mut controller, 0, 300).unwrap();
        assert!(controller
            .take_commands()
            .contains(&RenderCommand::RestoreStaticOverlay));
    }

    #[test]
    fn test_apply_settings_validates_and_rescales() {
        let mut controller = OverlayController::default();
        let settings = OverlaySettings {
            scale_factor: 100.0,
            offset_x: 7,
            ..OverlaySettings::default()
        };
        controller.handle(CoreEvent::ApplySettings(settings)).unwrap();
        assert!((controller.settings().scale_factor - MAX_SCALE_FACTOR).abs() < 1e-9);
        assert_eq!(
            controller.take_commands(),
            vec![RenderCommand::RescaleStaticOverlay {
                scale: 1440.0 / 2475.0 * MAX_SCALE_FACTOR,
                offset: (7, 0),
            }]
        );
    }

    #[test]
    fn test_display_mode_change_keeps_ratio() {
        let mut controller = calibrated();
        let settings = OverlaySettings {
            display_mode: geometry::DisplayMode::Fhd,
            ..OverlaySettings::default()
        };
        controller.handle(CoreEvent::ApplySettings(settings)).unwrap();
        assert_eq!(controller.calibration(), CalibrationRatio::new(500.0));
    }
}
