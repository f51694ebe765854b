//! Interaction modes and the two-point collector.

use std::fmt;

use crate::geometry::ScreenPoint;

/// What screen clicks currently mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InteractionMode {
    /// Clicks pass through to the game.
    #[default]
    Idle,
    /// Collecting two points asserted to be 1 km apart.
    AwaitingCalibration,
    /// Collecting two points to measure.
    AwaitingMeasurement,
}

impl InteractionMode {
    /// True while the capture surface intercepts clicks.
    pub fn is_capturing(self) -> bool {
        !matches!(self, InteractionMode::Idle)
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionMode::Idle => "Idle",
            InteractionMode::AwaitingCalibration => "Calibrating",
            InteractionMode::AwaitingMeasurement => "Measuring",
        };
        f.write_str(name)
    }
}

/// Result of marking a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// One point collected; the caller should draw a marker for it.
    AwaitingSecondPoint(ScreenPoint),
    /// Both points collected; the buffer is already empty again.
    Complete(ScreenPoint, ScreenPoint),
}

/// Up to two collected points.
///
/// Only the first point is ever held: the second one completes the pair and
/// empties the buffer in the same call, so a third point has nowhere to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointBuffer {
    first: Option<ScreenPoint>,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point. Any coordinate is accepted as-is.
    pub fn mark(&mut self, point: ScreenPoint) -> MarkOutcome {
        match self.first.take() {
            None => {
                self.first = Some(point);
                MarkOutcome::AwaitingSecondPoint(point)
            }
            Some(first) => MarkOutcome::Complete(first, point),
        }
    }

    pub fn clear(&mut self) {
        self.first = None;
    }

    pub fn len(&self) -> usize {
        usize::from(self.first.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// The pending first point, if any.
    pub fn first(&self) -> Option<ScreenPoint> {
        self.first
    }
}
