//! Calibration ratio and its store.

use std::fmt;

/// Pixels per kilometer. Zero means "uncalibrated".
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct CalibrationRatio(f64);

impl CalibrationRatio {
    /// The ratio of a tool that was never calibrated.
    pub const UNCALIBRATED: CalibrationRatio = CalibrationRatio(0.0);

    /// Wrap a raw ratio. Negative and non-finite values collapse to uncalibrated.
    pub fn new(pixels_per_km: f64) -> Self {
        if pixels_per_km.is_finite() && pixels_per_km > 0.0 {
            Self(pixels_per_km)
        } else {
            Self::UNCALIBRATED
        }
    }

    pub fn pixels_per_km(self) -> f64 {
        self.0
    }

    pub fn is_calibrated(self) -> bool {
        self.0 > 0.0
    }
}

impl fmt::Display for CalibrationRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} px/km", self.0)
    }
}

/// Holds the current ratio and remembers whether it still has to be persisted.
///
/// The controller writes here; the persistence collaborator picks up the
/// pending value with [`CalibrationStore::take_pending_write`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStore {
    ratio: CalibrationRatio,
    pending_write: bool,
}

impl CalibrationStore {
    /// Store seeded with the persisted value (not marked for writing).
    pub fn new(ratio: CalibrationRatio) -> Self {
        Self {
            ratio,
            pending_write: false,
        }
    }

    pub fn get(&self) -> CalibrationRatio {
        self.ratio
    }

    /// Overwrite the ratio and flag it for persistence.
    pub fn set(&mut self, ratio: CalibrationRatio) {
        self.ratio = ratio;
        self.pending_write = true;
    }

    /// Returns the ratio once after each `set`, `None` otherwise.
    pub fn take_pending_write(&mut self) -> Option<CalibrationRatio> {
        if std::mem::take(&mut self.pending_write) {
            Some(self.ratio)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_uncalibrated() {
        let store = CalibrationStore::default();
        assert!(!store.get().is_calibrated());
        assert_eq!(store.get().pixels_per_km(), 0.0);
    }

    #[test]
    fn test_invalid_values_collapse_to_uncalibrated() {
        assert_eq!(CalibrationRatio::new(-3.0), CalibrationRatio::UNCALIBRATED);
        assert_eq!(CalibrationRatio::new(f64::NAN), CalibrationRatio::UNCALIBRATED);
        assert_eq!(CalibrationRatio::new(f64::INFINITY), CalibrationRatio::UNCALIBRATED);
    }

    #[test]
    fn test_set_overwrites_and_flags_write_once() {
        let mut store = CalibrationStore::new(CalibrationRatio::new(100.0));
        assert_eq!(store.take_pending_write(), None);

        store.set(CalibrationRatio::new(500.0));
        assert_eq!(store.get(), CalibrationRatio::new(500.0));
        assert_eq!(store.take_pending_write(), Some(CalibrationRatio::new(500.0)));
        assert_eq!(store.take_pending_write(), None);
    }
}
