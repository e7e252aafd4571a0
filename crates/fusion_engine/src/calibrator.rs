//! User-triggered orientation zeroing.

use nalgebra::Quaternion;
use tracing::{debug, warn};

/// Reference rotation captured on demand
///
/// Empty until the first capture; lives until [`OrientationCalibrator::reset`].
#[derive(Debug, Clone, Default)]
pub struct OrientationCalibrator {
    calibration: Option<Quaternion<f32>>,
}

impl OrientationCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `raw` the new zero heading.
    ///
    /// Returns `false` (and keeps the previous calibration) when `raw` has no inverse.
    pub fn capture(&mut self, raw: Quaternion<f32>) -> bool {
        match raw.try_inverse() {
            Some(inverse) => {
                debug!(qx = raw.i, qy = raw.j, qz = raw.k, qw = raw.w, "calibration captured");
                self.calibration = Some(inverse);
                true
            }
            None => {
                warn!("ignoring calibration capture from a zero quaternion");
                false
            }
        }
    }

    /// Map a raw orientation into the calibrated frame
    #[inline]
    pub fn apply(&self, raw: Quaternion<f32>) -> Quaternion<f32> {
        match self.calibration {
            Some(calibration) => calibration * raw,
            None => raw,
        }
    }

    pub fn has_calibration(&self) -> bool {
        self.calibration.is_some()
    }

    /// Captured inverse reference, if any
    pub fn calibration(&self) -> Option<Quaternion<f32>> {
        self.calibration
    }

    pub fn reset(&mut self) {
        self.calibration = None;
    }
}
