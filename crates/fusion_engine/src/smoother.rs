//! Exponential orientation smoothing.

use nalgebra::{Quaternion, UnitQuaternion};

/// Blended orientation carried across samples
#[derive(Debug, Clone, Default)]
pub struct OrientationSmoother {
    state: Option<Quaternion<f32>>,
}

impl OrientationSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend `calibrated` into the running state by `alpha` and return the result.
    ///
    /// The first call seeds the state with `calibrated` unchanged.
    pub fn smooth(&mut self, calibrated: Quaternion<f32>, alpha: f32) -> Quaternion<f32> {
        let next = match self.state {
            Some(previous) => slerp(previous, calibrated, alpha),
            None => calibrated,
        };
        self.state = Some(next);
        next
    }

    pub fn has_smoothed(&self) -> bool {
        self.state.is_some()
    }

    /// Current smoothed orientation
    pub fn state(&self) -> Option<Quaternion<f32>> {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Shortest-path spherical interpolation with exact endpoints.
///
/// `t` is clamped to [0, 1]; `t = 0` returns `from` and `t = 1` returns `to` bit for bit.
pub fn slerp(from: Quaternion<f32>, to: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    if !(t > 0.0) {
        return from;
    }
    if t >= 1.0 {
        return to;
    }

    let a = UnitQuaternion::new_unchecked(from);
    let b = UnitQuaternion::new_unchecked(to);
    match a.try_slerp(&b, t, f32::EPSILON) {
        Some(q) => q.into_inner(),
        // Nearly parallel: the arc degenerates, blend linearly
        None => lerp_shortest(from, to, t),
    }
}

/// Linear blend along the shorter arc; magnitude is left as the inputs make it
fn lerp_shortest(from: Quaternion<f32>, to: Quaternion<f32>, t: f32) -> Quaternion<f32> {
    let to = if from.dot(&to) < 0.0 { -to } else { to };
    from.lerp(&to, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn yaw(angle: f32) -> Quaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
    }

    #[test]
    fn test_first_call_passthrough() {
        let mut smoother = OrientationSmoother::new();
        let q = yaw(0.7);
        assert_eq!(smoother.smooth(q, 0.3), q);
        assert!(smoother.has_smoothed());
    }

    #[test]
    fn test_alpha_zero_keeps_prior() {
        let mut smoother = OrientationSmoother::new();
        let first = yaw(0.1);
        smoother.smooth(first, 0.5);
        for angle in [0.5, 1.0, -2.0] {
            assert_eq!(smoother.smooth(yaw(angle), 0.0), first);
        }
    }

    #[test]
    fn test_alpha_one_snaps() {
        let mut smoother = OrientationSmoother::new();
        smoother.smooth(yaw(0.1), 0.5);
        let target = yaw(1.3);
        assert_eq!(smoother.smooth(target, 1.0), target);
        assert_eq!(smoother.state(), Some(target));
    }

    #[test]
    fn test_half_blend_is_midway() {
        let mut smoother = OrientationSmoother::new();
        smoother.smooth(yaw(0.0), 0.5);
        let blended = UnitQuaternion::new_unchecked(smoother.smooth(yaw(1.0), 0.5));
        assert!((blended.angle() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_converges_toward_target() {
        let mut smoother = OrientationSmoother::new();
        smoother.smooth(yaw(0.0), 0.5);
        let target = yaw(1.0);
        let mut last_gap = f32::MAX;
        for _ in 0..10 {
            let q = UnitQuaternion::new_unchecked(smoother.smooth(target, 0.5));
            let gap = q.angle_to(&UnitQuaternion::new_unchecked(target));
            assert!(gap <= last_gap);
            last_gap = gap;
        }
        assert!(last_gap < 1e-2);
    }

    #[test]
    fn test_identical_orientations_stay_put() {
        let q = yaw(0.4);
        let out = slerp(q, q, 0.5);
        assert!((out - q).norm() < 1e-6);
    }

    #[test]
    fn test_linear_fallback_keeps_magnitude() {
        let from = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        let out = lerp_shortest(from, -from, 0.3);
        assert!((out - from).norm() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut smoother = OrientationSmoother::new();
        smoother.smooth(yaw(0.2), 0.5);
        smoother.reset();
        assert!(!smoother.has_smoothed());
    }
}
