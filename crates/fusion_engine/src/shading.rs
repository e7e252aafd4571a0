//! Distance → gradient position and intensity.

use contracts::{Shade, ShadingConfig};

/// Map a distance (meters) onto the shading ramp.
///
/// `t` is clamped to [0, 1]; a degenerate range (min == max) maps everything to 0.
pub fn shade(distance: f32, config: &ShadingConfig) -> Shade {
    let t = inverse_lerp(config.min_distance_meters, config.max_distance_meters, distance);
    Shade {
        t,
        intensity: lerp(config.min_intensity, config.max_intensity, t),
    }
}

#[inline]
fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() <= f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
