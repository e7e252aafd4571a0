//! Orientation + distance → 3D point.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Sensor boresight in the sensor frame
#[inline]
pub fn forward() -> Vector3<f32> {
    Vector3::z()
}

/// Pointing direction of the range sensor.
///
/// The quaternion is used as-is, it is not re-normalized.
#[inline]
pub fn direction(orientation: Quaternion<f32>, ignore_orientation: bool) -> Vector3<f32> {
    if ignore_orientation {
        return forward();
    }
    UnitQuaternion::new_unchecked(orientation).transform_vector(&forward())
}

/// `direction * distance`, with X/Y negated per flag
#[inline]
pub fn derive(direction: Vector3<f32>, distance: f32, flip_x: bool, flip_y: bool) -> Vector3<f32> {
    apply_flips(direction * distance, flip_x, flip_y)
}

/// Sender-supplied position, with the same flips as the derived path
#[inline]
pub fn derive_absolute(position: Vector3<f32>, flip_x: bool, flip_y: bool) -> Vector3<f32> {
    apply_flips(position, flip_x, flip_y)
}

fn apply_flips(mut p: Vector3<f32>, flip_x: bool, flip_y: bool) -> Vector3<f32> {
    if flip_x {
        p.x = -p.x;
    }
    if flip_y {
        p.y = -p.y;
    }
    p
}
