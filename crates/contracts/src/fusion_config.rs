//! Fusion engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

/// Fusion pipeline configuration
///
/// Immutable for the lifetime of a pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Raw distance unit → meters (cm → m = 0.01)
    pub scale_meters: f32,

    /// Prefer `pos_m` from the datagram when present
    pub use_absolute_position: bool,

    /// Always project along +Z, ignoring the orientation
    pub ignore_orientation: bool,

    /// Negate X of emitted points
    pub flip_x: bool,

    /// Negate Y of emitted points
    pub flip_y: bool,

    /// Minimum accepted signal strength
    pub min_strength: i32,

    /// Median window length (clamped to >= 1)
    pub distance_median_window: usize,

    /// Slerp factor toward each new orientation, in [0, 1]
    pub orientation_smoothing: f32,

    /// Maximum |t_range - t_orientation| (seconds)
    pub max_timestamp_delta_seconds: f64,

    /// Maximum |raw - median| (meters)
    pub max_distance_jump_meters: f32,

    /// Retention cap of the point cloud sink
    pub max_points: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            scale_meters: 0.01,
            use_absolute_position: true,
            ignore_orientation: false,
            flip_x: true,
            flip_y: true,
            min_strength: 100,
            distance_median_window: 5,
            orientation_smoothing: 0.5,
            max_timestamp_delta_seconds: 0.05,
            max_distance_jump_meters: 0.15,
            max_points: 5000,
        }
    }
}

impl FusionConfig {
    /// Effective median window length
    #[inline]
    pub fn median_window(&self) -> usize {
        self.distance_median_window.max(1)
    }
}

/// Distance → color mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Distance mapped to t = 0
    pub min_distance_meters: f32,
    /// Distance mapped to t = 1
    pub max_distance_meters: f32,
    /// Intensity at t = 0
    pub min_intensity: f32,
    /// Intensity at t = 1
    pub max_intensity: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            min_distance_meters: 0.1,
            max_distance_meters: 5.0,
            min_intensity: 0.2,
            max_intensity: 1.5,
        }
    }
}
